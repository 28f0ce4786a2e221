//! Placement of type-use annotations read from class-file records, checked
//! against the behavior of `javac`-compiled declarations.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use sable_classfile::{
    parse_field_descriptor, parse_method_descriptor, parse_method_signature, Annotation,
    ClassStub, FieldStub, MethodStub, RawTypePathStep, TargetInfo, TypeAnnotation,
};
use sable_types::{
    AnnotatedType, ClassId, Type, TypeAnnot, TypeDefStub, TypeProvider, TypeStore,
};

struct StubProvider(HashMap<String, TypeDefStub>);

impl TypeProvider for StubProvider {
    fn lookup_type(&self, binary_name: &str) -> Option<TypeDefStub> {
        self.0.get(binary_name).cloned()
    }
}

fn annotation(internal_name: &str) -> Annotation {
    Annotation {
        type_descriptor: format!("L{internal_name};"),
        type_internal_name: Some(internal_name.to_string()),
        elements: vec![],
    }
}

fn record(target: TargetInfo, path: Vec<RawTypePathStep>, internal_name: &str) -> TypeAnnotation {
    TypeAnnotation {
        target,
        path,
        annotation: annotation(internal_name),
    }
}

fn method(
    name: &str,
    descriptor: &str,
    signature: Option<&str>,
    exceptions: &[&str],
    type_annotations: Vec<TypeAnnotation>,
) -> MethodStub {
    MethodStub {
        access_flags: 0x0401, // public abstract
        name: name.to_string(),
        descriptor: parse_method_descriptor(descriptor).unwrap(),
        signature: signature.map(|sig| parse_method_signature(sig).unwrap()),
        exceptions: exceptions.iter().map(|name| name.to_string()).collect(),
        annotations: vec![],
        type_annotations,
    }
}

const A: &str = "com/example/A";
const B: &str = "com/example/B";

/// The fixture class, as javac encodes it:
///
/// ```java
/// abstract class AnnotatedMethods {
///     abstract void aOnIntParam(@A int i);
///     abstract void aOnStringParam(@A String i);
///     abstract @A @B String abOnReturn(@A String i);
///     abstract void aOnThrows() throws @A RuntimeException;
///     abstract <@A @B T, E extends T> void abOnTypeParm();
///     abstract <@A T, E extends @B T> void bOnTypeParmBound();
///     abstract <@A T, E extends @B T> E bOnTypeParmBoundWithParam(T t);
///     abstract <@A T, E extends @B Cloneable & @A Serializable> E bOnTypeParmBoundIntersection(T t);
///     abstract void abOnReceiver(@A @B AnnotatedMethods this);
///     abstract void deepPath(List<? extends @A Number> l);
/// }
/// ```
fn fixture() -> (TypeStore, ClassId) {
    use TargetInfo::*;

    let methods = vec![
        method(
            "aOnIntParam",
            "(I)V",
            None,
            &[],
            vec![record(FormalParameter { index: 0 }, vec![], A)],
        ),
        method(
            "aOnStringParam",
            "(Ljava/lang/String;)V",
            None,
            &[],
            vec![record(FormalParameter { index: 0 }, vec![], A)],
        ),
        method(
            "abOnReturn",
            "(Ljava/lang/String;)Ljava/lang/String;",
            None,
            &[],
            vec![
                record(FormalParameter { index: 0 }, vec![], A),
                record(MethodReturn, vec![], A),
                record(MethodReturn, vec![], B),
            ],
        ),
        method(
            "aOnThrows",
            "()V",
            None,
            &["java/lang/RuntimeException"],
            vec![record(Throws { index: 0 }, vec![], A)],
        ),
        method(
            "abOnTypeParm",
            "()V",
            Some("<T:Ljava/lang/Object;E:TT;>()V"),
            &[],
            vec![
                record(MethodTypeParameter { index: 0 }, vec![], A),
                record(MethodTypeParameter { index: 0 }, vec![], B),
            ],
        ),
        method(
            "bOnTypeParmBound",
            "()V",
            Some("<T:Ljava/lang/Object;E:TT;>()V"),
            &[],
            vec![
                record(MethodTypeParameter { index: 0 }, vec![], A),
                record(MethodTypeParameterBound { index: 1, bound: 0 }, vec![], B),
            ],
        ),
        method(
            "bOnTypeParmBoundWithParam",
            "(Ljava/lang/Object;)Ljava/lang/Object;",
            Some("<T:Ljava/lang/Object;E:TT;>(TT;)TE;"),
            &[],
            vec![
                record(MethodTypeParameter { index: 0 }, vec![], A),
                record(MethodTypeParameterBound { index: 1, bound: 0 }, vec![], B),
            ],
        ),
        method(
            "bOnTypeParmBoundIntersection",
            "(Ljava/lang/Object;)Ljava/lang/Object;",
            Some(
                "<T:Ljava/lang/Object;E::Ljava/lang/Cloneable;:Ljava/io/Serializable;>(TT;)TE;",
            ),
            &[],
            vec![
                record(MethodTypeParameter { index: 0 }, vec![], A),
                // Interface bounds start at bound index 1; the class-bound
                // slot is empty here.
                record(MethodTypeParameterBound { index: 1, bound: 1 }, vec![], B),
                record(MethodTypeParameterBound { index: 1, bound: 2 }, vec![], A),
            ],
        ),
        method(
            "abOnReceiver",
            "()V",
            None,
            &[],
            vec![
                record(MethodReceiver, vec![], A),
                record(MethodReceiver, vec![], B),
            ],
        ),
        method(
            "deepPath",
            "(Ljava/util/List;)V",
            Some("(Ljava/util/List<+Ljava/lang/Number;>;)V"),
            &[],
            vec![record(
                FormalParameter { index: 0 },
                vec![
                    RawTypePathStep::TypeArgument(0),
                    RawTypePathStep::WildcardBound,
                ],
                A,
            )],
        ),
        method(
            "badPath",
            "(I)V",
            None,
            &[],
            vec![record(
                FormalParameter { index: 0 },
                vec![RawTypePathStep::TypeArgument(5)],
                A,
            )],
        ),
    ];

    let stub = ClassStub {
        internal_name: "com/example/AnnotatedMethods".to_string(),
        access_flags: 0x0421,
        super_class: Some("java/lang/Object".to_string()),
        interfaces: vec![],
        signature: None,
        annotations: vec![],
        type_annotations: vec![],
        fields: vec![FieldStub {
            access_flags: 0,
            name: "names".to_string(),
            descriptor: parse_field_descriptor("[Ljava/lang/String;").unwrap(),
            signature: None,
            annotations: vec![],
            type_annotations: vec![record(TargetInfo::Field, vec![RawTypePathStep::Array], A)],
        }],
        methods,
        diagnostics: vec![],
    };

    let mut classes = HashMap::new();
    classes.insert(
        "com.example.AnnotatedMethods".to_string(),
        TypeDefStub::binary(stub),
    );

    let store = TypeStore::with_provider(Box::new(StubProvider(classes)));
    let sym = store.get_class_symbol("com.example.AnnotatedMethods");
    (store, sym)
}

fn a(store: &TypeStore) -> TypeAnnot {
    TypeAnnot::marker(store.get_class_symbol("com.example.A"))
}

fn b(store: &TypeStore) -> TypeAnnot {
    TypeAnnot::marker(store.get_class_symbol("com.example.B"))
}

fn assert_annots(store: &TypeStore, node: &AnnotatedType<'_>, expected: &[TypeAnnot]) {
    assert_eq!(node.annotations(store), expected.to_vec());
}

fn sig_of(store: &TypeStore, sym: ClassId, name: &str) -> sable_types::MethodSig {
    let decl = store.declaration(sym);
    store
        .method_named(&decl, name)
        .unwrap_or_else(|| panic!("method {name} should exist"))
}

#[test]
fn annot_on_parameter() {
    let (store, sym) = fixture();

    for name in ["aOnIntParam", "aOnStringParam"] {
        let sig = sig_of(&store, sym, name);
        assert_annots(&store, &sig.formal_parameter(0).unwrap(), &[a(&store)]);
        assert_annots(&store, &sig.return_type(), &[]);
    }
}

#[test]
fn annots_on_return_keep_declaration_order() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "abOnReturn");

    assert_annots(&store, &sig.formal_parameter(0).unwrap(), &[a(&store)]);
    assert_annots(&store, &sig.return_type(), &[a(&store), b(&store)]);
}

#[test]
fn annot_on_throws() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "aOnThrows");

    assert_annots(&store, &sig.return_type(), &[]);
    let thrown = sig.thrown_exception(0).unwrap();
    assert_eq!(
        thrown.ty(),
        &Type::class(store.well_known().runtime_exception, vec![])
    );
    assert_annots(&store, &thrown, &[a(&store)]);
}

#[test]
fn annots_on_type_parameter() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "abOnTypeParm");
    let type_params = sig.type_parameters();

    let t = store.type_param(type_params[0]).unwrap();
    assert_eq!(t.annotations, vec![a(&store), b(&store)]);

    let e = store.type_param(type_params[1]).unwrap();
    assert_eq!(e.annotations, vec![]);
}

#[test]
fn annot_on_type_parameter_bound() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "bOnTypeParmBound");
    let type_params = sig.type_parameters();

    let t = store.type_param(type_params[0]).unwrap();
    assert_eq!(t.annotations, vec![a(&store)]);

    // E itself carries nothing; its bound (a use of T) carries @B — the
    // use-site annotations, not T's declaration annotations.
    let e = store.type_param(type_params[1]).unwrap();
    assert_eq!(e.annotations, vec![]);
    let bound = e.annotated_upper_bound();
    assert_eq!(bound.ty(), &Type::TypeVar(type_params[0]));
    assert_annots(&store, &bound, &[b(&store)]);
}

#[test]
fn type_var_occurrences_inherit_declaration_annots() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "bOnTypeParmBoundWithParam");
    let type_params = sig.type_parameters();

    let e = store.type_param(type_params[1]).unwrap();
    assert_annots(&store, &e.annotated_upper_bound(), &[b(&store)]);

    // The return type is a bare use of E (declared without annotations).
    assert_annots(&store, &sig.return_type(), &[]);
    // The parameter is a bare use of T and inherits @A from T's declaration.
    assert_annots(&store, &sig.formal_parameter(0).unwrap(), &[a(&store)]);
}

#[test]
fn annots_on_intersection_bound_components() {
    let (store, sym) = fixture();
    let wk = *store.well_known();
    let sig = sig_of(&store, sym, "bOnTypeParmBoundIntersection");
    let type_params = sig.type_parameters();

    let t = store.type_param(type_params[0]).unwrap();
    assert_eq!(t.annotations, vec![a(&store)]);
    let e = store.type_param(type_params[1]).unwrap();
    assert_eq!(e.annotations, vec![]);

    assert_annots(&store, &sig.formal_parameter(0).unwrap(), &[a(&store)]);

    let bound = e.annotated_upper_bound();
    assert_eq!(
        bound.ty(),
        &Type::Intersection(vec![
            Type::class(wk.cloneable, vec![]),
            Type::class(wk.serializable, vec![]),
        ])
    );
    // The intersection itself is unannotated; each component carries the
    // annotation of its bound.
    assert_annots(&store, &bound, &[]);
    assert_annots(&store, &bound.intersection_component(0).unwrap(), &[b(&store)]);
    assert_annots(&store, &bound.intersection_component(1).unwrap(), &[a(&store)]);
}

#[test]
fn annots_on_receiver() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "abOnReceiver");

    assert!(sig.formal_parameters().is_empty());
    let receiver = sig.annotated_receiver_type().unwrap();
    assert_eq!(receiver.ty(), &store.declaration(sym));
    assert_annots(&store, &receiver, &[a(&store), b(&store)]);
}

#[test]
fn annot_deep_in_a_type_path() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "deepPath");

    let param = sig.formal_parameter(0).unwrap();
    assert_annots(&store, &param, &[]);

    let wildcard = param.type_argument(0).unwrap();
    assert_annots(&store, &wildcard, &[]);

    let bound = wildcard.wildcard_bound().unwrap();
    assert_eq!(bound.ty(), &Type::class(store.well_known().number, vec![]));
    assert_annots(&store, &bound, &[a(&store)]);
}

#[test]
fn mismatched_paths_drop_the_annotation_not_the_mirror() {
    let (store, sym) = fixture();
    let sig = sig_of(&store, sym, "badPath");

    // The mirror tree stays valid and unannotated.
    assert_eq!(
        sig.formal_parameter(0).unwrap().ty(),
        &Type::Primitive(sable_types::PrimitiveType::Int)
    );
    assert_annots(&store, &sig.formal_parameter(0).unwrap(), &[]);

    let diagnostics = store.take_diagnostics();
    assert!(
        diagnostics
            .iter()
            .any(|diag| diag.code == "dropped-type-annotation"),
        "expected a dropped-annotation diagnostic, got {diagnostics:?}"
    );
}

#[test]
fn annot_on_field_array_component() {
    let (store, sym) = fixture();
    let def = store.class_def(sym).unwrap();
    let field = &def.fields[0];

    let view = field.annotated_type();
    assert_annots(&store, &view, &[]);
    assert_annots(&store, &view.array_component().unwrap(), &[a(&store)]);
}

#[test]
fn attachment_is_idempotent_across_stores() {
    // Two independent resolutions of the same class place annotations
    // identically (value equality of placements, not object identity).
    let (store_a, sym_a) = fixture();
    let (store_b, sym_b) = fixture();

    let sig_a = sig_of(&store_a, sym_a, "abOnReturn");
    let sig_b = sig_of(&store_b, sym_b, "abOnReturn");

    let annots_a = sig_a.return_type().annotations(&store_a);
    let annots_b = sig_b.return_type().annotations(&store_b);
    assert_eq!(annots_a.len(), annots_b.len());
    // The annotation types resolve to the same binary names in both stores.
    for (ann_a, ann_b) in annots_a.iter().zip(&annots_b) {
        assert_eq!(
            store_a.class_name(ann_a.annotation_type),
            store_b.class_name(ann_b.annotation_type)
        );
    }
}
