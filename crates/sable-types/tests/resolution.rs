//! Symbol resolution through a provider: interning, cyclic references,
//! unresolved-name degradation, provenance.

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use sable_classfile::{
    parse_class_signature, parse_field_descriptor, parse_method_descriptor, parse_method_signature,
    ClassStub, FieldStub, MethodStub,
};
use sable_core::Span;
use sable_types::{Origin, Type, TypeDefStub, TypeProvider, TypeStore};

struct StubProvider(HashMap<String, TypeDefStub>);

impl TypeProvider for StubProvider {
    fn lookup_type(&self, binary_name: &str) -> Option<TypeDefStub> {
        self.0.get(binary_name).cloned()
    }
}

fn class_stub(internal_name: &str, super_class: Option<&str>) -> ClassStub {
    ClassStub {
        internal_name: internal_name.to_string(),
        access_flags: 0x0021,
        super_class: super_class.map(str::to_string),
        interfaces: vec![],
        signature: None,
        annotations: vec![],
        type_annotations: vec![],
        fields: vec![],
        methods: vec![],
        diagnostics: vec![],
    }
}

fn method_stub(name: &str, descriptor: &str, signature: Option<&str>) -> MethodStub {
    MethodStub {
        access_flags: 0x0001,
        name: name.to_string(),
        descriptor: parse_method_descriptor(descriptor).unwrap(),
        signature: signature.map(|sig| parse_method_signature(sig).unwrap()),
        exceptions: vec![],
        annotations: vec![],
        type_annotations: vec![],
    }
}

fn store_with(classes: Vec<(&str, TypeDefStub)>) -> TypeStore {
    let map = classes
        .into_iter()
        .map(|(name, stub)| (name.to_string(), stub))
        .collect();
    TypeStore::with_provider(Box::new(StubProvider(map)))
}

#[test]
fn resolving_twice_returns_the_interned_symbol() {
    let store = store_with(vec![(
        "com.example.Once",
        TypeDefStub::binary(class_stub("com/example/Once", Some("java/lang/Object"))),
    )]);

    let first = store.get_class_symbol("com.example.Once");
    let second = store.get_class_symbol("com/example/Once");
    assert_eq!(first, second);

    // Object identity of the populated definition, value equality of the
    // canonical type.
    let def_a = store.class_def(first).unwrap();
    let def_b = store.class_def(second).unwrap();
    assert!(Arc::ptr_eq(&def_a, &def_b));
    assert_eq!(store.declaration(first), store.declaration(second));
}

#[test]
fn unresolved_supertype_degrades_to_one_error_node() {
    let store = store_with(vec![(
        "com.example.Sub",
        TypeDefStub::binary(class_stub("com/example/Sub", Some("com/missing/Gone"))),
    )]);

    let sub = store.get_class_symbol("com.example.Sub");
    let def = store.class_def(sub).unwrap();

    // The tree is complete and traversable with exactly the supertype
    // position degraded.
    assert_eq!(def.super_class, Some(Type::Error));
    assert!(!store.is_unresolved(sub));

    // The missing name itself still interned a placeholder with empty
    // members, so traversal code needs no absence branch.
    let gone = store.get_class_symbol("com.missing.Gone");
    assert!(store.is_unresolved(gone));
    assert_eq!(store.origin(gone), Some(Origin::Unresolved));
    assert!(store.class_def(gone).unwrap().methods.is_empty());
}

#[test]
fn mutually_referential_classes_resolve() {
    // class A extends B { }  /  class B { A make(); }
    let b_methods = ClassStub {
        methods: vec![method_stub("make", "()Lcom/example/A;", None)],
        ..class_stub("com/example/B", Some("java/lang/Object"))
    };
    let store = store_with(vec![
        (
            "com.example.A",
            TypeDefStub::binary(class_stub("com/example/A", Some("com/example/B"))),
        ),
        ("com.example.B", TypeDefStub::binary(b_methods)),
    ]);

    let a = store.get_class_symbol("com.example.A");
    let a_def = store.class_def(a).unwrap();
    let b = store.class_id("com.example.B").unwrap();
    assert_eq!(a_def.super_class, Some(Type::class(b, vec![])));

    let b_def = store.class_def(b).unwrap();
    assert_eq!(b_def.methods[0].return_type, Type::class(a, vec![]));
}

#[test]
fn generic_class_resolves_and_substitutes_through_views() {
    let stub = ClassStub {
        signature: Some(
            parse_class_signature("<T:Ljava/lang/Object;>Ljava/lang/Object;").unwrap(),
        ),
        fields: vec![FieldStub {
            access_flags: 0,
            name: "value".to_string(),
            descriptor: parse_field_descriptor("Ljava/lang/Object;").unwrap(),
            signature: Some(sable_classfile::parse_field_signature("TT;").unwrap()),
            annotations: vec![],
            type_annotations: vec![],
        }],
        methods: vec![method_stub(
            "get",
            "()Ljava/lang/Object;",
            Some("()TT;"),
        )],
        ..class_stub("com/example/Box", Some("java/lang/Object"))
    };
    let store = store_with(vec![("com.example.Box", TypeDefStub::binary(stub))]);

    let boxed = store.get_class_symbol("com.example.Box");
    let def = store.class_def(boxed).unwrap();
    let t = def.type_params[0];
    assert_eq!(def.fields[0].ty, Type::TypeVar(t));

    // Seen from the generic self type, `get` returns T itself.
    let self_sig = store.method_named(&store.declaration(boxed), "get").unwrap();
    assert_eq!(self_sig.return_type().ty(), &Type::TypeVar(t));

    // Seen from Box<String>, it returns String.
    let string = Type::class(store.well_known().string, vec![]);
    let viewed = store
        .method_named(&Type::class(boxed, vec![string.clone()]), "get")
        .unwrap();
    assert_eq!(viewed.return_type().ty(), &string);
}

#[test]
fn class_kind_and_modifiers_come_from_access_flags() {
    let iface = ClassStub {
        access_flags: 0x0601, // public abstract interface
        ..class_stub("com/example/Iface", Some("java/lang/Object"))
    };
    let store = store_with(vec![("com.example.Iface", TypeDefStub::binary(iface))]);

    let id = store.get_class_symbol("com.example.Iface");
    let def = store.class_def(id).unwrap();
    assert_eq!(def.kind, sable_types::ClassKind::Interface);
    assert_eq!(def.modifiers, 0x0601);
}

#[test]
fn constructors_are_split_from_methods_and_clinit_dropped() {
    let stub = ClassStub {
        methods: vec![
            method_stub("<init>", "()V", None),
            method_stub("<clinit>", "()V", None),
            method_stub("run", "()V", None),
        ],
        ..class_stub("com/example/Ctors", Some("java/lang/Object"))
    };
    let store = store_with(vec![("com.example.Ctors", TypeDefStub::binary(stub))]);

    let def = store
        .class_def(store.get_class_symbol("com.example.Ctors"))
        .unwrap();
    assert_eq!(def.constructors.len(), 1);
    assert_eq!(def.constructors[0].name, "<init>");
    assert_eq!(def.methods.len(), 1);
    assert_eq!(def.methods[0].name, "run");
}

#[test]
fn source_backed_symbols_expose_their_span() {
    let store = store_with(vec![(
        "com.example.Local",
        TypeDefStub::source(
            class_stub("com/example/Local", Some("java/lang/Object")),
            Span::new(120, 480),
        ),
    )]);

    let local = store.get_class_symbol("com.example.Local");
    assert_eq!(store.origin(local), Some(Origin::Source));
    assert_eq!(store.span(local), Some(Span::new(120, 480)));

    // Binary-backed builtins have no provenance.
    assert_eq!(store.span(store.well_known().object), None);
}

#[test]
fn stub_diagnostics_surface_through_the_store() {
    let stub = ClassStub {
        diagnostics: vec!["dropping signature of method com/example/Bad.m: oops".to_string()],
        ..class_stub("com/example/Bad", Some("java/lang/Object"))
    };
    let store = store_with(vec![("com.example.Bad", TypeDefStub::binary(stub))]);

    let bad = store.get_class_symbol("com.example.Bad");
    let _ = store.class_def(bad).unwrap();

    let diagnostics = store.take_diagnostics();
    assert!(diagnostics
        .iter()
        .any(|diag| diag.code == "malformed-signature"));
    // Draining empties the sink.
    assert!(store.take_diagnostics().is_empty());
}

#[test]
fn concurrent_first_lookups_intern_one_canonical_symbol() {
    let store = store_with(vec![
        (
            "com.example.A",
            TypeDefStub::binary(class_stub("com/example/A", Some("com/example/B"))),
        ),
        (
            "com.example.B",
            TypeDefStub::binary(class_stub("com/example/B", Some("com/example/A"))),
        ),
    ]);

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = &store;
                scope.spawn(move || {
                    // Half the workers start from A, half from B, so both
                    // population orders race.
                    let name = if worker % 2 == 0 {
                        "com.example.A"
                    } else {
                        "com.example.B"
                    };
                    let id = store.get_class_symbol(name);
                    let def = store.class_def(id).unwrap();
                    (name, id, def)
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    for (name, id, def) in &results {
        for (other_name, other_id, other_def) in &results {
            if name == other_name {
                assert_eq!(id, other_id);
                assert!(Arc::ptr_eq(def, other_def));
            }
        }
    }
}

#[test]
fn provider_misses_do_not_abort_sibling_resolution() {
    let stub = ClassStub {
        interfaces: vec!["com/missing/Iface".to_string()],
        methods: vec![method_stub("ok", "()Ljava/lang/String;", None)],
        ..class_stub("com/example/Partial", Some("java/lang/Object"))
    };
    let store = store_with(vec![("com.example.Partial", TypeDefStub::binary(stub))]);

    let partial = store.get_class_symbol("com.example.Partial");
    let def = store.class_def(partial).unwrap();

    assert_eq!(def.interfaces, vec![Type::Error]);
    // Sibling members resolved normally.
    assert_eq!(
        def.methods[0].return_type,
        Type::class(store.well_known().string, vec![])
    );
}
