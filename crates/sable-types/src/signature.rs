//! Translation from parsed class-file signatures into type mirrors.
//!
//! Names are resolved through the store (registering symbols as needed);
//! references to unlocatable classes degrade to [`Type::Error`] in place,
//! never to a failure of the surrounding translation.

use std::collections::HashMap;

use sable_classfile as cf;

use crate::annots::AnnotTable;
use crate::attach::{self, TypeParamAnnotRecords};
use crate::ids::TypeVarId;
use crate::mirror::{PrimitiveType, Type, WildcardBound};
use crate::store::{TypeParamDef, TypeStore};

/// Lexical scope of type-variable names during translation. Method scopes
/// extend (and shadow) their class scope.
#[derive(Debug, Clone, Default)]
pub struct TypeVarScope {
    map: HashMap<String, TypeVarId>,
}

impl TypeVarScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: TypeVarId) {
        self.map.insert(name.into(), id);
    }

    pub fn get(&self, name: &str) -> Option<TypeVarId> {
        self.map.get(name).copied()
    }

    pub(crate) fn child(&self) -> TypeVarScope {
        self.clone()
    }
}

/// A translated method signature.
#[derive(Debug, Clone)]
pub struct TranslatedMethod {
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub throws: Vec<Type>,
}

/// Translates a class signature: declares its type parameters (ids are
/// allocated before bounds are translated, so self-referential bounds like
/// `T extends Comparable<T>` resolve), then its supertypes.
pub fn class_sig_from_classfile(
    store: &TypeStore,
    outer: &TypeVarScope,
    sig: &cf::ClassSignature,
) -> (Vec<TypeVarId>, Option<Type>, Vec<Type>) {
    let (type_params, scope) = declare_type_params(
        store,
        outer,
        &sig.type_params,
        &TypeParamAnnotRecords::default(),
    );
    let (super_class, interfaces) = supertypes_from_sig(store, &scope, sig);
    (type_params, super_class, interfaces)
}

pub(crate) fn supertypes_from_sig(
    store: &TypeStore,
    scope: &TypeVarScope,
    sig: &cf::ClassSignature,
) -> (Option<Type>, Vec<Type>) {
    let super_class = Some(class_type_from_sig(store, scope, &sig.super_class));
    let interfaces = sig
        .interfaces
        .iter()
        .map(|iface| class_type_from_sig(store, scope, iface))
        .collect();
    (super_class, interfaces)
}

/// Translates a method signature against `outer` (the class scope). Method
/// type parameters shadow class type parameters of the same name. When the
/// signature's parameter count disagrees with the descriptor (compilers omit
/// synthetic parameters from signatures inconsistently), the descriptor's
/// erased parameter types win.
pub fn method_sig_from_classfile(
    store: &TypeStore,
    outer: &TypeVarScope,
    sig: &cf::MethodSignature,
    desc: &cf::MethodTypeDescriptor,
) -> TranslatedMethod {
    method_from_signature(store, outer, sig, desc, &TypeParamAnnotRecords::default()).0
}

pub(crate) fn method_from_signature(
    store: &TypeStore,
    outer: &TypeVarScope,
    sig: &cf::MethodSignature,
    desc: &cf::MethodTypeDescriptor,
    tp_records: &TypeParamAnnotRecords<'_>,
) -> (TranslatedMethod, TypeVarScope) {
    let (type_params, scope) = declare_type_params(store, outer, &sig.type_params, tp_records);

    let params = if sig.params.len() == desc.params.len() {
        sig.params
            .iter()
            .map(|param| ty_from_type_sig(store, &scope, param))
            .collect()
    } else {
        tracing::debug!(
            signature_arity = sig.params.len(),
            descriptor_arity = desc.params.len(),
            "signature/descriptor parameter mismatch; using erased descriptor types"
        );
        desc.params
            .iter()
            .map(|param| ty_from_descriptor(store, param))
            .collect()
    };

    let return_type = match &sig.return_type {
        Some(ret) => ty_from_type_sig(store, &scope, ret),
        None => Type::Void,
    };

    let throws = sig
        .throws
        .iter()
        .map(|thrown| ty_from_field_sig(store, &scope, thrown))
        .collect();

    (
        TranslatedMethod {
            type_params,
            params,
            return_type,
            throws,
        },
        scope,
    )
}

/// Allocates ids for all parameters first, extends the scope, then
/// translates each parameter's bounds in that scope and fills the
/// definitions in. Bound annotations (if any) are mapped onto the declared
/// bounds by bound index, where index 0 is the class-bound slot.
pub(crate) fn declare_type_params(
    store: &TypeStore,
    outer: &TypeVarScope,
    params: &[cf::TypeParameter],
    records: &TypeParamAnnotRecords<'_>,
) -> (Vec<TypeVarId>, TypeVarScope) {
    let mut scope = outer.child();
    let ids: Vec<TypeVarId> = params
        .iter()
        .map(|param| {
            let id = store.reserve_type_param(&param.name);
            scope.insert(param.name.clone(), id);
            id
        })
        .collect();

    for (index, (param, &id)) in params.iter().zip(&ids).enumerate() {
        let class_bound = param
            .class_bound
            .as_ref()
            .map(|bound| ty_from_field_sig(store, &scope, bound));
        let mut class_bound_present = class_bound.is_some();

        let mut upper_bounds: Vec<Type> = class_bound
            .into_iter()
            .chain(
                param
                    .interface_bounds
                    .iter()
                    .map(|bound| ty_from_field_sig(store, &scope, bound)),
            )
            .collect();
        if upper_bounds.is_empty() {
            upper_bounds.push(Type::class(store.well_known().object, vec![]));
            class_bound_present = true;
        }

        let mut bound_annots: Vec<AnnotTable> =
            upper_bounds.iter().map(|_| AnnotTable::new()).collect();

        let annotations = records
            .own
            .iter()
            .filter(|(param_index, _)| *param_index as usize == index)
            .map(|(_, annotation)| attach::convert_annotation(store, annotation))
            .collect();

        for (param_index, bound_index, raw_path, annotation) in &records.bounds {
            if *param_index as usize != index {
                continue;
            }
            // Bound index 0 is reserved for the class bound; with
            // interface-only bounds the first interface is index 1.
            let slot = if class_bound_present {
                Some(*bound_index as usize)
            } else {
                (*bound_index as usize).checked_sub(1)
            };
            match slot {
                Some(slot) if slot < upper_bounds.len() => {
                    attach::attach(
                        store,
                        &mut bound_annots[slot],
                        &upper_bounds[slot],
                        raw_path,
                        annotation,
                        "type parameter bound",
                    );
                }
                _ => {
                    attach::drop_with_diagnostic(
                        store,
                        annotation,
                        &format!(
                            "bound index {bound_index} does not exist on type parameter {}",
                            param.name
                        ),
                    );
                }
            }
        }

        store.init_type_param(
            id,
            TypeParamDef::with_details(
                param.name.clone(),
                upper_bounds,
                None,
                annotations,
                bound_annots,
                class_bound_present,
            ),
        );
    }

    (ids, scope)
}

pub fn ty_from_field_sig(store: &TypeStore, scope: &TypeVarScope, sig: &cf::ReferenceSig) -> Type {
    match sig {
        cf::ReferenceSig::Class(class) => class_type_from_sig(store, scope, class),
        cf::ReferenceSig::Array(component) => {
            Type::array(ty_from_type_sig(store, scope, component))
        }
        cf::ReferenceSig::TypeVar(name) => match scope.get(name) {
            Some(id) => Type::TypeVar(id),
            None => {
                tracing::debug!(name = %name, "type variable not in scope");
                Type::Error
            }
        },
    }
}

pub(crate) fn ty_from_type_sig(store: &TypeStore, scope: &TypeVarScope, sig: &cf::TypeSig) -> Type {
    match sig {
        cf::TypeSig::Primitive(kind) => Type::Primitive(primitive_from_classfile(*kind)),
        cf::TypeSig::Reference(reference) => ty_from_field_sig(store, scope, reference),
    }
}

fn class_type_from_sig(
    store: &TypeStore,
    scope: &TypeVarScope,
    sig: &cf::ClassTypeSignature,
) -> Type {
    let name = sig.flattened_name();
    let id = store.get_class_symbol(&name);
    if store.is_unresolved(id) {
        return Type::Error;
    }

    // Nested segments flatten into one symbol; their arguments concatenate
    // outer-to-inner, matching the flattened symbol's parameter order.
    let mut args: Vec<Type> = Vec::new();
    for segment in &sig.segments {
        for arg in &segment.args {
            args.push(type_argument(store, scope, arg));
        }
    }

    // A nested use may spell the outer type raw (`Outer.Inner<U>` inside a
    // non-generic context): pad the missing leading arguments with Unknown
    // so the argument list lines up with the flattened declaration. A fully
    // raw use (no arguments at all) stays raw.
    if !args.is_empty() {
        if let Some(expected) = store.arity_hint(id) {
            if args.len() < expected {
                let mut padded = vec![Type::Unknown; expected - args.len()];
                padded.extend(args);
                args = padded;
            }
        }
    }

    Type::class(id, args)
}

fn type_argument(store: &TypeStore, scope: &TypeVarScope, arg: &cf::TypeArgument) -> Type {
    match arg {
        cf::TypeArgument::Unbounded => Type::Wildcard(WildcardBound::Unbounded),
        cf::TypeArgument::Exact(sig) => ty_from_field_sig(store, scope, sig),
        cf::TypeArgument::Extends(sig) => Type::Wildcard(WildcardBound::Extends(Box::new(
            ty_from_field_sig(store, scope, sig),
        ))),
        cf::TypeArgument::Super(sig) => Type::Wildcard(WildcardBound::Super(Box::new(
            ty_from_field_sig(store, scope, sig),
        ))),
    }
}

pub(crate) fn ty_from_descriptor(store: &TypeStore, desc: &cf::TypeDescriptor) -> Type {
    match desc {
        cf::TypeDescriptor::Primitive(kind) => Type::Primitive(primitive_from_classfile(*kind)),
        cf::TypeDescriptor::Object(name) => class_ref(store, name),
        cf::TypeDescriptor::Array(component) => Type::array(ty_from_descriptor(store, component)),
    }
}

/// A raw (argument-free) reference to a named class; unresolved names
/// degrade to the error sentinel.
pub(crate) fn class_ref(store: &TypeStore, name: &str) -> Type {
    let id = store.get_class_symbol(name);
    if store.is_unresolved(id) {
        Type::Error
    } else {
        Type::class(id, vec![])
    }
}

pub(crate) fn primitive_from_classfile(kind: cf::PrimitiveKind) -> PrimitiveType {
    match kind {
        cf::PrimitiveKind::Boolean => PrimitiveType::Boolean,
        cf::PrimitiveKind::Byte => PrimitiveType::Byte,
        cf::PrimitiveKind::Short => PrimitiveType::Short,
        cf::PrimitiveKind::Char => PrimitiveType::Char,
        cf::PrimitiveKind::Int => PrimitiveType::Int,
        cf::PrimitiveKind::Long => PrimitiveType::Long,
        cf::PrimitiveKind::Float => PrimitiveType::Float,
        cf::PrimitiveKind::Double => PrimitiveType::Double,
    }
}
