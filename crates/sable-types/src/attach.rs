//! Attachment of raw type-annotation records onto built mirrors.
//!
//! Attachment is pure post-processing: the mirror tree is already complete,
//! and each record's raw path is walked against it to find the node being
//! decorated. A record whose target or path does not match the tree's shape
//! (corrupt or adversarial input) is dropped with a diagnostic; the tree
//! itself stays valid.

use sable_classfile as cf;
use sable_core::Diagnostic;

use crate::annots::{AnnotTable, AnnotValue, TypeAnnot, TypePath, TypePathStep};
use crate::mirror::{ClassType, Type, WildcardBound};
use crate::store::{MethodTypeAnnots, TypeStore};

pub(crate) fn convert_annotation(store: &TypeStore, annotation: &cf::Annotation) -> TypeAnnot {
    let name = annotation
        .type_internal_name
        .as_deref()
        .unwrap_or(&annotation.type_descriptor);
    TypeAnnot {
        annotation_type: store.get_class_symbol(name),
        elements: annotation
            .elements
            .iter()
            .map(|(name, value)| (name.clone(), convert_value(store, value)))
            .collect(),
    }
}

pub(crate) fn convert_annotations(
    store: &TypeStore,
    annotations: &[cf::Annotation],
) -> Vec<TypeAnnot> {
    annotations
        .iter()
        .map(|annotation| convert_annotation(store, annotation))
        .collect()
}

fn convert_value(store: &TypeStore, value: &cf::ElementValue) -> AnnotValue {
    match value {
        cf::ElementValue::Const(constant) => AnnotValue::Const(constant.clone()),
        cf::ElementValue::Enum {
            type_descriptor,
            const_name,
        } => AnnotValue::EnumConst {
            type_name: cf::descriptor_to_internal_name(type_descriptor)
                .map(|name| name.replace('/', "."))
                .unwrap_or_else(|| type_descriptor.clone()),
            const_name: const_name.clone(),
        },
        cf::ElementValue::Class(descriptor) => AnnotValue::ClassLiteral(descriptor.clone()),
        cf::ElementValue::Annotation(nested) => {
            AnnotValue::Nested(Box::new(convert_annotation(store, nested)))
        }
        cf::ElementValue::Array(values) => AnnotValue::Array(
            values
                .iter()
                .map(|value| convert_value(store, value))
                .collect(),
        ),
    }
}

/// Walks `raw` from `root`, validating each step against the mirror's shape,
/// and returns the canonical path it lands on. Nested-type steps are
/// validated (the node must be a class use) but consumed in place, because
/// nested classes are flattened into a single node.
pub(crate) fn canonical_path(root: &Type, raw: &[cf::RawTypePathStep]) -> Option<TypePath> {
    let mut path = TypePath::root();
    let mut node = root;

    for step in raw {
        match step {
            cf::RawTypePathStep::Array => {
                let Type::Array(component) = node else {
                    return None;
                };
                node = component.as_ref();
                path.push(TypePathStep::Array);
            }
            cf::RawTypePathStep::Nested => {
                if !matches!(node, Type::Class(_)) {
                    return None;
                }
            }
            cf::RawTypePathStep::WildcardBound => {
                let bound = match node {
                    Type::Wildcard(WildcardBound::Extends(bound))
                    | Type::Wildcard(WildcardBound::Super(bound)) => bound,
                    _ => return None,
                };
                node = bound.as_ref();
                path.push(TypePathStep::WildcardBound);
            }
            cf::RawTypePathStep::TypeArgument(index) => {
                let Type::Class(ClassType { args, .. }) = node else {
                    return None;
                };
                node = args.get(*index as usize)?;
                path.push(TypePathStep::TypeArg(*index));
            }
        }
    }

    Some(path)
}

/// Attaches one annotation into `table` at the position `raw` addresses
/// within `root`, or drops it with a diagnostic if the path does not fit.
pub(crate) fn attach(
    store: &TypeStore,
    table: &mut AnnotTable,
    root: &Type,
    raw: &[cf::RawTypePathStep],
    annotation: &cf::Annotation,
    position: &str,
) {
    match canonical_path(root, raw) {
        Some(path) => table.push(path, convert_annotation(store, annotation)),
        None => drop_with_diagnostic(
            store,
            annotation,
            &format!("type path does not match the {position} type's shape"),
        ),
    }
}

pub(crate) fn drop_with_diagnostic(
    store: &TypeStore,
    annotation: &cf::Annotation,
    reason: &str,
) {
    tracing::debug!(annotation = %annotation.type_descriptor, reason, "dropping type annotation");
    store.push_diagnostic(Diagnostic::warning(
        "dropped-type-annotation",
        format!("dropping {}: {reason}", annotation.type_descriptor),
        None,
    ));
}

/// Which declaration's type parameters a record set may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetScope {
    Class,
    Method,
}

/// Type-parameter-targeted records of one declaration, grouped for
/// [`crate::signature::declare_type_params`].
#[derive(Debug, Default)]
pub(crate) struct TypeParamAnnotRecords<'a> {
    /// `(parameter index, annotation)` — annotations on the parameter itself.
    pub(crate) own: Vec<(u8, &'a cf::Annotation)>,
    /// `(parameter index, bound index, path, annotation)`.
    pub(crate) bounds: Vec<(u8, u8, &'a [cf::RawTypePathStep], &'a cf::Annotation)>,
}

pub(crate) fn collect_type_param_records<'a>(
    store: &TypeStore,
    records: &'a [cf::TypeAnnotation],
    scope: TargetScope,
) -> TypeParamAnnotRecords<'a> {
    let mut out = TypeParamAnnotRecords::default();
    for record in records {
        match (scope, record.target) {
            (TargetScope::Class, cf::TargetInfo::ClassTypeParameter { index })
            | (TargetScope::Method, cf::TargetInfo::MethodTypeParameter { index }) => {
                if record.path.is_empty() {
                    out.own.push((index, &record.annotation));
                } else {
                    drop_with_diagnostic(
                        store,
                        &record.annotation,
                        "type parameter targets take no type path",
                    );
                }
            }
            (TargetScope::Class, cf::TargetInfo::ClassTypeParameterBound { index, bound })
            | (TargetScope::Method, cf::TargetInfo::MethodTypeParameterBound { index, bound }) => {
                out.bounds
                    .push((index, bound, record.path.as_slice(), &record.annotation));
            }
            _ => {}
        }
    }
    out
}

/// Builds the per-position tables of one method from its records. Parameter
/// and throws tables are parallel to the given lists; records addressing a
/// position that does not exist are dropped with a diagnostic.
pub(crate) fn method_tables(
    store: &TypeStore,
    records: &[cf::TypeAnnotation],
    params: &[Type],
    return_type: &Type,
    throws: &[Type],
    receiver: &Type,
) -> MethodTypeAnnots {
    let mut tables = MethodTypeAnnots {
        params: params.iter().map(|_| AnnotTable::new()).collect(),
        ret: AnnotTable::new(),
        throws: throws.iter().map(|_| AnnotTable::new()).collect(),
        receiver: AnnotTable::new(),
    };

    for record in records {
        match record.target {
            cf::TargetInfo::FormalParameter { index } => {
                let index = index as usize;
                match params.get(index) {
                    Some(param) => attach(
                        store,
                        &mut tables.params[index],
                        param,
                        &record.path,
                        &record.annotation,
                        "parameter",
                    ),
                    None => drop_with_diagnostic(
                        store,
                        &record.annotation,
                        &format!("formal parameter {index} does not exist"),
                    ),
                }
            }
            cf::TargetInfo::MethodReturn => {
                attach(
                    store,
                    &mut tables.ret,
                    return_type,
                    &record.path,
                    &record.annotation,
                    "return",
                );
            }
            cf::TargetInfo::Throws { index } => {
                let index = index as usize;
                match throws.get(index) {
                    Some(thrown) => attach(
                        store,
                        &mut tables.throws[index],
                        thrown,
                        &record.path,
                        &record.annotation,
                        "throws",
                    ),
                    None => drop_with_diagnostic(
                        store,
                        &record.annotation,
                        &format!("throws index {index} does not exist"),
                    ),
                }
            }
            cf::TargetInfo::MethodReceiver => {
                attach(
                    store,
                    &mut tables.receiver,
                    receiver,
                    &record.path,
                    &record.annotation,
                    "receiver",
                );
            }
            // Handled by `declare_type_params` during translation.
            cf::TargetInfo::MethodTypeParameter { .. }
            | cf::TargetInfo::MethodTypeParameterBound { .. } => {}
            cf::TargetInfo::ClassTypeParameter { .. }
            | cf::TargetInfo::ClassTypeParameterBound { .. }
            | cf::TargetInfo::Field => {
                drop_with_diagnostic(
                    store,
                    &record.annotation,
                    "class- or field-scoped target on a method",
                );
            }
        }
    }

    tables
}
