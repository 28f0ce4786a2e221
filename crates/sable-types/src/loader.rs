//! Lazy population of class symbols from raw stubs.
//!
//! The store pulls definitions through [`TypeProvider`] — implemented by the
//! classpath index, or by anything that can produce a [`TypeDefStub`] — and
//! translates them here. Header population (own type parameters) never
//! touches other classes' state beyond registering their names; member
//! population may read other classes' headers but never their members, which
//! is what makes mutually-recursive classes resolve without deadlock.

use std::sync::{Arc, Mutex};

use sable_classfile as cf;
use sable_core::{Diagnostic, Span};

use crate::annots::AnnotTable;
use crate::attach::{self, TargetScope};
use crate::ids::ClassId;
use crate::mirror::Type;
use crate::signature::{self, TranslatedMethod, TypeVarScope};
use crate::store::{
    ClassDef, ClassHeader, ClassKind, FieldDef, MethodDef, Origin, TypeStore,
};

/// Boundary through which the store locates raw definitions. Absence is a
/// normal outcome (an unresolved third-party dependency), not an error.
pub trait TypeProvider: Send + Sync {
    fn lookup_type(&self, binary_name: &str) -> Option<TypeDefStub>;
}

/// A raw class definition handed to the store: the parsed class-file stub,
/// plus a provenance span when the declaration is source-backed.
#[derive(Debug, Clone)]
pub struct TypeDefStub {
    pub class: cf::ClassStub,
    pub span: Option<Span>,
}

impl TypeDefStub {
    pub fn binary(class: cf::ClassStub) -> Self {
        Self { class, span: None }
    }

    pub fn source(class: cf::ClassStub, span: Span) -> Self {
        Self {
            class,
            span: Some(span),
        }
    }
}

pub(crate) fn populate_header(
    store: &TypeStore,
    stub: &Mutex<Option<TypeDefStub>>,
) -> ClassHeader {
    let (signature, access_flags, records) = {
        let guard = stub.lock().expect("lock poisoned");
        match guard.as_ref() {
            Some(pending) => (
                pending.class.signature.clone(),
                pending.class.access_flags,
                pending.class.type_annotations.clone(),
            ),
            // Entries built via `add_class` or the unresolved path have
            // their header preset; an empty header is the safe default.
            None => {
                return ClassHeader {
                    kind: ClassKind::Class,
                    modifiers: 0,
                    type_params: Vec::new(),
                }
            }
        }
    };

    let type_params = match &signature {
        Some(class_sig) if !class_sig.type_params.is_empty() => {
            let tp_records =
                attach::collect_type_param_records(store, &records, TargetScope::Class);
            let (ids, _scope) = signature::declare_type_params(
                store,
                &TypeVarScope::new(),
                &class_sig.type_params,
                &tp_records,
            );
            ids
        }
        _ => Vec::new(),
    };

    ClassHeader {
        kind: ClassKind::from_flags(access_flags),
        modifiers: access_flags,
        type_params,
    }
}

pub(crate) fn populate_members(
    store: &TypeStore,
    id: ClassId,
    name: &str,
    header: &ClassHeader,
    stub: &Mutex<Option<TypeDefStub>>,
    origin: Origin,
    span: Option<Span>,
) -> ClassDef {
    let taken = stub.lock().expect("lock poisoned").take();
    let Some(TypeDefStub { class, .. }) = taken else {
        return ClassDef::unresolved(name.to_string());
    };
    tracing::debug!(class = %name, "populating class members");

    for note in &class.diagnostics {
        store.push_diagnostic(Diagnostic::warning("malformed-signature", note.clone(), span));
    }

    let mut scope = TypeVarScope::new();
    for &tp in &header.type_params {
        if let Some(param) = store.type_param(tp) {
            scope.insert(param.name.clone(), tp);
        }
    }

    let (super_class, interfaces) = match &class.signature {
        Some(class_sig) => signature::supertypes_from_sig(store, &scope, class_sig),
        None => (
            class
                .super_class
                .as_deref()
                .map(|super_name| signature::class_ref(store, super_name)),
            class
                .interfaces
                .iter()
                .map(|iface| signature::class_ref(store, iface))
                .collect(),
        ),
    };

    let fields = class
        .fields
        .iter()
        .map(|field| translate_field(store, &scope, field))
        .collect();

    // The receiver type of every instance method is the declaring class's
    // generic self type.
    let self_type = Type::class(
        id,
        header.type_params.iter().map(|&tp| Type::TypeVar(tp)).collect(),
    );

    let mut constructors = Vec::new();
    let mut methods = Vec::new();
    for method in &class.methods {
        if method.name == "<clinit>" {
            continue;
        }
        let translated = translate_method(store, &scope, method, &self_type);
        if method.name == "<init>" {
            constructors.push(translated);
        } else {
            methods.push(translated);
        }
    }

    ClassDef {
        name: name.to_string(),
        kind: header.kind,
        modifiers: header.modifiers,
        type_params: header.type_params.clone(),
        super_class,
        interfaces,
        fields,
        constructors,
        methods,
        annotations: attach::convert_annotations(store, &class.annotations),
        origin,
        span,
    }
}

fn translate_field(store: &TypeStore, scope: &TypeVarScope, field: &cf::FieldStub) -> FieldDef {
    let ty = match &field.signature {
        Some(sig) => signature::ty_from_field_sig(store, scope, sig),
        None => signature::ty_from_descriptor(store, &field.descriptor),
    };

    let mut type_annots = AnnotTable::new();
    for record in &field.type_annotations {
        match record.target {
            cf::TargetInfo::Field => attach::attach(
                store,
                &mut type_annots,
                &ty,
                &record.path,
                &record.annotation,
                "field",
            ),
            _ => attach::drop_with_diagnostic(
                store,
                &record.annotation,
                "non-field target on a field",
            ),
        }
    }

    FieldDef {
        name: field.name.clone(),
        ty,
        modifiers: field.access_flags,
        annotations: attach::convert_annotations(store, &field.annotations),
        type_annots,
    }
}

fn translate_method(
    store: &TypeStore,
    class_scope: &TypeVarScope,
    method: &cf::MethodStub,
    self_type: &Type,
) -> MethodDef {
    let tp_records =
        attach::collect_type_param_records(store, &method.type_annotations, TargetScope::Method);

    let translated = match &method.signature {
        Some(sig) => {
            signature::method_from_signature(store, class_scope, sig, &method.descriptor, &tp_records)
                .0
        }
        None => TranslatedMethod {
            type_params: Vec::new(),
            params: method
                .descriptor
                .params
                .iter()
                .map(|param| signature::ty_from_descriptor(store, param))
                .collect(),
            return_type: method
                .descriptor
                .return_type
                .as_ref()
                .map(|ret| signature::ty_from_descriptor(store, ret))
                .unwrap_or(Type::Void),
            throws: Vec::new(),
        },
    };

    // Non-generic throws clauses live in the Exceptions attribute only; a
    // signature carries them only when a generic refinement exists.
    let throws = if translated.throws.is_empty() {
        method
            .exceptions
            .iter()
            .map(|exception| signature::class_ref(store, exception))
            .collect()
    } else {
        translated.throws
    };

    let type_annots = attach::method_tables(
        store,
        &method.type_annotations,
        &translated.params,
        &translated.return_type,
        &throws,
        self_type,
    );

    MethodDef {
        name: method.name.clone(),
        modifiers: method.access_flags,
        type_params: translated.type_params,
        params: translated.params,
        return_type: translated.return_type,
        throws,
        annotations: attach::convert_annotations(store, &method.annotations),
        type_annots: Arc::new(type_annots),
    }
}
