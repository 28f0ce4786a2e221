use crate::annotation::{Annotation, TypeAnnotation};
use crate::classfile::{ClassFile, ClassMember};
use crate::descriptor::{
    parse_field_descriptor, parse_method_descriptor, MethodTypeDescriptor, TypeDescriptor,
};
use crate::signature::{
    parse_class_signature, parse_field_signature, parse_method_signature, ClassSignature,
    MethodSignature, ReferenceSig,
};

/// A class file reduced to the shape the type system consumes: parsed
/// descriptors plus parsed generic signatures where they exist.
///
/// Signature parsing is per-member recoverable: a malformed signature drops
/// only that member's generic refinement (its descriptor still describes the
/// erased shape) and records a note in `diagnostics`. Nothing here fails the
/// class as a whole except an unreadable class-file structure itself.
#[derive(Debug, Clone)]
pub struct ClassStub {
    pub internal_name: String,
    pub access_flags: u16,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<ClassSignature>,
    pub annotations: Vec<Annotation>,
    pub type_annotations: Vec<TypeAnnotation>,
    pub fields: Vec<FieldStub>,
    pub methods: Vec<MethodStub>,
    /// Human-readable notes about dropped generic refinements.
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FieldStub {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub signature: Option<ReferenceSig>,
    pub annotations: Vec<Annotation>,
    pub type_annotations: Vec<TypeAnnotation>,
}

#[derive(Debug, Clone)]
pub struct MethodStub {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: MethodTypeDescriptor,
    pub signature: Option<MethodSignature>,
    /// Internal names from the `Exceptions` attribute.
    pub exceptions: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub type_annotations: Vec<TypeAnnotation>,
}

impl ClassStub {
    pub fn from_classfile(class: &ClassFile) -> crate::error::Result<Self> {
        let mut diagnostics = Vec::new();

        let signature = match class.signature.as_deref() {
            Some(sig) => match parse_class_signature(sig) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    diagnostics.push(format!(
                        "dropping class signature of {}: {err}",
                        class.this_class
                    ));
                    None
                }
            },
            None => None,
        };

        let mut fields = Vec::with_capacity(class.fields.len());
        for member in &class.fields {
            fields.push(field_stub(&class.this_class, member, &mut diagnostics)?);
        }

        let mut methods = Vec::with_capacity(class.methods.len());
        for member in &class.methods {
            methods.push(method_stub(&class.this_class, member, &mut diagnostics)?);
        }

        Ok(ClassStub {
            internal_name: class.this_class.clone(),
            access_flags: class.access_flags,
            super_class: class.super_class.clone(),
            interfaces: class.interfaces.clone(),
            signature,
            annotations: class.annotations.clone(),
            type_annotations: class.type_annotations.clone(),
            fields,
            methods,
            diagnostics,
        })
    }
}

fn field_stub(
    owner: &str,
    member: &ClassMember,
    diagnostics: &mut Vec<String>,
) -> crate::error::Result<FieldStub> {
    let descriptor = parse_field_descriptor(&member.descriptor)?;
    let signature = match member.signature.as_deref() {
        Some(sig) => match parse_field_signature(sig) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                diagnostics.push(format!(
                    "dropping signature of field {owner}.{}: {err}",
                    member.name
                ));
                None
            }
        },
        None => None,
    };

    Ok(FieldStub {
        access_flags: member.access_flags,
        name: member.name.clone(),
        descriptor,
        signature,
        annotations: member.annotations.clone(),
        type_annotations: member.type_annotations.clone(),
    })
}

fn method_stub(
    owner: &str,
    member: &ClassMember,
    diagnostics: &mut Vec<String>,
) -> crate::error::Result<MethodStub> {
    let descriptor = parse_method_descriptor(&member.descriptor)?;
    let signature = match member.signature.as_deref() {
        Some(sig) => match parse_method_signature(sig) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                diagnostics.push(format!(
                    "dropping signature of method {owner}.{}: {err}",
                    member.name
                ));
                None
            }
        },
        None => None,
    };

    Ok(MethodStub {
        access_flags: member.access_flags,
        name: member.name.clone(),
        descriptor,
        signature,
        exceptions: member.exceptions.clone(),
        annotations: member.annotations.clone(),
        type_annotations: member.type_annotations.clone(),
    })
}

impl ClassFile {
    pub fn stub(&self) -> crate::error::Result<ClassStub> {
        ClassStub::from_classfile(self)
    }
}
