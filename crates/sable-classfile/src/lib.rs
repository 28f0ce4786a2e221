//! Reader for compiled Java class files.
//!
//! Parses the structural attributes the analysis core needs: constant pool,
//! descriptors, generic signatures (JVMS 4.7.9.1), annotations, and the
//! type-annotation attributes with their `target_info` and `type_path`
//! encodings. No code attributes, no verification.

#![forbid(unsafe_code)]

mod annotation;
mod classfile;
mod constant_pool;
mod descriptor;
mod error;
mod reader;
mod signature;
mod stub;

pub use crate::annotation::{
    descriptor_to_internal_name, Annotation, ConstValue, ElementValue, RawTypePathStep,
    TargetInfo, TypeAnnotation,
};
pub use crate::classfile::{ClassFile, ClassMember, InnerClassInfo};
pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::descriptor::{MethodTypeDescriptor, PrimitiveKind, TypeDescriptor};
pub use crate::error::{Error, Result};
pub use crate::signature::{
    parse_class_signature, parse_field_signature, parse_method_signature, ClassSignature,
    ClassTypeSegment, ClassTypeSignature, MethodSignature, ReferenceSig, TypeArgument,
    TypeParameter, TypeSig,
};
pub use crate::stub::{ClassStub, FieldStub, MethodStub};
