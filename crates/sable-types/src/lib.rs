//! The symbol-and-type core: canonical, generics-aware mirrors of Java
//! classes, resolved identically whether a class comes from source-backed
//! declarations or compiled bytes on the classpath.
//!
//! Entry point is [`TypeStore`]: it interns one canonical symbol per binary
//! name, populates definitions lazily through a [`TypeProvider`], and owns
//! the substitution memo. Mirrors are plain values ([`Type`]); type-use
//! annotations live in side tables addressed by position and are read
//! through [`AnnotatedType`] views.

#![forbid(unsafe_code)]

mod annots;
mod attach;
mod capture;
mod ids;
mod loader;
mod methods;
mod mirror;
mod signature;
mod store;
mod subst;

pub use crate::annots::{AnnotTable, AnnotValue, AnnotatedType, TypeAnnot, TypePath, TypePathStep};
pub use crate::capture::TyContext;
pub use crate::ids::{ClassId, TypeVarId};
pub use crate::loader::{TypeDefStub, TypeProvider};
pub use crate::methods::MethodSig;
pub use crate::mirror::{ClassType, PrimitiveType, Type, WildcardBound};
pub use crate::signature::{
    class_sig_from_classfile, method_sig_from_classfile, ty_from_field_sig, TranslatedMethod,
    TypeVarScope,
};
pub use crate::store::{
    ClassDef, ClassHeader, ClassKind, FieldDef, MethodDef, MethodTypeAnnots, Origin, TypeEnv,
    TypeParamDef, TypeStore, WellKnownTypes,
};
pub use crate::subst::{glb, make_intersection, substitute, Substitution};
