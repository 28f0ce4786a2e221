//! Type-use annotations and their attachment model.
//!
//! Mirrors stay immutable and annotation-free; annotations live in side
//! tables keyed by the canonical path of the sub-position they decorate
//! within an owning root (a parameter type, a return type, a bound, …).
//! Because substitution only ever replaces leaf nodes, those paths stay
//! valid in derived mirrors and placement is carried along for free.

use crate::ids::ClassId;
use crate::mirror::{ClassType, Type, WildcardBound};
use crate::store::TypeEnv;

/// A resolved annotation instance: the annotation type's symbol plus its
/// element/value pairs in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnot {
    pub annotation_type: ClassId,
    pub elements: Vec<(String, AnnotValue)>,
}

impl TypeAnnot {
    pub fn marker(annotation_type: ClassId) -> Self {
        Self {
            annotation_type,
            elements: Vec::new(),
        }
    }
}

/// An annotation element value, mirroring the class-file `element_value`
/// shapes with annotation types resolved to symbols.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotValue {
    Const(sable_classfile::ConstValue),
    EnumConst {
        /// Binary name of the enum type.
        type_name: String,
        const_name: String,
    },
    /// A class literal, by its descriptor.
    ClassLiteral(String),
    Nested(Box<TypeAnnot>),
    Array(Vec<AnnotValue>),
}

/// One step of a canonical path into a mirror tree.
///
/// Unlike the raw class-file `type_path`, there is no nested-type step:
/// nested classes are flattened into a single class node, so the raw step is
/// validated and consumed in place. `Component` addresses one component of
/// an intersection bound; it never comes from a raw path directly — the
/// attachment pass derives it from the bound index of a type-parameter-bound
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePathStep {
    /// Into the array component.
    Array,
    /// Into the bound of a wildcard type argument.
    WildcardBound,
    /// Into the i-th type argument.
    TypeArg(u8),
    /// Into the i-th component of an intersection.
    Component(u8),
}

/// A canonical route from a root type-use to one of its sub-positions. The
/// empty path addresses the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypePath {
    steps: Vec<TypePathStep>,
}

impl TypePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn of(steps: impl IntoIterator<Item = TypePathStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn child(&self, step: TypePathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub(crate) fn push(&mut self, step: TypePathStep) {
        self.steps.push(step);
    }

    pub(crate) fn prepend(&self, step: TypePathStep) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.push(step);
        steps.extend(self.steps.iter().copied());
        Self { steps }
    }
}

/// Ordered annotation entries for one root position. Entries keep class-file
/// attribute order; multiple annotations on the same path stay in the order
/// they were declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotTable {
    entries: Vec<(TypePath, TypeAnnot)>,
}

impl AnnotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: TypePath, annot: TypeAnnot) {
        self.entries.push((path, annot));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All annotations attached exactly at `path`, in declaration order.
    pub fn at(&self, path: &TypePath) -> Vec<&TypeAnnot> {
        self.entries
            .iter()
            .filter(|(entry_path, _)| entry_path == path)
            .map(|(_, annot)| annot)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypePath, &TypeAnnot)> {
        self.entries.iter().map(|(path, annot)| (path, annot))
    }

    /// A copy of this table with every path prefixed by `step`; used to
    /// merge per-bound tables into an intersection bound's table.
    pub(crate) fn prefixed(&self, step: TypePathStep) -> AnnotTable {
        AnnotTable {
            entries: self
                .entries
                .iter()
                .map(|(path, annot)| (path.prepend(step), annot.clone()))
                .collect(),
        }
    }

    pub(crate) fn extend_from(&mut self, other: &AnnotTable) {
        self.entries.extend(other.entries.iter().cloned());
    }
}

/// A node of a mirror tree together with the annotations attached to it.
///
/// The view pairs a structural node with the owning root's annotation table
/// and the node's path within that root; navigation produces views of child
/// nodes sharing the same table. Every node exposes an annotation list —
/// empty, never missing.
#[derive(Clone)]
pub struct AnnotatedType<'a> {
    ty: &'a Type,
    table: Option<&'a AnnotTable>,
    path: TypePath,
}

impl<'a> AnnotatedType<'a> {
    /// A bare view with no attached table; type-variable nodes still expose
    /// their declaration-site annotations.
    pub fn bare(ty: &'a Type) -> Self {
        Self {
            ty,
            table: None,
            path: TypePath::root(),
        }
    }

    pub fn with_table(ty: &'a Type, table: &'a AnnotTable) -> Self {
        Self {
            ty,
            table: Some(table),
            path: TypePath::root(),
        }
    }

    pub fn ty(&self) -> &'a Type {
        self.ty
    }

    pub fn path(&self) -> &TypePath {
        &self.path
    }

    /// The annotations on this exact node, in declaration order.
    ///
    /// Use-site annotations (table entries at this path) take precedence;
    /// a bare type-variable occurrence inherits the annotations of its
    /// declaration site.
    pub fn annotations(&self, env: &dyn TypeEnv) -> Vec<TypeAnnot> {
        if let Some(table) = self.table {
            let here = table.at(&self.path);
            if !here.is_empty() {
                return here.into_iter().cloned().collect();
            }
        }
        if let Type::TypeVar(var) = self.ty {
            if let Some(param) = env.type_param(*var) {
                return param.annotations.clone();
            }
        }
        Vec::new()
    }

    pub fn type_argument(&self, index: usize) -> Option<AnnotatedType<'a>> {
        let Type::Class(ClassType { args, .. }) = self.ty else {
            return None;
        };
        let arg = args.get(index)?;
        Some(self.descend(arg, TypePathStep::TypeArg(index as u8)))
    }

    pub fn array_component(&self) -> Option<AnnotatedType<'a>> {
        let Type::Array(component) = self.ty else {
            return None;
        };
        Some(self.descend(component, TypePathStep::Array))
    }

    pub fn wildcard_bound(&self) -> Option<AnnotatedType<'a>> {
        let bound = match self.ty {
            Type::Wildcard(WildcardBound::Extends(bound))
            | Type::Wildcard(WildcardBound::Super(bound)) => bound,
            _ => return None,
        };
        Some(self.descend(bound, TypePathStep::WildcardBound))
    }

    pub fn intersection_component(&self, index: usize) -> Option<AnnotatedType<'a>> {
        let Type::Intersection(parts) = self.ty else {
            return None;
        };
        let part = parts.get(index)?;
        Some(self.descend(part, TypePathStep::Component(index as u8)))
    }

    fn descend(&self, ty: &'a Type, step: TypePathStep) -> AnnotatedType<'a> {
        AnnotatedType {
            ty,
            table: self.table,
            path: self.path.child(step),
        }
    }
}

impl std::fmt::Debug for AnnotatedType<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotatedType")
            .field("ty", &self.ty)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
