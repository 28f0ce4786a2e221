//! The substitution algebra: derive one mirror from another under a
//! type-variable mapping.

use std::collections::BTreeMap;

use crate::ids::TypeVarId;
use crate::mirror::{ClassType, Type, WildcardBound};

/// An immutable mapping from type-variable identity to replacement mirror.
///
/// Backed by an ordered map so that two substitutions with the same entries
/// compare and hash equal regardless of construction order — the store's
/// memo table relies on that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Substitution {
    map: BTreeMap<TypeVarId, Type>,
}

impl Substitution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (TypeVarId, Type)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Maps `params[i]` to `args[i]`; missing arguments (raw or malformed
    /// uses) map to [`Type::Unknown`] so downstream shapes stay stable.
    pub fn for_params(params: &[TypeVarId], args: &[Type]) -> Self {
        Self::from_pairs(params.iter().enumerate().map(|(i, &param)| {
            (param, args.get(i).cloned().unwrap_or(Type::Unknown))
        }))
    }

    pub fn get(&self, var: TypeVarId) -> Option<&Type> {
        self.map.get(&var)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether every variable maps to itself.
    pub fn is_identity(&self) -> bool {
        self.map
            .iter()
            .all(|(&var, image)| matches!(image, Type::TypeVar(v) if *v == var))
    }

    /// The substitution equivalent to applying `inner` first, then `self`:
    /// `substitute(ty, &outer.compose(&inner))` equals
    /// `substitute(&substitute(ty, &inner), &outer)`.
    pub fn compose(&self, inner: &Substitution) -> Substitution {
        let mut map: BTreeMap<TypeVarId, Type> = inner
            .map
            .iter()
            .map(|(&var, image)| (var, substitute(image, self)))
            .collect();
        for (&var, image) in &self.map {
            map.entry(var).or_insert_with(|| image.clone());
        }
        Substitution { map }
    }
}

/// Structurally rewrites `ty`, replacing every type variable in the mapping's
/// domain with its image. All other nodes are rebuilt with substituted
/// children; error and unknown leaves pass through untouched.
///
/// Annotations attach to positions (paths within an owning root), not to the
/// mirrors themselves, so substitution preserves annotation placement by
/// construction: the only nodes it replaces are leaves, which have no
/// sub-positions.
pub fn substitute(ty: &Type, subst: &Substitution) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeVar(var) => match subst.get(*var) {
            Some(image) => image.clone(),
            None => ty.clone(),
        },
        Type::Class(ClassType { def, args }) => Type::class(
            *def,
            args.iter().map(|arg| substitute(arg, subst)).collect(),
        ),
        Type::Array(component) => Type::array(substitute(component, subst)),
        Type::Wildcard(WildcardBound::Extends(bound)) => Type::Wildcard(WildcardBound::Extends(
            Box::new(substitute(bound, subst)),
        )),
        Type::Wildcard(WildcardBound::Super(bound)) => {
            Type::Wildcard(WildcardBound::Super(Box::new(substitute(bound, subst))))
        }
        Type::Intersection(parts) => {
            // Substitution may collapse components to the same type;
            // re-normalize rather than keeping a degenerate intersection.
            make_intersection(parts.iter().map(|part| substitute(part, subst)).collect())
        }
        Type::Primitive(_)
        | Type::Wildcard(WildcardBound::Unbounded)
        | Type::Unknown
        | Type::Error
        | Type::Void => ty.clone(),
    }
}

/// Builds an intersection from `parts`: flattens nested intersections,
/// drops duplicates (keeping first-seen order), and collapses a single
/// remaining component to that component itself — a one-element
/// intersection is never constructed.
pub fn make_intersection(parts: Vec<Type>) -> Type {
    let mut components: Vec<Type> = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            Type::Intersection(nested) => {
                for nested_part in nested {
                    if !components.contains(&nested_part) {
                        components.push(nested_part);
                    }
                }
            }
            other => {
                if !components.contains(&other) {
                    components.push(other);
                }
            }
        }
    }

    match components.len() {
        0 => Type::Unknown,
        1 => components.into_iter().next().expect("one component"),
        _ => Type::Intersection(components),
    }
}

/// Greatest-lower-bound approximation: the intersection of both types. Used
/// by capture conversion to combine a formal bound with a wildcard's bound.
pub fn glb(a: &Type, b: &Type) -> Type {
    make_intersection(vec![a.clone(), b.clone()])
}
