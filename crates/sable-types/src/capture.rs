//! Capture conversion (JLS 5.1.10).
//!
//! Reading a wildcard type argument through a use site mints a fresh
//! capture variable per occurrence. Captures are context-local: they live in
//! a [`TyContext`], never in the shared store, and two captures of the same
//! wildcard are never the same variable.

use std::fmt;
use std::sync::Arc;

use crate::annots::AnnotTable;
use crate::ids::{ClassId, TypeVarId};
use crate::mirror::{ClassType, Type, WildcardBound};
use crate::store::{ClassDef, TypeEnv, TypeParamDef, WellKnownTypes};
use crate::subst::glb;

/// Per-invocation typing context layering context-local type parameters over
/// a base environment.
///
/// Side-effect free with respect to the shared [`crate::TypeStore`]: capture
/// variables are allocated locally, so repeated invocations against a fresh
/// context get deterministic ids.
pub struct TyContext<'env> {
    base: &'env dyn TypeEnv,
    locals: Vec<Arc<TypeParamDef>>,
}

impl fmt::Debug for TyContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TyContext")
            .field("locals", &self.locals.len())
            .finish_non_exhaustive()
    }
}

impl<'env> TyContext<'env> {
    pub fn new(base: &'env dyn TypeEnv) -> Self {
        Self {
            base,
            locals: Vec::new(),
        }
    }

    /// Clears all context-local allocations. Prefer a fresh context per
    /// invocation when deterministic ids across invocations matter.
    pub fn reset(&mut self) {
        self.locals.clear();
    }

    fn add_capture_type_param(
        &mut self,
        upper_bounds: Vec<Type>,
        lower_bound: Option<Type>,
    ) -> TypeVarId {
        let index: u32 = self
            .locals
            .len()
            .try_into()
            .expect("too many context-local type params");
        let id = TypeVarId::new_context_local(index);
        let bound_annots = upper_bounds.iter().map(|_| AnnotTable::new()).collect();
        self.locals.push(Arc::new(TypeParamDef::with_details(
            format!("CAP#{index}"),
            upper_bounds,
            lower_bound,
            Vec::new(),
            bound_annots,
            true,
        )));
        id
    }

    /// Replaces each wildcard argument of a parameterized type with a fresh
    /// capture variable whose upper bound combines the formal parameter's
    /// declared bound with the wildcard's own bound.
    pub fn capture_conversion(&mut self, ty: &Type) -> Type {
        let Type::Class(ClassType { def, args }) = ty else {
            return ty.clone();
        };

        if args.iter().all(|arg| !matches!(arg, Type::Wildcard(_))) {
            return ty.clone();
        }

        let Some(class_def) = self.class(*def) else {
            return ty.clone();
        };

        let object = Type::class(self.well_known().object, vec![]);
        let formal_bounds: Vec<Type> = class_def
            .type_params
            .iter()
            .map(|&tp| {
                self.type_param(tp)
                    .and_then(|param| param.upper_bounds.first().cloned())
                    .unwrap_or_else(|| object.clone())
            })
            .collect();

        let mut new_args = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let formal = formal_bounds
                .get(index)
                .cloned()
                .unwrap_or_else(|| object.clone());
            match arg {
                Type::Wildcard(WildcardBound::Unbounded) => {
                    let cap = self.add_capture_type_param(vec![formal], None);
                    new_args.push(Type::TypeVar(cap));
                }
                Type::Wildcard(WildcardBound::Extends(upper)) => {
                    let cap = self.add_capture_type_param(vec![glb(&formal, upper)], None);
                    new_args.push(Type::TypeVar(cap));
                }
                Type::Wildcard(WildcardBound::Super(lower)) => {
                    let cap =
                        self.add_capture_type_param(vec![formal], Some((**lower).clone()));
                    new_args.push(Type::TypeVar(cap));
                }
                other => new_args.push(other.clone()),
            }
        }

        Type::class(*def, new_args)
    }
}

impl TypeEnv for TyContext<'_> {
    fn class(&self, id: ClassId) -> Option<Arc<ClassDef>> {
        self.base.class(id)
    }

    fn type_param(&self, id: TypeVarId) -> Option<Arc<TypeParamDef>> {
        if let Some(index) = id.context_local_index() {
            return self.locals.get(index).cloned();
        }
        self.base.type_param(id)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.base.lookup_class(name)
    }

    fn well_known(&self) -> &WellKnownTypes {
        self.base.well_known()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TypeStore;

    #[test]
    fn capture_of_extends_wildcard_bounds_by_glb() {
        let store = TypeStore::with_minimal_jdk();
        let wk = *store.well_known();
        let number = Type::class(wk.number, vec![]);
        let list_of_ext_number = Type::class(
            wk.list,
            vec![Type::Wildcard(WildcardBound::Extends(Box::new(
                number.clone(),
            )))],
        );

        let mut ctx = TyContext::new(&store);
        let captured = ctx.capture_conversion(&list_of_ext_number);

        let Type::Class(ClassType { def, args }) = &captured else {
            panic!("capture should produce a class type");
        };
        assert_eq!(*def, wk.list);
        let Type::TypeVar(cap) = &args[0] else {
            panic!("wildcard should be replaced by a capture variable");
        };
        assert!(cap.is_capture());

        let param = ctx.type_param(*cap).unwrap();
        // glb(Object, Number) flattens to Object & Number.
        assert_eq!(
            param.upper_bounds,
            vec![Type::Intersection(vec![
                Type::class(wk.object, vec![]),
                number
            ])]
        );
        assert_eq!(param.lower_bound, None);
    }

    #[test]
    fn capture_of_super_wildcard_keeps_lower_bound() {
        let store = TypeStore::with_minimal_jdk();
        let wk = *store.well_known();
        let integer = Type::class(wk.integer, vec![]);
        let list_of_super_integer = Type::class(
            wk.list,
            vec![Type::Wildcard(WildcardBound::Super(Box::new(
                integer.clone(),
            )))],
        );

        let mut ctx = TyContext::new(&store);
        let captured = ctx.capture_conversion(&list_of_super_integer);

        let Type::Class(ClassType { args, .. }) = &captured else {
            panic!("capture should produce a class type");
        };
        let Type::TypeVar(cap) = &args[0] else {
            panic!("wildcard should be replaced by a capture variable");
        };
        let param = ctx.type_param(*cap).unwrap();
        assert_eq!(param.upper_bounds, vec![Type::class(wk.object, vec![])]);
        assert_eq!(param.lower_bound, Some(integer));
    }

    #[test]
    fn captures_are_fresh_per_occurrence() {
        let store = TypeStore::with_minimal_jdk();
        let wk = *store.well_known();
        let list_of_any = Type::class(wk.list, vec![Type::Wildcard(WildcardBound::Unbounded)]);

        let mut ctx = TyContext::new(&store);
        let first = ctx.capture_conversion(&list_of_any);
        let second = ctx.capture_conversion(&list_of_any);

        // Same source type, distinct capture identities.
        assert_ne!(first, second);
    }

    #[test]
    fn non_wildcard_types_are_untouched() {
        let store = TypeStore::with_minimal_jdk();
        let wk = *store.well_known();
        let list_of_string =
            Type::class(wk.list, vec![Type::class(wk.string, vec![])]);

        let mut ctx = TyContext::new(&store);
        assert_eq!(ctx.capture_conversion(&list_of_string), list_of_string);
        assert_eq!(ctx.capture_conversion(&Type::Error), Type::Error);
    }
}
