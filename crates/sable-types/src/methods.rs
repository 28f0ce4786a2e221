//! Method signature views.
//!
//! A [`MethodSig`] is one method as seen through a particular instantiation
//! of its declaring class: parameter, return and throws mirrors have the
//! class's type arguments substituted in, while the annotation tables are
//! shared with the declaring definition — annotations attach to shape, and
//! substitution only replaces leaves, so placement carries over unchanged.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::annots::AnnotatedType;
use crate::ids::{ClassId, TypeVarId};
use crate::mirror::{ClassType, Type};
use crate::store::{ClassDef, ClassKind, MethodDef, TypeStore};
use crate::subst::Substitution;

#[derive(Debug, Clone)]
pub struct MethodSig {
    owner: Type,
    class: Arc<ClassDef>,
    index: usize,
    params: Vec<Type>,
    return_type: Type,
    throws: Vec<Type>,
}

impl MethodSig {
    fn def(&self) -> &MethodDef {
        &self.class.methods[self.index]
    }

    /// The class-type instantiation this signature is viewed through.
    pub fn owner(&self) -> &Type {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.def().name
    }

    pub fn is_static(&self) -> bool {
        self.def().is_static()
    }

    pub fn is_abstract(&self) -> bool {
        self.def().is_abstract()
    }

    /// The method's own type parameters.
    pub fn type_parameters(&self) -> &[TypeVarId] {
        &self.def().type_params
    }

    /// Annotated views of the formal parameter types, in order.
    pub fn formal_parameters(&self) -> Vec<AnnotatedType<'_>> {
        (0..self.params.len())
            .filter_map(|index| self.formal_parameter(index))
            .collect()
    }

    pub fn formal_parameter(&self, index: usize) -> Option<AnnotatedType<'_>> {
        let ty = self.params.get(index)?;
        Some(view(ty, self.def().type_annots.params.get(index)))
    }

    pub fn return_type(&self) -> AnnotatedType<'_> {
        AnnotatedType::with_table(&self.return_type, &self.def().type_annots.ret)
    }

    pub fn thrown_exceptions(&self) -> Vec<AnnotatedType<'_>> {
        (0..self.throws.len())
            .filter_map(|index| self.thrown_exception(index))
            .collect()
    }

    pub fn thrown_exception(&self, index: usize) -> Option<AnnotatedType<'_>> {
        let ty = self.throws.get(index)?;
        Some(view(ty, self.def().type_annots.throws.get(index)))
    }

    /// The annotated receiver type, for instance methods.
    pub fn annotated_receiver_type(&self) -> Option<AnnotatedType<'_>> {
        if self.is_static() {
            return None;
        }
        Some(AnnotatedType::with_table(
            &self.owner,
            &self.def().type_annots.receiver,
        ))
    }
}

fn view<'a>(ty: &'a Type, table: Option<&'a crate::annots::AnnotTable>) -> AnnotatedType<'a> {
    match table {
        Some(table) => AnnotatedType::with_table(ty, table),
        None => AnnotatedType::bare(ty),
    }
}

impl TypeStore {
    /// Signature views of every method declared directly on `recv`, which
    /// must be a class type.
    pub fn methods(&self, recv: &Type) -> Vec<MethodSig> {
        let Some((class, subst)) = self.class_view(recv) else {
            return Vec::new();
        };
        (0..class.methods.len())
            .map(|index| self.build_sig(recv.clone(), class.clone(), index, &subst))
            .collect()
    }

    /// The first method named `name` declared directly on `recv`.
    pub fn method_named(&self, recv: &Type, name: &str) -> Option<MethodSig> {
        let (class, subst) = self.class_view(recv)?;
        let index = class.methods.iter().position(|method| method.name == name)?;
        Some(self.build_sig(recv.clone(), class, index, &subst))
    }

    /// The first method named `name` found on `recv` or its supertypes,
    /// with the accumulated type-argument substitution applied at each
    /// level. The returned signature's owner is the instantiation of the
    /// declaring class as seen from `recv`.
    pub fn method_in_hierarchy(&self, recv: &Type, name: &str) -> Option<MethodSig> {
        let mut queue: VecDeque<Type> = VecDeque::new();
        let mut seen: HashSet<(ClassId, Vec<Type>)> = HashSet::new();
        queue.push_back(recv.clone());

        while let Some(current) = queue.pop_front() {
            let Type::Class(ClassType { def, args }) = &current else {
                continue;
            };
            if !seen.insert((*def, args.clone())) {
                continue;
            }

            let Some((class, subst)) = self.class_view(&current) else {
                continue;
            };
            if let Some(index) = class.methods.iter().position(|method| method.name == name) {
                return Some(self.build_sig(current.clone(), class, index, &subst));
            }

            if let Some(super_class) = &class.super_class {
                queue.push_back(self.substituted(super_class, &subst));
            }
            for iface in &class.interfaces {
                queue.push_back(self.substituted(iface, &subst));
            }
            // Every interface implicitly has Object as a supertype.
            if class.kind == ClassKind::Interface {
                queue.push_back(Type::class(self.well_known().object, vec![]));
            }
        }

        None
    }

    fn class_view(&self, recv: &Type) -> Option<(Arc<ClassDef>, Substitution)> {
        let Type::Class(ClassType { def, args }) = recv else {
            return None;
        };
        let class = self.class_def(*def)?;
        // Raw uses of a generic class map every parameter to Unknown so the
        // member shapes stay stable.
        let subst = if class.type_params.is_empty() {
            Substitution::empty()
        } else {
            Substitution::for_params(&class.type_params, args)
        };
        Some((class, subst))
    }

    fn build_sig(
        &self,
        owner: Type,
        class: Arc<ClassDef>,
        index: usize,
        subst: &Substitution,
    ) -> MethodSig {
        let method = &class.methods[index];
        let params = method
            .params
            .iter()
            .map(|param| self.substituted(param, subst))
            .collect();
        let return_type = self.substituted(&method.return_type, subst);
        let throws = method
            .throws
            .iter()
            .map(|thrown| self.substituted(thrown, subst))
            .collect();
        MethodSig {
            owner,
            class,
            index,
            params,
            return_type,
            throws,
        }
    }
}
