//! The type system's interning authority.
//!
//! One [`TypeStore`] instance owns every symbol it creates: class symbols are
//! interned by binary name (at most one canonical symbol per name per store),
//! type parameters live in a shared arena, and substitution results are
//! memoized. The store is shared read-mostly between worker threads.
//!
//! Population is split into two phases so that mutually-referential classes
//! resolve without recursion into each other's bodies:
//!
//! 1. *registration* — the name is mapped to a fresh id before anything else;
//!    recursive lookups during population observe the id immediately;
//! 2. *header* — the class's own type parameters and bounds, derived from its
//!    own signature only;
//! 3. *members* — supertypes, fields and methods, which may consult other
//!    classes' headers but never their members.
//!
//! Each phase is guarded by a per-entry [`OnceLock`], so concurrent first
//! lookups elect one populating thread and late readers block until the
//! value is ready.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use sable_core::{Diagnostic, Span};

use crate::annots::{AnnotTable, AnnotatedType, TypeAnnot};
use crate::ids::{ClassId, TypeVarId};
use crate::loader::{self, TypeDefStub, TypeProvider};
use crate::mirror::Type;
use crate::subst::{substitute, Substitution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

pub(crate) const ACC_INTERFACE: u16 = 0x0200;
pub(crate) const ACC_ABSTRACT: u16 = 0x0400;
pub(crate) const ACC_STATIC: u16 = 0x0008;
pub(crate) const ACC_VARARGS: u16 = 0x0080;
pub(crate) const ACC_ANNOTATION: u16 = 0x2000;
pub(crate) const ACC_ENUM: u16 = 0x4000;

impl ClassKind {
    pub(crate) fn from_flags(flags: u16) -> Self {
        if flags & ACC_ANNOTATION != 0 {
            ClassKind::Annotation
        } else if flags & ACC_INTERFACE != 0 {
            ClassKind::Interface
        } else if flags & ACC_ENUM != 0 {
            ClassKind::Enum
        } else {
            ClassKind::Class
        }
    }
}

/// Where a symbol's definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Parsed from class-file bytes.
    Binary,
    /// Registered source-backed declaration; carries a provenance span.
    Source,
    /// Seeded by the built-in minimal universe or constructed directly.
    Builtin,
    /// Could not be located; a placeholder with empty members so traversal
    /// code never branches on absence.
    Unresolved,
}

/// One fully-populated class symbol.
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Binary name, dotted (`java.util.List`, `com.example.Outer$Inner`).
    pub name: String,
    pub kind: ClassKind,
    pub modifiers: u16,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<MethodDef>,
    pub methods: Vec<MethodDef>,
    /// Declaration annotations on the class itself.
    pub annotations: Vec<TypeAnnot>,
    pub origin: Origin,
    /// Provenance of a source-backed declaration. Opaque to the type
    /// algebra; never part of equality or substitution.
    pub span: Option<Span>,
}

impl ClassDef {
    pub(crate) fn unresolved(name: String) -> Self {
        ClassDef {
            name,
            kind: ClassKind::Class,
            modifiers: 0,
            type_params: Vec::new(),
            super_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            origin: Origin::Unresolved,
            span: None,
        }
    }
}

/// The header of a class: the part of its definition derivable from its own
/// signature alone, available before (and during) member population.
#[derive(Debug, Clone)]
pub struct ClassHeader {
    pub kind: ClassKind,
    pub modifiers: u16,
    pub type_params: Vec<TypeVarId>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub modifiers: u16,
    /// Declaration annotations on the field.
    pub annotations: Vec<TypeAnnot>,
    /// Type-use annotations addressed into `ty`.
    pub type_annots: AnnotTable,
}

impl FieldDef {
    pub fn is_static(&self) -> bool {
        self.modifiers & ACC_STATIC != 0
    }

    pub fn annotated_type(&self) -> AnnotatedType<'_> {
        AnnotatedType::with_table(&self.ty, &self.type_annots)
    }
}

/// Per-position type-annotation tables of one method. Indices are parallel
/// to the method's parameter and throws lists.
#[derive(Debug, Clone, Default)]
pub struct MethodTypeAnnots {
    pub params: Vec<AnnotTable>,
    pub ret: AnnotTable,
    pub throws: Vec<AnnotTable>,
    pub receiver: AnnotTable,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub modifiers: u16,
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub throws: Vec<Type>,
    /// Declaration annotations on the method.
    pub annotations: Vec<TypeAnnot>,
    /// Shared with every signature view derived from this method, so views
    /// through subtypes carry the declaring method's annotations unchanged.
    pub type_annots: Arc<MethodTypeAnnots>,
}

impl MethodDef {
    pub fn is_static(&self) -> bool {
        self.modifiers & ACC_STATIC != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers & ACC_ABSTRACT != 0
    }

    pub fn is_varargs(&self) -> bool {
        self.modifiers & ACC_VARARGS != 0
    }
}

/// One type parameter declaration, class- or method-scoped, or a capture
/// variable.
#[derive(Debug)]
pub struct TypeParamDef {
    pub name: String,
    /// Declared bounds in order. The class bound (when present) comes first.
    pub upper_bounds: Vec<Type>,
    /// Only set on capture variables for `? super X` wildcards.
    pub lower_bound: Option<Type>,
    /// Annotations on the parameter declaration itself (`<@A T>`).
    pub annotations: Vec<TypeAnnot>,
    /// Type-use annotations addressed into each declared bound, parallel to
    /// `upper_bounds`.
    pub bound_annots: Vec<AnnotTable>,
    /// Whether the signature's class-bound slot was filled. Needed to map a
    /// type-annotation bound index onto `upper_bounds`: index 0 is reserved
    /// for the class bound, so interface-only bounds start at index 1.
    pub class_bound_present: bool,
    merged: OnceLock<MergedBound>,
}

#[derive(Debug)]
struct MergedBound {
    ty: Type,
    annots: AnnotTable,
}

impl TypeParamDef {
    pub(crate) fn new(name: String, upper_bounds: Vec<Type>) -> Self {
        let bound_annots = upper_bounds.iter().map(|_| AnnotTable::new()).collect();
        TypeParamDef {
            name,
            upper_bounds,
            lower_bound: None,
            annotations: Vec::new(),
            bound_annots,
            class_bound_present: true,
            merged: OnceLock::new(),
        }
    }

    pub(crate) fn with_details(
        name: String,
        upper_bounds: Vec<Type>,
        lower_bound: Option<Type>,
        annotations: Vec<TypeAnnot>,
        bound_annots: Vec<AnnotTable>,
        class_bound_present: bool,
    ) -> Self {
        debug_assert_eq!(upper_bounds.len(), bound_annots.len());
        TypeParamDef {
            name,
            upper_bounds,
            lower_bound,
            annotations,
            bound_annots,
            class_bound_present,
            merged: OnceLock::new(),
        }
    }

    /// The variable's upper bound as a single mirror: the sole bound, or an
    /// intersection of all declared bounds. Computed lazily and cached.
    pub fn upper_bound(&self) -> &Type {
        &self.merged().ty
    }

    /// The upper bound together with its type-use annotations: annotations
    /// on a single bound attach to the bound itself, annotations on one of
    /// several bounds attach to that intersection component.
    pub fn annotated_upper_bound(&self) -> AnnotatedType<'_> {
        let merged = self.merged();
        AnnotatedType::with_table(&merged.ty, &merged.annots)
    }

    fn merged(&self) -> &MergedBound {
        self.merged.get_or_init(|| match self.upper_bounds.len() {
            0 => MergedBound {
                ty: Type::Unknown,
                annots: AnnotTable::new(),
            },
            1 => MergedBound {
                ty: self.upper_bounds[0].clone(),
                annots: self.bound_annots[0].clone(),
            },
            _ => {
                let mut annots = AnnotTable::new();
                for (index, table) in self.bound_annots.iter().enumerate() {
                    annots.extend_from(
                        &table.prefixed(crate::annots::TypePathStep::Component(index as u8)),
                    );
                }
                MergedBound {
                    ty: Type::Intersection(self.upper_bounds.clone()),
                    annots,
                }
            }
        })
    }
}

/// Handles to the types the core itself needs to know about.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownTypes {
    pub object: ClassId,
    pub string: ClassId,
    pub number: ClassId,
    pub integer: ClassId,
    pub cloneable: ClassId,
    pub serializable: ClassId,
    pub throwable: ClassId,
    pub exception: ClassId,
    pub runtime_exception: ClassId,
    pub list: ClassId,
    pub array_list: ClassId,
    pub runnable: ClassId,
}

/// Read access to symbol and type-parameter definitions.
///
/// Implemented by [`TypeStore`] and by [`crate::TyContext`], which layers
/// context-local capture variables on top of a store.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<Arc<ClassDef>>;
    fn type_param(&self, id: TypeVarId) -> Option<Arc<TypeParamDef>>;
    fn lookup_class(&self, name: &str) -> Option<ClassId>;
    fn well_known(&self) -> &WellKnownTypes;
}

struct ClassEntry {
    name: String,
    origin: Origin,
    span: Option<Span>,
    /// Pending raw definition, consumed by member population.
    stub: Mutex<Option<TypeDefStub>>,
    header: OnceLock<Arc<ClassHeader>>,
    def: OnceLock<Arc<ClassDef>>,
}

thread_local! {
    /// Non-zero while this thread is populating a class header. Header
    /// population must never block on another entry's header (A↔B bounds
    /// could otherwise deadlock across threads), so arity lookups degrade
    /// to a non-blocking peek inside this window.
    static IN_HEADER_INIT: Cell<u32> = const { Cell::new(0) };
}

struct HeaderInitGuard;

impl HeaderInitGuard {
    fn enter() -> Self {
        IN_HEADER_INIT.with(|depth| depth.set(depth.get() + 1));
        HeaderInitGuard
    }
}

impl Drop for HeaderInitGuard {
    fn drop(&mut self) {
        IN_HEADER_INIT.with(|depth| depth.set(depth.get() - 1));
    }
}

fn in_header_init() -> bool {
    IN_HEADER_INIT.with(|depth| depth.get() > 0)
}

/// The process-wide table from binary name to canonical class symbol.
pub struct TypeStore {
    provider: Option<Box<dyn TypeProvider>>,
    entries: RwLock<Vec<Arc<ClassEntry>>>,
    by_name: RwLock<HashMap<String, ClassId>>,
    type_params: RwLock<Vec<Arc<TypeParamDef>>>,
    subst_memo: RwLock<HashMap<(Type, Substitution), Type>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    well_known: WellKnownTypes,
}

impl std::fmt::Debug for TypeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeStore")
            .field("classes", &self.entries.read().expect("lock poisoned").len())
            .finish_non_exhaustive()
    }
}

impl TypeStore {
    /// A store backed only by the built-in minimal universe; lookups of
    /// anything else produce unresolved placeholders. Intended for tests
    /// and for callers that register every definition themselves.
    pub fn with_minimal_jdk() -> Self {
        Self::build(None)
    }

    /// A store that resolves unknown names through `provider` (typically a
    /// classpath index).
    pub fn with_provider(provider: Box<dyn TypeProvider>) -> Self {
        Self::build(Some(provider))
    }

    fn build(provider: Option<Box<dyn TypeProvider>>) -> Self {
        let mut store = TypeStore {
            provider,
            entries: RwLock::new(Vec::new()),
            by_name: RwLock::new(HashMap::new()),
            type_params: RwLock::new(Vec::new()),
            subst_memo: RwLock::new(HashMap::new()),
            diagnostics: Mutex::new(Vec::new()),
            // Placeholder ids, replaced by `seed_minimal_jdk`.
            well_known: WellKnownTypes {
                object: ClassId(0),
                string: ClassId(0),
                number: ClassId(0),
                integer: ClassId(0),
                cloneable: ClassId(0),
                serializable: ClassId(0),
                throwable: ClassId(0),
                exception: ClassId(0),
                runtime_exception: ClassId(0),
                list: ClassId(0),
                array_list: ClassId(0),
                runnable: ClassId(0),
            },
        };
        store.well_known = store.seed_minimal_jdk();
        store
    }

    fn seed_minimal_jdk(&mut self) -> WellKnownTypes {
        let object = self.add_builtin("java.lang.Object", ClassKind::Class, None, vec![]);
        let object_ty = Type::class(object, vec![]);

        let cloneable = self.add_builtin(
            "java.lang.Cloneable",
            ClassKind::Interface,
            None,
            vec![],
        );
        let serializable = self.add_builtin(
            "java.io.Serializable",
            ClassKind::Interface,
            None,
            vec![],
        );
        let string = self.add_builtin(
            "java.lang.String",
            ClassKind::Class,
            Some(object_ty.clone()),
            vec![Type::class(serializable, vec![])],
        );
        let number = self.add_builtin(
            "java.lang.Number",
            ClassKind::Class,
            Some(object_ty.clone()),
            vec![Type::class(serializable, vec![])],
        );
        let integer = self.add_builtin(
            "java.lang.Integer",
            ClassKind::Class,
            Some(Type::class(number, vec![])),
            vec![],
        );
        let throwable = self.add_builtin(
            "java.lang.Throwable",
            ClassKind::Class,
            Some(object_ty.clone()),
            vec![Type::class(serializable, vec![])],
        );
        let exception = self.add_builtin(
            "java.lang.Exception",
            ClassKind::Class,
            Some(Type::class(throwable, vec![])),
            vec![],
        );
        let runtime_exception = self.add_builtin(
            "java.lang.RuntimeException",
            ClassKind::Class,
            Some(Type::class(exception, vec![])),
            vec![],
        );
        let runnable = self.add_builtin(
            "java.lang.Runnable",
            ClassKind::Interface,
            None,
            vec![],
        );

        let list_e = self.add_type_param("E", vec![object_ty.clone()]);
        let list = self.add_builtin_generic(
            "java.util.List",
            ClassKind::Interface,
            None,
            vec![],
            vec![list_e],
        );
        let array_list_e = self.add_type_param("E", vec![object_ty.clone()]);
        let array_list = self.add_builtin_generic(
            "java.util.ArrayList",
            ClassKind::Class,
            Some(object_ty),
            vec![Type::class(list, vec![Type::TypeVar(array_list_e)])],
            vec![array_list_e],
        );

        WellKnownTypes {
            object,
            string,
            number,
            integer,
            cloneable,
            serializable,
            throwable,
            exception,
            runtime_exception,
            list,
            array_list,
            runnable,
        }
    }

    fn add_builtin(
        &mut self,
        name: &str,
        kind: ClassKind,
        super_class: Option<Type>,
        interfaces: Vec<Type>,
    ) -> ClassId {
        self.add_builtin_generic(name, kind, super_class, interfaces, vec![])
    }

    fn add_builtin_generic(
        &mut self,
        name: &str,
        kind: ClassKind,
        super_class: Option<Type>,
        interfaces: Vec<Type>,
        type_params: Vec<TypeVarId>,
    ) -> ClassId {
        self.add_class(ClassDef {
            name: name.to_string(),
            kind,
            modifiers: 0,
            type_params,
            super_class,
            interfaces,
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            origin: Origin::Builtin,
            span: None,
        })
    }

    /// Registers a fully-built definition. Used by the built-in universe and
    /// by tests; classes coming from a provider go through lazy population
    /// instead.
    pub fn add_class(&self, def: ClassDef) -> ClassId {
        let entry = ClassEntry {
            name: def.name.clone(),
            origin: def.origin,
            span: def.span,
            stub: Mutex::new(None),
            header: OnceLock::new(),
            def: OnceLock::new(),
        };
        let _ = entry.header.set(Arc::new(ClassHeader {
            kind: def.kind,
            modifiers: def.modifiers,
            type_params: def.type_params.clone(),
        }));
        let name = def.name.clone();
        let _ = entry.def.set(Arc::new(def));

        let mut by_name = self.by_name.write().expect("lock poisoned");
        let mut entries = self.entries.write().expect("lock poisoned");
        let id = ClassId(entries.len() as u32);
        entries.push(Arc::new(entry));
        by_name.insert(name, id);
        id
    }

    /// Creates-or-returns the canonical symbol for `binary_name`; never
    /// fails. Unlocatable names intern an [`Origin::Unresolved`] placeholder
    /// with empty members.
    ///
    /// Accepts dotted or slashed spellings; the interned key is dotted.
    pub fn get_class_symbol(&self, binary_name: &str) -> ClassId {
        let name = normalize_binary_name(binary_name);
        if let Some(&id) = self
            .by_name
            .read()
            .expect("lock poisoned")
            .get(name.as_ref())
        {
            return id;
        }

        // The provider fetch may touch disk; keep it outside the locks.
        let fetched = self
            .provider
            .as_ref()
            .and_then(|provider| provider.lookup_type(&name));

        let mut by_name = self.by_name.write().expect("lock poisoned");
        if let Some(&id) = by_name.get(name.as_ref()) {
            // Another thread won the race; both computed equal results.
            return id;
        }
        let mut entries = self.entries.write().expect("lock poisoned");
        let id = ClassId(entries.len() as u32);

        let entry = match fetched {
            Some(stub) => ClassEntry {
                name: name.clone().into_owned(),
                origin: if stub.span.is_some() {
                    Origin::Source
                } else {
                    Origin::Binary
                },
                span: stub.span,
                stub: Mutex::new(Some(stub)),
                header: OnceLock::new(),
                def: OnceLock::new(),
            },
            None => {
                tracing::debug!(name = %name, "class not found; interning unresolved placeholder");
                let entry = ClassEntry {
                    name: name.clone().into_owned(),
                    origin: Origin::Unresolved,
                    span: None,
                    stub: Mutex::new(None),
                    header: OnceLock::new(),
                    def: OnceLock::new(),
                };
                let _ = entry.header.set(Arc::new(ClassHeader {
                    kind: ClassKind::Class,
                    modifiers: 0,
                    type_params: Vec::new(),
                }));
                let _ = entry
                    .def
                    .set(Arc::new(ClassDef::unresolved(name.clone().into_owned())));
                entry
            }
        };

        entries.push(Arc::new(entry));
        by_name.insert(name.into_owned(), id);
        id
    }

    /// Lookup without creation.
    pub fn class_id(&self, binary_name: &str) -> Option<ClassId> {
        let name = normalize_binary_name(binary_name);
        self.by_name
            .read()
            .expect("lock poisoned")
            .get(name.as_ref())
            .copied()
    }

    /// The canonical `ClassType` of a symbol: its own type parameters as its
    /// type arguments (the generic self type).
    pub fn declaration(&self, id: ClassId) -> Type {
        match self.header(id) {
            Some(header) => Type::class(
                id,
                header.type_params.iter().map(|&tp| Type::TypeVar(tp)).collect(),
            ),
            None => Type::Error,
        }
    }

    pub fn is_unresolved(&self, id: ClassId) -> bool {
        self.entry(id)
            .map(|entry| entry.origin == Origin::Unresolved)
            .unwrap_or(true)
    }

    pub fn origin(&self, id: ClassId) -> Option<Origin> {
        self.entry(id).map(|entry| entry.origin)
    }

    /// Provenance span of a source-backed symbol.
    pub fn span(&self, id: ClassId) -> Option<Span> {
        self.entry(id).and_then(|entry| entry.span)
    }

    pub fn class_name(&self, id: ClassId) -> Option<String> {
        self.entry(id).map(|entry| entry.name.clone())
    }

    /// The class's header, populating it on first request.
    pub fn header(&self, id: ClassId) -> Option<Arc<ClassHeader>> {
        let entry = self.entry(id)?;
        Some(
            entry
                .header
                .get_or_init(|| {
                    let _guard = HeaderInitGuard::enter();
                    Arc::new(loader::populate_header(self, &entry.stub))
                })
                .clone(),
        )
    }

    /// The fully-populated definition, populating header and members on
    /// first request. Blocks while another thread populates the same class.
    pub fn class_def(&self, id: ClassId) -> Option<Arc<ClassDef>> {
        let entry = self.entry(id)?;
        // Header first: member population depends on it, and initializing it
        // inside the def initializer would nest the two cleanly anyway.
        let header = self.header(id)?;
        Some(
            entry
                .def
                .get_or_init(|| {
                    Arc::new(loader::populate_members(
                        self,
                        id,
                        &entry.name,
                        &header,
                        &entry.stub,
                        entry.origin,
                        entry.span,
                    ))
                })
                .clone(),
        )
    }

    /// Arity of a class, for signature-translation heuristics. Inside a
    /// header-population window this is a non-blocking peek and may be
    /// absent; elsewhere it forces header population.
    pub(crate) fn arity_hint(&self, id: ClassId) -> Option<usize> {
        if in_header_init() {
            let entry = self.entry(id)?;
            entry.header.get().map(|header| header.type_params.len())
        } else {
            self.header(id).map(|header| header.type_params.len())
        }
    }

    fn entry(&self, id: ClassId) -> Option<Arc<ClassEntry>> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(id.0 as usize)
            .cloned()
    }

    /// Allocates a type parameter with the given bounds and no annotations.
    pub fn add_type_param(&self, name: &str, upper_bounds: Vec<Type>) -> TypeVarId {
        self.push_type_param(TypeParamDef::new(name.to_string(), upper_bounds))
    }

    /// Allocates an id with empty bounds, to be filled by
    /// [`TypeStore::init_type_param`] once the bounds — which may reference
    /// the id itself — have been translated.
    pub(crate) fn reserve_type_param(&self, name: &str) -> TypeVarId {
        self.push_type_param(TypeParamDef::new(name.to_string(), Vec::new()))
    }

    pub(crate) fn init_type_param(&self, id: TypeVarId, def: TypeParamDef) {
        let mut params = self.type_params.write().expect("lock poisoned");
        params[id.0 as usize] = Arc::new(def);
    }

    fn push_type_param(&self, def: TypeParamDef) -> TypeVarId {
        let mut params = self.type_params.write().expect("lock poisoned");
        let id = TypeVarId(
            u32::try_from(params.len()).expect("type parameter arena overflow"),
        );
        params.push(Arc::new(def));
        id
    }

    /// Substitution with store-level memoization. Entries are value-equal
    /// regardless of which thread computed them; first writer wins.
    pub fn substituted(&self, ty: &Type, subst: &Substitution) -> Type {
        if subst.is_empty() {
            return ty.clone();
        }
        let key = (ty.clone(), subst.clone());
        if let Some(hit) = self.subst_memo.read().expect("lock poisoned").get(&key) {
            return hit.clone();
        }
        let computed = substitute(ty, subst);
        self.subst_memo
            .write()
            .expect("lock poisoned")
            .entry(key)
            .or_insert_with(|| computed.clone());
        computed
    }

    pub fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }

    /// Definition of a type parameter. Context-local capture ids resolve
    /// only through the [`crate::TyContext`] that allocated them.
    pub fn type_param(&self, id: TypeVarId) -> Option<Arc<TypeParamDef>> {
        if id.context_local_index().is_some() {
            return None;
        }
        self.type_params
            .read()
            .expect("lock poisoned")
            .get(id.0 as usize)
            .cloned()
    }

    pub fn push_diagnostic(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .expect("lock poisoned")
            .push(diagnostic);
    }

    /// Drains the diagnostics accumulated since the last call.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().expect("lock poisoned"))
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<Arc<ClassDef>> {
        self.class_def(id)
    }

    fn type_param(&self, id: TypeVarId) -> Option<Arc<TypeParamDef>> {
        TypeStore::type_param(self, id)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_id(name)
    }

    fn well_known(&self) -> &WellKnownTypes {
        TypeStore::well_known(self)
    }
}

fn normalize_binary_name(name: &str) -> std::borrow::Cow<'_, str> {
    if name.contains('/') {
        std::borrow::Cow::Owned(name.replace('/', "."))
    } else {
        std::borrow::Cow::Borrowed(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_jdk_interns_well_known_types() {
        let store = TypeStore::with_minimal_jdk();
        let wk = *store.well_known();

        assert_eq!(store.class_id("java.lang.Object"), Some(wk.object));
        assert_eq!(store.class_id("java/lang/Object"), Some(wk.object));
        assert_eq!(store.class_id("java.util.List"), Some(wk.list));

        let object = store.class_def(wk.object).unwrap();
        assert_eq!(object.name, "java.lang.Object");
        assert_eq!(object.origin, Origin::Builtin);
    }

    #[test]
    fn repeated_lookup_is_interned() {
        let store = TypeStore::with_minimal_jdk();
        let first = store.get_class_symbol("does.not.Exist");
        let second = store.get_class_symbol("does.not.Exist");
        assert_eq!(first, second);
        assert!(store.is_unresolved(first));

        // The placeholder is a complete, traversable symbol.
        let def = store.class_def(first).unwrap();
        assert!(def.methods.is_empty());
        assert_eq!(def.origin, Origin::Unresolved);
    }

    #[test]
    fn declaration_is_the_generic_self_type() {
        let store = TypeStore::with_minimal_jdk();
        let list = store.well_known().list;
        let header = store.header(list).unwrap();
        assert_eq!(header.type_params.len(), 1);
        assert_eq!(
            store.declaration(list),
            Type::class(list, vec![Type::TypeVar(header.type_params[0])])
        );
    }

    #[test]
    fn merged_upper_bound_collapses_single_bound() {
        let store = TypeStore::with_minimal_jdk();
        let object = Type::class(store.well_known().object, vec![]);
        let t = store.add_type_param("T", vec![object.clone()]);
        let param = store.type_param(t).unwrap();
        assert_eq!(param.upper_bound(), &object);
    }

    #[test]
    fn merged_upper_bound_builds_intersection() {
        let store = TypeStore::with_minimal_jdk();
        let wk = *store.well_known();
        let cloneable = Type::class(wk.cloneable, vec![]);
        let serializable = Type::class(wk.serializable, vec![]);
        let t = store.add_type_param("T", vec![cloneable.clone(), serializable.clone()]);
        let param = store.type_param(t).unwrap();
        assert_eq!(
            param.upper_bound(),
            &Type::Intersection(vec![cloneable, serializable])
        );
    }
}
