//! Parser for the generic-signature grammar (JVMS 4.7.9.1).
//!
//! Signatures refine the plain descriptors with type parameters, type
//! arguments, bounds and throws clauses. Names stay raw internal names here;
//! linking them to symbols is the type system's job.

use crate::descriptor::PrimitiveKind;
use crate::error::{Error, Result};

/// `ClassSignature`: type parameters, superclass, superinterfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_params: Vec<TypeParameter>,
    pub super_class: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

/// One formal type parameter with its declared bounds.
///
/// `class_bound` is `None` when the class-bound slot is empty (interface-only
/// bounds, e.g. `<T::Ljava/io/Serializable;>`). That distinction matters for
/// mapping type-annotation bound indices later, so it is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<ReferenceSig>,
    pub interface_bounds: Vec<ReferenceSig>,
}

/// `FieldTypeSignature`: any reference-shaped signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSig {
    Class(ClassTypeSignature),
    /// Array of any type signature, including primitives.
    Array(Box<TypeSig>),
    /// `TIdent;` — a use of a type variable in scope.
    TypeVar(String),
}

/// `TypeSignature`: a reference signature or a bare primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSig {
    Primitive(PrimitiveKind),
    Reference(ReferenceSig),
}

/// `LOuter<A>.Inner<B>;` — a possibly-nested, possibly-parameterized class
/// use. The first segment's name carries the package prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeSignature {
    pub segments: Vec<ClassTypeSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeSegment {
    pub name: String,
    pub args: Vec<TypeArgument>,
}

impl ClassTypeSignature {
    /// The internal name of the innermost class, with nesting flattened the
    /// way the compiler emits it: `com/example/Outer$Inner`.
    pub fn flattened_name(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('$');
            }
            out.push_str(&seg.name);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgument {
    /// `*`
    Unbounded,
    Exact(ReferenceSig),
    /// `+X`
    Extends(ReferenceSig),
    /// `-X`
    Super(ReferenceSig),
}

/// `MethodSignature`: own type parameters, parameter types, return type
/// (`None` = void), throws clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<TypeSig>,
    pub return_type: Option<TypeSig>,
    pub throws: Vec<ReferenceSig>,
}

pub fn parse_class_signature(sig: &str) -> Result<ClassSignature> {
    let mut cur = SigCursor::new(sig);
    let type_params = cur.type_params_opt()?;
    let super_class = cur.class_type_signature()?;
    let mut interfaces = Vec::new();
    while !cur.at_end() {
        interfaces.push(cur.class_type_signature()?);
    }
    Ok(ClassSignature {
        type_params,
        super_class,
        interfaces,
    })
}

pub fn parse_method_signature(sig: &str) -> Result<MethodSignature> {
    let mut cur = SigCursor::new(sig);
    let type_params = cur.type_params_opt()?;

    cur.expect(b'(')?;
    let mut params = Vec::new();
    while cur.peek() != Some(b')') {
        params.push(cur.type_signature()?);
    }
    cur.expect(b')')?;

    let return_type = if cur.peek() == Some(b'V') {
        cur.bump();
        None
    } else {
        Some(cur.type_signature()?)
    };

    let mut throws = Vec::new();
    while cur.peek() == Some(b'^') {
        cur.bump();
        let thrown = match cur.peek() {
            Some(b'T') => cur.type_var_signature()?,
            _ => ReferenceSig::Class(cur.class_type_signature()?),
        };
        throws.push(thrown);
    }
    cur.expect_end()?;

    Ok(MethodSignature {
        type_params,
        params,
        return_type,
        throws,
    })
}

pub fn parse_field_signature(sig: &str) -> Result<ReferenceSig> {
    let mut cur = SigCursor::new(sig);
    let parsed = cur.reference_signature()?;
    cur.expect_end()?;
    Ok(parsed)
}

struct SigCursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> SigCursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos == self.src.len()
    }

    fn err(&self) -> Error {
        Error::InvalidSignature(self.src.to_string())
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.err())
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.err())
        }
    }

    /// Reads an identifier: anything up to one of the delimiters the grammar
    /// reserves (JVMS: identifiers exclude `. ; [ / < > :`).
    fn identifier(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.err());
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn type_params_opt(&mut self) -> Result<Vec<TypeParameter>> {
        if self.peek() != Some(b'<') {
            return Ok(Vec::new());
        }
        self.bump();

        let mut params = Vec::new();
        while self.peek() != Some(b'>') {
            let name = self.identifier()?;
            self.expect(b':')?;

            // The class-bound slot may be empty.
            let class_bound = match self.peek() {
                Some(b':') | Some(b'>') | None => None,
                _ => Some(self.reference_signature()?),
            };

            let mut interface_bounds = Vec::new();
            while self.peek() == Some(b':') {
                self.bump();
                interface_bounds.push(self.reference_signature()?);
            }

            params.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
        }
        self.expect(b'>')?;

        if params.is_empty() {
            return Err(self.err());
        }
        Ok(params)
    }

    fn type_signature(&mut self) -> Result<TypeSig> {
        match self.peek().ok_or_else(|| self.err())? {
            b'L' | b'[' | b'T' => Ok(TypeSig::Reference(self.reference_signature()?)),
            c => match PrimitiveKind::from_letter(c) {
                Some(kind) => {
                    self.bump();
                    Ok(TypeSig::Primitive(kind))
                }
                None => Err(self.err()),
            },
        }
    }

    fn reference_signature(&mut self) -> Result<ReferenceSig> {
        match self.peek().ok_or_else(|| self.err())? {
            b'L' => Ok(ReferenceSig::Class(self.class_type_signature()?)),
            b'[' => {
                self.bump();
                let component = self.type_signature()?;
                Ok(ReferenceSig::Array(Box::new(component)))
            }
            b'T' => self.type_var_signature(),
            _ => Err(self.err()),
        }
    }

    fn type_var_signature(&mut self) -> Result<ReferenceSig> {
        self.expect(b'T')?;
        let name = self.identifier()?;
        self.expect(b';')?;
        Ok(ReferenceSig::TypeVar(name))
    }

    fn class_type_signature(&mut self) -> Result<ClassTypeSignature> {
        self.expect(b'L')?;

        // First segment: package specifier plus simple name. Slashes are
        // consumed as part of the name until the segment ends.
        let mut segments = Vec::new();
        let mut name = String::new();
        loop {
            name.push_str(&self.identifier()?);
            if self.peek() == Some(b'/') {
                self.bump();
                name.push('/');
            } else {
                break;
            }
        }
        let args = self.type_arguments_opt()?;
        segments.push(ClassTypeSegment { name, args });

        while self.peek() == Some(b'.') {
            self.bump();
            let name = self.identifier()?;
            let args = self.type_arguments_opt()?;
            segments.push(ClassTypeSegment { name, args });
        }
        self.expect(b';')?;

        Ok(ClassTypeSignature { segments })
    }

    fn type_arguments_opt(&mut self) -> Result<Vec<TypeArgument>> {
        if self.peek() != Some(b'<') {
            return Ok(Vec::new());
        }
        self.bump();

        let mut args = Vec::new();
        while self.peek() != Some(b'>') {
            let arg = match self.peek().ok_or_else(|| self.err())? {
                b'*' => {
                    self.bump();
                    TypeArgument::Unbounded
                }
                b'+' => {
                    self.bump();
                    TypeArgument::Extends(self.reference_signature()?)
                }
                b'-' => {
                    self.bump();
                    TypeArgument::Super(self.reference_signature()?)
                }
                _ => TypeArgument::Exact(self.reference_signature()?),
            };
            args.push(arg);
        }
        self.expect(b'>')?;

        if args.is_empty() {
            return Err(self.err());
        }
        Ok(args)
    }
}
