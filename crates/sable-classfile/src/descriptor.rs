use crate::error::{Error, Result};

/// The eight JVM primitive kinds, by descriptor letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub(crate) fn from_letter(c: u8) -> Option<Self> {
        Some(match c {
            b'Z' => PrimitiveKind::Boolean,
            b'B' => PrimitiveKind::Byte,
            b'S' => PrimitiveKind::Short,
            b'C' => PrimitiveKind::Char,
            b'I' => PrimitiveKind::Int,
            b'J' => PrimitiveKind::Long,
            b'F' => PrimitiveKind::Float,
            b'D' => PrimitiveKind::Double,
            _ => return None,
        })
    }
}

/// A parsed field descriptor (JVMS 4.3.2). Object names are internal
/// (slash-separated) names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Object(String),
    Array(Box<TypeDescriptor>),
}

/// A parsed method descriptor (JVMS 4.3.3). `return_type` is `None` for
/// `void`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTypeDescriptor {
    pub params: Vec<TypeDescriptor>,
    pub return_type: Option<TypeDescriptor>,
}

pub fn parse_field_descriptor(desc: &str) -> Result<TypeDescriptor> {
    let mut cur = DescCursor::new(desc);
    let ty = cur.field_type()?;
    cur.expect_end()?;
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodTypeDescriptor> {
    let mut cur = DescCursor::new(desc);
    cur.expect(b'(')?;

    let mut params = Vec::new();
    while cur.peek() != Some(b')') {
        params.push(cur.field_type()?);
    }
    cur.expect(b')')?;

    let return_type = if cur.peek() == Some(b'V') {
        cur.bump();
        None
    } else {
        Some(cur.field_type()?)
    };
    cur.expect_end()?;

    Ok(MethodTypeDescriptor {
        params,
        return_type,
    })
}

struct DescCursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> DescCursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn err(&self) -> Error {
        Error::InvalidDescriptor(self.src.to_string())
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
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(self.err())
        }
    }

    fn field_type(&mut self) -> Result<TypeDescriptor> {
        match self.peek().ok_or_else(|| self.err())? {
            b'L' => {
                self.bump();
                let start = self.pos;
                let end = self.src[start..].find(';').ok_or_else(|| self.err())? + start;
                if end == start {
                    return Err(self.err());
                }
                let name = self.src[start..end].to_string();
                self.pos = end + 1;
                Ok(TypeDescriptor::Object(name))
            }
            b'[' => {
                self.bump();
                let component = self.field_type()?;
                Ok(TypeDescriptor::Array(Box::new(component)))
            }
            c => match PrimitiveKind::from_letter(c) {
                Some(kind) => {
                    self.bump();
                    Ok(TypeDescriptor::Primitive(kind))
                }
                None => Err(self.err()),
            },
        }
    }
}
