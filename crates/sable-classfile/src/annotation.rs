use crate::constant_pool::{ConstantPool, CpInfo};
use crate::error::{Error, Result};
use crate::reader::Reader;

/// One `annotation` structure (JVMS 4.7.16).
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// The annotation type as a field descriptor, e.g. `Lcom/example/A;`.
    pub type_descriptor: String,
    /// The internal name extracted from the descriptor, when it has the
    /// expected `L...;` shape.
    pub type_internal_name: Option<String>,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub(crate) fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let type_descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();
        let type_internal_name = descriptor_to_internal_name(&type_descriptor);

        let num_pairs = reader.read_u2()? as usize;
        let mut elements = Vec::with_capacity(num_pairs);
        for _ in 0..num_pairs {
            let name = cp.get_utf8(reader.read_u2()?)?.to_string();
            let value = ElementValue::parse(reader, cp)?;
            elements.push((name, value));
        }

        Ok(Self {
            type_descriptor,
            type_internal_name,
            elements,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(ConstValue),
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    /// A class literal, as a return descriptor (`Ljava/lang/String;`, `V`).
    Class(String),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let tag = reader.read_u1()?;
        match tag {
            b'B' | b'C' | b'I' | b'S' | b'Z' => {
                let index = reader.read_u2()?;
                let raw = expect_integer(cp, index)?;
                let value = match tag {
                    b'B' => ConstValue::Byte(raw as i8),
                    b'C' => ConstValue::Char(
                        char::from_u32(raw as u32)
                            .ok_or(Error::MalformedAttribute("element_value"))?,
                    ),
                    b'I' => ConstValue::Int(raw),
                    b'S' => ConstValue::Short(raw as i16),
                    _ => ConstValue::Boolean(raw != 0),
                };
                Ok(ElementValue::Const(value))
            }
            b'J' => {
                let index = reader.read_u2()?;
                match cp.get(index)? {
                    CpInfo::Long(v) => Ok(ElementValue::Const(ConstValue::Long(*v))),
                    other => Err(mismatch(index, "Long", other)),
                }
            }
            b'F' => {
                let index = reader.read_u2()?;
                match cp.get(index)? {
                    CpInfo::Float(v) => Ok(ElementValue::Const(ConstValue::Float(*v))),
                    other => Err(mismatch(index, "Float", other)),
                }
            }
            b'D' => {
                let index = reader.read_u2()?;
                match cp.get(index)? {
                    CpInfo::Double(v) => Ok(ElementValue::Const(ConstValue::Double(*v))),
                    other => Err(mismatch(index, "Double", other)),
                }
            }
            b's' => {
                let value = cp.get_string_constant(reader.read_u2()?)?;
                Ok(ElementValue::Const(ConstValue::String(value)))
            }
            b'e' => {
                let type_descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();
                let const_name = cp.get_utf8(reader.read_u2()?)?.to_string();
                Ok(ElementValue::Enum {
                    type_descriptor,
                    const_name,
                })
            }
            b'c' => Ok(ElementValue::Class(
                cp.get_utf8(reader.read_u2()?)?.to_string(),
            )),
            b'@' => Ok(ElementValue::Annotation(Box::new(Annotation::parse(
                reader, cp,
            )?))),
            b'[' => {
                let num = reader.read_u2()? as usize;
                let mut values = Vec::with_capacity(num);
                for _ in 0..num {
                    values.push(ElementValue::parse(reader, cp)?);
                }
                Ok(ElementValue::Array(values))
            }
            _ => Err(Error::MalformedAttribute("element_value")),
        }
    }
}

fn expect_integer(cp: &ConstantPool, index: u16) -> Result<i32> {
    match cp.get(index)? {
        CpInfo::Integer(v) => Ok(*v),
        other => Err(Error::ConstantPoolTypeMismatch {
            index,
            expected: "Integer",
            found: other.kind(),
        }),
    }
}

fn mismatch(index: u16, expected: &'static str, found: &CpInfo) -> Error {
    Error::ConstantPoolTypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
}

/// Where a declaration-scope type annotation attaches (JVMS 4.7.20.1).
///
/// Code-scope targets (local variables, casts, instantiations — target
/// types `0x40` and up) never appear on the attributes this crate reads and
/// are rejected during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetInfo {
    /// `0x00` — the i-th type parameter of the class.
    ClassTypeParameter { index: u8 },
    /// `0x11` — the j-th bound of the i-th class type parameter.
    ClassTypeParameterBound { index: u8, bound: u8 },
    /// `0x13` — the type of a field declaration.
    Field,
    /// `0x14` — the return type of a method.
    MethodReturn,
    /// `0x15` — the receiver type of a method.
    MethodReceiver,
    /// `0x16` — the i-th formal parameter type.
    FormalParameter { index: u8 },
    /// `0x17` — the i-th type in the throws clause.
    Throws { index: u16 },
    /// `0x01` — the i-th type parameter of the method.
    MethodTypeParameter { index: u8 },
    /// `0x12` — the j-th bound of the i-th method type parameter.
    MethodTypeParameterBound { index: u8, bound: u8 },
}

/// One step of a `type_path` (JVMS 4.7.20.2), addressing a position inside
/// the annotated type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTypePathStep {
    /// Deeper into an array component.
    Array,
    /// Deeper into a nested (inner) type.
    Nested,
    /// Into the bound of a wildcard type argument.
    WildcardBound,
    /// Into the i-th type argument of a parameterized type.
    TypeArgument(u8),
}

/// One record of a `RuntimeVisibleTypeAnnotations` /
/// `RuntimeInvisibleTypeAnnotations` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub target: TargetInfo,
    pub path: Vec<RawTypePathStep>,
    pub annotation: Annotation,
}

impl TypeAnnotation {
    /// Parses one `type_annotation` record. Returns `None` for supertype
    /// targets (`0x10`, extends/implements clauses), which are outside the
    /// positions this core models; the record is still fully consumed so the
    /// attribute stream stays aligned.
    pub(crate) fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Option<Self>> {
        let target_type = reader.read_u1()?;
        let target = match target_type {
            0x00 => Some(TargetInfo::ClassTypeParameter {
                index: reader.read_u1()?,
            }),
            0x01 => Some(TargetInfo::MethodTypeParameter {
                index: reader.read_u1()?,
            }),
            0x10 => {
                let _supertype_index = reader.read_u2()?;
                None
            }
            0x11 => Some(TargetInfo::ClassTypeParameterBound {
                index: reader.read_u1()?,
                bound: reader.read_u1()?,
            }),
            0x12 => Some(TargetInfo::MethodTypeParameterBound {
                index: reader.read_u1()?,
                bound: reader.read_u1()?,
            }),
            0x13 => Some(TargetInfo::Field),
            0x14 => Some(TargetInfo::MethodReturn),
            0x15 => Some(TargetInfo::MethodReceiver),
            0x16 => Some(TargetInfo::FormalParameter {
                index: reader.read_u1()?,
            }),
            0x17 => Some(TargetInfo::Throws {
                index: reader.read_u2()?,
            }),
            other => return Err(Error::InvalidAnnotationTarget(other)),
        };

        let path_len = reader.read_u1()? as usize;
        let mut path = Vec::with_capacity(path_len);
        for _ in 0..path_len {
            let kind = reader.read_u1()?;
            let arg_index = reader.read_u1()?;
            let step = match kind {
                0 => RawTypePathStep::Array,
                1 => RawTypePathStep::Nested,
                2 => RawTypePathStep::WildcardBound,
                3 => RawTypePathStep::TypeArgument(arg_index),
                _ => return Err(Error::MalformedAttribute("type_path")),
            };
            path.push(step);
        }

        let annotation = Annotation::parse(reader, cp)?;
        Ok(target.map(|target| Self {
            target,
            path,
            annotation,
        }))
    }
}

pub fn descriptor_to_internal_name(desc: &str) -> Option<String> {
    desc.strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .map(|name| name.to_string())
}
