use crate::annotation::{Annotation, TypeAnnotation};
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;

/// Structural view of one parsed class file. Only the attributes the
/// analysis core needs are decoded; everything else is skipped.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal name, e.g. `java/lang/String`.
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
    pub signature: Option<String>,
    pub annotations: Vec<Annotation>,
    pub type_annotations: Vec<TypeAnnotation>,
    pub inner_classes: Vec<InnerClassInfo>,
}

/// One field or method, prior to descriptor/signature parsing.
#[derive(Debug, Clone)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    /// Internal names from the `Exceptions` attribute (methods only).
    pub exceptions: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub type_annotations: Vec<TypeAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassInfo {
    pub inner_class: String,
    pub outer_class: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: u16,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFE_BABE {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = cp.get_class_name(reader.read_u2()?)?;
        let super_class_index = reader.read_u2()?;
        let super_class = if super_class_index == 0 {
            None
        } else {
            Some(cp.get_class_name(super_class_index)?)
        };

        let interface_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            interfaces.push(cp.get_class_name(reader.read_u2()?)?);
        }

        let field_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(parse_member(&mut reader, &cp)?);
        }

        let method_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(parse_member(&mut reader, &cp)?);
        }

        let attrs = parse_attributes(&mut reader, &cp, AttributeScope::Class)?;
        reader.ensure_empty()?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: attrs.signature,
            annotations: attrs.annotations,
            type_annotations: attrs.type_annotations,
            inner_classes: attrs.inner_classes,
        })
    }
}

fn parse_member(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<ClassMember> {
    let access_flags = reader.read_u2()?;
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let attrs = parse_attributes(reader, cp, AttributeScope::Member)?;
    Ok(ClassMember {
        access_flags,
        name,
        descriptor,
        signature: attrs.signature,
        exceptions: attrs.exceptions,
        annotations: attrs.annotations,
        type_annotations: attrs.type_annotations,
    })
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<String>,
    exceptions: Vec<String>,
    annotations: Vec<Annotation>,
    type_annotations: Vec<TypeAnnotation>,
    inner_classes: Vec<InnerClassInfo>,
}

enum AttributeScope {
    Class,
    Member,
}

fn parse_attributes(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    scope: AttributeScope,
) -> Result<ParsedAttributes> {
    let count = reader.read_u2()? as usize;
    let mut parsed = ParsedAttributes::default();

    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let payload = reader.read_bytes(length)?;
        let name = cp.get_utf8(name_index)?;

        let mut sub = Reader::new(payload);
        match name {
            "Signature" => {
                parsed.signature = Some(cp.get_utf8(sub.read_u2()?)?.to_string());
                sub.ensure_empty()?;
            }
            "Exceptions" if matches!(scope, AttributeScope::Member) => {
                let num = sub.read_u2()? as usize;
                for _ in 0..num {
                    parsed.exceptions.push(cp.get_class_name(sub.read_u2()?)?);
                }
                sub.ensure_empty()?;
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let num = sub.read_u2()? as usize;
                for _ in 0..num {
                    parsed.annotations.push(Annotation::parse(&mut sub, cp)?);
                }
                sub.ensure_empty()?;
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                let num = sub.read_u2()? as usize;
                for _ in 0..num {
                    if let Some(record) = TypeAnnotation::parse(&mut sub, cp)? {
                        parsed.type_annotations.push(record);
                    }
                }
                sub.ensure_empty()?;
            }
            "InnerClasses" if matches!(scope, AttributeScope::Class) => {
                let num = sub.read_u2()? as usize;
                for _ in 0..num {
                    let inner_index = sub.read_u2()?;
                    let outer_index = sub.read_u2()?;
                    let name_index = sub.read_u2()?;
                    let inner_access_flags = sub.read_u2()?;

                    parsed.inner_classes.push(InnerClassInfo {
                        inner_class: cp.get_class_name(inner_index)?,
                        outer_class: if outer_index == 0 {
                            None
                        } else {
                            Some(cp.get_class_name(outer_index)?)
                        },
                        inner_name: if name_index == 0 {
                            None
                        } else {
                            Some(cp.get_utf8(name_index)?.to_string())
                        },
                        access_flags: inner_access_flags,
                    });
                }
                sub.ensure_empty()?;
            }
            _ => {
                // Unknown attribute: intentionally skipped.
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{RawTypePathStep, TargetInfo};

    /// Builds class-file bytes from pre-encoded constant pool entries and
    /// body fragments; indices are assigned in order starting at 1.
    struct ClassBytes {
        pool: Vec<Vec<u8>>,
        body: Vec<u8>,
    }

    impl ClassBytes {
        fn new() -> Self {
            Self {
                pool: Vec::new(),
                body: Vec::new(),
            }
        }

        fn utf8(&mut self, text: &str) -> u16 {
            let mut entry = vec![1u8];
            entry.extend((text.len() as u16).to_be_bytes());
            entry.extend(text.as_bytes());
            self.pool.push(entry);
            self.pool.len() as u16
        }

        fn class(&mut self, internal_name: &str) -> u16 {
            let name = self.utf8(internal_name);
            let mut entry = vec![7u8];
            entry.extend(name.to_be_bytes());
            self.pool.push(entry);
            self.pool.len() as u16
        }

        fn u1(&mut self, v: u8) {
            self.body.push(v);
        }

        fn u2(&mut self, v: u16) {
            self.body.extend(v.to_be_bytes());
        }

        fn u4(&mut self, v: u32) {
            self.body.extend(v.to_be_bytes());
        }

        fn finish(self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend(0xCAFE_BABEu32.to_be_bytes());
            out.extend(0u16.to_be_bytes()); // minor
            out.extend(52u16.to_be_bytes()); // major (Java 8)
            out.extend(((self.pool.len() + 1) as u16).to_be_bytes());
            for entry in &self.pool {
                out.extend(entry);
            }
            out.extend(&self.body);
            out
        }
    }

    #[test]
    fn parses_a_minimal_class() {
        let mut b = ClassBytes::new();
        let this = b.class("com/example/Foo");
        let sup = b.class("java/lang/Object");
        b.u2(0x0021); // ACC_PUBLIC | ACC_SUPER
        b.u2(this);
        b.u2(sup);
        b.u2(0); // interfaces
        b.u2(0); // fields
        b.u2(0); // methods
        b.u2(0); // attributes

        let cf = ClassFile::parse(&b.finish()).unwrap();
        assert_eq!(cf.this_class, "com/example/Foo");
        assert_eq!(cf.super_class.as_deref(), Some("java/lang/Object"));
        assert!(cf.interfaces.is_empty());
        assert!(cf.fields.is_empty());
        assert!(cf.methods.is_empty());
        assert_eq!(cf.signature, None);
    }

    #[test]
    fn parses_method_with_signature_exceptions_and_type_annotations() {
        let mut b = ClassBytes::new();
        let this = b.class("com/example/Foo");
        let sup = b.class("java/lang/Object");
        let method_name = b.utf8("frob");
        let method_desc = b.utf8("(Ljava/util/List;)V");
        let sig_attr = b.utf8("Signature");
        let sig_text = b.utf8("(Ljava/util/List<Ljava/lang/String;>;)V");
        let exc_attr = b.utf8("Exceptions");
        let exc_class = b.class("java/lang/RuntimeException");
        let type_ann_attr = b.utf8("RuntimeVisibleTypeAnnotations");
        let ann_desc = b.utf8("Lcom/example/A;");

        b.u2(0x0021);
        b.u2(this);
        b.u2(sup);
        b.u2(0); // interfaces
        b.u2(0); // fields

        b.u2(1); // one method
        b.u2(0x0001); // ACC_PUBLIC
        b.u2(method_name);
        b.u2(method_desc);
        b.u2(3); // three attributes

        b.u2(sig_attr);
        b.u4(2);
        b.u2(sig_text);

        b.u2(exc_attr);
        b.u4(4);
        b.u2(1);
        b.u2(exc_class);

        // One record: parameter 0, path = type_argument(0), annotation @A
        // with zero element pairs.
        b.u2(type_ann_attr);
        b.u4(11);
        b.u2(1); // num_annotations
        b.u1(0x16); // formal_parameter target
        b.u1(0); // parameter index
        b.u1(1); // path length
        b.u1(3); // TYPE_ARGUMENT
        b.u1(0); // argument index
        b.u2(ann_desc);
        b.u2(0); // num_element_value_pairs

        b.u2(0); // class attributes

        let cf = ClassFile::parse(&b.finish()).unwrap();
        let method = &cf.methods[0];
        assert_eq!(method.name, "frob");
        assert_eq!(
            method.signature.as_deref(),
            Some("(Ljava/util/List<Ljava/lang/String;>;)V")
        );
        assert_eq!(method.exceptions, vec!["java/lang/RuntimeException"]);

        assert_eq!(method.type_annotations.len(), 1);
        let record = &method.type_annotations[0];
        assert_eq!(record.target, TargetInfo::FormalParameter { index: 0 });
        assert_eq!(record.path, vec![RawTypePathStep::TypeArgument(0)]);
        assert_eq!(
            record.annotation.type_internal_name.as_deref(),
            Some("com/example/A")
        );
    }

    #[test]
    fn rejects_wrong_magic() {
        let err = ClassFile::parse(&[0x00, 0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(_)));
    }
}
