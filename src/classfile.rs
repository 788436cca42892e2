//! Minimal Java class-file metadata reader.
//!
//! Parses just enough of the class-file format to answer the questions the
//! schema pipeline asks: the binary class name, class-level runtime-visible
//! annotations, and declared fields with their descriptors and annotations.
//! Method bodies, the bytecode itself, and every attribute other than
//! `RuntimeVisibleAnnotations` are skipped over.

use anyhow::{Result, bail};
use std::collections::BTreeMap;

const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_SYNTHETIC: u16 = 0x1000;

/// Class metadata extracted from one `.class` file. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Dotted binary name, e.g. `petstore.Pet`.
    pub binary_name: String,
    pub annotations: Vec<AnnotationInfo>,
    pub fields: Vec<FieldInfo>,
}

impl TypeInfo {
    pub fn annotation(&self, type_name: &str) -> Option<&AnnotationInfo> {
        self.annotations.iter().find(|a| a.type_name == type_name)
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    /// Decoded field descriptor, e.g. `java.lang.String` or `int[]`.
    pub type_name: String,
    pub access_flags: u16,
    pub annotations: Vec<AnnotationInfo>,
}

impl FieldInfo {
    /// Fields that contribute schema properties: instance state that is
    /// neither transient nor compiler-generated.
    pub fn is_property_candidate(&self) -> bool {
        self.access_flags & (ACC_STATIC | ACC_TRANSIENT | ACC_SYNTHETIC) == 0
    }

    /// First integer-valued `since` element across the field's annotations.
    pub fn since_version(&self) -> i64 {
        self.annotations
            .iter()
            .find_map(|a| match a.values.get("since") {
                Some(AnnotationValue::Int(v)) => Some(*v),
                _ => None,
            })
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationInfo {
    /// Dotted annotation type name, e.g. `com.tangosol.io.pof.schema.annotation.PortableType`.
    pub type_name: String,
    pub values: BTreeMap<String, AnnotationValue>,
}

impl AnnotationInfo {
    pub fn int_value(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(AnnotationValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Annotation element values the pipeline cares about. Everything else
/// (enums, class literals, nested annotations, arrays) is consumed but kept
/// opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Other,
}

pub fn parse_class(bytes: &[u8]) -> Result<TypeInfo> {
    let mut r = Reader::new(bytes);

    if r.u32()? != MAGIC {
        bail!("not a class file (bad magic)");
    }
    let _minor = r.u16()?;
    let _major = r.u16()?;

    let pool = ConstantPool::parse(&mut r)?;

    let _access_flags = r.u16()?;
    let this_class = r.u16()?;
    let _super_class = r.u16()?;

    let interface_count = r.u16()?;
    r.skip(interface_count as usize * 2)?;

    let mut fields = Vec::new();
    let field_count = r.u16()?;
    for _ in 0..field_count {
        let access_flags = r.u16()?;
        let name = pool.utf8(r.u16()?)?.to_string();
        let descriptor = pool.utf8(r.u16()?)?;
        let type_name = decode_field_descriptor(descriptor);
        let annotations = parse_member_attributes(&mut r, &pool)?;
        fields.push(FieldInfo {
            name,
            type_name,
            access_flags,
            annotations,
        });
    }

    let method_count = r.u16()?;
    for _ in 0..method_count {
        r.skip(6)?;
        skip_attributes(&mut r)?;
    }

    let annotations = parse_member_attributes(&mut r, &pool)?;

    let internal_name = pool.class_name(this_class)?;
    Ok(TypeInfo {
        binary_name: internal_name.replace('/', "."),
        annotations,
        fields,
    })
}

/// Converts a JVM field descriptor to a readable Java type name.
pub fn decode_field_descriptor(descriptor: &str) -> String {
    let mut dims = 0usize;
    let mut rest = descriptor;
    while let Some(stripped) = rest.strip_prefix('[') {
        dims += 1;
        rest = stripped;
    }

    let base = match rest.as_bytes().first() {
        Some(b'B') => "byte".to_string(),
        Some(b'C') => "char".to_string(),
        Some(b'D') => "double".to_string(),
        Some(b'F') => "float".to_string(),
        Some(b'I') => "int".to_string(),
        Some(b'J') => "long".to_string(),
        Some(b'S') => "short".to_string(),
        Some(b'Z') => "boolean".to_string(),
        // Strip exactly one 'L' prefix and one ';' suffix: an internal name
        // may itself start with 'L' or end with ';'-adjacent characters.
        Some(b'L') => rest
            .strip_prefix('L')
            .and_then(|s| s.strip_suffix(';'))
            .unwrap_or(rest)
            .replace('/', "."),
        _ => rest.to_string(),
    };

    let mut result = base;
    for _ in 0..dims {
        result.push_str("[]");
    }
    result
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| anyhow::anyhow!("truncated class file at offset {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Int(i32),
    Long(i64),
    Class { name_index: u16 },
    Unused,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(r: &mut Reader) -> Result<ConstantPool> {
        let count = r.u16()?;
        // Index 0 is unused; long/double entries occupy two slots.
        let mut entries = vec![Constant::Unused; count as usize];

        let mut index = 1u16;
        while index < count {
            let tag = r.u8()?;
            let mut wide = false;
            let constant = match tag {
                1 => {
                    let len = r.u16()? as usize;
                    let bytes = r.take(len)?;
                    Constant::Utf8(String::from_utf8_lossy(bytes).into_owned())
                }
                3 => Constant::Int(r.u32()? as i32),
                4 => {
                    r.skip(4)?;
                    Constant::Unused
                }
                5 => {
                    wide = true;
                    let high = r.u32()? as u64;
                    let low = r.u32()? as u64;
                    Constant::Long(((high << 32) | low) as i64)
                }
                6 => {
                    wide = true;
                    r.skip(8)?;
                    Constant::Unused
                }
                7 => Constant::Class { name_index: r.u16()? },
                8 | 16 | 19 | 20 => {
                    r.skip(2)?;
                    Constant::Unused
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    r.skip(4)?;
                    Constant::Unused
                }
                15 => {
                    r.skip(3)?;
                    Constant::Unused
                }
                other => bail!("unsupported constant pool tag {other} at index {index}"),
            };

            entries[index as usize] = constant;
            index += if wide { 2 } else { 1 };
        }

        Ok(ConstantPool { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant> {
        self.entries
            .get(index as usize)
            .ok_or_else(|| anyhow::anyhow!("constant pool index {index} out of range"))
    }

    fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => bail!("constant pool index {index} is not Utf8 ({other:?})"),
        }
    }

    fn int(&self, index: u16) -> Result<i64> {
        match self.get(index)? {
            Constant::Int(v) => Ok(*v as i64),
            Constant::Long(v) => Ok(*v),
            other => bail!("constant pool index {index} is not an integer ({other:?})"),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => bail!("constant pool index {index} is not a class ({other:?})"),
        }
    }
}

/// Reads the attribute table at the current position and returns the parsed
/// `RuntimeVisibleAnnotations`, skipping every other attribute.
fn parse_member_attributes(r: &mut Reader, pool: &ConstantPool) -> Result<Vec<AnnotationInfo>> {
    let mut annotations = Vec::new();
    let attribute_count = r.u16()?;
    for _ in 0..attribute_count {
        let name_index = r.u16()?;
        let length = r.u32()? as usize;
        if pool.utf8(name_index)? == "RuntimeVisibleAnnotations" {
            let body = r.take(length)?;
            let mut inner = Reader::new(body);
            let num = inner.u16()?;
            for _ in 0..num {
                annotations.push(parse_annotation(&mut inner, pool)?);
            }
        } else {
            r.skip(length)?;
        }
    }
    Ok(annotations)
}

fn skip_attributes(r: &mut Reader) -> Result<()> {
    let attribute_count = r.u16()?;
    for _ in 0..attribute_count {
        r.skip(2)?;
        let length = r.u32()? as usize;
        r.skip(length)?;
    }
    Ok(())
}

fn parse_annotation(r: &mut Reader, pool: &ConstantPool) -> Result<AnnotationInfo> {
    let type_descriptor = pool.utf8(r.u16()?)?;
    let type_name = decode_field_descriptor(type_descriptor);

    let mut values = BTreeMap::new();
    let pair_count = r.u16()?;
    for _ in 0..pair_count {
        let name = pool.utf8(r.u16()?)?.to_string();
        let value = parse_element_value(r, pool)?;
        values.insert(name, value);
    }

    Ok(AnnotationInfo { type_name, values })
}

fn parse_element_value(r: &mut Reader, pool: &ConstantPool) -> Result<AnnotationValue> {
    let tag = r.u8()?;
    Ok(match tag {
        b'B' | b'C' | b'I' | b'S' | b'J' => AnnotationValue::Int(pool.int(r.u16()?)?),
        b'Z' => AnnotationValue::Bool(pool.int(r.u16()?)? != 0),
        b'D' | b'F' => {
            r.skip(2)?;
            AnnotationValue::Other
        }
        b's' => AnnotationValue::Str(pool.utf8(r.u16()?)?.to_string()),
        b'e' => {
            r.skip(4)?;
            AnnotationValue::Other
        }
        b'c' => {
            r.skip(2)?;
            AnnotationValue::Other
        }
        b'@' => {
            parse_annotation(r, pool)?;
            AnnotationValue::Other
        }
        b'[' => {
            let count = r.u16()?;
            for _ in 0..count {
                parse_element_value(r, pool)?;
            }
            AnnotationValue::Other
        }
        other => bail!("unsupported annotation element tag {}", other as char),
    })
}


#[cfg(test)]
mod tests {
    use super::testdata::ClassBuilder;
    use super::*;

    const MARKER: &str = "Lcom/tangosol/io/pof/schema/annotation/PortableType;";
    const PORTABLE: &str = "Lcom/tangosol/io/pof/schema/annotation/Portable;";

    #[test]
    fn parses_class_name_annotations_and_fields() {
        let bytes = ClassBuilder::new("petstore.Pet")
            .annotate(MARKER, &[("id", 1000), ("version", 2)])
            .field("name", "Ljava/lang/String;")
            .field_with("age", "I", 0x0002, Some((PORTABLE, &[("since", 1)])))
            .field_with("CACHE", "Ljava/util/Map;", 0x0002 | ACC_STATIC, None)
            .build();

        let info = parse_class(&bytes).unwrap();
        assert_eq!(info.binary_name, "petstore.Pet");

        let marker = info
            .annotation("com.tangosol.io.pof.schema.annotation.PortableType")
            .unwrap();
        assert_eq!(marker.int_value("id"), Some(1000));
        assert_eq!(marker.int_value("version"), Some(2));

        assert_eq!(info.fields.len(), 3);
        assert_eq!(info.fields[0].name, "name");
        assert_eq!(info.fields[0].type_name, "java.lang.String");
        assert_eq!(info.fields[0].since_version(), 0);
        assert_eq!(info.fields[1].type_name, "int");
        assert_eq!(info.fields[1].since_version(), 1);
        assert!(info.fields[1].is_property_candidate());
        assert!(!info.fields[2].is_property_candidate());
    }

    #[test]
    fn class_without_annotations_parses_clean() {
        let bytes = ClassBuilder::new("org.example.Plain")
            .field("value", "J")
            .build();

        let info = parse_class(&bytes).unwrap();
        assert_eq!(info.binary_name, "org.example.Plain");
        assert!(info.annotations.is_empty());
        assert_eq!(info.fields[0].type_name, "long");
    }

    #[test]
    fn rejects_non_class_bytes() {
        let err = parse_class(b"not a class file").unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn rejects_truncated_class() {
        let mut bytes = ClassBuilder::new("org.example.Cut")
            .field("value", "I")
            .build();
        bytes.truncate(bytes.len() / 2);
        assert!(parse_class(&bytes).is_err());
    }

    #[test]
    fn decodes_field_descriptors() {
        assert_eq!(decode_field_descriptor("I"), "int");
        assert_eq!(decode_field_descriptor("Z"), "boolean");
        assert_eq!(decode_field_descriptor("Ljava/lang/String;"), "java.lang.String");
        assert_eq!(decode_field_descriptor("[[D"), "double[][]");
        assert_eq!(decode_field_descriptor("[Lpetstore/Pet;"), "petstore.Pet[]");
    }

    #[test]
    fn descriptor_decoding_strips_exactly_one_prefix_and_suffix() {
        // A default-package class whose name itself starts with 'L'.
        assert_eq!(decode_field_descriptor("LList;"), "List");
        assert_eq!(decode_field_descriptor("[LLong;"), "Long[]");
        assert_eq!(decode_field_descriptor("LLLiteral;"), "LLiteral");
    }
}
