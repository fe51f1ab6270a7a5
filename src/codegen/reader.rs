//! Class file decoding and event replay
//!
//! [`ClassReader::parse`] decodes a complete class file into a [`ClassFile`];
//! [`ClassReader::accept`] replays it as [`ClassVisitor`] events in
//! declaration order.

use super::attribute::{parse_exceptions_payload, parse_signature_payload, AttributeInfo, CodeAttribute};
use super::class::ClassFile;
use super::constpool::{constant_tags::*, decode_modified_utf8, Constant, ConstantPool};
use super::defs::{attribute_names, MAGIC};
use super::error::{ClassReadError, ReadResult};
use super::visitor::{ClassHeader, ClassVisitor, FieldDecl, HeaderSlots, MemberSlots, MethodDecl};
use crate::error::Result;

/// Big-endian cursor over class file bytes
#[derive(Debug)]
pub(crate) struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub(crate) fn take(&mut self, n: usize) -> ReadResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(ClassReadError::Truncated { offset: self.offset, wanted: n - self.remaining() });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub(crate) fn u1(&mut self) -> ReadResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u2(&mut self) -> ReadResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u4(&mut self) -> ReadResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u8(&mut self) -> ReadResult<u64> {
        let hi = self.u4()? as u64;
        let lo = self.u4()? as u64;
        Ok((hi << 32) | lo)
    }

    pub(crate) fn attributes(&mut self) -> ReadResult<Vec<AttributeInfo>> {
        let count = self.u2()?;
        let mut attributes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = self.u2()?;
            let length = self.u4()? as usize;
            let info = self.take(length)?.to_vec();
            attributes.push(AttributeInfo::new(name_index, info));
        }
        Ok(attributes)
    }
}

/// Options for [`ClassReader::accept`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Do not deliver original method bodies
    pub skip_code: bool,
}

impl ReadOptions {
    pub const SKIP_CODE: ReadOptions = ReadOptions { skip_code: true };
}

#[derive(Debug, Clone)]
pub struct ClassReader {
    class_file: ClassFile,
}

impl ClassReader {
    pub fn parse(bytes: &[u8]) -> ReadResult<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let magic = cursor.u4()?;
        if magic != MAGIC {
            return Err(ClassReadError::BadMagic(magic));
        }
        let minor_version = cursor.u2()?;
        let major_version = cursor.u2()?;
        let constant_pool = read_constant_pool(&mut cursor)?;
        let access_flags = cursor.u2()?;
        let this_class = cursor.u2()?;
        let super_class = cursor.u2()?;

        let interface_count = cursor.u2()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(cursor.u2()?);
        }

        let field_count = cursor.u2()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let mut field = super::field::FieldInfo::new(cursor.u2()?, cursor.u2()?, cursor.u2()?);
            field.attributes = cursor.attributes()?;
            fields.push(field);
        }

        let method_count = cursor.u2()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let mut method = super::method::MethodInfo::new(cursor.u2()?, cursor.u2()?, cursor.u2()?);
            method.attributes = cursor.attributes()?;
            methods.push(method);
        }

        let attributes = cursor.attributes()?;
        if cursor.remaining() != 0 {
            return Err(ClassReadError::TrailingBytes(cursor.remaining()));
        }

        Ok(Self {
            class_file: ClassFile {
                magic,
                minor_version,
                major_version,
                constant_pool,
                access_flags,
                this_class,
                super_class,
                interfaces,
                fields,
                methods,
                attributes,
            },
        })
    }

    pub fn class_file(&self) -> &ClassFile {
        &self.class_file
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.class_file.constant_pool
    }

    /// Internal name of the class being read
    pub fn class_name(&self) -> ReadResult<&str> {
        Ok(self.class_file.name()?)
    }

    /// Replays the class as visitor events.
    pub fn accept(&self, visitor: &mut dyn ClassVisitor, options: ReadOptions) -> Result<()> {
        let cf = &self.class_file;
        let cp = &cf.constant_pool;

        let header = ClassHeader {
            minor_version: cf.minor_version,
            major_version: cf.major_version,
            access_flags: cf.access_flags,
            name: cp.class_name(cf.this_class).map_err(ClassReadError::from)?.to_string(),
            super_name: match cf.super_class {
                0 => None,
                index => Some(cp.class_name(index).map_err(ClassReadError::from)?.to_string()),
            },
            interfaces: cf
                .interfaces
                .iter()
                .map(|&i| cp.class_name(i).map(str::to_string))
                .collect::<std::result::Result<_, _>>()
                .map_err(ClassReadError::from)?,
            slots: Some(HeaderSlots {
                this_class: cf.this_class,
                super_class: cf.super_class,
                interfaces: cf.interfaces.clone(),
            }),
        };
        log::debug!(
            "reading class {} ({} fields, {} methods)",
            header.name,
            cf.fields.len(),
            cf.methods.len()
        );
        visitor.visit_header(&header)?;

        for field in &cf.fields {
            let decl = FieldDecl {
                access_flags: field.access_flags,
                name: cp.utf8(field.name_index).map_err(ClassReadError::from)?.to_string(),
                descriptor: cp.utf8(field.descriptor_index).map_err(ClassReadError::from)?.to_string(),
                attributes: field.attributes.clone(),
                slots: Some(MemberSlots {
                    name: field.name_index,
                    descriptor: field.descriptor_index,
                    ..MemberSlots::default()
                }),
            };
            visitor.visit_field(&decl)?;
        }

        for method in &cf.methods {
            let parts = split_method_attributes(cp, &method.attributes)?;
            let decl = MethodDecl {
                access_flags: method.access_flags,
                name: cp.utf8(method.name_index).map_err(ClassReadError::from)?.to_string(),
                descriptor: cp.utf8(method.descriptor_index).map_err(ClassReadError::from)?.to_string(),
                signature: parts.signature.as_ref().map(|(value, _)| value.clone()),
                exceptions: parts.exceptions.iter().map(|(name, _)| name.clone()).collect(),
                slots: Some(MemberSlots {
                    name: method.name_index,
                    descriptor: method.descriptor_index,
                    signature: parts.signature.as_ref().map(|&(_, index)| index),
                    exceptions: parts.exceptions.iter().map(|&(_, index)| index).collect(),
                }),
            };
            let mut mv = visitor.visit_method(&decl)?;
            for attribute in &parts.others {
                mv.visit_attribute(attribute)?;
            }
            if let Some(code) = parts.code {
                if !options.skip_code {
                    mv.visit_raw_code(&CodeAttribute::parse(&code.info)?)?;
                }
            }
            mv.visit_end()?;
        }

        for attribute in &cf.attributes {
            visitor.visit_attribute(attribute)?;
        }
        visitor.visit_end()
    }
}

/// A method's attributes, with `Signature` and `Exceptions` resolved to
/// `(value, pool index)` pairs
struct MethodAttributes<'a> {
    code: Option<&'a AttributeInfo>,
    signature: Option<(String, u16)>,
    exceptions: Vec<(String, u16)>,
    others: Vec<&'a AttributeInfo>,
}

fn split_method_attributes<'a>(cp: &ConstantPool, attributes: &'a [AttributeInfo]) -> ReadResult<MethodAttributes<'a>> {
    let mut parts = MethodAttributes { code: None, signature: None, exceptions: Vec::new(), others: Vec::new() };
    let mut seen_exceptions = false;
    for attribute in attributes {
        match attribute.name(cp)? {
            attribute_names::CODE => {
                if parts.code.replace(attribute).is_some() {
                    return Err(duplicate(attribute_names::CODE));
                }
            }
            attribute_names::SIGNATURE => {
                let index = parse_signature_payload(&attribute.info)?;
                if parts.signature.replace((cp.utf8(index)?.to_string(), index)).is_some() {
                    return Err(duplicate(attribute_names::SIGNATURE));
                }
            }
            attribute_names::EXCEPTIONS => {
                if seen_exceptions {
                    return Err(duplicate(attribute_names::EXCEPTIONS));
                }
                seen_exceptions = true;
                for index in parse_exceptions_payload(&attribute.info)? {
                    parts.exceptions.push((cp.class_name(index)?.to_string(), index));
                }
            }
            _ => parts.others.push(attribute),
        }
    }
    Ok(parts)
}

fn duplicate(attribute: &'static str) -> ClassReadError {
    ClassReadError::MalformedAttribute { attribute, reason: "declared more than once".to_string() }
}

fn read_constant_pool(cursor: &mut ByteCursor<'_>) -> ReadResult<ConstantPool> {
    let count = cursor.u2()?;
    let mut constants = Vec::with_capacity(count as usize);
    let mut index: u16 = 1;
    while index < count {
        let tag = cursor.u1()?;
        let constant = match tag {
            CONSTANT_UTF8 => {
                let length = cursor.u2()? as usize;
                let bytes = cursor.take(length)?;
                Constant::Utf8(decode_modified_utf8(bytes).ok_or(ClassReadError::InvalidUtf8(index))?)
            }
            CONSTANT_INTEGER => Constant::Integer(cursor.u4()? as i32),
            CONSTANT_FLOAT => Constant::Float(f32::from_bits(cursor.u4()?)),
            CONSTANT_LONG => Constant::Long(cursor.u8()? as i64),
            CONSTANT_DOUBLE => Constant::Double(f64::from_bits(cursor.u8()?)),
            CONSTANT_CLASS => Constant::Class(cursor.u2()?),
            CONSTANT_STRING => Constant::String(cursor.u2()?),
            CONSTANT_FIELDREF => Constant::FieldRef(cursor.u2()?, cursor.u2()?),
            CONSTANT_METHODREF => Constant::MethodRef(cursor.u2()?, cursor.u2()?),
            CONSTANT_INTERFACEMETHODREF => Constant::InterfaceMethodRef(cursor.u2()?, cursor.u2()?),
            CONSTANT_NAMEANDTYPE => Constant::NameAndType(cursor.u2()?, cursor.u2()?),
            CONSTANT_METHODHANDLE => Constant::MethodHandle(cursor.u1()?, cursor.u2()?),
            CONSTANT_METHODTYPE => Constant::MethodType(cursor.u2()?),
            CONSTANT_DYNAMIC => Constant::Dynamic(cursor.u2()?, cursor.u2()?),
            CONSTANT_INVOKEDYNAMIC => Constant::InvokeDynamic(cursor.u2()?, cursor.u2()?),
            CONSTANT_MODULE => Constant::Module(cursor.u2()?),
            CONSTANT_PACKAGE => Constant::Package(cursor.u2()?),
            _ => return Err(ClassReadError::UnknownConstantTag { tag, index }),
        };
        let width = constant.width();
        constants.push(constant);
        if width == 2 {
            constants.push(Constant::Unusable);
        }
        index = index.saturating_add(width);
    }
    Ok(ConstantPool::from_constants(constants))
}
