//! Terminal visitor that assembles a [`ClassFile`] from events
//!
//! A writer seeded with a reader's constant pool ([`ClassWriter::from_reader`])
//! keeps every existing pool index stable, so raw attributes forwarded from
//! that reader stay valid byte for byte. Names and descriptors go back to the
//! slots recorded in the events when those still match; anything else is
//! appended and deduplicated against what is already there.
//!
//! Method attributes are emitted in a fixed order: `Code`, `Exceptions`,
//! `Signature`, then forwarded attributes in arrival order.

use super::attribute::{exceptions_payload, AttributeInfo, CodeAttribute};
use super::class::ClassFile;
use super::constpool::ConstantPool;
use super::defs::{attribute_names, MAX_CODE_LENGTH};
use super::descriptor::parse_method_descriptor;
use super::error::{ClassWriteError, WriteResult};
use super::field::FieldInfo;
use super::method::MethodInfo;
use super::opcodes;
use super::reader::ClassReader;
use super::visitor::{ClassHeader, ClassVisitor, EndGuard, FieldDecl, Insn, MethodDecl, MethodVisitor};
use super::writer::class_file_to_bytes;
use crate::error::Result;

#[derive(Debug)]
pub struct ClassWriter {
    class_file: ClassFile,
    header_seen: bool,
    guard: EndGuard,
}

impl ClassWriter {
    /// A writer with an empty constant pool
    pub fn new() -> Self {
        Self { class_file: ClassFile::new(), header_seen: false, guard: EndGuard::default() }
    }

    /// A writer whose constant pool starts as a copy of the reader's
    pub fn from_reader(reader: &ClassReader) -> Self {
        let mut writer = Self::new();
        writer.class_file.constant_pool = reader.constant_pool().clone();
        writer
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.class_file.constant_pool
    }

    pub fn class_file(&self) -> WriteResult<&ClassFile> {
        if !self.header_seen {
            return Err(ClassWriteError::MissingHeader);
        }
        Ok(&self.class_file)
    }

    pub fn into_class_file(self) -> WriteResult<ClassFile> {
        if !self.header_seen {
            return Err(ClassWriteError::MissingHeader);
        }
        Ok(self.class_file)
    }

    pub fn to_bytes(&self) -> WriteResult<Vec<u8>> {
        Ok(class_file_to_bytes(self.class_file()?))
    }

    fn target(&self) -> String {
        self.class_file.name().unwrap_or("<class>").to_string()
    }

    fn check_open(&self, event: &'static str) -> WriteResult<()> {
        self.guard.check(event, &self.target())?;
        if !self.header_seen {
            return Err(ClassWriteError::MissingHeader);
        }
        Ok(())
    }
}

impl Default for ClassWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fails when a u2-counted table would hold `count` entries
fn check_count(what: &'static str, count: usize) -> WriteResult<()> {
    if count > u16::MAX as usize {
        return Err(ClassWriteError::TooMany { what, count });
    }
    Ok(())
}

impl ClassVisitor for ClassWriter {
    fn visit_header(&mut self, header: &ClassHeader) -> Result<()> {
        self.guard.check("visit_header", &header.name)?;
        let slots = header.slots.as_ref();
        let cf = &mut self.class_file;
        let cp = &mut cf.constant_pool;
        cf.minor_version = header.minor_version;
        cf.major_version = header.major_version;
        cf.access_flags = header.access_flags;
        cf.this_class = cp
            .class_at_or_add(slots.map(|s| s.this_class), &header.name)
            .map_err(ClassWriteError::from)?;
        cf.super_class = match &header.super_name {
            Some(name) => cp
                .class_at_or_add(slots.map(|s| s.super_class), name)
                .map_err(ClassWriteError::from)?,
            None => 0,
        };
        check_count("interfaces", header.interfaces.len())?;
        cf.interfaces = header
            .interfaces
            .iter()
            .enumerate()
            .map(|(i, name)| cp.class_at_or_add(slots.and_then(|s| s.interfaces.get(i).copied()), name))
            .collect::<std::result::Result<_, _>>()
            .map_err(ClassWriteError::from)?;
        self.header_seen = true;
        Ok(())
    }

    fn visit_field(&mut self, field: &FieldDecl) -> Result<()> {
        self.check_open("visit_field")?;
        let cf = &mut self.class_file;
        check_count("fields", cf.fields.len() + 1)?;
        let slots = field.slots.as_ref();
        let cp = &mut cf.constant_pool;
        let name_index = cp.utf8_at_or_add(slots.map(|s| s.name), &field.name).map_err(ClassWriteError::from)?;
        let descriptor_index = cp
            .utf8_at_or_add(slots.map(|s| s.descriptor), &field.descriptor)
            .map_err(ClassWriteError::from)?;
        let mut info = FieldInfo::new(field.access_flags, name_index, descriptor_index);
        info.attributes = field.attributes.clone();
        cf.fields.push(info);
        Ok(())
    }

    fn visit_method<'a>(&'a mut self, method: &MethodDecl) -> Result<Box<dyn MethodVisitor + 'a>> {
        self.check_open("visit_method")?;
        let cf = &mut self.class_file;
        check_count("methods", cf.methods.len() + 1)?;
        let slots = method.slots.as_ref();
        let cp = &mut cf.constant_pool;
        let name_index = cp.utf8_at_or_add(slots.map(|s| s.name), &method.name).map_err(ClassWriteError::from)?;
        let descriptor_index = cp
            .utf8_at_or_add(slots.map(|s| s.descriptor), &method.descriptor)
            .map_err(ClassWriteError::from)?;

        let mut leading = Vec::new();
        if !method.exceptions.is_empty() {
            let indices = method
                .exceptions
                .iter()
                .enumerate()
                .map(|(i, name)| cp.class_at_or_add(slots.and_then(|s| s.exceptions.get(i).copied()), name))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(ClassWriteError::from)?;
            leading.push(
                AttributeInfo::named(cp, attribute_names::EXCEPTIONS, exceptions_payload(&indices))
                    .map_err(ClassWriteError::from)?,
            );
        }
        if let Some(signature) = &method.signature {
            let signature_index = cp
                .utf8_at_or_add(slots.and_then(|s| s.signature), signature)
                .map_err(ClassWriteError::from)?;
            leading.push(
                AttributeInfo::named(cp, attribute_names::SIGNATURE, signature_index.to_be_bytes().to_vec())
                    .map_err(ClassWriteError::from)?,
            );
        }

        Ok(Box::new(MethodWriter {
            class_file: cf,
            info: MethodInfo::new(method.access_flags, name_index, descriptor_index),
            name: method.name.clone(),
            leading,
            forwarded: Vec::new(),
            code: None,
            building: None,
            guard: EndGuard::default(),
        }))
    }

    fn visit_attribute(&mut self, attribute: &AttributeInfo) -> Result<()> {
        self.check_open("visit_attribute")?;
        self.class_file.attributes.push(attribute.clone());
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        let target = self.target();
        self.guard.end(&target)?;
        if !self.header_seen {
            return Err(ClassWriteError::MissingHeader.into());
        }
        Ok(())
    }
}

/// Sink for one method, writing into the owning class on `visit_end`
struct MethodWriter<'a> {
    class_file: &'a mut ClassFile,
    info: MethodInfo,
    name: String,
    leading: Vec<AttributeInfo>,
    forwarded: Vec<AttributeInfo>,
    code: Option<CodeAttribute>,
    /// Bytecode of a body opened by `visit_code` and not yet closed by `visit_maxs`
    building: Option<Vec<u8>>,
    guard: EndGuard,
}

impl MethodWriter<'_> {
    fn check_no_code(&self) -> WriteResult<()> {
        if self.code.is_some() || self.building.is_some() {
            return Err(ClassWriteError::DuplicateCode { method: self.name.clone() });
        }
        Ok(())
    }

    fn encode(&mut self, insn: &Insn) -> Result<()> {
        let cp = &mut self.class_file.constant_pool;
        let Some(code) = self.building.as_mut() else {
            return Err(ClassWriteError::NoOpenBody { event: "visit_insn", method: self.name.clone() }.into());
        };
        match insn {
            Insn::Simple(opcode) => code.push(*opcode),
            Insn::Type { opcode, class } => {
                let index = cp.add_class(class).map_err(ClassWriteError::from)?;
                code.push(*opcode);
                code.extend_from_slice(&index.to_be_bytes());
            }
            Insn::Method { opcode, owner, name, descriptor, interface } => {
                let index = if *interface {
                    cp.add_interface_method_ref(owner, name, descriptor)
                } else {
                    cp.add_method_ref(owner, name, descriptor)
                }
                .map_err(ClassWriteError::from)?;
                code.push(*opcode);
                code.extend_from_slice(&index.to_be_bytes());
                if *opcode == opcodes::INVOKEINTERFACE {
                    // count operand: argument slots plus the receiver
                    let args = parse_method_descriptor(descriptor)?.param_slots() + 1;
                    code.push(args as u8);
                    code.push(0);
                }
            }
        }
        Ok(())
    }
}

impl MethodVisitor for MethodWriter<'_> {
    fn visit_attribute(&mut self, attribute: &AttributeInfo) -> Result<()> {
        self.guard.check("visit_attribute", &self.name)?;
        self.forwarded.push(attribute.clone());
        Ok(())
    }

    fn visit_code(&mut self) -> Result<()> {
        self.guard.check("visit_code", &self.name)?;
        self.check_no_code()?;
        self.building = Some(Vec::new());
        Ok(())
    }

    fn visit_insn(&mut self, insn: &Insn) -> Result<()> {
        self.guard.check("visit_insn", &self.name)?;
        self.encode(insn)
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> Result<()> {
        self.guard.check("visit_maxs", &self.name)?;
        let Some(code) = self.building.take() else {
            return Err(ClassWriteError::NoOpenBody { event: "visit_maxs", method: self.name.clone() }.into());
        };
        if code.len() > MAX_CODE_LENGTH {
            return Err(ClassWriteError::CodeTooLong { method: self.name.clone(), length: code.len() }.into());
        }
        self.code = Some(CodeAttribute::new(max_stack, max_locals, code));
        Ok(())
    }

    fn visit_raw_code(&mut self, code: &CodeAttribute) -> Result<()> {
        self.guard.check("visit_raw_code", &self.name)?;
        self.check_no_code()?;
        self.code = Some(code.clone());
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        self.guard.end(&self.name)?;
        if self.building.is_some() {
            return Err(ClassWriteError::UnclosedBody { method: self.name.clone() }.into());
        }
        let mut attributes = Vec::with_capacity(1 + self.leading.len() + self.forwarded.len());
        if let Some(code) = self.code.take() {
            let cp = &mut self.class_file.constant_pool;
            attributes.push(AttributeInfo::named(cp, attribute_names::CODE, code.to_bytes()).map_err(ClassWriteError::from)?);
        }
        attributes.append(&mut self.leading);
        attributes.append(&mut self.forwarded);
        check_count("method attributes", attributes.len())?;

        let mut info = MethodInfo::new(self.info.access_flags, self.info.name_index, self.info.descriptor_index);
        info.attributes = attributes;
        self.class_file.methods.push(info);
        Ok(())
    }
}
