//! Attributes and exception table structures for Java class files
//!
//! Attributes other than `Code` are carried as raw payloads; their
//! constant pool references stay valid as long as the pool they were read
//! with is the one they are written against.

use super::constpool::ConstantPool;
use super::error::{ClassReadError, ConstPoolResult, ReadResult};
use super::reader::ByteCursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(name_index: u16, info: Vec<u8>) -> Self {
        Self { name_index, info }
    }

    /// Builds an attribute, interning its name in `constant_pool`
    pub fn named(constant_pool: &mut ConstantPool, name: &str, info: Vec<u8>) -> ConstPoolResult<Self> {
        Ok(Self::new(constant_pool.add_utf8(name)?, info))
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> ConstPoolResult<&'a str> {
        constant_pool.utf8(self.name_index)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(6 + self.info.len());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&(self.info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.info);
        bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Decodes the payload of a `Code` attribute
    pub fn parse(info: &[u8]) -> ReadResult<Self> {
        let mut cursor = ByteCursor::new(info);
        let max_stack = cursor.u2()?;
        let max_locals = cursor.u2()?;
        let code_length = cursor.u4()? as usize;
        let code = cursor.take(code_length)?.to_vec();
        let exception_count = cursor.u2()?;
        let mut exception_table = Vec::with_capacity(exception_count as usize);
        for _ in 0..exception_count {
            exception_table.push(ExceptionTableEntry {
                start_pc: cursor.u2()?,
                end_pc: cursor.u2()?,
                handler_pc: cursor.u2()?,
                catch_type: cursor.u2()?,
            });
        }
        let attributes = cursor.attributes()?;
        if cursor.remaining() != 0 {
            return Err(ClassReadError::MalformedAttribute {
                attribute: "Code",
                reason: format!("{} unread bytes", cursor.remaining()),
            });
        }
        Ok(Self { max_stack, max_locals, code, exception_table, attributes })
    }

    /// Payload bytes, without the attribute name and length header
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.max_stack.to_be_bytes());
        bytes.extend_from_slice(&self.max_locals.to_be_bytes());
        bytes.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.extend_from_slice(&(self.exception_table.len() as u16).to_be_bytes());
        for entry in &self.exception_table {
            bytes.extend_from_slice(&entry.to_bytes());
        }
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes {
            bytes.extend_from_slice(&attribute.to_bytes());
        }
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(&self.start_pc.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.end_pc.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.handler_pc.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.catch_type.to_be_bytes());
        bytes
    }
}

/// Payload of an `Exceptions` attribute listing `Class` entries
pub fn exceptions_payload(class_indices: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + 2 * class_indices.len());
    bytes.extend_from_slice(&(class_indices.len() as u16).to_be_bytes());
    for index in class_indices {
        bytes.extend_from_slice(&index.to_be_bytes());
    }
    bytes
}

/// Decodes the `Class` indices of an `Exceptions` attribute payload
pub fn parse_exceptions_payload(info: &[u8]) -> ReadResult<Vec<u16>> {
    let mut cursor = ByteCursor::new(info);
    let count = cursor.u2()?;
    let mut indices = Vec::with_capacity(count as usize);
    for _ in 0..count {
        indices.push(cursor.u2()?);
    }
    if cursor.remaining() != 0 {
        return Err(ClassReadError::MalformedAttribute {
            attribute: "Exceptions",
            reason: format!("{} unread bytes", cursor.remaining()),
        });
    }
    Ok(indices)
}

/// Decodes the Utf8 index held by a `Signature` attribute payload
pub fn parse_signature_payload(info: &[u8]) -> ReadResult<u16> {
    if info.len() != 2 {
        return Err(ClassReadError::MalformedAttribute {
            attribute: "Signature",
            reason: format!("expected 2 bytes, found {}", info.len()),
        });
    }
    Ok(u16::from_be_bytes([info[0], info[1]]))
}
