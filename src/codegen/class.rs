//! Core classfile structure

use super::attribute::AttributeInfo;
use super::constpool::ConstantPool;
use super::defs::{JAVA_1_8, MAGIC};
use super::error::ConstPoolResult;
use super::field::FieldInfo;
use super::method::MethodInfo;

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version: JAVA_1_8,
            constant_pool: ConstantPool::new(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Internal name of this class
    pub fn name(&self) -> ConstPoolResult<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Finds a method by name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            self.constant_pool.utf8(m.name_index).ok() == Some(name)
                && self.constant_pool.utf8(m.descriptor_index).ok() == Some(descriptor)
        })
    }

    // Serialization lives in writer::ClassfileWritable
}

impl Default for ClassFile {
    fn default() -> Self {
        Self::new()
    }
}
