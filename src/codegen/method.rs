//! MethodInfo structure and serialization

use super::attribute::{AttributeInfo, CodeAttribute};
use super::constpool::ConstantPool;
use super::defs::attribute_names;
use super::error::ReadResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    /// Raw `Code` attributes of this method, in declaration order
    pub fn code_attributes<'a>(&'a self, constant_pool: &'a ConstantPool) -> impl Iterator<Item = &'a AttributeInfo> + 'a {
        self.attributes
            .iter()
            .filter(move |a| matches!(a.name(constant_pool), Ok(attribute_names::CODE)))
    }

    /// The decoded `Code` attribute, if any
    pub fn code(&self, constant_pool: &ConstantPool) -> ReadResult<Option<CodeAttribute>> {
        self.code_attributes(constant_pool)
            .next()
            .map(|a| CodeAttribute::parse(&a.info))
            .transpose()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.access_flags.to_be_bytes());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&self.descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes { bytes.extend_from_slice(&attribute.to_bytes()); }
        bytes
    }
}
