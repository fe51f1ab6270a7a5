//! Constant pool and constants for Java class files
//!
//! Indices are 1-based as in the class file. `Long` and `Double` occupy two
//! slots; the second slot is held by [`Constant::Unusable`].

use std::collections::HashMap;

use super::error::{ConstPoolError, ConstPoolResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
    /// Shadow slot following a `Long` or `Double`
    Unusable,
}

pub mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
    pub const CONSTANT_METHODHANDLE: u8 = 15;
    pub const CONSTANT_METHODTYPE: u8 = 16;
    pub const CONSTANT_DYNAMIC: u8 = 17;
    pub const CONSTANT_INVOKEDYNAMIC: u8 = 18;
    pub const CONSTANT_MODULE: u8 = 19;
    pub const CONSTANT_PACKAGE: u8 = 20;
}

impl Constant {
    /// Number of pool slots this constant occupies
    pub fn width(&self) -> u16 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class(_) => "Class",
            Constant::String(_) => "String",
            Constant::FieldRef(..) => "Fieldref",
            Constant::MethodRef(..) => "Methodref",
            Constant::InterfaceMethodRef(..) => "InterfaceMethodref",
            Constant::NameAndType(..) => "NameAndType",
            Constant::MethodHandle(..) => "MethodHandle",
            Constant::MethodType(_) => "MethodType",
            Constant::Dynamic(..) => "Dynamic",
            Constant::InvokeDynamic(..) => "InvokeDynamic",
            Constant::Module(_) => "Module",
            Constant::Package(_) => "Package",
            Constant::Unusable => "Unusable",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    pub(crate) constants: Vec<Constant>,
    utf8_index: HashMap<String, u16>,
    class_index: HashMap<u16, u16>,
    name_and_type_index: HashMap<(u16, u16), u16>,
    method_ref_index: HashMap<(u16, u16), u16>,
    interface_method_ref_index: HashMap<(u16, u16), u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a pool from decoded constants, keeping their slot positions.
    /// The first occurrence of a duplicated entry is the one later lookups reuse.
    pub fn from_constants(constants: Vec<Constant>) -> Self {
        let mut pool = Self { constants, ..Self::default() };
        for i in 0..pool.constants.len() {
            let index = (i + 1) as u16;
            pool.remember(index);
        }
        pool
    }

    /// Number of slots, i.e. `constant_pool_count - 1`
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.constants.iter().enumerate().map(|(i, c)| ((i + 1) as u16, c))
    }

    pub fn get(&self, index: u16) -> ConstPoolResult<&Constant> {
        if index == 0 {
            return Err(ConstPoolError::InvalidIndex(index));
        }
        match self.constants.get(index as usize - 1) {
            Some(Constant::Unusable) | None => Err(ConstPoolError::InvalidIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> ConstPoolResult<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            _ => Err(ConstPoolError::UnexpectedEntry { index, expected: "Utf8" }),
        }
    }

    /// Internal name referenced by a `Class` entry
    pub fn class_name(&self, index: u16) -> ConstPoolResult<&str> {
        match self.get(index)? {
            Constant::Class(name_index) => self.utf8(*name_index),
            _ => Err(ConstPoolError::UnexpectedEntry { index, expected: "Class" }),
        }
    }

    /// `(name, descriptor)` referenced by a `NameAndType` entry
    pub fn name_and_type(&self, index: u16) -> ConstPoolResult<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType(name, descriptor) => Ok((self.utf8(*name)?, self.utf8(*descriptor)?)),
            _ => Err(ConstPoolError::UnexpectedEntry { index, expected: "NameAndType" }),
        }
    }

    /// `(owner, name, descriptor)` of any member reference entry
    pub fn member_ref(&self, index: u16) -> ConstPoolResult<(&str, &str, &str)> {
        match self.get(index)? {
            Constant::FieldRef(class, nat)
            | Constant::MethodRef(class, nat)
            | Constant::InterfaceMethodRef(class, nat) => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*nat)?;
                Ok((owner, name, descriptor))
            }
            _ => Err(ConstPoolError::UnexpectedEntry { index, expected: "member reference" }),
        }
    }

    pub fn add_utf8(&mut self, value: &str) -> ConstPoolResult<u16> {
        if let Some(&index) = self.utf8_index.get(value) {
            return Ok(index);
        }
        self.push(Constant::Utf8(value.to_string()))
    }

    /// `slot` if it already holds the Utf8 `value`, otherwise the index `add_utf8` gives.
    /// Keeps a member on the copy of a duplicated entry it was read from.
    pub fn utf8_at_or_add(&mut self, slot: Option<u16>, value: &str) -> ConstPoolResult<u16> {
        match slot {
            Some(index) if self.utf8(index).ok() == Some(value) => Ok(index),
            _ => self.add_utf8(value),
        }
    }

    /// `add_class` counterpart of [`utf8_at_or_add`](Self::utf8_at_or_add)
    pub fn class_at_or_add(&mut self, slot: Option<u16>, name: &str) -> ConstPoolResult<u16> {
        match slot {
            Some(index) if self.class_name(index).ok() == Some(name) => Ok(index),
            _ => self.add_class(name),
        }
    }

    pub fn add_class(&mut self, name: &str) -> ConstPoolResult<u16> {
        let name_index = self.add_utf8(name)?;
        if let Some(&index) = self.class_index.get(&name_index) {
            return Ok(index);
        }
        self.push(Constant::Class(name_index))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let key = (self.add_utf8(name)?, self.add_utf8(descriptor)?);
        if let Some(&index) = self.name_and_type_index.get(&key) {
            return Ok(index);
        }
        self.push(Constant::NameAndType(key.0, key.1))
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let key = (self.add_class(class)?, self.add_name_and_type(name, descriptor)?);
        if let Some(&index) = self.method_ref_index.get(&key) {
            return Ok(index);
        }
        self.push(Constant::MethodRef(key.0, key.1))
    }

    pub fn add_interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let key = (self.add_class(class)?, self.add_name_and_type(name, descriptor)?);
        if let Some(&index) = self.interface_method_ref_index.get(&key) {
            return Ok(index);
        }
        self.push(Constant::InterfaceMethodRef(key.0, key.1))
    }

    pub fn add_string(&mut self, value: &str) -> ConstPoolResult<u16> {
        let utf8_index = self.add_utf8(value)?;
        let existing = self.iter().find_map(|(i, c)| match c {
            Constant::String(s) if *s == utf8_index => Some(i),
            _ => None,
        });
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::String(utf8_index)),
        }
    }

    pub fn add_integer(&mut self, value: i32) -> ConstPoolResult<u16> {
        self.push(Constant::Integer(value))
    }

    pub fn add_long(&mut self, value: i64) -> ConstPoolResult<u16> {
        self.push(Constant::Long(value))
    }

    /// Appends a constant, adding the shadow slot for wide entries.
    fn push(&mut self, constant: Constant) -> ConstPoolResult<u16> {
        let width = constant.width() as usize;
        // constant_pool_count is a u2 and counts one more than the slots in use
        if self.constants.len() + width >= u16::MAX as usize {
            return Err(ConstPoolError::OutOfSpace);
        }
        self.constants.push(constant);
        let index = self.constants.len() as u16;
        if width == 2 {
            self.constants.push(Constant::Unusable);
        }
        self.remember(index);
        Ok(index)
    }

    fn remember(&mut self, index: u16) {
        match &self.constants[index as usize - 1] {
            Constant::Utf8(value) => {
                self.utf8_index.entry(value.clone()).or_insert(index);
            }
            Constant::Class(name) => {
                self.class_index.entry(*name).or_insert(index);
            }
            Constant::NameAndType(name, descriptor) => {
                self.name_and_type_index.entry((*name, *descriptor)).or_insert(index);
            }
            Constant::MethodRef(class, nat) => {
                self.method_ref_index.entry((*class, *nat)).or_insert(index);
            }
            Constant::InterfaceMethodRef(class, nat) => {
                self.interface_method_ref_index.entry((*class, *nat)).or_insert(index);
            }
            _ => {}
        }
    }
}

/// Encodes a string as JVM modified UTF-8 (JVMS 4.4.7).
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                bytes.push(0xc0 | ((unit >> 6) as u8 & 0x1f));
                bytes.push(0x80 | (unit as u8 & 0x3f));
            }
            _ => {
                bytes.push(0xe0 | ((unit >> 12) as u8 & 0x0f));
                bytes.push(0x80 | ((unit >> 6) as u8 & 0x3f));
                bytes.push(0x80 | (unit as u8 & 0x3f));
            }
        }
    }
    bytes
}

/// Decodes JVM modified UTF-8, returning `None` on malformed input.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        if b0 & 0x80 == 0 {
            if b0 == 0 {
                return None;
            }
            units.push(b0);
            i += 1;
        } else if b0 & 0xe0 == 0xc0 {
            let b1 = *bytes.get(i + 1)? as u16;
            if b1 & 0xc0 != 0x80 {
                return None;
            }
            units.push(((b0 & 0x1f) << 6) | (b1 & 0x3f));
            i += 2;
        } else if b0 & 0xf0 == 0xe0 {
            let b1 = *bytes.get(i + 1)? as u16;
            let b2 = *bytes.get(i + 2)? as u16;
            if b1 & 0xc0 != 0x80 || b2 & 0xc0 != 0x80 {
                return None;
            }
            units.push(((b0 & 0x0f) << 12) | ((b1 & 0x3f) << 6) | (b2 & 0x3f));
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_one_based_and_deduplicated() {
        let mut cp = ConstantPool::new();
        let a = cp.add_utf8("Code").unwrap();
        let b = cp.add_utf8("Code").unwrap();
        assert_eq!(a, 1);
        assert_eq!(a, b);
        let class = cp.add_class("java/lang/Error").unwrap();
        assert_eq!(cp.add_class("java/lang/Error").unwrap(), class);
        assert_eq!(cp.class_name(class).unwrap(), "java/lang/Error");
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut cp = ConstantPool::new();
        let l = cp.add_long(7).unwrap();
        let next = cp.add_utf8("x").unwrap();
        assert_eq!(l, 1);
        assert_eq!(next, 3);
        assert_eq!(cp.get(2), Err(ConstPoolError::InvalidIndex(2)));
    }

    #[test]
    fn method_ref_resolves_back() {
        let mut cp = ConstantPool::new();
        let idx = cp.add_method_ref("com/example/Boom", "<init>", "()V").unwrap();
        assert_eq!(cp.member_ref(idx).unwrap(), ("com/example/Boom", "<init>", "()V"));
        assert_eq!(cp.add_method_ref("com/example/Boom", "<init>", "()V").unwrap(), idx);
    }

    #[test]
    fn seeded_pool_reuses_existing_entries() {
        let constants = vec![
            Constant::Utf8("java/lang/Error".into()),
            Constant::Class(1),
        ];
        let mut cp = ConstantPool::from_constants(constants);
        assert_eq!(cp.add_class("java/lang/Error").unwrap(), 2);
        assert_eq!(cp.len(), 2);
    }

    #[test]
    fn slots_are_kept_only_while_they_match() {
        let constants = vec![
            Constant::Utf8("x".into()),
            Constant::Utf8("I".into()),
            Constant::Utf8("x".into()),
            Constant::Class(1),
            Constant::Class(1),
        ];
        let mut cp = ConstantPool::from_constants(constants);
        assert_eq!(cp.add_utf8("x").unwrap(), 1);
        assert_eq!(cp.utf8_at_or_add(Some(3), "x").unwrap(), 3);
        // wrong value, wrong kind and out of range all fall back to the first copy
        assert_eq!(cp.utf8_at_or_add(Some(2), "x").unwrap(), 1);
        assert_eq!(cp.utf8_at_or_add(Some(4), "x").unwrap(), 1);
        assert_eq!(cp.utf8_at_or_add(Some(40), "x").unwrap(), 1);

        assert_eq!(cp.class_at_or_add(Some(5), "x").unwrap(), 5);
        assert_eq!(cp.class_at_or_add(Some(2), "x").unwrap(), 4);
        assert_eq!(cp.len(), 5);
        assert_eq!(cp.utf8_at_or_add(None, "y").unwrap(), 6);
    }

    #[test]
    fn wrong_kind_is_reported() {
        let mut cp = ConstantPool::new();
        let utf8 = cp.add_utf8("x").unwrap();
        assert_eq!(
            cp.class_name(utf8),
            Err(ConstPoolError::UnexpectedEntry { index: utf8, expected: "Class" })
        );
        assert_eq!(cp.get(0), Err(ConstPoolError::InvalidIndex(0)));
    }

    #[test]
    fn modified_utf8_handles_nul_and_supplementary() {
        let s = "a\u{0}b\u{1F600}";
        let encoded = encode_modified_utf8(s);
        assert_eq!(&encoded[1..3], &[0xc0, 0x80]);
        assert_eq!(encoded.len(), 1 + 2 + 1 + 6);
        assert_eq!(decode_modified_utf8(&encoded).as_deref(), Some(s));
        assert_eq!(decode_modified_utf8(&[0x00]), None);
        assert_eq!(decode_modified_utf8(&[0xc0]), None);
    }
}
