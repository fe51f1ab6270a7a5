//! Specific error types for classfile reading, writing and descriptor parsing

use thiserror::Error;

/// Errors that can occur during constant pool operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConstPoolError {
    #[error("Constant pool is out of space")]
    OutOfSpace,
    #[error("Invalid constant pool index: {0}")]
    InvalidIndex(u16),
    #[error("Constant pool entry {index} is not a {expected}")]
    UnexpectedEntry { index: u16, expected: &'static str },
}

/// Errors that can occur while decoding a class file
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassReadError {
    #[error("Unexpected end of class data at offset {offset} (wanted {wanted} more bytes)")]
    Truncated { offset: usize, wanted: usize },
    #[error("Bad magic number: 0x{0:08x}")]
    BadMagic(u32),
    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },
    #[error("Invalid modified UTF-8 in constant pool entry {0}")]
    InvalidUtf8(u16),
    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),
    #[error("Malformed {attribute} attribute: {reason}")]
    MalformedAttribute { attribute: &'static str, reason: String },
    #[error("{0} trailing bytes after class file end")]
    TrailingBytes(usize),
}

/// Errors that can occur while emitting a class file
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassWriteError {
    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),
    #[error("Code of method {method} is too long: {length} bytes")]
    CodeTooLong { method: String, length: usize },
    #[error("Too many {what}: {count}")]
    TooMany { what: &'static str, count: usize },
    #[error("{event} received after visit_end of {target}")]
    AfterEnd { event: &'static str, target: String },
    #[error("visit_header must be the first class event")]
    MissingHeader,
    #[error("{event} for method {method} outside of a visit_code/visit_maxs pair")]
    NoOpenBody { event: &'static str, method: String },
    #[error("visit_end for method {method} before its body was closed by visit_maxs")]
    UnclosedBody { method: String },
    #[error("Method {method} received code events twice")]
    DuplicateCode { method: String },
}

/// Errors that can occur during descriptor parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Invalid method descriptor {descriptor:?}: {reason}")]
    InvalidMethodDescriptor { descriptor: String, reason: &'static str },
    #[error("Invalid field descriptor {descriptor:?}: {reason}")]
    InvalidFieldDescriptor { descriptor: String, reason: &'static str },
}

pub type ConstPoolResult<T> = Result<T, ConstPoolError>;

pub type ReadResult<T> = Result<T, ClassReadError>;

pub type WriteResult<T> = Result<T, ClassWriteError>;

pub type DescriptorResult<T> = Result<T, DescriptorError>;
