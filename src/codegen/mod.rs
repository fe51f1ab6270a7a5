//! Class file model, reader, writer and the visitor events between them
//!
//! ```text
//! bytes → ClassReader ──events──▶ stage ▶ … ▶ ClassWriter → ClassFile → bytes
//! ```

pub mod attribute;
pub mod class;
pub mod class_writer;
pub mod constpool;
pub mod defs;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod flag;
pub mod method;
pub mod opcodes;
pub mod reader;
pub mod visitor;
pub mod writer;

// Re-export commonly used types
pub use attribute::{AttributeInfo, CodeAttribute, ExceptionTableEntry};
pub use class::ClassFile;
pub use class_writer::ClassWriter;
pub use constpool::{Constant, ConstantPool};
pub use descriptor::{parse_field_descriptor, parse_method_descriptor, FieldType, MethodDescriptor, ReturnCategory, ReturnType};
pub use error::{ClassReadError, ClassWriteError, ConstPoolError, DescriptorError};
pub use field::FieldInfo;
pub use method::MethodInfo;
pub use reader::{ClassReader, ReadOptions};
pub use visitor::{
    ClassHeader, ClassVisitor, DiscardingMethodVisitor, FieldDecl, HeaderSlots, Insn, MemberSlots, MethodDecl, MethodVisitor,
};
pub use writer::{class_file_to_bytes, ClassfileWritable};
