//! Event interfaces between a class reader, transformation stages and a writer
//!
//! Each stage implements [`ClassVisitor`] and names the next stage through
//! [`ClassVisitor::delegate`]. Every event has a default implementation that
//! forwards it unchanged, so a stage only overrides what it rewrites. The
//! terminal stage (usually [`ClassWriter`](super::class_writer::ClassWriter))
//! overrides every event.

use super::attribute::{AttributeInfo, CodeAttribute};
use super::error::ClassWriteError;
use crate::error::Result;

/// Class-level data delivered before any member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    /// Where the names sat in the source pool, `None` for synthesized headers
    pub slots: Option<HeaderSlots>,
}

/// Constant pool indices of a header read from a class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSlots {
    pub this_class: u16,
    /// 0 when there is no superclass
    pub super_class: u16,
    pub interfaces: Vec<u16>,
}

/// Constant pool indices of a member read from a class file.
///
/// A pool may hold the same string more than once. A writer sharing the
/// reader's pool points the member back at these slots while they still
/// resolve to the same values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSlots {
    pub name: u16,
    pub descriptor: u16,
    pub signature: Option<u16>,
    pub exceptions: Vec<u16>,
}

/// A field declaration; attributes are forwarded raw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<AttributeInfo>,
    pub slots: Option<MemberSlots>,
}

/// A method declaration as seen at the start of the method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    /// Generic signature, from the `Signature` attribute
    pub signature: Option<String>,
    /// Internal names of declared checked exceptions, from the `Exceptions` attribute
    pub exceptions: Vec<String>,
    pub slots: Option<MemberSlots>,
}

impl MethodDecl {
    pub fn new(access_flags: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            exceptions: Vec::new(),
            slots: None,
        }
    }
}

/// A typed bytecode instruction event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn {
    /// An instruction without operands (`dup`, `athrow`, `iconst_0`, `ireturn`, ...)
    Simple(u8),
    /// An instruction taking a class operand (`new`, `checkcast`, ...)
    Type { opcode: u8, class: String },
    /// A method invocation
    Method {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
        interface: bool,
    },
}

impl Insn {
    pub fn opcode(&self) -> u8 {
        match self {
            Insn::Simple(opcode) | Insn::Type { opcode, .. } | Insn::Method { opcode, .. } => *opcode,
        }
    }
}

pub trait MethodVisitor {
    /// Next stage in the chain, `None` for a terminal visitor
    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        None
    }

    /// A method attribute other than `Code`, `Signature` and `Exceptions`
    fn visit_attribute(&mut self, attribute: &AttributeInfo) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_attribute(attribute),
            None => Ok(()),
        }
    }

    /// Start of a method body built from instruction events
    fn visit_code(&mut self) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_code(),
            None => Ok(()),
        }
    }

    fn visit_insn(&mut self, insn: &Insn) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_insn(insn),
            None => Ok(()),
        }
    }

    /// End of a body built from instruction events
    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_maxs(max_stack, max_locals),
            None => Ok(()),
        }
    }

    /// An original body, undecoded. Its constant pool references belong to
    /// the reader's pool.
    fn visit_raw_code(&mut self, code: &CodeAttribute) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_raw_code(code),
            None => Ok(()),
        }
    }

    fn visit_end(&mut self) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_end(),
            None => Ok(()),
        }
    }
}

pub trait ClassVisitor {
    /// Next stage in the chain, `None` for a terminal visitor
    fn delegate(&mut self) -> Option<&mut dyn ClassVisitor> {
        None
    }

    fn visit_header(&mut self, header: &ClassHeader) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_header(header),
            None => Ok(()),
        }
    }

    fn visit_field(&mut self, field: &FieldDecl) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_field(field),
            None => Ok(()),
        }
    }

    /// Starts a method and returns the sink for the rest of its events.
    fn visit_method<'a>(&'a mut self, method: &MethodDecl) -> Result<Box<dyn MethodVisitor + 'a>> {
        match self.delegate() {
            Some(next) => next.visit_method(method),
            None => Ok(Box::new(DiscardingMethodVisitor)),
        }
    }

    /// A class-level attribute
    fn visit_attribute(&mut self, attribute: &AttributeInfo) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_attribute(attribute),
            None => Ok(()),
        }
    }

    fn visit_end(&mut self) -> Result<()> {
        match self.delegate() {
            Some(next) => next.visit_end(),
            None => Ok(()),
        }
    }
}

/// Method sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardingMethodVisitor;

impl MethodVisitor for DiscardingMethodVisitor {}

/// Guards a method sink against events arriving after `visit_end`
#[derive(Debug, Default)]
pub(crate) struct EndGuard {
    ended: bool,
}

impl EndGuard {
    pub(crate) fn check(&self, event: &'static str, target: &str) -> std::result::Result<(), ClassWriteError> {
        if self.ended {
            return Err(ClassWriteError::AfterEnd { event, target: target.to_string() });
        }
        Ok(())
    }

    pub(crate) fn end(&mut self, target: &str) -> std::result::Result<(), ClassWriteError> {
        self.check("visit_end", target)?;
        self.ended = true;
        Ok(())
    }
}
