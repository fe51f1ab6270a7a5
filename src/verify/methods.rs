use crate::codegen::attribute::CodeAttribute;
use crate::codegen::class::ClassFile;
use crate::codegen::constpool::ConstantPool;
use crate::codegen::descriptor::{parse_method_descriptor, MethodDescriptor};
use crate::codegen::error::{ConstPoolError, DescriptorError};
use crate::codegen::flag::access_flags::*;
use crate::codegen::flag::is_bodiless;
use crate::codegen::method::MethodInfo;
use crate::codegen::opcodes;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MethodVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Invalid constant pool index type {0}")]
    InvalidConstantPoolIndexType(u16),
    #[error("Invalid method access flags: 0x{0:04x}")]
    InvalidMethodAccessFlags(u16),
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(#[from] DescriptorError),
    #[error("Method must have Code attribute unless abstract or native")]
    MissingCodeAttribute,
    #[error("Abstract or native method must not have Code attribute")]
    ForbiddenCodeAttribute,
    #[error("Duplicate method attribute: {0}")]
    DuplicateMethodAttribute(String),
    #[error("Malformed Code attribute: {0}")]
    MalformedCode(String),
    #[error("max_locals {max_locals} cannot hold the {required} argument slots")]
    LocalsTooSmall { max_locals: u16, required: u16 },
    #[error("Empty method body")]
    EmptyCode,
    #[error("Instruction at pc {pc} runs past the end of the code")]
    TruncatedInstruction { pc: usize },
    #[error("Operand stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },
    #[error("Operand stack depth {depth} at pc {pc} exceeds max_stack {max_stack}")]
    StackOverflow { pc: usize, depth: u32, max_stack: u16 },
    #[error("Unreachable code after terminator at pc {pc}")]
    TerminatorNotLast { pc: usize },
    #[error("Execution falls off the end of the code")]
    FallsOffEnd,
    #[error("Return opcode does not match descriptor: expected {expected}, found {found}")]
    ReturnMismatch { expected: &'static str, found: String },
}

pub type Result<T> = std::result::Result<T, MethodVerifyError>;

const VISIBILITY: u16 = ACC_PUBLIC | ACC_PROTECTED | ACC_PRIVATE;
/// Modifiers an interface method never carries
const NOT_IN_INTERFACE: u16 = ACC_PROTECTED | ACC_FINAL | ACC_SYNCHRONIZED | ACC_NATIVE;
/// Modifiers that contradict `ACC_ABSTRACT`
const NOT_WITH_ABSTRACT: u16 = ACC_PRIVATE | ACC_STATIC | ACC_FINAL | ACC_SYNCHRONIZED | ACC_NATIVE;
/// Class file versions (Java 1.2 through 16) in which abstract methods may not be strictfp
const STRICT_ABSTRACT_FORBIDDEN: std::ops::RangeInclusive<u16> = 46..=60;

/// `name` + `descriptor` of a method for diagnostics, falling back to pool indices
pub fn display_name(class_file: &ClassFile, method: &MethodInfo) -> String {
    let pool = &class_file.constant_pool;
    match (pool.utf8(method.name_index), pool.utf8(method.descriptor_index)) {
        (Ok(name), Ok(descriptor)) => format!("{}{}", name, descriptor),
        _ => format!("#{}:#{}", method.name_index, method.descriptor_index),
    }
}

/// Modifier combinations JVMS 4.6 allows for a method of `class_file`
fn verify_access_flags(class_file: &ClassFile, flags: u16) -> Result<()> {
    let in_interface = class_file.access_flags & ACC_INTERFACE != 0;
    let forbidden = match (in_interface, flags & ACC_ABSTRACT != 0) {
        (true, true) => NOT_IN_INTERFACE | NOT_WITH_ABSTRACT,
        (true, false) => NOT_IN_INTERFACE,
        (false, true) => NOT_WITH_ABSTRACT,
        (false, false) => 0,
    };
    let strict_abstract = (flags & (ACC_ABSTRACT | ACC_STRICT)) == (ACC_ABSTRACT | ACC_STRICT)
        && STRICT_ABSTRACT_FORBIDDEN.contains(&class_file.major_version);

    if (flags & VISIBILITY).count_ones() > 1 || flags & forbidden != 0 || strict_abstract {
        return Err(MethodVerifyError::InvalidMethodAccessFlags(flags));
    }
    Ok(())
}

/// Verify a single method of the ClassFile
pub fn verify(class_file: &ClassFile, method: &MethodInfo) -> Result<()> {
    verify_access_flags(class_file, method.access_flags)?;
    let pool = &class_file.constant_pool;
    utf8_at(pool, method.name_index)?;
    let descriptor = parse_method_descriptor(utf8_at(pool, method.descriptor_index)?)?;

    let mut code_attributes = method.code_attributes(pool);
    let code = code_attributes.next();
    if code_attributes.next().is_some() {
        return Err(MethodVerifyError::DuplicateMethodAttribute("Code".to_string()));
    }

    match (is_bodiless(method.access_flags), code) {
        (true, None) => Ok(()),
        (true, Some(_)) => Err(MethodVerifyError::ForbiddenCodeAttribute),
        (false, None) => Err(MethodVerifyError::MissingCodeAttribute),
        (false, Some(attribute)) => {
            let code = CodeAttribute::parse(&attribute.info)
                .map_err(|e| MethodVerifyError::MalformedCode(e.to_string()))?;
            let required = descriptor.argument_slots(method.access_flags & ACC_STATIC != 0);
            if code.max_locals < required {
                return Err(MethodVerifyError::LocalsTooSmall { max_locals: code.max_locals, required });
            }
            verify_code(pool, &descriptor, &code)
        }
    }
}

fn utf8_at(pool: &ConstantPool, index: u16) -> Result<&str> {
    pool.utf8(index).map_err(|e| pool_error(e, index))
}

fn pool_error(err: ConstPoolError, index: u16) -> MethodVerifyError {
    match err {
        ConstPoolError::UnexpectedEntry { .. } => MethodVerifyError::InvalidConstantPoolIndexType(index),
        _ => MethodVerifyError::InvalidConstantPoolIndex(index),
    }
}

/// A decoded instruction: its pc, opcode and operand bytes
struct Instruction<'a> {
    pc: usize,
    opcode: u8,
    operands: &'a [u8],
}

/// Splits `code` into instructions, or `None` if it uses an opcode outside
/// the simulated set.
fn decode(code: &[u8]) -> Result<Option<Vec<Instruction<'_>>>> {
    let mut instructions = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let opcode = code[pc];
        let Some(operand_count) = opcodes::operand_count(opcode) else {
            return Ok(None);
        };
        let operands = code
            .get(pc + 1..pc + 1 + operand_count)
            .ok_or(MethodVerifyError::TruncatedInstruction { pc })?;
        instructions.push(Instruction { pc, opcode, operands });
        pc += 1 + operand_count;
    }
    Ok(Some(instructions))
}

/// Operand stack units `(popped, pushed)` by an instruction
fn stack_effect(pool: &ConstantPool, insn: &Instruction<'_>) -> Result<(u32, u32)> {
    use opcodes::*;
    let effect = match insn.opcode {
        NOP | RETURN => (0, 0),
        ACONST_NULL | ICONST_M1..=ICONST_5 | FCONST_0..=FCONST_2 | BIPUSH | SIPUSH | NEW => (0, 1),
        LCONST_0 | LCONST_1 | DCONST_0 | DCONST_1 => (0, 2),
        POP | IRETURN | FRETURN | ARETURN | ATHROW => (1, 0),
        POP2 | LRETURN | DRETURN => (2, 0),
        DUP => (1, 2),
        CHECKCAST | INSTANCEOF => (1, 1),
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => {
            let index = u16::from_be_bytes([insn.operands[0], insn.operands[1]]);
            let (_, _, descriptor) = pool.member_ref(index).map_err(|e| pool_error(e, index))?;
            let descriptor = parse_method_descriptor(descriptor)?;
            let receiver = u32::from(insn.opcode != INVOKESTATIC);
            (
                u32::from(descriptor.param_slots()) + receiver,
                u32::from(descriptor.ret.category().stack_size()),
            )
        }
        _ => (0, 0),
    };
    Ok(effect)
}

fn verify_code(pool: &ConstantPool, descriptor: &MethodDescriptor, code: &CodeAttribute) -> Result<()> {
    if code.code.is_empty() {
        return Err(MethodVerifyError::EmptyCode);
    }
    // handlers make the body branch; only straight-line code is simulated
    if !code.exception_table.is_empty() {
        return Ok(());
    }
    let Some(instructions) = decode(&code.code)? else {
        log::trace!("body uses opcodes outside the simulated set, skipping stack check");
        return Ok(());
    };

    let mut depth: u32 = 0;
    let last = instructions.len() - 1;
    for (i, insn) in instructions.iter().enumerate() {
        let (popped, pushed) = stack_effect(pool, insn)?;
        depth = depth
            .checked_sub(popped)
            .ok_or(MethodVerifyError::StackUnderflow { pc: insn.pc })?
            + pushed;
        if depth > u32::from(code.max_stack) {
            return Err(MethodVerifyError::StackOverflow { pc: insn.pc, depth, max_stack: code.max_stack });
        }

        if !opcodes::is_terminator(insn.opcode) {
            continue;
        }
        if i != last {
            return Err(MethodVerifyError::TerminatorNotLast { pc: insn.pc });
        }
        let expected = descriptor.ret.category().return_opcode();
        if insn.opcode != opcodes::ATHROW && insn.opcode != expected {
            return Err(MethodVerifyError::ReturnMismatch {
                expected: opcodes::opcode_name(expected),
                found: opcodes::opcode_name(insn.opcode).to_string(),
            });
        }
    }

    if !opcodes::is_terminator(instructions[last].opcode) {
        return Err(MethodVerifyError::FallsOffEnd);
    }
    Ok(())
}
