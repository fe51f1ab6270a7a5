/// Java bytecode instruction opcodes
///
/// Only the opcodes that stub bodies are built from, and that the structural
/// verifier knows how to simulate, are listed here. Values follow the Java
/// Virtual Machine Specification, chapter 6.

// 0x00 - 0x0F: Constants and basic operations
pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const ICONST_M1: u8 = 0x02;
pub const ICONST_0: u8 = 0x03;
pub const ICONST_1: u8 = 0x04;
pub const ICONST_2: u8 = 0x05;
pub const ICONST_3: u8 = 0x06;
pub const ICONST_4: u8 = 0x07;
pub const ICONST_5: u8 = 0x08;
pub const LCONST_0: u8 = 0x09;
pub const LCONST_1: u8 = 0x0a;
pub const FCONST_0: u8 = 0x0b;
pub const FCONST_1: u8 = 0x0c;
pub const FCONST_2: u8 = 0x0d;
pub const DCONST_0: u8 = 0x0e;
pub const DCONST_1: u8 = 0x0f;

// 0x10 - 0x11: Immediate pushes
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;

// 0x57 - 0x59: Stack operations
pub const POP: u8 = 0x57;
pub const POP2: u8 = 0x58;
pub const DUP: u8 = 0x59;

// 0xAC - 0xB1: Returns
pub const IRETURN: u8 = 0xac;
pub const LRETURN: u8 = 0xad;
pub const FRETURN: u8 = 0xae;
pub const DRETURN: u8 = 0xaf;
pub const ARETURN: u8 = 0xb0;
pub const RETURN: u8 = 0xb1;

// 0xB6 - 0xB9: Invocations
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;

// 0xBB - 0xC1: Objects
pub const NEW: u8 = 0xbb;
pub const ATHROW: u8 = 0xbf;
pub const CHECKCAST: u8 = 0xc0;
pub const INSTANCEOF: u8 = 0xc1;

/// Mnemonic of an opcode, `UNKNOWN` for anything not listed above
pub fn opcode_name(opcode: u8) -> &'static str {
    match opcode {
        NOP => "NOP",
        ACONST_NULL => "ACONST_NULL",
        ICONST_M1 => "ICONST_M1",
        ICONST_0 => "ICONST_0",
        ICONST_1 => "ICONST_1",
        ICONST_2 => "ICONST_2",
        ICONST_3 => "ICONST_3",
        ICONST_4 => "ICONST_4",
        ICONST_5 => "ICONST_5",
        LCONST_0 => "LCONST_0",
        LCONST_1 => "LCONST_1",
        FCONST_0 => "FCONST_0",
        FCONST_1 => "FCONST_1",
        FCONST_2 => "FCONST_2",
        DCONST_0 => "DCONST_0",
        DCONST_1 => "DCONST_1",
        BIPUSH => "BIPUSH",
        SIPUSH => "SIPUSH",
        POP => "POP",
        POP2 => "POP2",
        DUP => "DUP",
        IRETURN => "IRETURN",
        LRETURN => "LRETURN",
        FRETURN => "FRETURN",
        DRETURN => "DRETURN",
        ARETURN => "ARETURN",
        RETURN => "RETURN",
        INVOKEVIRTUAL => "INVOKEVIRTUAL",
        INVOKESPECIAL => "INVOKESPECIAL",
        INVOKESTATIC => "INVOKESTATIC",
        INVOKEINTERFACE => "INVOKEINTERFACE",
        NEW => "NEW",
        ATHROW => "ATHROW",
        CHECKCAST => "CHECKCAST",
        INSTANCEOF => "INSTANCEOF",
        _ => "UNKNOWN",
    }
}

/// Number of operand bytes following the opcode, `None` if the opcode is not listed here
pub fn operand_count(opcode: u8) -> Option<usize> {
    match opcode {
        NOP | ACONST_NULL | ICONST_M1..=DCONST_1 | POP | POP2 | DUP | IRETURN..=RETURN | ATHROW => Some(0),
        BIPUSH => Some(1),
        SIPUSH => Some(2),
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => Some(2),
        INVOKEINTERFACE => Some(4),
        NEW | CHECKCAST | INSTANCEOF => Some(2),
        _ => None,
    }
}

/// Whether the opcode ends straight-line control flow
pub fn is_terminator(opcode: u8) -> bool {
    matches!(opcode, IRETURN..=RETURN | ATHROW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_cover_stub_opcodes() {
        for op in [NEW, DUP, INVOKESPECIAL, ATHROW, RETURN, ICONST_0, IRETURN, LCONST_0, LRETURN,
                   FCONST_0, FRETURN, DCONST_0, DRETURN, ACONST_NULL, ARETURN] {
            assert_ne!(opcode_name(op), "UNKNOWN", "opcode 0x{:02x}", op);
        }
        assert_eq!(opcode_name(0xc4), "UNKNOWN");
    }

    #[test]
    fn terminators() {
        assert!(is_terminator(ATHROW));
        assert!(is_terminator(RETURN));
        assert!(is_terminator(ARETURN));
        assert!(!is_terminator(DUP));
        assert!(!is_terminator(INVOKESPECIAL));
    }

    #[test]
    fn operand_counts() {
        assert_eq!(operand_count(NEW), Some(2));
        assert_eq!(operand_count(INVOKESPECIAL), Some(2));
        assert_eq!(operand_count(INVOKEINTERFACE), Some(4));
        assert_eq!(operand_count(DCONST_0), Some(0));
        assert_eq!(operand_count(0xaa), None);
    }
}
