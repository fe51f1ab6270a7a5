//! Field and method descriptor parsing (JVMS 4.3)

use std::fmt;

use super::error::{DescriptorError, DescriptorResult};
use super::opcodes;

/// Arrays may have at most this many dimensions
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Internal class name, e.g. `java/lang/String`
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Operand stack / local variable units taken by a value of this type
    pub fn slot_size(&self) -> u16 {
        match self {
            FieldType::Long | FieldType::Double => 2,
            _ => 1,
        }
    }

    pub fn return_category(&self) -> ReturnCategory {
        match self {
            FieldType::Boolean | FieldType::Byte | FieldType::Char | FieldType::Short | FieldType::Int => {
                ReturnCategory::Int
            }
            FieldType::Long => ReturnCategory::Long,
            FieldType::Float => ReturnCategory::Float,
            FieldType::Double => ReturnCategory::Double,
            FieldType::Object(_) | FieldType::Array(_) => ReturnCategory::Reference,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => f.write_str("Z"),
            FieldType::Byte => f.write_str("B"),
            FieldType::Char => f.write_str("C"),
            FieldType::Short => f.write_str("S"),
            FieldType::Int => f.write_str("I"),
            FieldType::Long => f.write_str("J"),
            FieldType::Float => f.write_str("F"),
            FieldType::Double => f.write_str("D"),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(component) => write!(f, "[{}", component),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Value(FieldType),
}

impl ReturnType {
    pub fn category(&self) -> ReturnCategory {
        match self {
            ReturnType::Void => ReturnCategory::Void,
            ReturnType::Value(ty) => ty.return_category(),
        }
    }
}

/// Closed set of return kinds that decide which return instruction is valid.
/// boolean, byte, char and short share `Int`: the verifier treats them all as int.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCategory {
    Void,
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ReturnCategory {
    /// Operand stack units taken by a returned value
    pub fn stack_size(self) -> u16 {
        match self {
            ReturnCategory::Void => 0,
            ReturnCategory::Long | ReturnCategory::Double => 2,
            ReturnCategory::Int | ReturnCategory::Float | ReturnCategory::Reference => 1,
        }
    }

    /// The only return instruction valid for this category
    pub fn return_opcode(self) -> u8 {
        match self {
            ReturnCategory::Void => opcodes::RETURN,
            ReturnCategory::Int => opcodes::IRETURN,
            ReturnCategory::Long => opcodes::LRETURN,
            ReturnCategory::Float => opcodes::FRETURN,
            ReturnCategory::Double => opcodes::DRETURN,
            ReturnCategory::Reference => opcodes::ARETURN,
        }
    }
}

impl fmt::Display for ReturnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnCategory::Void => "void",
            ReturnCategory::Int => "int",
            ReturnCategory::Long => "long",
            ReturnCategory::Float => "float",
            ReturnCategory::Double => "double",
            ReturnCategory::Reference => "reference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub ret: ReturnType,
}

impl MethodDescriptor {
    /// Local variable units taken by the parameters (excluding `this`)
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(FieldType::slot_size).sum()
    }

    /// Local slots holding the arguments on entry, `this` included for
    /// instance methods
    pub fn argument_slots(&self, is_static: bool) -> u16 {
        self.param_slots() + u16::from(!is_static)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        match &self.ret {
            ReturnType::Void => f.write_str("V"),
            ReturnType::Value(ty) => write!(f, "{}", ty),
        }
    }
}

struct DescriptorParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Parses one field type starting at the current position.
    fn field_type(&mut self) -> Result<FieldType, &'static str> {
        let mut dimensions = 0usize;
        while self.peek() == Some(b'[') {
            dimensions += 1;
            self.pos += 1;
        }
        if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err("too many array dimensions");
        }
        let base = match self.peek() {
            None => return Err("unexpected end of descriptor"),
            Some(c) => {
                self.pos += 1;
                match c {
                    b'Z' => FieldType::Boolean,
                    b'B' => FieldType::Byte,
                    b'C' => FieldType::Char,
                    b'S' => FieldType::Short,
                    b'I' => FieldType::Int,
                    b'J' => FieldType::Long,
                    b'F' => FieldType::Float,
                    b'D' => FieldType::Double,
                    b'L' => self.object_type()?,
                    b'V' => return Err("void is only valid as a return type"),
                    _ => return Err("unknown type character"),
                }
            }
        };
        let mut ty = base;
        for _ in 0..dimensions {
            ty = FieldType::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn object_type(&mut self) -> Result<FieldType, &'static str> {
        let rest = &self.input[self.pos..];
        let end = rest.find(';').ok_or("unterminated class name")?;
        let name = &rest[..end];
        if name.is_empty() {
            return Err("empty class name");
        }
        if name.contains(['.', '[', '(', ')'])
            || name.starts_with('/')
            || name.ends_with('/')
            || name.contains("//")
        {
            return Err("illegal character in class name");
        }
        self.pos += end + 1;
        Ok(FieldType::Object(name.to_string()))
    }
}

pub fn parse_field_descriptor(descriptor: &str) -> DescriptorResult<FieldType> {
    let invalid = |reason| DescriptorError::InvalidFieldDescriptor { descriptor: descriptor.to_string(), reason };
    let mut parser = DescriptorParser::new(descriptor);
    let ty = parser.field_type().map_err(invalid)?;
    if !parser.at_end() {
        return Err(invalid("trailing characters"));
    }
    Ok(ty)
}

pub fn parse_method_descriptor(descriptor: &str) -> DescriptorResult<MethodDescriptor> {
    let invalid = |reason| DescriptorError::InvalidMethodDescriptor { descriptor: descriptor.to_string(), reason };
    let mut parser = DescriptorParser::new(descriptor);
    if parser.peek() != Some(b'(') {
        return Err(invalid("missing '('"));
    }
    parser.pos += 1;

    let mut params = Vec::new();
    loop {
        match parser.peek() {
            Some(b')') => {
                parser.pos += 1;
                break;
            }
            None => return Err(invalid("missing ')'")),
            Some(_) => params.push(parser.field_type().map_err(invalid)?),
        }
    }

    let ret = match parser.peek() {
        None => return Err(invalid("missing return type")),
        Some(b'V') => {
            parser.pos += 1;
            ReturnType::Void
        }
        Some(_) => ReturnType::Value(parser.field_type().map_err(invalid)?),
    };
    if !parser.at_end() {
        return Err(invalid("trailing characters"));
    }
    Ok(MethodDescriptor { params, ret })
}

/// Return category of a method descriptor
pub fn return_category(descriptor: &str) -> DescriptorResult<ReturnCategory> {
    parse_method_descriptor(descriptor).map(|d| d.ret.category())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_params_and_return() {
        let d = parse_method_descriptor("(ILjava/lang/String;[[J)Ljava/lang/Object;").unwrap();
        assert_eq!(d.params.len(), 3);
        assert_eq!(d.params[0], FieldType::Int);
        assert_eq!(d.params[1], FieldType::Object("java/lang/String".into()));
        assert_eq!(
            d.params[2],
            FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Long))))
        );
        assert_eq!(d.ret, ReturnType::Value(FieldType::Object("java/lang/Object".into())));
        assert_eq!(d.param_slots(), 3);
        assert_eq!(d.to_string(), "(ILjava/lang/String;[[J)Ljava/lang/Object;");
    }

    #[test]
    fn narrow_types_share_int_category() {
        for d in ["()Z", "()B", "()C", "()S", "()I"] {
            assert_eq!(return_category(d).unwrap(), ReturnCategory::Int, "{}", d);
        }
        assert_eq!(return_category("()V").unwrap(), ReturnCategory::Void);
        assert_eq!(return_category("()J").unwrap(), ReturnCategory::Long);
        assert_eq!(return_category("()F").unwrap(), ReturnCategory::Float);
        assert_eq!(return_category("()D").unwrap(), ReturnCategory::Double);
        assert_eq!(return_category("()[I").unwrap(), ReturnCategory::Reference);
        assert_eq!(return_category("(J)Ljava/util/List;").unwrap(), ReturnCategory::Reference);
    }

    #[test]
    fn wide_returns_take_two_stack_units() {
        assert_eq!(ReturnCategory::Long.stack_size(), 2);
        assert_eq!(ReturnCategory::Double.stack_size(), 2);
        assert_eq!(ReturnCategory::Reference.stack_size(), 1);
        assert_eq!(ReturnCategory::Void.stack_size(), 0);
    }

    #[test]
    fn rejects_malformed_method_descriptors() {
        for bad in ["", "V", "()", "(I", "(V)V", "(I)VV", "(Ljava/lang/String)V", "(L;)V", "()[V", "(Q)V", "()Lfoo"] {
            assert!(parse_method_descriptor(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn rejects_dotted_class_names() {
        let err = parse_field_descriptor("Ljava.lang.String;").unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidFieldDescriptor { reason: "illegal character in class name", .. }));
    }

    #[test]
    fn array_dimension_limit() {
        let ok = format!("{}I", "[".repeat(255));
        let too_deep = format!("{}I", "[".repeat(256));
        assert!(parse_field_descriptor(&ok).is_ok());
        assert!(parse_field_descriptor(&too_deep).is_err());
    }
}
