use crate::codegen::defs::{CONSTRUCTOR_METHOD_NAME, NO_ARG_CONSTRUCTOR_DESCRIPTOR};
use crate::codegen::descriptor::{parse_method_descriptor, ReturnCategory, ReturnType};
use crate::codegen::flag::{access_flags::ACC_STATIC, is_bodiless};
use crate::codegen::opcodes;
use crate::codegen::visitor::{Insn, MethodDecl, MethodVisitor};
use crate::error::Result;

use super::{StubError, StubResult};

/// A replacement method body and its declared frame sizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubBody {
    pub insns: Vec<Insn>,
    pub max_stack: u16,
    pub max_locals: u16,
}

impl StubBody {
    /// `new E; dup; invokespecial E.<init>()V; athrow`
    ///
    /// `max_locals` must cover the method's arguments even though the body
    /// never reads them.
    pub fn throwing(exception_class: &str, max_locals: u16) -> Self {
        Self {
            insns: vec![
                Insn::Type { opcode: opcodes::NEW, class: exception_class.to_string() },
                Insn::Simple(opcodes::DUP),
                Insn::Method {
                    opcode: opcodes::INVOKESPECIAL,
                    owner: exception_class.to_string(),
                    name: CONSTRUCTOR_METHOD_NAME.to_string(),
                    descriptor: NO_ARG_CONSTRUCTOR_DESCRIPTOR.to_string(),
                    interface: false,
                },
                Insn::Simple(opcodes::ATHROW),
            ],
            // the new reference and its duplicate
            max_stack: 2,
            max_locals,
        }
    }

    /// Pushes the zero value of `category` (if any) and returns it
    pub fn returning_zero(category: ReturnCategory, max_locals: u16) -> Self {
        let zero = match category {
            ReturnCategory::Void => None,
            ReturnCategory::Int => Some(opcodes::ICONST_0),
            ReturnCategory::Long => Some(opcodes::LCONST_0),
            ReturnCategory::Float => Some(opcodes::FCONST_0),
            ReturnCategory::Double => Some(opcodes::DCONST_0),
            ReturnCategory::Reference => Some(opcodes::ACONST_NULL),
        };
        let insns = zero
            .into_iter()
            .chain([category.return_opcode()])
            .map(Insn::Simple)
            .collect();
        Self { insns, max_stack: category.stack_size(), max_locals }
    }

    /// Sends the body to `mv` as a complete `visit_code` .. `visit_maxs` sequence
    pub fn emit(&self, mv: &mut dyn MethodVisitor) -> Result<()> {
        mv.visit_code()?;
        for insn in &self.insns {
            mv.visit_insn(insn)?;
        }
        mv.visit_maxs(self.max_stack, self.max_locals)
    }
}

/// Decides the replacement body for a method, `None` when it must stay bodiless.
///
/// Depends only on the access flags, the name and the descriptor; the
/// original body is never consulted. `max_locals` is the argument slot count.
pub fn stub_body(method: &MethodDecl, exception_class: &str) -> StubResult<Option<StubBody>> {
    if is_bodiless(method.access_flags) {
        return Ok(None);
    }
    let descriptor = parse_method_descriptor(&method.descriptor).map_err(|source| StubError::Descriptor {
        method: method.name.clone(),
        source,
    })?;
    let is_static = method.access_flags & ACC_STATIC != 0;
    let max_locals = descriptor.argument_slots(is_static);

    if method.name == CONSTRUCTOR_METHOD_NAME {
        if descriptor.ret != ReturnType::Void {
            return Err(StubError::ConstructorReturnsValue {
                method: method.name.clone(),
                descriptor: method.descriptor.clone(),
            });
        }
        if is_static {
            return Err(StubError::StaticConstructor {
                method: method.name.clone(),
                descriptor: method.descriptor.clone(),
            });
        }
        return Ok(Some(StubBody::throwing(exception_class, max_locals)));
    }
    Ok(Some(StubBody::returning_zero(descriptor.ret.category(), max_locals)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::flag::access_flags::{ACC_ABSTRACT, ACC_NATIVE, ACC_PUBLIC};

    fn simple(body: &StubBody) -> Vec<u8> {
        body.insns.iter().map(Insn::opcode).collect()
    }

    fn plan(name: &str, descriptor: &str) -> StubBody {
        stub_body(&MethodDecl::new(ACC_PUBLIC, name, descriptor), "java/lang/Error")
            .unwrap()
            .unwrap()
    }

    #[test]
    fn int_family_returns_iconst_0() {
        for d in ["()Z", "()B", "()C", "()S"] {
            let body = plan("compute", d);
            assert_eq!(simple(&body), vec![opcodes::ICONST_0, opcodes::IRETURN], "{}", d);
            assert_eq!((body.max_stack, body.max_locals), (1, 1));
        }
        let body = plan("compute", "(Ljava/lang/String;)I");
        assert_eq!((body.max_stack, body.max_locals), (1, 2));
    }

    #[test]
    fn void_returns_without_value() {
        let body = plan("run", "()V");
        assert_eq!(simple(&body), vec![opcodes::RETURN]);
        assert_eq!((body.max_stack, body.max_locals), (0, 1));
    }

    #[test]
    fn wide_returns_declare_two_stack_units() {
        let long = plan("size", "()J");
        assert_eq!(simple(&long), vec![opcodes::LCONST_0, opcodes::LRETURN]);
        assert_eq!(long.max_stack, 2);
        let double = plan("ratio", "(DD)D");
        assert_eq!(simple(&double), vec![opcodes::DCONST_0, opcodes::DRETURN]);
        assert_eq!(double.max_stack, 2);
    }

    #[test]
    fn float_and_reference() {
        let float = plan("scale", "()F");
        assert_eq!(simple(&float), vec![opcodes::FCONST_0, opcodes::FRETURN]);
        assert_eq!(float.max_stack, 1);
        for d in ["()Ljava/lang/Object;", "()[I", "()[[Ljava/lang/String;"] {
            let body = plan("get", d);
            assert_eq!(simple(&body), vec![opcodes::ACONST_NULL, opcodes::ARETURN]);
            assert_eq!(body.max_stack, 1);
        }
    }

    #[test]
    fn constructor_throws_independent_of_params() {
        let a = plan("<init>", "()V");
        let b = plan("<init>", "(IJLjava/lang/String;)V");
        assert_eq!(a.insns, b.insns);
        assert_eq!(simple(&a), vec![opcodes::NEW, opcodes::DUP, opcodes::INVOKESPECIAL, opcodes::ATHROW]);
        assert_eq!((a.max_stack, a.max_locals), (2, 1));
        // this, int, long (two slots), String
        assert_eq!((b.max_stack, b.max_locals), (2, 5));
    }

    #[test]
    fn locals_cover_arguments_only() {
        let decl = MethodDecl::new(ACC_PUBLIC | ACC_STATIC, "mean", "(DD)D");
        let body = stub_body(&decl, "java/lang/Error").unwrap().unwrap();
        assert_eq!((body.max_stack, body.max_locals), (2, 4));
        let decl = MethodDecl::new(ACC_STATIC, "main", "([Ljava/lang/String;)V");
        let body = stub_body(&decl, "java/lang/Error").unwrap().unwrap();
        assert_eq!(body.max_locals, 1);
        assert_eq!(plan("merge", "(JLjava/util/List;[D)J").max_locals, 5);
    }

    #[test]
    fn static_initializer_is_not_a_constructor() {
        let body = plan("<clinit>", "()V");
        assert_eq!(simple(&body), vec![opcodes::RETURN]);
    }

    #[test]
    fn bodiless_methods_get_nothing() {
        for flags in [ACC_ABSTRACT, ACC_NATIVE, ACC_PUBLIC | ACC_ABSTRACT] {
            let decl = MethodDecl::new(flags, "compute", "(I)I");
            assert_eq!(stub_body(&decl, "java/lang/Error").unwrap(), None);
        }
        // abstract members are not inspected at all
        let malformed = MethodDecl::new(ACC_ABSTRACT, "broken", "(I");
        assert_eq!(stub_body(&malformed, "java/lang/Error").unwrap(), None);
    }

    #[test]
    fn malformed_descriptor_is_fatal() {
        let decl = MethodDecl::new(ACC_PUBLIC, "broken", "(I");
        assert!(matches!(stub_body(&decl, "java/lang/Error"), Err(StubError::Descriptor { .. })));
    }

    #[test]
    fn inconsistent_constructors_are_fatal() {
        let returns_int = MethodDecl::new(ACC_PUBLIC, "<init>", "()I");
        assert!(matches!(
            stub_body(&returns_int, "java/lang/Error"),
            Err(StubError::ConstructorReturnsValue { .. })
        ));
        let is_static = MethodDecl::new(ACC_PUBLIC | ACC_STATIC, "<init>", "()V");
        assert!(matches!(
            stub_body(&is_static, "java/lang/Error"),
            Err(StubError::StaticConstructor { .. })
        ));
    }
}
