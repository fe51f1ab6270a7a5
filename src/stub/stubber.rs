use crate::codegen::attribute::CodeAttribute;
use crate::codegen::visitor::{ClassHeader, ClassVisitor, Insn, MethodDecl, MethodVisitor};
use crate::config::Config;
use crate::error::Result;

use super::body::stub_body;

/// Visitor stage that replaces concrete method bodies with stubs.
///
/// Build one per class; it keeps nothing between methods except the error
/// class name.
#[derive(Debug)]
pub struct MethodStubber<V> {
    next: V,
    exception_class: String,
}

impl<V: ClassVisitor> MethodStubber<V> {
    /// `exception_class` is an internal name such as `java/lang/Error`
    pub fn new(next: V, exception_class: impl Into<String>) -> Self {
        Self { next, exception_class: exception_class.into() }
    }

    pub fn with_config(next: V, config: &Config) -> Self {
        Self::new(next, config.exception_class.clone())
    }

    pub fn exception_class(&self) -> &str {
        &self.exception_class
    }

    pub fn inner(&self) -> &V {
        &self.next
    }

    pub fn into_inner(self) -> V {
        self.next
    }
}

impl<V: ClassVisitor> ClassVisitor for MethodStubber<V> {
    fn delegate(&mut self) -> Option<&mut dyn ClassVisitor> {
        Some(&mut self.next)
    }

    fn visit_header(&mut self, header: &ClassHeader) -> Result<()> {
        log::debug!("stubbing methods of {} (constructors throw {})", header.name, self.exception_class);
        self.next.visit_header(header)
    }

    fn visit_method<'a>(&'a mut self, method: &MethodDecl) -> Result<Box<dyn MethodVisitor + 'a>> {
        let body = stub_body(method, &self.exception_class)?;
        let mut mv = self.next.visit_method(method)?;
        let Some(body) = body else {
            log::trace!("{}{}: bodiless, forwarded as is", method.name, method.descriptor);
            return Ok(mv);
        };
        log::trace!(
            "{}{}: stubbed with {} instructions, max_stack={} max_locals={}",
            method.name,
            method.descriptor,
            body.insns.len(),
            body.max_stack,
            body.max_locals
        );
        body.emit(mv.as_mut())?;
        Ok(Box::new(StubbedMethod { inner: mv }))
    }
}

/// Sink handed back for a stubbed method: forwards attributes and the end
/// event, drops any body the upstream still delivers.
struct StubbedMethod<'a> {
    inner: Box<dyn MethodVisitor + 'a>,
}

impl MethodVisitor for StubbedMethod<'_> {
    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        Some(self.inner.as_mut())
    }

    fn visit_code(&mut self) -> Result<()> {
        Ok(())
    }

    fn visit_insn(&mut self, _insn: &Insn) -> Result<()> {
        Ok(())
    }

    fn visit_maxs(&mut self, _max_stack: u16, _max_locals: u16) -> Result<()> {
        Ok(())
    }

    fn visit_raw_code(&mut self, _code: &CodeAttribute) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::attribute::AttributeInfo;
    use crate::codegen::flag::access_flags::{ACC_ABSTRACT, ACC_PUBLIC};
    use crate::codegen::opcodes;

    /// Records every event it receives, as text
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    struct RecordingMethod<'a> {
        events: &'a mut Vec<String>,
    }

    impl MethodVisitor for RecordingMethod<'_> {
        fn visit_attribute(&mut self, attribute: &AttributeInfo) -> Result<()> {
            self.events.push(format!("attr {}", attribute.name_index));
            Ok(())
        }
        fn visit_code(&mut self) -> Result<()> {
            self.events.push("code".into());
            Ok(())
        }
        fn visit_insn(&mut self, insn: &Insn) -> Result<()> {
            self.events.push(format!("insn {}", opcodes::opcode_name(insn.opcode())));
            Ok(())
        }
        fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> Result<()> {
            self.events.push(format!("maxs {} {}", max_stack, max_locals));
            Ok(())
        }
        fn visit_raw_code(&mut self, _code: &CodeAttribute) -> Result<()> {
            self.events.push("raw".into());
            Ok(())
        }
        fn visit_end(&mut self) -> Result<()> {
            self.events.push("end".into());
            Ok(())
        }
    }

    impl ClassVisitor for Recorder {
        fn visit_method<'a>(&'a mut self, method: &MethodDecl) -> Result<Box<dyn MethodVisitor + 'a>> {
            self.events.push(format!("method {}{}", method.name, method.descriptor));
            Ok(Box::new(RecordingMethod { events: &mut self.events }))
        }
    }

    fn drive(stubber: &mut MethodStubber<Recorder>, decl: MethodDecl) {
        let mut mv = stubber.visit_method(&decl).unwrap();
        mv.visit_attribute(&AttributeInfo::new(7, vec![])).unwrap();
        mv.visit_raw_code(&CodeAttribute::new(1, 1, vec![opcodes::RETURN])).unwrap();
        mv.visit_end().unwrap();
    }

    #[test]
    fn stub_is_emitted_before_end_and_original_body_is_dropped() {
        let mut stubber = MethodStubber::new(Recorder::default(), "java/lang/Error");
        drive(&mut stubber, MethodDecl::new(ACC_PUBLIC, "compute", "(Ljava/lang/String;)I"));
        assert_eq!(
            stubber.into_inner().events,
            vec![
                "method compute(Ljava/lang/String;)I",
                "code",
                "insn ICONST_0",
                "insn IRETURN",
                "maxs 1 2",
                "attr 7",
                "end",
            ]
        );
    }

    #[test]
    fn abstract_method_is_forwarded_untouched() {
        let mut stubber = MethodStubber::new(Recorder::default(), "java/lang/Error");
        drive(&mut stubber, MethodDecl::new(ACC_PUBLIC | ACC_ABSTRACT, "compute", "()I"));
        assert_eq!(
            stubber.into_inner().events,
            vec!["method compute()I", "attr 7", "raw", "end"]
        );
    }

    #[test]
    fn constructor_uses_configured_error_class() {
        let config = Config::new().with_exception_class("com.example.Boom").unwrap();
        let mut stubber = MethodStubber::with_config(Recorder::default(), &config);
        assert_eq!(stubber.exception_class(), "com/example/Boom");
        drive(&mut stubber, MethodDecl::new(ACC_PUBLIC, "<init>", "(I)V"));
        let events = stubber.into_inner().events;
        assert_eq!(
            &events[1..7],
            &["code", "insn NEW", "insn DUP", "insn INVOKESPECIAL", "insn ATHROW", "maxs 2 2"]
        );
    }

    #[test]
    fn malformed_descriptor_reaches_nothing_downstream() {
        let mut stubber = MethodStubber::new(Recorder::default(), "java/lang/Error");
        let err = stubber.visit_method(&MethodDecl::new(ACC_PUBLIC, "broken", "(I")).err().unwrap();
        assert!(err.is_input_error());
        assert!(stubber.into_inner().events.is_empty());
    }
}
