// Common test utilities
#![allow(dead_code)]

use abistub::codegen::attribute::{exceptions_payload, AttributeInfo, CodeAttribute};
use abistub::codegen::class::ClassFile;
use abistub::codegen::constpool::{Constant, ConstantPool};
use abistub::codegen::defs::attribute_names;
use abistub::codegen::field::FieldInfo;
use abistub::codegen::flag::access_flags::*;
use abistub::codegen::method::MethodInfo;
use abistub::codegen::opcodes;
use abistub::codegen::{class_file_to_bytes, ClassReader};

/// Builds raw class files for tests, writing method attributes in the order
/// `Code`, `Exceptions`, `Signature`, others.
pub struct ClassBuilder {
    class_file: ClassFile,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        let mut class_file = ClassFile::new();
        class_file.access_flags = ACC_PUBLIC | ACC_SUPER;
        class_file.this_class = class_file.constant_pool.add_class(name).unwrap();
        class_file.super_class = class_file.constant_pool.add_class("java/lang/Object").unwrap();
        Self { class_file }
    }

    pub fn pool(&mut self) -> &mut ConstantPool {
        &mut self.class_file.constant_pool
    }

    pub fn access(&mut self, flags: u16) -> &mut Self {
        self.class_file.access_flags = flags;
        self
    }

    /// Appends `constant` even when an equal entry exists, as shrinkers and
    /// obfuscators sometimes leave them
    pub fn duplicate(&mut self, constant: Constant) -> u16 {
        let mut constants: Vec<Constant> = self.pool().iter().map(|(_, c)| c.clone()).collect();
        constants.push(constant);
        self.class_file.constant_pool = ConstantPool::from_constants(constants);
        self.class_file.constant_pool.len() as u16
    }

    pub fn this_class(&mut self, index: u16) -> &mut Self {
        self.class_file.this_class = index;
        self
    }

    /// A member whose name and descriptor are the given pool slots
    pub fn field_at(&mut self, flags: u16, name_index: u16, descriptor_index: u16) -> &mut Self {
        self.class_file.fields.push(FieldInfo::new(flags, name_index, descriptor_index));
        self
    }

    pub fn method_at(&mut self, flags: u16, name_index: u16, descriptor_index: u16, code: CodeAttribute) -> &mut Self {
        let mut method = MethodInfo::new(flags, name_index, descriptor_index);
        method
            .attributes
            .push(AttributeInfo::named(self.pool(), attribute_names::CODE, code.to_bytes()).unwrap());
        self.class_file.methods.push(method);
        self
    }

    pub fn interface(&mut self, name: &str) -> &mut Self {
        let index = self.pool().add_class(name).unwrap();
        self.class_file.interfaces.push(index);
        self
    }

    pub fn field(&mut self, flags: u16, name: &str, descriptor: &str, attributes: Vec<(&str, Vec<u8>)>) -> &mut Self {
        let pool = &mut self.class_file.constant_pool;
        let mut field = FieldInfo::new(flags, pool.add_utf8(name).unwrap(), pool.add_utf8(descriptor).unwrap());
        field.attributes = named_all(pool, attributes);
        self.class_file.fields.push(field);
        self
    }

    pub fn method(&mut self, flags: u16, name: &str, descriptor: &str, code: Option<CodeAttribute>) -> &mut Self {
        self.method_with(flags, name, descriptor, code, &[], None, vec![])
    }

    #[allow(clippy::too_many_arguments)]
    pub fn method_with(
        &mut self,
        flags: u16,
        name: &str,
        descriptor: &str,
        code: Option<CodeAttribute>,
        exceptions: &[&str],
        signature: Option<&str>,
        others: Vec<(&str, Vec<u8>)>,
    ) -> &mut Self {
        let pool = &mut self.class_file.constant_pool;
        let mut method = MethodInfo::new(flags, pool.add_utf8(name).unwrap(), pool.add_utf8(descriptor).unwrap());
        if let Some(code) = code {
            method.attributes.push(AttributeInfo::named(pool, attribute_names::CODE, code.to_bytes()).unwrap());
        }
        if !exceptions.is_empty() {
            let indices: Vec<u16> = exceptions.iter().map(|e| pool.add_class(e).unwrap()).collect();
            method
                .attributes
                .push(AttributeInfo::named(pool, attribute_names::EXCEPTIONS, exceptions_payload(&indices)).unwrap());
        }
        if let Some(signature) = signature {
            let index = pool.add_utf8(signature).unwrap();
            method
                .attributes
                .push(AttributeInfo::named(pool, attribute_names::SIGNATURE, index.to_be_bytes().to_vec()).unwrap());
        }
        method.attributes.extend(named_all(pool, others));
        self.class_file.methods.push(method);
        self
    }

    pub fn attribute(&mut self, name: &str, payload: Vec<u8>) -> &mut Self {
        let attribute = AttributeInfo::named(self.pool(), name, payload).unwrap();
        self.class_file.attributes.push(attribute);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        class_file_to_bytes(&self.class_file)
    }
}

fn named_all(pool: &mut ConstantPool, attributes: Vec<(&str, Vec<u8>)>) -> Vec<AttributeInfo> {
    attributes
        .into_iter()
        .map(|(name, payload)| AttributeInfo::named(pool, name, payload).unwrap())
        .collect()
}

/// Code of `aload_0; invokespecial java/lang/Object.<init>()V; return`
pub fn super_constructor_call(pool: &mut ConstantPool) -> CodeAttribute {
    let init = pool.add_method_ref("java/lang/Object", "<init>", "()V").unwrap();
    let mut code = vec![0x2a, opcodes::INVOKESPECIAL];
    code.extend_from_slice(&init.to_be_bytes());
    code.push(opcodes::RETURN);
    CodeAttribute::new(1, 2, code)
}

/// A class exercising every return category, constructors, abstract and
/// native methods, and attributes at every level.
pub fn widget_class() -> Vec<u8> {
    let mut builder = ClassBuilder::new("com/example/Widget");
    builder.access(ACC_PUBLIC | ACC_SUPER | ACC_ABSTRACT).interface("java/lang/Runnable");

    let size = builder.pool().add_integer(42).unwrap();
    builder
        .field(ACC_PRIVATE | ACC_STATIC | ACC_FINAL, "SIZE", "I", vec![("ConstantValue", size.to_be_bytes().to_vec())])
        .field(ACC_PROTECTED, "name", "Ljava/lang/String;", vec![("Synthetic", vec![])]);

    let ctor = super_constructor_call(builder.pool());
    builder.method(ACC_PUBLIC, "<init>", "(I)V", Some(ctor));

    let length = builder.pool().add_method_ref("java/lang/String", "length", "()I").unwrap();
    let mut compute = vec![0x2b, opcodes::INVOKEVIRTUAL];
    compute.extend_from_slice(&length.to_be_bytes());
    compute.push(opcodes::IRETURN);
    builder.method_with(
        ACC_PUBLIC,
        "compute",
        "(Ljava/lang/String;)I",
        Some(CodeAttribute::new(1, 2, compute)),
        &["java/io/IOException"],
        None,
        vec![("Deprecated", vec![])],
    );

    builder
        .method(ACC_PUBLIC, "run", "()V", Some(CodeAttribute::new(0, 1, vec![opcodes::NOP, opcodes::RETURN])))
        .method(ACC_PUBLIC, "ready", "()Z", Some(CodeAttribute::new(1, 1, vec![opcodes::ICONST_1, opcodes::IRETURN])))
        .method(ACC_PUBLIC, "total", "()J", Some(CodeAttribute::new(2, 1, vec![opcodes::LCONST_1, opcodes::LRETURN])))
        .method(ACC_PUBLIC, "ratio", "()F", Some(CodeAttribute::new(1, 1, vec![opcodes::FCONST_2, opcodes::FRETURN])))
        .method(ACC_PUBLIC | ACC_STATIC, "mean", "(DD)D", Some(CodeAttribute::new(2, 4, vec![opcodes::DCONST_1, opcodes::DRETURN])))
        .method(ACC_PUBLIC, "values", "()[I", Some(CodeAttribute::new(1, 1, vec![opcodes::ACONST_NULL, opcodes::ARETURN])))
        .method_with(
            ACC_PUBLIC,
            "items",
            "()Ljava/util/List;",
            Some(CodeAttribute::new(1, 1, vec![opcodes::ACONST_NULL, opcodes::ARETURN])),
            &[],
            Some("()Ljava/util/List<Ljava/lang/String;>;"),
            vec![],
        )
        .method(ACC_STATIC, "<clinit>", "()V", Some(CodeAttribute::new(0, 0, vec![opcodes::RETURN])))
        .method_with(ACC_PUBLIC | ACC_ABSTRACT, "shape", "()Ljava/lang/Object;", None, &["java/lang/Exception"], None, vec![])
        .method(ACC_PUBLIC | ACC_NATIVE, "peek", "()J", None);

    let source = builder.pool().add_utf8("Widget.java").unwrap();
    builder.attribute("SourceFile", source.to_be_bytes().to_vec());
    builder.build()
}

/// The decoded `Code` of a method, `None` if it has none
pub fn method_code(bytes: &[u8], name: &str, descriptor: &str) -> Option<CodeAttribute> {
    let reader = ClassReader::parse(bytes).unwrap();
    let class_file = reader.class_file();
    let method = class_file
        .method(name, descriptor)
        .unwrap_or_else(|| panic!("no method {}{}", name, descriptor));
    method.code(&class_file.constant_pool).unwrap()
}

/// Raw attributes of a method, as `(name, payload)`
pub fn method_attributes(bytes: &[u8], name: &str, descriptor: &str) -> Vec<(String, Vec<u8>)> {
    let reader = ClassReader::parse(bytes).unwrap();
    let class_file = reader.class_file();
    let method = class_file.method(name, descriptor).unwrap();
    method
        .attributes
        .iter()
        .map(|a| (a.name(&class_file.constant_pool).unwrap().to_string(), a.info.clone()))
        .collect()
}

/// Resolves the class operand of `new` and the member operand of an invoke
pub fn class_operand(bytes: &[u8], code: &[u8], pc: usize) -> String {
    let reader = ClassReader::parse(bytes).unwrap();
    let index = u16::from_be_bytes([code[pc + 1], code[pc + 2]]);
    reader.constant_pool().class_name(index).unwrap().to_string()
}

pub fn member_operand(bytes: &[u8], code: &[u8], pc: usize) -> (String, String, String) {
    let reader = ClassReader::parse(bytes).unwrap();
    let index = u16::from_be_bytes([code[pc + 1], code[pc + 2]]);
    let (owner, name, descriptor) = reader.constant_pool().member_ref(index).unwrap();
    (owner.to_string(), name.to_string(), descriptor.to_string())
}
