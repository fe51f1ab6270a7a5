//! Generic classfile-specific definitions

/// Header of Java class file (magic number)
pub const MAGIC: u32 = 0xCAFEBABE;

/// Name of a constructor
pub const CONSTRUCTOR_METHOD_NAME: &str = "<init>";

/// Name of a static initializer
pub const STATIC_INITIALIZER_METHOD_NAME: &str = "<clinit>";

/// Descriptor of a no-argument constructor
pub const NO_ARG_CONSTRUCTOR_DESCRIPTOR: &str = "()V";

/// Default error class thrown by stubbed constructors
pub const DEFAULT_EXCEPTION_CLASS: &str = "java/lang/Error";

/// Attribute names the reader and writer treat specially
pub mod attribute_names {
    pub const CODE: &str = "Code";
    pub const EXCEPTIONS: &str = "Exceptions";
    pub const SIGNATURE: &str = "Signature";
    pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
}

/// JVM version constants
pub mod major_versions {
    pub const JAVA_1_1: u16 = 45;
    pub const JAVA_6_0: u16 = 50;
    pub const JAVA_7: u16 = 51;
    pub const JAVA_8: u16 = 52;
    pub const JAVA_11: u16 = 55;
    pub const JAVA_17: u16 = 61;
    pub const JAVA_21: u16 = 65;
}

pub const JAVA_1_8: u16 = major_versions::JAVA_8;

/// Upper bound on the length of a method's bytecode (JVMS 4.7.3)
pub const MAX_CODE_LENGTH: usize = 65535;
