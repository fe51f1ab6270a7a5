//! ABI stub generator for JVM class files (abistub)
//!
//! Rewrites compiled classes so that they keep their public shape (fields,
//! method signatures, annotations and every other attribute) while every
//! concrete method body is replaced by a trivial one. The result links and
//! passes bytecode verification but carries no implementation.
//!
//! ## Architecture
//!
//! - **codegen**: class file model, reader, writer and the visitor events between them
//! - **stub**: the body stubbing stage, a [`ClassVisitor`](codegen::ClassVisitor) decorator
//! - **verify**: structural self-check over produced class files
//! - **bin**: command-line interface
//!
//! ## Flow
//!
//! ```text
//! bytes → ClassReader ──events──▶ MethodStubber ──events──▶ ClassWriter → bytes
//!                                       ↓
//!                      constructors throw, other methods return zero
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod stub;
pub mod verify;

pub use config::Config;
pub use error::{Error, Result};
pub use stub::MethodStubber;

use std::path::Path;

use codegen::{class_file_to_bytes, ClassReader, ClassWriter, ReadOptions};

/// Stub every concrete method of a class file held in memory
///
/// Bytes → ClassReader → MethodStubber → ClassWriter → (verify) → bytes.
/// Original bodies are never decoded.
pub fn stub_class(bytes: &[u8], config: &Config) -> Result<Vec<u8>> {
    let reader = ClassReader::parse(bytes)?;
    log::debug!("read class {} ({} bytes)", reader.class_name()?, bytes.len());

    let mut stubber = MethodStubber::with_config(ClassWriter::from_reader(&reader), config);
    reader.accept(&mut stubber, ReadOptions::SKIP_CODE)?;
    let class_file = stubber.into_inner().into_class_file()?;

    if config.verify {
        verify::verify(&class_file)?;
    }
    Ok(class_file_to_bytes(&class_file))
}

/// Stub a class file on disk, writing the result to `output`
pub fn stub_file(input: &Path, output: &Path, config: &Config) -> Result<()> {
    log::info!("stubbing {} -> {}", input.display(), output.display());
    let bytes = std::fs::read(input)?;
    let stubbed = stub_class(&bytes, config)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, stubbed)?;
    Ok(())
}
