use crate::codegen::class::ClassFile;
use crate::codegen::constpool::Constant;
use crate::codegen::flag::access_flags;
use super::constant_pool::{self, ConstantPoolVerifyError};
use super::methods::{self, MethodVerifyError};

pub type VerifyResult<T> = Result<T, VerifyError>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Invalid this_class index {0}")]
    InvalidThisClass(u16),
    #[error("Invalid super_class index {0}")]
    InvalidSuperClass(u16),
    #[error("Constant pool: {0}")]
    ConstantPool(#[from] ConstantPoolVerifyError),
    #[error("Method {method}: {source}")]
    Method {
        method: String,
        #[source]
        source: MethodVerifyError,
    },
}

/// Verify the ClassFile by orchestrating all sub-verifiers
pub fn verify(class_file: &ClassFile) -> VerifyResult<()> {
    log::debug!(
        "verifying {} ({} methods)",
        class_file.name().unwrap_or("<unnamed>"),
        class_file.methods.len()
    );
    constant_pool::verify(class_file)?;
    verify_this_class(class_file)?;
    verify_super_class(class_file)?;
    for method in &class_file.methods {
        methods::verify(class_file, method).map_err(|source| VerifyError::Method {
            method: methods::display_name(class_file, method),
            source,
        })?;
    }
    Ok(())
}

fn verify_this_class(class_file: &ClassFile) -> VerifyResult<()> {
    match class_file.constant_pool.get(class_file.this_class) {
        Ok(Constant::Class(_)) => Ok(()),
        _ => Err(VerifyError::InvalidThisClass(class_file.this_class)),
    }
}

fn verify_super_class(class_file: &ClassFile) -> VerifyResult<()> {
    let super_class = class_file.super_class;

    // only java/lang/Object has no superclass; interfaces always name one
    let class_is_interface = class_file.access_flags & access_flags::ACC_INTERFACE != 0;
    if !class_is_interface && super_class == 0 {
        return Ok(());
    }

    match class_file.constant_pool.get(super_class) {
        Ok(Constant::Class(_)) => Ok(()),
        _ => Err(VerifyError::InvalidSuperClass(super_class)),
    }
}
