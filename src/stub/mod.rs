//! Method body stubbing
//!
//! [`MethodStubber`] sits in a visitor chain in front of a writer and
//! replaces every concrete method body with the smallest body the JVM
//! verifier accepts: constructors throw a configured error, everything
//! else returns the zero value of its return type. Abstract and native
//! methods pass through untouched.

mod body;
mod stubber;

pub use body::{stub_body, StubBody};
pub use stubber::MethodStubber;

use thiserror::Error;

use crate::codegen::error::DescriptorError;

/// Input-contract violations found while stubbing a method
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StubError {
    #[error("Cannot stub {method}: {source}")]
    Descriptor {
        method: String,
        #[source]
        source: DescriptorError,
    },
    #[error("Constructor {method}{descriptor} must return void")]
    ConstructorReturnsValue { method: String, descriptor: String },
    #[error("Constructor {method}{descriptor} must not be static")]
    StaticConstructor { method: String, descriptor: String },
}

pub type StubResult<T> = std::result::Result<T, StubError>;
