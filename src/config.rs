//! Construction-time settings for a stubbing pass

use crate::codegen::defs::DEFAULT_EXCEPTION_CLASS;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Internal name of the class thrown by stubbed constructors
    pub exception_class: String,
    /// Run the structural verifier over the produced class
    pub verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { exception_class: DEFAULT_EXCEPTION_CLASS.to_string(), verify: true }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the constructor error class; dotted names are converted to internal form.
    pub fn with_exception_class(mut self, name: &str) -> Result<Self> {
        self.exception_class = internal_class_name(name)?;
        Ok(self)
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Converts `com.example.Boom` or `com/example/Boom` to `com/example/Boom`
pub fn internal_class_name(name: &str) -> Result<String> {
    let internal = name.trim().replace('.', "/");
    if internal.is_empty() {
        return Err(Error::config_error("exception class name is empty"));
    }
    if internal.split('/').any(|segment| segment.is_empty()) {
        return Err(Error::config_error(format!("exception class name {:?} has an empty segment", name)));
    }
    if let Some(c) = internal.chars().find(|c| matches!(c, ';' | '[' | '<' | '>' | '(' | ')') || c.is_whitespace()) {
        return Err(Error::config_error(format!("exception class name {:?} contains {:?}", name, c)));
    }
    Ok(internal)
}
