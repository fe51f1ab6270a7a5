//! Structural checks over a produced [`ClassFile`](crate::codegen::class::ClassFile)
//!
//! These are a self-check on the writer's output, not a full JVM verifier:
//! constant pool cross-references, method access flags, `Code` presence and,
//! for straight-line bodies, an operand stack simulation.

mod verifier;
pub mod constant_pool;
pub mod methods;

pub use verifier::{verify, VerifyError, VerifyResult};
