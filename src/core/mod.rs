//! Core abstractions shared by every helper module
//!
//! This module provides the error type and the traits that decouple the
//! helpers from their collaborators.

pub mod error;
pub mod traits;


// Re-export commonly used types
pub use error::{ErrorContext, ProKitError, ProKitResult};
pub use traits::*;
