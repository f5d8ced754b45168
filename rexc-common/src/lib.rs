//! REX Compiler - Common Types and Utilities
//!
//! This crate contains shared types and error definitions used across
//! all components of the REX compiler.

pub mod error;
pub mod source_loc;

pub use error::CompilerError;
pub use source_loc::SourceLocation;
