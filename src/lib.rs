//! A symbolic term-rewriting compiler for the Mathematics of Arrays (MOA)
//! algebra: shape inference, Denotational Normal Form (DNF), and
//! Operational Normal Form (ONF) reduction over a shared [`ast::Context`].
//!
//! This crate is a middle stage. It has no surface parser and no code
//! emitter of its own; callers hand it an already-built [`ast::Context`]
//! and a named [`backend::Backend`], and get back the backend's rendered
//! output.

pub mod ast;
pub mod backend;
pub mod compiler;
pub mod dnf;
pub mod error;
pub mod onf;
pub mod rewrite;
pub mod shape;

pub use compiler::{compile, CompileOptions};
pub use error::{CompileError, Result};
