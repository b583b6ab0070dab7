//! The pluggable code-generation stage `compile` hands an ONF tree to once
//! the three rewriting passes are done. No target-language emitter lives
//! here; this module only fixes the contract a real one would implement,
//! plus [`DebugBackend`], a reference implementation good enough to
//! exercise [`crate::compiler::compile`] end to end.

mod debug_backend;

use crate::ast::Context;
use crate::error::Result;

pub use self::debug_backend::DebugBackend;

/// A target that can render an ONF-normalised [`Context`] to source text.
/// A string-keyed registry of these is how `compile` stays decoupled from
/// any one emitter.
pub trait Backend {
    /// The name `compile`'s `backend` argument must match to select this
    /// implementation.
    fn name(&self) -> &'static str;

    /// Renders `context`'s (already ONF-normalised) AST.
    fn generate(&self, context: &Context) -> Result<String>;
}

/// Looks up a [`Backend`] by name among the ones this crate ships.
/// `compile` calls this; a host embedding its own backends would keep its
/// own registry instead of extending this one.
pub fn lookup(name: &str) -> Option<Box<dyn Backend>> {
    match name {
        "debug" => Some(Box::new(DebugBackend)),
        _ => None,
    }
}
