//! The top-level driver: `compile` runs shape inference, DNF, then ONF
//! reduction over a [`Context`], and hands the result to a named
//! [`Backend`].

use tracing::instrument;

use crate::ast::Context;
use crate::backend::lookup;
use crate::dnf::reduce_dnf;
use crate::error::{CompileError, Result};
use crate::onf::reduce_onf;
use crate::shape::calculate_shapes;

/// Bundles `compile`'s flags into one value. `backend` is the registry name
/// looked up via [`crate::backend::lookup`]; `include_conditions` and
/// `materialize_scalars` are threaded straight through to
/// [`reduce_dnf`]/[`reduce_onf`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub backend: String,
    pub include_conditions: bool,
    pub materialize_scalars: bool,
}

impl CompileOptions {
    pub fn new(backend: impl Into<String>, include_conditions: bool, materialize_scalars: bool) -> Self {
        CompileOptions { backend: backend.into(), include_conditions, materialize_scalars }
    }
}

/// Runs the full pipeline: shape inference, DNF reduction, ONF reduction,
/// then `options.backend`'s `generate`. Unknown backend names fail with
/// [`CompileError::UnknownBackend`] before any pass runs, so a typo is
/// reported without paying for the rewrite.
#[instrument(skip(context))]
pub fn compile(context: Context, options: &CompileOptions) -> Result<String> {
    let backend = lookup(&options.backend).ok_or_else(|| CompileError::UnknownBackend(options.backend.clone()))?;

    let context = calculate_shapes(context)?;
    let context = reduce_dnf(context, options.include_conditions)?;
    let context = reduce_onf(context, options.include_conditions, options.materialize_scalars)?;

    backend.generate(&context)
}
