use crate::ast::{Node, SymbolNode};

/// A symbol-table fragment attached to an error: the entries the offending
/// node actually touched, so a caller can print a minimal repro without
/// serializing the whole table.
pub type SymbolFragment = Vec<(String, SymbolNode)>;

/// Fatal compilation errors. Every variant is unwound through the rewriter
/// as a `Result::Err`; none are retried or recovered from.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// Binary operand shapes disagree and neither operand is scalar.
    #[error("shape mismatch: {lhs_shape:?} vs {rhs_shape:?} at {node:?}")]
    ShapeMismatch {
        node: Box<Node>,
        lhs_shape: Vec<String>,
        rhs_shape: Vec<String>,
        symbols: SymbolFragment,
    },

    /// Index rank exceeds array rank under PSI, reduce applied to a scalar,
    /// or a similarly rank-dependent precondition failed.
    #[error("rank mismatch at {node:?}: {reason}")]
    RankMismatch {
        node: Box<Node>,
        reason: String,
        symbols: SymbolFragment,
    },

    /// A node references a name absent from the symbol table.
    #[error("unknown symbol '{name}'")]
    UnknownSymbol { name: String, node: Box<Node> },

    /// Operator arity or tag shape violates the data-model invariants.
    #[error("malformed node: {reason}")]
    MalformedNode { node: Box<Node>, reason: String },

    /// DNF fix-point was reached with a node that is still non-normal.
    #[error("no DNF rule applies to {node:?}")]
    DnfNoRule { node: Box<Node>, symbols: SymbolFragment },

    /// The compiler driver was asked for a backend it doesn't have.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// `include_conditions=true` and bounds were statically decidable as
    /// violated.
    #[error("out of bounds access at {node:?}: {reason}")]
    OutOfBounds {
        node: Box<Node>,
        reason: String,
        symbols: SymbolFragment,
    },
}

pub type Result<T> = std::result::Result<T, CompileError>;
