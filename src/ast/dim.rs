use super::node::Node;

/// A single shape dimension: either a fully resolved extent or a sub-tree
/// standing in for an extent that isn't known yet.
///
/// Arithmetic on `Dim`s folds to `Concrete` when both operands are
/// `Concrete`; otherwise it builds a small `Node` recording the operation,
/// simplified only by identity/zero folding (never general algebra).
#[derive(Debug, Clone, PartialEq)]
pub enum Dim {
    Concrete(i64),
    Symbolic(Box<Node>),
}

/// A result shape: an ordered sequence of per-axis extents. Rank is
/// `shape.len()`; `()` (empty `Vec`) is a scalar.
pub type Shape = Vec<Dim>;

impl Dim {
    pub fn concrete(value: i64) -> Self {
        Dim::Concrete(value)
    }

    pub fn symbolic(node: Node) -> Self {
        Dim::Symbolic(Box::new(node))
    }

    /// The resolved integer value, if this dimension is fully concrete.
    pub fn as_concrete(&self) -> Option<i64> {
        match self {
            Dim::Concrete(v) => Some(*v),
            Dim::Symbolic(_) => None,
        }
    }
}

/// Converts a `Dim` back into the `Node` it denotes: a fresh `DimLiteral`
/// for a concrete extent, or the sub-tree itself for a symbolic one. Used
/// by `dim_add`/`dim_sub`/`dim_mul` and by the DNF/ONF passes whenever a
/// shape dimension needs to become an index-arithmetic operand.
pub fn dim_to_node(dim: &Dim) -> Node {
    match dim {
        Dim::Concrete(v) => Node::dim_literal(*v),
        Dim::Symbolic(n) => (**n).clone(),
    }
}

/// `a + b`, folding when both sides are concrete and applying the zero
/// identity, otherwise building a `PLUS` sub-tree over the two operands.
pub fn dim_add(a: &Dim, b: &Dim) -> Dim {
    match (a, b) {
        (Dim::Concrete(x), Dim::Concrete(y)) => Dim::Concrete(x + y),
        (Dim::Concrete(0), other) | (other, Dim::Concrete(0)) => other.clone(),
        _ => Dim::symbolic(Node::elementwise_dim(
            super::node::ElementwiseOp::Plus,
            dim_to_node(a),
            dim_to_node(b),
        )),
    }
}

/// `a - b`, folding when both sides are concrete and applying the zero
/// identity on the right, otherwise building a `MINUS` sub-tree.
pub fn dim_sub(a: &Dim, b: &Dim) -> Dim {
    match (a, b) {
        (Dim::Concrete(x), Dim::Concrete(y)) => Dim::Concrete(x - y),
        (other, Dim::Concrete(0)) => other.clone(),
        _ => Dim::symbolic(Node::elementwise_dim(
            super::node::ElementwiseOp::Minus,
            dim_to_node(a),
            dim_to_node(b),
        )),
    }
}

/// `a * b`, folding when both sides are concrete and applying the
/// zero/one identities, otherwise building a `TIMES` sub-tree.
pub fn dim_mul(a: &Dim, b: &Dim) -> Dim {
    match (a, b) {
        (Dim::Concrete(x), Dim::Concrete(y)) => Dim::Concrete(x * y),
        (Dim::Concrete(0), _) | (_, Dim::Concrete(0)) => Dim::Concrete(0),
        (Dim::Concrete(1), other) | (other, Dim::Concrete(1)) => other.clone(),
        _ => Dim::symbolic(Node::elementwise_dim(
            super::node::ElementwiseOp::Times,
            dim_to_node(a),
            dim_to_node(b),
        )),
    }
}

/// Product of a shape's dimensions (used by `TAU`), folding eagerly and
/// only falling back to a symbolic product when a dimension isn't concrete.
pub fn shape_product(shape: &[Dim]) -> Dim {
    shape
        .iter()
        .fold(Dim::Concrete(1), |acc, dim| dim_mul(&acc, dim))
}
