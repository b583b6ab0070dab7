use super::dim::Shape;

/// The element-wise family shared by `PLUS`/`MINUS`/`TIMES`/`DIVIDE` and by
/// the two parametric operators that take one of them as a parameter
/// (`REDUCE` and `DOT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ElementwiseOp {
    Plus,
    Minus,
    Times,
    Divide,
}

/// The operator tag of a [`Node`]. The MOA algebra describes an operator as
/// an ordered tuple of enum tags (a 1-tuple for primitives, a 2-tuple for
/// parametric operators like `(REDUCE, PLUS)`); here that tuple is collapsed
/// into one Rust enum, with the arity-two operators carrying their
/// parameter inline (`Reduce(ElementwiseOp)`, `Dot(ElementwiseOp)`) instead
/// of nesting a second tag. Every variant documents the `children`/`attrib`
/// convention it expects, since every `Node` shares the same four physical
/// fields regardless of tag.
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum NodeTag {
    /// A named array reference. Leaf: `children = []`, `attrib = [name]`.
    Array,

    /// `children = [A]`. Reverses `A`'s shape.
    Transpose,

    /// `children = [perm, A]`, where `perm` is itself an `Array` node whose
    /// symbol-table entry's `attrib` holds the concrete permutation vector.
    TransposeV,

    /// `children = [A]`. Result is the 1-D vector of `A`'s shape.
    Shape,

    /// The algebra's `DIM` (rank-of) operator. Named `Rank` here to avoid
    /// colliding with the unrelated [`super::dim::Dim`] shape-element type.
    /// `children = [A]`.
    Rank,

    /// Total element count (`TAU`). `children = [A]`.
    Tau,

    /// Ravel/flatten (`RAV`). `children = [A]`.
    Rav,

    /// `children = [n]`. `n` is a scalar-shaped expression giving the
    /// vector's length.
    Iota,

    /// `PLUS`/`MINUS`/`TIMES`/`DIVIDE`. `children = [lhs, rhs]`.
    Elementwise(ElementwiseOp),

    /// The index operator. `children = [index_vector, array]`.
    Psi,

    /// `children = [n, A]`.
    Take,

    /// `children = [n, A]`.
    Drop,

    /// `children = [lhs, rhs]`.
    Cat,

    /// `(REDUCE, op)`. Before DNF reduction: `attrib = []`, `children =
    /// [A]`, reducing over `A`'s leading axis. After a reduce rule fires:
    /// `attrib = [placeholder_index_name]`, `children = [scalar_body]`,
    /// meaning "accumulate `scalar_body` (which reads the placeholder)
    /// with `op` as the placeholder ranges over its bound" — shape
    /// inference treats the two forms differently (see [`crate::shape`]).
    Reduce(ElementwiseOp),

    /// `(DOT, op)`, the outer product. `children = [lhs, rhs]`.
    Dot(ElementwiseOp),

    /// A synthetic, MOA-internal tuple of index-vector components. Not part
    /// of the surface algebra; introduced so the rewrite rules that
    /// reverse/permute/split/concatenate index vectors have a concrete
    /// `Node` shape to operate on, the same way a statement-list or
    /// call-arguments node represents its members as a first-class vector
    /// of children rather than a cons-chain. `children = [c0, c1, ...]`.
    IndexVector,

    /// A synthetic concrete-integer leaf used only inside shape/index
    /// arithmetic sub-trees (see [`super::dim`]). `children = []`,
    /// `attrib = []`.
    DimLiteral(i64),

    /// A strict less-than comparison, used as a `CONDITION`'s predicate —
    /// the minimal predicate machinery `CAT`/`TAKE`/`DROP`'s boundary
    /// conditions need. `children = [lhs, rhs]`.
    LessThan,

    /// An accumulator allocation for a surviving `REDUCE`. `attrib =
    /// [accumulator_name]`; the identity value for `op` is what the
    /// accumulator is seeded with. `children = []`.
    Initialise(ElementwiseOp),

    /// `attrib = [induction_var_name]`, `children = [lower, upper, body]`.
    Loop,

    /// `children = [predicate, then_branch, else_branch]`.
    Condition,

    /// `children = [destination, source]`.
    Assign,

    /// Sequential composition of statements (`INITIALISE`/`LOOP`/
    /// `ASSIGN`/`CONDITION`) that share a scope, e.g. a reduction's
    /// accumulator setup followed by the loop that uses it. Synthetic, not
    /// part of the surface algebra — the same first-class-vector-of-
    /// children convention as `IndexVector`, applied to program statements
    /// rather than data tuples. `children = [stmt0, stmt1, ...]`.
    Block,

    /// Reserved for interface completeness with the tag enumeration; no
    /// rewrite rule in this crate targets it. `attrib = [name]`, `children
    /// = [parameters, body]`.
    Function,

    /// A runtime-raised failure, e.g. the branch of a bounds `CONDITION`
    /// taken when an index turns out to be out of range at run time rather
    /// than statically. Most failures are `Result::Err`s raised during
    /// compilation itself; this is for the rare one a generated program
    /// only discovers while running. `children = []`.
    Error,
}

/// The expression tree. All four fields are always present; which ones are
/// meaningful is determined by `tag` (see [`NodeTag`]'s per-variant docs).
///
/// Invariants upheld by every constructor in this module: children are
/// ordered and exclusively owned by their parent; `ARRAY` nodes never carry
/// children; `attrib` is non-empty exactly when the node references a
/// symbol-table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: NodeTag,
    pub shape: Option<Shape>,
    pub attrib: Vec<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(tag: NodeTag, shape: Option<Shape>, attrib: Vec<String>, children: Vec<Node>) -> Self {
        Node { tag, shape, attrib, children }
    }

    /// A leaf `ARRAY` node referencing `name` in the symbol table.
    pub fn array(name: impl Into<String>) -> Self {
        Node::new(NodeTag::Array, None, vec![name.into()], vec![])
    }

    pub fn dim_literal(value: i64) -> Self {
        Node::new(NodeTag::DimLiteral(value), Some(vec![]), vec![], vec![])
    }

    pub(crate) fn elementwise_dim(op: ElementwiseOp, lhs: Node, rhs: Node) -> Self {
        Node::new(NodeTag::Elementwise(op), None, vec![], vec![lhs, rhs])
    }

    pub fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(|s| s.len())
    }

    /// The single symbol name this node references, if it has exactly one.
    pub fn symbol_name(&self) -> Option<&str> {
        match self.attrib.as_slice() {
            [name] => Some(name.as_str()),
            _ => None,
        }
    }
}

/// `make_node(symbol, shape, attrib, children) -> Node` — the constructor
/// every rewrite rule builds its replacement nodes through.
pub fn make_node(tag: NodeTag, shape: Option<Shape>, attrib: Vec<String>, children: Vec<Node>) -> Node {
    Node::new(tag, shape, attrib, children)
}
