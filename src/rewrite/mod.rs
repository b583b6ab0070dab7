//! Rewrite utilities: the generic post-order visitor, the fix-point driver
//! shared by the DNF and ONF reducers, and the shape/index-vector
//! arithmetic helpers those two passes both need.

use crate::ast::{Context, Dim, ElementwiseOp, Node, NodeTag, SymbolTable};
use crate::error::{CompileError, Result};

/// Post-order traversal: visits every child, left to right, exactly once,
/// before the parent. `visitor` receives the node with its children already
/// rewritten.
pub fn visit<F>(context: Context, node: Node, visitor: &mut F) -> Result<(Context, Node)>
where
    F: FnMut(Context, Node) -> Result<(Context, Node)>,
{
    let Node { tag, shape, attrib, children } = node;

    let mut ctx = context;
    let mut new_children = Vec::with_capacity(children.len());
    for child in children {
        let (next_ctx, new_child) = visit(ctx, child, visitor)?;
        ctx = next_ctx;
        new_children.push(new_child);
    }

    let rewritten = Node::new(tag, shape, attrib, new_children);
    visitor(ctx, rewritten)
}

/// Runs `step` (one full post-order pass) repeatedly until it reports no
/// further change. `step` returns `(context, node, changed)`; termination
/// relies on each real rule application strictly decreasing the size of the
/// non-normal subtree it rewrites, so every caller here is guaranteed to
/// reach a fix point — this just drives that loop.
pub fn fixpoint<F>(mut context: Context, mut node: Node, mut step: F) -> Result<(Context, Node)>
where
    F: FnMut(Context, Node) -> Result<(Context, Node, bool)>,
{
    loop {
        let (next_context, next_node, changed) = step(context, node)?;
        context = next_context;
        node = next_node;
        if !changed {
            return Ok((context, node));
        }
    }
}

/// Resolves a child expression used as a shape/count argument (e.g. `TAKE`'s
/// `n`, `IOTA`'s `n`) to a [`Dim`]: `Concrete` if it's an `ARRAY` leaf whose
/// symbol table entry carries a single-element literal `value`, `Symbolic`
/// otherwise.
pub fn node_to_dim(node: &Node, symbol_table: &SymbolTable) -> Dim {
    if node.tag == NodeTag::Array {
        if let Some(name) = node.symbol_name() {
            if let Some(symbol) = symbol_table.get(name) {
                if let Some(value) = &symbol.value {
                    if let [single] = value.as_slice() {
                        return Dim::concrete(*single);
                    }
                }
            }
        }
    }
    Dim::symbolic(node.clone())
}

/// The position `j` such that `perm[j] == k`, i.e. the inverse permutation
/// applied to a single index. Shared by the shape rule for `TRANSPOSEV` and
/// the DNF rule `PSI(i, TRANSPOSEV(p, A)) -> PSI(apply_perm(p, i), A)`.
pub fn position_of(k: usize, perm: &[i64]) -> Result<usize> {
    perm.iter()
        .position(|&p| p == k as i64)
        .ok_or_else(|| CompileError::MalformedNode {
            node: Box::new(Node::dim_literal(k as i64)),
            reason: format!("permutation {perm:?} has no entry for axis {k}"),
        })
}

/// Permutes `shape` by `perm` under `TRANSPOSEV`'s inverted convention:
/// `out[i] = shape[position_of(i, perm)]`.
pub fn permute_shape(shape: &[Dim], perm: &[i64]) -> Result<Vec<Dim>> {
    (0..shape.len())
        .map(|i| Ok(shape[position_of(i, perm)?].clone()))
        .collect()
}

/// The component `Node`s of an index vector. An `IndexVector` node's
/// children are already the components; any other node is treated as an
/// opaque single-component vector (e.g. a literal `ARRAY` reference whose
/// symbol holds the whole tuple).
pub fn index_components(node: &Node) -> Vec<Node> {
    match node.tag {
        NodeTag::IndexVector => node.children.clone(),
        _ => vec![node.clone()],
    }
}

/// Builds an `IndexVector` node from components, collapsing a single
/// component back to a bare node so `PSI(i, A)` with a length-1 index
/// doesn't grow a pointless wrapper.
pub fn make_index_vector(components: Vec<Node>) -> Node {
    if let [only] = components.as_slice() {
        return only.clone();
    }
    Node::new(NodeTag::IndexVector, None, vec![], components)
}

pub fn reverse_index(node: &Node) -> Node {
    let mut components = index_components(node);
    components.reverse();
    make_index_vector(components)
}

pub fn apply_perm_index(node: &Node, perm: &[i64]) -> Result<Node> {
    let components = index_components(node);
    let permuted = (0..components.len())
        .map(|i| Ok(components[position_of(i, perm)?].clone()))
        .collect::<Result<Vec<_>>>()?;
    Ok(make_index_vector(permuted))
}

pub fn concat_index(first: &Node, second: &Node) -> Node {
    let mut components = index_components(first);
    components.extend(index_components(second));
    make_index_vector(components)
}

/// Splits an index vector's components at `at`, returning `(prefix,
/// suffix)`. Used by `PSI(i, (DOT, op)(A, B)) -> op(PSI(i[:rank(A)], A),
/// PSI(i[rank(A):], B))`.
pub fn split_index(node: &Node, at: usize) -> (Node, Node) {
    let components = index_components(node);
    let (prefix, suffix) = components.split_at(at.min(components.len()));
    (make_index_vector(prefix.to_vec()), make_index_vector(suffix.to_vec()))
}

/// The identity element of an `ElementwiseOp`'s monoid, used to seed
/// `REDUCE`'s ONF accumulator.
pub fn identity_value(op: ElementwiseOp) -> i64 {
    match op {
        ElementwiseOp::Plus | ElementwiseOp::Minus => 0,
        ElementwiseOp::Times | ElementwiseOp::Divide => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SymbolNode;

    #[test]
    fn visit_orders_children_before_parent() {
        let tree = Node::new(
            NodeTag::Elementwise(ElementwiseOp::Plus),
            None,
            vec![],
            vec![Node::array("A"), Node::array("B")],
        );
        let mut order = Vec::new();
        let mut table = SymbolTable::new();
        table.insert("A", SymbolNode::array(None));
        table.insert("B", SymbolNode::array(None));
        let context = Context::new(tree.clone(), table);

        let (_, _) = visit(context, tree, &mut |ctx, node| {
            if let Some(name) = node.symbol_name() {
                order.push(name.to_string());
            }
            Ok((ctx, node))
        })
        .unwrap();

        assert_eq!(order, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn reverse_then_reverse_is_identity() {
        let index = make_index_vector(vec![Node::array("i0"), Node::array("i1"), Node::array("i2")]);
        let reversed = reverse_index(&index);
        let back = reverse_index(&reversed);
        assert_eq!(index, back);
    }

    #[test]
    fn split_index_respects_boundary() {
        let index = make_index_vector(vec![Node::array("i0"), Node::array("i1"), Node::array("i2")]);
        let (prefix, suffix) = split_index(&index, 1);
        assert_eq!(index_components(&prefix).len(), 1);
        assert_eq!(index_components(&suffix).len(), 2);
    }
}
