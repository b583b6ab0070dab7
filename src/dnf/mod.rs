//! DNF reduction: rewrites a shape-annotated tree so every
//! array-producing operator is read through a `psi`, eliminating
//! intermediate array materialisations.
//!
//! The driver is the generic [`crate::rewrite::fixpoint`]: one local rule
//! table, applied post-order, repeated until a full pass makes no further
//! change. Each pass ends with a [`calculate_shapes`] refresh rather than
//! hand-carrying shape arithmetic through every rewrite — simpler, and
//! just as correct since shape inference is a pure function of a node's
//! (already-rewritten) children.

use tracing::{instrument, trace};

use crate::ast::{
    dim_to_node, generate_unique_name, Context, Dim, ElementwiseOp, Node, NodeTag, SymbolNode,
};
use crate::error::{CompileError, Result};
use crate::rewrite::{
    apply_perm_index, concat_index, fixpoint, index_components, make_index_vector, node_to_dim,
    position_of, reverse_index, split_index, visit,
};
use crate::shape::calculate_shapes;

#[instrument(skip(context))]
pub fn reduce_dnf(context: Context, include_conditions: bool) -> Result<Context> {
    let ast = context.ast.clone();
    let (ctx, new_ast) = push_to_fixpoint(context, ast, include_conditions)?;
    ensure_normal(&new_ast)?;
    Ok(Context::new(new_ast, ctx.symbol_table))
}

/// Runs the DNF rule set over `node` to a fix point. The ONF reducer shares
/// this same rule set after wrapping its root in a `PSI`, so it's exposed
/// beyond this module.
pub(crate) fn push_to_fixpoint(context: Context, node: Node, include_conditions: bool) -> Result<(Context, Node)> {
    fixpoint(context, node, dnf_step(include_conditions))
}

fn dnf_step(include_conditions: bool) -> impl FnMut(Context, Node) -> Result<(Context, Node, bool)> {
    move |context, node| {
        let mut changed = false;
        let (ctx, rewritten) = visit(context, node, &mut |ctx, node| {
            let (ctx, maybe_new) = apply_rule(ctx, &node, include_conditions)?;
            match maybe_new {
                Some(new_node) => {
                    changed = true;
                    Ok((ctx, new_node))
                }
                None => Ok((ctx, node)),
            }
        })?;
        if !changed {
            return Ok((ctx, rewritten, false));
        }
        let Context { ast, symbol_table } = calculate_shapes(Context::new(rewritten, ctx.symbol_table))?;
        Ok((Context::new(ast.clone(), symbol_table), ast, true))
    }
}

fn dim0(node: &Node) -> Option<Dim> {
    node.shape.as_ref().and_then(|s| s.first().cloned())
}

fn add_nodes(a: Node, b: Node) -> Node {
    Node::new(NodeTag::Elementwise(ElementwiseOp::Plus), None, vec![], vec![a, b])
}

fn sub_nodes(a: Node, b: Node) -> Node {
    Node::new(NodeTag::Elementwise(ElementwiseOp::Minus), None, vec![], vec![a, b])
}

fn less_than(a: Node, b: Node) -> Node {
    Node::new(NodeTag::LessThan, Some(vec![]), vec![], vec![a, b])
}

/// Unravels a concrete flat index `k` into per-axis indices under
/// row-major `shape`, innermost axis varying fastest.
fn unravel(mut k: i64, shape: &[i64]) -> Vec<i64> {
    let mut components = vec![0i64; shape.len()];
    for axis in (0..shape.len()).rev() {
        let extent = shape[axis].max(1);
        components[axis] = k % extent;
        k /= extent;
    }
    components
}

/// Tries to rewrite `node` once. Returns the (possibly symbol-table
/// extending, e.g. to synthesise a reduction placeholder) context and the
/// replacement, or `None` if no rule matches at this node.
fn apply_rule(context: Context, node: &Node, include_conditions: bool) -> Result<(Context, Option<Node>)> {
    match &node.tag {
        NodeTag::Shape => {
            let a = &node.children[0];
            let a_shape = a.shape.as_ref().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(node.clone()),
                reason: "SHAPE operand has no shape".to_string(),
            })?;
            let literal = make_index_vector(a_shape.iter().map(dim_to_node).collect());
            Ok((context, Some(literal)))
        }

        NodeTag::Rank => {
            let a = &node.children[0];
            let rank = a.shape.as_ref().map(|s| s.len() as i64).unwrap_or(0);
            Ok((context, Some(Node::dim_literal(rank))))
        }

        NodeTag::Tau => {
            let a = &node.children[0];
            let a_shape = a.shape.as_ref().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(node.clone()),
                reason: "TAU operand has no shape".to_string(),
            })?;
            Ok((context, Some(dim_to_node(&crate::ast::shape_product(a_shape)))))
        }

        NodeTag::Psi => {
            let i = &node.children[0];
            let target = &node.children[1];
            apply_psi_rule(context, node, i, target, include_conditions)
        }

        _ => Ok((context, None)),
    }
}

fn apply_psi_rule(
    context: Context,
    psi_node: &Node,
    i: &Node,
    target: &Node,
    include_conditions: bool,
) -> Result<(Context, Option<Node>)> {
    match &target.tag {
        NodeTag::Transpose => {
            let a = &target.children[0];
            let rank_a = a.shape.as_ref().map(|s| s.len());
            let len_i = index_components(i).len();
            if rank_a == Some(len_i) {
                let new_psi = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![reverse_index(i), a.clone()]);
                return Ok((context, Some(new_psi)));
            }
            // Partial-rank indexing through TRANSPOSE is not reduced here.
            Ok((context, None))
        }

        NodeTag::TransposeV => {
            let perm_node = &target.children[0];
            let a = &target.children[1];
            let perm_name = perm_node.symbol_name().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(target.clone()),
                reason: "TRANSPOSEV permutation operand has no symbol reference".to_string(),
            })?;
            let perm = context
                .symbol_table
                .get(perm_name)
                .and_then(|s| s.attrib.clone())
                .ok_or_else(|| CompileError::MalformedNode {
                    node: Box::new(target.clone()),
                    reason: format!("symbol '{perm_name}' has no permutation vector"),
                })?;
            let new_index = apply_perm_index(i, &perm)?;
            let new_psi = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![new_index, a.clone()]);
            Ok((context, Some(new_psi)))
        }

        NodeTag::Elementwise(op) => {
            let a = &target.children[0];
            let b = &target.children[1];
            let index_through = |operand: &Node| -> Node {
                let is_scalar = operand.shape.as_ref().map(|s| s.is_empty()).unwrap_or(false);
                if is_scalar {
                    operand.clone()
                } else {
                    Node::new(NodeTag::Psi, None, vec![], vec![i.clone(), operand.clone()])
                }
            };
            let new_node = Node::new(NodeTag::Elementwise(*op), psi_node.shape.clone(), vec![], vec![index_through(a), index_through(b)]);
            Ok((context, Some(new_node)))
        }

        NodeTag::Dot(op) => {
            let a = &target.children[0];
            let b = &target.children[1];
            let rank_a = a.shape.as_ref().map(|s| s.len()).unwrap_or(0);
            let (i_a, i_b) = split_index(i, rank_a);
            let psi_a = Node::new(NodeTag::Psi, None, vec![], vec![i_a, a.clone()]);
            let psi_b = Node::new(NodeTag::Psi, None, vec![], vec![i_b, b.clone()]);
            let new_node = Node::new(NodeTag::Elementwise(*op), psi_node.shape.clone(), vec![], vec![psi_a, psi_b]);
            Ok((context, Some(new_node)))
        }

        NodeTag::Reduce(op) => {
            let a = &target.children[0];
            let symbol = SymbolNode::array(Some(vec![]));
            let (placeholder, context) = generate_unique_name(context, symbol, "_a");
            let k_node = Node::array(placeholder.clone());
            let new_index = concat_index(&make_index_vector(vec![k_node]), i);
            let inner_psi = Node::new(NodeTag::Psi, None, vec![], vec![new_index, a.clone()]);
            let new_node = Node::new(NodeTag::Reduce(*op), psi_node.shape.clone(), vec![placeholder], vec![inner_psi]);
            Ok((context, Some(new_node)))
        }

        NodeTag::Take => {
            let n = &target.children[0];
            let a = &target.children[1];
            let new_psi = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![i.clone(), a.clone()]);

            if !include_conditions {
                // Conditions off: assume the index is in range and omit
                // the check, same as an unchecked TAKE at run time.
                return Ok((context, Some(new_psi)));
            }

            let n_val = node_to_dim(n, &context.symbol_table).as_concrete();
            let a_val = dim0(a).and_then(|d| d.as_concrete());
            if let (Some(n_val), Some(a_val)) = (n_val, a_val) {
                if n_val > a_val {
                    return Err(CompileError::OutOfBounds {
                        node: Box::new(target.clone()),
                        reason: format!("TAKE({n_val}) exceeds source extent {a_val}"),
                        symbols: vec![],
                    });
                }
            }

            // The count itself is in range of the source array, but the
            // index being read still needs to be checked against it at
            // run time (`n` may be symbolic, or smaller than the index
            // domain DNF has already committed to).
            let components = index_components(i);
            let (head, _tail) = components.split_first().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(psi_node.clone()),
                reason: "PSI index vector through TAKE has no leading component".to_string(),
            })?;
            let predicate = less_than(head.clone(), n.clone());
            let out_of_bounds = Node::new(NodeTag::Error, psi_node.shape.clone(), vec![], vec![]);
            let condition = Node::new(NodeTag::Condition, psi_node.shape.clone(), vec![], vec![predicate, new_psi, out_of_bounds]);
            Ok((context, Some(condition)))
        }

        NodeTag::Drop => {
            let n = &target.children[0];
            let a = &target.children[1];
            let components = index_components(i);
            let (head, tail) = components.split_first().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(psi_node.clone()),
                reason: "PSI index vector through DROP has no leading component".to_string(),
            })?;
            let mut new_components = vec![add_nodes(head.clone(), n.clone())];
            new_components.extend_from_slice(tail);
            let new_index = make_index_vector(new_components);
            let new_psi = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![new_index, a.clone()]);
            Ok((context, Some(new_psi)))
        }

        NodeTag::Cat => {
            let a = &target.children[0];
            let b = &target.children[1];
            let components = index_components(i);
            let (head, tail) = components.split_first().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(psi_node.clone()),
                reason: "PSI index vector through CAT has no leading component".to_string(),
            })?;
            let a_len = a.shape.as_ref().and_then(|s| s.first().cloned()).ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(target.clone()),
                reason: "CAT left operand has no leading dimension".to_string(),
            })?;

            let then_index = make_index_vector(components.clone());
            let then_branch = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![then_index, a.clone()]);

            let mut else_components = vec![sub_nodes(head.clone(), dim_to_node(&a_len))];
            else_components.extend_from_slice(tail);
            let else_index = make_index_vector(else_components);
            let else_branch = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![else_index, b.clone()]);

            if include_conditions {
                let predicate = less_than(head.clone(), dim_to_node(&a_len));
                let condition = Node::new(
                    NodeTag::Condition,
                    psi_node.shape.clone(),
                    vec![],
                    vec![predicate, then_branch, else_branch],
                );
                return Ok((context, Some(condition)));
            }

            // Without conditions we can only pick a branch when the split
            // point is statically decidable; otherwise this rule doesn't
            // fire and DNF stalls with `DnfNoRule` rather than guessing.
            if let (Some(head_val), Some(a_len_val)) = (
                node_to_dim(head, &context.symbol_table).as_concrete(),
                a_len.as_concrete(),
            ) {
                return Ok((context, Some(if head_val < a_len_val { then_branch } else { else_branch })));
            }
            Ok((context, None))
        }

        NodeTag::Iota => {
            let components = index_components(i);
            match components.as_slice() {
                [only] => Ok((context, Some(only.clone()))),
                _ => Ok((context, None)),
            }
        }

        NodeTag::Rav => {
            let a = &target.children[0];
            let a_shape = a.shape.as_ref().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(target.clone()),
                reason: "RAV operand has no shape".to_string(),
            })?;
            let components = index_components(i);
            let ([flat], Some(extents)) = (
                components.as_slice(),
                a_shape.iter().map(Dim::as_concrete).collect::<Option<Vec<_>>>(),
            ) else {
                // Symbolic flat index or symbolic shape: unravelling needs
                // div/mod arithmetic this algebra doesn't model; leave
                // unreduced.
                return Ok((context, None));
            };
            let Some(k) = node_to_dim(flat, &context.symbol_table).as_concrete() else {
                return Ok((context, None));
            };
            let indices = unravel(k, &extents);
            let new_index = make_index_vector(indices.into_iter().map(Node::dim_literal).collect());
            let new_psi = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![new_index, a.clone()]);
            Ok((context, Some(new_psi)))
        }

        NodeTag::Psi => {
            let j = &target.children[0];
            let a = &target.children[1];
            let new_index = concat_index(j, i);
            let new_psi = Node::new(NodeTag::Psi, psi_node.shape.clone(), vec![], vec![new_index, a.clone()]);
            Ok((context, Some(new_psi)))
        }

        _ => Ok((context, None)),
    }
}

/// Checks the DNF normal-form invariant: after DNF, no non-leaf
/// array-producing operator appears anywhere except under `PSI` or as a
/// reduce body.
fn ensure_normal(node: &Node) -> Result<()> {
    fn is_array_producing(tag: &NodeTag) -> bool {
        matches!(
            tag,
            NodeTag::Transpose
                | NodeTag::TransposeV
                | NodeTag::Cat
                | NodeTag::Take
                | NodeTag::Drop
                | NodeTag::Dot(_)
        )
    }

    // The root itself is exempt: nothing reads it through a `PSI` yet —
    // ONF wraps the root in one and re-runs this same rule set afterwards.
    // Normality is required of everything beneath the root.
    fn walk(node: &Node, under_psi_or_reduce: bool, is_root: bool) -> Result<()> {
        if is_array_producing(&node.tag) && !under_psi_or_reduce && !is_root {
            return Err(CompileError::DnfNoRule { node: Box::new(node.clone()), symbols: vec![] });
        }
        let nested = matches!(node.tag, NodeTag::Psi | NodeTag::Reduce(_));
        for child in &node.children {
            walk(child, under_psi_or_reduce || nested, false)?;
        }
        Ok(())
    }

    walk(node, false, true)?;
    trace!("DNF tree is normal");
    Ok(())
}
