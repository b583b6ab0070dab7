//! ONF reduction: turns a DNF tree that still reads arrays abstractly via
//! `PSI(i, A)` into an imperative schedule — a loop nest over fresh
//! induction variables, ending in a per-element `ASSIGN` to an output
//! buffer.

use tracing::instrument;

use crate::ast::{dim_to_node, generate_unique_name_default, Context, Node, NodeTag, SymbolNode};
use crate::dnf::push_to_fixpoint;
use crate::error::{CompileError, Result};
use crate::rewrite::{identity_value, make_index_vector};
use crate::shape::calculate_shapes;

/// `compile`'s third and fourth arguments, threaded straight from the
/// driver.
#[instrument(skip(context))]
pub fn reduce_onf(context: Context, include_conditions: bool, materialize_scalars: bool) -> Result<Context> {
    let root_shape = context.ast.shape.clone().ok_or_else(|| CompileError::MalformedNode {
        node: Box::new(context.ast.clone()),
        reason: "ONF input root has no shape".to_string(),
    })?;

    // 1. Fresh index symbols, one per output axis.
    let mut context = context;
    let mut index_names = Vec::with_capacity(root_shape.len());
    for _ in 0..root_shape.len() {
        let (name, ctx) = generate_unique_name_default(context, SymbolNode::array(Some(vec![])));
        context = ctx;
        index_names.push(name);
    }
    let index_nodes: Vec<Node> = index_names.iter().cloned().map(Node::array).collect();
    let index_vector = make_index_vector(index_nodes.clone());

    // 2. Wrap the root in PSI(index_vector, root) and push it through with
    // the DNF rule set until every leaf read is a concrete PSI into an
    // ARRAY.
    let wrapped = Node::new(NodeTag::Psi, None, vec![], vec![index_vector.clone(), context.ast.clone()]);
    let Context { ast: wrapped, symbol_table } = calculate_shapes(Context::new(wrapped, context.symbol_table))?;
    let (context, scalar_expr) = push_to_fixpoint(Context::new(wrapped.clone(), symbol_table), wrapped, include_conditions)?;

    // 3. Lift any surviving REDUCE into an accumulator + loop, replacing
    // its position in the expression with a reference to the result.
    let (context, scalar_expr, mut prelude) = lift_reduces(context, scalar_expr)?;

    // 4. materialize_scalars: hoist remaining literal sub-expressions into
    // their own single-element buffers.
    let (mut context, scalar_expr) = if materialize_scalars {
        let (ctx, expr, extra_prelude) = materialize_scalars_pass(context, scalar_expr);
        prelude.extend(extra_prelude);
        (ctx, expr)
    } else {
        (context, scalar_expr)
    };

    // 5. Output buffer + final per-element assignment.
    let (output_name, ctx) = generate_unique_name_default(context, SymbolNode::array(Some(root_shape.clone())));
    context = ctx;
    let output_ref = Node::new(NodeTag::Psi, Some(vec![]), vec![], vec![index_vector, Node::array(output_name)]);
    let final_assign = Node::new(NodeTag::Assign, Some(vec![]), vec![], vec![output_ref, scalar_expr]);
    prelude.push(final_assign);
    let body = make_block(prelude);

    // 6. Nested loops, innermost over the last axis (row-major locality).
    let mut loop_body = body;
    for (axis, name) in index_names.into_iter().enumerate().rev() {
        let bound = dim_to_node(&root_shape[axis]);
        loop_body = Node::new(NodeTag::Loop, None, vec![name], vec![Node::dim_literal(0), bound, loop_body]);
    }

    let Context { symbol_table, .. } = context;
    calculate_shapes(Context::new(loop_body, symbol_table))
}

fn make_block(mut stmts: Vec<Node>) -> Node {
    if stmts.len() == 1 {
        return stmts.remove(0);
    }
    Node::new(NodeTag::Block, None, vec![], stmts)
}

/// Replaces every surviving `Reduce(op)` sub-tree with a reference to a
/// fresh accumulator, and returns the `INITIALISE` + accumulation `LOOP`
/// statements that must run before that reference is read.
fn lift_reduces(context: Context, node: Node) -> Result<(Context, Node, Vec<Node>)> {
    let Node { tag, shape, attrib, children } = node;

    let mut ctx = context;
    let mut prelude = Vec::new();
    let mut new_children = Vec::with_capacity(children.len());
    for child in children {
        let (next_ctx, new_child, child_prelude) = lift_reduces(ctx, child)?;
        ctx = next_ctx;
        prelude.extend(child_prelude);
        new_children.push(new_child);
    }

    let op = match &tag {
        NodeTag::Reduce(op) => *op,
        _ => return Ok((ctx, Node::new(tag, shape, attrib, new_children), prelude)),
    };

    let inner_psi = new_children.into_iter().next().ok_or_else(|| CompileError::MalformedNode {
        node: Box::new(Node::new(NodeTag::Reduce(op), shape.clone(), attrib.clone(), vec![])),
        reason: "REDUCE surviving DNF has no PSI child".to_string(),
    })?;
    let placeholder = attrib.into_iter().next().ok_or_else(|| CompileError::MalformedNode {
        node: Box::new(inner_psi.clone()),
        reason: "REDUCE surviving DNF carries no induction placeholder".to_string(),
    })?;
    let reduced_array = &inner_psi.children[1];
    let bound = reduced_array.shape.as_ref().and_then(|s| s.first().cloned()).ok_or_else(|| CompileError::MalformedNode {
        node: Box::new(inner_psi.clone()),
        reason: "REDUCE's reduced array has no leading dimension".to_string(),
    })?;

    let (acc_name, ctx) = generate_unique_name_default(ctx, SymbolNode::literal_scalar(identity_value(op)));
    let init = Node::new(NodeTag::Initialise(op), Some(vec![]), vec![acc_name.clone()], vec![]);
    let accumulate = Node::new(
        NodeTag::Assign,
        Some(vec![]),
        vec![],
        vec![Node::array(acc_name.clone()), Node::new(NodeTag::Elementwise(op), Some(vec![]), vec![], vec![Node::array(acc_name.clone()), inner_psi])],
    );
    let loop_node = Node::new(NodeTag::Loop, None, vec![placeholder], vec![Node::dim_literal(0), dim_to_node(&bound), accumulate]);

    prelude.push(init);
    prelude.push(loop_node);
    Ok((ctx, Node::array(acc_name), prelude))
}

/// Hoists literal constant leaves into their own single-element buffers,
/// assigned once before the main body reads them.
fn materialize_scalars_pass(context: Context, node: Node) -> (Context, Node, Vec<Node>) {
    if let NodeTag::DimLiteral(v) = &node.tag {
        let v = *v;
        let (name, ctx) = generate_unique_name_default(context, SymbolNode::literal_scalar(v));
        let buffer_ref = Node::array(name);
        let assign = Node::new(NodeTag::Assign, Some(vec![]), vec![], vec![buffer_ref.clone(), node]);
        return (ctx, buffer_ref, vec![assign]);
    }

    let Node { tag, shape, attrib, children } = node;
    let mut ctx = context;
    let mut prelude = Vec::new();
    let mut new_children = Vec::with_capacity(children.len());
    for child in children {
        let (next_ctx, new_child, child_prelude) = materialize_scalars_pass(ctx, child);
        ctx = next_ctx;
        prelude.extend(child_prelude);
        new_children.push(new_child);
    }
    (ctx, Node::new(tag, shape, attrib, new_children), prelude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{create_context, Dim as D, ElementwiseOp as Op, SymbolKind, SymbolTable};

    fn array_symbol(shape: Vec<i64>) -> SymbolNode {
        SymbolNode::new(SymbolKind::Array, Some(shape.into_iter().map(D::Concrete).collect()), None, None)
    }

    #[test]
    fn onf_wraps_elementwise_plus_in_matching_loop_nest() {
        let mut table = SymbolTable::new();
        table.insert("A", array_symbol(vec![3]));
        table.insert("B", array_symbol(vec![3]));
        let tree = Node::new(NodeTag::Elementwise(Op::Plus), None, vec![], vec![Node::array("A"), Node::array("B")]);
        let context = calculate_shapes(create_context(tree, table)).unwrap();

        let result = reduce_onf(context, true, false).unwrap();
        assert_eq!(result.ast.tag, NodeTag::Loop);
        assert_eq!(result.ast.children[0].tag, NodeTag::DimLiteral(0));
        assert_eq!(result.ast.children[1].tag, NodeTag::DimLiteral(3));
    }

    #[test]
    fn onf_lifts_surviving_reduce_into_accumulator_loop() {
        let mut table = SymbolTable::new();
        table.insert("A", array_symbol(vec![4, 2]));
        let tree = Node::new(NodeTag::Reduce(Op::Plus), None, vec![], vec![Node::array("A")]);
        let context = calculate_shapes(create_context(tree, table)).unwrap();

        let result = reduce_onf(context, true, false).unwrap();
        // Outer loop over the single surviving output axis (shape (2,)).
        assert_eq!(result.ast.tag, NodeTag::Loop);
        let body = &result.ast.children[2];
        assert_eq!(body.tag, NodeTag::Block);
        let has_initialise = body.children.iter().any(|s| matches!(s.tag, NodeTag::Initialise(_)));
        let has_inner_loop = body.children.iter().any(|s| s.tag == NodeTag::Loop);
        assert!(has_initialise && has_inner_loop);
    }

    #[test]
    fn onf_does_not_mutate_its_input() {
        let mut table = SymbolTable::new();
        table.insert("A", array_symbol(vec![2]));
        let tree = Node::array("A");
        let context = calculate_shapes(create_context(tree, table)).unwrap();
        let snapshot = context.clone();

        let _ = reduce_onf(context.clone(), true, false).unwrap();
        assert_eq!(context, snapshot);
    }
}
