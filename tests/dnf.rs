//! End-to-end DNF scenarios through the public API. Rule-by-rule coverage
//! lives in `src/dnf/mod.rs`'s unit tests; these check the pass as a whole,
//! including its normality postcondition.

use moa_compiler::ast::{create_context, Dim, ElementwiseOp, Node, NodeTag, SymbolKind, SymbolNode, SymbolTable};
use moa_compiler::dnf::reduce_dnf;
use moa_compiler::rewrite::make_index_vector;
use moa_compiler::shape::calculate_shapes;
use moa_compiler::CompileError;

fn array_symbol(shape: Vec<i64>) -> SymbolNode {
    SymbolNode::new(SymbolKind::Array, Some(shape.into_iter().map(Dim::Concrete).collect()), None, None)
}

#[test]
fn psi_of_elementwise_distributes_to_psi_of_each_operand() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![5]));
    table.insert("B", array_symbol(vec![5]));
    table.insert("i0", SymbolNode::array(Some(vec![])));
    let idx = make_index_vector(vec![Node::array("i0")]);
    let plus = Node::new(NodeTag::Elementwise(ElementwiseOp::Plus), None, vec![], vec![Node::array("A"), Node::array("B")]);
    let tree = Node::new(NodeTag::Psi, None, vec![], vec![idx, plus]);
    let context = calculate_shapes(create_context(tree, table)).unwrap();

    let reduced = reduce_dnf(context, true).unwrap();
    assert_eq!(reduced.ast.tag, NodeTag::Elementwise(ElementwiseOp::Plus));
    assert_eq!(reduced.ast.children[0].tag, NodeTag::Psi);
    assert_eq!(reduced.ast.children[1].tag, NodeTag::Psi);
}

#[test]
fn psi_of_dot_splits_the_index_at_the_left_rank() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![3]));
    table.insert("B", array_symbol(vec![4]));
    table.insert("i0", SymbolNode::array(Some(vec![])));
    table.insert("i1", SymbolNode::array(Some(vec![])));
    let idx = make_index_vector(vec![Node::array("i0"), Node::array("i1")]);
    let dot = Node::new(NodeTag::Dot(ElementwiseOp::Times), None, vec![], vec![Node::array("A"), Node::array("B")]);
    let tree = Node::new(NodeTag::Psi, None, vec![], vec![idx, dot]);
    let context = calculate_shapes(create_context(tree, table)).unwrap();

    let reduced = reduce_dnf(context, true).unwrap();
    assert_eq!(reduced.ast.tag, NodeTag::Elementwise(ElementwiseOp::Times));
    assert_eq!(reduced.ast.children[0].tag, NodeTag::Psi);
    assert_eq!(reduced.ast.children[1].tag, NodeTag::Psi);
}

#[test]
fn take_out_of_static_bounds_is_rejected_with_conditions_on() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![3]));
    table.insert("n", SymbolNode::new(SymbolKind::Array, Some(vec![]), Some(vec![5]), None));
    table.insert("i0", SymbolNode::array(Some(vec![])));
    let idx = make_index_vector(vec![Node::array("i0")]);
    let take = Node::new(NodeTag::Take, None, vec![], vec![Node::array("n"), Node::array("A")]);
    let tree = Node::new(NodeTag::Psi, None, vec![], vec![idx, take]);
    let context = calculate_shapes(create_context(tree, table)).unwrap();

    let err = reduce_dnf(context, true).unwrap_err();
    assert!(matches!(err, CompileError::OutOfBounds { .. }));
}

#[test]
fn take_out_of_static_bounds_is_unchecked_with_conditions_off() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![3]));
    table.insert("n", SymbolNode::new(SymbolKind::Array, Some(vec![]), Some(vec![5]), None));
    table.insert("i0", SymbolNode::array(Some(vec![])));
    let idx = make_index_vector(vec![Node::array("i0")]);
    let take = Node::new(NodeTag::Take, None, vec![], vec![Node::array("n"), Node::array("A")]);
    let tree = Node::new(NodeTag::Psi, None, vec![], vec![idx, take]);
    let context = calculate_shapes(create_context(tree, table)).unwrap();

    let reduced = reduce_dnf(context, false).unwrap();
    assert_eq!(reduced.ast.tag, NodeTag::Psi);
    assert_eq!(reduced.ast.children[1].tag, NodeTag::Array);
}

#[test]
fn take_with_conditions_on_guards_the_read_with_a_runtime_bound_check() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![5]));
    table.insert("n", SymbolNode::array(Some(vec![])));
    table.insert("i0", SymbolNode::array(Some(vec![])));
    let idx = make_index_vector(vec![Node::array("i0")]);
    let take = Node::new(NodeTag::Take, None, vec![], vec![Node::array("n"), Node::array("A")]);
    let tree = Node::new(NodeTag::Psi, None, vec![], vec![idx, take]);
    let context = calculate_shapes(create_context(tree, table)).unwrap();

    let reduced = reduce_dnf(context, true).unwrap();
    assert_eq!(reduced.ast.tag, NodeTag::Condition);
    assert_eq!(reduced.ast.children[0].tag, NodeTag::LessThan);
    assert_eq!(reduced.ast.children[1].tag, NodeTag::Psi);
    assert_eq!(reduced.ast.children[2].tag, NodeTag::Error);
}
