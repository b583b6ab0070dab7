//! End-to-end shape-inference scenarios. The unit tests under
//! `src/shape/mod.rs` cover the same ground rule by rule; these exercise
//! `calculate_shapes` only through the public API.

use moa_compiler::ast::{create_context, Dim, ElementwiseOp, Node, NodeTag, SymbolKind, SymbolNode, SymbolTable};
use moa_compiler::shape::calculate_shapes;
use moa_compiler::CompileError;

fn array_symbol(shape: Vec<i64>) -> SymbolNode {
    SymbolNode::new(SymbolKind::Array, Some(shape.into_iter().map(Dim::Concrete).collect()), None, None)
}

#[test]
fn shape_of_array_is_its_rank() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![3, 2, 1]));
    let tree = Node::new(NodeTag::Shape, None, vec![], vec![Node::array("A")]);

    let result = calculate_shapes(create_context(tree, table)).unwrap();
    assert_eq!(result.ast.shape, Some(vec![Dim::Concrete(3)]));
}

#[test]
fn psi_drops_the_leading_indexed_axes() {
    let mut table = SymbolTable::new();
    table.insert("idx", array_symbol(vec![2]));
    table.insert("A", array_symbol(vec![4, 5, 6]));
    let tree = Node::new(NodeTag::Psi, None, vec![], vec![Node::array("idx"), Node::array("A")]);

    let result = calculate_shapes(create_context(tree, table)).unwrap();
    assert_eq!(result.ast.shape, Some(vec![Dim::Concrete(6)]));
}

#[test]
fn reduce_drops_the_leading_axis() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![1, 2, 3]));
    let tree = Node::new(NodeTag::Reduce(ElementwiseOp::Plus), None, vec![], vec![Node::array("A")]);

    let result = calculate_shapes(create_context(tree, table)).unwrap();
    assert_eq!(result.ast.shape, Some(vec![Dim::Concrete(2), Dim::Concrete(3)]));
}

#[test]
fn elementwise_mismatch_raises_shape_mismatch() {
    let mut table = SymbolTable::new();
    table.insert("A", array_symbol(vec![3, 4, 5]));
    table.insert("B", array_symbol(vec![2, 4, 5]));
    let tree = Node::new(NodeTag::Elementwise(ElementwiseOp::Plus), None, vec![], vec![Node::array("A"), Node::array("B")]);

    let err = calculate_shapes(create_context(tree, table)).unwrap_err();
    assert!(matches!(err, CompileError::ShapeMismatch { .. }));
}

#[test]
fn unknown_symbol_is_reported_with_its_name() {
    let table = SymbolTable::new();
    let tree = Node::new(NodeTag::Shape, None, vec![], vec![Node::array("missing")]);

    let err = calculate_shapes(create_context(tree, table)).unwrap_err();
    assert!(matches!(err, CompileError::UnknownSymbol { name, .. } if name == "missing"));
}
