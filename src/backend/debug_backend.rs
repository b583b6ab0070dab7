use crate::ast::{Context, Node, NodeTag};
use crate::error::Result;

use super::Backend;

/// Pretty-prints an ONF tree as indented pseudocode. Stands in for a real
/// target-language emitter — just enough structure (`for`/`let`/`if`) to
/// read an ONF tree's shape back off a `compile()` call without a target
/// language of its own.
pub struct DebugBackend;

impl Backend for DebugBackend {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn generate(&self, context: &Context) -> Result<String> {
        let mut out = String::new();
        render(&context.ast, 0, &mut out);
        Ok(out)
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn render(node: &Node, depth: usize, out: &mut String) {
    match &node.tag {
        NodeTag::Loop => {
            let var = node.attrib.first().map(String::as_str).unwrap_or("_");
            indent(depth, out);
            out.push_str(&format!("for {var} in "));
            out.push_str(&render_expr(&node.children[0]));
            out.push_str("..");
            out.push_str(&render_expr(&node.children[1]));
            out.push_str(" {\n");
            render(&node.children[2], depth + 1, out);
            indent(depth, out);
            out.push_str("}\n");
        }

        NodeTag::Block => {
            for stmt in &node.children {
                render(stmt, depth, out);
            }
        }

        NodeTag::Initialise(op) => {
            let name = node.attrib.first().map(String::as_str).unwrap_or("_");
            indent(depth, out);
            out.push_str(&format!("let mut {name} = identity({op});\n"));
        }

        NodeTag::Assign => {
            indent(depth, out);
            out.push_str(&render_expr(&node.children[0]));
            out.push_str(" = ");
            out.push_str(&render_expr(&node.children[1]));
            out.push_str(";\n");
        }

        NodeTag::Condition => {
            indent(depth, out);
            out.push_str("if ");
            out.push_str(&render_expr(&node.children[0]));
            out.push_str(" {\n");
            render(&node.children[1], depth + 1, out);
            indent(depth, out);
            out.push_str("} else {\n");
            render(&node.children[2], depth + 1, out);
            indent(depth, out);
            out.push_str("}\n");
        }

        // A bare expression reachable as a statement (e.g. the root of a
        // tree DNF normalised but ONF never wrapped) renders as itself.
        _ => {
            indent(depth, out);
            out.push_str(&render_expr(node));
            out.push('\n');
        }
    }
}

fn render_expr(node: &Node) -> String {
    match &node.tag {
        NodeTag::Array => node.symbol_name().unwrap_or("?").to_string(),
        NodeTag::DimLiteral(v) => v.to_string(),
        NodeTag::IndexVector => {
            let parts: Vec<String> = node.children.iter().map(render_expr).collect();
            format!("[{}]", parts.join(", "))
        }
        NodeTag::Psi => format!("{}[{}]", render_expr(&node.children[1]), render_expr(&node.children[0])),
        NodeTag::Elementwise(op) => format!("({} {} {})", render_expr(&node.children[0]), op_symbol(*op), render_expr(&node.children[1])),
        NodeTag::Dot(op) => format!("dot_{op}({}, {})", render_expr(&node.children[0]), render_expr(&node.children[1])),
        NodeTag::Reduce(op) => format!("reduce_{op}({})", render_expr(&node.children[0])),
        NodeTag::Transpose => format!("transpose({})", render_expr(&node.children[0])),
        NodeTag::TransposeV => format!("transpose({}, {})", render_expr(&node.children[0]), render_expr(&node.children[1])),
        NodeTag::Shape => format!("shape({})", render_expr(&node.children[0])),
        NodeTag::Rank => format!("rank({})", render_expr(&node.children[0])),
        NodeTag::Tau => format!("tau({})", render_expr(&node.children[0])),
        NodeTag::Rav => format!("rav({})", render_expr(&node.children[0])),
        NodeTag::Iota => format!("iota({})", render_expr(&node.children[0])),
        NodeTag::Take => format!("take({}, {})", render_expr(&node.children[0]), render_expr(&node.children[1])),
        NodeTag::Drop => format!("drop({}, {})", render_expr(&node.children[0]), render_expr(&node.children[1])),
        NodeTag::Cat => format!("cat({}, {})", render_expr(&node.children[0]), render_expr(&node.children[1])),
        NodeTag::LessThan => format!("({} < {})", render_expr(&node.children[0]), render_expr(&node.children[1])),
        NodeTag::Function => format!("fn {}(...)", node.attrib.first().map(String::as_str).unwrap_or("?")),
        NodeTag::Error => "<error>".to_string(),
        other => format!("<{other:?}>"),
    }
}

fn op_symbol(op: crate::ast::ElementwiseOp) -> &'static str {
    use crate::ast::ElementwiseOp::*;
    match op {
        Plus => "+",
        Minus => "-",
        Times => "*",
        Divide => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{create_context, Dim, NodeTag as Tag, SymbolKind, SymbolNode, SymbolTable};
    use crate::onf::reduce_onf;
    use crate::shape::calculate_shapes;

    fn array_symbol(shape: Vec<i64>) -> SymbolNode {
        SymbolNode::new(SymbolKind::Array, Some(shape.into_iter().map(Dim::Concrete).collect()), None, None)
    }

    #[test]
    fn renders_a_loop_nest_around_an_assignment() {
        let mut table = SymbolTable::new();
        table.insert("A", array_symbol(vec![3]));
        table.insert("B", array_symbol(vec![3]));
        let tree = Node::new(Tag::Elementwise(crate::ast::ElementwiseOp::Plus), None, vec![], vec![Node::array("A"), Node::array("B")]);
        let context = calculate_shapes(create_context(tree, table)).unwrap();
        let onf = reduce_onf(context, true, false).unwrap();

        let rendered = DebugBackend.generate(&onf).unwrap();
        assert!(rendered.starts_with("for "));
        assert!(rendered.contains('='));
    }
}
