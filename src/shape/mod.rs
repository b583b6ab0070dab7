//! Shape inference: attaches a result [`crate::ast::Shape`] to
//! every node of a [`Context`] whose nodes start out with `shape = None`.
//! A single post-order pass suffices — by the time a node is visited every
//! child already carries its shape, and the per-operator rules below never
//! need to look further than their immediate children plus the symbol
//! table.

use tracing::{instrument, trace};

use crate::ast::{dim_add, dim_sub, shape_product, Context, Dim, Node, NodeTag, Shape, SymbolTable};
use crate::error::{CompileError, Result};
use crate::rewrite::{node_to_dim, permute_shape, visit};

#[instrument(skip_all)]
pub fn calculate_shapes(context: Context) -> Result<Context> {
    let ast = context.ast.clone();
    let (ctx, new_ast) = visit(context, ast, &mut |ctx, node| {
        let shape = infer_shape(&node, &ctx.symbol_table)?;
        trace!(tag = ?node.tag, ?shape, "inferred shape");
        Ok((ctx, Node { shape: Some(shape), ..node }))
    })?;
    Ok(Context::new(new_ast, ctx.symbol_table))
}

fn rank(shape: &Shape) -> usize {
    shape.len()
}

fn is_scalar(shape: &Shape) -> bool {
    shape.is_empty()
}

fn elementwise_shape(node: &Node, lhs: &Shape, rhs: &Shape) -> Result<Shape> {
    if is_scalar(lhs) {
        return Ok(rhs.clone());
    }
    if is_scalar(rhs) {
        return Ok(lhs.clone());
    }
    if lhs != rhs {
        return Err(CompileError::ShapeMismatch {
            node: Box::new(node.clone()),
            lhs_shape: vec![format!("{lhs:?}")],
            rhs_shape: vec![format!("{rhs:?}")],
            symbols: vec![],
        });
    }
    Ok(lhs.clone())
}

fn require_shape<'a>(node: &'a Node, reason: &str) -> Result<&'a Shape> {
    node.shape.as_ref().ok_or_else(|| CompileError::MalformedNode {
        node: Box::new(node.clone()),
        reason: reason.to_string(),
    })
}

fn infer_shape(node: &Node, symbol_table: &SymbolTable) -> Result<Shape> {
    match &node.tag {
        NodeTag::Array => {
            let name = node.symbol_name().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(node.clone()),
                reason: "ARRAY node has no symbol reference".to_string(),
            })?;
            let symbol = symbol_table
                .get(name)
                .ok_or_else(|| CompileError::UnknownSymbol { name: name.to_string(), node: Box::new(node.clone()) })?;
            symbol.shape.clone().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(node.clone()),
                reason: format!("symbol '{name}' has no known shape"),
            })
        }

        NodeTag::Transpose => {
            let a = &node.children[0];
            let mut shape = require_shape(a, "TRANSPOSE operand has no shape")?.clone();
            shape.reverse();
            Ok(shape)
        }

        NodeTag::TransposeV => {
            let perm_node = &node.children[0];
            let a = &node.children[1];
            let perm_name = perm_node.symbol_name().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(node.clone()),
                reason: "TRANSPOSEV permutation operand has no symbol reference".to_string(),
            })?;
            let perm_symbol = symbol_table
                .get(perm_name)
                .ok_or_else(|| CompileError::UnknownSymbol { name: perm_name.to_string(), node: Box::new(node.clone()) })?;
            // The permutation vector lives in `attrib`, not `value`.
            let perm = perm_symbol.attrib.as_ref().ok_or_else(|| CompileError::MalformedNode {
                node: Box::new(node.clone()),
                reason: format!("symbol '{perm_name}' has no permutation vector"),
            })?;
            let a_shape = require_shape(a, "TRANSPOSEV operand has no shape")?;
            permute_shape(a_shape, perm)
        }

        NodeTag::Shape => {
            let a = &node.children[0];
            let a_shape = require_shape(a, "SHAPE operand has no shape")?;
            Ok(vec![Dim::concrete(rank(a_shape) as i64)])
        }

        NodeTag::Rank | NodeTag::Tau => Ok(vec![]),

        NodeTag::Rav => {
            let a = &node.children[0];
            let a_shape = require_shape(a, "RAV operand has no shape")?;
            Ok(vec![shape_product(a_shape)])
        }

        NodeTag::Iota => {
            let n = &node.children[0];
            Ok(vec![node_to_dim(n, symbol_table)])
        }

        NodeTag::Elementwise(_) => {
            let lhs = require_shape(&node.children[0], "binary operand has no shape")?;
            let rhs = require_shape(&node.children[1], "binary operand has no shape")?;
            elementwise_shape(node, lhs, rhs)
        }

        NodeTag::Psi => {
            let idx = &node.children[0];
            let a = &node.children[1];
            let idx_shape = require_shape(idx, "PSI index operand has no shape")?;
            let a_shape = require_shape(a, "PSI array operand has no shape")?;
            // `idx` is a K-component index vector. An `IndexVector` node or
            // an `ARRAY` with a declared rank-1 shape carries K explicitly;
            // any other node (in particular a scalar `ARRAY`, the form a
            // single collapsed index component takes — see
            // `make_index_vector`) denotes one index component, i.e. K = 1.
            let len = if rank(idx_shape) == 1 {
                idx_shape[0].as_concrete().ok_or_else(|| CompileError::RankMismatch {
                    node: Box::new(node.clone()),
                    reason: "PSI index length must be statically known".to_string(),
                    symbols: vec![],
                })? as usize
            } else if is_scalar(idx_shape) {
                1
            } else {
                return Err(CompileError::RankMismatch {
                    node: Box::new(node.clone()),
                    reason: "PSI index operand must be a rank-1 vector or a scalar single component".to_string(),
                    symbols: vec![],
                });
            };
            if len > rank(a_shape) {
                return Err(CompileError::RankMismatch {
                    node: Box::new(node.clone()),
                    reason: format!("index length {len} exceeds array rank {}", rank(a_shape)),
                    symbols: vec![],
                });
            }
            Ok(a_shape[len..].to_vec())
        }

        NodeTag::Take => {
            let n = &node.children[0];
            let a = &node.children[1];
            let a_shape = require_shape(a, "TAKE array operand has no shape")?;
            if a_shape.is_empty() {
                return Err(CompileError::RankMismatch {
                    node: Box::new(node.clone()),
                    reason: "TAKE requires a rank >= 1 array".to_string(),
                    symbols: vec![],
                });
            }
            let mut shape = vec![node_to_dim(n, symbol_table)];
            shape.extend_from_slice(&a_shape[1..]);
            Ok(shape)
        }

        NodeTag::Drop => {
            let n = &node.children[0];
            let a = &node.children[1];
            let a_shape = require_shape(a, "DROP array operand has no shape")?;
            if a_shape.is_empty() {
                return Err(CompileError::RankMismatch {
                    node: Box::new(node.clone()),
                    reason: "DROP requires a rank >= 1 array".to_string(),
                    symbols: vec![],
                });
            }
            let n_dim = node_to_dim(n, symbol_table);
            let mut shape = vec![dim_sub(&a_shape[0], &n_dim)];
            shape.extend_from_slice(&a_shape[1..]);
            Ok(shape)
        }

        NodeTag::Cat => {
            let lhs = require_shape(&node.children[0], "CAT operand has no shape")?;
            let rhs = require_shape(&node.children[1], "CAT operand has no shape")?;
            if lhs.is_empty() || rhs.is_empty() {
                return Err(CompileError::RankMismatch {
                    node: Box::new(node.clone()),
                    reason: "CAT requires rank >= 1 arrays".to_string(),
                    symbols: vec![],
                });
            }
            if lhs[1..] != rhs[1..] {
                return Err(CompileError::ShapeMismatch {
                    node: Box::new(node.clone()),
                    lhs_shape: vec![format!("{lhs:?}")],
                    rhs_shape: vec![format!("{rhs:?}")],
                    symbols: vec![],
                });
            }
            let mut shape = vec![dim_add(&lhs[0], &rhs[0])];
            shape.extend_from_slice(&lhs[1..]);
            Ok(shape)
        }

        // Before a DNF reduce rule fires: `attrib` is empty and the child is
        // the plain array being reduced over its leading axis. After: the
        // rule has rewritten the child into a scalar expression that reads
        // the synthesized placeholder (`attrib = [placeholder_name]`), and
        // reducing it contributes that same scalar shape (see
        // [`crate::ast::NodeTag::Reduce`]).
        NodeTag::Reduce(_) if node.attrib.is_empty() => {
            let a_shape = require_shape(&node.children[0], "REDUCE operand has no shape")?;
            if a_shape.is_empty() {
                return Err(CompileError::RankMismatch {
                    node: Box::new(node.clone()),
                    reason: "REDUCE requires a rank >= 1 array".to_string(),
                    symbols: vec![],
                });
            }
            Ok(a_shape[1..].to_vec())
        }
        NodeTag::Reduce(_) => require_shape(&node.children[0], "REDUCE body has no shape").cloned(),

        NodeTag::Dot(_) => {
            let lhs = require_shape(&node.children[0], "DOT operand has no shape")?;
            let rhs = require_shape(&node.children[1], "DOT operand has no shape")?;
            let mut shape = lhs.clone();
            shape.extend(rhs.clone());
            Ok(shape)
        }

        NodeTag::Assign => {
            let dst = require_shape(&node.children[0], "ASSIGN destination has no shape")?;
            let src = require_shape(&node.children[1], "ASSIGN source has no shape")?;
            if dst != src {
                return Err(CompileError::ShapeMismatch {
                    node: Box::new(node.clone()),
                    lhs_shape: vec![format!("{dst:?}")],
                    rhs_shape: vec![format!("{src:?}")],
                    symbols: vec![],
                });
            }
            Ok(dst.clone())
        }

        // The remaining tags are only ever produced by DNF/ONF; shape
        // inference is never run on fresh output containing them, but
        // these arms keep the pass total (and idempotent if it's ever
        // re-run on already-lowered trees).
        NodeTag::DimLiteral(_) | NodeTag::LessThan | NodeTag::Initialise(_) => Ok(vec![]),
        NodeTag::IndexVector => Ok(vec![Dim::concrete(node.children.len() as i64)]),
        NodeTag::Condition => {
            let then_shape = require_shape(&node.children[1], "CONDITION branch has no shape")?;
            Ok(then_shape.clone())
        }
        NodeTag::Loop | NodeTag::Function | NodeTag::Error => Ok(vec![]),
        NodeTag::Block => Ok(node.children.last().and_then(|s| s.shape.clone()).unwrap_or_default()),
    }
}
