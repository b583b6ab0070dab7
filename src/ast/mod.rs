//! The AST & Context data model: a uniform tagged-tree representation plus
//! a symbol table. Pure data — no rewrite behaviour lives here; that's
//! [`crate::rewrite`] and the three passes built on top of it.

pub mod context;
pub mod dim;
pub mod node;
pub mod symbol_table;

pub use context::{create_context, generate_unique_name, generate_unique_name_default, Context};
pub use dim::{dim_add, dim_mul, dim_sub, dim_to_node, shape_product, Dim, Shape};
pub use node::{make_node, ElementwiseOp, Node, NodeTag};
pub use symbol_table::{make_symbol, SymbolKind, SymbolNode, SymbolTable};
