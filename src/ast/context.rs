use super::node::Node;
use super::symbol_table::{SymbolNode, SymbolTable};

/// The `(ast, symbol_table)` pair that flows between passes. Each pass
/// consumes one `Context` and produces a fresh one; the input is never
/// observably modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub ast: Node,
    pub symbol_table: SymbolTable,
}

impl Context {
    pub fn new(ast: Node, symbol_table: SymbolTable) -> Self {
        Context { ast, symbol_table }
    }
}

/// Bundles an AST and the symbol table it references into one `Context`.
pub fn create_context(ast: Node, symbol_table: SymbolTable) -> Context {
    Context::new(ast, symbol_table)
}

/// Scans the `<prefix><n>` sequence from `n = 1` for the first name absent
/// from the symbol table, then inserts `symbol` under that name in the
/// same step — a fresh name is introduced only by inserting its
/// symbol-table entry simultaneously, so two calls never race to the same
/// name.
pub fn generate_unique_name(mut context: Context, symbol: SymbolNode, prefix: &str) -> (String, Context) {
    let mut n: u64 = 1;
    let name = loop {
        let candidate = format!("{prefix}{n}");
        if !context.symbol_table.contains(&candidate) {
            break candidate;
        }
        n += 1;
    };
    context.symbol_table.insert(name.clone(), symbol);
    (name, context)
}

/// [`generate_unique_name`] with the default `_a` prefix.
pub fn generate_unique_name_default(context: Context, symbol: SymbolNode) -> (String, Context) {
    generate_unique_name(context, symbol, "_a")
}
