use indexmap::IndexMap;

use super::dim::Shape;

/// Only `ARRAY` exists in the current algebra, but the field is kept
/// distinct from a bare unit so a second symbol kind doesn't require
/// reshaping every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Array,
}

/// An entry in the symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolNode {
    pub kind: SymbolKind,
    pub shape: Option<Shape>,
    /// Concrete payload, for literal arrays. `None` for symbols with no
    /// known value (ordinary named arrays).
    pub value: Option<Vec<i64>>,
    /// Auxiliary data, e.g. the permutation vector of a `TRANSPOSEV`.
    pub attrib: Option<Vec<i64>>,
}

impl SymbolNode {
    pub fn new(kind: SymbolKind, shape: Option<Shape>, value: Option<Vec<i64>>, attrib: Option<Vec<i64>>) -> Self {
        SymbolNode { kind, shape, value, attrib }
    }

    /// An ordinary array symbol with a (possibly symbolic, possibly
    /// unknown) shape and no literal payload.
    pub fn array(shape: Option<Shape>) -> Self {
        SymbolNode::new(SymbolKind::Array, shape, None, None)
    }

    /// A scalar with a known literal value. Loop induction variables and
    /// other run-time-only scalars use `array(Some(vec![]))` instead, since
    /// they have no known value until run time.
    pub fn literal_scalar(value: i64) -> Self {
        SymbolNode::new(SymbolKind::Array, Some(vec![]), Some(vec![value]), None)
    }
}

/// Bundles a symbol's kind, shape, literal value, and auxiliary data into
/// one `SymbolNode`.
pub fn make_symbol(kind: SymbolKind, shape: Option<Shape>, value: Option<Vec<i64>>, attrib: Option<Vec<i64>>) -> SymbolNode {
    SymbolNode::new(kind, shape, value, attrib)
}

/// An insertion-ordered mapping from name to [`SymbolNode`], so iteration
/// order is deterministic and reproducible across runs. Passes only ever
/// append; no rewrite mutates an existing entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable(IndexMap<String, SymbolNode>);

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable(IndexMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&SymbolNode> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: SymbolNode) {
        self.0.insert(name.into(), symbol);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SymbolNode)> {
        self.0.iter()
    }
}

impl FromIterator<(String, SymbolNode)> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = (String, SymbolNode)>>(iter: T) -> Self {
        SymbolTable(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_iteration_order() {
        let mut table = SymbolTable::new();
        table.insert("B", SymbolNode::array(None));
        table.insert("A", SymbolNode::array(None));
        let names: Vec<&str> = table.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn equality_ignores_order() {
        let mut a = SymbolTable::new();
        a.insert("A", SymbolNode::array(None));
        a.insert("B", SymbolNode::array(None));

        let mut b = SymbolTable::new();
        b.insert("B", SymbolNode::array(None));
        b.insert("A", SymbolNode::array(None));

        assert_eq!(a, b);
    }
}
