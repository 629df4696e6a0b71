//! Stable type references.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A stable reference to a type: its namespace-qualified name plus the
/// assembly (module) it originates from.
///
/// Ordering is ordinal on `name`, then on `assembly`. Every deterministic
/// tie-break in the planner relies on this ordering, so it must stay derived
/// from the field order below.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRef {
    /// Namespace-qualified type name, e.g. `Shop.Orders.OrderService`.
    pub name: String,
    /// Assembly or module of origin.
    pub assembly: String,
}

impl TypeRef {
    /// Creates a new type reference.
    pub fn new(name: impl Into<String>, assembly: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assembly: assembly.into(),
        }
    }

    /// Returns the unqualified type name (the segment after the last `.`).
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Renders the assembly-qualified form `Name, Assembly`.
    pub fn qualified(&self) -> String {
        format!("{}, {}", self.name, self.assembly)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        let ty = TypeRef::new("Shop.Orders.OrderService", "Shop");
        assert_eq!(ty.short_name(), "OrderService");
        assert_eq!(TypeRef::new("Plain", "A").short_name(), "Plain");
    }

    #[test]
    fn test_ordering_is_ordinal() {
        let mut types = vec![
            TypeRef::new("b", "X"),
            TypeRef::new("B", "X"),
            TypeRef::new("a", "X"),
            TypeRef::new("A", "Y"),
            TypeRef::new("A", "X"),
        ];
        types.sort();
        let names: Vec<String> = types.iter().map(TypeRef::qualified).collect();
        assert_eq!(names, vec!["A, X", "A, Y", "B, X", "a, X", "b, X"]);
    }
}
