//! Type identity for cargo entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a runtime type, used as the cargo container key
///
/// Computed once when an item is loaded. Assignability between keys is
/// answered by a [`TypeHierarchy`](crate::TypeHierarchy), never re-derived
/// from the key text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(String);

impl TypeKey {
    /// Key for a Rust type, e.g. `alloc::string::String`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    /// Key with an explicit name
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without module path, keeping generic arguments as written
    ///
    /// `alloc::vec::Vec<i64>` becomes `Vec<i64>`. Only plain paths are
    /// shortened; tuples, arrays, slices, references and `dyn` types come
    /// back unchanged.
    pub fn short_name(&self) -> &str {
        let head_end = self.0.find('<').unwrap_or(self.0.len());
        let head = &self.0[..head_end];
        if !head.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':') {
            return &self.0;
        }
        match head.rfind("::") {
            Some(idx) => &self.0[idx + 2..],
            None => &self.0,
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}
