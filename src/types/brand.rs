//! Product brands handled by the warranty desk

use serde::{Deserialize, Serialize};

/// Product brand of a warranty claim.
///
/// Each brand maps to its own partition in the record store; the set is
/// fixed by the supplier agreements the desk operates under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Brand {
    Conway,
    Cycplus,
    Dare,
    Kogel,
}

impl Brand {
    /// All known brands, in partition order.
    pub const ALL: [Brand; 4] = [Brand::Conway, Brand::Cycplus, Brand::Dare, Brand::Kogel];

    /// Partition name in the record store.
    pub fn partition_name(&self) -> &'static str {
        match self {
            Brand::Conway => "Conway",
            Brand::Cycplus => "Cycplus",
            Brand::Dare => "Dare",
            Brand::Kogel => "Kogel",
        }
    }

    /// Parse from form input (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "conway" => Some(Brand::Conway),
            "cycplus" => Some(Brand::Cycplus),
            "dare" => Some(Brand::Dare),
            "kogel" => Some(Brand::Kogel),
            _ => None,
        }
    }
}

impl std::fmt::Display for Brand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.partition_name())
    }
}
