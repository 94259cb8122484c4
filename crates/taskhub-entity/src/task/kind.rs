//! The closed set of task kinds known to the host application.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use taskhub_core::error::AppError;

/// Which handler processes a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Pull listings from marketplaces and reconcile the local catalogue.
    ProductSync,
    /// Recompute prices against competitors and margin rules.
    PriceOptimization,
    /// Aggregate sales analytics.
    Analytics,
    /// Adjust advertising campaigns.
    Advertising,
    /// Fetch and triage customer reviews.
    Reviews,
    /// Import and reconcile marketplace orders.
    Orders,
}

impl TaskKind {
    /// Every known kind.
    pub const ALL: [TaskKind; 6] = [
        Self::ProductSync,
        Self::PriceOptimization,
        Self::Analytics,
        Self::Advertising,
        Self::Reviews,
        Self::Orders,
    ];

    /// Return the kind as its wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductSync => "product_sync",
            Self::PriceOptimization => "price_optimization",
            Self::Analytics => "analytics",
            Self::Advertising => "advertising",
            Self::Reviews => "reviews",
            Self::Orders => "orders",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown task kind '{s}' (expected one of: {})",
                    Self::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_core::error::ErrorKind;

    #[test]
    fn test_parse_every_kind() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_validation_error() {
        let err = "inventory".parse::<TaskKind>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("inventory"));
    }

    #[test]
    fn test_serde_uses_snake_case_tag() {
        let json = serde_json::to_string(&TaskKind::PriceOptimization).unwrap();
        assert_eq!(json, "\"price_optimization\"");
    }
}
