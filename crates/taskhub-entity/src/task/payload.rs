//! Typed task payload definitions.
//!
//! Each kind carries its own payload struct, so a handler never has to
//! fish fields out of untyped JSON. Every field has a default, which keeps
//! `{}` a valid payload for all kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;

use super::kind::TaskKind;

/// Typed payloads, one variant per [`TaskKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Catalogue sync with marketplaces.
    ProductSync(ProductSyncPayload),
    /// Price recomputation.
    PriceOptimization(PriceOptimizationPayload),
    /// Analytics aggregation.
    Analytics(AnalyticsPayload),
    /// Advertising adjustments.
    Advertising(AdvertisingPayload),
    /// Review ingestion.
    Reviews(ReviewsPayload),
    /// Order import.
    Orders(OrdersPayload),
}

impl TaskPayload {
    /// The kind this payload belongs to.
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::ProductSync(_) => TaskKind::ProductSync,
            Self::PriceOptimization(_) => TaskKind::PriceOptimization,
            Self::Analytics(_) => TaskKind::Analytics,
            Self::Advertising(_) => TaskKind::Advertising,
            Self::Reviews(_) => TaskKind::Reviews,
            Self::Orders(_) => TaskKind::Orders,
        }
    }

    /// The all-defaults payload for a kind.
    pub fn empty(kind: TaskKind) -> Self {
        match kind {
            TaskKind::ProductSync => Self::ProductSync(Default::default()),
            TaskKind::PriceOptimization => Self::PriceOptimization(Default::default()),
            TaskKind::Analytics => Self::Analytics(Default::default()),
            TaskKind::Advertising => Self::Advertising(Default::default()),
            TaskKind::Reviews => Self::Reviews(Default::default()),
            TaskKind::Orders => Self::Orders(Default::default()),
        }
    }

    /// Decode an untyped JSON payload for the given kind.
    ///
    /// `null` is treated as `{}`. Unknown fields are rejected so typos in
    /// caller-supplied payloads surface as validation errors.
    pub fn decode(kind: TaskKind, value: Value) -> AppResult<Self> {
        let value = if value.is_null() {
            Value::Object(Default::default())
        } else {
            value
        };

        let decoded = match kind {
            TaskKind::ProductSync => serde_json::from_value(value).map(Self::ProductSync),
            TaskKind::PriceOptimization => {
                serde_json::from_value(value).map(Self::PriceOptimization)
            }
            TaskKind::Analytics => serde_json::from_value(value).map(Self::Analytics),
            TaskKind::Advertising => serde_json::from_value(value).map(Self::Advertising),
            TaskKind::Reviews => serde_json::from_value(value).map(Self::Reviews),
            TaskKind::Orders => serde_json::from_value(value).map(Self::Orders),
        };

        decoded.map_err(|e| AppError::validation(format!("Invalid payload for kind '{kind}': {e}")))
    }
}

/// Payload for [`TaskKind::ProductSync`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductSyncPayload {
    /// Marketplaces to sync; empty means every connected marketplace.
    pub marketplaces: Vec<String>,
    /// Restrict the sync to these product ids; empty means all.
    pub product_ids: Vec<String>,
    /// Re-import everything instead of an incremental sync.
    pub full: bool,
}

/// Payload for [`TaskKind::PriceOptimization`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceOptimizationPayload {
    /// Products to reprice; empty means all.
    pub product_ids: Vec<String>,
    /// Lowest acceptable margin, in percent.
    pub min_margin_pct: Option<f64>,
}

/// Payload for [`TaskKind::Analytics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsPayload {
    /// Reporting window in days.
    pub period_days: Option<u32>,
    /// Metric names to compute; empty means the standard set.
    pub metrics: Vec<String>,
}

/// Payload for [`TaskKind::Advertising`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdvertisingPayload {
    /// Campaigns to review; empty means all active campaigns.
    pub campaign_ids: Vec<String>,
    /// Whether bids may be changed, or only reported on.
    pub adjust_bids: bool,
}

/// Payload for [`TaskKind::Reviews`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewsPayload {
    /// Marketplace to read from; `None` means all.
    pub marketplace: Option<String>,
    /// Only reviews newer than this many days.
    pub since_days: Option<u32>,
}

/// Payload for [`TaskKind::Orders`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrdersPayload {
    /// Marketplace to read from; `None` means all.
    pub marketplace: Option<String>,
    /// Order statuses to import; empty means all.
    pub statuses: Vec<String>,
}
