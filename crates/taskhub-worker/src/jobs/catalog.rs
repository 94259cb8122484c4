//! Product catalog handlers: marketplace sync and repricing.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing;

use taskhub_entity::task::{Task, TaskKind, TaskPayload};

use super::{mismatched, simulate};
use crate::executor::{HandlerError, TaskHandler};

/// Margin used when the payload does not set one
const DEFAULT_MIN_MARGIN_PCT: f64 = 15.0;

/// Pulls product listings from connected marketplaces
#[derive(Debug)]
pub struct ProductSyncHandler {
    /// Simulated marketplace round-trip
    latency: Duration,
}

impl ProductSyncHandler {
    /// Create a new product sync handler
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TaskHandler for ProductSyncHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::ProductSync
    }

    async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
        let TaskPayload::ProductSync(payload) = &task.payload else {
            return Err(mismatched(task, TaskKind::ProductSync));
        };

        let marketplaces: Vec<&str> = if payload.marketplaces.is_empty() {
            vec!["all"]
        } else {
            payload.marketplaces.iter().map(String::as_str).collect()
        };
        let mode = if payload.full { "full" } else { "incremental" };

        tracing::info!(
            "Syncing products: marketplaces={:?}, products={}, mode={}",
            marketplaces,
            payload.product_ids.len(),
            mode
        );
        simulate(self.latency).await;

        Ok(json!({
            "task": "product_sync",
            "mode": mode,
            "marketplaces": marketplaces,
            "products_synced": payload.product_ids.len(),
        }))
    }
}

/// Recomputes prices subject to a minimum margin
#[derive(Debug)]
pub struct PriceOptimizationHandler {
    /// Simulated pricing model latency
    latency: Duration,
}

impl PriceOptimizationHandler {
    /// Create a new price optimization handler
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TaskHandler for PriceOptimizationHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::PriceOptimization
    }

    async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
        let TaskPayload::PriceOptimization(payload) = &task.payload else {
            return Err(mismatched(task, TaskKind::PriceOptimization));
        };

        let min_margin = payload.min_margin_pct.unwrap_or(DEFAULT_MIN_MARGIN_PCT);
        if !(0.0..100.0).contains(&min_margin) {
            return Err(HandlerError::InvalidPayload(format!(
                "min_margin_pct must be in [0, 100), got {}",
                min_margin
            )));
        }

        tracing::info!(
            "Optimizing prices: products={}, min_margin={}%",
            payload.product_ids.len(),
            min_margin
        );
        simulate(self.latency).await;

        Ok(json!({
            "task": "price_optimization",
            "products_repriced": payload.product_ids.len(),
            "min_margin_pct": min_margin,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_entity::task::TaskPriority;

    fn task(kind: &str, payload: Value) -> Task {
        let kind: TaskKind = kind.parse().unwrap();
        Task::new(TaskPriority::Medium, TaskPayload::decode(kind, payload).unwrap())
    }

    #[tokio::test]
    async fn test_product_sync_summary() {
        let handler = ProductSyncHandler::new(Duration::ZERO);
        let result = handler
            .execute(&task(
                "product_sync",
                json!({ "marketplaces": ["amazon"], "product_ids": ["a", "b"], "full": true }),
            ))
            .await
            .unwrap();

        assert_eq!(result["mode"], "full");
        assert_eq!(result["products_synced"], 2);
        assert_eq!(result["marketplaces"], json!(["amazon"]));
    }

    #[tokio::test]
    async fn test_price_optimization_rejects_bad_margin() {
        let handler = PriceOptimizationHandler::new(Duration::ZERO);
        let err = handler
            .execute(&task("price_optimization", json!({ "min_margin_pct": 140.0 })))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_wrong_payload_is_rejected() {
        let handler = ProductSyncHandler::new(Duration::ZERO);
        let err = handler
            .execute(&task("orders", json!({})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("product_sync"));
    }
}
