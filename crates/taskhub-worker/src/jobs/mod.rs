//! Built-in task handler implementations.
//!
//! These handlers simulate marketplace work: they validate their typed
//! payload, wait for a configurable latency and return a JSON summary.
//! The bundled binaries use them; embedding hosts register their own
//! integrations instead.

pub mod catalog;
pub mod insights;

use std::sync::Arc;
use std::time::Duration;

use taskhub_entity::task::{Task, TaskKind};

use crate::executor::{HandlerError, HandlerRegistry};

pub use catalog::{PriceOptimizationHandler, ProductSyncHandler};
pub use insights::{AdvertisingHandler, AnalyticsHandler, OrdersHandler, ReviewsHandler};

/// A registry with one built-in handler per task kind, each simulating
/// `latency` of work.
pub fn builtin_registry(latency: Duration) -> HandlerRegistry {
    HandlerRegistry::new()
        .with(Arc::new(ProductSyncHandler::new(latency)))
        .with(Arc::new(PriceOptimizationHandler::new(latency)))
        .with(Arc::new(AnalyticsHandler::new(latency)))
        .with(Arc::new(AdvertisingHandler::new(latency)))
        .with(Arc::new(ReviewsHandler::new(latency)))
        .with(Arc::new(OrdersHandler::new(latency)))
}

/// Reject a task routed to the wrong handler.
fn mismatched(task: &Task, expected: TaskKind) -> HandlerError {
    HandlerError::InvalidPayload(format!(
        "expected a '{}' payload, got '{}'",
        expected,
        task.payload.kind()
    ))
}

/// Sleep for the simulated latency, if any.
async fn simulate(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
