//! Reporting handlers: analytics, advertising, reviews and orders.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing;

use taskhub_entity::task::{Task, TaskKind, TaskPayload};

use super::{mismatched, simulate};
use crate::executor::{HandlerError, TaskHandler};

const DEFAULT_PERIOD_DAYS: u32 = 30;
const MAX_PERIOD_DAYS: u32 = 365;
const STANDARD_METRICS: [&str; 3] = ["revenue", "orders", "conversion_rate"];

/// Builds sales analytics reports
#[derive(Debug)]
pub struct AnalyticsHandler {
    /// Simulated report build time
    latency: Duration,
}

impl AnalyticsHandler {
    /// Create a new analytics handler
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TaskHandler for AnalyticsHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Analytics
    }

    async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
        let TaskPayload::Analytics(payload) = &task.payload else {
            return Err(mismatched(task, TaskKind::Analytics));
        };

        let period_days = payload.period_days.unwrap_or(DEFAULT_PERIOD_DAYS);
        if period_days == 0 || period_days > MAX_PERIOD_DAYS {
            return Err(HandlerError::InvalidPayload(format!(
                "period_days must be between 1 and {}, got {}",
                MAX_PERIOD_DAYS, period_days
            )));
        }

        let metrics: Vec<&str> = if payload.metrics.is_empty() {
            STANDARD_METRICS.to_vec()
        } else {
            payload.metrics.iter().map(String::as_str).collect()
        };

        tracing::info!(
            "Building analytics report: period={}d, metrics={:?}",
            period_days,
            metrics
        );
        simulate(self.latency).await;

        Ok(json!({
            "task": "analytics",
            "period_days": period_days,
            "metrics": metrics,
            "generated_at": Utc::now().to_rfc3339(),
        }))
    }
}

/// Reviews ad campaign performance and optionally adjusts bids
#[derive(Debug)]
pub struct AdvertisingHandler {
    /// Simulated ads API latency
    latency: Duration,
}

impl AdvertisingHandler {
    /// Create a new advertising handler
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TaskHandler for AdvertisingHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Advertising
    }

    async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
        let TaskPayload::Advertising(payload) = &task.payload else {
            return Err(mismatched(task, TaskKind::Advertising));
        };

        tracing::info!(
            "Reviewing ad campaigns: campaigns={}, adjust_bids={}",
            payload.campaign_ids.len(),
            payload.adjust_bids
        );
        simulate(self.latency).await;

        let bids_adjusted = if payload.adjust_bids {
            payload.campaign_ids.len()
        } else {
            0
        };

        Ok(json!({
            "task": "advertising",
            "campaigns_reviewed": payload.campaign_ids.len(),
            "bids_adjusted": bids_adjusted,
        }))
    }
}

/// Collects customer reviews
#[derive(Debug)]
pub struct ReviewsHandler {
    /// Simulated marketplace latency
    latency: Duration,
}

impl ReviewsHandler {
    /// Create a new reviews handler
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TaskHandler for ReviewsHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Reviews
    }

    async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
        let TaskPayload::Reviews(payload) = &task.payload else {
            return Err(mismatched(task, TaskKind::Reviews));
        };

        let marketplace = payload.marketplace.as_deref().unwrap_or("all");
        tracing::info!(
            "Collecting reviews: marketplace={}, since_days={:?}",
            marketplace,
            payload.since_days
        );
        simulate(self.latency).await;

        Ok(json!({
            "task": "reviews",
            "marketplace": marketplace,
            "since_days": payload.since_days,
        }))
    }
}

/// Imports marketplace orders
#[derive(Debug)]
pub struct OrdersHandler {
    /// Simulated marketplace latency
    latency: Duration,
}

impl OrdersHandler {
    /// Create a new orders handler
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TaskHandler for OrdersHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Orders
    }

    async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
        let TaskPayload::Orders(payload) = &task.payload else {
            return Err(mismatched(task, TaskKind::Orders));
        };

        let marketplace = payload.marketplace.as_deref().unwrap_or("all");
        tracing::info!(
            "Importing orders: marketplace={}, statuses={:?}",
            marketplace,
            payload.statuses
        );
        simulate(self.latency).await;

        Ok(json!({
            "task": "orders",
            "marketplace": marketplace,
            "statuses": payload.statuses,
        }))
    }
}
