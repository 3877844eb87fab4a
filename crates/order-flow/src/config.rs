//! # Configuration
//!
//! Every setting comes from an environment variable with a default:
//!
//! | Variable | Default |
//! |---|---|
//! | `ORDERS_TOPIC` | `orders.created` |
//! | `STATUS_TOPIC` | `orders.status` |
//! | `INVENTORY_TOPIC` | `inventory.updated` |
//! | `PROCESSOR_GROUP_ID` | `orders-processor-cg` |
//! | `STOCK_GROUP_ID` | `stock-service-cg` |
//! | `NOTIFICATIONS_GROUP_ID` | `notifications-api-cg` |
//! | `BUS_PARTITIONS` | `3` |
//! | `PRODUCER_MAX_ATTEMPTS` | `5` |
//! | `PRODUCER_BASE_DELAY_MS` | `100` |
//! | `PRODUCER_MAX_DELAY_MS` | `2000` |
//! | `PROCESSING_DELAY_MS` | `300` |
//! | `SUBSCRIBER_BUFFER` | `8` |
//! | `SHUTDOWN_GRACE_MS` | `5000` |
//! | `ADMISSION_POLICY` | `snapshot` |

use crate::intake::AdmissionPolicy;
use crate::ledger::Inventory;
use crate::model::Sku;
use event_bus::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub orders_topic: String,
    pub status_topic: String,
    pub inventory_topic: String,
    pub processor_group: String,
    pub stock_group: String,
    pub notifications_group: String,
    pub bus_partitions: u32,
    pub retry: RetryPolicy,
    pub processing_delay: Duration,
    pub subscriber_buffer: usize,
    pub shutdown_grace: Duration,
    pub admission_policy: AdmissionPolicy,
    /// Seeded into the ledger at startup.
    pub initial_inventory: Inventory,
}

/// `{S1: 50, S2: 30, S3: 25, S4: 15}`
pub fn initial_inventory() -> Inventory {
    [("S1", 50), ("S2", 30), ("S3", 25), ("S4", 15)]
        .into_iter()
        .map(|(sku, qty)| (Sku::from(sku), qty))
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orders_topic: "orders.created".into(),
            status_topic: "orders.status".into(),
            inventory_topic: "inventory.updated".into(),
            processor_group: "orders-processor-cg".into(),
            stock_group: "stock-service-cg".into(),
            notifications_group: "notifications-api-cg".into(),
            bus_partitions: 3,
            retry: RetryPolicy::default(),
            processing_delay: Duration::from_millis(300),
            subscriber_buffer: 8,
            shutdown_grace: Duration::from_secs(5),
            admission_policy: AdmissionPolicy::default(),
            initial_inventory: initial_inventory(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        Ok(Self {
            orders_topic: text("ORDERS_TOPIC", defaults.orders_topic),
            status_topic: text("STATUS_TOPIC", defaults.status_topic),
            inventory_topic: text("INVENTORY_TOPIC", defaults.inventory_topic),
            processor_group: text("PROCESSOR_GROUP_ID", defaults.processor_group),
            stock_group: text("STOCK_GROUP_ID", defaults.stock_group),
            notifications_group: text("NOTIFICATIONS_GROUP_ID", defaults.notifications_group),
            bus_partitions: parse(&lookup, "BUS_PARTITIONS", defaults.bus_partitions)?,
            retry: RetryPolicy::new(
                parse(&lookup, "PRODUCER_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
                millis(&lookup, "PRODUCER_BASE_DELAY_MS", defaults.retry.base_delay)?,
                millis(&lookup, "PRODUCER_MAX_DELAY_MS", defaults.retry.max_delay)?,
            ),
            processing_delay: millis(&lookup, "PROCESSING_DELAY_MS", defaults.processing_delay)?,
            subscriber_buffer: parse(&lookup, "SUBSCRIBER_BUFFER", defaults.subscriber_buffer)?,
            shutdown_grace: millis(&lookup, "SHUTDOWN_GRACE_MS", defaults.shutdown_grace)?,
            admission_policy: parse(&lookup, "ADMISSION_POLICY", defaults.admission_policy)?,
            initial_inventory: defaults.initial_inventory,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse(lookup, key, default_ms).map(Duration::from_millis)
}
