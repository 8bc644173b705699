//! BuzzWatch Runner: refresh scheduling, configuration, alerting.
//!
//! This crate builds on `buzzwatch-core` to provide:
//! - TOML configuration with validation and source selection
//! - The refresh scheduler (background thread, stop between cycles)
//! - Alert rendering and the notifier seam

pub mod alert;
pub mod config;
pub mod scheduler;

pub use alert::{send_alert, AlertMessage, LogNotifier, Notifier, NotifyError, OutboxNotifier};
pub use config::{ConfigError, WatchConfig};
pub use scheduler::{
    CycleEvent, CyclePhase, CycleReport, RefreshError, RefreshScheduler, SchedulerHandle,
    SchedulerStatus, StatusHandle,
};

use buzzwatch_core::StockQuery;

/// Pick the notifier described by the `[alert]` section.
pub fn notifier_for(config: &WatchConfig) -> Box<dyn Notifier> {
    match &config.alert.outbox_dir {
        Some(dir) => Box::new(OutboxNotifier::new(dir)),
        None => Box::new(LogNotifier),
    }
}

/// Compute the current signals and alert the configured recipients.
pub fn alert_now(query: &StockQuery, notifier: &dyn Notifier, recipients: &[String]) -> String {
    send_alert(notifier, recipients, &query.signal_report())
}
