//! Alert rendering and delivery.
//!
//! Delivery is behind the [`Notifier`] trait. Failures never propagate:
//! [`send_alert`] always returns a status line the caller can show.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use buzzwatch_core::{SignalReport, StockSet};
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no recipients configured")]
    NoRecipients,
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A rendered alert message.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    /// Render a plain-text summary of the three signal sets.
    pub fn render(report: &SignalReport) -> Self {
        let subject = if report.is_quiet() {
            "BuzzWatch: no buzzing stocks".to_string()
        } else {
            format!("BuzzWatch: {} buzzing stock(s)", report.buzzing.len())
        };

        let mut body = String::new();
        body.push_str(&format!("Dataset cycle: {}\n\n", report.cycle));
        push_section(&mut body, "Price drops (deviation breaches)", &report.price_breaches);
        push_section(&mut body, "Volume spikes (above trailing average)", &report.volume_spikes);
        push_section(&mut body, "Buzzing stocks", &report.buzzing);

        Self { subject, body }
    }
}

fn push_section(body: &mut String, title: &str, stocks: &StockSet) {
    body.push_str(title);
    body.push_str(":\n");
    if stocks.is_empty() {
        body.push_str("  (none)\n");
    } else {
        for stock in stocks {
            body.push_str("  - ");
            body.push_str(stock);
            body.push('\n');
        }
    }
    body.push('\n');
}

/// Delivers a rendered alert to a list of recipients.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, recipients: &[String], message: &AlertMessage) -> Result<(), NotifyError>;
}

/// Writes alerts to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, recipients: &[String], message: &AlertMessage) -> Result<(), NotifyError> {
        info!(
            recipients = %recipients.join(", "),
            subject = %message.subject,
            body = %message.body,
            "alert"
        );
        Ok(())
    }
}

/// Spools each alert as a text file for an external mailer to pick up.
///
/// File names carry a timestamp and a per-notifier sequence number, so alerts
/// written within the same millisecond never replace each other.
#[derive(Debug)]
pub struct OutboxNotifier {
    dir: PathBuf,
    seq: AtomicU64,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }
}

impl Notifier for OutboxNotifier {
    fn name(&self) -> &str {
        "outbox"
    }

    fn deliver(&self, recipients: &[String], message: &AlertMessage) -> Result<(), NotifyError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| NotifyError::Delivery(format!("create {}: {e}", self.dir.display())))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("alert-{stamp}-{seq:06}.txt"));
        if path.exists() {
            return Err(NotifyError::Delivery(format!(
                "{} already exists",
                path.display()
            )));
        }
        let tmp = path.with_extension("txt.tmp");

        let content = format!(
            "To: {}\nSubject: {}\n\n{}",
            recipients.join(", "),
            message.subject,
            message.body
        );
        fs::write(&tmp, content)
            .map_err(|e| NotifyError::Delivery(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            NotifyError::Delivery(format!("rename into {}: {e}", path.display()))
        })?;
        Ok(())
    }
}

/// Render and deliver an alert, returning a user-facing status line.
pub fn send_alert(notifier: &dyn Notifier, recipients: &[String], report: &SignalReport) -> String {
    let recipients: Vec<String> = recipients
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    let result = if recipients.is_empty() {
        Err(NotifyError::NoRecipients)
    } else {
        notifier.deliver(&recipients, &AlertMessage::render(report))
    };

    match result {
        Ok(()) => {
            info!(notifier = notifier.name(), count = recipients.len(), "alert delivered");
            format!("Alert sent to {} recipient(s)", recipients.len())
        }
        Err(e) => {
            warn!(notifier = notifier.name(), error = %e, "alert not delivered");
            format!("Alert not sent: {e}")
        }
    }
}
