//! Audit trail for dispatched batches.
//!
//! Every non-empty batch the dispatcher handles produces one [`AuditRecord`]
//! per parent. [`TracingAudit`] turns records into `info!` events;
//! [`RecordingAudit`] keeps them in memory so callers can count them.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

use lexisync_core::Tier;

/// What a batch did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Equal,
    Delete,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Equal => "equal",
            AuditAction::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// One batch, scoped to one parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub tier: Tier,
    pub action: AuditAction,
    /// `course 5` for levels, `level 42` for words, `None` for courses.
    pub parent: Option<String>,
    pub count: usize,
    pub ids: Vec<String>,
    pub dry_run: bool,
}

impl fmt::Display for AuditRecord {
    /// `course 5 --> create levels [2]: [41, 42]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "[dry-run] ")?;
        }
        if let Some(parent) = &self.parent {
            write!(f, "{parent} --> ")?;
        }
        write!(
            f,
            "{} {} [{}]: [{}]",
            self.action,
            self.tier.plural(),
            self.count,
            self.ids.join(", ")
        )
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Emits each record as a structured `info!` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, record: AuditRecord) {
        tracing::info!(
            tier = %record.tier,
            action = %record.action,
            count = record.count,
            parent = record.parent.as_deref().unwrap_or(""),
            dry_run = record.dry_run,
            "{record}"
        );
    }
}

/// Keeps records in memory, and optionally forwards them to tracing as well.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    records: Mutex<Vec<AuditRecord>>,
    forward: bool,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that also logs every record through [`TracingAudit`].
    pub fn forwarding() -> Self {
        Self {
            records: Mutex::default(),
            forward: true,
        }
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Sum of `count` over every record for `tier` and `action`.
    pub fn total(&self, tier: Tier, action: AuditAction) -> usize {
        self.records()
            .iter()
            .filter(|r| r.tier == tier && r.action == action)
            .map(|r| r.count)
            .sum()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, record: AuditRecord) {
        if self.forward {
            TracingAudit.record(record.clone());
        }
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(parent: Option<&str>, dry_run: bool) -> AuditRecord {
        AuditRecord {
            tier: Tier::Level,
            action: AuditAction::Create,
            parent: parent.map(str::to_owned),
            count: 2,
            ids: vec!["41".into(), "42".into()],
            dry_run,
        }
    }

    #[test]
    fn display_with_parent() {
        assert_eq!(
            record(Some("course 5"), false).to_string(),
            "course 5 --> create levels [2]: [41, 42]"
        );
    }

    #[test]
    fn display_without_parent_and_dry_run() {
        assert_eq!(
            record(None, true).to_string(),
            "[dry-run] create levels [2]: [41, 42]"
        );
    }

    #[test]
    fn recorder_totals_by_tier_and_action() {
        let audit = RecordingAudit::new();
        audit.record(record(Some("course 5"), false));
        audit.record(record(Some("course 6"), false));
        assert_eq!(audit.records().len(), 2);
        assert_eq!(audit.total(Tier::Level, AuditAction::Create), 4);
        assert_eq!(audit.total(Tier::Word, AuditAction::Create), 0);
    }
}
