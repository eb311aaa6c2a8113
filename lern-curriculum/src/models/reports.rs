//! Per-run pipeline reports
//!
//! Every trigger returns one of these even when individual batches, pairs or
//! items failed, so a partial run is observable.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Linking
// ============================================================================

/// Link proposed by the oracle for one content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedLink {
    pub content_id: i64,
    pub node_id: i64,
}

/// App skipped for lack of taxonomy mapping or candidate nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedApp {
    pub app_id: String,
    pub reason: String,
}

/// Batch whose oracle call, response or write failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub app_id: String,
    pub batch_index: usize,
    pub content_ids: Vec<i64>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLinkingSummary {
    pub app_id: String,
    pub candidate_nodes: usize,
    pub content_items: usize,
    pub batches_total: usize,
    pub batches_failed: usize,
    /// Non-null assignments accepted from the oracle
    pub links_proposed: usize,
    /// Rows actually created (existing pairs are no-ops)
    pub links_inserted: u64,
    pub proposed: Vec<ProposedLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub apps: Vec<AppLinkingSummary>,
    pub skipped_apps: Vec<SkippedApp>,
    pub failures: Vec<BatchFailure>,
}

impl LinkingReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            dry_run,
            apps: Vec::new(),
            skipped_apps: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn links_inserted(&self) -> u64 {
        self.apps.iter().map(|a| a.links_inserted).sum()
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairVerdictKind {
    Valid,
    Invalid,
    /// No capability spec registered for the app
    NotCheckable,
    /// Oracle or response failure; the pair is left alone
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub app_id: String,
    pub node_id: i64,
    pub code: String,
    pub verdict: PairVerdictKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Set when the cascade delete for an invalid pair failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub checked: usize,
    pub valid: usize,
    pub invalid: usize,
    pub not_checkable: usize,
    pub errors: usize,
    pub removed_links: u64,
    pub removed_configs: u64,
    pub pairs: Vec<PairOutcome>,
}

impl ValidationReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            dry_run,
            checked: 0,
            valid: 0,
            invalid: 0,
            not_checkable: 0,
            errors: 0,
            removed_links: 0,
            removed_configs: 0,
            pairs: Vec::new(),
        }
    }

    /// Record one pair outcome and bump its counter
    pub fn record(&mut self, outcome: PairOutcome) {
        match outcome.verdict {
            PairVerdictKind::Valid => {
                self.checked += 1;
                self.valid += 1;
            }
            PairVerdictKind::Invalid => {
                self.checked += 1;
                self.invalid += 1;
            }
            PairVerdictKind::NotCheckable => self.not_checkable += 1,
            PairVerdictKind::Error => self.errors += 1,
        }
        self.pairs.push(outcome);
    }
}

// ============================================================================
// Quality audit
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Pass,
    Failed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditItemResult {
    pub content_id: i64,
    pub app_id: String,
    pub status: AuditStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: Uuid,
    /// Items whose review counter was incremented this run
    pub checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub results: Vec<AuditItemResult>,
}

impl AuditReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            checked: 0,
            passed: 0,
            failed: 0,
            errors: 0,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: AuditItemResult) {
        self.checked += 1;
        match result.status {
            AuditStatus::Pass => self.passed += 1,
            AuditStatus::Failed => self.failed += 1,
            AuditStatus::Error => self.errors += 1,
        }
        self.results.push(result);
    }
}

impl Default for AuditReport {
    fn default() -> Self {
        Self::new()
    }
}
