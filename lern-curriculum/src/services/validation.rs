//! Link validation pass
//!
//! Second opinion on existing links: for every distinct `(app, node)` pair
//! the oracle judges, against the app's capability specification, whether
//! the app can really train that competency. Pairs judged invalid lose all
//! their links and the app's per-node configuration row.
//!
//! All verdicts are collected before anything is deleted, so a failure late
//! in the pass never leaves a half-judged store behind.

use crate::db;
use crate::db::links::LinkedPair;
use crate::error::PipelineError;
use crate::models::{PairOutcome, PairVerdictKind, ValidationReport};
use crate::oracle::{Oracle, PairVerdict};
use crate::services::prompts::{build_validation_prompt, VALIDATION_SYSTEM_PROMPT};
use crate::utils::retry_on_lock;
use lern_common::config::LernConfig;
use lern_common::Result;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationOptions {
    /// Restrict the pass to one app
    pub app_id: Option<String>,
    /// Judge and report, but delete nothing
    #[serde(default)]
    pub dry_run: bool,
}

/// Run the validation pass
///
/// Fails only when the pairs cannot be enumerated; per-pair oracle and
/// store failures are reported.
pub async fn run_validation(
    db: &SqlitePool,
    oracle: &dyn Oracle,
    config: &LernConfig,
    options: &ValidationOptions,
) -> Result<ValidationReport> {
    let mut report = ValidationReport::new(options.dry_run);
    let pairs = db::links::load_linked_pairs(db, options.app_id.as_deref()).await?;

    info!(
        run_id = %report.run_id,
        pairs = pairs.len(),
        dry_run = options.dry_run,
        oracle = oracle.id(),
        "Starting link validation pass"
    );

    // Phase 1: judge every pair
    let mut doomed: Vec<usize> = Vec::new();
    for pair in &pairs {
        let outcome = judge_pair(oracle, config, pair).await;
        if outcome.verdict == PairVerdictKind::Invalid {
            doomed.push(report.pairs.len());
        }
        report.record(outcome);
    }

    // Phase 2: cascade deletes
    if options.dry_run {
        for &index in &doomed {
            let pair = &report.pairs[index];
            info!(app_id = %pair.app_id, node_id = pair.node_id, "Dry run: would remove pairing");
        }
    } else {
        let max_lock_wait_ms = config.database.max_lock_wait_ms;
        for index in doomed {
            let (app_id, node_id) = (report.pairs[index].app_id.clone(), report.pairs[index].node_id);
            let removed = retry_on_lock("remove invalid pairing", max_lock_wait_ms, || {
                db::links::delete_pair_cascade(db, &app_id, node_id)
            })
            .await;

            match removed {
                Ok(removed) => {
                    info!(
                        app_id = %app_id,
                        node_id,
                        links = removed.links,
                        configs = removed.configs,
                        "Removed invalid pairing"
                    );
                    report.removed_links += removed.links;
                    report.removed_configs += removed.configs;
                }
                Err(e) => {
                    error!(app_id = %app_id, node_id, error = %e, "Removing invalid pairing failed");
                    report.pairs[index].removal_error = Some(e.to_string());
                }
            }
        }
    }

    info!(
        run_id = %report.run_id,
        checked = report.checked,
        valid = report.valid,
        invalid = report.invalid,
        not_checkable = report.not_checkable,
        errors = report.errors,
        removed_links = report.removed_links,
        "Link validation pass finished"
    );

    Ok(report)
}

async fn judge_pair(oracle: &dyn Oracle, config: &LernConfig, pair: &LinkedPair) -> PairOutcome {
    let mut outcome = PairOutcome {
        app_id: pair.app_id.clone(),
        node_id: pair.node_id,
        code: pair.code.clone(),
        verdict: PairVerdictKind::NotCheckable,
        reason: None,
        removal_error: None,
    };

    let Some(capability_spec) = config.capability_spec(&pair.app_id) else {
        warn!(app_id = %pair.app_id, node_id = pair.node_id, "No capability specification, pair not checkable");
        return outcome;
    };

    match ask_oracle(oracle, capability_spec, pair).await {
        Ok(verdict) => {
            outcome.verdict = if verdict.valid {
                PairVerdictKind::Valid
            } else {
                PairVerdictKind::Invalid
            };
            outcome.reason = Some(verdict.reason);
        }
        Err(e) => {
            error!(app_id = %pair.app_id, node_id = pair.node_id, error = %e, "Pair validation failed");
            outcome.verdict = PairVerdictKind::Error;
            outcome.reason = Some(e.to_string());
        }
    }

    outcome
}

async fn ask_oracle(
    oracle: &dyn Oracle,
    capability_spec: &str,
    pair: &LinkedPair,
) -> std::result::Result<PairVerdict, PipelineError> {
    let prompt = build_validation_prompt(capability_spec, pair);
    let raw = oracle.complete(VALIDATION_SYSTEM_PROMPT, &prompt).await?;
    Ok(PairVerdict::parse(&raw)?)
}
