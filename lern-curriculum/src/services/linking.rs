//! Curriculum linking pipeline
//!
//! For each app: resolve its taxonomy prefixes, load the leaf competencies
//! under them, and let the oracle assign one competency per content item in
//! batches. Accepted assignments become `content_curriculum` rows.
//!
//! # Architecture
//! - Apps are processed one after another
//! - Batches of one app run concurrently via `futures::stream::buffer_unordered`
//! - Each batch writes its links in one transaction; a failed batch is
//!   reported and the run continues

use crate::db;
use crate::error::PipelineError;
use crate::models::{
    AppLinkingSummary, BatchFailure, ContentItem, ContentLink, CurriculumNode, LinkingReport,
    ProposedLink, SkippedApp,
};
use crate::oracle::{LinkAssignments, Oracle};
use crate::services::prompts::{build_linking_prompt, LINKING_SYSTEM_PROMPT};
use crate::utils::retry_on_lock;
use futures::stream::{self, StreamExt};
use lern_common::config::LernConfig;
use lern_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, error, info, warn};

/// Per-run linking options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkingOptions {
    /// Restrict the run to one app; `None` = every known app
    pub app_id: Option<String>,
    /// Override `linking.batch_size`
    pub batch_size: Option<usize>,
    /// Ask the oracle and report, but write nothing
    #[serde(default)]
    pub dry_run: bool,
}

/// Run the linking pipeline
///
/// Only invalid options fail the call; everything that goes wrong while
/// processing an app or batch is recorded in the returned report.
pub async fn run_linking(
    db: &SqlitePool,
    oracle: &dyn Oracle,
    config: &LernConfig,
    options: &LinkingOptions,
) -> Result<LinkingReport> {
    let batch_size = options.batch_size.unwrap_or(config.linking.batch_size);
    if batch_size == 0 {
        return Err(Error::InvalidInput("batch_size must be at least 1".to_string()));
    }

    let mut report = LinkingReport::new(options.dry_run);
    let apps = apps_to_link(db, config, options.app_id.as_deref()).await?;

    info!(
        run_id = %report.run_id,
        apps = apps.len(),
        batch_size,
        dry_run = options.dry_run,
        oracle = oracle.id(),
        "Starting curriculum linking run"
    );

    for app_id in apps {
        let Some(prefixes) = config.taxonomy_prefixes(&app_id) else {
            warn!(app_id = %app_id, "No taxonomy mapping configured, skipping app");
            report.skipped_apps.push(SkippedApp {
                app_id,
                reason: "no taxonomy mapping configured".to_string(),
            });
            continue;
        };

        let nodes = match db::curriculum::load_leaf_nodes_by_prefixes(db, prefixes).await {
            Ok(nodes) if nodes.is_empty() => {
                info!(app_id = %app_id, ?prefixes, "No candidate competencies under prefixes, skipping app");
                report.skipped_apps.push(SkippedApp {
                    app_id,
                    reason: "no candidate competencies".to_string(),
                });
                continue;
            }
            Ok(nodes) => nodes,
            Err(e) => {
                error!(app_id = %app_id, error = %e, "Loading candidate competencies failed");
                report.skipped_apps.push(SkippedApp {
                    app_id,
                    reason: format!("store error: {}", e),
                });
                continue;
            }
        };

        let items = match db::contents::load_contents_for_app(db, &app_id).await {
            Ok(items) => items,
            Err(e) => {
                error!(app_id = %app_id, error = %e, "Loading content failed");
                report.skipped_apps.push(SkippedApp {
                    app_id,
                    reason: format!("store error: {}", e),
                });
                continue;
            }
        };

        let (summary, failures) =
            link_app(db, oracle, config, &app_id, items, &nodes, batch_size, options.dry_run).await;
        report.apps.push(summary);
        report.failures.extend(failures);
    }

    info!(
        run_id = %report.run_id,
        apps_linked = report.apps.len(),
        apps_skipped = report.skipped_apps.len(),
        failed_batches = report.failures.len(),
        links_inserted = report.links_inserted(),
        "Curriculum linking run finished"
    );

    Ok(report)
}

/// Apps covered by a run: the requested one, or taxonomy keys ∪ apps owning content
async fn apps_to_link(db: &SqlitePool, config: &LernConfig, app_filter: Option<&str>) -> Result<Vec<String>> {
    if let Some(app_id) = app_filter {
        return Ok(vec![app_id.to_string()]);
    }

    let mut apps: BTreeSet<String> = config.taxonomy.keys().cloned().collect();
    apps.extend(db::contents::load_app_ids(db).await?);
    Ok(apps.into_iter().collect())
}

#[allow(clippy::too_many_arguments)]
async fn link_app(
    db: &SqlitePool,
    oracle: &dyn Oracle,
    config: &LernConfig,
    app_id: &str,
    items: Vec<ContentItem>,
    nodes: &[CurriculumNode],
    batch_size: usize,
    dry_run: bool,
) -> (AppLinkingSummary, Vec<BatchFailure>) {
    let batches: Vec<Vec<ContentItem>> = items.chunks(batch_size).map(|c| c.to_vec()).collect();

    let mut summary = AppLinkingSummary {
        app_id: app_id.to_string(),
        candidate_nodes: nodes.len(),
        content_items: items.len(),
        batches_total: batches.len(),
        ..Default::default()
    };

    debug!(
        app_id,
        candidate_nodes = nodes.len(),
        content_items = items.len(),
        batches = batches.len(),
        "Linking app"
    );

    let summary_chars = config.linking.summary_chars;
    let max_lock_wait_ms = config.database.max_lock_wait_ms;

    let mut results: Vec<(usize, Vec<i64>, std::result::Result<BatchLinks, PipelineError>)> =
        stream::iter(batches.into_iter().enumerate())
            .map(|(batch_index, batch)| async move {
                let content_ids: Vec<i64> = batch.iter().map(|c| c.id).collect();
                let result = link_batch(
                    db,
                    oracle,
                    app_id,
                    batch_index,
                    &batch,
                    nodes,
                    summary_chars,
                    dry_run,
                    max_lock_wait_ms,
                )
                .await;
                (batch_index, content_ids, result)
            })
            .buffer_unordered(config.linking.max_concurrent_batches)
            .collect()
            .await;

    results.sort_by_key(|(batch_index, _, _)| *batch_index);

    let mut failures = Vec::new();
    for (batch_index, content_ids, result) in results {
        match result {
            Ok(batch) => {
                summary.links_proposed += batch.proposed.len();
                summary.links_inserted += batch.inserted;
                summary.proposed.extend(batch.proposed);
            }
            Err(e) => {
                error!(
                    app_id,
                    batch_index,
                    content_ids = ?content_ids,
                    error = %e,
                    "Linking batch failed"
                );
                summary.batches_failed += 1;
                failures.push(BatchFailure {
                    app_id: app_id.to_string(),
                    batch_index,
                    content_ids,
                    error: e.to_string(),
                });
            }
        }
    }

    (summary, failures)
}

struct BatchLinks {
    proposed: Vec<ProposedLink>,
    inserted: u64,
}

#[allow(clippy::too_many_arguments)]
async fn link_batch(
    db: &SqlitePool,
    oracle: &dyn Oracle,
    app_id: &str,
    batch_index: usize,
    batch: &[ContentItem],
    nodes: &[CurriculumNode],
    summary_chars: usize,
    dry_run: bool,
    max_lock_wait_ms: u64,
) -> std::result::Result<BatchLinks, PipelineError> {
    let prompt = build_linking_prompt(app_id, batch, nodes, summary_chars);
    let raw = oracle.complete(LINKING_SYSTEM_PROMPT, &prompt).await?;
    let assignments = LinkAssignments::parse(&raw)?;

    let proposed = accept_assignments(app_id, batch_index, &assignments, batch, nodes);

    if dry_run {
        for link in &proposed {
            info!(app_id, content_id = link.content_id, node_id = link.node_id, "Dry run: would link");
        }
        return Ok(BatchLinks { proposed, inserted: 0 });
    }

    let links: Vec<ContentLink> = proposed
        .iter()
        .map(|p| ContentLink {
            content_id: p.content_id,
            node_id: p.node_id,
        })
        .collect();

    let inserted = retry_on_lock("insert content links", max_lock_wait_ms, || {
        db::links::insert_links(db, &links)
    })
    .await?;

    debug!(app_id, batch_index, proposed = links.len(), inserted, "Linking batch written");

    Ok(BatchLinks { proposed, inserted })
}

/// Keep assignments that point from a batch member to a candidate node
///
/// Anything else is an oracle anomaly: logged and dropped, the rest of the
/// batch still counts.
fn accept_assignments(
    app_id: &str,
    batch_index: usize,
    assignments: &LinkAssignments,
    batch: &[ContentItem],
    nodes: &[CurriculumNode],
) -> Vec<ProposedLink> {
    let batch_ids: HashSet<i64> = batch.iter().map(|c| c.id).collect();
    let node_ids: HashSet<i64> = nodes.iter().map(|n| n.id).collect();

    let mut accepted = Vec::new();
    for (content_id, node_id) in assignments.links() {
        if !batch_ids.contains(&content_id) {
            warn!(app_id, batch_index, content_id, "Oracle answered for content outside the batch, dropped");
            continue;
        }
        if !node_ids.contains(&node_id) {
            warn!(app_id, batch_index, content_id, node_id, "Oracle picked a non-candidate node, dropped");
            continue;
        }
        accepted.push(ProposedLink { content_id, node_id });
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeLevel;
    use std::collections::BTreeMap;

    fn item(id: i64) -> ContentItem {
        ContentItem {
            id,
            app_id: "kopfrechnen".to_string(),
            data: serde_json::json!("2+2=?"),
            ai_generated: true,
            human_verified: false,
            ai_reviewed_counter: 0,
            flag_counter: 0,
        }
    }

    fn node(id: i64) -> CurriculumNode {
        CurriculumNode {
            id,
            code: format!("MA.1.A.{}", id),
            title: String::new(),
            description: String::new(),
            level: NodeLevel::CompetencyStage,
        }
    }

    #[test]
    fn test_accept_drops_foreign_ids_and_nodes() {
        let assignments = LinkAssignments(BTreeMap::from([
            (1, Some(279)),
            (2, None),
            (3, Some(999)), // not a candidate
            (42, Some(279)), // not in batch
        ]));

        let accepted = accept_assignments(
            "kopfrechnen",
            0,
            &assignments,
            &[item(1), item(2), item(3)],
            &[node(279), node(280)],
        );

        assert_eq!(accepted, vec![ProposedLink { content_id: 1, node_id: 279 }]);
    }
}
