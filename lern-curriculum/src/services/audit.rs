//! Quality audit loop
//!
//! Picks a few unverified AI-generated items, has the oracle review them and
//! escalates failures to the human feedback queue.
//!
//! Counters drive the selection: least-reviewed items come first, and among
//! equals the most-flagged. The review counter is bumped before the oracle
//! call, so an item counts as reviewed even when the oracle fails.

use crate::db;
use crate::error::PipelineError;
use crate::models::feedback::AI_REVIEW_ERROR_TYPE;
use crate::models::{AuditItemResult, AuditReport, AuditStatus, ContentItem, NewFeedback};
use crate::oracle::{Oracle, ReviewOutcome, ReviewVerdict};
use crate::services::prompts::{build_review_prompt, REVIEW_SYSTEM_PROMPT};
use crate::utils::retry_on_lock;
use lern_common::config::LernConfig;
use lern_common::Result;
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

/// Run one audit round over at most `limit` items
///
/// `None` uses `audit.default_limit`.
pub async fn run_audit(
    db: &SqlitePool,
    oracle: &dyn Oracle,
    config: &LernConfig,
    limit: Option<usize>,
) -> Result<AuditReport> {
    let mut report = AuditReport::new();
    let limit = limit.unwrap_or(config.audit.default_limit);
    if limit == 0 {
        return Ok(report);
    }

    let fetch = candidate_fetch_size(limit, config.audit.oversample_factor);
    let mut candidates =
        db::contents::load_audit_candidates(db, &config.audit.excluded_apps, fetch).await?;

    // Oversample, then shuffle
    {
        let mut rng = rand::thread_rng();
        candidates.shuffle(&mut rng);
    }
    candidates.truncate(limit);

    info!(
        run_id = %report.run_id,
        limit,
        selected = candidates.len(),
        oracle = oracle.id(),
        "Starting quality audit round"
    );

    let max_lock_wait_ms = config.database.max_lock_wait_ms;
    for item in candidates {
        let counted = retry_on_lock("increment review counter", max_lock_wait_ms, || {
            db::contents::increment_review_counter(db, item.id)
        })
        .await;

        match counted {
            Ok(true) => {}
            Ok(false) => {
                debug!(content_id = item.id, "Content vanished before review, skipped");
                continue;
            }
            Err(e) => {
                error!(content_id = item.id, error = %e, "Review counter update failed, item skipped");
                continue;
            }
        }

        let result = review_item(db, oracle, &item, max_lock_wait_ms).await;
        report.record(result);
    }

    info!(
        run_id = %report.run_id,
        checked = report.checked,
        passed = report.passed,
        failed = report.failed,
        errors = report.errors,
        "Quality audit round finished"
    );

    Ok(report)
}

/// Rows to fetch before the shuffle, saturating instead of wrapping into a
/// negative (unbounded) SQLite `LIMIT`
fn candidate_fetch_size(limit: usize, oversample_factor: usize) -> i64 {
    i64::try_from(limit.saturating_mul(oversample_factor)).unwrap_or(i64::MAX)
}

async fn review_item(
    db: &SqlitePool,
    oracle: &dyn Oracle,
    item: &ContentItem,
    max_lock_wait_ms: u64,
) -> AuditItemResult {
    let mut result = AuditItemResult {
        content_id: item.id,
        app_id: item.app_id.clone(),
        status: AuditStatus::Error,
        reason: None,
        correction: None,
    };

    let verdict = match ask_oracle(oracle, item).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(content_id = item.id, app_id = %item.app_id, error = %e, "Review failed");
            result.reason = Some(e.to_string());
            return result;
        }
    };

    result.reason = verdict.reason.clone();
    result.correction = verdict.correction.clone();

    match verdict.outcome {
        ReviewOutcome::Pass => {
            debug!(content_id = item.id, "Review passed");
            result.status = AuditStatus::Pass;
        }
        ReviewOutcome::Failed => {
            let flagged = retry_on_lock("flag content", max_lock_wait_ms, || {
                flag_item(db, item, &verdict)
            })
            .await;

            match flagged {
                Ok(feedback_id) => {
                    info!(
                        content_id = item.id,
                        app_id = %item.app_id,
                        feedback_id,
                        reason = verdict.reason.as_deref().unwrap_or(""),
                        "Content flagged for human review"
                    );
                    result.status = AuditStatus::Failed;
                }
                Err(e) => {
                    error!(content_id = item.id, error = %e, "Flagging content failed");
                    result.reason = Some(format!("flag write failed: {}", e));
                }
            }
        }
    }

    result
}

async fn ask_oracle(oracle: &dyn Oracle, item: &ContentItem) -> std::result::Result<ReviewVerdict, PipelineError> {
    let prompt = build_review_prompt(item);
    let raw = oracle.complete(REVIEW_SYSTEM_PROMPT, &prompt).await?;
    Ok(ReviewVerdict::parse(&raw)?)
}

/// Flag increment and feedback entry, atomically
async fn flag_item(db: &SqlitePool, item: &ContentItem, verdict: &ReviewVerdict) -> Result<i64> {
    let mut tx = db.begin().await?;

    db::contents::increment_flag_counter(&mut *tx, item.id).await?;
    let feedback_id = db::feedback::append_feedback(
        &mut *tx,
        &NewFeedback {
            app_id: item.app_id.clone(),
            target_id: item.target_id(),
            comment: feedback_comment(item, verdict),
            error_type: AI_REVIEW_ERROR_TYPE.to_string(),
        },
    )
    .await?;

    tx.commit().await?;
    Ok(feedback_id)
}

fn feedback_comment(item: &ContentItem, verdict: &ReviewVerdict) -> String {
    format!(
        "AI review failed.\nReason: {}\nCorrection: {}\nContent: {}",
        verdict.reason.as_deref().unwrap_or("-"),
        verdict.correction.as_deref().unwrap_or("-"),
        item.data
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_fetch_size_never_negative() {
        assert_eq!(candidate_fetch_size(4, 5), 20);
        assert_eq!(candidate_fetch_size(usize::MAX, 5), i64::MAX);
        assert_eq!(candidate_fetch_size(usize::MAX / 5 + 1, 5), i64::MAX);
        assert_eq!(candidate_fetch_size((i64::MAX as usize) / 2 + 1, 2), i64::MAX);
    }

    #[test]
    fn test_feedback_comment_carries_payload() {
        let item = ContentItem {
            id: 7,
            app_id: "kopfrechnen".to_string(),
            data: serde_json::json!({"question": "7+5", "answer": 13}),
            ai_generated: true,
            human_verified: false,
            ai_reviewed_counter: 3,
            flag_counter: 0,
        };
        let verdict = ReviewVerdict {
            outcome: ReviewOutcome::Failed,
            reason: Some("7+5 is 12".to_string()),
            correction: None,
        };

        let comment = feedback_comment(&item, &verdict);
        assert!(comment.contains("Reason: 7+5 is 12"));
        assert!(comment.contains("Correction: -"));
        assert!(comment.contains(r#""answer":13"#));
    }
}
