//! Integration tests for the curriculum linking pipeline

mod helpers;

use helpers::*;
use lern_curriculum::oracle::{OracleError, ScriptedOracle};
use lern_curriculum::services::{run_linking, LinkingOptions};
use serde_json::json;
use sqlx::SqlitePool;

async fn seed_curriculum(pool: &SqlitePool) {
    seed_node(pool, 1, "MA", "Mathematik", "subject").await;
    seed_node(pool, 278, "MA.1.A.3", "Addition", "competency").await;
    seed_node(pool, 279, "MA.1.A.3.a", "Addieren bis 10", "competency_stage").await;
    seed_node(pool, 280, "MA.1.A.3.b", "Addieren bis 100", "competency_stage").await;
    seed_node(pool, 300, "MA.2.B.1.a", "Flaechen vergleichen", "competency_stage").await;
}

fn only(app: &str) -> LinkingOptions {
    LinkingOptions {
        app_id: Some(app.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_item_is_linked() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    seed_content(&pool, 1, "kopfrechnen", json!({"question": "2+3"}), true, false, 0, 0).await;

    let oracle = ScriptedOracle::new().reply(r#"{"1": 279}"#);
    let report = run_linking(&pool, &oracle, &test_config(), &only("kopfrechnen")).await.unwrap();

    assert_eq!(report.apps.len(), 1);
    let summary = &report.apps[0];
    assert_eq!(summary.candidate_nodes, 2, "only competency_stage nodes under MA.1.A");
    assert_eq!(summary.links_proposed, 1);
    assert_eq!(summary.links_inserted, 1);
    assert!(report.failures.is_empty());

    let links = lern_curriculum::db::links::load_links(&pool).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!((links[0].content_id, links[0].node_id), (1, 279));

    // Candidates offered to the oracle: the two leaves, nothing else
    let prompt = &oracle.prompts()[0].user;
    assert!(prompt.contains("MA.1.A.3.a") && prompt.contains("MA.1.A.3.b"));
    assert!(!prompt.contains("MA.2.B.1.a"));
    assert!(!prompt.contains(r#""code":"MA.1.A.3""#));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    seed_content(&pool, 1, "kopfrechnen", json!("2+3=?"), true, false, 0, 0).await;
    seed_content(&pool, 2, "kopfrechnen", json!("45+30=?"), true, false, 0, 0).await;

    let oracle = ScriptedOracle::new()
        .reply(r#"{"1": 279, "2": 280}"#)
        .reply(r#"{"1": 279, "2": 280}"#);
    let config = test_config();

    let first = run_linking(&pool, &oracle, &config, &only("kopfrechnen")).await.unwrap();
    let second = run_linking(&pool, &oracle, &config, &only("kopfrechnen")).await.unwrap();

    assert_eq!(first.links_inserted(), 2);
    assert_eq!(second.links_inserted(), 0);
    assert_eq!(second.apps[0].links_proposed, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM content_curriculum").await, 2);
}

#[tokio::test]
async fn test_batches_run_concurrently_and_all_land() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    for id in 1..=25 {
        seed_content(&pool, id, "kopfrechnen", json!({"q": id}), true, false, 0, 0).await;
    }

    let oracle = ScriptedOracle::from_fn(assign_all_to(280));
    let report = run_linking(&pool, &oracle, &test_config(), &only("kopfrechnen")).await.unwrap();

    let summary = &report.apps[0];
    assert_eq!(summary.content_items, 25);
    assert_eq!(summary.batches_total, 3);
    assert_eq!(summary.batches_failed, 0);
    assert_eq!(summary.links_inserted, 25);
    assert_eq!(oracle.call_count(), 3);

    // Every oracle call saw at most 10 items
    for prompt in oracle.prompts() {
        assert!(batch_content_ids(&prompt.user).len() <= 10);
    }
}

#[tokio::test]
async fn test_batch_size_override() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    for id in 1..=5 {
        seed_content(&pool, id, "kopfrechnen", json!({"q": id}), true, false, 0, 0).await;
    }

    let oracle = ScriptedOracle::from_fn(assign_all_to(279));
    let options = LinkingOptions {
        batch_size: Some(2),
        ..only("kopfrechnen")
    };
    let report = run_linking(&pool, &oracle, &test_config(), &options).await.unwrap();

    assert_eq!(report.apps[0].batches_total, 3);
    assert_eq!(oracle.call_count(), 3);
}

#[tokio::test]
async fn test_zero_batch_size_rejected() {
    let pool = create_test_db().await;
    let oracle = ScriptedOracle::new();
    let options = LinkingOptions {
        batch_size: Some(0),
        ..only("kopfrechnen")
    };

    let result = run_linking(&pool, &oracle, &test_config(), &options).await;
    assert!(matches!(result, Err(lern_common::Error::InvalidInput(_))));
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_the_run() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    for id in 1..=4 {
        seed_content(&pool, id, "kopfrechnen", json!({"q": id}), true, false, 0, 0).await;
    }

    let assign = assign_all_to(279);
    let oracle = ScriptedOracle::from_fn(move |system, user| {
        if batch_content_ids(user).contains(&1) {
            Err(OracleError::Api(503, "overloaded".to_string()))
        } else {
            assign(system, user)
        }
    });
    let options = LinkingOptions {
        batch_size: Some(2),
        ..only("kopfrechnen")
    };
    let report = run_linking(&pool, &oracle, &test_config(), &options).await.unwrap();

    assert_eq!(report.apps[0].batches_failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].content_ids, vec![1, 2]);
    assert!(report.failures[0].error.contains("503"));

    let links = lern_curriculum::db::links::load_links(&pool).await.unwrap();
    assert_eq!(links.iter().map(|l| l.content_id).collect::<Vec<_>>(), vec![3, 4]);
}

#[tokio::test]
async fn test_malformed_response_fails_batch() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    seed_content(&pool, 1, "kopfrechnen", json!("2+3=?"), true, false, 0, 0).await;

    let oracle = ScriptedOracle::new().reply(r#"{"1": "279"}"#);
    let report = run_linking(&pool, &oracle, &test_config(), &only("kopfrechnen")).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("rejected"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM content_curriculum").await, 0);
}

#[tokio::test]
async fn test_out_of_batch_ids_and_foreign_nodes_dropped() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    seed_content(&pool, 1, "kopfrechnen", json!("2+3=?"), true, false, 0, 0).await;
    seed_content(&pool, 2, "kopfrechnen", json!("4+4=?"), true, false, 0, 0).await;

    // 300 exists but is not a candidate for this app; 77 is not in the batch
    let oracle = ScriptedOracle::new().reply(r#"{"1": 279, "2": 300, "77": 279}"#);
    let report = run_linking(&pool, &oracle, &test_config(), &only("kopfrechnen")).await.unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.apps[0].links_proposed, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM content_curriculum").await, 1);
}

#[tokio::test]
async fn test_null_assignments_create_nothing() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    seed_content(&pool, 1, "kopfrechnen", json!("Male ein Haus"), true, false, 0, 0).await;

    let oracle = ScriptedOracle::new().reply("```json\n{\"1\": null}\n```");
    let report = run_linking(&pool, &oracle, &test_config(), &only("kopfrechnen")).await.unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.apps[0].links_proposed, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM content_curriculum").await, 0);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    seed_content(&pool, 1, "kopfrechnen", json!("2+3=?"), true, false, 0, 0).await;

    let oracle = ScriptedOracle::new().reply(r#"{"1": 279}"#);
    let options = LinkingOptions {
        dry_run: true,
        ..only("kopfrechnen")
    };
    let report = run_linking(&pool, &oracle, &test_config(), &options).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.apps[0].proposed.len(), 1);
    assert_eq!(report.apps[0].links_inserted, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM content_curriculum").await, 0);
}

#[tokio::test]
async fn test_unmapped_and_empty_apps_are_skipped() {
    let pool = create_test_db().await;
    seed_curriculum(&pool).await;
    seed_content(&pool, 1, "kopfrechnen", json!("2+3=?"), true, false, 0, 0).await;
    seed_content(&pool, 2, "malen", json!("Male ein Haus"), true, false, 0, 0).await;
    seed_content(&pool, 3, "geometrie", json!("Dreieck?"), true, false, 0, 0).await;

    let oracle = ScriptedOracle::new().reply(r#"{"1": 279}"#);
    let report = run_linking(&pool, &oracle, &test_config(), &LinkingOptions::default())
        .await
        .unwrap();

    // geometrie has a mapping (MA.9) but no nodes under it; malen has no mapping
    let skipped: Vec<&str> = report.skipped_apps.iter().map(|s| s.app_id.as_str()).collect();
    assert_eq!(skipped, vec!["geometrie", "malen"]);
    assert_eq!(report.apps.len(), 1);
    assert_eq!(report.apps[0].app_id, "kopfrechnen");
    assert_eq!(oracle.call_count(), 1);
}
