//! Prompt construction for the three oracle-backed pipelines
//!
//! Every prompt demands a single JSON object so the strict decoders in
//! `oracle::response` can check the answer.

use crate::db::links::LinkedPair;
use crate::models::{ContentItem, CurriculumNode};
use serde_json::json;

pub const LINKING_SYSTEM_PROMPT: &str = "You classify educational exercises for primary school \
children against a curriculum. Answer with one JSON object only, no prose.";

pub const VALIDATION_SYSTEM_PROMPT: &str = "You judge whether a learning app can actually teach \
a curriculum competency. Answer with one JSON object only, no prose.";

pub const REVIEW_SYSTEM_PROMPT: &str = "You review AI-generated exercises for a children's \
learning platform for factual, arithmetic and spelling errors. Answer with one JSON object only, \
no prose.";

/// Batch classification prompt
///
/// Each item appears with its id and a payload summary capped at
/// `summary_chars`; every candidate node with id, code, title and
/// description.
pub fn build_linking_prompt(
    app_id: &str,
    items: &[ContentItem],
    nodes: &[CurriculumNode],
    summary_chars: usize,
) -> String {
    let items_json: Vec<_> = items
        .iter()
        .map(|item| json!({ "id": item.id, "content": item.summary(summary_chars) }))
        .collect();
    let nodes_json: Vec<_> = nodes
        .iter()
        .map(|node| {
            json!({
                "id": node.id,
                "code": node.code,
                "title": node.title,
                "description": node.description,
            })
        })
        .collect();

    format!(
        "App: {app}\n\n\
         Content items:\n{items}\n\n\
         Curriculum competencies:\n{nodes}\n\n\
         Assign exactly one competency to each content item: the most specific one that the \
         item practices. If none fits, use null.\n\
         Return JSON only, an object mapping each content item id (as a string) to the \
         competency id (integer) or null, for example {{\"12\": 279, \"13\": null}}.",
        app = app_id,
        items = serde_json::Value::Array(items_json),
        nodes = serde_json::Value::Array(nodes_json),
    )
}

/// Capability check prompt for one `(app, node)` pair
pub fn build_validation_prompt(capability_spec: &str, pair: &LinkedPair) -> String {
    format!(
        "App: {app}\n\n\
         What the app can and cannot do:\n{spec}\n\n\
         Competency {code}: {title}\n{description}\n\n\
         Can this app, within its stated capabilities, genuinely train this competency?\n\
         Return JSON only: {{\"valid\": true|false, \"reason\": \"short explanation\"}}.",
        app = pair.app_id,
        spec = capability_spec,
        code = pair.code,
        title = pair.title,
        description = pair.description,
    )
}

/// Quality review prompt for one content item
pub fn build_review_prompt(item: &ContentItem) -> String {
    format!(
        "App: {app}\n\n\
         Exercise (JSON):\n{payload}\n\n\
         Check the exercise for wrong answers, wrong facts, spelling and grammar mistakes, and \
         content unsuitable for children.\n\
         Spelling tolerance: German umlauts and sharp s may be written in ASCII \
         (\"ae\" for \"ä\", \"oe\" for \"ö\", \"ue\" for \"ü\", \"ss\" for \"ß\"). These spellings \
         are acceptable and must not be flagged.\n\
         Return JSON only: {{\"status\": \"PASS\"}} if the exercise is correct, otherwise \
         {{\"status\": \"FAILED\", \"reason\": \"what is wrong\", \"correction\": \"the fix\"}}.",
        app = item.app_id,
        payload = item.data,
    )
}
