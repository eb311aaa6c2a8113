//! Scripted oracle responders

use lern_curriculum::oracle::OracleError;

/// Content ids listed in a linking prompt
pub fn batch_content_ids(user_prompt: &str) -> Vec<i64> {
    let items_line = user_prompt
        .lines()
        .skip_while(|line| !line.starts_with("Content items:"))
        .nth(1)
        .unwrap_or("[]");

    let items: Vec<serde_json::Value> = serde_json::from_str(items_line).unwrap_or_default();
    items.iter().filter_map(|item| item["id"].as_i64()).collect()
}

/// Responder assigning every item of a batch to `node_id`
pub fn assign_all_to(node_id: i64) -> impl Fn(&str, &str) -> Result<String, OracleError> + Send + Sync + 'static {
    move |_system, user| {
        let map: serde_json::Map<String, serde_json::Value> = batch_content_ids(user)
            .into_iter()
            .map(|id| (id.to_string(), serde_json::Value::from(node_id)))
            .collect();
        Ok(serde_json::Value::Object(map).to_string())
    }
}
