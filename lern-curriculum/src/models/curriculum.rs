//! Curriculum taxonomy and content rows

use serde::{Deserialize, Serialize};

/// Taxonomy depth, coarse grouping down to the linkable leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLevel {
    Subject,
    Domain,
    CompetencyArea,
    Competency,
    /// Leaf level; the only level content is linked against
    CompetencyStage,
}

impl NodeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLevel::Subject => "subject",
            NodeLevel::Domain => "domain",
            NodeLevel::CompetencyArea => "competency_area",
            NodeLevel::Competency => "competency",
            NodeLevel::CompetencyStage => "competency_stage",
        }
    }
}

impl std::str::FromStr for NodeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject" => Ok(NodeLevel::Subject),
            "domain" => Ok(NodeLevel::Domain),
            "competency_area" => Ok(NodeLevel::CompetencyArea),
            "competency" => Ok(NodeLevel::Competency),
            "competency_stage" => Ok(NodeLevel::CompetencyStage),
            other => Err(format!("unknown curriculum level: {}", other)),
        }
    }
}

/// One taxonomy entry (reference data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumNode {
    pub id: i64,
    /// Dotted hierarchical key, e.g. `MA.1.A.3.a`
    pub code: String,
    pub title: String,
    pub description: String,
    pub level: NodeLevel,
}

/// Content row as seen by this subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub app_id: String,
    /// Opaque structured payload
    pub data: serde_json::Value,
    pub ai_generated: bool,
    pub human_verified: bool,
    pub ai_reviewed_counter: i64,
    pub flag_counter: i64,
}

impl ContentItem {
    /// Compact payload dump capped at `max_chars` characters
    ///
    /// Cuts on a char boundary and marks the cut with `…`.
    pub fn summary(&self, max_chars: usize) -> String {
        let dump = match &self.data {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        if dump.chars().count() <= max_chars {
            return dump;
        }

        let mut cut: String = dump.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }

    /// Feedback pointer for this row
    pub fn target_id(&self) -> String {
        format!("content:{}", self.id)
    }
}

/// `(content, node)` link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentLink {
    pub content_id: i64,
    pub node_id: i64,
}
