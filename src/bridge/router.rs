// Nyseal — Query routing
//
// Decides whether a free-text query needs symbolic routing, and if so turns
// it into a structured QueryPacket seeded with focus glyph names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::glyph::Glyph;

pub const DEFAULT_KEYWORDS: [&str; 19] = [
    "meaning",
    "paradox",
    "contradiction",
    "self",
    "purpose",
    "transformation",
    "symbol",
    "recursive",
    "resonance",
    "inner",
    "resolve",
    "archetype",
    "dissonance",
    "shadow",
    "doubt",
    "belief",
    "loss",
    "grief",
    "silence",
];

/// Focus seeds by trigger word, checked in order.
const FOCUS_RULES: [(&str, [&str; 2]); 4] = [
    ("contradiction", ["Treyl", "Thyrel"]),
    ("paradox", ["Treyl", "Elken"]),
    ("meaning", ["Elun", "Depth"]),
    ("self", ["Self", "Shadow"]),
];

const FALLBACK_FOCUS: &str = "Elun";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub max_steps: u32,
    pub avoid: Vec<String>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_steps: 6,
            avoid: Vec::new(),
        }
    }
}

/// Structured symbolic query. Missing fields take the router defaults, so a
/// trace file only needs `focus` and `context`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPacket {
    pub intent: String,
    pub focus: Vec<String>,
    pub tone: String,
    pub depth: String,
    pub constraints: Constraints,
    pub context: String,
    pub mode: String,
    pub return_format: String,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for QueryPacket {
    fn default() -> Self {
        Self {
            intent: "investigate".into(),
            focus: Vec::new(),
            tone: "reflective".into(),
            depth: "recursive".into(),
            constraints: Constraints::default(),
            context: String::new(),
            mode: "symbolic".into(),
            return_format: "enriched_summary".into(),
            origin: "LLM_plugin".into(),
            user_id: None,
        }
    }
}

/// What the bridge made of a packet.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub packet: QueryPacket,
    pub resolved: Vec<Glyph>,
    pub unresolved: Vec<String>,
    pub handled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Bypass { message: String },
    Routed(QueryResponse),
}

impl QueryOutcome {
    pub fn is_routed(&self) -> bool {
        matches!(self, QueryOutcome::Routed(_))
    }
}

// ─── Router ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct QueryRouter {
    keywords: Vec<String>,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::with_keywords(DEFAULT_KEYWORDS)
    }
}

impl QueryRouter {
    pub fn with_keywords<I, K>(keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Substring match of any keyword, case-insensitive.
    pub fn should_route(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.keywords.iter().any(|k| query.contains(k.as_str()))
    }

    pub fn infer_focus(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        FOCUS_RULES
            .iter()
            .find(|(trigger, _)| query.contains(trigger))
            .map(|(_, seeds)| seeds.iter().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| vec![FALLBACK_FOCUS.to_string()])
    }

    pub fn build_packet(&self, query: &str) -> QueryPacket {
        QueryPacket {
            focus: self.infer_focus(query),
            context: query.to_string(),
            ..QueryPacket::default()
        }
    }

    /// `Some(packet)` when the query should be routed.
    pub fn route(&self, query: &str) -> Option<QueryPacket> {
        self.should_route(query).then(|| self.build_packet(query))
    }
}
