//! Keyword routing of queries to a cheaper or a stronger model.
//!
//! The check is a plain substring match against a fixed phrase list. It keeps
//! no state and never calls a model.

use crate::pricing::{HAIKU_GLOBAL, SONNET_GLOBAL};
use serde::{Deserialize, Serialize};

/// Phrases that mark a query as simple.
pub const SIMPLE_PATTERNS: &[&str] = &[
    "return policy",
    "warranty",
    "price",
    "hours",
    "shipping",
    "what is",
    "how much",
    "when does",
    "do you have",
    "can i return",
];

/// Query complexity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Simple,
    Complex,
}

impl QueryComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryComplexity::Simple => "simple",
            QueryComplexity::Complex => "complex",
        }
    }
}

impl std::fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simple if the lowercased query contains any [`SIMPLE_PATTERNS`] phrase.
pub fn classify_query(query: &str) -> QueryComplexity {
    let query = query.to_lowercase();
    if SIMPLE_PATTERNS.iter().any(|p| query.contains(*p)) {
        QueryComplexity::Simple
    } else {
        QueryComplexity::Complex
    }
}

/// Model pair used for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRoute {
    pub simple_model: String,
    pub complex_model: String,
}

impl ModelRoute {
    pub fn new(simple_model: impl Into<String>, complex_model: impl Into<String>) -> Self {
        Self {
            simple_model: simple_model.into(),
            complex_model: complex_model.into(),
        }
    }

    /// Model id for a complexity class.
    pub fn model_for(&self, complexity: QueryComplexity) -> &str {
        match complexity {
            QueryComplexity::Simple => &self.simple_model,
            QueryComplexity::Complex => &self.complex_model,
        }
    }

    /// Classify `query` and pick its model.
    pub fn route(&self, query: &str) -> &str {
        self.model_for(classify_query(query))
    }
}

impl Default for ModelRoute {
    /// Haiku for simple queries, Sonnet for the rest.
    fn default() -> Self {
        Self::new(HAIKU_GLOBAL, SONNET_GLOBAL)
    }
}
