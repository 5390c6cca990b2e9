//! Configuration and request types for the operation set
//!
//! Request types double as the JSON input of both surfaces: the REST adapter
//! deserializes them from the body, the ability bridge validates them against
//! their JSON schema first.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use dn_artifact::{etag, Block, DocId};
use dn_store::{CatalogQuery, InsertMode, InsertRequest, StatusFilter};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default sampling temperature for suggestions and summaries
pub const DEFAULT_SUGGEST_TEMPERATURE: f32 = 0.2;
/// Default sampling temperature for titles
pub const DEFAULT_TITLE_TEMPERATURE: f32 = 0.3;
/// Default heading of the inserted summary section
pub const DEFAULT_SUMMARY_HEADING: &str = "Summary";
/// Shortest allowed title length cap
pub const MIN_TITLE_LEN: usize = 10;
/// Longest allowed title length cap
pub const MAX_TITLE_LEN: usize = 120;

/// Stop words excluded from heuristic tags
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "being", "their", "there", "these", "those", "which",
    "where", "while", "with", "your", "from", "that", "this", "have", "will", "would", "could",
    "should", "because", "through", "between", "among", "into", "other", "than",
];

/// Local fallback summarizer parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Words kept in the summary
    pub summary_words: usize,
    /// Maximum number of tags
    pub max_tags: usize,
    /// Minimum tag length in characters
    pub min_tag_len: usize,
    /// Words never used as tags
    pub stop_words: Vec<String>,
}

impl HeuristicConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With summary length
    #[inline]
    #[must_use]
    pub fn with_summary_words(mut self, words: usize) -> Self {
        self.summary_words = words;
        self
    }

    /// With tag limits
    #[inline]
    #[must_use]
    pub fn with_tags(mut self, max_tags: usize, min_tag_len: usize) -> Self {
        self.max_tags = max_tags;
        self.min_tag_len = min_tag_len;
        self
    }

    /// With stop words
    #[must_use]
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = words.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            summary_words: 120,
            max_tags: 5,
            min_tag_len: 5,
            stop_words: DEFAULT_STOP_WORDS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Prompt size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Characters of core text sent for summaries
    pub summary_snippet_chars: usize,
    /// Characters of core text sent for titles
    pub title_snippet_chars: usize,
    /// Title length cap when the caller gives none
    pub default_title_max_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            summary_snippet_chars: 6000,
            title_snippet_chars: 600,
            default_title_max_len: 70,
        }
    }
}

/// Operation set configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    /// Heuristic fallback parameters
    pub heuristic: HeuristicConfig,
    /// Prompt limits
    pub limits: Limits,
}

impl OpsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With heuristic parameters
    #[inline]
    #[must_use]
    pub fn with_heuristic(mut self, heuristic: HeuristicConfig) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// With prompt limits
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Clamp a sampling temperature to `[0, 1]`, substituting `default` for
/// missing or non-finite values
#[must_use]
pub fn clamp_temperature(value: Option<f32>, default: f32) -> f32 {
    match value {
        Some(t) if t.is_finite() => t.clamp(0.0, 1.0),
        _ => default,
    }
}

/// Clamp a title length cap to `[10, 120]`
#[must_use]
pub fn clamp_title_len(value: Option<i64>, default: usize) -> usize {
    let raw = value.unwrap_or(i64::try_from(default).unwrap_or(i64::MAX));
    let clamped = raw.clamp(MIN_TITLE_LEN as i64, MAX_TITLE_LEN as i64);
    usize::try_from(clamped).unwrap_or(MAX_TITLE_LEN)
}

/// Block insertion input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsertInput {
    /// Target document
    #[schemars(with = "u64", range(min = 1))]
    pub post_id: DocId,
    /// Insert mode
    #[serde(default)]
    pub insert: InsertMode,
    /// Position for `index` mode; negative values clamp to 0
    #[serde(default)]
    pub index: Option<i64>,
    /// Single block
    #[serde(default)]
    #[schemars(with = "Option<serde_json::Value>")]
    pub block: Option<Block>,
    /// Several blocks; wins over `block`
    #[serde(default)]
    #[schemars(with = "Option<Vec<serde_json::Value>>")]
    pub blocks: Option<Vec<Block>>,
    /// Precondition token (ability surface only; REST uses the header)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_match: Option<String>,
}

impl InsertInput {
    /// Append blocks to a document
    #[must_use]
    pub fn append(post_id: DocId, blocks: Vec<Block>) -> Self {
        Self {
            post_id,
            insert: InsertMode::Append,
            index: None,
            block: None,
            blocks: Some(blocks),
            if_match: None,
        }
    }

    /// With precondition token
    #[inline]
    #[must_use]
    pub fn with_if_match(mut self, token: impl Into<String>) -> Self {
        self.if_match = Some(token.into());
        self
    }

    /// Resolve to a store request
    ///
    /// # Errors
    /// - `InvalidInput` if neither `block` nor `blocks` carries a block, or
    ///   if `insert` is `index` without an `index`
    pub fn to_request(&self) -> Result<InsertRequest, crate::OperationError> {
        let blocks = match (&self.blocks, &self.block) {
            (Some(blocks), _) => blocks.clone(),
            (None, Some(block)) => vec![block.clone()],
            (None, None) => Vec::new(),
        };
        if blocks.is_empty() {
            return Err(crate::OperationError::InvalidInput(
                "at least one block is required".to_string(),
            ));
        }
        if self.insert == InsertMode::Index && self.index.is_none() {
            return Err(crate::OperationError::InvalidInput(
                "index is required for insert=index".to_string(),
            ));
        }
        let index = self
            .index
            .map(|i| usize::try_from(i.max(0)).unwrap_or(usize::MAX));
        Ok(InsertRequest {
            mode: self.insert,
            index,
            blocks,
        })
    }
}

/// Catalog listing input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogInput {
    /// Only documents modified strictly after this time
    /// (RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]`, UTC)
    #[serde(default)]
    pub since: Option<String>,
    /// `draft`, `publish` or `any`; anything else means `any`
    #[serde(default)]
    pub status: Option<String>,
    /// Content types; defaults to `post` and `page`
    #[serde(default)]
    pub types: Option<Vec<String>>,
}

impl CatalogInput {
    /// Resolve to a store query
    ///
    /// # Errors
    /// - `InvalidInput` if `since` is not a recognised timestamp
    pub fn to_query(&self) -> Result<CatalogQuery, crate::OperationError> {
        let since = etag::non_empty(self.since.as_deref())
            .map(parse_since)
            .transpose()?;
        let mut query = CatalogQuery {
            since,
            status: StatusFilter::parse_lenient(self.status.as_deref()),
            ..CatalogQuery::default()
        };
        if let Some(types) = self.types.as_ref().filter(|t| !t.is_empty()) {
            query.types.clone_from(types);
        }
        Ok(query)
    }
}

/// Parse a catalog `since` value as UTC
///
/// # Errors
/// - `InvalidInput` if no supported format matches
pub fn parse_since(raw: &str) -> Result<DateTime<Utc>, crate::OperationError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| crate::OperationError::InvalidInput(format!("unrecognised since: {raw}")))
}

/// Suggestion input (read only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SuggestInput {
    /// Sampling temperature, clamped to `[0, 1]`
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Preferred models, in order
    #[serde(default)]
    pub model_pref: Option<Vec<String>>,
}

/// Agentic summarize input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummarizeInput {
    /// Target document
    #[schemars(with = "u64", range(min = 1))]
    pub post_id: DocId,
    /// Heading of the inserted section
    #[serde(default)]
    pub heading: Option<String>,
    /// Sampling temperature, clamped to `[0, 1]`
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Preferred models, in order
    #[serde(default)]
    pub model_pref: Option<Vec<String>>,
    /// Precondition token (ability surface only; REST uses the header)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_match: Option<String>,
}

impl SummarizeInput {
    /// Summarize with defaults
    #[must_use]
    pub fn new(post_id: DocId) -> Self {
        Self {
            post_id,
            heading: None,
            temperature: None,
            model_pref: None,
            if_match: None,
        }
    }

    /// With precondition token
    #[inline]
    #[must_use]
    pub fn with_if_match(mut self, token: impl Into<String>) -> Self {
        self.if_match = Some(token.into());
        self
    }
}

/// Title generation input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleInput {
    /// Target document
    #[schemars(with = "u64", range(min = 1))]
    pub post_id: DocId,
    /// Sampling temperature, clamped to `[0, 1]`
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Preferred models, in order
    #[serde(default)]
    pub model_pref: Option<Vec<String>>,
    /// Title length cap, clamped to `[10, 120]`
    #[serde(default)]
    pub max_len: Option<i64>,
    /// Precondition token (ability surface only; REST uses the header)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_match: Option<String>,
}

impl TitleInput {
    /// Title generation with defaults
    #[must_use]
    pub fn new(post_id: DocId) -> Self {
        Self {
            post_id,
            temperature: None,
            model_pref: None,
            max_len: None,
            if_match: None,
        }
    }

    /// With precondition token
    #[inline]
    #[must_use]
    pub fn with_if_match(mut self, token: impl Into<String>) -> Self {
        self.if_match = Some(token.into());
        self
    }
}
