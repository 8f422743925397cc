//! Field extraction strategies
//!
//! Two interchangeable ways of turning an upstream issue into [`IssueFields`]:
//!
//! - [`FreeTextStrategy`] reads `key: value` markers out of the issue body and
//!   rejects issues that lack any of them.
//! - [`LabelStrategy`] classifies the label set, takes the language from
//!   repository metadata and detects the tech stack in the title and body.
//!   It never rejects an issue.
//!
//! Exactly one strategy is active for a reconciler.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classify;
use crate::error::SyncError;
use crate::types::{ExperienceLevel, IssueFields, IssueType, UpstreamIssue};

/// Repository-level facts available to a strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoContext {
    /// Primary language reported by repository metadata
    pub primary_language: Option<String>,
}

/// Turns one upstream issue into structured fields
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and configuration
    fn name(&self) -> &'static str;

    /// Whether the reconciler should fetch repository metadata for this strategy
    fn needs_repository_language(&self) -> bool {
        false
    }

    /// Extract fields, or explain why the issue cannot be stored
    fn extract(&self, issue: &UpstreamIssue, ctx: &RepoContext) -> Result<IssueFields, SyncError>;
}

/// Which strategy a deployment runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Labels,
    FreeText,
}

impl StrategyKind {
    /// Build the strategy object for this kind
    pub fn build(self) -> Box<dyn ExtractionStrategy> {
        match self {
            StrategyKind::Labels => Box::new(LabelStrategy),
            StrategyKind::FreeText => Box::new(FreeTextStrategy),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Labels => "labels",
            StrategyKind::FreeText => "free-text",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "labels" | "label" => Ok(StrategyKind::Labels),
            "free-text" | "free_text" | "freetext" => Ok(StrategyKind::FreeText),
            other => Err(crate::Error::Parse(format!(
                "unknown extraction strategy: {} (expected labels or free-text)",
                other
            ))),
        }
    }
}

/// Marker keys in the order they are reported when missing
pub const EXPERIENCE_KEY: &str = "experience";
pub const LANGUAGE_KEY: &str = "language";
pub const EXPECTED_TIME_KEY: &str = "expected-time";
pub const TECH_STACK_KEY: &str = "technology-stack";

/// Body-marker extraction
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeTextStrategy;

impl ExtractionStrategy for FreeTextStrategy {
    fn name(&self) -> &'static str {
        "free-text"
    }

    fn extract(&self, issue: &UpstreamIssue, _ctx: &RepoContext) -> Result<IssueFields, SyncError> {
        let body = issue.body.as_deref().unwrap_or_default().to_lowercase();

        let experience = find_marker(&body, EXPERIENCE_KEY);
        let language = find_marker(&body, LANGUAGE_KEY);
        let expected_time = find_marker(&body, EXPECTED_TIME_KEY);
        let tech_stack = find_marker(&body, TECH_STACK_KEY);

        let level = ExperienceLevel::from_str(&experience).ok();

        let mut missing = Vec::new();
        if level.is_none() {
            missing.push(EXPERIENCE_KEY);
        }
        if language.is_empty() {
            missing.push(LANGUAGE_KEY);
        }
        if expected_time.is_empty() {
            missing.push(EXPECTED_TIME_KEY);
        }
        if tech_stack.is_empty() {
            missing.push(TECH_STACK_KEY);
        }

        match level {
            Some(experience_needed) if missing.is_empty() => Ok(IssueFields {
                experience_needed,
                issue_type: IssueType::Unclassified,
                language,
                tech_stack,
                expected_time,
            }),
            _ => Err(SyncError::ExtractionIncomplete {
                issue_id: issue.id,
                missing,
            }),
        }
    }
}

/// Value following the first occurrence of `key`, up to the end of that line
///
/// `body` must already be lower-cased. Returns an empty string when the key
/// does not occur.
pub fn find_marker(body: &str, key: &str) -> String {
    let Some(pos) = body.find(key) else {
        return String::new();
    };
    let rest = &body[pos + key.len()..];
    let line = rest.split('\n').next().unwrap_or_default();
    let line = line.trim_end_matches('\r');
    let value = line.strip_prefix(": ").or_else(|| line.strip_prefix(':')).unwrap_or(line);
    value.trim().to_string()
}

/// Label-set classification
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelStrategy;

impl ExtractionStrategy for LabelStrategy {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn needs_repository_language(&self) -> bool {
        true
    }

    fn extract(&self, issue: &UpstreamIssue, ctx: &RepoContext) -> Result<IssueFields, SyncError> {
        let classification = classify::classify(issue.label_names());

        Ok(IssueFields {
            experience_needed: classification.experience.unwrap_or_default(),
            issue_type: classification.issue_type.unwrap_or_default(),
            language: ctx
                .primary_language
                .as_deref()
                .map(|l| l.trim().to_lowercase())
                .unwrap_or_default(),
            tech_stack: detected_tech_stack(issue),
            expected_time: String::new(),
        })
    }
}

/// Known technologies named in the title or body, lower-cased and comma-joined
fn detected_tech_stack(issue: &UpstreamIssue) -> String {
    let text = format!("{}\n{}", issue.title, issue.body.as_deref().unwrap_or_default());
    classify::detect_technologies(&text)
        .into_iter()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(", ")
}
