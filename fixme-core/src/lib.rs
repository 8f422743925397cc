//! fixme core - issue ingestion pipeline
//!
//! This crate holds the domain model, label classification, field extraction
//! strategies and the reconciler that keeps stored issues in step with the
//! upstream issue tracker.

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod secrets;
pub mod sync;
pub mod types;

pub use config::{CliOverrides, Config};
pub use error::{Error, Result, SyncError};
pub use extract::{ExtractionStrategy, FreeTextStrategy, LabelStrategy, RepoContext, StrategyKind};
pub use secrets::Secrets;
pub use sync::{
    FetchError, FetchErrorKind, FetchResult, IssueSource, IssueStore, PassSummary, Reconciler,
    RepoSummary, StoreResult, UpsertOutcome,
};
pub use types::{
    ExperienceLevel, IssueFields, IssueRecord, IssueState, IssueType, LabelRecord, RepoRef,
    TrackedRepository, UpstreamIssue, UpstreamLabel,
};
