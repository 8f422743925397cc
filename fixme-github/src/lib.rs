//! fixme GitHub - upstream issue fetching
//!
//! This crate provides the read-only GitHub REST client that the
//! reconciler polls for issues and repository metadata.

mod client;
mod error;
mod issues;

pub use client::{GitHubClient, RateLimit};
pub use error::{Error, Result};
pub use issues::RepositoryMetadata;
