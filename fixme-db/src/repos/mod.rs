//! Repository modules for database operations

pub mod issues;
pub mod projects;
pub mod repositories;

pub use issues::IssueRepository;
pub use projects::ProjectRepository;
pub use repositories::TrackedRepositories;
