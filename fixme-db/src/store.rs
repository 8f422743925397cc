//! [`IssueStore`] backed by the SQLite database

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fixme_core::{
    IssueRecord, IssueStore, LabelRecord, StoreResult, TrackedRepository, UpsertOutcome,
};

use crate::Database;

#[async_trait]
impl IssueStore for Database {
    async fn tracked_repositories(&self) -> StoreResult<Vec<TrackedRepository>> {
        Ok(self.repositories().list().await?)
    }

    async fn upsert_issue(&self, issue: &IssueRecord) -> StoreResult<UpsertOutcome> {
        Ok(self.issues().upsert(issue).await?)
    }

    async fn delete_issue(&self, issue_id: i64) -> StoreResult<()> {
        Ok(self.issues().delete(issue_id).await?)
    }

    async fn upsert_label(&self, label: &LabelRecord) -> StoreResult<()> {
        Ok(self
            .issues()
            .upsert_label(label.label_id, &label.name, &label.color, &label.url)
            .await?)
    }

    async fn attach_label(&self, issue_id: i64, label_id: i64) -> StoreResult<()> {
        Ok(self.issues().attach_label(issue_id, label_id).await?)
    }

    async fn mark_parsed(&self, repository_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        Ok(self.repositories().mark_parsed(repository_id, at).await?)
    }
}
