//! Converges stored issues with upstream state

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::extract::{ExtractionStrategy, RepoContext};
use crate::types::{IssueRecord, LabelRecord, TrackedRepository, UpstreamIssue};

use super::{IssueSource, IssueStore, PassSummary, RepoSummary, UpsertOutcome};

const DEFAULT_CONCURRENCY: usize = 4;

/// Runs reconciliation passes over all tracked repositories
pub struct Reconciler {
    source: Arc<dyn IssueSource>,
    store: Arc<dyn IssueStore>,
    strategy: Arc<dyn ExtractionStrategy>,
    concurrency: usize,
    fetch_language: bool,
    /// One async lock per repository id so overlapping passes never interleave
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn IssueSource>,
        store: Arc<dyn IssueStore>,
        strategy: Arc<dyn ExtractionStrategy>,
    ) -> Self {
        Self {
            source,
            store,
            strategy,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_language: true,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Maximum number of repositories reconciled at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Whether to query repository metadata when the strategy wants a language
    pub fn with_language_lookup(mut self, enabled: bool) -> Self {
        self.fetch_language = enabled;
        self
    }

    pub fn strategy(&self) -> &dyn ExtractionStrategy {
        self.strategy.as_ref()
    }

    /// Reconcile every tracked repository once
    pub async fn run_pass(&self) -> PassSummary {
        let repositories = match self.store.tracked_repositories().await {
            Ok(repos) => repos,
            Err(e) => {
                warn!(error = %e, "Failed to list tracked repositories");
                return PassSummary {
                    repositories: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        info!(
            count = repositories.len(),
            strategy = self.strategy.name(),
            "Starting reconciliation pass"
        );

        let mut summaries: Vec<RepoSummary> = stream::iter(repositories.iter())
            .map(|repo| self.reconcile_repository(repo))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        summaries.sort_by(|a, b| a.repository.cmp(&b.repository));

        PassSummary {
            repositories: summaries,
            error: None,
        }
    }

    /// Fetch and reconcile one repository
    ///
    /// Fetch failures, including a failed language lookup when the strategy
    /// needs one, are recorded in the summary and leave storage untouched.
    pub async fn reconcile_repository(&self, repo: &TrackedRepository) -> RepoSummary {
        let lock = self.repository_lock(repo.id);
        let _guard = lock.lock().await;

        let repo_ref = repo.repo_ref();
        let mut summary = RepoSummary::new(repo_ref.to_string());

        let issues = match self.source.fetch_issues(&repo_ref).await {
            Ok(issues) => issues,
            Err(e) => {
                warn!(repository = %repo_ref, error = %e, "Skipping repository this cycle");
                summary.error = Some(e.to_string());
                return summary;
            }
        };

        let mut ctx = RepoContext::default();
        if self.fetch_language && self.strategy.needs_repository_language() {
            match self.source.fetch_primary_language(&repo_ref).await {
                Ok(language) => ctx.primary_language = language,
                Err(e) => {
                    warn!(
                        repository = %repo_ref,
                        error = %e,
                        "Primary language unavailable, skipping repository this cycle"
                    );
                    summary.error = Some(e.to_string());
                    return summary;
                }
            }
        }

        self.reconcile_issues(repo, &issues, &ctx, &mut summary).await;

        if let Err(e) = self.store.mark_parsed(repo.id, Utc::now()).await {
            warn!(repository = %repo_ref, error = %e, "Failed to record last parse time");
        }

        info!(
            repository = %repo_ref,
            fetched = summary.fetched,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            rejected = summary.rejected,
            failed = summary.failed,
            "Repository reconciled"
        );
        summary
    }

    /// Apply already-fetched issues to storage
    pub async fn reconcile_issues(
        &self,
        repo: &TrackedRepository,
        issues: &[UpstreamIssue],
        ctx: &RepoContext,
        summary: &mut RepoSummary,
    ) {
        summary.fetched += issues.len();
        for issue in issues {
            if issue.is_open_issue() {
                self.store_open_issue(repo, issue, ctx, summary).await;
            } else {
                self.remove_issue(issue, summary).await;
            }
        }
    }

    async fn remove_issue(&self, issue: &UpstreamIssue, summary: &mut RepoSummary) {
        match self.store.delete_issue(issue.id).await {
            Ok(()) => {
                debug!(issue_id = issue.id, "Deleted closed issue");
                summary.deleted += 1;
            }
            Err(SyncError::StorageConflict(_)) => {
                summary.skipped += 1;
            }
            Err(e) => {
                warn!(issue_id = issue.id, error = %e, "Failed to delete closed issue");
                summary.failed += 1;
            }
        }
    }

    async fn store_open_issue(
        &self,
        repo: &TrackedRepository,
        issue: &UpstreamIssue,
        ctx: &RepoContext,
        summary: &mut RepoSummary,
    ) {
        let fields = match self.strategy.extract(issue, ctx) {
            Ok(fields) => fields,
            Err(e) => {
                info!(issue_id = issue.id, reason = %e, "Issue is not valid for this system");
                summary.rejected += 1;
                return;
            }
        };

        let record = IssueRecord::new(repo.id, issue, fields);
        match self.store.upsert_issue(&record).await {
            Ok(UpsertOutcome::Created) => summary.created += 1,
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(e) => {
                warn!(issue_id = issue.id, error = %e, "Failed to store issue");
                summary.failed += 1;
                return;
            }
        }

        for label in &issue.labels {
            let label = match LabelRecord::try_from(label) {
                Ok(label) => label,
                Err(reason) => {
                    let err = SyncError::LabelParseFailure {
                        issue_id: issue.id,
                        reason,
                    };
                    warn!(error = %err, "Skipping label");
                    continue;
                }
            };

            if let Err(e) = self.store.upsert_label(&label).await {
                warn!(issue_id = issue.id, label_id = label.label_id, error = %e, "Failed to store label");
                continue;
            }
            if let Err(e) = self.store.attach_label(issue.id, label.label_id).await {
                warn!(issue_id = issue.id, label_id = label.label_id, error = %e, "Failed to attach label");
            }
        }
    }

    fn repository_lock(&self, repository_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(repository_id).or_default().clone()
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("strategy", &self.strategy.name())
            .field("concurrency", &self.concurrency)
            .field("fetch_language", &self.fetch_language)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{FreeTextStrategy, LabelStrategy};
    use crate::sync::{FetchError, FetchResult, StoreResult};
    use crate::types::{ExperienceLevel, IssueState, IssueType, RepoRef, UpstreamLabel};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeSource {
        issues: Mutex<HashMap<RepoRef, FetchResult<Vec<UpstreamIssue>>>>,
        language: Option<String>,
    }

    impl FakeSource {
        fn set(&self, repo: &str, result: FetchResult<Vec<UpstreamIssue>>) {
            self.issues
                .lock()
                .unwrap()
                .insert(RepoRef::parse(repo).unwrap(), result);
        }
    }

    #[async_trait]
    impl IssueSource for FakeSource {
        async fn fetch_issues(&self, repo: &RepoRef) -> FetchResult<Vec<UpstreamIssue>> {
            self.issues
                .lock()
                .unwrap()
                .get(repo)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::upstream(404, "Not Found")))
        }

        async fn fetch_primary_language(&self, _repo: &RepoRef) -> FetchResult<Option<String>> {
            Ok(self.language.clone())
        }
    }

    /// Source that tracks how many fetches are in flight at once
    #[derive(Default)]
    struct SlowSource {
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IssueSource for SlowSource {
        async fn fetch_issues(&self, _repo: &RepoRef) -> FetchResult<Vec<UpstreamIssue>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![upstream(90, IssueState::Open, &[])])
        }

        async fn fetch_primary_language(&self, _repo: &RepoRef) -> FetchResult<Option<String>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct State {
        issues: BTreeMap<i64, IssueRecord>,
        labels: BTreeMap<i64, LabelRecord>,
        links: BTreeSet<(i64, i64)>,
        parsed: BTreeSet<i64>,
    }

    #[derive(Default)]
    struct MemoryStore {
        repos: Vec<TrackedRepository>,
        state: Mutex<State>,
    }

    #[async_trait]
    impl IssueStore for MemoryStore {
        async fn tracked_repositories(&self) -> StoreResult<Vec<TrackedRepository>> {
            Ok(self.repos.clone())
        }

        async fn upsert_issue(&self, issue: &IssueRecord) -> StoreResult<UpsertOutcome> {
            let mut state = self.state.lock().unwrap();
            Ok(match state.issues.insert(issue.issue_id, issue.clone()) {
                Some(_) => UpsertOutcome::Updated,
                None => UpsertOutcome::Created,
            })
        }

        async fn delete_issue(&self, issue_id: i64) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            state.links.retain(|(i, _)| *i != issue_id);
            state
                .issues
                .remove(&issue_id)
                .map(|_| ())
                .ok_or_else(|| SyncError::StorageConflict(format!("issue {} absent", issue_id)))
        }

        async fn upsert_label(&self, label: &LabelRecord) -> StoreResult<()> {
            self.state
                .lock()
                .unwrap()
                .labels
                .insert(label.label_id, label.clone());
            Ok(())
        }

        async fn attach_label(&self, issue_id: i64, label_id: i64) -> StoreResult<()> {
            self.state.lock().unwrap().links.insert((issue_id, label_id));
            Ok(())
        }

        async fn mark_parsed(&self, repository_id: i64, _at: DateTime<Utc>) -> StoreResult<()> {
            self.state.lock().unwrap().parsed.insert(repository_id);
            Ok(())
        }
    }

    fn tracked(id: i64, owner: &str, name: &str) -> TrackedRepository {
        TrackedRepository {
            id,
            owner: owner.into(),
            name: name.into(),
            url: RepoRef::new(owner, name).html_url(),
            project_id: None,
            created_at: Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap(),
            last_parsed: None,
        }
    }

    fn upstream(id: i64, state: IssueState, labels: &[(i64, &str)]) -> UpstreamIssue {
        UpstreamIssue {
            id,
            number: id % 1000,
            title: format!("Issue {}", id),
            body: None,
            html_url: format!("https://github.com/o/r/issues/{}", id % 1000),
            state,
            created_at: Utc.with_ymd_and_hms(2017, 6, 5, 10, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2017, 6, 6, 10, 0, 0).unwrap(),
            labels: labels
                .iter()
                .map(|(lid, name)| UpstreamLabel {
                    id: Some(*lid),
                    name: Some(name.to_string()),
                    url: Some(format!("https://api.github.com/labels/{}", lid)),
                    color: Some("ededed".into()),
                })
                .collect(),
            pull_request: None,
        }
    }

    fn reconciler(
        source: Arc<FakeSource>,
        store: Arc<MemoryStore>,
        strategy: Arc<dyn ExtractionStrategy>,
    ) -> Reconciler {
        Reconciler::new(source, store, strategy)
    }

    #[tokio::test]
    async fn test_open_issue_is_stored_with_classification() {
        let source = Arc::new(FakeSource {
            language: Some("Rust".into()),
            ..Default::default()
        });
        source.set(
            "o/r",
            Ok(vec![upstream(233564738, IssueState::Open, &[(1, "enhancement")])]),
        );
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });

        let summary = reconciler(source, store.clone(), Arc::new(LabelStrategy))
            .run_pass()
            .await;

        assert_eq!(summary.total_created(), 1);
        let state = store.state.lock().unwrap();
        let stored = &state.issues[&233564738];
        assert_eq!(stored.issue_type, IssueType::Enhancement);
        assert_eq!(stored.language, "rust");
        assert!(state.links.contains(&(233564738, 1)));
        assert!(state.parsed.contains(&1));
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let source = Arc::new(FakeSource::default());
        source.set(
            "o/r",
            Ok(vec![
                upstream(10, IssueState::Open, &[(1, "bug"), (2, "easy")]),
                upstream(11, IssueState::Open, &[(1, "bug")]),
            ]),
        );
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });
        let reconciler = reconciler(source, store.clone(), Arc::new(LabelStrategy));

        reconciler.run_pass().await;
        let (issues, labels, links) = {
            let s = store.state.lock().unwrap();
            (s.issues.clone(), s.labels.clone(), s.links.clone())
        };

        let second = reconciler.run_pass().await;
        assert_eq!(second.total_created(), 0);
        assert_eq!(second.total_updated(), 2);

        let s = store.state.lock().unwrap();
        assert_eq!(s.issues, issues);
        assert_eq!(s.labels, labels);
        assert_eq!(s.links, links);
        assert_eq!(s.links.len(), 3);
    }

    #[tokio::test]
    async fn test_closed_issue_is_removed_on_next_pass() {
        let source = Arc::new(FakeSource::default());
        source.set("o/r", Ok(vec![upstream(20, IssueState::Open, &[])]));
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });
        let reconciler = reconciler(source.clone(), store.clone(), Arc::new(LabelStrategy));

        reconciler.run_pass().await;
        assert!(store.state.lock().unwrap().issues.contains_key(&20));

        source.set("o/r", Ok(vec![upstream(20, IssueState::Closed, &[])]));
        let summary = reconciler.run_pass().await;
        assert_eq!(summary.total_deleted(), 1);
        assert!(!store.state.lock().unwrap().issues.contains_key(&20));

        // Deleting again is a swallowed conflict
        let summary = reconciler.run_pass().await;
        assert_eq!(summary.repositories[0].skipped, 1);
        assert_eq!(summary.repositories[0].failed, 0);
    }

    #[tokio::test]
    async fn test_pull_requests_are_never_stored() {
        let source = Arc::new(FakeSource::default());
        let mut pr = upstream(30, IssueState::Open, &[(1, "bug")]);
        pr.pull_request = Some(serde_json::json!({"url": "https://api.github.com/pulls/30"}));
        source.set("o/r", Ok(vec![pr]));
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });

        let summary = reconciler(source, store.clone(), Arc::new(LabelStrategy))
            .run_pass()
            .await;
        assert_eq!(summary.repositories[0].skipped, 1);
        assert!(store.state.lock().unwrap().issues.is_empty());
    }

    #[tokio::test]
    async fn test_failing_repository_does_not_stop_siblings() {
        let source = Arc::new(FakeSource::default());
        source.set("o/good", Ok(vec![upstream(40, IssueState::Open, &[(1, "bug")])]));
        source.set("o/down", Err(FetchError::network("connection refused")));
        let store = Arc::new(MemoryStore {
            repos: vec![
                tracked(1, "o", "missing"),
                tracked(2, "o", "down"),
                tracked(3, "o", "good"),
            ],
            ..Default::default()
        });

        let summary = reconciler(source, store.clone(), Arc::new(LabelStrategy))
            .with_concurrency(2)
            .run_pass()
            .await;

        assert_eq!(summary.repositories.len(), 3);
        assert_eq!(summary.failed_repositories(), 2);
        let missing = summary
            .repositories
            .iter()
            .find(|r| r.repository == "o/missing")
            .unwrap();
        assert!(missing.error.as_deref().unwrap().contains("404"));

        let state = store.state.lock().unwrap();
        assert_eq!(state.issues[&40].issue_type, IssueType::Bugfix);
        assert_eq!(state.parsed, BTreeSet::from([3]));
    }

    #[tokio::test]
    async fn test_free_text_rejection_is_not_stored() {
        let source = Arc::new(FakeSource::default());
        let mut complete = upstream(50, IssueState::Open, &[]);
        complete.body = Some(
            "Experience: moderate\nLanguage: Rust\nExpected-time: 2 days\nTechnology-stack: tokio\n"
                .into(),
        );
        let mut incomplete = upstream(51, IssueState::Open, &[]);
        incomplete.body = Some("Experience: easy\nLanguage: Rust\nExpected-time: 1h\n".into());
        source.set("o/r", Ok(vec![complete, incomplete]));
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });

        let summary = reconciler(source, store.clone(), Arc::new(FreeTextStrategy))
            .run_pass()
            .await;

        assert_eq!(summary.repositories[0].rejected, 1);
        let state = store.state.lock().unwrap();
        assert!(!state.issues.contains_key(&51));
        let stored = &state.issues[&50];
        assert_eq!(stored.experience_needed, ExperienceLevel::Moderate);
        assert_eq!(stored.tech_stack, "tokio");
        assert_eq!(stored.expected_time, "2 days");
    }

    #[tokio::test]
    async fn test_broken_label_is_skipped_but_issue_kept() {
        let source = Arc::new(FakeSource::default());
        let mut issue = upstream(60, IssueState::Open, &[(7, "bug")]);
        issue.labels.push(UpstreamLabel {
            id: None,
            name: Some("senior".into()),
            url: None,
            color: None,
        });
        source.set("o/r", Ok(vec![issue]));
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });

        reconciler(source, store.clone(), Arc::new(LabelStrategy))
            .run_pass()
            .await;

        let state = store.state.lock().unwrap();
        let stored = &state.issues[&60];
        assert_eq!(stored.issue_type, IssueType::Bugfix);
        // Classification still sees the label name even though it cannot be stored
        assert_eq!(stored.experience_needed, ExperienceLevel::Senior);
        assert_eq!(state.labels.len(), 1);
        assert_eq!(state.links, BTreeSet::from([(60, 7)]));
    }

    #[tokio::test]
    async fn test_language_failure_skips_repository() {
        struct NoLanguage(FakeSource);

        #[async_trait]
        impl IssueSource for NoLanguage {
            async fn fetch_issues(&self, repo: &RepoRef) -> FetchResult<Vec<UpstreamIssue>> {
                self.0.fetch_issues(repo).await
            }

            async fn fetch_primary_language(&self, _repo: &RepoRef) -> FetchResult<Option<String>> {
                Err(FetchError::upstream(502, "Bad Gateway"))
            }
        }

        let inner = FakeSource::default();
        inner.set("o/r", Ok(vec![upstream(80, IssueState::Open, &[(1, "bug")])]));
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });

        let source = Arc::new(NoLanguage(inner));
        let summary = Reconciler::new(source, store.clone(), Arc::new(LabelStrategy))
            .run_pass()
            .await;

        assert_eq!(summary.failed_repositories(), 1);
        assert!(summary.repositories[0].error.as_deref().unwrap().contains("502"));
        let state = store.state.lock().unwrap();
        assert!(state.issues.is_empty());
        assert!(state.parsed.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_passes_never_share_a_repository() {
        let source = Arc::new(SlowSource::default());
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "r")],
            ..Default::default()
        });
        let reconciler = Reconciler::new(source.clone(), store.clone(), Arc::new(FreeTextStrategy));

        let (first, second) = tokio::join!(reconciler.run_pass(), reconciler.run_pass());

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(first.repositories.len(), 1);
        assert_eq!(second.repositories.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_repositories_run_concurrently() {
        let source = Arc::new(SlowSource::default());
        let store = Arc::new(MemoryStore {
            repos: vec![tracked(1, "o", "a"), tracked(2, "o", "b")],
            ..Default::default()
        });

        Reconciler::new(source.clone(), store, Arc::new(FreeTextStrategy))
            .with_concurrency(2)
            .run_pass()
            .await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.max_active.load(Ordering::SeqCst), 2);
    }
}
