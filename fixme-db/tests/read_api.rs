//! Filtering, ordering and metadata over stored issues

use chrono::{Duration, TimeZone, Utc};
use fixme_core::{ExperienceLevel, IssueRecord, IssueType, RepoRef};
use fixme_db::{Database, IssueQuery, NewProject, Ordering};

struct Seed {
    id: i64,
    language: &'static str,
    tech_stack: &'static str,
    expected_time: &'static str,
    experience: ExperienceLevel,
    issue_type: IssueType,
}

async fn seeded() -> Database {
    let db = Database::in_memory().await.unwrap();
    let hello = db
        .repositories()
        .track(&RepoRef::new("octo", "hello"), None)
        .await
        .unwrap();
    let world = db
        .repositories()
        .track(&RepoRef::new("octo", "world"), None)
        .await
        .unwrap();

    let seeds = [
        Seed { id: 1, language: "rust", tech_stack: "tokio", expected_time: "2 hours", experience: ExperienceLevel::Senior, issue_type: IssueType::Bugfix },
        Seed { id: 2, language: "go", tech_stack: "gin", expected_time: "1 day", experience: ExperienceLevel::Easy, issue_type: IssueType::Enhancement },
        Seed { id: 3, language: "python", tech_stack: "django", expected_time: "3 hours", experience: ExperienceLevel::Moderate, issue_type: IssueType::Unclassified },
        Seed { id: 4, language: "rust", tech_stack: "", expected_time: "", experience: ExperienceLevel::Easy, issue_type: IssueType::Bugfix },
    ];

    let base = Utc.with_ymd_and_hms(2017, 6, 5, 10, 0, 0).unwrap();
    for (i, seed) in seeds.iter().enumerate() {
        let repository_id = if seed.id == 4 { world.id } else { hello.id };
        // Later seeds were updated earlier
        let updated_at = base - Duration::hours(i as i64);
        db.issues()
            .upsert(&IssueRecord {
                issue_id: seed.id,
                repository_id,
                number: seed.id,
                title: format!("Issue {}", seed.id),
                body: String::new(),
                url: format!("https://github.com/octo/hello/issues/{}", seed.id),
                language: seed.language.to_string(),
                tech_stack: seed.tech_stack.to_string(),
                expected_time: seed.expected_time.to_string(),
                experience_needed: seed.experience,
                issue_type: seed.issue_type,
                created_at: base,
                updated_at,
            })
            .await
            .unwrap();
    }
    db
}

fn ids(issues: &[fixme_db::StoredIssue]) -> Vec<i64> {
    issues.iter().map(|i| i.issue_id).collect()
}

#[tokio::test]
async fn test_default_order_is_updated_at_ascending() {
    let db = seeded().await;
    let issues = db.issues().list(&IssueQuery::new()).await.unwrap();
    assert_eq!(ids(&issues), vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn test_list_filter_matches_any_value() {
    let db = seeded().await;

    let query = IssueQuery::new().language(r#"["rust","go"]"#);
    let issues = db.issues().list(&query).await.unwrap();
    assert_eq!(ids(&issues), vec![4, 2, 1]);

    let query = IssueQuery::new()
        .language("rust")
        .experience_needed("easy")
        .unwrap();
    let issues = db.issues().list(&query).await.unwrap();
    assert_eq!(ids(&issues), vec![4]);
}

#[tokio::test]
async fn test_issue_type_and_repository_filters() {
    let db = seeded().await;

    let query = IssueQuery::new().issue_type("bugfix").unwrap();
    assert_eq!(ids(&db.issues().list(&query).await.unwrap()), vec![4, 1]);

    let query = IssueQuery::new()
        .issue_type("bugfix")
        .unwrap()
        .repository(RepoRef::new("octo", "hello"));
    let issues = db.issues().list(&query).await.unwrap();
    assert_eq!(ids(&issues), vec![1]);
    assert_eq!(issues[0].repository, "octo/hello");
}

#[tokio::test]
async fn test_ordering_by_experience() {
    let db = seeded().await;

    let ordering: Ordering = "experience_needed".parse().unwrap();
    let issues = db
        .issues()
        .list(&IssueQuery::new().ordering(ordering))
        .await
        .unwrap();
    let levels: Vec<ExperienceLevel> = issues.iter().map(|i| i.experience_needed).collect();
    assert_eq!(
        levels,
        vec![
            ExperienceLevel::Easy,
            ExperienceLevel::Easy,
            ExperienceLevel::Moderate,
            ExperienceLevel::Senior
        ]
    );

    let ordering: Ordering = "-experience_needed".parse().unwrap();
    let issues = db
        .issues()
        .list(&IssueQuery::new().ordering(ordering))
        .await
        .unwrap();
    assert_eq!(issues[0].issue_id, 1);
}

#[tokio::test]
async fn test_metadata_lists_distinct_values() {
    let db = seeded().await;
    let meta = db.issues().metadata().await.unwrap();

    assert_eq!(meta.language, vec!["go", "python", "rust"]);
    assert_eq!(meta.tech_stack, vec!["django", "gin", "tokio"]);
    assert_eq!(
        meta.experience_needed,
        vec![
            ExperienceLevel::Easy,
            ExperienceLevel::Moderate,
            ExperienceLevel::Senior
        ]
    );
}

#[tokio::test]
async fn test_project_issue_count() {
    let db = seeded().await;
    let project = db
        .projects()
        .create(&NewProject::new("Octo Cat"))
        .await
        .unwrap();
    db.repositories()
        .link(&RepoRef::new("octo", "hello"), Some(project.id))
        .await
        .unwrap();

    let projects = db.projects().list().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].issues_count, 3);
}
