//! Integration tests for persisting harvested postings

use chrono::Utc;
use sourcetap::crawler::JobRecord;
use sourcetap::llm::{Degree, EnrichedJob, Enrichment, JobDomain, Modality};
use sourcetap::output::load_statistics;
use sourcetap::storage::{open_storage, persist_all, Storage};
use sourcetap::PostingId;
use tempfile::TempDir;

fn record(id: &str) -> JobRecord {
    JobRecord {
        posting_id: PostingId::from(id),
        title: format!("Engineer {}", id),
        company: "Acme".to_string(),
        location: "Tacoma, WA".to_string(),
        posted_date: "Jan 2, 2024".to_string(),
        expires_date: "Feb 2, 2024".to_string(),
        salary: String::new(),
        url: format!("https://seeker.worksourcewa.com/j?JobID={}", id),
        description: "Rust services".to_string(),
        discovered_on_page: 1,
        scraped_at: Utc::now(),
    }
}

fn enriched(id: &str, languages: &[&str]) -> EnrichedJob {
    EnrichedJob {
        record: record(id),
        enrichment: Some(Enrichment {
            parsed_description: "Rust services".to_string(),
            deadline_date: "2024-02-02".to_string(),
            min_degree: Degree::Bachelors,
            min_years_experience: 4,
            modality: Modality::Hybrid,
            domain: JobDomain::Backend,
            languages: languages.iter().map(|s| s.to_string()).collect(),
            frameworks: vec!["Axum".to_string()],
        }),
    }
}

#[test]
fn test_rerun_against_same_database_updates_in_place() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data").join("jobs.db");

    {
        let mut storage = open_storage(&db_path).unwrap();
        let summary = persist_all(
            &mut storage,
            &[enriched("1", &["Rust", "SQL"]), enriched("2", &["rust"])],
        );
        assert_eq!(summary.inserted, 2);
    }

    let mut storage = open_storage(&db_path).unwrap();
    let summary = persist_all(
        &mut storage,
        &[
            EnrichedJob::unenriched(record("1")),
            enriched("3", &["Python"]),
        ],
    );
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(storage.count_jobs().unwrap(), 3);
    // the unenriched refresh keeps the stored enrichment for posting 1
    assert_eq!(storage.count_enriched_jobs().unwrap(), 3);
    assert_eq!(
        storage.job_languages(&PostingId::from("1")).unwrap().len(),
        2
    );

    let stats = load_statistics(&storage).unwrap();
    assert_eq!(stats.total_jobs, 3);
    assert_eq!(stats.jobs_per_domain, vec![("Backend".to_string(), 3)]);
    assert_eq!(stats.top_languages[0], ("Rust".to_string(), 2));
}
