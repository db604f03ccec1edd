//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::llm::{EnrichedJob, Enrichment};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{StoredJob, UpsertOutcome};
use crate::url::PostingId;
use crate::SourcetapError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

/// Name tables resolved by insert-if-missing
#[derive(Debug, Clone, Copy)]
enum NameTable {
    Domains,
    Modalities,
    Degrees,
    Languages,
    Frameworks,
}

impl NameTable {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Domains => "domains",
            Self::Modalities => "modalities",
            Self::Degrees => "degrees",
            Self::Languages => "languages",
            Self::Frameworks => "frameworks",
        }
    }
}

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SourcetapError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SourcetapError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SourcetapError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn job_id(&self, posting_id: &PostingId) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM jobs WHERE posting_id = ?1",
                params![posting_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn associated_names(
        &self,
        posting_id: &PostingId,
        link_table: &str,
        name_table: NameTable,
        fk: &str,
    ) -> StorageResult<Vec<String>> {
        let sql = format!(
            "SELECT n.name FROM {link} l
             JOIN {names} n ON n.id = l.{fk}
             JOIN jobs j ON j.id = l.job_id
             WHERE j.posting_id = ?1
             ORDER BY n.name COLLATE NOCASE",
            link = link_table,
            names = name_table.as_str(),
            fk = fk
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map(params![posting_id.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

/// Returns the id of `name` in `table`, inserting it if missing
fn resolve_name(tx: &Transaction<'_>, table: NameTable, name: &str) -> StorageResult<i64> {
    tx.execute(
        &format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", table.as_str()),
        params![name],
    )?;
    let id = tx.query_row(
        &format!("SELECT id FROM {} WHERE name = ?1", table.as_str()),
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn write_enrichment(
    tx: &Transaction<'_>,
    job_id: i64,
    enrichment: &Enrichment,
    now: &str,
) -> StorageResult<()> {
    let domain_id = resolve_name(tx, NameTable::Domains, enrichment.domain.as_str())?;
    let modality_id = resolve_name(tx, NameTable::Modalities, enrichment.modality.as_str())?;
    let degree_id = resolve_name(tx, NameTable::Degrees, enrichment.min_degree.as_str())?;

    tx.execute(
        "UPDATE jobs SET parsed_description = ?2, deadline_date = ?3,
         min_years_experience = ?4, domain_id = ?5, modality_id = ?6, degree_id = ?7,
         enriched_at = ?8
         WHERE id = ?1",
        params![
            job_id,
            enrichment.parsed_description,
            enrichment.deadline_date,
            enrichment.min_years_experience,
            domain_id,
            modality_id,
            degree_id,
            now
        ],
    )?;

    tx.execute("DELETE FROM job_languages WHERE job_id = ?1", params![job_id])?;
    for language in &enrichment.languages {
        let language_id = resolve_name(tx, NameTable::Languages, language)?;
        tx.execute(
            "INSERT OR IGNORE INTO job_languages (job_id, language_id) VALUES (?1, ?2)",
            params![job_id, language_id],
        )?;
    }

    tx.execute("DELETE FROM job_frameworks WHERE job_id = ?1", params![job_id])?;
    for framework in &enrichment.frameworks {
        let framework_id = resolve_name(tx, NameTable::Frameworks, framework)?;
        tx.execute(
            "INSERT OR IGNORE INTO job_frameworks (job_id, framework_id) VALUES (?1, ?2)",
            params![job_id, framework_id],
        )?;
    }

    Ok(())
}

impl Storage for SqliteStorage {
    // ===== Jobs =====

    fn upsert_job(&mut self, job: &EnrichedJob) -> StorageResult<UpsertOutcome> {
        let record = &job.record;
        let now = Utc::now().to_rfc3339();
        let scraped_at = record.scraped_at.to_rfc3339();

        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM jobs WHERE posting_id = ?1",
                params![record.posting_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let (job_id, outcome) = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE jobs SET title = ?2, company = ?3, location = ?4, posted_date = ?5,
                     expires_date = ?6, salary = ?7, url = ?8, description = ?9,
                     discovered_on_page = ?10, scraped_at = ?11, updated_at = ?12
                     WHERE id = ?1",
                    params![
                        id,
                        record.title,
                        record.company,
                        record.location,
                        record.posted_date,
                        record.expires_date,
                        record.salary,
                        record.url,
                        record.description,
                        record.discovered_on_page,
                        scraped_at,
                        now
                    ],
                )?;
                (id, UpsertOutcome::Updated)
            }
            None => {
                tx.execute(
                    "INSERT INTO jobs (posting_id, title, company, location, posted_date,
                     expires_date, salary, url, description, discovered_on_page, scraped_at,
                     created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                    params![
                        record.posting_id.as_str(),
                        record.title,
                        record.company,
                        record.location,
                        record.posted_date,
                        record.expires_date,
                        record.salary,
                        record.url,
                        record.description,
                        record.discovered_on_page,
                        scraped_at,
                        now
                    ],
                )?;
                (tx.last_insert_rowid(), UpsertOutcome::Inserted)
            }
        };

        if let Some(enrichment) = &job.enrichment {
            write_enrichment(&tx, job_id, enrichment, &now)?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn get_job(&self, posting_id: &PostingId) -> StorageResult<Option<StoredJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT j.id, j.posting_id, j.title, j.company, j.location, j.url,
             j.parsed_description, j.deadline_date, j.min_years_experience,
             d.name, m.name, g.name, j.enriched_at, j.updated_at
             FROM jobs j
             LEFT JOIN domains d ON d.id = j.domain_id
             LEFT JOIN modalities m ON m.id = j.modality_id
             LEFT JOIN degrees g ON g.id = j.degree_id
             WHERE j.posting_id = ?1",
        )?;

        let job = stmt
            .query_row(params![posting_id.as_str()], |row| {
                Ok(StoredJob {
                    id: row.get(0)?,
                    posting_id: PostingId::new(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    company: row.get(3)?,
                    location: row.get(4)?,
                    url: row.get(5)?,
                    parsed_description: row.get(6)?,
                    deadline_date: row.get(7)?,
                    min_years_experience: row.get(8)?,
                    domain: row.get(9)?,
                    modality: row.get(10)?,
                    degree: row.get(11)?,
                    enriched_at: row.get(12)?,
                    updated_at: row.get(13)?,
                })
            })
            .optional()?;

        Ok(job)
    }

    fn job_languages(&self, posting_id: &PostingId) -> StorageResult<Vec<String>> {
        self.associated_names(posting_id, "job_languages", NameTable::Languages, "language_id")
    }

    fn job_frameworks(&self, posting_id: &PostingId) -> StorageResult<Vec<String>> {
        self.associated_names(
            posting_id,
            "job_frameworks",
            NameTable::Frameworks,
            "framework_id",
        )
    }

    // ===== Statistics =====

    fn count_jobs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_enriched_jobs(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE enriched_at IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn jobs_per_domain(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.name, COUNT(j.id) AS n
             FROM jobs j JOIN domains d ON d.id = j.domain_id
             GROUP BY d.name
             ORDER BY n DESC, d.name",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn top_languages(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.name, COUNT(jl.job_id) AS n
             FROM job_languages jl JOIN languages l ON l.id = jl.language_id
             GROUP BY l.name
             ORDER BY n DESC, l.name
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl SqliteStorage {
    /// True if a job with this posting id is stored
    pub fn contains(&self, posting_id: &PostingId) -> StorageResult<bool> {
        Ok(self.job_id(posting_id)?.is_some())
    }
}
