//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sourcetap database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Lookup tables for the enrichment enums
CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS modalities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS degrees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

-- One row per posting, keyed by the site's posting id
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    posting_id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT NOT NULL,
    posted_date TEXT NOT NULL,
    expires_date TEXT NOT NULL,
    salary TEXT NOT NULL,
    url TEXT NOT NULL,
    description TEXT NOT NULL,
    discovered_on_page INTEGER NOT NULL,
    scraped_at TEXT NOT NULL,
    parsed_description TEXT,
    deadline_date TEXT,
    min_years_experience INTEGER,
    domain_id INTEGER REFERENCES domains(id),
    modality_id INTEGER REFERENCES modalities(id),
    degree_id INTEGER REFERENCES degrees(id),
    enriched_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_domain ON jobs(domain_id);

-- Languages and frameworks named by postings
CREATE TABLE IF NOT EXISTS languages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS frameworks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS job_languages (
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    language_id INTEGER NOT NULL REFERENCES languages(id),
    PRIMARY KEY (job_id, language_id)
);

CREATE TABLE IF NOT EXISTS job_frameworks (
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    framework_id INTEGER NOT NULL REFERENCES frameworks(id),
    PRIMARY KEY (job_id, framework_id)
);

CREATE INDEX IF NOT EXISTS idx_job_languages_language ON job_languages(language_id);
CREATE INDEX IF NOT EXISTS idx_job_frameworks_framework ON job_frameworks(framework_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
