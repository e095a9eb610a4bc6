use mobc::{Manager, Pool};
use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use tracing::{debug, info};

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        debug!("Opening database: {}", self.db_path);
        let conn = Connection::open(&self.db_path)?;

        // Some PRAGMA statements return a row; query_row absorbs both shapes.
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.execute("PRAGMA synchronous=NORMAL", [])?;
        conn.execute("PRAGMA temp_store=memory", [])?;

        init_database(&conn)?;
        Ok(conn)
    }

    async fn check(&self, conn: Self::Connection) -> Result<Self::Connection, Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(conn)
    }
}

pub type DbPool = Pool<SqliteManager>;

pub async fn create_db_pool(db_path: &str) -> crate::error::Result<DbPool> {
    if let Some(parent) = Path::new(db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let manager = SqliteManager::new(db_path.to_string());
    let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

    info!("✓ SQLite connection pool created: {}", db_path);
    Ok(pool)
}

fn init_database(conn: &Connection) -> SqliteResult<()> {
    debug!("Creating tables and indexes...");

    create_submissions_table(conn)?;
    create_extracted_profiles_table(conn)?;
    create_verification_results_table(conn)?;
    create_linkedin_verifications_table(conn)?;
    create_verified_profiles_table(conn)?;
    create_validation_failures_table(conn)?;
    create_indexes(conn)?;

    Ok(())
}

fn create_submissions_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            content_kind TEXT NOT NULL,
            content TEXT NOT NULL,
            mime_type TEXT,
            source_email TEXT,
            received_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_extracted_profiles_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS extracted_profiles (
            id TEXT PRIMARY KEY,
            submission_id TEXT NOT NULL,
            name TEXT,
            company TEXT,
            designation TEXT,
            phone TEXT,
            email TEXT,
            linkedin_url TEXT,
            extraction_status TEXT NOT NULL,
            raw_text TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_verification_results_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS verification_results (
            id TEXT PRIMARY KEY,
            profile_id TEXT NOT NULL,
            score REAL NOT NULL,
            domain_match INTEGER NOT NULL,
            deliverability TEXT NOT NULL,
            reason TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_linkedin_verifications_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS linkedin_verifications (
            id TEXT PRIMARY KEY,
            profile_id TEXT NOT NULL,
            status TEXT NOT NULL,
            message TEXT NOT NULL,
            resolved_profile_url TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_verified_profiles_table(conn: &Connection) -> SqliteResult<()> {
    // UNIQUE(profile_id) backs the idempotent-approval guarantee at the
    // storage boundary.
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS verified_profiles (
            id TEXT PRIMARY KEY,
            profile_id TEXT UNIQUE NOT NULL,
            name TEXT,
            company TEXT,
            designation TEXT,
            phone TEXT,
            email TEXT,
            linkedin_url TEXT,
            verification_details TEXT NOT NULL,
            promoted_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_validation_failures_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS validation_failures (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            error TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_indexes(conn: &Connection) -> SqliteResult<()> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_submissions_received ON submissions(received_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_profiles_submission ON extracted_profiles(submission_id)",
        "CREATE INDEX IF NOT EXISTS idx_profiles_status ON extracted_profiles(extraction_status)",
        "CREATE INDEX IF NOT EXISTS idx_verifications_profile ON verification_results(profile_id)",
        "CREATE INDEX IF NOT EXISTS idx_linkedin_profile ON linkedin_verifications(profile_id)",
        "CREATE INDEX IF NOT EXISTS idx_verified_profile ON verified_profiles(profile_id)",
        "CREATE INDEX IF NOT EXISTS idx_failures_created ON validation_failures(created_at DESC)",
    ];

    for index_sql in indexes.iter() {
        conn.execute(index_sql, [])?;
    }

    Ok(())
}
