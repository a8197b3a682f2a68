//! SQLite-backed catalog
//!
//! Stores manhwa records in a `manhwa` table. Genre lists are kept as
//! JSON text. Title lookups go through `lower(title)` so duplicate
//! detection is case-insensitive; the column is indexed because every
//! import pass performs one lookup per candidate payload.

use super::{Catalog, CatalogEntry, CatalogError, NewCatalogEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

/// Catalog implementation on a shared SQLite pool
pub struct SqliteCatalog {
    db: SqlitePool,
}

impl SqliteCatalog {
    /// Wrap an existing pool, creating the table if needed.
    pub async fn new(db: SqlitePool) -> Result<Self, CatalogError> {
        init_tables(&db).await?;
        Ok(Self { db })
    }

    /// Open (or create) a catalog database file.
    pub async fn open(db_path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CatalogError::Malformed(format!("Create db dir failed: {}", e)))?;
        }
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to catalog database: {}", db_url);
        let pool = SqlitePool::connect(&db_url).await?;
        Self::new(pool).await
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CatalogEntry, CatalogError> {
        let genre_json: String = row.try_get("genre")?;
        let genre: Vec<String> = serde_json::from_str(&genre_json)
            .map_err(|e| CatalogError::Malformed(format!("Genre column not JSON: {}", e)))?;
        let generated_at: String = row.try_get("generated_at")?;
        let generated_at = generated_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| CatalogError::Malformed(format!("Bad generated_at timestamp: {}", e)))?;

        Ok(CatalogEntry {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            genre,
            status: row.try_get("status")?,
            description: row.try_get("description")?,
            cover_image: row.try_get("cover_image")?,
            generated: row.try_get::<i64, _>("generated")? != 0,
            source_file: row.try_get("source_file")?,
            file_type: row.try_get("file_type")?,
            generated_at,
        })
    }
}

/// Create the catalog table if it doesn't exist
async fn init_tables(pool: &SqlitePool) -> Result<(), CatalogError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manhwa (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            genre TEXT NOT NULL,
            status TEXT NOT NULL,
            description TEXT NOT NULL,
            cover_image TEXT,
            generated INTEGER NOT NULL DEFAULT 0,
            source_file TEXT NOT NULL DEFAULT '',
            file_type TEXT NOT NULL DEFAULT '',
            generated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_manhwa_title_lower ON manhwa (lower(title))")
        .execute(pool)
        .await?;

    tracing::info!("Catalog table initialized (manhwa)");
    Ok(())
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn find_by_title(&self, title: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        let row = sqlx::query("SELECT * FROM manhwa WHERE lower(title) = lower(?) LIMIT 1")
            .bind(title)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError> {
        let id = Uuid::new_v4().to_string();
        let genre_json = serde_json::to_string(&entry.genre)
            .map_err(|e| CatalogError::Malformed(format!("Genre not serializable: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO manhwa
                (id, title, author, genre, status, description, cover_image,
                 generated, source_file, file_type, generated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&entry.title)
        .bind(&entry.author)
        .bind(&genre_json)
        .bind(&entry.status)
        .bind(&entry.description)
        .bind(&entry.cover_image)
        .bind(entry.generated as i64)
        .bind(&entry.source_file)
        .bind(&entry.file_type)
        .bind(entry.generated_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(CatalogEntry {
            id,
            title: entry.title,
            author: entry.author,
            genre: entry.genre,
            status: entry.status,
            description: entry.description,
            cover_image: entry.cover_image,
            generated: entry.generated,
            source_file: entry.source_file,
            file_type: entry.file_type,
            generated_at: entry.generated_at,
        })
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM manhwa")
            .fetch_one(&self.db)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }
}
