/// SQLite-backed catalog store
use super::{CatalogError, CatalogStore, SignedTextureRecord, TextureProperty};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

#[derive(Clone)]
pub struct SqliteCatalog {
    db: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn find(&self, id: &str) -> Result<Option<SignedTextureRecord>, CatalogError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, url, properties, updated_at
            FROM signed_texture
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let properties: String = row.try_get("properties")?;
        let properties: Vec<TextureProperty> = serde_json::from_str(&properties)?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Some(SignedTextureRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            properties,
            updated_at: parse_timestamp(&updated_at),
        }))
    }

    async fn upsert(&self, record: &SignedTextureRecord) -> Result<(), CatalogError> {
        let properties = serde_json::to_string(&record.properties)?;

        sqlx::query(
            r#"
            INSERT INTO signed_texture (id, name, url, properties, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                properties = excluded.properties,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.url)
        .bind(&properties)
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        crate::db::test_connection(&self.db).await?;
        Ok(())
    }
}

/// Parse RFC3339 timestamp; unparseable values fall back to the epoch
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
