use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connect(sqlx::Error),
    #[error("database statement failed: {0}")]
    Statement(#[from] sqlx::Error),
}

/// One retrieved row: cosine similarity (1 - distance) plus the chunk text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoredChunk {
    pub score: f64,
    pub chunk: String,
}

/// Postgres-backed chunk index over the `items` table (`schema.sql`).
pub struct ChunkStore {
    pool: PgPool,
}

impl ChunkStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StoreError::Connect)?;

        Ok(Self { pool })
    }

    /// Opens a reload transaction. Nothing becomes visible to readers until
    /// [`Reload::commit`]; dropping the handle rolls everything back and the
    /// previous index survives intact.
    pub async fn begin(&self) -> Result<Reload, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Reload { tx })
    }

    /// Top-`limit` chunks by cosine similarity to `embedding`, best first.
    pub async fn search(
        &self,
        embedding: &Vector,
        limit: i64,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let chunks = sqlx::query_as::<_, ScoredChunk>(
            "SELECT 1 - (embedding <=> $1) AS score, chunk FROM items \
             ORDER BY embedding <=> $1 LIMIT $2",
        )
        .bind(embedding)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(chunks)
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(total.0)
    }
}

/// An in-flight index reload: truncate plus inserts, committed as one unit.
pub struct Reload {
    tx: Transaction<'static, Postgres>,
}

impl Reload {
    pub async fn truncate(&mut self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE TABLE items")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn insert(&mut self, embedding: &Vector, chunk: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO items (embedding, chunk) VALUES ($1, $2)")
            .bind(embedding)
            .bind(chunk)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
