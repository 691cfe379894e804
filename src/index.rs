//! SQLite-backed vector index.
//!
//! Persistent store of (vector, chunk, source filename) rows. Embeddings
//! are serialized as little-endian f32 BLOBs; similarity search is
//! brute-force cosine over all rows, best match first. The SQLite file in
//! WAL mode is the durable form — reopening the database yields identical
//! search behavior, and the transactional journal prevents torn writes
//! when the process dies mid-commit.
//!
//! Commits are all-or-nothing: one transaction replaces the full vector
//! set and the training snapshot, or the previous committed state remains.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::Result;
use crate::models::{Chunk, IndexInfo, ScoredChunk};

/// One embedded chunk ready for insertion.
#[derive(Debug, Clone)]
pub struct IndexedVector {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// The persisted training snapshot, written by each successful commit.
#[derive(Debug, Clone)]
pub struct IndexMeta {
    pub last_trained_at: i64,
    pub documents_at_last_train: i64,
    pub model: String,
    pub dims: i64,
}

#[derive(Clone)]
pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the full index contents with a freshly trained vector set
    /// and record the training snapshot, in a single transaction.
    pub async fn commit(
        &self,
        vectors: &[IndexedVector],
        documents_at_train: i64,
        model: &str,
        dims: usize,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM vectors").execute(&mut *tx).await?;

        for v in vectors {
            sqlx::query(
                r#"
                INSERT INTO vectors (id, filename, page, chunk_index, text, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&v.chunk.filename)
            .bind(v.chunk.page)
            .bind(v.chunk.chunk_index)
            .bind(&v.chunk.text)
            .bind(vec_to_blob(&v.embedding))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO index_meta (id, last_trained_at, documents_at_last_train, model, dims)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_trained_at = excluded.last_trained_at,
                documents_at_last_train = excluded.documents_at_last_train,
                model = excluded.model,
                dims = excluded.dims
            "#,
        )
        .bind(now)
        .bind(documents_at_train)
        .bind(model)
        .bind(dims as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove all vectors owned by a filename. No-op when none exist.
    pub async fn delete_by_source(&self, filename: &str) -> Result<()> {
        sqlx::query("DELETE FROM vectors WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Cosine similarity search, best match first. Ties break on
    /// (filename, chunk_index) so results are deterministic.
    pub async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query("SELECT filename, page, chunk_index, text, embedding FROM vectors")
            .fetch_all(&self.pool)
            .await?;

        struct Candidate {
            filename: String,
            page: i64,
            chunk_index: i64,
            text: String,
            score: f32,
        }

        let mut candidates: Vec<Candidate> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                Candidate {
                    filename: row.get("filename"),
                    page: row.get("page"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    score: cosine_similarity(query_vec, &vec),
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.filename.cmp(&b.filename))
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        candidates.truncate(k);

        Ok(candidates
            .into_iter()
            .map(|c| ScoredChunk {
                file: c.filename,
                page: c.page,
                score: c.score,
                text: c.text,
            })
            .collect())
    }

    /// Current number of indexed vectors.
    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// The training snapshot, or `None` before the first successful run.
    pub async fn meta(&self) -> Result<Option<IndexMeta>> {
        let row = sqlx::query(
            "SELECT last_trained_at, documents_at_last_train, model, dims FROM index_meta WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| IndexMeta {
            last_trained_at: row.get("last_trained_at"),
            documents_at_last_train: row.get("documents_at_last_train"),
            model: row.get("model"),
            dims: row.get("dims"),
        }))
    }

    /// Assemble the reported overview. `in_sync` holds exactly when the
    /// live document count matches the last successful run's snapshot;
    /// an untrained index is never in sync.
    pub async fn info(&self, document_count: i64, configured_model: &str) -> Result<IndexInfo> {
        let vector_count = self.count().await?;
        let meta = self.meta().await?;

        let (last_trained_at, documents_at_last_train, model) = match meta {
            Some(m) => (
                Some(m.last_trained_at),
                Some(m.documents_at_last_train),
                m.model,
            ),
            None => (None, None, configured_model.to_string()),
        };

        let in_sync = documents_at_last_train == Some(document_count);

        Ok(IndexInfo {
            document_count,
            vector_count,
            last_trained_at,
            documents_at_last_train,
            in_sync,
            embedding_model: model,
        })
    }
}
