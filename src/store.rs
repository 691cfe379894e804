//! Document store: uploaded PDF files on disk, metadata rows in SQLite.
//!
//! The store owns the uploads directory and the `documents` table. Bytes
//! live at `<uploads_dir>/<filename>`; filename is the unique key. Page
//! counts are computed through the extraction adapter once, at upload
//! time, so listings never re-read the PDFs.

use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::extract::{is_pdf, PageExtractor};
use crate::index::VectorIndex;
use crate::models::StoredDocument;

#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    uploads_dir: PathBuf,
    extractor: Arc<dyn PageExtractor>,
}

impl DocumentStore {
    /// Open the store, creating the uploads directory if missing.
    pub fn new(
        pool: SqlitePool,
        uploads_dir: PathBuf,
        extractor: Arc<dyn PageExtractor>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&uploads_dir)?;
        Ok(Self {
            pool,
            uploads_dir,
            extractor,
        })
    }

    /// Add a document. Rejects non-PDF content (`InvalidInput`), unsafe or
    /// non-`.pdf` filenames (`InvalidInput`), and duplicate filenames
    /// (`Conflict` — overwriting would silently invalidate index entries,
    /// since the index cannot know the file changed).
    ///
    /// A signature-valid PDF whose pages cannot be extracted is still
    /// accepted with a page count of 0; it will fail the next training run
    /// instead.
    pub async fn add(&self, filename: &str, bytes: &[u8]) -> Result<StoredDocument> {
        validate_filename(filename)?;

        if !is_pdf(bytes) {
            return Err(Error::InvalidInput(format!(
                "{}: not a PDF (missing %PDF- signature)",
                filename
            )));
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM documents WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_some() {
            return Err(Error::Conflict(format!(
                "a document named '{}' already exists; remove it first",
                filename
            )));
        }

        let pages = match self.extractor.extract_pages(bytes) {
            Ok(pages) => pages.len() as i64,
            Err(_) => 0,
        };

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        let path = self.uploads_dir.join(filename);
        std::fs::write(&path, bytes)?;

        let uploaded_at = chrono::Utc::now().timestamp();
        let inserted = sqlx::query(
            r#"
            INSERT INTO documents (filename, size_bytes, pages, sha256, uploaded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(filename)
        .bind(bytes.len() as i64)
        .bind(pages)
        .bind(&sha256)
        .bind(uploaded_at)
        .execute(&self.pool)
        .await;

        if let Err(e) = inserted {
            // Keep file set and metadata in step: a failed insert must not
            // leave an untracked file behind.
            let _ = std::fs::remove_file(&path);
            return Err(e.into());
        }

        Ok(StoredDocument {
            filename: filename.to_string(),
            size_bytes: bytes.len() as u64,
            pages,
            sha256,
            uploaded_at,
        })
    }

    /// All stored documents, ordered by filename (stable order).
    pub async fn list(&self) -> Result<Vec<StoredDocument>> {
        let rows = sqlx::query(
            "SELECT filename, size_bytes, pages, sha256, uploaded_at FROM documents ORDER BY filename",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoredDocument {
                filename: row.get("filename"),
                size_bytes: row.get::<i64, _>("size_bytes") as u64,
                pages: row.get("pages"),
                sha256: row.get("sha256"),
                uploaded_at: row.get("uploaded_at"),
            })
            .collect())
    }

    /// Number of stored documents; the reconciliation input.
    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Remove a document and, synchronously, all of its vectors, so a
    /// deleted file can never surface as a retrieval result. Vectors are
    /// removed first: a partially completed remove must not leave
    /// searchable entries for a missing file.
    pub async fn remove(&self, filename: &str, index: &VectorIndex) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM documents WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("no document named '{}'", filename)));
        }

        index.delete_by_source(filename).await?;

        sqlx::query("DELETE FROM documents WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await?;

        let path = self.uploads_dir.join(filename);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        Ok(())
    }

    /// Raw bytes of a stored document, for preview/serving and training.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        validate_filename(filename)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM documents WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("no document named '{}'", filename)));
        }

        let path = self.uploads_dir.join(filename);
        std::fs::read(&path)
            .map_err(|e| Error::Persistence(format!("reading {}: {}", filename, e)))
    }
}

/// Filenames are store keys and disk paths at once: they must be plain
/// `.pdf` names with no path components.
fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty() {
        return Err(Error::InvalidInput("empty filename".to_string()));
    }
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(Error::InvalidInput(format!(
            "invalid filename: {}",
            filename
        )));
    }
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(Error::InvalidInput(format!(
            "{}: only .pdf files are accepted",
            filename
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_validation() {
        assert!(validate_filename("report.pdf").is_ok());
        assert!(validate_filename("Report Q3.PDF").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("notes.txt").is_err());
        assert!(validate_filename("../escape.pdf").is_err());
        assert!(validate_filename("dir/inner.pdf").is_err());
    }
}
