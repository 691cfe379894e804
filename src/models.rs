//! Core data types that flow through the indexing and retrieval pipeline.

use serde::Serialize;

/// A PDF held by the document store, with metadata captured at upload time.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    pub filename: String,
    pub size_bytes: u64,
    /// Page count computed at upload; 0 when the PDF could not be read.
    pub pages: i64,
    pub sha256: String,
    /// Unix seconds.
    pub uploaded_at: i64,
}

/// A bounded span of extracted text tagged with its source page, the unit
/// that gets embedded. Produced fresh during each training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub filename: String,
    /// 1-based page number the span was cut from.
    pub page: i64,
    /// Document-wide ordinal, contiguous from 0.
    pub chunk_index: i64,
    pub text: String,
}

/// A chunk returned from similarity search, best match first.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub file: String,
    pub page: i64,
    pub score: f32,
    pub text: String,
}

/// Snapshot of the training job, readable by any number of pollers.
///
/// Exactly one instance exists per process, owned by the supervisor and
/// reinitialized to these defaults on startup.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingStatus {
    pub is_training: bool,
    pub stage: String,
    /// Percent 0–100, monotonically non-decreasing within a run.
    pub progress: u8,
    pub message: String,
}

impl Default for TrainingStatus {
    fn default() -> Self {
        Self {
            is_training: false,
            stage: "Idle".to_string(),
            progress: 0,
            message: "Ready.".to_string(),
        }
    }
}

/// Reported index overview: counts, last training, and the in-sync flag.
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub document_count: i64,
    pub vector_count: i64,
    /// Unix seconds of the last successful training completion.
    pub last_trained_at: Option<i64>,
    /// Documents present when the last successful run started.
    pub documents_at_last_train: Option<i64>,
    /// True when the current document count matches the last-trained snapshot.
    pub in_sync: bool,
    pub embedding_model: String,
}
