//! Training job supervisor.
//!
//! Orchestrates one end-to-end rebuild of the vector index from the
//! current document store contents:
//!
//! ```text
//! Idle → Extracting → Embedding → Committing → Idle(done)
//!          │             │            │
//!          └─────────────┴────────────┴──→ Failed (previous index intact)
//! ```
//!
//! At most one run is admitted at a time; a second start request is
//! rejected with `AlreadyRunning` and changes nothing. The run executes on
//! a spawned tokio task and publishes progress through a single shared
//! [`TrainingStatus`] record that any number of pollers may read
//! concurrently. The record is process-lifetime: a restart always begins
//! Idle, and the on-disk index holds only the last committed state.
//!
//! The run operates on a snapshot of the file set taken when it starts.
//! Documents added afterwards are invisible to the run; a document removed
//! after the snapshot fails the run rather than producing a partial index.

use std::sync::{Arc, RwLock};

use crate::chunk::chunk_pages;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extract::PageExtractor;
use crate::index::{IndexedVector, VectorIndex};
use crate::models::TrainingStatus;
use crate::store::DocumentStore;

// Phase shares of the 0–100 progress range.
const EXTRACT_END: u8 = 40;
const EMBED_END: u8 = 90;

#[derive(Clone)]
pub struct TrainingSupervisor {
    store: DocumentStore,
    index: VectorIndex,
    extractor: Arc<dyn PageExtractor>,
    provider: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    batch_size: usize,
    state: Arc<RwLock<TrainingStatus>>,
}

impl TrainingSupervisor {
    pub fn new(
        store: DocumentStore,
        index: VectorIndex,
        extractor: Arc<dyn PageExtractor>,
        provider: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            index,
            extractor,
            provider,
            chunking,
            batch_size: batch_size.max(1),
            state: Arc::new(RwLock::new(TrainingStatus::default())),
        }
    }

    /// A consistent snapshot of the training state. Never waits on the
    /// worker; safe to call at any time, including before any run.
    pub fn status(&self) -> TrainingStatus {
        read_lock(&self.state).clone()
    }

    /// Admit and launch a training run. Returns as soon as the run is
    /// admitted; progress is observed through [`status`](Self::status).
    ///
    /// Fails with `InvalidInput` when the store is empty and with
    /// `AlreadyRunning` when a run is active (no state change).
    pub async fn start(&self) -> Result<()> {
        if self.store.count().await? == 0 {
            return Err(Error::InvalidInput("no documents to train".to_string()));
        }

        // Admission and the flag flip happen under one write lock so two
        // concurrent starts cannot both be admitted.
        {
            let mut st = write_lock(&self.state);
            if st.is_training {
                return Err(Error::AlreadyRunning);
            }
            *st = TrainingStatus {
                is_training: true,
                stage: "Starting...".to_string(),
                progress: 0,
                message: String::new(),
            };
        }

        let sup = self.clone();
        tokio::spawn(async move {
            // The pipeline runs on its own task so that even a panic in it
            // surfaces here as a join error and still reaches the terminal
            // state write below.
            let worker = tokio::spawn({
                let sup = sup.clone();
                async move { sup.run().await }
            });
            let outcome = match worker.await {
                Ok(result) => result,
                Err(e) => Err(Error::Persistence(format!("training task aborted: {}", e))),
            };

            // Terminal state is written unconditionally: no outcome leaves
            // is_training stuck true.
            let mut st = write_lock(&sup.state);
            st.is_training = false;
            match outcome {
                Ok((docs, chunks)) => {
                    st.stage = "Complete".to_string();
                    st.progress = 100;
                    st.message = format!("Indexed {} documents, {} chunks.", docs, chunks);
                }
                Err(e) => {
                    st.stage = "Error".to_string();
                    st.message = e.to_string();
                }
            }
        });

        Ok(())
    }

    /// One full pipeline pass. Any error aborts the run before commit, so
    /// the index keeps its previous committed contents.
    async fn run(&self) -> Result<(usize, usize)> {
        // Snapshot of the file set; mutations issued after this point do
        // not change what this run indexes.
        let snapshot = self.store.list().await?;
        let total_docs = snapshot.len();

        self.set_stage("Extracting pages...");
        let mut chunks = Vec::new();
        for (i, doc) in snapshot.iter().enumerate() {
            let bytes = self.store.read(&doc.filename).await?;
            let pages = self.extractor.extract_pages(&bytes)?;
            chunks.extend(chunk_pages(&doc.filename, &pages, &self.chunking));
            self.set_progress(scale(i + 1, total_docs, 0, EXTRACT_END));
        }

        self.set_stage("Embedding vectors...");
        let total_chunks = chunks.len();
        let mut vectors = Vec::with_capacity(total_chunks);
        let mut embedded = 0usize;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.provider.embed(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::Adapter(format!(
                    "embedding batch returned {} vectors for {} texts",
                    embeddings.len(),
                    batch.len()
                )));
            }
            for (chunk, embedding) in batch.iter().zip(embeddings) {
                vectors.push(IndexedVector {
                    chunk: chunk.clone(),
                    embedding,
                });
            }
            embedded += batch.len();
            self.set_progress(scale(embedded, total_chunks, EXTRACT_END, EMBED_END));
        }

        self.set_stage("Saving index...");
        self.set_progress(EMBED_END);
        self.index
            .commit(
                &vectors,
                total_docs as i64,
                self.provider.model_name(),
                self.provider.dims(),
            )
            .await?;
        self.set_progress(100);

        Ok((total_docs, total_chunks))
    }

    fn set_stage(&self, stage: &str) {
        let mut st = write_lock(&self.state);
        st.stage = stage.to_string();
    }

    /// Progress only moves forward within a run.
    fn set_progress(&self, progress: u8) {
        let mut st = write_lock(&self.state);
        st.progress = st.progress.max(progress);
    }
}

/// Map `done` out of `total` into the `[lo, hi]` slice of the progress range.
fn scale(done: usize, total: usize, lo: u8, hi: u8) -> u8 {
    if total == 0 {
        return hi;
    }
    lo + ((hi - lo) as usize * done / total) as u8
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
