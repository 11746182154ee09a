//! The persistence seam used by request handlers.
//!
//! Handlers talk to an `Arc<dyn AnalysisStore>` so the HTTP layer can be
//! exercised without a live database.

use async_trait::async_trait;
use sigflow_core::record::{AnalysisRecord, NewAnalysisRecord, RecordKind};
use sigflow_core::types::DbId;

use crate::repositories::AnalysisRepo;
use crate::DbPool;

/// Insert one record or fetch the latest one of a kind.
///
/// Each request issues at most one call, so no transaction spans calls.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persist `record` and return its store-assigned id.
    async fn insert(&self, record: &NewAnalysisRecord) -> Result<DbId, sqlx::Error>;

    /// The record of `kind` with the highest id, `None` when there is none.
    async fn fetch_latest(&self, kind: RecordKind) -> Result<Option<AnalysisRecord>, sqlx::Error>;

    /// Confirm the backing store is reachable.
    async fn health_check(&self) -> Result<(), sqlx::Error>;
}

/// [`AnalysisStore`] over the process-wide PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgAnalysisStore {
    pool: DbPool,
}

impl PgAnalysisStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn insert(&self, record: &NewAnalysisRecord) -> Result<DbId, sqlx::Error> {
        let id = match record {
            NewAnalysisRecord::Simple { analysis_data } => {
                AnalysisRepo::insert_analysis(&self.pool, analysis_data).await?
            }
            NewAnalysisRecord::Fft {
                sampling_frequency,
                fft_data,
            } => AnalysisRepo::insert_fft(&self.pool, *sampling_frequency, fft_data).await?,
        };
        tracing::debug!(id, kind = ?record.kind(), "Inserted analysis record");
        Ok(id)
    }

    async fn fetch_latest(&self, kind: RecordKind) -> Result<Option<AnalysisRecord>, sqlx::Error> {
        let record = match kind {
            RecordKind::Simple => AnalysisRepo::find_latest_analysis(&self.pool)
                .await?
                .map(AnalysisRecord::from),
            RecordKind::Fft => AnalysisRepo::find_latest_fft(&self.pool)
                .await?
                .map(AnalysisRecord::from),
        };
        Ok(record)
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        crate::health_check(&self.pool).await
    }
}
