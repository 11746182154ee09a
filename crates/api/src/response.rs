//! Shared response types for API handlers.

use serde::Serialize;
use sigflow_core::types::DbId;

/// `{ "success": true, "id": <generated> }` returned after a result is persisted.
#[derive(Debug, Serialize)]
pub struct PersistedResponse {
    pub success: bool,
    pub id: DbId,
}

impl PersistedResponse {
    pub fn created(id: DbId) -> Self {
        Self { success: true, id }
    }
}
