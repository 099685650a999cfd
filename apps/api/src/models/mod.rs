pub mod cover_letter;
pub mod job_flow;
pub mod job_query;
pub mod resume;
pub mod user;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Body returned by every DELETE endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub message: String,
    pub id: Uuid,
}

impl DeletedResponse {
    pub fn new(what: &str, id: Uuid) -> Self {
        Self {
            message: format!("{what} deleted successfully"),
            id,
        }
    }
}
