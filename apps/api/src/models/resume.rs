use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResumeStatus {
    Active,
    Archived,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

/// An uploaded resume file plus the structured data extracted from it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub file_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: String,
    /// `None` until extraction succeeds.
    #[schema(value_type = Option<Object>)]
    pub parsed_data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
