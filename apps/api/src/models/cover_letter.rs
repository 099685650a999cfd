use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CoverLetterStatus {
    Active,
    Archived,
}

impl CoverLetterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

/// The four fixed sections of a cover letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CoverLetterContent {
    pub introduction: String,
    pub body_part_1: String,
    pub body_part_2: String,
    pub conclusion: String,
}

impl CoverLetterContent {
    /// Sections in reading order, paired with their field names.
    pub fn sections(&self) -> [(&'static str, &str); 4] {
        [
            ("introduction", &self.introduction),
            ("body_part_1", &self.body_part_1),
            ("body_part_2", &self.body_part_2),
            ("conclusion", &self.conclusion),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CoverLetterRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[schema(value_type = CoverLetterContent)]
    pub content: Json<CoverLetterContent>,
    pub status: String,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which section the LLM should write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentSection {
    Introduction,
    #[serde(rename = "body_part_1")]
    BodyPart1,
    #[serde(rename = "body_part_2")]
    BodyPart2,
    Conclusion,
}

impl ContentSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::BodyPart1 => "body_part_1",
            Self::BodyPart2 => "body_part_2",
            Self::Conclusion => "conclusion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "introduction" => Some(Self::Introduction),
            "body_part_1" => Some(Self::BodyPart1),
            "body_part_2" => Some(Self::BodyPart2),
            "conclusion" => Some(Self::Conclusion),
            _ => None,
        }
    }
}
