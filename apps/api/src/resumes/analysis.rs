use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::llm_client::{
    prompts::{candidate_json, JSON_ONLY_SYSTEM},
    LlmClient,
};
use crate::resumes::prompts::analyze_prompt;

pub const MAX_SECTIONS: u32 = 30;
pub const MAX_EXPERIENCE: u32 = 40;
pub const MAX_EDUCATION: u32 = 10;
pub const MAX_TIMELINE: u32 = 10;
pub const MAX_LANGUAGE: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResumeScoring {
    #[serde(default)]
    pub total_score: f64,
    #[serde(default)]
    pub sections_score: f64,
    #[serde(default)]
    pub experience_score: f64,
    #[serde(default)]
    pub education_score: f64,
    #[serde(default)]
    pub timeline_score: f64,
    #[serde(default)]
    pub language_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResumeFeedback {
    #[serde(default)]
    pub sections: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResumeAnalysis {
    #[serde(default)]
    pub scoring: ResumeScoring,
    #[serde(default)]
    pub feedback: ResumeFeedback,
}

impl ResumeAnalysis {
    /// Clamps every score into its range and recomputes the total as their sum.
    pub fn normalized(mut self) -> Self {
        let s = &mut self.scoring;
        s.sections_score = clamp(s.sections_score, MAX_SECTIONS);
        s.experience_score = clamp(s.experience_score, MAX_EXPERIENCE);
        s.education_score = clamp(s.education_score, MAX_EDUCATION);
        s.timeline_score = clamp(s.timeline_score, MAX_TIMELINE);
        s.language_score = clamp(s.language_score, MAX_LANGUAGE);
        s.total_score = s.sections_score
            + s.experience_score
            + s.education_score
            + s.timeline_score
            + s.language_score;
        self
    }
}

fn clamp(score: f64, max: u32) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, f64::from(max))
    } else {
        0.0
    }
}

pub async fn analyze_resume(llm: &LlmClient, parsed_data: &Value) -> Result<ResumeAnalysis, AppError> {
    let prompt = analyze_prompt(&candidate_json(parsed_data));
    let analysis: ResumeAnalysis = llm.call_json(&prompt, JSON_ONLY_SYSTEM).await?;
    Ok(analysis.normalized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::parse_json_reply;

    #[test]
    fn test_scores_clamped_and_total_recomputed() {
        let analysis = ResumeAnalysis {
            scoring: ResumeScoring {
                total_score: 500.0,
                sections_score: 45.0,
                experience_score: -3.0,
                education_score: 8.5,
                timeline_score: 12.0,
                language_score: 7.0,
            },
            feedback: ResumeFeedback::default(),
        }
        .normalized();
        assert_eq!(analysis.scoring.sections_score, 30.0);
        assert_eq!(analysis.scoring.experience_score, 0.0);
        assert_eq!(analysis.scoring.education_score, 8.5);
        assert_eq!(analysis.scoring.timeline_score, 10.0);
        assert_eq!(analysis.scoring.total_score, 55.5);
    }

    #[test]
    fn test_nan_score_becomes_zero() {
        let mut analysis = ResumeAnalysis::default();
        analysis.scoring.language_score = f64::NAN;
        assert_eq!(analysis.normalized().scoring.language_score, 0.0);
    }

    #[test]
    fn test_partial_model_reply_fills_defaults() {
        let reply = r#"Sure! {"scoring": {"sections_score": 25, "experience_score": 30}, "feedback": {"sections": "Add a summary"}}"#;
        let analysis = parse_json_reply::<ResumeAnalysis>(reply).unwrap().normalized();
        assert_eq!(analysis.scoring.total_score, 55.0);
        assert_eq!(analysis.feedback.sections, "Add a summary");
        assert!(analysis.feedback.language.is_empty());
    }
}
