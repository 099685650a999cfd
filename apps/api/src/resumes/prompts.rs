// Prompts for resume extraction and scoring.

/// Shape the model fills from the resume text. Fields with no information are omitted.
pub const CV_TEMPLATE: &str = r#"{
  "personal_info": {
    "full_name": "",
    "title": "",
    "email": "",
    "phone": "",
    "location": "",
    "links": [{"type": "linkedin", "url": ""}]
  },
  "summary": "",
  "experience": [
    {
      "company": "",
      "position": "",
      "location": "",
      "start_date": "YYYY-MM",
      "end_date": "YYYY-MM or present",
      "description": "",
      "achievements": [""],
      "technologies": [""]
    }
  ],
  "education": [
    {
      "institution": "",
      "degree": "",
      "field_of_study": "",
      "start_date": "YYYY",
      "end_date": "YYYY"
    }
  ],
  "skills": {
    "technical": [""],
    "soft": [""]
  },
  "languages": [{"language": "", "level": ""}],
  "certifications": [{"name": "", "issuer": "", "date": ""}],
  "projects": [{"name": "", "description": "", "technologies": [""]}]
}"#;

/// Extraction prompt. Replace `{template}` and `{resume_text}` before sending.
pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Analyze the provided resume and extract its information as JSON.
Use the following structure, but include only fields that have information in the resume:
{template}

Instructions:
1. Carefully examine the resume text.
2. Extract only available information, skipping empty fields.
3. Make sure all strings are properly escaped.
4. Keep the language of the resume for all extracted values.

Resume text:
{resume_text}"#;

/// Scoring prompt. Replace `{candidate_json}` before sending.
pub const ANALYZE_PROMPT_TEMPLATE: &str = r#"Analyze this resume data and score it against the following criteria:

1. Presence of key sections (0-30):
   Summary, Experience, Skills and Education. Each missing section reduces the score proportionally.
2. Work experience quality using the STAR method (0-40):
   How well each position describes Situation, Task, Action and Result, with measurable achievements.
3. Education and certifications relevance (0-10).
4. Timeline consistency (0-10):
   Date contradictions and employment gaps longer than 2 months.
5. Language and grammar (0-10):
   Grammatical errors, conciseness and formal tone.

Resume data:
{candidate_json}

Return JSON with this exact structure:
{
  "scoring": {
    "total_score": 0,
    "sections_score": 0,
    "experience_score": 0,
    "education_score": 0,
    "timeline_score": 0,
    "language_score": 0
  },
  "feedback": {
    "sections": "",
    "experience": "",
    "education": "",
    "timeline": "",
    "language": ""
  }
}

Each score must stay within its range and total_score must be the sum of the others.
Give specific, actionable feedback for each category."#;

pub fn extract_prompt(resume_text: &str) -> String {
    EXTRACT_PROMPT_TEMPLATE
        .replace("{template}", CV_TEMPLATE)
        .replace("{resume_text}", resume_text)
}

pub fn analyze_prompt(candidate_json: &str) -> String {
    ANALYZE_PROMPT_TEMPLATE.replace("{candidate_json}", candidate_json)
}
