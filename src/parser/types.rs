//! Structured parse result
//!
//! The shape the agent is instructed to return. Every field defaults so
//! a partially filled response still deserializes; emptiness is judged
//! afterwards by `is_substantive`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub name: String,
    pub work_years: String,
    pub contact: String,
}

impl BasicInfo {
    fn is_empty(&self) -> bool {
        self.name.is_empty() && self.work_years.is_empty() && self.contact.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: String,
    pub major: String,
    pub degree: String,
    pub graduation_year: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub duration: String,
    pub responsibilities: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseResult {
    pub basic_info: BasicInfo,
    pub education: Vec<Education>,
    pub work_experience: Vec<WorkExperience>,
    pub tech_stack: Vec<String>,
    /// Free-form: models vary too much in project shape to pin it down.
    pub projects: Vec<serde_json::Value>,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub strengths: String,
    pub potential_weaknesses: String,
    pub recommended_difficulty: String,
    pub interview_focus_areas: Vec<String>,
    pub suggested_questions_directions: Vec<String>,
}

impl ParseResult {
    /// A result is valid if anything at all was extracted. This guards
    /// against a model that answers mechanically with an empty skeleton.
    pub fn is_substantive(&self) -> bool {
        !self.basic_info.is_empty()
            || !self.education.is_empty()
            || !self.work_experience.is_empty()
            || !self.tech_stack.is_empty()
            || !self.projects.is_empty()
            || !self.skills.is_empty()
            || !self.certifications.is_empty()
            || !self.strengths.is_empty()
            || !self.potential_weaknesses.is_empty()
            || !self.recommended_difficulty.is_empty()
            || !self.interview_focus_areas.is_empty()
            || !self.suggested_questions_directions.is_empty()
    }
}
