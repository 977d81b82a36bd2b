//! Instruction template for the resume extraction agent

/// Build the fixed instruction prompt with the resume text embedded.
///
/// The template demands strict JSON so the response parser can usually
/// take the fast path; the balanced-brace fallback exists for models
/// that wrap the object in prose anyway.
pub fn build_prompt(resume_text: &str) -> String {
    format!(
        r#"You are a professional resume analyst preparing a candidate profile for interviews.

Parse the resume below and extract its key information. Rules:
- Extract only real information present in the resume; use an empty string or empty list when something is absent.
- Return a single JSON object and nothing else: no prose, no code fences.

Steps:
1. Extract basics (name, total work years, contact), education, work experience, tech stack, projects, skills and certifications.
2. Assess the candidate's background: main technical direction, career trajectory, core strengths.
3. Produce interview guidance: focus areas, question directions, likely weaknesses, and a recommended difficulty (junior/intermediate/senior).

Required JSON shape:
{{
  "basic_info": {{"name": "", "work_years": "", "contact": ""}},
  "education": [{{"school": "", "major": "", "degree": "", "graduation_year": ""}}],
  "work_experience": [{{"company": "", "position": "", "duration": "", "responsibilities": ""}}],
  "tech_stack": [],
  "projects": [{{"name": "", "description": "", "tech_stack": [], "contribution": ""}}],
  "skills": [],
  "certifications": [],
  "strengths": "",
  "potential_weaknesses": "",
  "recommended_difficulty": "",
  "interview_focus_areas": [],
  "suggested_questions_directions": []
}}

Resume:
{resume_text}"#
    )
}
