/// Prompt for the post-scoring assessment of one candidate against one job.
/// Placeholders are filled with `str::replace`.
pub const EXPLANATION_PROMPT: &str = r#"Write a professional screening assessment from the scores below.
The scores are final. Explain them; do not re-score.

=== CANDIDATE ===
Name: {candidate_name}
Total experience: {years} years
Education: {education}

=== SCORES (0-100) ===
Overall: {overall}
Skills: {skill}
Experience: {experience}
Education: {education_score}
Semantic similarity (0-1): {similarity}
All must-have skills present: {must_have_met}

Matched skills ({n_matched}): {matched}
Missing skills ({n_missing}): {missing}
Bonus skills ({n_bonus}): {bonus}

=== JOB ===
Title: {job_title}
Minimum experience: {min_years} years
Requirements:
{requirements}

{fairness}

Return EXACTLY this JSON object:
{
  "strengths": ["specific, evidence-backed strength"],
  "weaknesses": ["specific gap or concern"],
  "explanation": "Two or three short paragraphs: score rationale and key factors.",
  "recommendation": "One sentence: SHORTLIST / MAYBE / REJECT with the reason.",
  "decision": "shortlisted | maybe | rejected",
  "interview_questions": ["question probing a claimed skill", "question probing the biggest gap"],
  "red_flags": ["claim that needs verification; empty list if none"],
  "growth_potential": "One sentence on growth trajectory."
}
"#;

/// Prompt that extracts structured skill requirements from a job posting.
pub const JOB_ANALYSIS_PROMPT: &str = r#"Extract the skills this job asks for.

Job title: {title}

Job posting:
{job_text}

Return EXACTLY this JSON object:
{
  "skills": [
    {"name": "Rust", "category": "technical", "importance": "must_have", "years_required": 3.0}
  ],
  "education_requirement": "bachelor"
}

importance must be one of: must_have | required | preferred | nice_to_have
education_requirement must be one of: high_school | associate | bachelor | master | mba | phd | any
List each skill once, most important first.
"#;
