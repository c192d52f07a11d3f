// Fragments shared by every screening prompt. Prompts specific to one stage
// live in a prompts.rs next to that stage.

/// System prompt that forces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to prompts that reason about a candidate.
pub const FAIRNESS_INSTRUCTION: &str = "\
    Judge only job-relevant evidence: skills, experience and education. \
    Ignore name, gender, age, nationality and any other protected attribute. \
    Do not invent facts that are not present in the input.";

/// Caps a free-text field before it is embedded in a prompt.
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_prompt() {
        assert_eq!(truncate_for_prompt("  short  ", 10), "short");
        assert_eq!(truncate_for_prompt("abcdef", 3), "abc…");
    }
}
