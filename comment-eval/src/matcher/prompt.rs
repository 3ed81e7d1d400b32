//! Comparison prompt and verdict parsing shared by every matcher backend.

/// Fixed yes/no comparison prompt. `{comment1}` / `{comment2}` are replaced
/// by the generated and the reference note.
pub const SEMANTIC_COMPARISON_PROMPT_TEMPLATE: &str = r#"
-Role-

You are an expert code reviewer assistant specialized in analyzing and comparing code review comments.

-Task-

Determine whether two given review comments express the same concern or suggestion. Ignore differences in wording, tone, or formatting—focus solely on semantic equivalence of the underlying issue. If the core intent and technical substance are identical, answer "yes"; otherwise, answer "no".

-Review Comments-

Review Comment 1:
{comment1}

Review Comment 2:
{comment2}

-Task-

Determine whether the two review comments given above express the same concern or suggestion. Ignore differences in wording, tone, or formatting—focus solely on semantic equivalence of the underlying issue. If the core intent and technical substance are identical, answer "yes"; otherwise, answer "no".

Your answer:
"#;

const POSITIVE_KEYWORDS: [&str; 5] = ["yes", "similar", "same", "identical", "equivalent"];

/// Renders the comparison prompt for a pair of notes.
pub fn build_prompt(comment1: &str, comment2: &str) -> String {
    // Substitute comment2 first so a literal "{comment2}" inside comment1
    // survives untouched.
    SEMANTIC_COMPARISON_PROMPT_TEMPLATE
        .replacen("{comment2}", comment2, 1)
        .replacen("{comment1}", comment1, 1)
}

/// Keyword heuristic over the model's free-text answer.
///
/// Positive when any of `yes / similar / same / identical / equivalent`
/// occurs. If `yes` occurs, a `no` anywhere before the first `yes` turns the
/// verdict negative. Matching is on substrings, so "not" and "know" count as
/// `no` as well.
pub fn parse_similarity_response(response: &str) -> bool {
    let text = response.trim().to_lowercase();
    let has_positive = POSITIVE_KEYWORDS.iter().any(|k| text.contains(k));

    match text.find("yes") {
        Some(first_yes) => has_positive && !text[..first_yes].contains("no"),
        None => has_positive,
    }
}
