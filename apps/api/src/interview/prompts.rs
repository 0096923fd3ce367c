// Prompt builders for interview scoring and the candidate summary.

use crate::extraction::CandidateProfileFields;

use super::{AnsweredQuestion, Question};

/// Asks for `{"points", "verdict", "feedback"}` for one answer.
pub fn score_prompt(question: &Question, answer: &str) -> String {
    [
        "You are a senior interviewer evaluating a candidate's answer.".to_string(),
        format!("Question: {}", question.text),
        format!("Answer: {answer}"),
        format!(
            "Difficulty: {} (max points = {}).",
            question.difficulty.as_str(),
            question.difficulty.max_points()
        ),
        r#"Return JSON only: {"points": number, "verdict": "correct"|"partially_correct"|"incorrect", "feedback": string}."#
            .to_string(),
        "Rules: be objective, reward correctness/clarity; do not give points for irrelevant personal info; \
         clamp points within range."
            .to_string(),
    ]
    .join("\n")
}

/// Asks for a 2-3 sentence interviewer-facing summary.
pub fn summary_prompt(
    profile: &CandidateProfileFields,
    answers: &[AnsweredQuestion],
    final_score: u32,
) -> String {
    let or_na = |field: &Option<String>| field.clone().unwrap_or_else(|| "N/A".to_string());

    let results = answers
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let verdict = a
                .verdict
                .map(|v| format!(" ({})", v.as_str()))
                .unwrap_or_default();
            format!(
                "Q{} ({}): \"{}\" → score {}/{}{}",
                i + 1,
                a.question.difficulty.as_str(),
                a.question.text,
                a.score,
                a.question.difficulty.max_points(),
                verdict
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    [
        "Summarize the interview for the interviewer.".to_string(),
        format!(
            "Candidate: {}  Email: {}  Phone: {}",
            or_na(&profile.name),
            or_na(&profile.email),
            or_na(&profile.phone)
        ),
        format!("Final score: {final_score}"),
        format!("Per-question results:\n{results}"),
        "Write 2-3 sentences: strengths, weaknesses, and recommendation.".to_string(),
    ]
    .join("\n")
}
