//! Question bank: two EASY, two MEDIUM and two HARD questions, in that order.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Difficulty, Question};

const BANK: &[(&str, Difficulty, &str)] = &[
    (
        "q1",
        Difficulty::Easy,
        "What is the virtual DOM in React and why is it useful?",
    ),
    (
        "q2",
        Difficulty::Easy,
        "Explain the purpose of useState in React.",
    ),
    (
        "q3",
        Difficulty::Medium,
        "How does React's reconciliation work when keys change in a list?",
    ),
    (
        "q4",
        Difficulty::Medium,
        "Describe the difference between REST and GraphQL for a Node/Express backend.",
    ),
    (
        "q5",
        Difficulty::Hard,
        "Design an SSR strategy for a React app that fetches data and hydrates on the client. \
         What pitfalls would you watch for?",
    ),
    (
        "q6",
        Difficulty::Hard,
        "Given a high-traffic Node.js service, how would you profile, detect bottlenecks (CPU/I/O), \
         and scale horizontally while keeping sessions consistent?",
    ),
];

/// Replaces q5 when the resume mentions server-side rendering.
const TAILORED_SSR_QUESTION: &str = "You mentioned SSR in your resume. Outline an SSR setup for \
    React (Next.js or custom Express) including data fetching and caching. Discuss hydration and \
    performance trade-offs.";

static SSR_EXPERIENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)next\.js|remix|ssr").unwrap());

/// Builds the interview, tailoring the first HARD question to the resume.
pub fn generate_questions(resume_text: Option<&str>) -> Vec<Question> {
    let mentions_ssr = resume_text.is_some_and(|text| SSR_EXPERIENCE.is_match(text));

    BANK.iter()
        .map(|&(id, difficulty, text)| {
            let text = if id == "q5" && mentions_ssr {
                TAILORED_SSR_QUESTION
            } else {
                text
            };
            Question {
                id: id.to_string(),
                text: text.to_string(),
                difficulty,
                seconds: difficulty.seconds(),
            }
        })
        .collect()
}
