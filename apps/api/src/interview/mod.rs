//! Interview collaborators: the fixed question bank and answer scoring.

pub mod handlers;
pub mod prompts;
pub mod questions;
pub mod scoring;

use serde::{Deserialize, Serialize};

pub use questions::generate_questions;
pub use scoring::{AnswerScorer, HeuristicScorer, ModelScorer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Points awarded for a fully correct answer.
    pub fn max_points(self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 10,
            Difficulty::Hard => 15,
        }
    }

    /// Answer time limit in seconds.
    pub fn seconds(self) -> u32 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    PartiallyCorrect,
    Incorrect,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Correct => "correct",
            Verdict::PartiallyCorrect => "partially_correct",
            Verdict::Incorrect => "incorrect",
        }
    }
}

/// Outcome of scoring one answer. `points` is within `0..=difficulty.max_points()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredAnswer {
    pub points: u32,
    pub verdict: Verdict,
    pub feedback: String,
}

/// One question/answer pair fed into the candidate summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question: Question,
    pub answer: String,
    pub score: u32,
    #[serde(default)]
    pub verdict: Option<Verdict>,
}
