//! Answer scoring and candidate summaries.
//!
//! Default: `HeuristicScorer` (keyword bags, deterministic, no network).
//! With an API key: `ModelScorer`, which asks the remote model and falls back
//! to the heuristic on any failure. Neither ever returns an error.
//!
//! `AppState` holds an `Arc<dyn AnswerScorer>`, chosen at startup from config.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::extraction::CandidateProfileFields;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, PLAIN_PROSE_SYSTEM};
use crate::llm_client::{strip_json_fences, CompletionModel};

use super::prompts::{score_prompt, summary_prompt};
use super::{AnsweredQuestion, Question, ScoredAnswer, Verdict};

const NO_ANSWER_FEEDBACK: &str = "No answer provided.";
const NO_FEEDBACK: &str = "No feedback provided";
/// Answers longer than this earn a thoroughness bonus.
const LONG_ANSWER_WORDS: usize = 30;
const LONG_ANSWER_BONUS: f64 = 0.15;
/// Personal-info answers shorter than this score zero.
const PERSONAL_INFO_MAX_WORDS: usize = 8;
const CORRECT_RATIO: f64 = 0.8;
const PARTIAL_RATIO: f64 = 0.35;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait AnswerScorer: Send + Sync {
    async fn score(&self, question: &Question, answer: &str) -> ScoredAnswer;

    async fn summarize(
        &self,
        profile: &CandidateProfileFields,
        answers: &[AnsweredQuestion],
        final_score: u32,
    ) -> String;
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct HeuristicScorer;

#[async_trait]
impl AnswerScorer for HeuristicScorer {
    async fn score(&self, question: &Question, answer: &str) -> ScoredAnswer {
        heuristic_score(question, answer)
    }

    async fn summarize(
        &self,
        profile: &CandidateProfileFields,
        _answers: &[AnsweredQuestion],
        final_score: u32,
    ) -> String {
        let name = profile
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Candidate");
        format!("{name} achieved a final score of {final_score}.")
    }
}

/// Ordered: the first pattern matching the question text picks the bag.
static TOPIC_RULES: Lazy<Vec<(Regex, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)virtual.*dom").unwrap(),
            &["virtual dom", "reconcile", "diffing", "fiber"][..],
        ),
        (
            Regex::new(r"(?i)usestate").unwrap(),
            &["usestate", "state", "hook"][..],
        ),
        (
            Regex::new(r"(?i)reconciliation|keys|list").unwrap(),
            &["key", "reconciliation", "list", "diff"][..],
        ),
        (
            Regex::new(r"(?i)rest.*graphql|graphql.*rest").unwrap(),
            &["rest", "graphql", "overfetching", "underfetching", "schema"][..],
        ),
        (
            Regex::new(r"(?i)ssr|server.*render").unwrap(),
            &["ssr", "server-side", "hydrate", "hydration", "cache", "render"][..],
        ),
        (
            Regex::new(r"(?i)traffic|profile|bottleneck|scale|session").unwrap(),
            &[
                "cluster",
                "pm2",
                "load balancer",
                "sticky",
                "profil",
                "cpu",
                "io",
                "horizontal",
                "redis",
            ][..],
        ),
    ]
});

static PERSONAL_INFO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)my name is|phone|email").unwrap());

fn no_answer() -> ScoredAnswer {
    ScoredAnswer {
        points: 0,
        verdict: Verdict::Incorrect,
        feedback: NO_ANSWER_FEEDBACK.to_string(),
    }
}

/// Keyword-coverage score.
pub fn heuristic_score(question: &Question, answer: &str) -> ScoredAnswer {
    let clean = answer.trim().to_lowercase();
    if clean.is_empty() {
        return no_answer();
    }
    let max = question.difficulty.max_points();

    let bag: &[&str] = TOPIC_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&question.text))
        .map(|(_, bag)| *bag)
        .unwrap_or(&[]);
    let matched = bag.iter().filter(|k| clean.contains(*k)).count();
    let mut points = (f64::from(max) * matched as f64 / bag.len().max(1) as f64).round() as u32;

    let words = clean.split_whitespace().count();
    if words > LONG_ANSWER_WORDS {
        let bonus = (f64::from(max) * LONG_ANSWER_BONUS).ceil() as u32;
        points = (points + bonus).min(max);
    }
    if words < PERSONAL_INFO_MAX_WORDS && PERSONAL_INFO.is_match(&clean) {
        points = 0;
    }

    let verdict = verdict_for(points, max);
    let feedback = match verdict {
        Verdict::Correct => "Good coverage of the key ideas.",
        Verdict::PartiallyCorrect => "Covers some points; could be more precise and complete.",
        Verdict::Incorrect => "Key concepts were missing or unclear.",
    };

    ScoredAnswer {
        points,
        verdict,
        feedback: feedback.to_string(),
    }
}

fn verdict_for(points: u32, max: u32) -> Verdict {
    let points = f64::from(points);
    let max = f64::from(max);
    if points >= max * CORRECT_RATIO {
        Verdict::Correct
    } else if points >= max * PARTIAL_RATIO {
        Verdict::PartiallyCorrect
    } else {
        Verdict::Incorrect
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ModelScorer
// ────────────────────────────────────────────────────────────────────────────

/// Remote-model scorer with the heuristic as its safety net.
pub struct ModelScorer {
    model: Arc<dyn CompletionModel>,
}

impl ModelScorer {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl AnswerScorer for ModelScorer {
    async fn score(&self, question: &Question, answer: &str) -> ScoredAnswer {
        if answer.trim().is_empty() {
            return no_answer();
        }

        let prompt = score_prompt(question, answer);
        match self.model.complete(JSON_ONLY_SYSTEM, &prompt).await {
            Ok(reply) => parse_model_score(&reply, question.difficulty.max_points())
                .unwrap_or_else(|| {
                    warn!("Unparseable score reply for {}, using heuristic", question.id);
                    heuristic_score(question, answer)
                }),
            Err(e) => {
                debug!("Remote scoring skipped for {}: {e}", question.id);
                heuristic_score(question, answer)
            }
        }
    }

    async fn summarize(
        &self,
        profile: &CandidateProfileFields,
        answers: &[AnsweredQuestion],
        final_score: u32,
    ) -> String {
        let prompt = summary_prompt(profile, answers, final_score);
        match self.model.complete(PLAIN_PROSE_SYSTEM, &prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                debug!("Remote summary skipped: {e}");
                format!("Final score {final_score}. (Offline summary)")
            }
        }
    }
}

static FIRST_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Whole reply as JSON, else the outermost `{...}` span inside it.
fn first_json_object(reply: &str) -> Option<Value> {
    let reply = strip_json_fences(reply);
    let value = serde_json::from_str::<Value>(reply).ok().or_else(|| {
        FIRST_OBJECT
            .find(reply)
            .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
    })?;
    value.is_object().then_some(value)
}

/// Clamps points to `[0, max]`; unknown verdicts become `incorrect`.
fn parse_model_score(reply: &str, max: u32) -> Option<ScoredAnswer> {
    let value = first_json_object(reply)?;

    let raw_points = match value.get("points") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    let points = if raw_points.is_finite() {
        raw_points.clamp(0.0, f64::from(max)).round() as u32
    } else {
        0
    };

    let verdict = match value.get("verdict").and_then(Value::as_str) {
        Some("correct") => Verdict::Correct,
        Some("partially_correct") => Verdict::PartiallyCorrect,
        _ => Verdict::Incorrect,
    };

    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(NO_FEEDBACK)
        .to_string();

    Some(ScoredAnswer {
        points,
        verdict,
        feedback,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::interview::generate_questions;
    use crate::llm_client::LlmError;

    /// Replies with a canned result and counts calls.
    struct ScriptedModel {
        reply: Mutex<Option<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Ok(reply.to_string()))),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: LlmError) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Err(error))),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    fn question(index: usize) -> Question {
        generate_questions(None)[index].clone()
    }

    #[test]
    fn test_full_keyword_coverage_is_correct() {
        let scored = heuristic_score(
            &question(0),
            "The Virtual DOM enables cheap diffing; React Fiber can reconcile in chunks",
        );
        assert_eq!(scored.points, 5);
        assert_eq!(scored.verdict, Verdict::Correct);
        assert_eq!(scored.feedback, "Good coverage of the key ideas.");
    }

    #[test]
    fn test_partial_coverage_rounds() {
        // 1 of 3 keywords on an EASY question: round(5/3) = 2
        let scored = heuristic_score(&question(1), "it is a hook");
        assert_eq!(scored.points, 2);
        assert_eq!(scored.verdict, Verdict::PartiallyCorrect);
    }

    #[test]
    fn test_long_answer_bonus_is_capped() {
        let filler = "and then we would carefully walk through it ".repeat(4);
        let answer = format!("REST endpoints versus a GraphQL schema {filler}");
        assert!(answer.split_whitespace().count() > LONG_ANSWER_WORDS);

        // 3 of 5 keywords on MEDIUM: round(6) + ceil(1.5) = 8
        let scored = heuristic_score(&question(3), &answer);
        assert_eq!(scored.points, 8);
        assert_eq!(scored.verdict, Verdict::Correct);

        let saturated = format!("rest graphql overfetching underfetching schema {filler}");
        assert_eq!(heuristic_score(&question(3), &saturated).points, 10);
    }

    #[test]
    fn test_short_personal_info_scores_zero() {
        let scored = heuristic_score(&question(0), "my name is jane, virtual dom diffing");
        assert_eq!(scored.points, 0);
        assert_eq!(scored.verdict, Verdict::Incorrect);
    }

    #[test]
    fn test_blank_answer() {
        assert_eq!(heuristic_score(&question(4), "   \n"), no_answer());
    }

    #[test]
    fn test_topic_rules_pick_expected_bags() {
        let hard_scale = heuristic_score(
            &question(5),
            "use cluster mode behind a load balancer with sticky routing in redis",
        );
        // 4 of 9 keywords on HARD: round(15 * 4 / 9) = 7
        assert_eq!(hard_scale.points, 7);

        let ssr = heuristic_score(&question(4), "hydrate after server-side render, cache html");
        // hydrate, server-side, cache, render: round(15 * 4 / 6) = 10
        assert_eq!(ssr.points, 10);
    }

    #[test]
    fn test_parse_model_score_clamps_and_defaults() {
        let scored = parse_model_score(r#"{"points": 42, "verdict": "correct", "feedback": " Solid. "}"#, 10)
            .unwrap();
        assert_eq!(scored.points, 10);
        assert_eq!(scored.verdict, Verdict::Correct);
        assert_eq!(scored.feedback, "Solid.");

        let scored = parse_model_score(r#"{"points": -3, "verdict": "great", "feedback": ""}"#, 10).unwrap();
        assert_eq!(scored.points, 0);
        assert_eq!(scored.verdict, Verdict::Incorrect);
        assert_eq!(scored.feedback, NO_FEEDBACK);
    }

    #[test]
    fn test_parse_model_score_finds_embedded_object() {
        let reply = "Here is the result:\n{\"points\": \"7\", \"verdict\": \"partially_correct\", \"feedback\": \"ok\"}\nThanks";
        let scored = parse_model_score(reply, 10).unwrap();
        assert_eq!(scored.points, 7);
        assert_eq!(scored.verdict, Verdict::PartiallyCorrect);

        assert!(parse_model_score("no json here", 10).is_none());
        assert!(parse_model_score("[1, 2]", 10).is_none());
    }

    #[tokio::test]
    async fn test_model_scorer_uses_reply() {
        let model = ScriptedModel::replying(
            "```json\n{\"points\": 4, \"verdict\": \"correct\", \"feedback\": \"Nice\"}\n```",
        );
        let scorer = ModelScorer::new(model.clone());
        let scored = scorer.score(&question(0), "something").await;
        assert_eq!(scored.points, 4);
        assert_eq!(scored.feedback, "Nice");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_scorer_falls_back_to_heuristic() {
        let answer = "it is a hook";
        let expected = heuristic_score(&question(1), answer);

        let failing = ModelScorer::new(ScriptedModel::failing(LlmError::CoolingDown));
        assert_eq!(failing.score(&question(1), answer).await, expected);

        let garbled = ModelScorer::new(ScriptedModel::replying("I'd give it a B+"));
        assert_eq!(garbled.score(&question(1), answer).await, expected);
    }

    #[tokio::test]
    async fn test_model_scorer_skips_model_for_blank_answer() {
        let model = ScriptedModel::replying("{}");
        let scorer = ModelScorer::new(model.clone());
        assert_eq!(scorer.score(&question(0), "").await, no_answer());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summaries() {
        let profile = CandidateProfileFields {
            name: Some("Jane Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(
            HeuristicScorer.summarize(&profile, &[], 27).await,
            "Jane Doe achieved a final score of 27."
        );
        assert_eq!(
            HeuristicScorer
                .summarize(&CandidateProfileFields::default(), &[], 0)
                .await,
            "Candidate achieved a final score of 0."
        );

        let remote = ModelScorer::new(ScriptedModel::replying("Strong React fundamentals."));
        assert_eq!(
            remote.summarize(&profile, &[], 27).await,
            "Strong React fundamentals."
        );

        let offline = ModelScorer::new(ScriptedModel::failing(LlmError::RateLimited));
        assert_eq!(
            offline.summarize(&profile, &[], 27).await,
            "Final score 27. (Offline summary)"
        );
    }
}
