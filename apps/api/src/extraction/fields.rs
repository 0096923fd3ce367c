//! Field Extractor: best-effort name, email and phone from normalized resume text.
//!
//! Pure and deterministic. Absence of a field is a normal outcome: callers
//! prompt the user for whatever is missing.
//!
//! Name detection is an ordered rule table ([`NAME_LINE_RULES`]) evaluated top
//! to bottom; the first rule that selects a line wins. Only when no rule
//! selects a line (or the selected line cleans to nothing) is the name derived
//! from the email username.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured fields pulled out of resume text. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfileFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CandidateProfileFields {
    /// Names of the fields that could not be extracted, in `name, email, phone` order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_none()),
            ("email", self.email.is_none()),
            ("phone", self.phone.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Patterns
// ────────────────────────────────────────────────────────────────────────────

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap());

/// Optional +91, optional trunk zero, then 2–5 / 3–5 / 3–5 digit groups.
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?\s?91[\s\-]?)?(0?\s*)?\(?[0-9]{2,5}\)?[\s.\-]?[0-9]{3,5}[\s.\-]?[0-9]{3,5}").unwrap()
});
static NON_PHONE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9+]").unwrap());
static LEADING_DOUBLE_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^00").unwrap());
static COUNTRY_CODE_TRUNK_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\+?91)0+").unwrap());

static SECTION_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(curriculum|resume|résumé|cv|objective|summary|profile|education|experience|projects|skills|phone|email|contact)",
    )
    .unwrap()
});
static NAME_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^name\s*[:\-]").unwrap());
static NON_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z.'\-\s]").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").unwrap());

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());
static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static USERNAME_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\-.]+").unwrap());

/// Surnames recognized as the tail of a glued `firstnamesurname` username.
/// Checked in order; the first suffix match wins.
const COMMON_SURNAMES: &[&str] = &[
    "kapoor", "kumar", "kannan", "singh", "sharma", "gupta", "verma", "yadav", "khan", "das",
    "nair", "reddy", "rao", "mehta", "agarwal", "agrawal", "banerjee", "bose", "bhattacharya",
    "iyer", "iyengar", "mishra", "joshi", "pandey", "tiwari", "choudhary", "chowdhury", "saxena",
    "garg", "jain", "patel", "roy", "paul", "saha", "sen", "ghosh", "gopal", "raj", "gowda",
    "shetty",
];

const MAX_NAME_TOKENS: usize = 4;
const MIN_GLUED_USERNAME_LEN: usize = 8;

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// Extracts candidate fields from normalized text.
pub fn extract_fields(text: &str) -> CandidateProfileFields {
    let lines: Vec<String> = LINE_BREAKS
        .split(text)
        .map(|l| l.replace('\u{00A0}', " ").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    let email = extract_email(text);
    let phone = extract_phone(text);
    let name = select_name_line(&lines)
        .and_then(name_from_line)
        .or_else(|| {
            email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .and_then(username_to_human_name)
        });

    CandidateProfileFields { name, email, phone }
}

/// First `local@domain.tld` match, case-insensitive.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Longest plausible phone number; ties go to the earliest match.
pub fn extract_phone(text: &str) -> Option<String> {
    let mut best: Option<String> = None;
    for candidate in PHONE.find_iter(text) {
        let normalized = normalize_phone(candidate.as_str());
        if !is_plausible_phone(&normalized) {
            continue;
        }
        if best.as_ref().map_or(true, |b| normalized.len() > b.len()) {
            best = Some(normalized);
        }
    }
    best
}

/// Keeps digits and `+`, turns a leading `00` into `+`, drops trunk zeros after `91`/`+91`.
fn normalize_phone(raw: &str) -> String {
    let digits = NON_PHONE_CHARS.replace_all(raw, "");
    let international = LEADING_DOUBLE_ZERO.replace(&digits, "+");
    COUNTRY_CODE_TRUNK_ZERO
        .replace(&international, "$1")
        .into_owned()
}

fn is_plausible_phone(normalized: &str) -> bool {
    let len = normalized.len();
    if normalized.starts_with('+') {
        (12..=14).contains(&len)
    } else {
        (10..=12).contains(&len)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Name line selection
// ────────────────────────────────────────────────────────────────────────────

/// One name-line rule: a predicate applied to the first `window` lines
/// (all lines when `None`).
pub struct NameLineRule {
    pub label: &'static str,
    pub window: Option<usize>,
    pub matches: fn(&str) -> bool,
}

/// Rules in priority order.
pub const NAME_LINE_RULES: &[NameLineRule] = &[
    NameLineRule {
        label: "labelled name line",
        window: None,
        matches: is_labelled_name,
    },
    NameLineRule {
        label: "leading name-like line",
        window: Some(6),
        matches: looks_like_name,
    },
];

fn select_name_line(lines: &[String]) -> Option<&str> {
    NAME_LINE_RULES.iter().find_map(|rule| {
        let window = rule.window.unwrap_or(lines.len()).min(lines.len());
        lines[..window]
            .iter()
            .map(String::as_str)
            .find(|line| (rule.matches)(line))
    })
}

fn is_labelled_name(line: &str) -> bool {
    NAME_LABEL.is_match(line)
}

/// Not a section heading, and 2–5 words once non-name characters are removed.
fn looks_like_name(line: &str) -> bool {
    if SECTION_WORDS.is_match(line) {
        return false;
    }
    let clean = clean_name_text(line);
    if clean.is_empty() {
        return false;
    }
    let words = clean.split(' ').count();
    (2..=5).contains(&words)
}

fn clean_name_text(text: &str) -> String {
    let letters = NON_NAME_CHARS.replace_all(text, " ");
    WHITESPACE_RUN.replace_all(&letters, " ").trim().to_string()
}

/// Strips a `Name:` label and punctuation, title-cases, drops OCR-doubled
/// tokens and keeps at most four tokens.
fn name_from_line(line: &str) -> Option<String> {
    let unlabelled = NAME_LABEL.replace(line, "");
    let clean = clean_name_text(&unlabelled);
    if clean.is_empty() {
        return None;
    }

    let mut tokens: Vec<String> = Vec::new();
    for token in clean.split(' ').map(title_case) {
        if tokens.last() != Some(&token) {
            tokens.push(token);
        }
    }
    tokens.truncate(MAX_NAME_TOKENS);
    Some(tokens.join(" "))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Username → human name fallback
// ────────────────────────────────────────────────────────────────────────────

/// Turns an email local part into a display name, e.g. `akashkapoor` → `Akash Kapoor`.
///
/// Digits are dropped, camelCase and `_`/`-`/`.` separators become spaces. A
/// single glued token of 8+ characters is split before a known surname suffix,
/// or failing that at a vowel→consonant boundary near the middle.
pub fn username_to_human_name(username: &str) -> Option<String> {
    let without_digits = DIGITS.replace_all(username, "");
    let camel_split = CAMEL_BOUNDARY.replace_all(&without_digits, "$1 $2");
    let separated = USERNAME_SEPARATORS.replace_all(&camel_split, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&separated, " ");
    let mut words: Vec<String> = collapsed.split_whitespace().map(String::from).collect();

    if words.is_empty() {
        return None;
    }

    if words.len() == 1 && words[0].chars().count() >= MIN_GLUED_USERNAME_LEN {
        let glued: Vec<char> = words[0].chars().collect();
        let at = surname_split_point(&glued).unwrap_or_else(|| vowel_split_point(&glued));
        words = vec![
            glued[..at].iter().collect(),
            glued[at..].iter().collect(),
        ];
    }

    Some(
        words
            .iter()
            .take(MAX_NAME_TOKENS)
            .map(|w| title_case(w))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Index where a known surname suffix starts, if the token ends with one and
/// has at least one character before it.
fn surname_split_point(glued: &[char]) -> Option<usize> {
    let lower: Vec<char> = glued.iter().map(|c| c.to_ascii_lowercase()).collect();
    COMMON_SURNAMES.iter().find_map(|surname| {
        let suffix: Vec<char> = surname.chars().collect();
        (lower.len() > suffix.len() && lower.ends_with(&suffix)).then(|| lower.len() - suffix.len())
    })
}

/// Splits right after the first vowel followed by a consonant among the
/// positions `mid-1, mid, mid+1`; the midpoint when none qualifies.
fn vowel_split_point(glued: &[char]) -> usize {
    let len = glued.len();
    let mid = len / 2;
    [mid.saturating_sub(1), mid, mid + 1]
        .into_iter()
        .filter(|&i| i > 1 && i + 1 < len)
        .find(|&i| is_vowel(glued[i]) && is_consonant(glued[i + 1]))
        .map(|i| i + 1)
        .unwrap_or(mid)
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_consonant(c: char) -> bool {
    let c = c.to_ascii_lowercase();
    c.is_ascii_lowercase() && !is_vowel(c)
}
