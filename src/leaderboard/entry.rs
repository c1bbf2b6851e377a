use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;

static DISALLOWED_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z0-9 _-]").expect("name filter regex is valid"));

/// One line of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u64,
}

/// A validated score submission, ready to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission(ScoreEntry);

// Shape expected from the request body. Any other shape is a format error.
#[derive(Deserialize)]
struct RawSubmission {
    name: String,
    score: f64,
}

impl Submission {
    /// Parse and validate a POST body.
    pub fn parse(body: &[u8], max_name_len: usize) -> Result<Self, SubmissionError> {
        let value = serde_json::from_slice::<serde_json::Value>(body)
            .map_err(|_| SubmissionError::InvalidJson)?;
        // serde would also accept a `["name", score]` sequence for a struct.
        if !value.is_object() {
            return Err(SubmissionError::InvalidFormat);
        }
        let raw = serde_json::from_value::<RawSubmission>(value)
            .map_err(|_| SubmissionError::InvalidFormat)?;

        let name = sanitize_name(&raw.name, max_name_len);
        if name.is_empty() {
            return Err(SubmissionError::InvalidName);
        }

        Ok(Submission(ScoreEntry {
            name,
            score: coerce_score(raw.score),
        }))
    }

    pub fn entry(&self) -> &ScoreEntry {
        &self.0
    }
}

/// Trim, truncate, uppercase, then drop anything outside `[A-Z0-9 _-]`.
///
/// Whitespace uncovered by the filter is trimmed again so the result is a
/// fixed point: sanitizing a sanitized name returns it unchanged.
pub fn sanitize_name(name: &str, max_len: usize) -> String {
    let truncated = name.trim().chars().take(max_len).collect::<String>();
    let upper = truncated.to_uppercase();
    let filtered = DISALLOWED_NAME_CHARS.replace_all(&upper, "");
    // Uppercasing can expand a char ("ß" -> "SS"), so cap the length once more.
    filtered.trim().chars().take(max_len).collect::<String>().trim_end().to_string()
}

/// Floor to an integer and clamp negatives to zero.
pub fn coerce_score(score: f64) -> u64 {
    // Float to int `as` casts saturate, so huge values land on u64::MAX.
    score.floor().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 18;

    #[test]
    fn test_sanitize_strips_and_uppercases() {
        assert_eq!(sanitize_name("  bob!! ", MAX), "BOB");
        assert_eq!(sanitize_name("ace_pilot-7", MAX), "ACE_PILOT-7");
        assert_eq!(sanitize_name("moon patrol", MAX), "MOON PATROL");
    }

    #[test]
    fn test_sanitize_truncates() {
        let name = "x".repeat(30);
        assert_eq!(sanitize_name(&name, MAX), "X".repeat(18));
    }

    #[test]
    fn test_sanitize_truncates_before_stripping() {
        // The 18 char window is taken before invalid chars are removed.
        let name = format!("{}abc", "!".repeat(16));
        assert_eq!(sanitize_name(&name, MAX), "AB");
    }

    #[test]
    fn test_sanitize_only_invalid_chars() {
        assert_eq!(sanitize_name("!!!???", MAX), "");
        assert_eq!(sanitize_name("   ", MAX), "");
        assert_eq!(sanitize_name("\u{1F680}", MAX), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "  bob!! ",
            "a !",
            "! a",
            "straße",
            "mixed\tWHITE space",
            "ＷＩＤＥ",
            "ﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀﬀ",
            "0123456789abcdefghijkl",
        ];
        for sample in samples {
            let once = sanitize_name(sample, MAX);
            assert_eq!(sanitize_name(&once, MAX), once, "sample {sample:?}");
            assert!(once.chars().count() <= MAX);
        }
    }

    #[test]
    fn test_coerce_score() {
        assert_eq!(coerce_score(-5.7), 0);
        assert_eq!(coerce_score(12.9), 12);
        assert_eq!(coerce_score(0.0), 0);
        assert_eq!(coerce_score(100.0), 100);
        assert_eq!(coerce_score(1e300), u64::MAX);
    }

    #[test]
    fn test_parse_valid_submission() {
        let submission = Submission::parse(br#"{"name":"aaa","score":100}"#, MAX).unwrap();
        assert_eq!(
            submission.entry(),
            &ScoreEntry {
                name: "AAA".to_string(),
                score: 100
            }
        );
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let submission =
            Submission::parse(br#"{"name":"zed","score":3.5,"level":4}"#, MAX).unwrap();
        assert_eq!(submission.entry().score, 3);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert_eq!(
            Submission::parse(b"{name: 'bob'", MAX),
            Err(SubmissionError::InvalidJson)
        );
        assert_eq!(Submission::parse(b"", MAX), Err(SubmissionError::InvalidJson));
    }

    #[test]
    fn test_parse_wrong_shape() {
        let bodies: [&[u8]; 7] = [
            br#"["bob",10]"#,
            br#"{"name":"bob"}"#,
            br#"{"score":10}"#,
            br#"{"name":"bob","score":"10"}"#,
            br#"{"name":7,"score":10}"#,
            b"null",
            b"[1,2]",
        ];
        for body in bodies {
            assert_eq!(
                Submission::parse(body, MAX),
                Err(SubmissionError::InvalidFormat)
            );
        }
    }

    #[test]
    fn test_parse_empty_name_after_sanitizing() {
        assert_eq!(
            Submission::parse(br#"{"name":"!!!","score":10}"#, MAX),
            Err(SubmissionError::InvalidName)
        );
    }
}
