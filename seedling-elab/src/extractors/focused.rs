//! Deterministic extractor for the pending field
//!
//! Assigns the answer to the field the question targeted, normalised by the
//! field's declared kind. Answers with no recognisable value for that kind
//! produce an empty delta, which makes the engine re-ask the same field.
//! A numeric answer that states a total goes to the field's `total_field`
//! instead.

use serde_json::{json, Value};

use super::{ExtractionError, ExtractionOutcome, ExtractionRequest, MetadataExtractor};
use crate::models::schema::{FieldKind, Metadata};

/// Focused single-field extractor
#[derive(Debug, Clone, Default)]
pub struct FocusedFieldExtractor;

impl FocusedFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise `answer` for a field of `kind`
    pub fn normalise(kind: FieldKind, answer: &str) -> Option<Value> {
        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }

        match kind {
            FieldKind::Text => Some(json!(answer)),
            FieldKind::Integer => first_integer(answer).map(|n| json!(n)),
            FieldKind::Number => first_number(answer).map(|n| json!(n)),
            FieldKind::Duration => duration_days(answer).map(|n| json!(n)),
            FieldKind::List => {
                let items = split_list(answer);
                if items.is_empty() {
                    None
                } else {
                    Some(json!(items))
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for FocusedFieldExtractor {
    fn name(&self) -> &'static str {
        "focused"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError> {
        let Some(field) = &request.pending_field else {
            return Ok(ExtractionOutcome::empty());
        };

        let mut delta = Metadata::new();
        if let Some(value) = Self::normalise(field.kind, &request.answer) {
            let key = match &field.total_field {
                Some(total) if mentions_total(&request.answer) => total.clone(),
                _ => field.name.clone(),
            };
            delta.insert(key, value);
        }

        Ok(ExtractionOutcome {
            delta,
            suggestions: Vec::new(),
        })
    }
}

/// Digits (with thousands separators) of the first number in `text`
fn first_numeric_token(text: &str) -> Option<String> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut token = String::new();
    let mut chars = text[start..].chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '0'..='9' => token.push(c),
            ',' if chars.peek().is_some_and(|n| n.is_ascii_digit()) => {}
            '.' if chars.peek().is_some_and(|n| n.is_ascii_digit()) && !token.contains('.') => {
                token.push('.')
            }
            _ => break,
        }
    }

    Some(token)
}

fn first_integer(text: &str) -> Option<i64> {
    let token = first_numeric_token(text)?;
    let whole = token.split('.').next().unwrap_or_default();
    whole.parse().ok()
}

fn first_number(text: &str) -> Option<f64> {
    first_numeric_token(text)?.parse().ok()
}

fn mentions_total(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    ["total", "overall", "altogether", "in all"]
        .iter()
        .any(|marker| lower.contains(marker))
}

const NUMBER_WORDS: &[(&str, f64)] = &[
    ("a", 1.0),
    ("an", 1.0),
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("eleven", 11.0),
    ("twelve", 12.0),
    ("thirteen", 13.0),
    ("fourteen", 14.0),
    ("fifteen", 15.0),
    ("sixteen", 16.0),
    ("seventeen", 17.0),
    ("eighteen", 18.0),
    ("nineteen", 19.0),
    ("twenty", 20.0),
];

/// Days per unit word, `None` for words that are not a duration unit
fn unit_days(word: &str) -> Option<f64> {
    let word = word.trim_matches(|c: char| !c.is_ascii_alphabetic());
    if word.starts_with("fortnight") {
        Some(14.0)
    } else if word.starts_with("week") || word == "wk" || word == "wks" {
        Some(7.0)
    } else if word.starts_with("day") || word == "d" || word == "nights" || word == "night" {
        Some(1.0)
    } else {
        None
    }
}

/// Length in days of the first amount in `text`
///
/// "10 days" → 10, "2 weeks" → 14, "a fortnight" → 14, "one week" → 7.
/// A bare number counts as days.
fn duration_days(text: &str) -> Option<i64> {
    let lower = text
        .to_ascii_lowercase()
        .replace("twenty-one", "21")
        .replace("twenty one", "21");
    let words: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == '-' || c == '/')
        .filter(|w| !w.is_empty())
        .collect();

    for (i, word) in words.iter().enumerate() {
        let digits_end = word
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
            .unwrap_or(word.len());

        let (amount, unit) = if digits_end > 0 {
            // "2weeks" and "2 weeks" both read the unit
            let Some(amount) = first_number(&word[..digits_end]) else {
                continue;
            };
            let suffix = &word[digits_end..];
            let unit = if suffix.is_empty() {
                words.get(i + 1).and_then(|next| unit_days(next))
            } else {
                unit_days(suffix)
            };
            (amount, unit.unwrap_or(1.0))
        } else {
            let Some((_, amount)) = NUMBER_WORDS.iter().find(|(name, _)| name == word) else {
                continue;
            };
            // Number words only count when a unit follows ("a week", not "a lot")
            let Some(unit) = words.get(i + 1).and_then(|next| unit_days(next)) else {
                continue;
            };
            (*amount, unit)
        };

        let days = (amount * unit).round();
        if days >= 1.0 {
            return Some(days as i64);
        }
    }

    None
}

/// Names that contain a conjunction and must stay whole
const COMPOUND_NAMES: &[&str] = &[
    "antigua and barbuda",
    "bosnia and herzegovina",
    "saint kitts and nevis",
    "saint vincent and the grenadines",
    "sao tome and principe",
    "trinidad and tobago",
];

/// Split on commas, semicolons and newlines; the last item may also join
/// two entries with "and" / "&" ("Spain, Italy and Poland")
fn split_list(text: &str) -> Vec<String> {
    let segments: Vec<&str> = text.split([',', ';', '\n']).collect();
    let Some((last, leading)) = segments.split_last() else {
        return Vec::new();
    };

    leading
        .iter()
        .map(|segment| segment.to_string())
        .chain(split_conjunction(last))
        .map(|item| {
            item.trim()
                .trim_start_matches("and ")
                .trim_start_matches("& ")
                .trim_end_matches('.')
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Split `segment` at " and " / " & " outside any compound name
fn split_conjunction(segment: &str) -> Vec<String> {
    let lower = segment.to_ascii_lowercase();
    let protected: Vec<(usize, usize)> = COMPOUND_NAMES
        .iter()
        .flat_map(|name| {
            lower
                .match_indices(name)
                .map(|(start, matched)| (start, start + matched.len()))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut cuts: Vec<(usize, usize)> = [" and ", " & "]
        .iter()
        .flat_map(|sep| {
            lower
                .match_indices(sep)
                .map(|(start, matched)| (start, start + matched.len()))
                .collect::<Vec<_>>()
        })
        .filter(|(start, end)| !protected.iter().any(|(p_start, p_end)| start >= p_start && end <= p_end))
        .collect();
    cuts.sort_unstable();

    let mut items = Vec::with_capacity(cuts.len() + 1);
    let mut from = 0;
    for (start, end) in cuts {
        if start < from {
            continue;
        }
        items.push(segment[from..start].to_string());
        from = end;
    }
    items.push(segment[from..].to_string());
    items
}
