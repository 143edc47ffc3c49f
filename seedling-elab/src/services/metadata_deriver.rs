//! Derived metadata fields
//!
//! Runs after an answer's delta is merged. Derived values are returned as
//! extra delta entries, so they are recorded in history with the answer
//! and replaying history reproduces them exactly.
//!
//! **Rules:**
//! - `budgetPerParticipant` ↔ `totalBudget`, using `participantCount`
//!   (28 when unknown)
//! - `requirements.visas` once both `destination` and
//!   `participantCountries` are known

use serde_json::{json, Map, Value};

use crate::models::keys;
use crate::models::schema::{is_populated, Metadata};

/// Group size assumed before `participantCount` is known
pub const DEFAULT_PARTICIPANTS: f64 = 28.0;

/// Estimated visa cost per participant country (EUR)
pub const VISA_COST_ESTIMATE: i64 = 80;

/// EU member states by ISO code and common English names
const EU_COUNTRIES: &[(&str, &[&str])] = &[
    ("AT", &["austria"]),
    ("BE", &["belgium"]),
    ("BG", &["bulgaria"]),
    ("HR", &["croatia"]),
    ("CY", &["cyprus"]),
    ("CZ", &["czechia", "czech republic"]),
    ("DK", &["denmark"]),
    ("EE", &["estonia"]),
    ("FI", &["finland"]),
    ("FR", &["france"]),
    ("DE", &["germany"]),
    ("GR", &["greece"]),
    ("HU", &["hungary"]),
    ("IE", &["ireland"]),
    ("IT", &["italy"]),
    ("LV", &["latvia"]),
    ("LT", &["lithuania"]),
    ("LU", &["luxembourg"]),
    ("MT", &["malta"]),
    ("NL", &["netherlands", "the netherlands"]),
    ("PL", &["poland"]),
    ("PT", &["portugal"]),
    ("RO", &["romania"]),
    ("SK", &["slovakia"]),
    ("SI", &["slovenia"]),
    ("ES", &["spain"]),
    ("SE", &["sweden"]),
];

/// Extra delta entries implied by `delta` once merged into `merged`
///
/// `merged` is the session metadata with `delta` already applied. Keys the
/// delta already carries are never overwritten.
pub fn derive_fields(merged: &Metadata, delta: &Metadata) -> Metadata {
    let mut derived = Metadata::new();

    derive_budget(merged, delta, &mut derived);

    let touched = delta.contains_key(keys::DESTINATION)
        || delta.contains_key(keys::PARTICIPANT_COUNTRIES);
    if touched {
        if let Some(requirements) = requirements(merged) {
            derived.insert(keys::REQUIREMENTS.to_string(), requirements);
        }
    }

    derived.retain(|key, value| !delta.contains_key(key) && is_populated(value));
    derived
}

fn derive_budget(merged: &Metadata, delta: &Metadata, derived: &mut Metadata) {
    let participants = merged
        .get(keys::PARTICIPANT_COUNT)
        .and_then(Value::as_f64)
        .filter(|n| *n > 0.0)
        .unwrap_or(DEFAULT_PARTICIPANTS);

    let per_participant = delta.get(keys::BUDGET_PER_PARTICIPANT).and_then(Value::as_f64);
    let total = delta.get(keys::TOTAL_BUDGET).and_then(Value::as_f64);

    match (per_participant, total) {
        (Some(per_participant), None) => {
            derived.insert(
                keys::TOTAL_BUDGET.to_string(),
                whole_or_decimal(per_participant * participants),
            );
        }
        (None, Some(total)) => {
            derived.insert(
                keys::BUDGET_PER_PARTICIPANT.to_string(),
                json!((total / participants).round() as i64),
            );
        }
        _ => {}
    }
}

/// `requirements` object with recomputed visas, keeping other entries
fn requirements(merged: &Metadata) -> Option<Value> {
    let destination = destination_country(merged.get(keys::DESTINATION)?);
    let countries = country_list(merged.get(keys::PARTICIPANT_COUNTRIES)?);
    if countries.is_empty() {
        return None;
    }

    let destination_in_eu = destination.is_some();
    let visas: Vec<Value> = countries
        .iter()
        .map(|country| {
            let needed = !(destination_in_eu && eu_country_code(country).is_some());
            let mut visa = Map::new();
            visa.insert("country".to_string(), json!(country));
            visa.insert("needed".to_string(), json!(needed));
            if needed {
                visa.insert("estimatedCost".to_string(), json!(VISA_COST_ESTIMATE));
            }
            Value::Object(visa)
        })
        .collect();

    let mut requirements = match merged.get(keys::REQUIREMENTS) {
        Some(Value::Object(existing)) => existing.clone(),
        _ => {
            let mut fresh = Map::new();
            fresh.insert("insurance".to_string(), json!(true));
            fresh.insert("permits".to_string(), json!([]));
            fresh
        }
    };
    requirements.insert("visas".to_string(), Value::Array(visas));

    Some(Value::Object(requirements))
}

/// EU code of the destination, from `"City, Country"` text or a
/// `{"country": ...}` object
fn destination_country(destination: &Value) -> Option<&'static str> {
    match destination {
        Value::String(text) => text
            .rsplit([',', '(', ')', '-'])
            .find_map(eu_country_code)
            .or_else(|| eu_country_mentioned(text)),
        Value::Object(map) => map.get("country").and_then(Value::as_str).and_then(eu_country_code),
        _ => None,
    }
}

fn country_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(text) if !text.trim().is_empty() => vec![text.trim().to_string()],
        _ => Vec::new(),
    }
}

/// EU code for a country name or ISO code, `None` outside the EU
pub fn eu_country_code(name: &str) -> Option<&'static str> {
    let name = name.trim().trim_end_matches('.');
    if name.len() == 2 {
        let upper = name.to_ascii_uppercase();
        return EU_COUNTRIES
            .iter()
            .find(|(code, _)| *code == upper)
            .map(|(code, _)| *code);
    }

    let lower = name.to_lowercase();
    EU_COUNTRIES
        .iter()
        .find(|(_, names)| names.contains(&lower.as_str()))
        .map(|(code, _)| *code)
}

fn eu_country_mentioned(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    EU_COUNTRIES
        .iter()
        .find(|(_, names)| names.iter().any(|name| lower.contains(name)))
        .map(|(code, _)| *code)
}

fn whole_or_decimal(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, Value)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_total_budget_from_per_participant() {
        let delta = metadata(&[(keys::BUDGET_PER_PARTICIPANT, json!(400.0))]);
        let mut merged = metadata(&[(keys::PARTICIPANT_COUNT, json!(30))]);
        merged.extend(delta.clone());

        let derived = derive_fields(&merged, &delta);
        assert_eq!(derived[keys::TOTAL_BUDGET], json!(12000));
    }

    #[test]
    fn test_per_participant_from_total_uses_default_group_size() {
        let delta = metadata(&[(keys::TOTAL_BUDGET, json!(15000))]);
        let derived = derive_fields(&delta, &delta);
        assert_eq!(derived[keys::BUDGET_PER_PARTICIPANT], json!(536));
    }

    #[test]
    fn test_extracted_values_are_never_overwritten() {
        let delta = metadata(&[
            (keys::BUDGET_PER_PARTICIPANT, json!(400)),
            (keys::TOTAL_BUDGET, json!(9000)),
        ]);
        assert!(derive_fields(&delta, &delta).is_empty());
    }

    #[test]
    fn test_visas_need_both_destination_and_countries() {
        let delta = metadata(&[(keys::DESTINATION, json!("Barcelona, Spain"))]);
        assert!(derive_fields(&delta, &delta).is_empty());

        let delta = metadata(&[(keys::PARTICIPANT_COUNTRIES, json!(["Italy", "Turkey", "PL"]))]);
        let mut merged = metadata(&[(keys::DESTINATION, json!("Barcelona, Spain"))]);
        merged.extend(delta.clone());

        let derived = derive_fields(&merged, &delta);
        let visas = derived[keys::REQUIREMENTS]["visas"].as_array().unwrap();
        assert_eq!(visas.len(), 3);
        assert_eq!(visas[0], json!({"country": "Italy", "needed": false}));
        assert_eq!(visas[1], json!({"country": "Turkey", "needed": true, "estimatedCost": 80}));
        assert_eq!(visas[2]["needed"], json!(false));
        assert_eq!(derived[keys::REQUIREMENTS]["insurance"], json!(true));
    }

    #[test]
    fn test_destination_outside_eu_needs_visas_for_everyone() {
        let delta = metadata(&[
            (keys::DESTINATION, json!("Istanbul, Turkey")),
            (keys::PARTICIPANT_COUNTRIES, json!(["Germany"])),
        ]);
        let derived = derive_fields(&delta, &delta);
        assert_eq!(derived[keys::REQUIREMENTS]["visas"][0]["needed"], json!(true));
    }

    #[test]
    fn test_unrelated_answer_does_not_recompute_visas() {
        let merged = metadata(&[
            (keys::DESTINATION, json!("Lisbon, Portugal")),
            (keys::PARTICIPANT_COUNTRIES, json!(["Spain"])),
            (keys::ACTIVITIES, json!(["Hiking"])),
        ]);
        let delta = metadata(&[(keys::ACTIVITIES, json!(["Hiking"]))]);
        assert!(derive_fields(&merged, &delta).is_empty());
    }

    #[test]
    fn test_country_codes_and_names() {
        assert_eq!(eu_country_code("es"), Some("ES"));
        assert_eq!(eu_country_code("Czech Republic"), Some("CZ"));
        assert_eq!(eu_country_code("Norway"), None);
        assert_eq!(destination_country(&json!({"country": "PT"})), Some("PT"));
        assert_eq!(destination_country(&json!("a youth centre near Porto in Portugal")), Some("PT"));
    }
}
