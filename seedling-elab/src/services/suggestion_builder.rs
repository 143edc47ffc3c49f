//! Question suggestions
//!
//! Computes the advisory hint shown with a field's question from the seed's
//! estimates, its description and the metadata collected so far. Fields
//! without a rule fall back to their static `suggestion` text.

use serde_json::Value;

use crate::models::schema::{FieldDefinition, SuggestionRule};
use crate::models::{keys, Metadata, Seed};

const DEFAULT_PARTICIPANTS: i64 = 28;
const DEFAULT_DURATION_DAYS: i64 = 7;

/// Budget estimate: per-day cost plus a fixed base, per participant (EUR)
const DAILY_COST: i64 = 50;
const BASE_COST: i64 = 150;

/// Description keywords → Erasmus+ priority
const PRIORITY_KEYWORDS: &[(&[&str], &str)] = &[
    (&["inclusion", "disadvantaged", "diverse"], "Inclusion and diversity"),
    (
        &["environment", "green", "climate", "sustainability"],
        "Environment and fight against climate change",
    ),
    (&["digital", "technology", "online"], "Digital transformation"),
    (&["democracy", "civic", "participation"], "Participation in democratic life"),
];

/// Suggestion for `field`, if it has one
pub fn suggestion_for(field: &FieldDefinition, seed: Option<&Seed>, metadata: &Metadata) -> Option<String> {
    match field.suggest {
        Some(rule) => Some(computed(rule, seed, metadata)),
        None => field.suggestion.clone(),
    }
}

fn computed(rule: SuggestionRule, seed: Option<&Seed>, metadata: &Metadata) -> String {
    match rule {
        SuggestionRule::Participants => {
            let estimate = seed
                .and_then(|s| s.estimated_participants)
                .unwrap_or(DEFAULT_PARTICIPANTS);
            format!("Consider {} participants as a good starting point.", estimate)
        }
        SuggestionRule::Duration => {
            let estimate = seed
                .and_then(|s| s.estimated_duration)
                .unwrap_or(DEFAULT_DURATION_DAYS);
            format!("Consider {} days for a well-paced program.", estimate)
        }
        SuggestionRule::Budget => {
            let duration = whole_number(metadata, keys::DURATION)
                .or_else(|| seed.and_then(|s| s.estimated_duration))
                .unwrap_or(DEFAULT_DURATION_DAYS);
            let participants = whole_number(metadata, keys::PARTICIPANT_COUNT)
                .or_else(|| seed.and_then(|s| s.estimated_participants))
                .unwrap_or(DEFAULT_PARTICIPANTS);
            let per_person = duration * DAILY_COST + BASE_COST;

            format!(
                "Based on {} days and {} participants, consider €{} per participant (Total: €{}).",
                duration,
                participants,
                per_person,
                per_person * participants
            )
        }
        SuggestionRule::Priorities => {
            let description = seed
                .and_then(|s| s.description.as_deref())
                .unwrap_or_default()
                .to_lowercase();
            let priorities: Vec<&str> = PRIORITY_KEYWORDS
                .iter()
                .filter(|(words, _)| words.iter().any(|w| description.contains(w)))
                .map(|(_, priority)| *priority)
                .collect();

            if priorities.is_empty() {
                "Consider which EU priorities your project addresses.".to_string()
            } else {
                format!(
                    "Based on your project description, consider: {}",
                    priorities.join(", ")
                )
            }
        }
    }
}

fn whole_number(metadata: &Metadata, key: &str) -> Option<i64> {
    metadata
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| *n > 0.0)
        .map(|n| n.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataSchema;
    use chrono::Utc;
    use serde_json::json;

    fn seed(description: &str) -> Seed {
        Seed {
            seed_id: "seed-1".into(),
            title: "Exchange".into(),
            description: Some(description.to_string()),
            estimated_participants: Some(32),
            estimated_duration: Some(10),
            registered_at: Utc::now(),
        }
    }

    fn field(name: &str) -> FieldDefinition {
        MetadataSchema::youth_exchange().field(name).unwrap().clone()
    }

    #[test]
    fn test_estimates_come_from_the_seed() {
        let estimated = seed("");
        let metadata = Metadata::new();

        assert_eq!(
            suggestion_for(&field(keys::PARTICIPANT_COUNT), Some(&estimated), &metadata).unwrap(),
            "Consider 32 participants as a good starting point."
        );
        assert_eq!(
            suggestion_for(&field(keys::DURATION), Some(&estimated), &metadata).unwrap(),
            "Consider 10 days for a well-paced program."
        );
        assert_eq!(
            suggestion_for(&field(keys::PARTICIPANT_COUNT), None, &metadata).unwrap(),
            "Consider 28 participants as a good starting point."
        );
    }

    #[test]
    fn test_budget_prefers_collected_metadata_over_seed_estimates() {
        let estimated = seed("");
        let budget = field(keys::BUDGET_PER_PARTICIPANT);

        assert_eq!(
            suggestion_for(&budget, Some(&estimated), &Metadata::new()).unwrap(),
            "Based on 10 days and 32 participants, consider €650 per participant (Total: €20800)."
        );

        let metadata: Metadata = [(keys::PARTICIPANT_COUNT.to_string(), json!(20))]
            .into_iter()
            .collect();
        assert_eq!(
            suggestion_for(&budget, Some(&estimated), &metadata).unwrap(),
            "Based on 10 days and 20 participants, consider €650 per participant (Total: €13000)."
        );

        assert_eq!(
            suggestion_for(&budget, None, &Metadata::new()).unwrap(),
            "Based on 7 days and 28 participants, consider €500 per participant (Total: €14000)."
        );
    }

    #[test]
    fn test_priorities_match_description_keywords() {
        let priorities = field(keys::ERASMUS_PRIORITIES);

        let green = seed("A green, climate-focused exchange using digital storytelling");
        assert_eq!(
            suggestion_for(&priorities, Some(&green), &Metadata::new()).unwrap(),
            "Based on your project description, consider: Environment and fight against climate change, Digital transformation"
        );

        let plain = seed("Hiking and cooking");
        assert_eq!(
            suggestion_for(&priorities, Some(&plain), &Metadata::new()).unwrap(),
            "Consider which EU priorities your project addresses."
        );
    }

    #[test]
    fn test_static_suggestion_without_rule() {
        let notes = FieldDefinition::required("notes", "Notes?").with_suggestion("Keep it short");
        assert_eq!(
            suggestion_for(&notes, None, &Metadata::new()).as_deref(),
            Some("Keep it short")
        );
        assert!(suggestion_for(&field(keys::DESTINATION), None, &Metadata::new()).is_none());
    }
}
