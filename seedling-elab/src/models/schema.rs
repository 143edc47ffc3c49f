//! Seed metadata schema
//!
//! An ordered list of field definitions. Declaration order is the order in
//! which questions are asked; only required fields are asked and only
//! required fields count toward completeness.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use seedling_common::{Error, Result};

/// Accumulated metadata for one session: field name → extracted value
pub type Metadata = BTreeMap<String, Value>;

/// Metadata keys the youth exchange schema and its derived fields share
pub mod keys {
    pub const PARTICIPANT_COUNT: &str = "participantCount";
    pub const BUDGET_PER_PARTICIPANT: &str = "budgetPerParticipant";
    pub const TOTAL_BUDGET: &str = "totalBudget";
    pub const DURATION: &str = "duration";
    pub const DESTINATION: &str = "destination";
    pub const PARTICIPANT_COUNTRIES: &str = "participantCountries";
    pub const ACTIVITIES: &str = "activities";
    pub const ERASMUS_PRIORITIES: &str = "erasmusPriorities";
    pub const REQUIREMENTS: &str = "requirements";
}

/// How an answer for a field is normalised by the focused extractor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text, stored trimmed
    #[default]
    Text,
    /// Whole number (first integer found in the answer)
    Integer,
    /// Decimal number (first number found in the answer)
    Number,
    /// Whole days; weeks and fortnights are converted ("2 weeks" → 14)
    Duration,
    /// Comma / "and" separated items
    List,
}

/// Computed suggestion shown with a field's question
///
/// Built from the seed's estimates and description plus the metadata
/// collected so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionRule {
    /// Participant count starting point
    Participants,
    /// Programme length
    Duration,
    /// Per-participant budget estimate from duration and group size
    Budget,
    /// Erasmus+ priorities matched in the seed description
    Priorities,
}

/// One schema field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Metadata key
    pub name: String,

    /// Canonical question asked for this field
    pub question: String,

    /// Extra guidance appended to the question
    #[serde(default)]
    pub follow_up: Option<String>,

    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default)]
    pub kind: FieldKind,

    /// Advisory hint shown alongside the question
    #[serde(default)]
    pub suggestion: Option<String>,

    /// Computed hint; replaces `suggestion` when set
    #[serde(default)]
    pub suggest: Option<SuggestionRule>,

    /// Key that receives the amount instead when the answer states a total
    /// ("total budget of 15000")
    #[serde(default)]
    pub total_field: Option<String>,

    /// Lower bound for numeric values (advisory warning only)
    #[serde(default)]
    pub min: Option<f64>,

    /// Upper bound for numeric values (advisory warning only)
    #[serde(default)]
    pub max: Option<f64>,
}

fn default_required() -> bool {
    true
}

impl FieldDefinition {
    /// Required text field with no extras
    pub fn required(name: &str, question: &str) -> Self {
        Self {
            name: name.to_string(),
            question: question.to_string(),
            follow_up: None,
            required: true,
            kind: FieldKind::Text,
            suggestion: None,
            suggest: None,
            total_field: None,
            min: None,
            max: None,
        }
    }

    /// Optional text field with no extras
    pub fn optional(name: &str, question: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, question)
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_follow_up(mut self, follow_up: &str) -> Self {
        self.follow_up = Some(follow_up.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    pub fn with_suggest(mut self, rule: SuggestionRule) -> Self {
        self.suggest = Some(rule);
        self
    }

    pub fn with_total_field(mut self, key: &str) -> Self {
        self.total_field = Some(key.to_string());
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Question text as presented to the user
    pub fn prompt(&self) -> String {
        match &self.follow_up {
            Some(follow_up) => format!("{}\n\n{}", self.question, follow_up),
            None => self.question.clone(),
        }
    }

    /// Advisory warning when a numeric value falls outside the declared range
    pub fn range_warning(&self, value: &Value) -> Option<String> {
        let number = value.as_f64()?;

        match (self.min, self.max) {
            (Some(min), Some(max)) if number < min || number > max => Some(format!(
                "{} = {} is outside the typical range {}-{}",
                self.name, number, min, max
            )),
            (Some(min), None) if number < min => Some(format!(
                "{} = {} is below the typical minimum {}",
                self.name, number, min
            )),
            (None, Some(max)) if number > max => Some(format!(
                "{} = {} is above the typical maximum {}",
                self.name, number, max
            )),
            _ => None,
        }
    }
}

/// Validated, ordered metadata schema
///
/// Construction rejects schemas without required fields, so completeness
/// never divides by zero.
#[derive(Debug, Clone)]
pub struct MetadataSchema {
    fields: Vec<FieldDefinition>,
}

impl MetadataSchema {
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();

        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(Error::Config("Schema field with empty name".to_string()));
            }
            if field.question.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Schema field '{}' has no question",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate schema field '{}'",
                    field.name
                )));
            }
            if let (Some(min), Some(max)) = (field.min, field.max) {
                if min > max {
                    return Err(Error::Config(format!(
                        "Schema field '{}' has min {} greater than max {}",
                        field.name, min, max
                    )));
                }
            }
        }

        if let Some(field) = fields
            .iter()
            .find(|f| f.total_field.as_deref().is_some_and(|t| t == f.name))
        {
            return Err(Error::Config(format!(
                "Schema field '{}' names itself as its total field",
                field.name
            )));
        }

        if !fields.iter().any(|f| f.required) {
            return Err(Error::Config(
                "Schema must declare at least one required field".to_string(),
            ));
        }

        Ok(Self { fields })
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Required fields in declaration order
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn required_count(&self) -> usize {
        self.required_fields().count()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First required field, in schema order, not yet populated
    ///
    /// Always walks from the top of the schema: a field filled out of order
    /// never changes which question comes next.
    pub fn next_unanswered(&self, metadata: &Metadata) -> Option<&FieldDefinition> {
        self.required_fields()
            .find(|f| !metadata.get(&f.name).is_some_and(is_populated))
    }

    /// Default schema for Erasmus+ youth exchange seeds
    pub fn youth_exchange() -> Self {
        let fields = vec![
            FieldDefinition::required(
                keys::PARTICIPANT_COUNT,
                "How many participants are you planning for this exchange?",
            )
            .with_kind(FieldKind::Integer)
            .with_follow_up("Erasmus+ Youth Exchanges typically range from 16 to 60 participants.")
            .with_suggest(SuggestionRule::Participants)
            .with_range(16.0, 60.0),
            FieldDefinition::required(
                keys::BUDGET_PER_PARTICIPANT,
                "What's your estimated budget per participant? (Or total budget if you prefer)",
            )
            .with_kind(FieldKind::Number)
            .with_follow_up(
                "Typical Erasmus+ Youth Exchanges range from €300-500 per participant, depending on duration and destination.",
            )
            .with_suggest(SuggestionRule::Budget)
            .with_total_field(keys::TOTAL_BUDGET)
            .with_range(200.0, 700.0),
            FieldDefinition::required(
                keys::DURATION,
                "How long will the exchange last? (e.g., 7 days, 2 weeks)",
            )
            .with_kind(FieldKind::Duration)
            .with_follow_up("Most Youth Exchanges run for 5-21 days, including travel days.")
            .with_suggest(SuggestionRule::Duration)
            .with_range(5.0, 21.0),
            FieldDefinition::required(
                keys::DESTINATION,
                "Where will this exchange take place? (Country and city)",
            )
            .with_follow_up("You can also add venue details if known."),
            FieldDefinition::required(
                keys::PARTICIPANT_COUNTRIES,
                "Which countries will participants come from?",
            )
            .with_kind(FieldKind::List)
            .with_follow_up(
                "List the countries whose young people will participate. This helps us calculate visa requirements.",
            ),
            FieldDefinition::optional(
                keys::ACTIVITIES,
                "What are the main activities or workshops planned?",
            )
            .with_kind(FieldKind::List),
            FieldDefinition::optional(
                keys::ERASMUS_PRIORITIES,
                "Which Erasmus+ priorities does this address?",
            )
            .with_kind(FieldKind::List)
            .with_suggest(SuggestionRule::Priorities),
        ];

        Self { fields }
    }
}

/// A value counts as populated when it is not null and not an empty
/// string, array or object
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Drop entries that would not populate a field
pub fn sanitize_delta(delta: Metadata) -> Metadata {
    delta
        .into_iter()
        .filter(|(key, value)| !key.trim().is_empty() && is_populated(value))
        .collect()
}

/// Last-write-wins merge of a (sanitized) delta into `metadata`
///
/// Unpopulated values are skipped so a merge can never remove information.
pub fn merge_delta(metadata: &mut Metadata, delta: &Metadata) {
    for (key, value) in delta {
        if is_populated(value) {
            metadata.insert(key.clone(), value.clone());
        }
    }
}
