use crate::error::PathwayError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clinical table an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "condition_occurrence", alias = "condition")]
    Condition,
    #[serde(rename = "drug_exposure")]
    DrugExposure,
    #[serde(rename = "observation")]
    Observation,
    #[serde(rename = "measurement")]
    Measurement,
    #[serde(rename = "procedure_occurrence", alias = "procedure")]
    Procedure,
}

impl Category {
    pub fn table_name(&self) -> &'static str {
        match self {
            Category::Condition => "condition_occurrence",
            Category::DrugExposure => "drug_exposure",
            Category::Observation => "observation",
            Category::Measurement => "measurement",
            Category::Procedure => "procedure_occurrence",
        }
    }

    /// Best guess at the table for a bare model token.
    pub fn infer(token: &str) -> Self {
        match CodeSystem::of(token) {
            Some(CodeSystem::Loinc) => Category::Measurement,
            Some(CodeSystem::RxNorm) => Category::DrugExposure,
            Some(CodeSystem::Cpt4) => Category::Procedure,
            Some(CodeSystem::Snomed) if token.to_lowercase().contains("condition") => {
                Category::Condition
            }
            _ => Category::Observation,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeSystem {
    Loinc,
    Snomed,
    RxNorm,
    Cpt4,
    Icd10Cm,
    Icd9Cm,
}

impl CodeSystem {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "LOINC" => Some(CodeSystem::Loinc),
            "SNOMED" => Some(CodeSystem::Snomed),
            "RxNorm" => Some(CodeSystem::RxNorm),
            "CPT4" => Some(CodeSystem::Cpt4),
            "ICD10CM" => Some(CodeSystem::Icd10Cm),
            "ICD9CM" => Some(CodeSystem::Icd9Cm),
            _ => None,
        }
    }

    /// System of a namespaced code, if it has a recognized prefix.
    pub fn of(code: &str) -> Option<Self> {
        code.split_once('/')
            .and_then(|(prefix, _)| Self::from_prefix(prefix))
    }

    /// Systems the prediction model is allowed to propose.
    pub fn is_predictable(&self) -> bool {
        matches!(
            self,
            CodeSystem::Loinc | CodeSystem::Snomed | CodeSystem::RxNorm | CodeSystem::Cpt4
        )
    }
}

/// Splits `"SYSTEM/identifier"` into its parts; bare codes report `"Unknown"`.
pub fn split_code(code: &str) -> (&str, &str) {
    code.split_once('/').unwrap_or(("Unknown", code))
}

/// Token text before the first whitespace, e.g. `LOINC/8867-4 || bpm` -> `LOINC/8867-4`.
pub fn base_code(token: &str) -> &str {
    token.split_whitespace().next().unwrap_or(token)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Numeric(f64),
    Text(String),
}

/// One clinical fact. Construct through [`Event::new`] or deserialization,
/// both of which enforce the structural contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    code: String,
    value: Option<EventValue>,
    unit: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    #[serde(rename = "omop_table")]
    category: Category,
}

#[derive(Deserialize)]
struct RawEvent {
    code: String,
    #[serde(default)]
    value: Option<EventValue>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(alias = "category")]
    omop_table: Category,
}

impl TryFrom<RawEvent> for Event {
    type Error = PathwayError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let RawEvent {
            code,
            value,
            unit,
            start,
            end,
            omop_table,
        } = raw;
        Event::new(
            code,
            EventFields {
                value,
                unit,
                start,
                end,
                category: omop_table,
            },
        )
    }
}

/// Everything about an event except its code.
#[derive(Debug, Clone)]
pub struct EventFields {
    pub value: Option<EventValue>,
    pub unit: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub category: Category,
}

impl EventFields {
    pub fn of(category: Category) -> Self {
        Self {
            value: None,
            unit: None,
            start: None,
            end: None,
            category,
        }
    }

    pub fn value(mut self, value: EventValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }
}

impl Event {
    pub fn new(code: impl Into<String>, fields: EventFields) -> Result<Self, PathwayError> {
        let code = code.into();
        let malformed = |reason: &str| PathwayError::MalformedEvent {
            code: code.clone(),
            reason: reason.to_string(),
        };

        if code.trim().is_empty() {
            return Err(malformed("code is empty"));
        }
        if let Some((prefix, identifier)) = code.split_once('/') {
            if CodeSystem::from_prefix(prefix).is_none() {
                return Err(malformed("unrecognized code system"));
            }
            if identifier.is_empty() {
                return Err(malformed("identifier is empty"));
            }
        }
        if fields.unit.is_some() && !matches!(fields.value, Some(EventValue::Numeric(_))) {
            return Err(malformed("unit given without a numeric value"));
        }
        if let (Some(start), Some(end)) = (fields.start, fields.end) {
            if end < start {
                return Err(malformed("end precedes start"));
            }
        }

        Ok(Self {
            code,
            value: fields.value,
            unit: fields.unit,
            start: fields.start,
            end: fields.end,
            category: fields.category,
        })
    }

    /// Event produced by the model for `token`, timed at `at`.
    pub fn predicted(
        token: &str,
        category: Category,
        at: Option<DateTime<Utc>>,
    ) -> Result<Self, PathwayError> {
        let mut fields =
            EventFields::of(category).value(EventValue::Text(format!("Predicted: {}", token)));
        fields.start = at;
        Event::new(base_code(token), fields)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn value(&self) -> Option<&EventValue> {
        self.value.as_ref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn system(&self) -> Option<CodeSystem> {
        CodeSystem::of(&self.code)
    }
}

/// Reads a patient history from a JSON array of events.
pub fn load_history(path: impl AsRef<std::path::Path>) -> Result<Vec<Event>, PathwayError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let events: Vec<Event> = serde_json::from_str(&content)?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_code() {
        let err = Event::new("  ", EventFields::of(Category::Observation)).unwrap_err();
        assert!(matches!(err, PathwayError::MalformedEvent { .. }));
    }

    #[test]
    fn rejects_unknown_system() {
        assert!(Event::new("FOO/123", EventFields::of(Category::Observation)).is_err());
        assert!(Event::new("LOINC/", EventFields::of(Category::Measurement)).is_err());
    }

    #[test]
    fn rejects_unit_without_numeric_value() {
        let fields = EventFields::of(Category::Measurement)
            .value(EventValue::Text("high".to_string()))
            .unit("bpm");
        assert!(Event::new("LOINC/8867-4", fields).is_err());

        let fields = EventFields::of(Category::Measurement)
            .value(EventValue::Numeric(105.0))
            .unit("bpm");
        assert!(Event::new("LOINC/8867-4", fields).is_ok());
    }

    #[test]
    fn rejects_end_before_start() {
        let start = "2025-09-18T10:15:00Z".parse().unwrap();
        let end = "2025-09-18T10:00:00Z".parse().unwrap();
        let fields = EventFields::of(Category::DrugExposure).start(start).end(end);
        assert!(Event::new("RxNorm/310798", fields).is_err());
    }

    #[test]
    fn deserializes_omop_table_names_and_validates() {
        let json = r#"[
            {"code": "SNOMED/38341003", "value": "Hypertension", "unit": null,
             "start": "1990-05-10T00:00:00.000Z", "end": null, "omop_table": "condition_occurrence"},
            {"code": "LOINC/8867-4", "value": 105.0, "unit": "bpm", "omop_table": "measurement"}
        ]"#;
        let events: Vec<Event> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category(), Category::Condition);
        assert_eq!(events[1].value(), Some(&EventValue::Numeric(105.0)));

        let bad = r#"[{"code": "", "omop_table": "observation"}]"#;
        assert!(serde_json::from_str::<Vec<Event>>(bad).is_err());
    }

    #[test]
    fn deserialization_keeps_every_field() {
        let json = r#"{"code": "LOINC/8867-4", "value": 105.0, "unit": "bpm",
            "start": "2025-09-18T10:00:00Z", "end": "2025-09-18T10:15:00Z",
            "category": "measurement"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.code(), "LOINC/8867-4");
        assert_eq!(event.unit(), Some("bpm"));
        assert_eq!(event.start(), Some("2025-09-18T10:00:00Z".parse().unwrap()));
        assert_eq!(event.end(), Some("2025-09-18T10:15:00Z".parse().unwrap()));
        assert_eq!(event.category(), Category::Measurement);
        assert_eq!(event.system(), Some(CodeSystem::Loinc));

        let bad = r#"{"code": "LOINC/8867-4", "value": 105.0, "unit": "bpm",
            "start": "2025-09-18T10:15:00Z", "end": "2025-09-18T10:00:00Z",
            "omop_table": "measurement"}"#;
        assert!(serde_json::from_str::<Event>(bad).is_err());
    }

    #[test]
    fn infers_category_from_system() {
        assert_eq!(Category::infer("LOINC/8867-4"), Category::Measurement);
        assert_eq!(Category::infer("RxNorm/161"), Category::DrugExposure);
        assert_eq!(Category::infer("CPT4/93010"), Category::Procedure);
        assert_eq!(Category::infer("SNOMED/80313002"), Category::Observation);
        assert_eq!(Category::infer("SNOMED/49436004 condition"), Category::Condition);
    }

    #[test]
    fn predicted_event_uses_base_code() {
        let event = Event::predicted("LOINC/8867-4 || bpm", Category::Measurement, None).unwrap();
        assert_eq!(event.code(), "LOINC/8867-4");
        assert_eq!(
            event.value(),
            Some(&EventValue::Text("Predicted: LOINC/8867-4 || bpm".to_string()))
        );
    }
}
