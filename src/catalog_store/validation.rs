//! Entry validation and normalization.
//!
//! `normalize` turns the raw strings of an admin submission into a
//! `CatalogEntry`, reporting every violated field at once. `validate_entry`
//! re-checks a typed entry right before it is written.

use super::models::{CatalogEntry, Category, Difficulty, EntryFiles, Price};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    Missing,
    NotInEnumeration { value: String },
    NotAnInteger { value: String },
    NegativeValue { value: i64 },
    BlankElement { index: usize },
    EmptyId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: ValidationReason,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ValidationReason::Missing => {
                write!(f, "Field '{}' is required but was empty", self.field)
            }
            ValidationReason::NotInEnumeration { value } => {
                write!(f, "Field '{}' has unknown value '{}'", self.field, value)
            }
            ValidationReason::NotAnInteger { value } => {
                write!(f, "Field '{}' must be a whole number, got '{}'", self.field, value)
            }
            ValidationReason::NegativeValue { value } => {
                write!(f, "Field '{}' must be non-negative, got {}", self.field, value)
            }
            ValidationReason::BlankElement { index } => {
                write!(f, "Field '{}' has a blank element at {}", self.field, index)
            }
            ValidationReason::EmptyId => write!(f, "Field '{}' must not be empty", self.field),
        }
    }
}

/// Every violation found in one submission. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.field).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationErrors>;

#[derive(Default)]
struct Collector(Vec<ValidationError>);

impl Collector {
    fn push(&mut self, field: &'static str, reason: ValidationReason) {
        self.0.push(ValidationError { field, reason });
    }

    fn finish<T>(self, value: T) -> ValidationResult<T> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

/// Raw admin form submission. Every text input arrives as a string;
/// nothing here is trusted until `normalize` accepts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    /// Set when editing; a fresh id is assigned otherwise.
    pub id: Option<String>,
    pub title: String,
    pub composer: String,
    pub category: String,
    pub subcategory: String,
    pub duration: String,
    pub difficulty: String,
    pub description: String,
    /// Comma-separated.
    pub instrumentation: String,
    pub tempo: String,
    pub key_signature: String,
    pub year_composed: String,
    /// Comma-separated.
    pub tags: String,
    pub price_standard: String,
    pub price_exclusive: String,
    pub files: EntryFiles,
    /// Preserved from the original entry when editing.
    pub upload_date: Option<DateTime<Utc>>,
}

impl EntryDraft {
    /// Pre-fills a draft from an existing entry, as the edit form does.
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            id: Some(entry.id.clone()),
            title: entry.title.clone(),
            composer: entry.composer.clone(),
            category: entry.category.label().to_string(),
            subcategory: entry.subcategory.clone().unwrap_or_default(),
            duration: entry.duration.clone(),
            difficulty: entry.difficulty.label().to_string(),
            description: entry.description.clone(),
            instrumentation: entry.instrumentation.join(", "),
            tempo: entry.tempo.clone().unwrap_or_default(),
            key_signature: entry.key_signature.clone().unwrap_or_default(),
            year_composed: entry.year_composed.to_string(),
            tags: entry.tags.join(", "),
            price_standard: entry.price.standard.to_string(),
            price_exclusive: entry.price.exclusive.to_string(),
            files: EntryFiles::default(),
            upload_date: Some(entry.upload_date),
        }
    }
}

pub fn new_entry_id() -> String {
    format!("acc_{}", Uuid::new_v4().simple())
}

/// Splits a comma-separated input into trimmed, non-empty items, in order.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Leading-integer parse: optional sign followed by at least one digit,
/// trailing text ignored ("2019", "49.99" -> 49, "120 bpm" -> 120).
pub fn parse_int_prefix(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    rest[..digits_len].parse::<i64>().ok().map(|n| sign * n)
}

fn optional_text(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn required_text(errors: &mut Collector, field: &'static str, input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        errors.push(field, ValidationReason::Missing);
    }
    trimmed.to_string()
}

fn required_label<T: std::str::FromStr>(
    errors: &mut Collector,
    field: &'static str,
    input: &str,
) -> Option<T> {
    if input.trim().is_empty() {
        errors.push(field, ValidationReason::Missing);
        return None;
    }
    match input.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(
                field,
                ValidationReason::NotInEnumeration {
                    value: input.to_string(),
                },
            );
            None
        }
    }
}

/// Unparseable prices fall back to 0; negative ones are rejected.
fn price_component(errors: &mut Collector, field: &'static str, input: &str) -> u32 {
    match parse_int_prefix(input) {
        None => 0,
        Some(value) if value < 0 => {
            errors.push(field, ValidationReason::NegativeValue { value });
            0
        }
        Some(value) => u32::try_from(value).unwrap_or(u32::MAX),
    }
}

/// Normalize a submission into an entry, assigning `id` and `upload_date`
/// when the draft does not carry them.
pub fn normalize(draft: &EntryDraft, now: DateTime<Utc>) -> ValidationResult<CatalogEntry> {
    let mut errors = Collector::default();

    let id = match draft.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => new_entry_id(),
    };

    let title = required_text(&mut errors, "title", &draft.title);
    let composer = required_text(&mut errors, "composer", &draft.composer);
    let category = required_label::<Category>(&mut errors, "category", &draft.category);
    let difficulty = required_label::<Difficulty>(&mut errors, "difficulty", &draft.difficulty);
    let description = required_text(&mut errors, "description", &draft.description);

    let year_composed = match parse_int_prefix(&draft.year_composed)
        .and_then(|year| i32::try_from(year).ok())
    {
        Some(year) => year,
        None => {
            errors.push(
                "yearComposed",
                ValidationReason::NotAnInteger {
                    value: draft.year_composed.clone(),
                },
            );
            0
        }
    };

    let price = Price {
        standard: price_component(&mut errors, "price.standard", &draft.price_standard),
        exclusive: price_component(&mut errors, "price.exclusive", &draft.price_exclusive),
    };

    let (Some(category), Some(difficulty)) = (category, difficulty) else {
        return Err(ValidationErrors(errors.0));
    };

    errors.finish(CatalogEntry {
        id,
        title,
        composer,
        category,
        subcategory: optional_text(&draft.subcategory),
        difficulty,
        duration: draft.duration.trim().to_string(),
        description,
        instrumentation: split_list(&draft.instrumentation),
        tempo: optional_text(&draft.tempo),
        key_signature: optional_text(&draft.key_signature),
        year_composed,
        tags: split_list(&draft.tags),
        price,
        files: if draft.files.is_empty() {
            None
        } else {
            Some(draft.files.clone())
        },
        upload_date: draft.upload_date.unwrap_or(now),
    })
}

fn check_list(errors: &mut Collector, field: &'static str, items: &[String]) {
    if let Some(index) = items.iter().position(|item| item.trim().is_empty()) {
        errors.push(field, ValidationReason::BlankElement { index });
    }
}

/// Invariants checked on every write. Enumerations are enforced by the type.
pub fn validate_entry(entry: &CatalogEntry) -> ValidationResult<()> {
    let mut errors = Collector::default();
    if entry.id.trim().is_empty() {
        errors.push("id", ValidationReason::EmptyId);
    }
    for (field, value) in [
        ("title", &entry.title),
        ("composer", &entry.composer),
        ("description", &entry.description),
    ] {
        if value.trim().is_empty() {
            errors.push(field, ValidationReason::Missing);
        }
    }
    check_list(&mut errors, "instrumentation", &entry.instrumentation);
    check_list(&mut errors, "tags", &entry.tags);
    errors.finish(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn make_valid_draft() -> EntryDraft {
        EntryDraft {
            title: "Thunder Strike".to_string(),
            composer: "Alliance Collective".to_string(),
            category: "Drumline".to_string(),
            difficulty: "Advanced".to_string(),
            description: "A driving cadence".to_string(),
            instrumentation: " Snare, Tenors ,, Bass ".to_string(),
            tags: "cadence, , competition".to_string(),
            year_composed: "2023".to_string(),
            price_standard: "49".to_string(),
            price_exclusive: "299".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_valid_draft() {
        let entry = normalize(&make_valid_draft(), now()).unwrap();

        assert!(entry.id.starts_with("acc_"));
        assert_eq!(entry.category, Category::Drumline);
        assert_eq!(entry.difficulty, Difficulty::Advanced);
        assert_eq!(entry.instrumentation, vec!["Snare", "Tenors", "Bass"]);
        assert_eq!(entry.tags, vec!["cadence", "competition"]);
        assert_eq!(entry.year_composed, 2023);
        assert_eq!(entry.price, Price { standard: 49, exclusive: 299 });
        assert_eq!(entry.upload_date, now());
        assert_eq!(entry.subcategory, None);
        assert_eq!(entry.files, None);
    }

    #[test]
    fn test_normalize_reports_every_missing_field() {
        let draft = EntryDraft {
            year_composed: "2020".to_string(),
            ..Default::default()
        };

        let err = normalize(&draft, now()).unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["title", "composer", "category", "difficulty", "description"]
        );
        assert!(err
            .errors()
            .iter()
            .all(|e| e.reason == ValidationReason::Missing));
    }

    #[test]
    fn test_normalize_rejects_unknown_enumeration_values() {
        let mut draft = make_valid_draft();
        draft.category = "Polka".to_string();
        draft.difficulty = "advanced".to_string();

        let err = normalize(&draft, now()).unwrap_err();
        assert_eq!(
            err.errors(),
            &[
                ValidationError {
                    field: "category",
                    reason: ValidationReason::NotInEnumeration {
                        value: "Polka".to_string()
                    },
                },
                ValidationError {
                    field: "difficulty",
                    reason: ValidationReason::NotInEnumeration {
                        value: "advanced".to_string()
                    },
                },
            ]
        );
    }

    #[test]
    fn test_unparseable_prices_default_to_zero() {
        let mut draft = make_valid_draft();
        draft.price_standard = "call us".to_string();
        draft.price_exclusive = "".to_string();

        let entry = normalize(&draft, now()).unwrap();
        assert_eq!(entry.price, Price { standard: 0, exclusive: 0 });
    }

    #[test]
    fn test_numeric_like_prices_are_truncated() {
        let mut draft = make_valid_draft();
        draft.price_standard = " 49.99".to_string();
        draft.price_exclusive = "150 USD".to_string();

        let entry = normalize(&draft, now()).unwrap();
        assert_eq!(entry.price, Price { standard: 49, exclusive: 150 });
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut draft = make_valid_draft();
        draft.price_exclusive = "-5".to_string();

        let err = normalize(&draft, now()).unwrap_err();
        assert_eq!(
            err.errors(),
            &[ValidationError {
                field: "price.exclusive",
                reason: ValidationReason::NegativeValue { value: -5 },
            }]
        );
    }

    #[test]
    fn test_unparseable_year_is_rejected() {
        let mut draft = make_valid_draft();
        draft.year_composed = "last year".to_string();

        let err = normalize(&draft, now()).unwrap_err();
        assert!(err.has_field("yearComposed"));
    }

    #[test]
    fn test_edit_draft_keeps_identity() {
        let original = normalize(&make_valid_draft(), now()).unwrap();
        let mut draft = EntryDraft::from_entry(&original);
        draft.title = "Thunder Strike II".to_string();

        let later = now() + chrono::Duration::days(3);
        let edited = normalize(&draft, later).unwrap();

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.upload_date, original.upload_date);
        assert_eq!(edited.title, "Thunder Strike II");
        assert_eq!(edited.tags, original.tags);
        assert_eq!(edited.instrumentation, original.instrumentation);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("2019"), Some(2019));
        assert_eq!(parse_int_prefix("  42abc"), Some(42));
        assert_eq!(parse_int_prefix("-7"), Some(-7));
        assert_eq!(parse_int_prefix("+3"), Some(3));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix(""), None);
    }

    #[test]
    fn test_validate_entry_flags_blank_list_elements() {
        let mut entry = normalize(&make_valid_draft(), now()).unwrap();
        entry.tags.push("   ".to_string());
        entry.title = " ".to_string();

        let err = validate_entry(&entry).unwrap_err();
        assert!(err.has_field("title"));
        assert!(err.errors().contains(&ValidationError {
            field: "tags",
            reason: ValidationReason::BlankElement { index: 2 },
        }));
    }

    #[test]
    fn test_validate_entry_empty_id() {
        let mut entry = normalize(&make_valid_draft(), now()).unwrap();
        entry.id = String::new();
        let err = validate_entry(&entry).unwrap_err();
        assert_eq!(err.fields(), vec!["id"]);
    }
}
