//! Character form sessions.
//!
//! A [`FormSession`] owns one [`Validator`] configured with
//! [`character_rules`] and turns submitted [`FormData`] into either a
//! [`NewRecord`] (add mode) or a [`RecordPatch`] (edit mode). Nothing reaches
//! the [`Store`] until the whole form validates.

use crate::record::{NewRecord, Record, RecordField, RecordId, RecordPatch};
use crate::store::Store;
use crate::validation::{ErrorSet, Validator, rules};
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::num::ParseIntError;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("valid year regex"));

const YEAR_MESSAGE: &str = "Year must be a four-digit number";

/// Default color offered when a form is opened for a new record.
pub const DEFAULT_COLOR: &str = "#FF0000";

/// Raw `field -> value` pairs as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(BTreeMap<String, String>);

impl FormData {
    pub fn new() -> Self {
        FormData::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every record field, empty.
    pub fn blank() -> FormData {
        RecordField::ALL
            .iter()
            .map(|f| (f.as_str(), ""))
            .chain([("year", "")])
            .collect()
    }

    /// `self` with every value from `other` written over it.
    pub fn overlay(mut self, other: &FormData) -> FormData {
        for (field, value) in other.iter() {
            self.set(field, value);
        }
        self
    }

    /// Trim every value and prefix `#` to a non-empty color missing it.
    pub fn normalized(&self) -> FormData {
        let mut out: BTreeMap<String, String> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.trim().to_string()))
            .collect();
        if let Some(color) = out.get_mut(RecordField::Color.as_str()) {
            if !color.is_empty() && !color.starts_with('#') {
                color.insert(0, '#');
            }
        }
        FormData(out)
    }

    /// The form as it is populated for editing `record`.
    pub fn from_record(record: &Record) -> FormData {
        let mut data = FormData::new();
        for field in RecordField::ALL {
            data.set(field.as_str(), record.field(field).unwrap_or_default());
        }
        data.set(
            "year",
            record.year.map(|y| y.to_string()).unwrap_or_default(),
        );
        data
    }

    fn text(&self, field: RecordField) -> String {
        self.get(field.as_str()).unwrap_or_default().to_string()
    }

    /// `None` when the field is absent, `Some(None)` when it is empty.
    fn optional(&self, field: &str) -> Option<Option<String>> {
        self.get(field)
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
    }

    /// Like [`optional`](Self::optional), parsed as a year.
    fn year(&self) -> Result<Option<Option<u32>>, ParseIntError> {
        match self.get("year") {
            None => Ok(None),
            Some("") => Ok(Some(None)),
            Some(v) => v.parse().map(|year| Some(Some(year))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FormData(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The standard rule set for character records.
pub fn character_rules() -> Validator {
    Validator::new()
        .rule("name", rules::required(), "Name is required")
        .rule("name", rules::min_length(2), "Name must be at least 2 characters")
        .rule("name", rules::max_length(50), "Name cannot exceed 50 characters")
        .rule("type", rules::required(), "Vehicle type is required")
        .rule("type", rules::min_length(3), "Type must be at least 3 characters")
        .rule("type", rules::max_length(100), "Type cannot exceed 100 characters")
        .rule("color", rules::required(), "Color is required")
        .rule("color", rules::color(), "Invalid color format (e.g. #FF0000)")
        .rule("description", rules::required(), "Description is required")
        .rule(
            "description",
            rules::min_length(10),
            "Description must be at least 10 characters",
        )
        .rule(
            "description",
            rules::max_length(500),
            "Description cannot exceed 500 characters",
        )
        .rule("imageUrl", rules::url(), "Invalid image URL")
        .rule("hometown", rules::max_length(100), "Hometown cannot exceed 100 characters")
        .rule("specialty", rules::max_length(100), "Specialty cannot exceed 100 characters")
        .rule("year", rules::pattern(YEAR.clone()), YEAR_MESSAGE)
}

/// Whether a session creates a record or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(RecordId),
}

/// A validated form, ready to hand to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Add(NewRecord),
    Edit(RecordId, RecordPatch),
}

impl Submission {
    /// Route the submission to [`Store::add`] or [`Store::update`].
    ///
    /// Returns `None` only when editing a record that no longer exists.
    pub fn apply(self, store: &Store) -> Option<Record> {
        match self {
            Submission::Add(new) => Some(store.add(new)),
            Submission::Edit(id, patch) => store.update(id, patch),
        }
    }
}

/// One open form: its mode, its current values and its validation state.
///
/// # Examples
///
/// ```
/// use paddock::form::{FormData, FormSession, Submission};
///
/// let mut form = FormSession::for_add();
/// let data = FormData::new()
///     .with("name", "Ramone")
///     .with("type", "Chevrolet Impala 1959")
///     .with("color", "800080")
///     .with("description", "Lowrider who runs the body shop.");
///
/// match form.submit(&data) {
///     Ok(Submission::Add(new)) => assert_eq!(new.color, "#800080"),
///     other => panic!("unexpected {other:?}"),
/// }
///
/// let errors = form.submit(&FormData::new().with("name", "R")).unwrap_err();
/// assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
/// ```
#[derive(Debug, Clone)]
pub struct FormSession {
    validator: Validator,
    mode: FormMode,
    values: FormData,
}

impl FormSession {
    /// A blank form for a new record.
    pub fn for_add() -> Self {
        FormSession {
            validator: character_rules(),
            mode: FormMode::Add,
            values: FormData::new().with(RecordField::Color.as_str(), DEFAULT_COLOR),
        }
    }

    /// A form populated from `record`.
    pub fn for_edit(record: &Record) -> Self {
        FormSession {
            validator: character_rules(),
            mode: FormMode::Edit(record.id),
            values: FormData::from_record(record),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Values the form was opened with.
    pub fn values(&self) -> &FormData {
        &self.values
    }

    /// Validate a single field, e.g. when it loses focus.
    pub fn validate_field(&mut self, field: &str, value: &str) -> bool {
        self.validator.validate_field(field, value)
    }

    pub fn errors(&self) -> &ErrorSet {
        self.validator.errors()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Normalize and validate `data`.
    ///
    /// On success returns the [`Submission`] for the session's mode and
    /// clears all errors; on failure returns the current [`ErrorSet`].
    ///
    /// In add mode, fields missing from `data` are treated as empty so the
    /// required rules see them.
    pub fn submit(&mut self, data: &FormData) -> Result<Submission, ErrorSet> {
        let data = match self.mode {
            FormMode::Add => FormData::blank().overlay(data).normalized(),
            FormMode::Edit(_) => data.normalized(),
        };
        if !self.validator.validate_all(data.iter()) {
            return Err(self.validator.errors().clone());
        }
        let year = match data.year() {
            Ok(year) => year,
            Err(e) => {
                debug!("paddock: rejecting year {:?}: {e}", data.get("year"));
                self.validator.set_error("year", YEAR_MESSAGE);
                return Err(self.validator.errors().clone());
            }
        };
        self.validator.clear_all_errors();

        Ok(match self.mode {
            FormMode::Add => Submission::Add(NewRecord {
                name: data.text(RecordField::Name),
                kind: data.text(RecordField::Type),
                color: data.text(RecordField::Color),
                description: data.text(RecordField::Description),
                hometown: data.optional("hometown").flatten(),
                specialty: data.optional("specialty").flatten(),
                image_url: data.optional("imageUrl").flatten(),
                year: year.flatten(),
                is_favorite: false,
            }),
            FormMode::Edit(id) => Submission::Edit(
                id,
                RecordPatch {
                    name: data.get("name").map(str::to_string),
                    kind: data.get("type").map(str::to_string),
                    color: data.get("color").map(str::to_string),
                    description: data.get("description").map(str::to_string),
                    hometown: data.optional("hometown"),
                    specialty: data.optional("specialty"),
                    image_url: data.optional("imageUrl"),
                    year,
                    is_favorite: None,
                },
            ),
        })
    }
}
