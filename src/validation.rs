//! Declarative field validation.
//!
//! A [`Validator`] holds an ordered list of [`Rule`]s per field. Validating a
//! field evaluates its rules in registration order and stops at the first
//! failure, whose message becomes the field's entry in the [`ErrorSet`].
//! Fields without rules are always valid, which is how optional fields with
//! no constraints are expressed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A pure check over a field's string value.
pub type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A predicate plus the message reported when it fails.
#[derive(Clone)]
pub struct Rule {
    predicate: Predicate,
    message: String,
}

impl Rule {
    pub fn new(predicate: Predicate, message: impl Into<String>) -> Self {
        Rule {
            predicate,
            message: message.into(),
        }
    }

    /// Returns `true` if `value` satisfies the rule.
    pub fn check(&self, value: &str) -> bool {
        (self.predicate)(value)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Current validation failures: at most one message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSet(BTreeMap<String, String>);

impl ErrorSet {
    pub fn new() -> Self {
        ErrorSet::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(field, message)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    fn remove(&mut self, field: &str) {
        self.0.remove(field);
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Field validator bound to one form session.
///
/// # Examples
///
/// ```
/// use paddock::validation::{rules, Validator};
///
/// let mut v = Validator::new();
/// v.add_rule("name", rules::required(), "Name is required");
/// v.add_rule("name", rules::min_length(2), "Name is too short");
/// v.add_rule("imageUrl", rules::url(), "Invalid image URL");
///
/// assert!(!v.validate_field("name", ""));
/// assert_eq!(v.errors().get("name"), Some("Name is required"));
///
/// assert!(v.validate_field("imageUrl", ""));
/// assert!(v.validate_field("nickname", "anything"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: HashMap<String, Vec<Rule>>,
    errors: ErrorSet,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    /// Append a rule to `field`'s rule list. Rules are never deduplicated and
    /// run in the order they were added.
    pub fn add_rule(
        &mut self,
        field: impl Into<String>,
        predicate: Predicate,
        message: impl Into<String>,
    ) {
        self.rules
            .entry(field.into())
            .or_default()
            .push(Rule::new(predicate, message));
    }

    /// Builder form of [`add_rule`](Self::add_rule).
    pub fn rule(
        mut self,
        field: impl Into<String>,
        predicate: Predicate,
        message: impl Into<String>,
    ) -> Self {
        self.add_rule(field, predicate, message);
        self
    }

    /// Rules registered for `field`, in evaluation order.
    pub fn rules_for(&self, field: &str) -> &[Rule] {
        self.rules.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Validate one field, replacing any previous error for it.
    pub fn validate_field(&mut self, field: &str, value: &str) -> bool {
        self.errors.remove(field);

        let Some(rules) = self.rules.get(field) else {
            return true;
        };

        match rules.iter().find(|rule| !rule.check(value)) {
            Some(failed) => {
                self.errors.insert(field, failed.message.clone());
                false
            }
            None => true,
        }
    }

    /// Validate every `(field, value)` pair after clearing all prior errors.
    ///
    /// Every field is evaluated even after a failure so the error set is
    /// complete. Fields not present in `fields` are not checked.
    pub fn validate_all<I, K, V>(&mut self, fields: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.errors.clear();
        let mut valid = true;
        for (field, value) in fields {
            valid &= self.validate_field(field.as_ref(), value.as_ref());
        }
        valid
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Record a failure found outside the rule list, e.g. while converting
    /// an already validated value.
    pub(crate) fn set_error(&mut self, field: &str, message: &str) {
        self.errors.insert(field, message);
    }

    pub fn clear_field_error(&mut self, field: &str) {
        self.errors.remove(field);
    }

    pub fn clear_all_errors(&mut self) {
        self.errors.clear();
    }
}

/// Built-in predicate constructors.
///
/// Only [`required`] rejects an empty value; every other predicate is
/// vacuously true on `""`, so presence and shape compose independently.
pub mod rules {
    use super::Predicate;
    use regex::Regex;
    use std::sync::{Arc, LazyLock};

    static EMAIL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

    static COLOR: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)^#[0-9a-f]{6}$").expect("valid color regex"));

    // scheme ":" then "//" + authority (or "///" + path), an absolute path, or an opaque part
    static ABSOLUTE_URI: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:(//([^/?#\s]+\S*|/\S+)|/[^/\s]\S*|[^/\s]\S*)$")
            .expect("valid uri regex")
    });

    /// Non-empty after trimming whitespace.
    pub fn required() -> Predicate {
        Arc::new(|value: &str| !value.trim().is_empty())
    }

    /// At least `min` characters, or empty.
    pub fn min_length(min: usize) -> Predicate {
        Arc::new(move |value: &str| value.is_empty() || value.chars().count() >= min)
    }

    /// At most `max` characters.
    pub fn max_length(max: usize) -> Predicate {
        Arc::new(move |value: &str| value.chars().count() <= max)
    }

    /// `local@domain.tld` shape, or empty.
    pub fn email() -> Predicate {
        Arc::new(|value: &str| value.is_empty() || EMAIL.is_match(value))
    }

    /// An absolute URI, or empty.
    pub fn url() -> Predicate {
        Arc::new(|value: &str| value.is_empty() || ABSOLUTE_URI.is_match(value))
    }

    /// `#` followed by six hex digits, case-insensitive, or empty.
    pub fn color() -> Predicate {
        Arc::new(|value: &str| value.is_empty() || COLOR.is_match(value))
    }

    /// Matches the given regex, or empty.
    pub fn pattern(regex: Regex) -> Predicate {
        Arc::new(move |value: &str| value.is_empty() || regex.is_match(value))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn color_requires_hash_and_six_hex_digits() {
            let p = color();
            assert!(!p("FF0000"));
            assert!(p("#FF0000"));
            assert!(p("#ff0000"));
            assert!(!p("#FF000"));
            assert!(!p("#GG0000"));
            assert!(p(""));
        }

        #[test]
        fn url_accepts_absolute_uris_only() {
            let p = url();
            assert!(p("https://images.example.com/cars/mcqueen.png?w=400"));
            assert!(p("mailto:sally@cozycone.example"));
            assert!(p(""));
            assert!(!p("images/mcqueen.png"));
            assert!(!p("http://"));
            assert!(!p("https://exa mple.com"));
        }

        #[test]
        fn email_shape() {
            let p = email();
            assert!(p("doc@radiator-springs.example"));
            assert!(!p("doc@localhost"));
            assert!(!p("doc hudson@example.com"));
            assert!(p(""));
        }

        #[test]
        fn lengths_count_characters_and_skip_empty() {
            assert!(min_length(3)(""));
            assert!(!min_length(3)("ab"));
            assert!(min_length(3)("été"));
            assert!(max_length(3)("été"));
            assert!(!max_length(2)("été"));
        }

        #[test]
        fn required_trims() {
            assert!(!required()("   "));
            assert!(required()(" x "));
        }

        #[test]
        fn pattern_matches_custom_regex() {
            let p = pattern(Regex::new(r"^\d{4}$").unwrap());
            assert!(p("2006"));
            assert!(!p("06"));
            assert!(p(""));
        }
    }
}
