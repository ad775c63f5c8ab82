//! Field validation that reports every defect at once

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::crypto::parse_entity_id;

/// Why a single field was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    Missing,
    Empty,
    WrongType(&'static str),
    MalformedId(String),
    NotPositive,
    NotANumber(String),
    UnknownValue(String),
    InvalidContentType(String),
    InvalidDate(String),
    Unexpected(String),
    Mismatch { expected: String, found: String },
    /// More precise than the stored form, which would silently truncate it
    TooPrecise(&'static str),
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "is required"),
            ViolationKind::Empty => write!(f, "must not be empty"),
            ViolationKind::WrongType(ty) => write!(f, "must be a {}", ty),
            ViolationKind::MalformedId(v) => write!(f, "{:?} is not a well-formed id", v),
            ViolationKind::NotPositive => write!(f, "must be a positive number"),
            ViolationKind::NotANumber(v) => write!(f, "{:?} is not a number", v),
            ViolationKind::UnknownValue(v) => write!(f, "{:?} is not an allowed value", v),
            ViolationKind::InvalidContentType(v) => write!(f, "{:?} is not a valid content type", v),
            ViolationKind::InvalidDate(v) => write!(f, "{:?} is not a valid date", v),
            ViolationKind::Unexpected(v) => write!(f, "{:?} is not allowed here", v),
            ViolationKind::Mismatch { expected, found } => {
                write!(f, "expected {:?}, found {:?}", expected, found)
            }
            ViolationKind::TooPrecise(unit) => write!(f, "must be in whole {}s", unit),
        }
    }
}

/// A field constraint that did not hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.kind)
    }
}

/// Every violation found while validating one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The names of the offending fields, in the order they were checked
    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|v| v.field).collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{} field violation(s): {}", self.0.len(), rendered)
    }
}

/// Collects violations while fields are parsed and checked
#[derive(Debug, Default)]
pub(crate) struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, kind: ViolationKind) {
        self.violations.push(Violation { field, kind });
    }

    pub fn finish(self) -> Result<(), Violations> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(Violations(self.violations))
        }
    }

    // checks on typed values

    pub fn non_empty(&mut self, field: &'static str, value: &str) -> bool {
        if value.is_empty() {
            self.push(field, ViolationKind::Empty);
            return false;
        }
        true
    }

    pub fn positive(&mut self, field: &'static str, value: u64) -> bool {
        if value == 0 {
            self.push(field, ViolationKind::NotPositive);
            return false;
        }
        true
    }

    pub fn content_type(&mut self, field: &'static str, value: &str) -> bool {
        if !self.non_empty(field, value) {
            return false;
        }
        if mime::Mime::from_str(value).is_err() {
            self.push(field, ViolationKind::InvalidContentType(value.to_string()));
            return false;
        }
        true
    }

    /// `value` must already be truncated to `digits` fractional digits
    pub fn precision(
        &mut self,
        field: &'static str,
        value: DateTime<Utc>,
        digits: u16,
        unit: &'static str,
    ) -> bool {
        if value.trunc_subsecs(digits) != value {
            self.push(field, ViolationKind::TooPrecise(unit));
            return false;
        }
        true
    }

    // parsing of raw values

    pub fn required<T>(&mut self, field: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, ViolationKind::Missing);
        }
        value
    }

    pub fn id(&mut self, field: &'static str, value: Option<&str>) -> Option<Uuid> {
        let value = self.required(field, value)?;
        self.parse_id(field, value)
    }

    /// `Some(None)` when absent, `None` when present but malformed
    pub fn optional_id(&mut self, field: &'static str, value: Option<&str>) -> Option<Option<Uuid>> {
        match value {
            None => Some(None),
            Some(value) => self.parse_id(field, value).map(Some),
        }
    }

    fn parse_id(&mut self, field: &'static str, value: &str) -> Option<Uuid> {
        if value.is_empty() {
            self.push(field, ViolationKind::Empty);
            return None;
        }
        let id = parse_entity_id(value);
        if id.is_none() {
            self.push(field, ViolationKind::MalformedId(value.to_string()));
        }
        id
    }

    pub fn parse<T: FromStr>(&mut self, field: &'static str, value: &str) -> Option<T> {
        let parsed = value.parse::<T>().ok();
        if parsed.is_none() {
            self.push(field, ViolationKind::UnknownValue(value.to_string()));
        }
        parsed
    }

    /// A string member of a JSON payload, required and non-empty
    pub fn json_string(&mut self, payload: &Map<String, Value>, key: &'static str) -> Option<String> {
        let value = self.optional_json_string(payload, key)?;
        self.required(key, value)
    }

    /// `Some(None)` when absent or null, `None` when present but invalid
    pub fn optional_json_string(
        &mut self,
        payload: &Map<String, Value>,
        key: &'static str,
    ) -> Option<Option<String>> {
        match payload.get(key) {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => self.non_empty(key, s).then(|| Some(s.clone())),
            Some(_) => {
                self.push(key, ViolationKind::WrongType("string"));
                None
            }
        }
    }

    pub fn json_positive_integer(&mut self, payload: &Map<String, Value>, key: &'static str) -> Option<u64> {
        match payload.get(key) {
            None | Some(Value::Null) => {
                self.push(key, ViolationKind::Missing);
                None
            }
            Some(Value::Number(n)) => {
                if let Some(value) = n.as_u64() {
                    self.positive(key, value).then_some(value)
                } else if n.as_i64().is_some() || n.as_f64().is_some_and(|f| f <= 0.0) {
                    self.push(key, ViolationKind::NotPositive);
                    None
                } else {
                    self.push(key, ViolationKind::WrongType("integer"));
                    None
                }
            }
            Some(_) => {
                self.push(key, ViolationKind::WrongType("number"));
                None
            }
        }
    }
}
