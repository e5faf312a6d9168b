use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

pub const NAME: &str = "name";
pub const MANY: &str = "many";
pub const STRING: &str = "string";
pub const POS_NUMBER: &str = "posNumber";
pub const RANGE: &str = "range";
pub const PLAIN_DATE: &str = "plainDate";

const RANGE_MIN: f64 = 0.0;
const RANGE_MAX: f64 = 5.0;

lazy_static! {
    // Unanchored: a date-shaped run anywhere in the value is accepted.
    static ref PLAIN_DATE_REGEX: Regex = Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").unwrap();
    static ref DECIMAL_REGEX: Regex =
        Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$").unwrap();
}

/// Raw query string values keyed by parameter name.
///
/// Every occurrence of a key is kept in wire order so a repeated key can be
/// told apart from a single value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct QueryParameters(HashMap<String, Vec<String>>);

impl QueryParameters {
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in iter {
            map.entry(key.into()).or_default().push(value.into());
        }
        QueryParameters(map)
    }
}

impl From<Vec<(String, String)>> for QueryParameters {
    fn from(pairs: Vec<(String, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

/// The typed result of a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub name: String,
    pub many: Option<Vec<String>>,
    pub string: Option<String>,
    pub pos_number: Option<f64>,
    pub range: Option<f64>,
    pub plain_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Issue {
    #[error("Required")]
    Required,
    #[error("Expected string, received array")]
    ExpectedString,
    #[error("String must contain at least 1 character(s)")]
    EmptyString,
    #[error("Expected number, received nan")]
    ExpectedNumber,
    #[error("Number must be greater than 0")]
    NotPositive,
    #[error("Number must be greater than or equal to {0}")]
    BelowMinimum(f64),
    #[error("Number must be less than or equal to {0}")]
    AboveMaximum(f64),
    #[error("Invalid plain date: {0}")]
    InvalidPlainDate(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{issue} at \"{field}\"")]
pub struct FieldIssue {
    pub field: &'static str,
    pub issue: Issue,
}

/// Every field that failed validation, in schema order.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationFailure {
    issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Validates every field of the schema and either returns all of them
/// coerced or every issue found.
pub fn validate(raw: &QueryParameters) -> Result<ParsedQuery, ValidationFailure> {
    let mut fields = FieldReader {
        raw,
        issues: Vec::new(),
    };

    let name = fields.string(NAME, true);
    let many = fields.string(MANY, false).map(|value| split_list(&value));
    let string = fields.string(STRING, false);
    let pos_number = fields.number(POS_NUMBER, |n| {
        if n > 0.0 {
            Ok(())
        } else {
            Err(Issue::NotPositive)
        }
    });
    let range = fields.number(RANGE, |n| {
        if n < RANGE_MIN {
            Err(Issue::BelowMinimum(RANGE_MIN))
        } else if n > RANGE_MAX {
            Err(Issue::AboveMaximum(RANGE_MAX))
        } else {
            Ok(())
        }
    });
    let plain_date = fields.check(PLAIN_DATE, |value| {
        if PLAIN_DATE_REGEX.is_match(&value) {
            Ok(value)
        } else {
            Err(Issue::InvalidPlainDate(value))
        }
    });

    match name {
        Some(name) if fields.issues.is_empty() => Ok(ParsedQuery {
            name,
            many,
            string,
            pos_number,
            range,
            plain_date,
        }),
        _ => Err(ValidationFailure {
            issues: fields.issues,
        }),
    }
}

struct FieldReader<'a> {
    raw: &'a QueryParameters,
    issues: Vec<FieldIssue>,
}

impl FieldReader<'_> {
    fn fail(&mut self, field: &'static str, issue: Issue) {
        self.issues.push(FieldIssue { field, issue });
    }

    /// A single non-empty value, or `None` when absent or invalid.
    fn string(&mut self, field: &'static str, required: bool) -> Option<String> {
        let raw = self.raw;
        match raw.get(field) {
            None | Some([]) => {
                if required {
                    self.fail(field, Issue::Required);
                }
                None
            }
            Some([value]) if value.is_empty() => {
                self.fail(field, Issue::EmptyString);
                None
            }
            Some([value]) => Some(value.clone()),
            Some(_) => {
                self.fail(field, Issue::ExpectedString);
                None
            }
        }
    }

    fn check<T>(
        &mut self,
        field: &'static str,
        coerce: impl FnOnce(String) -> Result<T, Issue>,
    ) -> Option<T> {
        let value = self.string(field, false)?;
        match coerce(value) {
            Ok(coerced) => Some(coerced),
            Err(issue) => {
                self.fail(field, issue);
                None
            }
        }
    }

    fn number(
        &mut self,
        field: &'static str,
        constraint: impl FnOnce(f64) -> Result<(), Issue>,
    ) -> Option<f64> {
        self.check(field, |value| {
            let number = parse_number(&value).ok_or(Issue::ExpectedNumber)?;
            constraint(number)?;
            Ok(number)
        })
    }
}

/// Coerces the way a JavaScript `Number()` call does: blank is zero, signed
/// decimals with optional exponent, `Infinity` with an optional sign, and
/// unsigned `0x`/`0o`/`0b` integers. Anything else is NaN and yields `None`.
fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return Some(0.0);
    }

    match trimmed {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    if let Some(number) = parse_radix_integer(trimmed) {
        return number;
    }

    if DECIMAL_REGEX.is_match(trimmed) {
        trimmed.parse::<f64>().ok()
    } else {
        None
    }
}

/// `None` when `value` carries no radix prefix, otherwise the parsed integer
/// (or `Some(None)` when its digits are invalid).
fn parse_radix_integer(value: &str) -> Option<Option<f64>> {
    let prefix = value.get(..2)?;
    let digits = &value[2..];
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    if digits.is_empty() {
        return Some(None);
    }
    Some(digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix)
            .map(|digit| acc * f64::from(radix) + f64::from(digit))
    }))
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|item| item.trim().to_string()).collect()
}
