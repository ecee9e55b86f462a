//! Declarative per-field validation.
//!
//! Each resource declares `(field, rules)` pairs in its configuration; the
//! mutation pipeline runs them against the raw payload before anything is
//! written. Failures accumulate into an [`ErrorBag`] keyed by field.

use crate::error::ErrorBag;
use crate::service::image::UploadedImage;
use crate::service::resource::Record;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Accepted upload extensions, matching the original CMS.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "png", "jpg", "gif", "svg"];

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// One validation rule for one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Required,
    /// Absent or null values skip the remaining rules.
    Nullable,
    Str,
    MaxLen(usize),
    In(&'static [&'static str]),
    UrlHttps,
    StartsWith(&'static str),
    Matches(&'static str),
    DateTimeFormat(&'static str),
    DateFormat(&'static str),
    Email,
    Numeric,
    Between(f64, f64),
    /// Uploaded file: extension allowlist plus a size ceiling.
    Image { max_kb: usize },
}

/// Validate a payload against a resource's declared rules.
///
/// The special field name `image` is checked against the uploaded file
/// rather than the record. Returns an empty bag when everything passes.
pub fn validate(
    rules: &[(&'static str, &'static [Rule])],
    data: &Record,
    image: Option<&UploadedImage>,
) -> ErrorBag {
    let mut errors = ErrorBag::new();

    for (field, field_rules) in rules {
        if *field == "image" {
            validate_image(&mut errors, field_rules, image);
            continue;
        }

        let value = data.get(*field).filter(|v| !v.is_null());
        let present = match value {
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
            None => false,
        };

        if !present {
            if field_rules.contains(&Rule::Required) {
                errors.add(*field, format!("The {} field is required.", field));
            }
            continue;
        }
        let value = value.unwrap();

        for rule in field_rules.iter() {
            apply_rule(&mut errors, field, rule, value);
        }
    }

    errors
}

fn validate_image(errors: &mut ErrorBag, rules: &[Rule], image: Option<&UploadedImage>) {
    let Some(image) = image else {
        if rules.contains(&Rule::Required) {
            errors.add("image", "The image field is required.");
        }
        return;
    };

    for rule in rules {
        if let Rule::Image { max_kb } = rule {
            if !IMAGE_EXTENSIONS.contains(&image.extension()) {
                errors.add(
                    "image",
                    format!(
                        "The image must be a file of type: {}.",
                        IMAGE_EXTENSIONS.join(", ")
                    ),
                );
            }
            if image.bytes.len() > max_kb * 1024 {
                errors.add(
                    "image",
                    format!("The image may not be greater than {} kilobytes.", max_kb),
                );
            }
        }
    }
}

fn apply_rule(errors: &mut ErrorBag, field: &str, rule: &Rule, value: &Value) {
    match rule {
        Rule::Required | Rule::Nullable | Rule::Image { .. } => {}

        Rule::Str => {
            if !value.is_string() {
                errors.add(field, format!("The {} must be a string.", field));
            }
        }

        Rule::MaxLen(max) => {
            if let Some(s) = value.as_str() {
                if s.chars().count() > *max {
                    errors.add(
                        field,
                        format!("The {} may not be greater than {} characters.", field, max),
                    );
                }
            }
        }

        Rule::In(allowed) => {
            let ok = value.as_str().map(|s| allowed.contains(&s)).unwrap_or(false);
            if !ok {
                errors.add(field, format!("The selected {} is invalid.", field));
            }
        }

        Rule::UrlHttps => {
            let ok = value
                .as_str()
                .map(|s| {
                    s.len() > "https://".len()
                        && s.starts_with("https://")
                        && !s.contains(char::is_whitespace)
                })
                .unwrap_or(false);
            if !ok {
                errors.add(field, format!("The {} must be a valid HTTPS URL.", field));
            }
        }

        Rule::StartsWith(prefix) => {
            let ok = value.as_str().map(|s| s.starts_with(prefix)).unwrap_or(false);
            if !ok {
                errors.add(field, format!("The {} must start with {}.", field, prefix));
            }
        }

        Rule::Matches(pattern) => {
            // Patterns come from static configuration, so a compile failure
            // is a programming error surfaced as a rule failure.
            let ok = Regex::new(pattern)
                .map(|re| value.as_str().map(|s| re.is_match(s)).unwrap_or(false))
                .unwrap_or(false);
            if !ok {
                errors.add(field, format!("The {} format is invalid.", field));
            }
        }

        Rule::DateTimeFormat(format) => {
            let ok = value
                .as_str()
                .map(|s| NaiveDateTime::parse_from_str(s, format).is_ok())
                .unwrap_or(false);
            if !ok {
                errors.add(
                    field,
                    format!("The {} does not match the format {}.", field, format),
                );
            }
        }

        Rule::DateFormat(format) => {
            let ok = value
                .as_str()
                .map(|s| NaiveDate::parse_from_str(s, format).is_ok())
                .unwrap_or(false);
            if !ok {
                errors.add(
                    field,
                    format!("The {} does not match the format {}.", field, format),
                );
            }
        }

        Rule::Email => {
            let regex = EMAIL_REGEX
                .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
            let ok = value.as_str().map(|s| regex.is_match(s)).unwrap_or(false);
            if !ok {
                errors.add(
                    field,
                    format!("The {} must be a valid email address.", field),
                );
            }
        }

        Rule::Numeric => {
            if numeric_value(value).is_none() {
                errors.add(field, format!("The {} must be a number.", field));
            }
        }

        Rule::Between(min, max) => {
            // Non-numeric input is the Numeric rule's problem.
            if let Some(n) = numeric_value(value) {
                if n < *min || n > *max {
                    errors.add(
                        field,
                        format!("The {} must be between {} and {}.", field, min, max),
                    );
                }
            }
        }
    }
}

/// Numbers arrive as JSON numbers from API clients and as strings from
/// multipart forms; both count as numeric.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
