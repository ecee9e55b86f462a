use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Accumulator for field-level error messages.
///
/// Validation, not-found and delete failures are reported through this bag
/// so callers can surface them uniformly as `{"errors": {field: [msg...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorBag(BTreeMap<String, Vec<String>>);

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message against a field. Messages for the same field
    /// accumulate in insertion order.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    /// Fields that collected at least one message.
    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }

    pub fn of(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut bag = Self::new();
        bag.add(field, message);
        bag
    }
}

/// Failure modes of the resource service.
///
/// Expected failures (validation, not-found, delete-failure) are values the
/// HTTP layer turns into error bodies; `Db`/`Io` are unexpected faults that
/// propagate and map to 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed")]
    Validation(ErrorBag),

    #[error("no item with key {0} was found")]
    NotFound(String),

    #[error("failed to delete item with key {0}")]
    DeleteFailed(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// The error-bag rendering of an expected failure, if it is one.
    pub fn as_bag(&self) -> Option<ErrorBag> {
        match self {
            ServiceError::Validation(bag) => Some(bag.clone()),
            ServiceError::NotFound(key) => Some(ErrorBag::of(
                "item_not_found",
                format!("No item with key: {} was found", key),
            )),
            ServiceError::DeleteFailed(key) => Some(ErrorBag::of(
                "failed_to_delete",
                format!("Failed to delete item with key: {}", key),
            )),
            ServiceError::Db(_) | ServiceError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bag() {
        let bag = ErrorBag::new();
        assert!(bag.is_empty());
        assert!(!bag.has_errors());
        assert!(bag.fields().is_empty());
    }

    #[test]
    fn test_add_accumulates_messages_per_field() {
        let mut bag = ErrorBag::new();
        bag.add("title", "The title field is required.");
        bag.add("title", "The title must be a string.");
        bag.add("state", "The selected state is invalid.");

        assert!(bag.has_errors());
        assert_eq!(bag.get("title").unwrap().len(), 2);
        assert_eq!(bag.get("state").unwrap().len(), 1);
        assert!(bag.get("missing").is_none());
    }

    #[test]
    fn test_fields_are_sorted() {
        let mut bag = ErrorBag::new();
        bag.add("z_field", "msg");
        bag.add("a_field", "msg");

        assert_eq!(bag.fields(), vec!["a_field", "z_field"]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut bag = ErrorBag::new();
        bag.add("email", "The email must be a valid email address.");

        let json = serde_json::to_value(&bag).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"email": ["The email must be a valid email address."]})
        );
    }

    #[test]
    fn test_not_found_as_bag() {
        let err = ServiceError::NotFound("42".to_string());
        let bag = err.as_bag().expect("expected failure");
        assert_eq!(
            bag.get("item_not_found").unwrap()[0],
            "No item with key: 42 was found"
        );
    }

    #[test]
    fn test_unexpected_faults_have_no_bag() {
        let err = ServiceError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(err.as_bag().is_none());
    }
}
