//! Annotation and attachment values
//!
//! A value is either the collected data or the typed reason it is missing.
//! There is no nullable string: an empty string is a real value.

use std::collections::BTreeMap;

use super::errors::ErrorKind;

/// A single annotation: a short string or the reason it is missing
pub type AnnotationValue = Result<String, ErrorKind>;

/// A single attachment: a (possibly large) text blob or the reason it is missing
pub type AttachmentValue = Result<String, ErrorKind>;

/// Annotations keyed by annotation key
pub type Annotations = BTreeMap<String, AnnotationValue>;

/// Attachments keyed by attachment key
pub type Attachments = BTreeMap<String, AttachmentValue>;

/// Builds a map where every key in `keys` carries the same error.
///
/// Providers use this when a source fails as a whole.
pub fn all_errors<'a, I>(keys: I, error: ErrorKind) -> BTreeMap<String, Result<String, ErrorKind>>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter()
        .map(|key| (key.to_string(), Err(error)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_compare_structurally() {
        let a: AnnotationValue = Ok("x".to_string());
        let b: AnnotationValue = Ok(String::from("x"));
        assert_eq!(a, b);

        let timeout: AnnotationValue = Err(ErrorKind::Timeout);
        let missing: AnnotationValue = Err(ErrorKind::MissingValue);
        assert_ne!(timeout, missing);
    }

    #[test]
    fn test_value_serialization_round_trip() {
        let value: AnnotationValue = Ok("x".to_string());
        let json = serde_json::to_string(&value).unwrap();
        let back: AnnotationValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Ok("x".to_string()));
    }

    #[test]
    fn test_empty_string_is_a_value() {
        let value: AnnotationValue = Ok(String::new());
        assert!(value.is_ok());
    }

    #[test]
    fn test_all_errors() {
        let map = all_errors(["a", "b"], ErrorKind::ConnectionError);
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], Err(ErrorKind::ConnectionError));
        assert_eq!(map["b"], Err(ErrorKind::ConnectionError));
    }
}
