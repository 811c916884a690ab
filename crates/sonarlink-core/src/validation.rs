//! Payload parsing and validation
//!
//! Every inbound payload goes through [`parse`]: decode the
//! JSON into the typed payload, then run its `validator::Validate` rules. The
//! result is either a valid value or an error naming the offending fields, so
//! call sites never check fields by hand.
//!
//! The field rules themselves live on the payload types in [`crate::model`];
//! the custom checks they reference are defined here.

use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::BTreeMap;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{Error, Result};

/// Schemes accepted for the analytics server endpoint
const ENDPOINT_SCHEMES: &[&str] = &["http", "https"];

/// Schemes accepted for proxies
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Decode a JSON body and validate it
///
/// # Errors
///
/// - [`Error::Malformed`] if the body is not valid JSON for `T`
/// - [`Error::Validation`] if any field rule fails
pub fn parse<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_slice(body).map_err(|e| Error::malformed(e.to_string()))?;
    check(payload)
}

/// Validate a typed payload, passing it through on success
pub fn check<T: Validate>(payload: T) -> Result<T> {
    payload.validate()?;
    Ok(payload)
}

/// Human readable messages grouped by field name
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages = errors.iter().map(|e| describe(field, e)).collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return format!("{field}: {message}");
    }

    match error.code.as_ref() {
        "length" => match (error.params.get("min"), error.params.get("max")) {
            (Some(min), Some(max)) => {
                format!("{field}: must be between {min} and {max} characters long")
            }
            (Some(min), None) => format!("{field}: must be at least {min} characters long"),
            (None, Some(max)) => format!("{field}: must be at most {max} characters long"),
            _ => format!("{field}: has invalid length"),
        },
        code => format!("{field}: failed validation ({code})"),
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Reject strings that are empty or whitespace only
pub fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must not be blank"));
    }
    Ok(())
}

/// Require an absolute http(s) URL with a host
pub fn validate_endpoint(value: &str) -> std::result::Result<(), ValidationError> {
    let url = Url::parse(value).map_err(|_| invalid("url", "must be a valid URL"))?;

    if !ENDPOINT_SCHEMES.contains(&url.scheme()) {
        return Err(invalid("url_scheme", "must use the http or https scheme"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("url_host", "must include a host"));
    }
    Ok(())
}

/// Accept an empty string (no proxy) or an absolute proxy URL
pub fn validate_proxy(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }

    let url = Url::parse(value).map_err(|_| invalid("url", "must be a valid URL"))?;

    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(invalid(
            "url_scheme",
            "must use the http, https, socks5 or socks5h scheme",
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("url_host", "must include a host"));
    }
    Ok(())
}

/// The token ends up in a header value, so it must be non-blank and free of
/// control characters
pub fn validate_token(value: &str) -> std::result::Result<(), ValidationError> {
    validate_not_blank(value)?;
    if value.chars().any(char::is_control) {
        return Err(invalid("token_format", "must not contain control characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectionPatch, NewConnection, TestConnectionRequest};

    #[test]
    fn test_parse_valid_new_connection() {
        let body = br#"{"name":"sonar","endpoint":"http://localhost:9000/api/","token":"squ_1"}"#;
        let new: NewConnection = parse(body).unwrap();
        assert_eq!(new.name, "sonar");
        assert_eq!(new.proxy, None);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse::<NewConnection>(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_parse_rejects_missing_required_field() {
        let err = parse::<NewConnection>(br#"{"name":"sonar","token":"t"}"#).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_parse_names_offending_fields() {
        let body = br#"{"name":"  ","endpoint":"ftp://sonar","token":"squ_1"}"#;
        let err = parse::<NewConnection>(body).unwrap_err();

        let Error::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        let fields = field_messages(&errors);
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("endpoint"));
        assert!(!fields.contains_key("token"));
    }

    #[test]
    fn test_endpoint_rules() {
        assert!(validate_endpoint("https://sonar.example.com/api/").is_ok());
        assert!(validate_endpoint("http://10.0.0.5:9000/api").is_ok());
        assert!(validate_endpoint("sonar.example.com").is_err());
        assert!(validate_endpoint("ftp://sonar.example.com").is_err());
        assert!(validate_endpoint("").is_err());
    }

    #[test]
    fn test_proxy_rules() {
        assert!(validate_proxy("").is_ok());
        assert!(validate_proxy("http://proxy.local:3128").is_ok());
        assert!(validate_proxy("socks5://127.0.0.1:1080").is_ok());
        assert!(validate_proxy("proxy.local:3128").is_err());
        assert!(validate_proxy("gopher://proxy.local").is_err());
    }

    #[test]
    fn test_token_rules() {
        assert!(validate_token("squ_0123456789abcdef").is_ok());
        assert!(validate_token("   ").is_err());
        assert!(validate_token("abc\ndef").is_err());
    }

    #[test]
    fn test_patch_validates_only_supplied_fields() {
        let patch: ConnectionPatch = parse(br#"{}"#).unwrap();
        assert!(patch.is_empty());

        let patch: ConnectionPatch = parse(br#"{"proxy":""}"#).unwrap();
        assert_eq!(patch.proxy.as_deref(), Some(""));

        let err = parse::<ConnectionPatch>(br#"{"endpoint":"not a url"}"#).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_name_length_limit() {
        let new = NewConnection::new("x".repeat(101), "http://localhost:9000/api/", "t");
        assert!(check(new).is_err());
    }

    #[test]
    fn test_test_request_from_body() {
        let body = br#"{
            "endpoint": "http://localhost:9000/api/",
            "token": "squ_1",
            "proxy": "http://proxy.local:3128"
        }"#;
        let request: TestConnectionRequest = parse(body).unwrap();
        assert_eq!(request.proxy.as_deref(), Some("http://proxy.local:3128"));
    }
}
