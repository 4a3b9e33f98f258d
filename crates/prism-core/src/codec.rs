//! Base64 payload handling for the wire contract.
//!
//! Requests carry images as base64 strings, optionally behind a
//! `data:image/<type>;base64,` prefix. Responses always carry the prefix,
//! built from the resolved output format.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde_json::Value;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::pipeline::OutputFormat;

/// Standard alphabet, padding optional on input.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Strip an optional `data:image/<word>;base64,` prefix.
pub fn strip_data_uri(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("data:image/") else {
        return s;
    };
    let subtype_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if subtype_len == 0 {
        return s;
    }
    rest[subtype_len..].strip_prefix(";base64,").unwrap_or(s)
}

/// Exact decoded length of a well-formed base64 body, without decoding it.
fn decoded_len(body: &str) -> u64 {
    let unpadded = body.trim_end_matches('=').len() as u64;
    unpadded * 3 / 4
}

fn is_base64_body(body: &str) -> bool {
    let unpadded = body.trim_end_matches('=');
    let padding = body.len() - unpadded.len();
    !unpadded.is_empty()
        && padding <= 2
        && unpadded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Validate and decode a base64 image field.
///
/// The size ceiling is checked before any allocation, against the exact
/// decoded length implied by the body.
pub fn decode_image_field(
    value: Option<&Value>,
    field: &str,
    limits: &LimitsConfig,
) -> Result<Vec<u8>, PipelineError> {
    let s = match value {
        None | Some(Value::Null) => {
            return Err(PipelineError::MissingParameter(format!(
                "'{field}' is required"
            )))
        }
        Some(Value::String(s)) if !s.is_empty() => s.as_str(),
        Some(_) => {
            return Err(PipelineError::InvalidInput(format!(
                "'{field}' must be a non-empty base64 string"
            )))
        }
    };
    decode_base64(s, limits)
}

/// Validate and decode a base64 string, with or without a data URI prefix.
pub fn decode_base64(s: &str, limits: &LimitsConfig) -> Result<Vec<u8>, PipelineError> {
    let body = strip_data_uri(s);
    if !is_base64_body(body) {
        return Err(PipelineError::InvalidInput(
            "Invalid base64 format".to_string(),
        ));
    }

    let size_bytes = decoded_len(body);
    if size_bytes > limits.max_image_size_bytes {
        return Err(PipelineError::ImageTooLarge {
            size_bytes,
            max_bytes: limits.max_image_size_bytes,
        });
    }

    LENIENT
        .decode(body)
        .map_err(|e| PipelineError::InvalidInput(format!("Invalid base64 payload: {e}")))
}

/// Decode a response payload back into bytes, with no size ceiling.
pub fn decode_data_uri(s: &str) -> Result<Vec<u8>, PipelineError> {
    LENIENT
        .decode(strip_data_uri(s))
        .map_err(|e| PipelineError::InvalidInput(format!("Invalid base64 payload: {e}")))
}

/// Encode bytes as a data URI for the given output format.
pub fn encode_data_uri(bytes: &[u8], format: OutputFormat) -> String {
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
        // svg+xml is not a \w+ subtype, prefix stays and the body is rejected later
        assert_eq!(
            strip_data_uri("data:image/svg+xml;base64,AAAA"),
            "data:image/svg+xml;base64,AAAA"
        );
    }

    #[test]
    fn test_decode_plain_and_prefixed() {
        let limits = LimitsConfig::default();
        assert_eq!(decode_base64("SGVsbG8=", &limits).unwrap(), b"Hello");
        assert_eq!(
            decode_base64("data:image/png;base64,SGVsbG8", &limits).unwrap(),
            b"Hello"
        );
    }

    #[test]
    fn test_decode_rejects_bad_alphabet() {
        let limits = LimitsConfig::default();
        let err = decode_base64("not base64!", &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = decode_base64("QUJD===", &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_size_limit_is_exact() {
        let limits = LimitsConfig {
            max_image_size_bytes: 5,
            ..LimitsConfig::default()
        };
        // "Hello" is exactly 5 bytes, padded body
        assert!(decode_base64("SGVsbG8=", &limits).is_ok());

        let err = decode_base64("SGVsbG8h", &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImageTooLarge);
        assert_eq!(err.status(), 413);
    }

    #[test]
    fn test_image_field_presence() {
        let limits = LimitsConfig::default();
        let err = decode_image_field(None, "image", &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);

        let value = json!(42);
        let err = decode_image_field(Some(&value), "image", &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let value = json!("");
        let err = decode_image_field(Some(&value), "image", &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_encode_data_uri() {
        assert_eq!(
            encode_data_uri(b"Hello", OutputFormat::Jpeg),
            "data:image/jpeg;base64,SGVsbG8="
        );
        assert!(encode_data_uri(b"x", OutputFormat::Webp).starts_with("data:image/webp;base64,"));
    }

    #[test]
    fn test_decode_data_uri() {
        let uri = encode_data_uri(b"Hello", OutputFormat::Png);
        assert_eq!(decode_data_uri(&uri).unwrap(), b"Hello");
    }
}
