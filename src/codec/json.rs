//! JSON codec using `serde_json`.
//!
//! Output is always compact: `serde_json::to_vec` emits no whitespace between
//! tokens, which is what the front-end writes as well.

use crate::error::Result;

/// Compact JSON codec for structured messages.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not valid UTF-8 JSON for type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    #[serde(rename_all = "kebab-case")]
    struct TestStruct {
        submission_id: u64,
        language: String,
        force: bool,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = TestStruct {
            submission_id: 42,
            language: "PY3".to_string(),
            force: true,
        };

        let encoded = JsonCodec::encode(&original).unwrap();
        let decoded: TestStruct = JsonCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_output_is_compact() {
        let value = TestStruct {
            submission_id: 1,
            language: "C".to_string(),
            force: false,
        };

        let encoded = JsonCodec::encode(&value).unwrap();

        assert_eq!(
            std::str::from_utf8(&encoded).unwrap(),
            r#"{"submission-id":1,"language":"C","force":false}"#
        );
    }

    #[test]
    fn test_null_decodes_to_none() {
        let decoded: Option<TestStruct> = JsonCodec::decode(b"null").unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<TestStruct> = JsonCodec::decode(b"not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_unicode_source_survives() {
        let source = "print('zażółć gęślą jaźń')".to_string();
        let encoded = JsonCodec::encode(&source).unwrap();
        let decoded: String = JsonCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, source);
    }
}
