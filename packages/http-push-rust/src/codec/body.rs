//! Classification of response entities into JSON values.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use bridge_core::ContentType;
use serde_json::Value;

/// Turns a response entity into a domain value according to its content type.
///
/// - JSON types are parsed; a body that does not parse degrades to a string.
/// - Binary types are base64 encoded into a string.
/// - Everything else is decoded as text using the declared charset.
///
/// Never fails.
#[must_use]
pub fn classify_body(bytes: &[u8], content_type: &ContentType) -> Value {
    if content_type.is_json() {
        let text = content_type.decode(bytes);
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    } else if content_type.is_binary() {
        Value::String(BASE64_STANDARD.encode(bytes))
    } else {
        Value::String(content_type.decode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_body_is_parsed() {
        let value = classify_body(br#"{"a":1}"#, &ContentType::parse("application/json"));
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn malformed_json_degrades_to_string() {
        let value = classify_body(b"{not json", &ContentType::parse("application/json"));
        assert_eq!(value, Value::String("{not json".to_string()));
    }

    #[test]
    fn ditto_protocol_body_is_parsed() {
        let value = classify_body(
            br#"{"topic":"a/b/things/live/messages/x"}"#,
            &ContentType::parse("application/vnd.eclipse.ditto+json"),
        );
        assert!(value.is_object());
    }

    #[test]
    fn binary_body_is_base64() {
        let value = classify_body(&[0xff, 0x00, 0x10], &ContentType::application_octet_stream());
        assert_eq!(value, Value::String("/wAQ".to_string()));
    }

    #[test]
    fn text_body_honours_latin1() {
        let value = classify_body(&[0x63, 0x61, 0x66, 0xe9], &ContentType::parse("text/plain; charset=ISO-8859-1"));
        assert_eq!(value, Value::String("café".to_string()));
    }

    proptest! {
        #[test]
        fn binary_classification_is_base64_of_raw_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let value = classify_body(&bytes, &ContentType::application_octet_stream());
            let Value::String(encoded) = value else {
                panic!("binary classification must produce a string");
            };
            prop_assert_eq!(BASE64_STANDARD.decode(encoded).unwrap(), bytes);
        }

        #[test]
        fn json_classification_never_fails(text in ".*") {
            let value = classify_body(text.as_bytes(), &ContentType::parse("application/json"));
            match serde_json::from_str::<Value>(&text) {
                Ok(parsed) => prop_assert_eq!(value, parsed),
                Err(_) => prop_assert_eq!(value, Value::String(text)),
            }
        }
    }
}
