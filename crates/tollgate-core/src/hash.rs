//! Canonical hashing of action parameters and results.
//!
//! The canonical form of a parameter mapping is compact JSON with:
//!
//! - Keys sorted by code point at every nesting level
//! - `,` and `:` separators with no whitespace
//! - Every character outside printable ASCII escaped as `\uXXXX`
//!   (UTF-16 code units, lowercase hex)
//! - Floats in shortest round-trip form, always with a fraction or exponent
//!   (`1.0`, `1e-05`, `1.5e+20`); integers as written
//!
//! so the digest of a mapping matches what other authority clients compute for
//! the same arguments. Results are hashed verbatim. Both digests are lowercase
//! hex SHA-256.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Serializer, Value};
use sha2::{Digest, Sha256};

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compact formatter with ASCII-only strings and fixed float notation.
struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(float_repr(value).as_bytes())
    }
}

/// Shortest round-trip decimal of `value`. Plain notation for decimal
/// exponents in `-5 < e < 16`, scientific with a signed two-digit exponent
/// otherwise.
fn float_repr(value: f64) -> String {
    let sci = format!("{:e}", value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };

    if exp <= -5 || exp >= 16 {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs());
    }

    let digits = mantissa.replace('.', "");
    let body = if exp >= 0 {
        let point = exp as usize + 1;
        if digits.len() <= point {
            format!("{digits}{}.0", "0".repeat(point - digits.len()))
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    } else {
        format!("0.{}{digits}", "0".repeat((-exp - 1) as usize))
    };
    format!("{sign}{body}")
}

/// Copy of `value` with object keys inserted in sorted order, independent of
/// whether `serde_json` preserves insertion order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON form of an argument mapping.
///
/// Writing a `Value` into memory cannot fail: keys are strings and numbers are
/// finite. The output is pure ASCII.
pub fn canonical_parameters(params: &Map<String, Value>) -> String {
    let value = sorted(&Value::Object(params.clone()));
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, CanonicalFormatter);
    #[allow(clippy::expect_used)]
    value
        .serialize(&mut serializer)
        .expect("in-memory JSON serialization cannot fail");
    String::from_utf8_lossy(&out).into_owned()
}

/// SHA-256 of the canonical form of `params`. Insertion order is irrelevant.
pub fn hash_parameters(params: &Map<String, Value>) -> String {
    sha256_hex(canonical_parameters(params).as_bytes())
}

/// SHA-256 of the UTF-8 bytes of `text`, without canonicalization.
pub fn hash_result(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_empty_mapping_digest() {
        assert_eq!(
            hash_parameters(&Map::new()),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let mut a = Map::new();
        a.insert("b".into(), json!(2));
        a.insert("a".into(), json!(1));

        let mut b = Map::new();
        b.insert("a".into(), json!(1));
        b.insert("b".into(), json!(2));

        assert_eq!(hash_parameters(&a), hash_parameters(&b));
        assert_eq!(
            hash_parameters(&a),
            "43258cff783fe7036d8a43033f830adfc60ec037382473548ac742b888292777"
        );
    }

    #[test]
    fn test_nested_keys_sorted() {
        let params = map(json!({"outer": {"z": 1, "a": 2}, "first": true}));
        assert_eq!(
            canonical_parameters(&params),
            r#"{"first":true,"outer":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn test_value_change_changes_digest() {
        let a = map(json!({"amount": 100, "to": "alice"}));
        let b = map(json!({"amount": 101, "to": "alice"}));
        let c = map(json!({"amount": 100, "to": "bob"}));
        assert_ne!(hash_parameters(&a), hash_parameters(&b));
        assert_ne!(hash_parameters(&a), hash_parameters(&c));
    }

    #[test]
    fn test_non_ascii_escaped() {
        let params = map(json!({"name": "José"}));
        assert_eq!(canonical_parameters(&params), r#"{"name":"Jos\u00e9"}"#);
        assert_eq!(
            hash_parameters(&params),
            "782f7fb6e7349477ad0878467428033420f78fc728c94d07ebb1d49d7cbae82e"
        );
    }

    #[test]
    fn test_astral_and_control_characters() {
        let params = map(json!({"e": "\u{1f600}", "d": "a\u{7f}b\n\t\u{1}"}));
        assert_eq!(
            canonical_parameters(&params),
            r#"{"d":"a\u007fb\n\t\u0001","e":"\ud83d\ude00"}"#
        );
        assert_eq!(
            hash_parameters(&params),
            "f14ea4f947f4459dbf57d85672ec4362e301f0c318baa4d2125002c267b145e9"
        );
    }

    #[test]
    fn test_float_and_integer_distinct() {
        let float = map(json!({"amount": 1.0}));
        let int = map(json!({"amount": 1}));
        assert_eq!(canonical_parameters(&float), r#"{"amount":1.0}"#);
        assert_eq!(
            hash_parameters(&float),
            "33de929d2ca0f46c2567b81722557a14506bdd2eab62fc49629b528fb980905f"
        );
        assert_eq!(
            hash_parameters(&int),
            "c2b11e657e12fd177359627ca89412018e2274d0873cfbfcf1fc50f685582e9e"
        );
    }

    #[test]
    fn test_float_notation() {
        let params = map(json!({
            "g": 123.456,
            "h": 1e15,
            "i": -0.0,
            "j": 0.0001,
            "k": 1.5e20,
            "m": 1e16,
            "n": 1e-5
        }));
        assert_eq!(
            canonical_parameters(&params),
            r#"{"g":123.456,"h":1000000000000000.0,"i":-0.0,"j":0.0001,"k":1.5e+20,"m":1e+16,"n":1e-05}"#
        );
        assert_eq!(
            hash_parameters(&params),
            "b5ac26e9040615151ef3953d02fea455547f76d5433cd7a2f76611bc42cf2fea"
        );
    }

    #[test]
    fn test_hash_result_is_verbatim() {
        assert_eq!(
            hash_result("ok"),
            "2689367b205c16ce32ed4200942b8b8b1e262dfc70d9bc9fbc77c49699a4f1df"
        );
        // Not canonicalized: whitespace matters.
        assert_ne!(hash_result(r#"{"a":1}"#), hash_result(r#"{ "a": 1 }"#));
    }
}
