// Commitment over the disclosed public fields.
//
//   commitment = keccak256(concat(leaf values))   when any leaf exists
//   commitment = keccak256("1")                    when nothing is disclosed
//
// Leaves are gathered depth-first in disclosure order. The top-level `str`
// display string of each field is skipped. Nothing is sorted. Numbers render
// the way a JavaScript validator stringifies them.

use serde_json::{Number, Value};

use crate::hash::keccak256_hex;
use crate::schema::PublicField;

/// Preimage hashed when no field contributes a leaf.
pub const EMPTY_COMMITMENT_PREIMAGE: &[u8] = b"1";

/// Commitment of the empty disclosure set.
pub fn empty_commitment() -> String {
    keccak256_hex(EMPTY_COMMITMENT_PREIMAGE)
}

/// Concatenation of every leaf value, in traversal order.
pub fn public_data(fields: &[PublicField]) -> String {
    let mut acc = String::new();
    for field in fields {
        for value in field.values.values() {
            push_leaves(value, &mut acc);
        }
    }
    acc
}

pub fn commit(fields: &[PublicField]) -> String {
    let data = public_data(fields);
    if data.is_empty() {
        return empty_commitment();
    }
    keccak256_hex(data.as_bytes())
}

fn push_leaves(value: &Value, acc: &mut String) {
    match value {
        Value::Null => {}
        Value::Bool(b) => acc.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => acc.push_str(&number_text(n)),
        Value::String(s) => acc.push_str(s),
        Value::Array(items) => items.iter().for_each(|v| push_leaves(v, acc)),
        Value::Object(map) => map.values().for_each(|v| push_leaves(v, acc)),
    }
}

/// Integers keep their exact digits. Floats follow ECMAScript `Number::toString`:
/// integral values drop the fraction and exponents outside `[-7, 21)` are written
/// as `1e+21` / `1e-7`.
fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) => js_float(f),
        None => n.to_string(),
    }
}

fn js_float(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let sign = if f < 0.0 { "-" } else { "" };
    // Shortest round-trip digits, e.g. "1.2345e2".
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let k = digits.len() as i32;
    let n = exp + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", lead, e_sign, e.abs())
        } else {
            format!("{}.{}e{}{}", lead, rest, e_sign, e.abs())
        }
    };
    format!("{}{}", sign, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::keccak256_hex;
    use serde_json::json;

    fn field(raw: Value) -> PublicField {
        serde_json::from_value(raw).expect("field")
    }

    #[test]
    fn empty_set_uses_sentinel() {
        assert_eq!(commit(&[]), keccak256_hex(b"1"));
        assert_eq!(commit(&[]), empty_commitment());
    }

    #[test]
    fn display_only_fields_commit_like_empty_set() {
        let fields = vec![PublicField::new("Verified account")];
        assert_eq!(commit(&fields), empty_commitment());
    }

    #[test]
    fn single_value_hashes_its_text() {
        let fields = vec![field(json!({"str": "Balance: 42", "value": 42}))];
        assert_eq!(public_data(&fields), "42");
        assert_eq!(commit(&fields), keccak256_hex(b"42"));
    }

    #[test]
    fn display_string_does_not_affect_commitment() {
        let a = vec![field(json!({"str": "42 USD", "value": 42}))];
        let b = vec![field(json!({"str": "USD 42.00", "value": 42}))];
        assert_eq!(commit(&a), commit(&b));
    }

    #[test]
    fn nested_values_traverse_depth_first_in_disclosure_order() {
        let fields = vec![field(json!({
            "str": "profile",
            "name": "alice",
            "meta": {"age": 30, "tags": ["a", "b"], "ok": true, "none": null},
            "tail": "z"
        }))];
        assert_eq!(public_data(&fields), "alice30abtruez");
    }

    #[test]
    fn floats_render_like_javascript() {
        let fields = vec![field(json!({
            "str": "n",
            "a": 1.0,
            "b": 1.5,
            "c": 1e21,
            "d": 1.25e-7,
            "e": 0.000001,
            "f": -2.0,
            "g": 123456789012.5
        }))];
        assert_eq!(
            public_data(&fields),
            ["1", "1.5", "1e+21", "1.25e-7", "0.000001", "-2", "123456789012.5"].concat()
        );
        assert_eq!(js_float(1e20), "100000000000000000000");
        assert_eq!(js_float(0.1), "0.1");
        assert_eq!(js_float(-0.0), "0");
    }

    #[test]
    fn integers_keep_their_digits() {
        let fields = vec![field(json!({"str": "n", "big": u64::MAX, "neg": -7}))];
        assert_eq!(public_data(&fields), format!("{}-7", u64::MAX));
    }

    #[test]
    fn nested_str_keys_are_values() {
        let fields = vec![field(json!({"str": "x", "inner": {"str": "kept"}}))];
        assert_eq!(public_data(&fields), "kept");
    }

    #[test]
    fn commitment_is_deterministic() {
        let make = || {
            vec![
                field(json!({"str": "a", "value": "1"})),
                field(json!({"str": "b", "value": "2"})),
            ]
        };
        assert_eq!(commit(&make()), commit(&make()));
    }

    #[test]
    fn reordering_fields_changes_commitment() {
        let first = field(json!({"str": "a", "value": "1"}));
        let second = field(json!({"str": "b", "value": "2"}));
        let forward = commit(&[first.clone(), second.clone()]);
        let reversed = commit(&[second, first]);
        assert_ne!(forward, reversed);
    }
}
