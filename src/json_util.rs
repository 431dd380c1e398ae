//! Tolerant accessors for loosely-typed upstream payloads.
//!
//! Upstreams disagree on shape: numbers arrive as strings, keys switch
//! between camelCase and snake_case, and list fields arrive either as JSON
//! arrays or as *stringified* JSON arrays. Business logic never touches a
//! raw `Value`; the normalize layer pulls fields through these helpers.

use serde_json::Value;

pub fn get_str(v: &Value, key: &str) -> Option<String> {
    let val = v.as_object()?.get(key)?;
    if let Some(s) = val.as_str() {
        return Some(s.to_string());
    }
    if val.is_number() {
        return Some(val.to_string());
    }
    None
}

/// First present key wins. Covers upstreams that switch naming conventions
/// between endpoints (`conditionId` vs `condition_id`).
pub fn get_str_any(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| get_str(v, k))
}

pub fn get_f64(v: &Value, key: &str) -> Option<f64> {
    let val = v.as_object()?.get(key)?;
    if let Some(n) = val.as_f64() {
        return n.is_finite().then_some(n);
    }
    if let Some(s) = val.as_str() {
        return s.trim().parse::<f64>().ok().filter(|n| n.is_finite());
    }
    None
}

pub fn get_u64(v: &Value, key: &str) -> Option<u64> {
    let val = v.as_object()?.get(key)?;
    if let Some(n) = val.as_u64() {
        return Some(n);
    }
    if let Some(s) = val.as_str() {
        return s.trim().parse::<u64>().ok();
    }
    None
}

pub fn get_array<'a>(v: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    v.as_object()?.get(key)?.as_array()
}

/// A list of strings, accepted either as a JSON array or as a stringified
/// JSON array (`"[\"Yes\", \"No\"]"`). Missing/garbage yields empty.
pub fn str_list(v: &Value, key: &str) -> Vec<String> {
    let Some(val) = v.as_object().and_then(|o| o.get(key)) else {
        return Vec::new();
    };
    match val {
        Value::Array(items) => items
            .iter()
            .filter_map(|x| x.as_str().map(|s| s.to_string()))
            .collect(),
        Value::String(s) => serde_json::from_str::<Vec<String>>(s).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Same as [`str_list`] but parsed as floats; items may themselves be
/// numeric strings.
pub fn f64_list(v: &Value, key: &str) -> Vec<f64> {
    fn item_f64(x: &Value) -> Option<f64> {
        if let Some(n) = x.as_f64() {
            return n.is_finite().then_some(n);
        }
        x.as_str()?.trim().parse::<f64>().ok().filter(|n| n.is_finite())
    }

    let Some(val) = v.as_object().and_then(|o| o.get(key)) else {
        return Vec::new();
    };
    match val {
        Value::Array(items) => items.iter().filter_map(item_f64).collect(),
        Value::String(s) => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(items) => items.iter().filter_map(item_f64).collect(),
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// If the API gives seconds, normalize to ms.
pub fn normalize_ts_ms(ts: u64) -> u64 {
    if ts < 1_000_000_000_000 {
        ts.saturating_mul(1000)
    } else {
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_str_accepts_numbers() {
        let v = json!({"id": 514163, "name": "x"});
        assert_eq!(get_str(&v, "id").as_deref(), Some("514163"));
        assert_eq!(get_str(&v, "name").as_deref(), Some("x"));
        assert_eq!(get_str(&v, "missing"), None);
    }

    #[test]
    fn get_str_any_prefers_first_present() {
        let v = json!({"condition_id": "0xabc"});
        assert_eq!(
            get_str_any(&v, &["conditionId", "condition_id"]).as_deref(),
            Some("0xabc")
        );
    }

    #[test]
    fn get_f64_accepts_numeric_strings() {
        let v = json!({"a": 1.5, "b": "2.5", "c": "junk", "d": f64::NAN.to_string()});
        assert_eq!(get_f64(&v, "a"), Some(1.5));
        assert_eq!(get_f64(&v, "b"), Some(2.5));
        assert_eq!(get_f64(&v, "c"), None);
        assert_eq!(get_f64(&v, "d"), None);
    }

    #[test]
    fn str_list_accepts_both_shapes() {
        let v = json!({
            "arr": ["Yes", "No"],
            "packed": "[\"Yes\", \"No\"]",
            "bad": "not json",
            "num": 7
        });
        assert_eq!(str_list(&v, "arr"), vec!["Yes", "No"]);
        assert_eq!(str_list(&v, "packed"), vec!["Yes", "No"]);
        assert!(str_list(&v, "bad").is_empty());
        assert!(str_list(&v, "num").is_empty());
        assert!(str_list(&v, "missing").is_empty());
    }

    #[test]
    fn f64_list_accepts_string_items() {
        let v = json!({
            "arr": [0.65, "0.35"],
            "packed": "[\"0.6\", \"0.4\"]"
        });
        assert_eq!(f64_list(&v, "arr"), vec![0.65, 0.35]);
        assert_eq!(f64_list(&v, "packed"), vec![0.6, 0.4]);
    }

    #[test]
    fn seconds_are_promoted_to_ms() {
        assert_eq!(normalize_ts_ms(1_700_000_000), 1_700_000_000_000);
        assert_eq!(normalize_ts_ms(1_700_000_000_123), 1_700_000_000_123);
        assert_eq!(normalize_ts_ms(0), 0);
    }
}
