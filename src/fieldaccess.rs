use serde_json::Value;

/// Follows `path` through nested JSON objects.
///
/// Returns `None` as soon as a step is not an object or the key is missing. A `null` leaf is
/// reported as absent as well, falsy values like `0` or `""` are returned as is.
pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

pub fn lookup_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(root, path).and_then(Value::as_str)
}

pub fn lookup_i64(root: &Value, path: &[&str]) -> Option<i64> {
    lookup(root, path).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let data = json!({"General": {"Lan": {"Mac": {"Val": "aa:bb"}}}});
        assert_eq!(lookup(&data, &["General", "Lan", "Mac", "Val"]), Some(&json!("aa:bb")));
        assert_eq!(lookup_str(&data, &["General", "Lan", "Mac", "Val"]), Some("aa:bb"));
        assert_eq!(lookup(&data, &[]), Some(&data));
    }

    #[test]
    fn test_lookup_missing_key() {
        let data = json!({"General": {"Lan": {}}});
        assert_eq!(lookup(&data, &["General", "Lan", "Mac", "Val"]), None);
        assert_eq!(lookup(&data, &["Ventilation"]), None);
    }

    #[test]
    fn test_lookup_through_non_object() {
        let data = json!({"General": {"Lan": 5, "List": [1, 2], "Text": "abc"}});
        assert_eq!(lookup(&data, &["General", "Lan", "Mac"]), None);
        assert_eq!(lookup(&data, &["General", "List", "0"]), None);
        assert_eq!(lookup(&data, &["General", "Text", "Val"]), None);
        assert_eq!(lookup(&json!(null), &["General"]), None);
        assert_eq!(lookup(&json!([{"a": 1}]), &["a"]), None);
    }

    #[test]
    fn test_lookup_keeps_falsy_values() {
        let data = json!({"Zero": {"Val": 0}, "Empty": {"Val": ""}, "False": {"Val": false}, "Null": {"Val": null}});
        assert_eq!(lookup_i64(&data, &["Zero", "Val"]), Some(0));
        assert_eq!(lookup_str(&data, &["Empty", "Val"]), Some(""));
        assert_eq!(lookup(&data, &["False", "Val"]), Some(&json!(false)));
        assert_eq!(lookup(&data, &["Null", "Val"]), None);
    }
}
