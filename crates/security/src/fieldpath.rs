//! Dotted-path navigation into a [`serde_json::Value`], used by the
//! field-policy encryption mode to reach specific leaves.

use serde_json::Value;

/// Get a mutable reference to the value at `path` (dot-separated keys
/// into nested objects), or `None` if any segment is missing or not an
/// object.
pub fn get_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Get a shared reference to the value at `path`.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_paths() {
        let v = json!({"content": {"text": "hi"}});
        assert_eq!(get(&v, "content.text"), Some(&json!("hi")));
    }

    #[test]
    fn missing_segments_resolve_to_none() {
        let v = json!({"content": {"text": "hi"}});
        assert_eq!(get(&v, "content.missing"), None);
        assert_eq!(get(&v, "nope.text"), None);
    }

    #[test]
    fn get_mut_allows_in_place_replacement() {
        let mut v = json!({"content": {"text": "hi"}});
        if let Some(slot) = get_mut(&mut v, "content.text") {
            *slot = json!("replaced");
        }
        assert_eq!(v["content"]["text"], json!("replaced"));
    }
}
