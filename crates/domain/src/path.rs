//! Dotted-path resolution over document JSON.
//!
//! Admin `@edit`, `@examine`, and LLM-returned `state_updates` all address
//! state through dotted paths (`npcs.louisa.state.bottles_collected`).
//! Array elements are addressed either by numeric index or, for item lists,
//! by the element's `instance_id` (`...items.dream_bottle_1.visible`).
//!
//! Mutating operations refuse to touch system keys; reads are unrestricted.

use serde_json::Value;

use crate::error::GameError;

/// Keys no mutating path operation may traverse or target.
pub const SYSTEM_KEYS: &[&str] = &["instance_id", "template_id", "_version", "_created_at", "metadata"];

fn is_system_key(segment: &str) -> bool {
    SYSTEM_KEYS.contains(&segment)
}

fn split(path: &str) -> Result<Vec<&str>, GameError> {
    if path.is_empty() {
        return Err(GameError::MalformedInput("empty path".to_string()));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(GameError::MalformedInput(format!(
            "path '{path}' has an empty segment"
        )));
    }
    Ok(segments)
}

fn guard_mutable(path: &str, segments: &[&str]) -> Result<(), GameError> {
    if segments.iter().any(|s| is_system_key(s)) {
        return Err(GameError::InvalidStateUpdate(format!(
            "path '{path}' touches a protected key"
        )));
    }
    Ok(())
}

/// Step into one segment of a value. Arrays accept a numeric index or an
/// `instance_id` match.
fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get(index),
            Err(_) => items
                .iter()
                .find(|item| item.get("instance_id").and_then(Value::as_str) == Some(segment)),
        },
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get_mut(index),
            Err(_) => items
                .iter_mut()
                .find(|item| item.get("instance_id").and_then(Value::as_str) == Some(segment)),
        },
        _ => None,
    }
}

/// Read the value at `path`, if present.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = split(path).ok()?;
    let mut current = root;
    for segment in segments {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Set the value at `path`, creating intermediate objects as needed.
/// Missing array elements are never fabricated.
pub fn set(root: &mut Value, path: &str, new_value: Value) -> Result<(), GameError> {
    let segments = split(path)?;
    guard_mutable(path, &segments)?;

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| GameError::MalformedInput("empty path".to_string()))?;

    let mut current = root;
    for segment in parents {
        // Auto-create only under plain objects.
        if let Value::Object(map) = current {
            map.entry((*segment).to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
        }
        current = step_mut(current, segment).ok_or_else(|| {
            GameError::InvalidStateUpdate(format!("path '{path}' does not resolve at '{segment}'"))
        })?;
    }

    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), new_value);
            Ok(())
        }
        Value::Array(_) => {
            let slot = step_mut(current, last).ok_or_else(|| {
                GameError::InvalidStateUpdate(format!("path '{path}' does not resolve at '{last}'"))
            })?;
            *slot = new_value;
            Ok(())
        }
        _ => Err(GameError::InvalidStateUpdate(format!(
            "path '{path}' targets inside a scalar"
        ))),
    }
}

/// Remove the key at `path`. Returns whether anything was removed.
pub fn unset(root: &mut Value, path: &str) -> Result<bool, GameError> {
    let segments = split(path)?;
    guard_mutable(path, &segments)?;

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| GameError::MalformedInput("empty path".to_string()))?;

    let mut current = root;
    for segment in parents {
        match step_mut(current, segment) {
            Some(next) => current = next,
            None => return Ok(false),
        }
    }

    match current {
        Value::Object(map) => Ok(map.remove(*last).is_some()),
        _ => Err(GameError::InvalidStateUpdate(format!(
            "path '{path}' does not target an object key"
        ))),
    }
}

/// Append an item to the array at `path`, creating the array when the final
/// segment is missing under an object.
pub fn append(root: &mut Value, path: &str, item: Value) -> Result<(), GameError> {
    let segments = split(path)?;
    guard_mutable(path, &segments)?;

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| GameError::MalformedInput("empty path".to_string()))?;

    let mut current = root;
    for segment in parents {
        current = step_mut(current, segment).ok_or_else(|| {
            GameError::InvalidStateUpdate(format!("path '{path}' does not resolve at '{segment}'"))
        })?;
    }

    let target = match current {
        Value::Object(map) => map
            .entry((*last).to_string())
            .or_insert_with(|| Value::Array(Vec::new())),
        _ => step_mut(current, last).ok_or_else(|| {
            GameError::InvalidStateUpdate(format!("path '{path}' does not resolve at '{last}'"))
        })?,
    };

    match target {
        Value::Array(items) => {
            items.push(item);
            Ok(())
        }
        _ => Err(GameError::InvalidStateUpdate(format!(
            "path '{path}' is not an array"
        ))),
    }
}

/// Remove from the array at `path` every element whose `instance_id` (or
/// string value) equals `item_id`. Returns whether anything was removed.
pub fn remove_by_id(root: &mut Value, path: &str, item_id: &str) -> Result<bool, GameError> {
    let segments = split(path)?;
    guard_mutable(path, &segments)?;

    let mut current = root;
    for segment in &segments {
        current = step_mut(current, segment).ok_or_else(|| {
            GameError::InvalidStateUpdate(format!("path '{path}' does not resolve at '{segment}'"))
        })?;
    }

    match current {
        Value::Array(items) => {
            let before = items.len();
            items.retain(|item| {
                let id = item
                    .get("instance_id")
                    .and_then(Value::as_str)
                    .or_else(|| item.as_str());
                id != Some(item_id)
            });
            Ok(items.len() != before)
        }
        _ => Err(GameError::InvalidStateUpdate(format!(
            "path '{path}' is not an array"
        ))),
    }
}

/// The display type of a scalar leaf.
fn scalar_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::Bool(_) => Some("bool"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("float"),
        Value::String(_) => Some("string"),
        Value::Null => Some("null"),
        _ => None,
    }
}

/// Recursively discover editable scalar properties, excluding system keys.
/// Array elements carrying an `instance_id` are addressed by it; others by
/// index. Returns `(path, type)` pairs in traversal order.
pub fn editable_properties(value: &Value) -> Vec<(String, &'static str)> {
    let mut found = Vec::new();
    walk(value, String::new(), &mut found);
    found
}

fn walk(value: &Value, prefix: String, found: &mut Vec<(String, &'static str)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if is_system_key(key) {
                    continue;
                }
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match scalar_type(child) {
                    Some(kind) => found.push((path, kind)),
                    None => walk(child, path, found),
                }
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let segment = child
                    .get("instance_id")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| index.to_string());
                let path = if prefix.is_empty() {
                    segment
                } else {
                    format!("{prefix}.{segment}")
                };
                match scalar_type(child) {
                    Some(kind) => found.push((path, kind)),
                    None => walk(child, path, found),
                }
            }
        }
        _ => {}
    }
}

/// Infer a JSON scalar from admin input text: `true`/`false`, integer,
/// float, quoted string, bareword string.
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    Value::String(unquoted.unwrap_or(trimmed).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "locations": {
                "store": {
                    "areas": {
                        "main": {
                            "items": [
                                {
                                    "instance_id": "bottle_1",
                                    "template_id": "dream_bottle",
                                    "visible": true,
                                    "state": { "glowing": false }
                                }
                            ]
                        }
                    }
                }
            },
            "npcs": {
                "louisa": { "state": { "bottles_collected": 2 } }
            },
            "metadata": { "_version": 4 }
        })
    }

    #[test]
    fn test_get_by_key_index_and_instance_id() {
        let root = sample();
        assert_eq!(
            get(&root, "npcs.louisa.state.bottles_collected"),
            Some(&json!(2))
        );
        assert_eq!(
            get(&root, "locations.store.areas.main.items.0.template_id"),
            Some(&json!("dream_bottle"))
        );
        assert_eq!(
            get(&root, "locations.store.areas.main.items.bottle_1.visible"),
            Some(&json!(true))
        );
        assert!(get(&root, "npcs.missing").is_none());
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut root = sample();
        set(&mut root, "global_state.dream_bottles_found", json!(1)).expect("set");
        assert_eq!(get(&root, "global_state.dream_bottles_found"), Some(&json!(1)));

        set(
            &mut root,
            "locations.store.areas.main.items.bottle_1.visible",
            json!(false),
        )
        .expect("set through array");
        assert_eq!(
            get(&root, "locations.store.areas.main.items.bottle_1.visible"),
            Some(&json!(false))
        );
    }

    #[test]
    fn test_set_rejects_protected_keys() {
        let mut root = sample();
        for path in [
            "metadata._version",
            "npcs.louisa.instance_id",
            "locations.store.areas.main.items.bottle_1.template_id",
        ] {
            let err = set(&mut root, path, json!(9)).expect_err("protected");
            assert_eq!(err.code(), "InvalidStateUpdate");
        }
    }

    #[test]
    fn test_set_missing_array_element_fails() {
        let mut root = sample();
        let err = set(
            &mut root,
            "locations.store.areas.main.items.nope.visible",
            json!(false),
        )
        .expect_err("missing element");
        assert_eq!(err.code(), "InvalidStateUpdate");
    }

    #[test]
    fn test_append_and_remove_by_id() {
        let mut root = sample();
        append(
            &mut root,
            "locations.store.areas.main.items",
            json!({ "instance_id": "bottle_2", "template_id": "dream_bottle" }),
        )
        .expect("append");
        assert!(get(&root, "locations.store.areas.main.items.bottle_2").is_some());

        let removed = remove_by_id(&mut root, "locations.store.areas.main.items", "bottle_1")
            .expect("remove");
        assert!(removed);
        assert!(get(&root, "locations.store.areas.main.items.bottle_1").is_none());

        let removed_again =
            remove_by_id(&mut root, "locations.store.areas.main.items", "bottle_1")
                .expect("remove again");
        assert!(!removed_again);
    }

    #[test]
    fn test_append_creates_array_under_object() {
        let mut root = sample();
        append(&mut root, "npcs.louisa.state.gifts", json!("bottle_1")).expect("append");
        assert_eq!(
            get(&root, "npcs.louisa.state.gifts"),
            Some(&json!(["bottle_1"]))
        );
    }

    #[test]
    fn test_unset() {
        let mut root = sample();
        assert!(unset(&mut root, "npcs.louisa.state.bottles_collected").expect("unset"));
        assert!(!unset(&mut root, "npcs.louisa.state.bottles_collected").expect("unset again"));
        assert!(get(&root, "npcs.louisa.state.bottles_collected").is_none());
    }

    #[test]
    fn test_editable_properties_skips_system_keys() {
        let root = sample();
        let props = editable_properties(&root);
        let paths: Vec<&str> = props.iter().map(|(p, _)| p.as_str()).collect();
        assert!(paths.contains(&"locations.store.areas.main.items.bottle_1.visible"));
        assert!(paths.contains(&"locations.store.areas.main.items.bottle_1.state.glowing"));
        assert!(paths.contains(&"npcs.louisa.state.bottles_collected"));
        assert!(!paths.iter().any(|p| p.contains("instance_id")));
        assert!(!paths.iter().any(|p| p.contains("template_id")));
        assert!(!paths.iter().any(|p| p.contains("metadata")));
    }

    #[test]
    fn test_parse_scalar_inference() {
        assert_eq!(parse_scalar("true"), json!(true));
        assert_eq!(parse_scalar("false"), json!(false));
        assert_eq!(parse_scalar("42"), json!(42));
        assert_eq!(parse_scalar("-3"), json!(-3));
        assert_eq!(parse_scalar("2.5"), json!(2.5));
        assert_eq!(parse_scalar("\"quoted words\""), json!("quoted words"));
        assert_eq!(parse_scalar("'single'"), json!("single"));
        assert_eq!(parse_scalar("bareword"), json!("bareword"));
        assert_eq!(parse_scalar("null"), json!(null));
    }

    #[test]
    fn test_malformed_paths() {
        let mut root = sample();
        assert_eq!(
            set(&mut root, "", json!(1)).expect_err("empty").code(),
            "MalformedInput"
        );
        assert_eq!(
            set(&mut root, "a..b", json!(1)).expect_err("empty segment").code(),
            "MalformedInput"
        );
    }
}
