//! Conversions from raw JSON values into model types.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use sc_core::Value;
use serde_json::{Map, Value as Json};

use crate::error::{LoadError, LoadResult};

/// Read an identifier token. Ids have been both strings and integers across
/// document versions, so numbers are accepted and stringified.
pub fn token(value: Option<&Json>) -> Option<String> {
    match value? {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert a JSON object into item values, key by key.
///
/// Strings, integers, floats and booleans pass through; objects are kept as
/// opaque nested maps. Anything else is logged and dropped.
pub fn values(map: &Map<String, Json>, owner: &str) -> HashMap<String, Value> {
    let mut result = HashMap::with_capacity(map.len());
    for (key, value) in map {
        let converted = match value {
            Json::String(s) => Value::String(s.clone()),
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => match n.as_f64() {
                    Some(f) => Value::Float(f),
                    None => {
                        log::warn!("{owner}: value \"{key}\" is not representable, dropped");
                        continue;
                    }
                },
            },
            Json::Object(obj) => Value::Object(obj.clone()),
            Json::Null | Json::Array(_) => {
                log::warn!(
                    "{owner}: value \"{key}\" has unsupported kind {}, dropped",
                    kind_name(value)
                );
                continue;
            }
        };
        result.insert(key.clone(), converted);
    }
    result
}

/// Convert an optional `values` field that should be an object.
pub fn optional_values(value: Option<&Json>, owner: &str) -> HashMap<String, Value> {
    match value {
        Some(Json::Object(map)) => values(map, owner),
        None | Some(Json::Null) => HashMap::new(),
        Some(other) => {
            log::warn!(
                "{owner}: \"values\" should be an object, found {}",
                kind_name(other)
            );
            HashMap::new()
        }
    }
}

/// Read a 3-component vector array. Missing or null yields `default`.
pub fn vec3(value: Option<&Json>, field: &'static str, owner: &str, default: Vec3) -> LoadResult<Vec3> {
    match components::<3>(value, field, owner)? {
        Some([x, y, z]) => Ok(Vec3::new(x, y, z)),
        None => Ok(default),
    }
}

/// Read a 4-component quaternion array (x, y, z, w). Missing or null yields
/// the identity rotation.
pub fn quat(value: Option<&Json>, field: &'static str, owner: &str) -> LoadResult<Quat> {
    match components::<4>(value, field, owner)? {
        Some([x, y, z, w]) => Ok(Quat::from_xyzw(x, y, z, w)),
        None => Ok(Quat::IDENTITY),
    }
}

fn components<const N: usize>(
    value: Option<&Json>,
    field: &'static str,
    owner: &str,
) -> LoadResult<Option<[f32; N]>> {
    let array = match value {
        None | Some(Json::Null) => return Ok(None),
        Some(Json::Array(array)) => array,
        Some(other) => {
            return Err(malformed(
                owner,
                field,
                format!("expected an array, found {}", kind_name(other)),
            ));
        }
    };
    if array.len() != N {
        return Err(malformed(
            owner,
            field,
            format!("expected {N} components, found {}", array.len()),
        ));
    }
    let mut out = [0.0_f32; N];
    for (slot, component) in out.iter_mut().zip(array) {
        *slot = component
            .as_f64()
            .ok_or_else(|| malformed(owner, field, format!("non-numeric component {component}")))?
            as f32;
    }
    Ok(Some(out))
}

/// Read a scalar that may be authored as a number or a numeric string.
pub fn scalar(value: Option<&Json>, field: &'static str, owner: &str, default: f32) -> LoadResult<f32> {
    match value {
        None | Some(Json::Null) => Ok(default),
        Some(Json::Number(n)) => n
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| malformed(owner, field, format!("unrepresentable number {n}"))),
        Some(Json::String(s)) => s
            .trim()
            .parse::<f32>()
            .map_err(|_| malformed(owner, field, format!("\"{s}\" is not a number"))),
        Some(other) => Err(malformed(
            owner,
            field,
            format!("expected a number, found {}", kind_name(other)),
        )),
    }
}

/// Render an attribute or property value as the authored text.
pub fn text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn malformed(owner: &str, field: &'static str, reason: String) -> LoadError {
    LoadError::MalformedTransform {
        owner: owner.to_string(),
        field,
        reason,
    }
}

fn kind_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_accepts_strings_and_integers() {
        assert_eq!(token(Some(&json!("M1"))).as_deref(), Some("M1"));
        assert_eq!(token(Some(&json!(42))).as_deref(), Some("42"));
        assert_eq!(token(Some(&json!(null))), None);
        assert_eq!(token(None), None);
    }

    #[test]
    fn values_keep_supported_kinds_and_drop_the_rest() {
        let doc = json!({
            "label": "door",
            "count": 3,
            "weight": 1.5,
            "locked": true,
            "descriptor": { "role": "guard" },
            "tags": ["a", "b"],
            "nothing": null
        });
        let converted = values(doc.as_object().unwrap(), "item i1");
        assert_eq!(converted.len(), 5);
        assert_eq!(converted["count"], Value::Int(3));
        assert_eq!(converted["weight"], Value::Float(1.5));
        assert!(converted["descriptor"].as_object().is_ok());
        assert!(!converted.contains_key("tags"));
        assert!(!converted.contains_key("nothing"));
    }

    #[test]
    fn vectors_require_exact_arity() {
        let ok = vec3(Some(&json!([1, 2, 3])), "position", "i1", Vec3::ZERO).unwrap();
        assert_eq!(ok, Vec3::new(1.0, 2.0, 3.0));

        let err = vec3(Some(&json!([1, 2])), "position", "i1", Vec3::ZERO).unwrap_err();
        assert!(err.to_string().contains("expected 3 components"));

        let err = quat(Some(&json!([0, 0, 0, "w"])), "rotation", "i1").unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn missing_arrays_fall_back_to_identity() {
        assert_eq!(vec3(None, "scale", "i1", Vec3::ONE).unwrap(), Vec3::ONE);
        assert_eq!(quat(Some(&json!(null)), "rotation", "i1").unwrap(), Quat::IDENTITY);
    }

    #[test]
    fn scalars_accept_numeric_strings() {
        assert_eq!(scalar(Some(&json!("2.5")), "tx", "Room", 0.0).unwrap(), 2.5);
        assert_eq!(scalar(None, "rw", "Room", 1.0).unwrap(), 1.0);
        assert!(scalar(Some(&json!("abc")), "tx", "Room", 0.0).is_err());
    }
}
