//! Raw records as returned by the remote store
//!
//! Values keep the ORM's JSON shape: a many2one is `[id, "display name"]` or
//! `false`, an x2many is a list of ids, an unset scalar is `false`.

use crate::ids::RecordId;
use serde_json::Value;

/// One fetched row, field name to raw value
pub type Record = serde_json::Map<String, Value>;

/// Id part of a many2one value
#[must_use]
pub fn many2one_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Array(pair) => pair.first().and_then(Value::as_i64).map(RecordId),
        Value::Number(n) => n.as_i64().map(RecordId),
        _ => None,
    }
}

/// Display part of a many2one value
#[must_use]
pub fn many2one_display(value: &Value) -> Option<&str> {
    match value {
        Value::Array(pair) => pair.get(1).and_then(Value::as_str),
        _ => None,
    }
}

/// Ids of an x2many value; anything else yields no ids
#[must_use]
pub fn x2many_ids(value: &Value) -> Vec<RecordId> {
    match value {
        Value::Array(ids) => ids.iter().filter_map(Value::as_i64).map(RecordId).collect(),
        _ => Vec::new(),
    }
}

/// JavaScript-like truthiness, the ORM encodes "unset" as `false`
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn many2one_parts() {
        let value = json!([3, "De Bruyne"]);
        assert_eq!(many2one_id(&value), Some(RecordId(3)));
        assert_eq!(many2one_display(&value), Some("De Bruyne"));
        assert_eq!(many2one_id(&json!(false)), None);
        assert_eq!(many2one_display(&json!(false)), None);
    }

    #[test]
    fn x2many_ignores_non_ids() {
        assert_eq!(x2many_ids(&json!([1, 2])), vec![RecordId(1), RecordId(2)]);
        assert!(x2many_ids(&json!(false)).is_empty());
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
    }
}
