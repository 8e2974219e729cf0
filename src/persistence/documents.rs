//! Versioned JSON sub-documents.
//!
//! Conditions, selections, provider settings and charge snapshots are stored
//! as JSONB inside a `{"schema_version": N, "data": ...}` envelope. They are
//! decoded once when a row is loaded; nothing downstream sees raw JSON.
//! Rows written before the envelope existed hold the bare document and are
//! read as version 1.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    schema_version: u32,
    data: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored<T> {
    Enveloped(Envelope<T>),
    Bare(T),
}

/// Wraps `doc` in the current envelope.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if `doc` cannot be serialized.
pub fn encode<T: Serialize>(doc: &T) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(EnvelopeRef {
        schema_version: CURRENT_SCHEMA_VERSION,
        data: doc,
    })
    .map_err(|e| GatewayError::Internal(format!("document encode failed: {e}")))
}

/// Decodes an enveloped or legacy bare document.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] for unknown schema versions
/// or documents that do not match `T`.
pub fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, GatewayError> {
    let stored: Stored<T> = serde_json::from_value(value)
        .map_err(|e| GatewayError::PersistenceError(format!("corrupt document: {e}")))?;
    match stored {
        Stored::Enveloped(Envelope {
            schema_version: 1,
            data,
        })
        | Stored::Bare(data) => Ok(data),
        Stored::Enveloped(Envelope { schema_version, .. }) => Err(GatewayError::PersistenceError(
            format!("unsupported document schema version {schema_version}"),
        )),
    }
}

/// Decodes an optional document column.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_opt<T: DeserializeOwned>(
    value: Option<serde_json::Value>,
) -> Result<Option<T>, GatewayError> {
    value
        .filter(|v| !v.is_null())
        .map(decode)
        .transpose()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Condition, ConditionKind, Selection, Selections};

    #[test]
    fn envelope_round_trip() {
        let selections = Selections::new().with("size", Selection::One("b".to_string()));
        let Ok(value) = encode(&selections) else {
            panic!("encode failed");
        };
        assert_eq!(
            value.get("schema_version").and_then(serde_json::Value::as_u64),
            Some(1)
        );
        let decoded: Result<Selections, _> = decode(value);
        assert_eq!(decoded.ok(), Some(selections));
    }

    #[test]
    fn legacy_bare_conditions_are_version_one() {
        let bare = serde_json::json!([
            {"id": "c1", "label": "Meal", "type": "checkbox", "options": []}
        ]);
        let decoded: Result<Vec<Condition>, _> = decode(bare);
        let Ok(conditions) = decoded else {
            panic!("bare document should decode");
        };
        assert_eq!(conditions.first().map(|c| c.kind), Some(ConditionKind::Multi));
    }

    #[test]
    fn future_versions_are_rejected() {
        let value = serde_json::json!({"schema_version": 2, "data": {}});
        let decoded: Result<Selections, _> = decode(value);
        assert!(matches!(decoded, Err(GatewayError::PersistenceError(_))));
    }

    #[test]
    fn null_optional_column_is_none() {
        let decoded: Result<Option<Selections>, _> = decode_opt(Some(serde_json::Value::Null));
        assert!(matches!(decoded, Ok(None)));
    }
}
