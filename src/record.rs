use std::collections::BTreeMap;

use serde_json::Value;

/// A single generated identity, keyed by normalized field name.
///
/// A `BTreeMap` keeps iteration deterministic, so CSV headers and rows always
/// agree on column order. An empty record is valid and the sink treats it as
/// a no-op.
pub type Record = BTreeMap<String, String>;

/// What the generation service answered with before normalization.
///
/// Company mode returns an HTML fragment that still needs scraping; person
/// mode returns a JSON document that is already record-shaped and bypasses
/// the parser untouched.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Markup(String),
    Structured(Record),
}

/// Flattens a structured JSON payload into a [`Record`].
///
/// The service answers person mode with a one-element array of objects, so an
/// array collapses to its first element. Keys pass through as-is, no
/// normalization on this path. String values are taken verbatim, anything
/// else keeps its JSON rendering. Non-object payloads degrade to an empty
/// record.
pub fn record_from_json(value: Value) -> Record {
    let object = match value {
        Value::Array(mut items) if !items.is_empty() => items.remove(0),
        other => other,
    };

    let mut record = Record::new();
    if let Value::Object(fields) = object {
        for (key, value) in fields {
            let rendered = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            record.insert(key, rendered);
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_object_passes_through_unchanged() {
        let record = record_from_json(json!({"nome": "Ana", "cpf": "12345678900"}));

        let mut expected = Record::new();
        expected.insert("nome".into(), "Ana".into());
        expected.insert("cpf".into(), "12345678900".into());
        assert_eq!(record, expected);
    }

    #[test]
    fn array_payload_collapses_to_first_element() {
        let record = record_from_json(json!([{"nome": "Ana"}, {"nome": "Bia"}]));
        assert_eq!(record.get("nome").map(String::as_str), Some("Ana"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn non_string_values_keep_their_json_rendering() {
        let record = record_from_json(json!({"idade": 31, "ativo": true}));
        assert_eq!(record.get("idade").map(String::as_str), Some("31"));
        assert_eq!(record.get("ativo").map(String::as_str), Some("true"));
    }

    #[test]
    fn non_object_payload_degrades_to_empty_record() {
        assert!(record_from_json(json!("texto solto")).is_empty());
        assert!(record_from_json(json!([])).is_empty());
    }
}
