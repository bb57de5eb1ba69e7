//! JSON persistence for scenarios.
//!
//! A scenario file is an array of `{"offsetNanoseconds": u64, "payload": any}`
//! records in generation order. Payloads are not interpreted.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Sample, Scenario};
use crate::error::StoreError;

pub fn to_bytes<P: Serialize>(scenario: &Scenario<P>) -> Result<Vec<u8>, StoreError> {
    sonic_rs::to_vec(scenario).map_err(StoreError::Serialize)
}

pub fn from_bytes<P: DeserializeOwned>(bytes: &[u8]) -> Result<Scenario<P>, StoreError> {
    let samples: Option<Vec<Sample<P>>> =
        sonic_rs::from_slice(bytes).map_err(StoreError::Parse)?;
    samples.map(Scenario::from).ok_or(StoreError::NullScenario)
}

pub fn save<P: Serialize>(scenario: &Scenario<P>, path: impl AsRef<Path>) -> Result<(), StoreError> {
    let data = to_bytes(scenario)?;
    std::fs::write(path, data)?;
    Ok(())
}

pub fn load<P: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Scenario<P>, StoreError> {
    let data = std::fs::read(path)?;
    from_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Payload;
    use serde::Deserialize;
    use sonic_rs::JsonValueTrait;
    use std::time::Duration;

    #[test]
    fn structured_payloads_survive_round_trip() {
        let scenario: Scenario = vec![
            Sample::new(Duration::from_nanos(0), Payload::default()),
            Sample::new(Duration::from_nanos(17), sonic_rs::json!(1)),
            Sample::new(Duration::from_nanos(999_999_999), sonic_rs::json!(-2.5)),
            Sample::new(Duration::new(1, 3), sonic_rs::json!("text")),
            Sample::new(Duration::new(1, 4), sonic_rs::json!(true)),
            Sample::new(
                Duration::new(2, 0),
                sonic_rs::json!({"user": {"id": 9, "tags": ["a", "b"]}, "ok": false}),
            ),
            Sample::new(Duration::new(2, 1), sonic_rs::json!([1, "two", null])),
        ]
        .into();

        let bytes = to_bytes(&scenario).unwrap();
        let loaded: Scenario<Payload> = from_bytes(&bytes).unwrap();
        assert_eq!(loaded, scenario);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        sku: String,
        quantity: u32,
    }

    #[test]
    fn typed_payloads_survive_round_trip() {
        let scenario: Scenario<Order> = vec![Sample::new(
            Duration::from_millis(250),
            Order {
                sku: "A-1".into(),
                quantity: 3,
            },
        )]
        .into();

        let loaded: Scenario<Order> = from_bytes(&to_bytes(&scenario).unwrap()).unwrap();
        assert_eq!(loaded, scenario);
    }

    #[test]
    fn null_payload_survives_round_trip() {
        let scenario: Scenario = vec![
            Sample::new(Duration::from_nanos(1), sonic_rs::json!(null)),
            Sample::new(Duration::from_nanos(2), sonic_rs::json!({"v": null})),
        ]
        .into();

        let loaded: Scenario = from_bytes(&to_bytes(&scenario).unwrap()).unwrap();
        assert_eq!(loaded, scenario);
        assert!(loaded.samples()[0].payload.is_null());
    }

    #[test]
    fn typed_payload_without_default_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.tsc");
        std::fs::write(
            &path,
            r#"[{"offsetNanoseconds":5,"payload":{"sku":"B-2","quantity":1}}]"#,
        )
        .unwrap();

        let loaded: Scenario<Order> = load(&path).unwrap();
        assert_eq!(
            loaded.samples()[0].payload,
            Order {
                sku: "B-2".into(),
                quantity: 1,
            }
        );
    }

    #[test]
    fn record_without_payload_key_loads_for_optional_payloads() {
        let loaded: Scenario<Option<Order>> =
            from_bytes(br#"[{"offsetNanoseconds":5}]"#).unwrap();
        assert_eq!(loaded.samples()[0].payload, None);
    }

    #[test]
    fn null_document_is_rejected() {
        let result: Result<Scenario, _> = from_bytes(b"null");
        assert!(matches!(result, Err(StoreError::NullScenario)));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let result: Result<Scenario, _> = from_bytes(br#"[{"offsetNanoseconds": "soon"}]"#);
        assert!(matches!(result, Err(StoreError::Parse(_))));

        let result: Result<Scenario, _> = from_bytes(b"[{");
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }

    #[test]
    fn empty_array_loads_as_empty_scenario() {
        let scenario: Scenario = from_bytes(b"[]").unwrap();
        assert!(scenario.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Scenario, _> = load(dir.path().join("absent.tsc"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.tsc");
        let scenario: Scenario = vec![
            Sample::new(Duration::from_millis(5), sonic_rs::json!("first")),
            Sample::new(Duration::from_millis(6), sonic_rs::json!("second")),
        ]
        .into();

        save(&scenario, &path).unwrap();
        let loaded: Scenario = load(&path).unwrap();
        assert_eq!(loaded, scenario);
    }
}
