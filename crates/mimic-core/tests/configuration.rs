//! Mock configuration loaded from YAML fixtures.

use mimic_core::{call, Error, Mock, MockConfig, Value};
use mimic_test_harness::assertions::{assert_eq, assert_matches};
use mimic_test_harness::assert_raises;
use mimic_test_harness::fixtures::{load_fixture, load_mock_config};
use serde_json::json;
use test_case::test_case;

#[test]
fn test_response_fixture() {
    let config = load_mock_config("weather_response.yaml");
    assert_eq!(config.len(), 3);

    let response = Mock::builder().configure(config).build().unwrap();
    assert_eq!(response.get("status_code").unwrap(), Value::from(200));
    assert_eq!(
        response.attr("json").unwrap().call(call!()).unwrap(),
        Value::from(json!({"Tuesday": "rainy", "Wednesday": "snowy", "Thursday": "rainy"}))
    );

    let get = response.attr("headers.get").unwrap();
    assert_eq!(
        get.call(call!("Content-Type")).unwrap(),
        Value::from("application/json")
    );
    let err = get.call(call!("X-Missing")).unwrap_err();
    assert!(err.is_raised("KeyError"));
    assert_eq!(err.to_string(), "KeyError: missing header");
    assert_matches!(get.call(call!()), Err(Error::SideEffectExhausted { .. }));
}

#[test]
fn test_step_sequence_fixture() {
    let client = Mock::builder()
        .configure(load_mock_config("flaky_client.yaml"))
        .build()
        .unwrap();
    let request = client.attr("request").unwrap();

    assert_raises!(request.call(call!("GET")), "Timeout");
    assert_eq!(request.call(call!("GET")).unwrap(), request.return_value());
    assert_eq!(request.call(call!("GET")).unwrap(), Value::from("done"));
    assert!(client.attr("close").unwrap().call(call!()).unwrap().is_none());
    assert_eq!(request.call_count(), 3);
}

#[test]
fn test_invalid_side_effect_is_rejected() {
    let source = load_fixture("invalid_side_effect.yaml");
    let err = MockConfig::from_yaml_str(&source).unwrap_err();
    assert_matches!(err, Error::InvalidConfig(_));
    assert!(err.to_string().contains("method.side_effect"));
}

#[test]
fn test_side_effect_key_mismatch() {
    let mock = Mock::new();
    let err = mock
        .configure_mock(&MockConfig::new().set("method.side_effect", 1))
        .unwrap_err();
    assert_matches!(err, Error::InvalidConfig(_));

    let err = mock
        .configure_mock(&MockConfig::new().clear_side_effect("method.return_value"))
        .unwrap_err();
    assert_matches!(err, Error::InvalidConfig(_));
}

#[test_case("method." ; "trailing")]
#[test_case("a..return_value" ; "inner")]
#[test_case("a.b." ; "nested trailing")]
#[test_case(".a" ; "leading")]
fn test_empty_segment_is_rejected(key: &str) {
    let err = Mock::builder()
        .configure(MockConfig::new().set(key, 1))
        .build()
        .unwrap_err();
    assert_matches!(err, Error::InvalidConfig(_));
}

#[test]
fn test_rejected_config_leaves_mock_untouched() {
    let mock = Mock::new();
    let config = MockConfig::new()
        .set("status_code", 200)
        .set("a..return_value", 1);
    assert_matches!(mock.configure_mock(&config), Err(Error::InvalidConfig(_)));
    assert!(mock.get("status_code").unwrap().is_mock());
}

#[test]
fn test_magic_methods_are_configurable() {
    let config = MockConfig::from_yaml_str("__len__.return_value: 3\n__iter__.return_value: [1, 2, 3]\n")
        .unwrap();
    let mock = Mock::builder().magic().configure(config).build().unwrap();
    assert_eq!(mock.len().unwrap(), 3);
    assert_eq!(
        mock.iterate().unwrap(),
        vec![Value::from(1), Value::from(2), Value::from(3)]
    );
}
