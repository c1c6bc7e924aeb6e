//! Scoped substitution of module attributes.

mod common;

use std::panic::{self, AssertUnwindSafe};

use common::{get_weather_reports, install, REGISTRY};
use mimic_core::{
    call, patch, patch_object, Error, Exception, Flavor, Mock, MockConfig, Module, Value,
};
use mimic_test_harness::assertions::{assert_eq, assert_matches, assert_ne, verify};
use mimic_test_harness::{acquire_resource_lock, assert_raises, init};
use serde_json::json;

fn weather() -> serde_json::Value {
    json!({"Tuesday": "rainy", "Wednesday": "snowy", "Thursday": "rainy"})
}

#[test]
fn test_get_weather_reports_200() {
    init();
    let _lock = acquire_resource_lock(REGISTRY);
    install();

    patch("sample.requests")
        .unwrap()
        .run(|mock_requests| {
            let mock_response = Mock::builder()
                .configure(
                    MockConfig::new()
                        .set("json.return_value", weather())
                        .set("status_code", 200),
                )
                .build()
                .unwrap();
            mock_requests
                .attr("get")
                .unwrap()
                .set_return_value(&mock_response);

            assert_eq!(get_weather_reports().unwrap(), Some(Value::from(weather())));
            verify(mock_requests.attr("get").unwrap().assert_called_once());
            verify(mock_response.attr("json").unwrap().assert_called_once());
        })
        .unwrap();
}

#[test]
fn test_get_weather_reports_not_found() {
    let _lock = acquire_resource_lock(REGISTRY);
    install();

    let guard = patch("sample.requests").unwrap().start().unwrap();
    let requests = guard.mock().unwrap();
    requests
        .attr("get")
        .unwrap()
        .return_mock()
        .unwrap()
        .set("status_code", 404);

    assert_eq!(get_weather_reports().unwrap(), None);
    verify(
        requests
            .attr("get")
            .unwrap()
            .assert_called_once_with(&call!("http://example.com//weather_reports")),
    );
}

#[test]
fn test_get_weather_reports_timeout() {
    let _lock = acquire_resource_lock(REGISTRY);
    install();

    patch("sample.requests")
        .unwrap()
        .run(|mock_requests| {
            let get = mock_requests.attr("get").unwrap();
            get.set_side_effect(Exception::new("Timeout"));
            assert_raises!(get_weather_reports(), "Timeout");
            verify(get.assert_called_once());
        })
        .unwrap();
}

#[test]
fn test_patch_returns_magic_mock() {
    let _lock = acquire_resource_lock(REGISTRY);
    install();

    patch("sample.requests")
        .unwrap()
        .run(|mock_requests| {
            assert!(mock_requests.is_instance_of("MagicMock"));
            assert_eq!(mock_requests.flavor(), Flavor::Magic);
            assert_eq!(mock_requests.len().unwrap(), 0);
        })
        .unwrap();
}

#[test]
fn test_patch_as_scoped_guard() {
    let _lock = acquire_resource_lock(REGISTRY);
    let (_, sample) = install();
    let original = sample.get("requests").unwrap();

    {
        let guard = patch("sample.requests").unwrap().start().unwrap();
        guard
            .mock()
            .unwrap()
            .attr("get")
            .unwrap()
            .set_side_effect(Exception::new("Timeout"));
        assert_raises!(get_weather_reports(), "Timeout");
        assert_ne!(sample.get("requests").unwrap(), original);
    }

    assert_eq!(sample.get("requests").unwrap(), original);
    assert_raises!(get_weather_reports(), "ConnectionError");
}

#[test]
fn test_patch_object() {
    let _lock = acquire_resource_lock(REGISTRY);
    let (requests, _) = install();

    patch_object(&requests, "get")
        .side_effect(Exception::new("Timeout"))
        .run(|_| {
            assert_raises!(get_weather_reports(), "Timeout");
        })
        .unwrap();
    assert_raises!(get_weather_reports(), "ConnectionError");
}

#[test]
fn test_patch_object_guard() {
    let _lock = acquire_resource_lock(REGISTRY);
    let (requests, _) = install();

    let guard = patch_object(&requests, "get")
        .side_effect(Exception::new("Timeout"))
        .start()
        .unwrap();
    assert_raises!(get_weather_reports(), "Timeout");
    guard.stop();
    assert_raises!(get_weather_reports(), "ConnectionError");
}

#[test]
fn test_patch_restored_after_error_exit() {
    let _lock = acquire_resource_lock(REGISTRY);
    let (_, sample) = install();
    let original = sample.get("requests").unwrap();

    fn failing() -> mimic_core::Result<()> {
        let guard = patch("sample.requests")?
            .side_effect(Exception::new("Boom"))
            .start()?;
        guard.value().invoke(call!())?;
        Ok(())
    }

    assert_raises!(failing(), "Boom");
    assert_eq!(sample.get("requests").unwrap(), original);
}

#[test]
fn test_patch_restored_after_panic() {
    let _lock = acquire_resource_lock(REGISTRY);
    let (_, sample) = install();
    let original = sample.get("requests").unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        patch("sample.requests")
            .unwrap()
            .run(|_| panic!("test body failed"))
            .unwrap();
    }));

    assert!(outcome.is_err());
    assert_eq!(sample.get("requests").unwrap(), original);
}

#[test]
fn test_autospec_patch_checks_signatures() {
    let _lock = acquire_resource_lock(REGISTRY);
    install();

    patch("sample.Sample")
        .unwrap()
        .autospec()
        .run(|mock| {
            assert_eq!(mock.spec_class().as_deref(), Some("Sample"));
            assert!(mock.is_instance_of("Sample"));
            let hoge = mock.attr("hoge").unwrap();
            assert!(hoge.call(call!(1, 2)).unwrap().is_mock());
            assert_matches!(hoge.call(call!("hoge")), Err(Error::SignatureMismatch { .. }));
            assert_matches!(
                mock.get_or_create_child("some_method"),
                Err(Error::AttributeNotFound { .. })
            );
        })
        .unwrap();
}

#[test]
fn test_autospec_of_function() {
    let _lock = acquire_resource_lock(REGISTRY);
    install();

    patch("requests.get")
        .unwrap()
        .autospec()
        .return_value("response")
        .run(|get| {
            assert_matches!(get.call(call!()), Err(Error::SignatureMismatch { .. }));
            assert_eq!(get.call(call!("url"; timeout = 3)).unwrap(), Value::from("response"));
        })
        .unwrap();
}

#[test]
fn test_new_value_replacement() {
    let _lock = acquire_resource_lock(REGISTRY);
    let (_, sample) = install();

    let guard = patch("sample.ENDPOINT")
        .unwrap()
        .new_value("http://localhost/")
        .start()
        .unwrap();
    assert!(guard.mock().is_none());
    assert_eq!(sample.get("ENDPOINT").unwrap(), Value::from("http://localhost/"));

    let err = patch("sample.ENDPOINT")
        .unwrap()
        .new_value(1)
        .run(|_| ())
        .unwrap_err();
    assert_matches!(err, Error::PatchTarget { .. });
    drop(guard);
    assert_eq!(sample.get("ENDPOINT").unwrap(), Value::from(common::ENDPOINT));
}

#[test]
fn test_missing_attribute_needs_create() {
    let _lock = acquire_resource_lock(REGISTRY);
    let (_, sample) = install();

    let err = patch("sample.missing").unwrap().start().unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot patch 'sample.missing': module 'sample' does not have the attribute 'missing'"
    );

    patch("sample.missing")
        .unwrap()
        .create(true)
        .run(|_| assert!(sample.contains("missing")))
        .unwrap();
    assert!(!sample.contains("missing"));
}

#[test]
fn test_unknown_module() {
    let err = patch("not_registered.attr").unwrap_err();
    assert_matches!(err, Error::PatchTarget { .. });
    assert_matches!(
        Module::import("not_registered"),
        Err(Error::ModuleNotFound { .. })
    );
}
