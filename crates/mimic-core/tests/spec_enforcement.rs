//! Spec restrictions: allow-lists, class and instance shapes, autospec.

mod common;

use common::some_class;
use mimic_core::{call, Error, Mock, Signature, Spec, SpecMode, Value};
use mimic_test_harness::assertions::{assert_eq, assert_matches, assert_ne};
use mimic_test_harness::{assert_attribute_error, assert_signature_mismatch};
use test_case::test_case;

#[test]
fn test_spec_list() {
    let mock = Mock::builder()
        .spec(Spec::names(["attr_1", "attr_2"]))
        .build()
        .unwrap();
    assert!(mock.attr("attr_1").unwrap().call(call!()).unwrap().is_mock());
    assert!(mock.attr("attr_2").unwrap().call(call!()).unwrap().is_mock());
    assert_attribute_error!(mock.get_or_create_child("attr_3"), "attr_3");

    mock.set("attr_4", "hoge");
    assert_eq!(mock.get("attr_4").unwrap(), Value::from("hoge"));
}

#[test]
fn test_spec_class() {
    let mock = Mock::builder()
        .spec(Spec::class(some_class()))
        .build()
        .unwrap();
    assert_eq!(mock.spec_class().as_deref(), Some("SomeClass"));
    assert!(mock.is_instance_of("SomeClass"));

    let method_1 = mock.attr("method_1").unwrap();
    assert_ne!(
        method_1.call(call!()).unwrap(),
        Value::from("SomeClass.method_1")
    );
    let method_2 = mock.attr("method_2").unwrap();
    assert_ne!(method_2.call(call!(1, 2)).unwrap(), Value::from(3));
    // A plain spec does not check method signatures.
    assert!(method_2.call(call!()).unwrap().is_mock());
    assert!(mock.attr("method_3").unwrap().call(call!()).unwrap().is_mock());

    assert_attribute_error!(mock.get_or_create_child("method_4"), "method_4");
    // `title` is only set on instances.
    assert_attribute_error!(mock.get_or_create_child("title"), "title");
}

#[test]
fn test_spec_object() {
    let mock = Mock::builder()
        .spec(Spec::instance(some_class()))
        .build()
        .unwrap();
    assert!(mock.is_instance_of("SomeClass"));

    let title = mock.get("title").unwrap();
    assert_ne!(title, Value::from("John Wick"));
    assert!(title.is_mock());
    assert!(mock.attr("method_1").unwrap().call(call!()).unwrap().is_mock());
    assert!(mock.attr("method_2").unwrap().call(call!()).unwrap().is_mock());
    assert_attribute_error!(mock.get_or_create_child("method_4"), "method_4");
}

#[test]
fn test_class_spec_checks_constructor() {
    let mock = Mock::builder()
        .spec(Spec::class(some_class()))
        .build()
        .unwrap();
    assert!(mock.call(call!("John Wick")).is_ok());
    assert_signature_mismatch!(mock.call(call!()));
    // Rejected calls are not recorded.
    assert_eq!(mock.call_count(), 1);
}

#[test_case(call!(1, 2) ; "positional")]
#[test_case(call!(1; arg2 = 2) ; "mixed")]
#[test_case(call!(; arg2 = 2, arg1 = 1) ; "keywords")]
fn test_autospec_accepts_matching_calls(args: mimic_core::Call) {
    let mock = Mock::builder()
        .autospec(Spec::class(some_class()))
        .build()
        .unwrap();
    assert!(mock.attr("method_2").unwrap().call(args).unwrap().is_mock());
}

#[test_case(call!() ; "missing both")]
#[test_case(call!("hoge") ; "missing one")]
#[test_case(call!(1, 2, 3) ; "too many")]
#[test_case(call!(1, 2; arg3 = 3) ; "unknown keyword")]
fn test_autospec_rejects_mismatched_calls(args: mimic_core::Call) {
    let mock = Mock::builder()
        .autospec(Spec::class(some_class()))
        .build()
        .unwrap();
    assert_signature_mismatch!(mock.attr("method_2").unwrap().call(args));
}

#[test]
fn test_autospec_return_value_is_an_instance() {
    let mock = Mock::builder()
        .autospec(Spec::class(some_class()))
        .build()
        .unwrap();
    let instance = mock.call(call!("John Wick")).unwrap().into_mock().unwrap();
    assert!(instance.is_instance_of("SomeClass"));
    assert!(instance.get("title").unwrap().is_mock());
    assert_signature_mismatch!(instance.attr("method_1").unwrap().call(call!(1)));
}

#[test]
fn test_signature_mismatch_message() {
    let mock = Mock::builder()
        .name("get")
        .spec(Spec::callable("get", Signature::new().param("url")))
        .build()
        .unwrap();
    let err = mock.call(call!()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"signature mismatch calling 'get': missing a required argument: 'url'");
}

#[test]
fn test_apply_spec_after_construction() {
    let mock = Mock::new();
    mock.apply_spec(Spec::names(["allowed"]), SpecMode::Shallow);
    assert!(mock.get_or_create_child("allowed").is_ok());
    assert_matches!(
        mock.get_or_create_child("other"),
        Err(Error::AttributeNotFound { .. })
    );
}

#[test]
fn test_spec_members_may_look_like_assertions() {
    let mock = Mock::builder()
        .spec(Spec::names(["assert_valid"]))
        .build()
        .unwrap();
    assert!(mock.get_or_create_child("assert_valid").is_ok());
}
