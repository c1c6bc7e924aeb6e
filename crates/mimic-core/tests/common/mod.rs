//! Shared fixtures: a tiny application that talks to a `requests` module
//! through the `sample` module, plus class descriptions used by spec tests.

#![allow(dead_code)]

use mimic_core::{
    call, ClassSpec, Error, Exception, Function, Module, Object, Result, Signature, Spec, Value,
};

pub const ENDPOINT: &str = "http://example.com/";

/// Name of the lock every test touching the module registry holds.
pub const REGISTRY: &str = "mimic-module-registry";

/// A class object stored in a module, usable as an autospec source.
#[derive(Debug)]
pub struct ClassObject {
    class: ClassSpec,
}

impl ClassObject {
    pub fn new(class: ClassSpec) -> Self {
        Self { class }
    }
}

impl Object for ClassObject {
    fn type_name(&self) -> &str {
        self.class.name()
    }

    fn get_attr(&self, name: &str) -> Result<Value> {
        Err(Error::AttributeNotFound {
            owner: self.class.name().to_string(),
            attribute: name.to_string(),
        })
    }

    fn spec(&self) -> Option<Spec> {
        Some(Spec::class(self.class.clone()))
    }
}

pub fn sample_class() -> ClassSpec {
    ClassSpec::new("Sample").method("hoge", Signature::new().param("arg1").param("arg2"))
}

pub fn some_class() -> ClassSpec {
    ClassSpec::new("SomeClass")
        .constructor(Signature::new().param("title"))
        .method("method_1", Signature::new())
        .method("method_2", Signature::new().param("arg1").param("arg2"))
        .method("method_3", Signature::new())
        .instance_attribute("title")
}

/// (Re)install the `requests` and `sample` modules with their real contents.
///
/// The real `requests.get` cannot reach the network and always raises.
pub fn install() -> (Module, Module) {
    let requests = Module::register("requests");
    requests.set(
        "get",
        Value::object(Function::new(
            "get",
            Signature::new().param("url").var_kwargs("kwargs"),
            |call| {
                let url = call.arg_at(0).map(Value::to_string).unwrap_or_default();
                Err(Exception::new("ConnectionError")
                    .with_message(format!("cannot reach {}", url))
                    .into())
            },
        )),
    );

    let sample = Module::register("sample");
    sample.set("requests", Value::object(requests.clone()));
    sample.set("ENDPOINT", ENDPOINT);
    sample.set("Sample", Value::object(ClassObject::new(sample_class())));
    (requests, sample)
}

/// Application code under test: fetch the weather reports through
/// `sample.requests`, returning the decoded body on HTTP 200.
pub fn get_weather_reports() -> Result<Option<Value>> {
    let requests = Module::import("sample")?.get("requests")?;
    let response = requests
        .attr("get")?
        .invoke(call!(format!("{}/weather_reports", ENDPOINT)))?;
    if response.attr("status_code")? == Value::from(200) {
        return response.attr("json")?.invoke(call!()).map(Some);
    }
    Ok(None)
}
