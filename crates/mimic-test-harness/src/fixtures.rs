//! Test fixture loading.

use std::path::{Path, PathBuf};

use mimic_core::MockConfig;
use serde::de::DeserializeOwned;

/// Get the fixtures directory of the crate under test.
pub fn fixtures_dir() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());

    let candidates = [
        PathBuf::from(&manifest_dir).join("tests/fixtures"),
        PathBuf::from(&manifest_dir).join("../tests/fixtures"),
        PathBuf::from("tests/fixtures"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return candidate.clone();
        }
    }

    candidates[0].clone()
}

/// Load a fixture as a string.
pub fn load_fixture(path: impl AsRef<Path>) -> String {
    let full_path = fixtures_dir().join(path.as_ref());
    std::fs::read_to_string(&full_path)
        .unwrap_or_else(|e| panic!("Failed to load fixture {:?}: {}", full_path, e))
}

/// Load a YAML fixture and deserialize.
pub fn load_yaml_fixture<T: DeserializeOwned>(path: impl AsRef<Path>) -> T {
    let content = load_fixture(path.as_ref());
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse YAML fixture {:?}: {}", path.as_ref(), e))
}

/// Load a JSON fixture and deserialize.
pub fn load_json_fixture<T: DeserializeOwned>(path: impl AsRef<Path>) -> T {
    let content = load_fixture(path.as_ref());
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse JSON fixture {:?}: {}", path.as_ref(), e))
}

/// Load a dotted-key mock configuration from a YAML fixture.
pub fn load_mock_config(path: impl AsRef<Path>) -> MockConfig {
    let content = load_fixture(path.as_ref());
    MockConfig::from_yaml_str(&content)
        .unwrap_or_else(|e| panic!("Invalid mock config fixture {:?}: {}", path.as_ref(), e))
}
