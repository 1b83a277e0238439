//! # Parameter Bundle Loading
//!
//! The exclusive entry point for coefficient bundles. A bundle is a JSON
//! document read from a named logical location: either one of the bundles
//! compiled into the crate, or a file inside a directory on disk. No schema is
//! enforced here beyond "valid JSON"; each calculator decodes the document into
//! its own typed schema with [`decode`] / [`load_typed`].

use crate::error::RiskError;
use log::debug;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::PathBuf;

/// A loaded, schema-less bundle document. Read-only once loaded.
pub type ParameterBundle = serde_json::Value;

/// Bundles shipped with the crate, keyed by file name.
const EMBEDDED_BUNDLES: &[(&str, &str)] = &[
    (
        "ckdpc_coeff_bundle_v1.json",
        include_str!("../bundles/ckdpc_coeff_bundle_v1.json"),
    ),
    (
        "gdrs_coeff_bundle_v1.json",
        include_str!("../bundles/gdrs_coeff_bundle_v1.json"),
    ),
    (
        "score2_coeff_bundle_v1.json",
        include_str!("../bundles/score2_coeff_bundle_v1.json"),
    ),
    (
        "caide_coeff_bundle_v1.json",
        include_str!("../bundles/caide_coeff_bundle_v1.json"),
    ),
    (
        "clivd_coeff_bundle_v1.json",
        include_str!("../bundles/clivd_coeff_bundle_v1.json"),
    ),
    (
        "plcom2012_coeff_bundle_v1.json",
        include_str!("../bundles/plcom2012_coeff_bundle_v1.json"),
    ),
    (
        "copd_coeff_bundle_v1.json",
        include_str!("../bundles/copd_coeff_bundle_v1.json"),
    ),
];

/// Where a bundle is read from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BundleSource {
    /// The bundles compiled into the crate.
    #[default]
    Embedded,
    /// A directory on disk holding bundle files.
    Directory(PathBuf),
}

impl BundleSource {
    fn describe(&self, filename: &str) -> String {
        match self {
            BundleSource::Embedded => format!("embedded:{filename}"),
            BundleSource::Directory(dir) => dir.join(filename).display().to_string(),
        }
    }
}

/// Names of every bundle compiled into the crate.
pub fn embedded_bundle_names() -> impl Iterator<Item = &'static str> {
    EMBEDDED_BUNDLES.iter().map(|(name, _)| *name)
}

/// Reads and parses the bundle `filename` from `source`.
pub fn load(source: &BundleSource, filename: &str) -> Result<ParameterBundle, RiskError> {
    let location = source.describe(filename);
    let text = read_text(source, filename, &location)?;
    debug!("Loaded parameter bundle {location} ({} bytes)", text.len());
    serde_json::from_str(&text).map_err(|source| RiskError::Parse { location, source })
}

/// Reads a bundle and decodes it into the typed schema `T`.
pub fn load_typed<T: DeserializeOwned>(
    source: &BundleSource,
    filename: &str,
) -> Result<T, RiskError> {
    let document = load(source, filename)?;
    decode(&document).map_err(|e| match e {
        RiskError::Schema(msg) => RiskError::Schema(format!("{}: {msg}", source.describe(filename))),
        other => other,
    })
}

/// Decodes an already-loaded document into the typed schema `T`.
pub fn decode<T: DeserializeOwned>(document: &ParameterBundle) -> Result<T, RiskError> {
    T::deserialize(document).map_err(|e| RiskError::schema(e.to_string()))
}

fn read_text(source: &BundleSource, filename: &str, location: &str) -> Result<String, RiskError> {
    match source {
        BundleSource::Embedded => EMBEDDED_BUNDLES
            .iter()
            .find(|(name, _)| *name == filename)
            .map(|(_, text)| (*text).to_string())
            .ok_or_else(|| RiskError::NotFound {
                location: location.to_string(),
            }),
        BundleSource::Directory(dir) => {
            fs::read_to_string(dir.join(filename)).map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => RiskError::NotFound {
                    location: location.to_string(),
                },
                _ => RiskError::Io {
                    location: location.to_string(),
                    source,
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize)]
    struct Minimal {
        model_id: String,
    }

    #[test]
    fn every_embedded_bundle_is_valid_json() {
        for name in embedded_bundle_names() {
            let doc = load(&BundleSource::Embedded, name).unwrap();
            assert!(doc.is_object(), "{name} should be a JSON object");
        }
    }

    #[test]
    fn missing_embedded_bundle_is_not_found() {
        let err = load(&BundleSource::Embedded, "nope.json").unwrap_err();
        assert!(matches!(err, RiskError::NotFound { ref location } if location.contains("nope.json")));
    }

    #[test]
    fn directory_source_reads_files() {
        let dir = tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("tiny.json")).unwrap();
        writeln!(file, r#"{{"model_id": "tiny"}}"#).unwrap();

        let source = BundleSource::Directory(dir.path().to_path_buf());
        let typed: Minimal = load_typed(&source, "tiny.json").unwrap();
        assert_eq!(typed.model_id, "tiny");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let source = BundleSource::Directory(dir.path().to_path_buf());
        assert!(matches!(
            load(&source, "absent.json"),
            Err(RiskError::NotFound { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let source = BundleSource::Directory(dir.path().to_path_buf());
        assert!(matches!(
            load(&source, "bad.json"),
            Err(RiskError::Parse { .. })
        ));
    }

    #[test]
    fn shape_mismatch_is_a_schema_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("shape.json"), r#"{"model_id": 3}"#).unwrap();
        let source = BundleSource::Directory(dir.path().to_path_buf());
        let err = load_typed::<Minimal>(&source, "shape.json").unwrap_err();
        assert!(matches!(err, RiskError::Schema(ref msg) if msg.contains("shape.json")));
    }
}
