//! Run-time settings for the `clinrisk` binary, read from a TOML file.
//!
//! ```toml
//! bundle_dir = "/opt/clinrisk/bundles"
//! score2_region = "moderate"
//! copd_threshold = 3.0
//!
//! [bundles]
//! ckdpc = "ckdpc_coeff_bundle_v2.json"
//! ```
//!
//! Every key is optional. Without `bundle_dir` the bundles compiled into the
//! crate are used.

use crate::calculators::score2::Region;
use crate::calculators::{Calculator, caide, ckdpc, clivd, copd, gdrs, plcom2012, score2};
use crate::shared::files::BundleSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Per-calculator bundle file names overriding the shipped defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleFiles {
    pub ckdpc: Option<String>,
    pub gdrs: Option<String>,
    pub score2: Option<String>,
    pub caide: Option<String>,
    pub clivd: Option<String>,
    pub plcom2012: Option<String>,
    pub copd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bundle_dir: Option<PathBuf>,
    pub bundles: BundleFiles,
    pub score2_region: Option<Region>,
    pub copd_threshold: Option<f64>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn bundle_source(&self) -> BundleSource {
        match &self.bundle_dir {
            Some(dir) => BundleSource::Directory(dir.clone()),
            None => BundleSource::Embedded,
        }
    }

    /// The bundle file to load for `calculator`: the override if one is set,
    /// otherwise the calculator's shipped default.
    pub fn bundle_file(&self, calculator: Calculator) -> &str {
        let (configured, default) = match calculator {
            Calculator::Ckdpc => (&self.bundles.ckdpc, ckdpc::DEFAULT_BUNDLE),
            Calculator::Gdrs => (&self.bundles.gdrs, gdrs::DEFAULT_BUNDLE),
            Calculator::Score2 => (&self.bundles.score2, score2::DEFAULT_BUNDLE),
            Calculator::Caide => (&self.bundles.caide, caide::DEFAULT_BUNDLE),
            Calculator::Clivd => (&self.bundles.clivd, clivd::DEFAULT_BUNDLE),
            Calculator::Plcom2012 => (&self.bundles.plcom2012, plcom2012::DEFAULT_BUNDLE),
            Calculator::Copd => (&self.bundles.copd, copd::DEFAULT_BUNDLE),
        };
        configured.as_deref().unwrap_or(default)
    }
}
