#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod config;
pub mod context;
pub mod error;
pub mod link;
pub mod types;
#[path = "../shared/files.rs"]
pub mod shared_files;
pub mod shared {
    pub use super::shared_files as files;
}

#[path = "../calculators/mod.rs"]
pub mod calculators;

pub use calculators::caide::{
    CaideBundle, CaideInputs, CaideModel, caide_points, caide_risk, load_caide_bundle,
};
pub use calculators::ckdpc::{CkdpcBundle, CkdpcInputs, ckdpc_risk_5y, load_ckdpc_bundle};
pub use calculators::clivd::{
    ClivdBundle, ClivdInputs, ClivdScore, RiskGroup, clivd_risk, load_clivd_bundle,
};
pub use calculators::copd::{
    CopdBundle, CopdCaseFinding, CopdInputs, copd_casefinding_score, load_copd_bundle,
};
pub use calculators::gdrs::{GdrsBundle, GdrsInputs, GdrsRisk, gdrs_risk, load_gdrs_bundle};
pub use calculators::plcom2012::{
    PlcoBundle, PlcoInputs, PlcoRisk, load_plcom2012_bundle, plcom2012_risk_6y,
};
pub use calculators::score2::{Score2Bundle, Score2Inputs, load_score2_bundle, score2_risk};
pub use error::RiskError;
pub use shared::files::{BundleSource, ParameterBundle};
pub use types::Sex;
