//! CKD Prognosis Consortium: 5-year risk of incident eGFR < 60 mL/min/1.73m².
//!
//! Two sub-models are selected by diabetes status. Both share the age, eGFR and
//! BMI transforms; the non-diabetic model additionally centers log10(ACR) on an
//! *expected* value from a secondary regression, while the diabetic model
//! centers it at 10 mg/g and adds HbA1c and medication terms.
//!
//! Units: eGFR mL/min/1.73m²; ACR mg/g; HbA1c % (NGSP); BMI kg/m².

use crate::context::{FeatureContext, LinearPredictorSpec, Term};
use crate::error::RiskError;
use crate::link;
use crate::shared::files::{self, BundleSource};
use crate::types::{Sex, categorical_codes, indicator, require_finite};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_BUNDLE: &str = "ckdpc_coeff_bundle_v1.json";

/// Published constants of the expected-log10(ACR) regression, used when the
/// bundle does not carry its own `expected_log10_acr` block.
const EXPECTED_LOG10_ACR_INTERCEPT: f64 = 0.6754442;
const EXPECTED_LOG10_ACR_TERMS: [(&str, f64); 9] = [
    ("age_centered_per5", 0.0222581),
    ("female", 0.0459020),
    ("black", -0.0340495),
    ("egfr_low_component", 0.0085871),
    ("egfr_high_component", -0.0275825),
    ("history_cvd", 0.0495695),
    ("ever_smoker", 0.0381086),
    ("hypertensive", 0.1286836),
    ("bmi_centered_per5", 0.0218783),
];

/// Diabetes medication status, required by the diabetic sub-model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DmMedication {
    Oral,
    Insulin,
    NoMeds,
}

categorical_codes!(DmMedication, "diabetes medication status", {
    Oral => "oral",
    Insulin => "insulin",
    NoMeds => "no_meds",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CkdpcInputs {
    pub diabetes: bool,
    pub age: f64,
    pub sex: Sex,
    pub black: bool,
    /// mL/min/1.73m²
    pub egfr: f64,
    pub history_cvd: bool,
    pub ever_smoker: bool,
    pub hypertensive: bool,
    pub bmi: f64,
    /// Albumin-to-creatinine ratio in mg/g. Missing or non-positive values
    /// contribute nothing to the albuminuria term.
    #[serde(default)]
    pub acr_mg_g: Option<f64>,
    /// % (NGSP); required for the diabetic model.
    #[serde(default)]
    pub hba1c: Option<f64>,
    /// Required for the diabetic model.
    #[serde(default)]
    pub dm_medication_status: Option<DmMedication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeibullParams {
    pub gamma: f64,
}

fn default_horizon() -> f64 {
    5.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CkdpcSubModel {
    #[serde(default = "default_horizon")]
    pub horizon_years: f64,
    pub linear_predictor: LinearPredictorSpec,
    pub risk_model: WeibullParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CkdpcBundle {
    #[serde(default)]
    pub expected_log10_acr: Option<LinearPredictorSpec>,
    pub models: BTreeMap<String, CkdpcSubModel>,
}

impl CkdpcBundle {
    fn sub_model(&self, diabetes: bool) -> Result<&CkdpcSubModel, RiskError> {
        let key = sub_model_key(diabetes);
        self.models
            .get(key)
            .ok_or_else(|| RiskError::schema(format!("bundle is missing models['{key}']")))
    }

    fn expected_log10_acr(&self) -> LinearPredictorSpec {
        self.expected_log10_acr.clone().unwrap_or_else(|| LinearPredictorSpec {
            intercept: EXPECTED_LOG10_ACR_INTERCEPT,
            terms: EXPECTED_LOG10_ACR_TERMS
                .iter()
                .map(|(name, coefficient)| Term {
                    name: (*name).to_string(),
                    coefficient: *coefficient,
                })
                .collect(),
        })
    }
}

fn sub_model_key(diabetes: bool) -> &'static str {
    if diabetes { "diabetic" } else { "nondiabetic" }
}

/// Loads an embedded CKD-PC bundle (the shipped default when `filename` is `None`).
pub fn load_ckdpc_bundle(filename: Option<&str>) -> Result<CkdpcBundle, RiskError> {
    load_ckdpc_bundle_from(&BundleSource::Embedded, filename.unwrap_or(DEFAULT_BUNDLE))
}

pub fn load_ckdpc_bundle_from(
    source: &BundleSource,
    filename: &str,
) -> Result<CkdpcBundle, RiskError> {
    files::load_typed(source, filename)
}

/// 5-year absolute risk of incident eGFR < 60, in percent.
pub fn ckdpc_risk_5y(inputs: &CkdpcInputs, bundle: &CkdpcBundle) -> Result<f64, RiskError> {
    let model = bundle.sub_model(inputs.diabetes)?;
    let ctx = build_context(inputs, bundle)?;
    let lp = model.linear_predictor.evaluate(&ctx)?;
    let risk = link::weibull_absolute_risk(lp, model.risk_model.gamma, model.horizon_years);
    debug!(
        "CKD-PC {} model: lp={lp:.6}, gamma={}, risk={risk:.6}",
        sub_model_key(inputs.diabetes),
        model.risk_model.gamma
    );
    Ok(risk * 100.0)
}

fn build_context(inputs: &CkdpcInputs, bundle: &CkdpcBundle) -> Result<FeatureContext, RiskError> {
    let age = require_finite("age", inputs.age)?;
    let egfr = require_finite("egfr", inputs.egfr)?;
    let bmi = require_finite("bmi", inputs.bmi)?;

    let age_centered_per5 = age / 5.0 - 11.0;
    let egfr_low_component = 15.0 - egfr.min(90.0) / 5.0;
    let egfr_high_component = (egfr - 90.0).max(0.0) / 5.0;
    let bmi_centered_per5 = bmi / 5.0 - 5.4;

    let mut ctx = FeatureContext::new()
        .with("age_centered_per5", age_centered_per5)
        .with("female", inputs.sex.female_indicator())
        .with("black", indicator(inputs.black))
        .with("egfr_low_component", egfr_low_component)
        .with("egfr_high_component", egfr_high_component)
        .with("history_cvd", indicator(inputs.history_cvd))
        .with("ever_smoker", indicator(inputs.ever_smoker))
        .with("hypertensive", indicator(inputs.hypertensive))
        .with("bmi_centered_per5", bmi_centered_per5);

    let log10_acr = inputs
        .acr_mg_g
        .filter(|acr| acr.is_finite() && *acr > 0.0)
        .map(f64::log10);

    let (albuminuria_term, hba1c_centered, insulin, no_meds) = if inputs.diabetes {
        let hba1c = inputs.hba1c.ok_or_else(|| {
            RiskError::validation("the diabetic CKD-PC model requires 'hba1c' (% NGSP)")
        })?;
        let hba1c = require_finite("hba1c", hba1c)?;
        let medication = inputs.dm_medication_status.ok_or_else(|| {
            RiskError::validation(
                "the diabetic CKD-PC model requires 'dm_medication_status' (oral|insulin|no_meds)",
            )
        })?;
        // Centered at 10 mg/g, i.e. log10 = 1.
        let albuminuria = log10_acr.map_or(0.0, |v| v - 1.0);
        (
            albuminuria,
            hba1c - 7.0,
            indicator(medication == DmMedication::Insulin),
            indicator(medication == DmMedication::NoMeds),
        )
    } else {
        let albuminuria = match log10_acr {
            Some(v) => v - bundle.expected_log10_acr().evaluate(&ctx)?,
            None => 0.0,
        };
        (albuminuria, 0.0, 0.0, 0.0)
    };

    ctx.insert("albuminuria_term", albuminuria_term);
    ctx.insert("hba1c_centered", hba1c_centered);
    ctx.insert("insulin_indicator", insulin);
    ctx.insert("no_meds_indicator", no_meds);
    ctx.insert("interaction_hba1c_insulin", hba1c_centered * insulin);
    ctx.insert("interaction_hba1c_no_meds", hba1c_centered * no_meds);
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn demo_inputs() -> CkdpcInputs {
        CkdpcInputs {
            diabetes: false,
            age: 60.0,
            sex: Sex::Male,
            black: true,
            egfr: 85.0,
            history_cvd: true,
            ever_smoker: true,
            hypertensive: true,
            bmi: 30.0,
            acr_mg_g: Some(15.0),
            hba1c: None,
            dm_medication_status: None,
        }
    }

    fn bundle() -> CkdpcBundle {
        load_ckdpc_bundle(None).unwrap()
    }

    #[test]
    fn egfr_spline_splits_at_90() {
        let b = bundle();
        let mut inputs = demo_inputs();
        inputs.egfr = 60.0;
        let ctx = build_context(&inputs, &b).unwrap();
        assert_abs_diff_eq!(ctx.get("egfr_low_component").unwrap(), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ctx.get("egfr_high_component").unwrap(), 0.0, epsilon = 1e-12);

        inputs.egfr = 110.0;
        let ctx = build_context(&inputs, &b).unwrap();
        assert_abs_diff_eq!(ctx.get("egfr_low_component").unwrap(), -3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ctx.get("egfr_high_component").unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn nondiabetic_albuminuria_is_centered_on_expected_value() {
        let ctx = build_context(&demo_inputs(), &bundle()).unwrap();
        // Expected log10 ACR for the demo patient from the published regression.
        let expected = 0.6754442
            + 0.0222581 * 1.0
            - 0.0340495
            + 0.0085871 * -2.0
            + 0.0495695
            + 0.0381086
            + 0.1286836
            + 0.0218783 * 0.6;
        assert_abs_diff_eq!(
            ctx.get("albuminuria_term").unwrap(),
            15.0_f64.log10() - expected,
            epsilon = 1e-9
        );
        assert_eq!(ctx.get("hba1c_centered"), Some(0.0));
    }

    #[test]
    fn built_in_expected_acr_regression_matches_shipped_bundle() {
        let shipped = bundle();
        let mut stripped = shipped.clone();
        stripped.expected_log10_acr = None;
        let a = ckdpc_risk_5y(&demo_inputs(), &shipped).unwrap();
        let b = ckdpc_risk_5y(&demo_inputs(), &stripped).unwrap();
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }

    #[test]
    fn diabetic_model_requires_hba1c_and_medication() {
        let b = bundle();
        let mut inputs = demo_inputs();
        inputs.diabetes = true;
        assert!(matches!(ckdpc_risk_5y(&inputs, &b), Err(RiskError::Validation(_))));

        inputs.hba1c = Some(8.0);
        assert!(matches!(ckdpc_risk_5y(&inputs, &b), Err(RiskError::Validation(_))));

        inputs.dm_medication_status = Some(DmMedication::Insulin);
        let risk = ckdpc_risk_5y(&inputs, &b).unwrap();
        assert!((0.0..=100.0).contains(&risk));
    }

    #[test]
    fn diabetic_interactions_follow_medication() {
        let b = bundle();
        let mut inputs = demo_inputs();
        inputs.diabetes = true;
        inputs.hba1c = Some(9.0);
        inputs.acr_mg_g = Some(100.0);
        inputs.dm_medication_status = Some(DmMedication::NoMeds);
        let ctx = build_context(&inputs, &b).unwrap();
        assert_abs_diff_eq!(ctx.get("albuminuria_term").unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(ctx.get("interaction_hba1c_no_meds"), Some(2.0));
        assert_eq!(ctx.get("interaction_hba1c_insulin"), Some(0.0));
    }

    #[test]
    fn missing_and_nonpositive_acr_are_neutral() {
        let b = bundle();
        let mut missing = demo_inputs();
        missing.acr_mg_g = None;
        let mut negative = demo_inputs();
        negative.acr_mg_g = Some(-5.0);
        let ctx = build_context(&missing, &b).unwrap();
        assert_eq!(ctx.get("albuminuria_term"), Some(0.0));
        assert_eq!(
            ckdpc_risk_5y(&missing, &b).unwrap().to_bits(),
            ckdpc_risk_5y(&negative, &b).unwrap().to_bits()
        );
    }

    #[test]
    fn missing_sub_model_is_a_schema_error() {
        let mut b = bundle();
        b.models.remove("nondiabetic");
        assert!(matches!(
            ckdpc_risk_5y(&demo_inputs(), &b),
            Err(RiskError::Schema(_))
        ));
    }

    #[test]
    fn unknown_medication_code_is_rejected() {
        assert!(matches!(
            "pump".parse::<DmMedication>(),
            Err(RiskError::Validation(_))
        ));
        assert_eq!("no_meds".parse::<DmMedication>().unwrap(), DmMedication::NoMeds);
    }
}
