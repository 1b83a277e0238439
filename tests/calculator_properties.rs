use approx::assert_abs_diff_eq;
use clinrisk::calculators::caide::ApoeStatus;
use clinrisk::calculators::ckdpc::DmMedication;
use clinrisk::calculators::clivd::ClivdSmoking;
use clinrisk::calculators::copd::{CopdSmokingStatus, LrtiCount};
use clinrisk::calculators::gdrs::GdrsSmoking;
use clinrisk::calculators::plcom2012::{PlcoSmokingStatus, Race};
use clinrisk::calculators::score2::Region;
use clinrisk::*;
use std::thread;

fn ckdpc_patient() -> CkdpcInputs {
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

fn gdrs_patient() -> GdrsInputs {
    GdrsInputs {
        age: 52.0,
        height: 1.72,
        waist: 98.0,
        hypertension: true,
        exercise: 1.5,
        smoking: GdrsSmoking::FormerLt20,
        wholegrains: 25.0,
        coffee: 225.0,
        redmeat: 75.0,
        diabetes_one_parent: true,
        diabetes_both_parents: false,
        diabetes_sibling: false,
        hba1c: 5.7,
    }
}

fn score2_patient(age: f64) -> Score2Inputs {
    Score2Inputs {
        age,
        sex: Sex::Female,
        smoker: false,
        sbp: 130.0,
        tchol: 5.8,
        hdl: 1.5,
        region: Region::High,
    }
}

fn caide_patient(model: CaideModel, apoe_status: Option<ApoeStatus>) -> CaideInputs {
    CaideInputs {
        age: 55,
        sex: Sex::Male,
        education_years: 12,
        sbp_mmhg: 145.0,
        bmi: 31.0,
        total_chol_mmol_l: 6.0,
        physically_active: true,
        apoe_status,
        model,
    }
}

fn clivd_patient(alcohol: f64) -> ClivdInputs {
    ClivdInputs {
        age: 60.0,
        sex: Sex::Female,
        whr: 0.9,
        alcohol,
        ggt: 40.0,
        diabetes: false,
        smoking: ClivdSmoking::NeverOrPast,
    }
}

fn plco_patient() -> PlcoInputs {
    PlcoInputs {
        age_years: 66.0,
        race: Race::Black,
        education_level: 2,
        bmi: 24.0,
        copd: true,
        personal_history_cancer: false,
        family_history_lung_cancer: true,
        smoking_status: PlcoSmokingStatus::Current,
        smoking_intensity_cigs_per_day: 25.0,
        smoking_duration_years: 45.0,
        quit_time_years: Some(12.0),
    }
}

// ----------------------------------------------------------------------------------------
// End-to-end regression
// ----------------------------------------------------------------------------------------

#[test]
fn ckdpc_nondiabetic_demo_patient_matches_recorded_value() {
    let bundle = load_ckdpc_bundle(None).unwrap();
    let risk = ckdpc_risk_5y(&ckdpc_patient(), &bundle).unwrap();
    assert_abs_diff_eq!(risk, 3.2567591163752185, epsilon = 1e-9);
}

#[test]
fn copd_demo_patient_is_flagged_for_spirometry() {
    let bundle = load_copd_bundle(None).unwrap();
    let result = copd_casefinding_score(
        &CopdInputs {
            smoking_status: CopdSmokingStatus::Current,
            asthma_history: false,
            lrti_count_3y: LrtiCount::ThreeOrMore,
            salbutamol_3y: false,
            threshold: None,
        },
        &bundle,
    )
    .unwrap();
    assert_eq!(result.score, 3.0);
    assert!(result.above_threshold);
}

// ----------------------------------------------------------------------------------------
// Clinical edge cases
// ----------------------------------------------------------------------------------------

#[test]
fn score2_rejects_ages_outside_validated_window() {
    let bundle = load_score2_bundle(None).unwrap();
    for age in [40.0, 54.5, 69.0] {
        assert!(score2_risk(&score2_patient(age), &bundle).is_ok(), "age {age}");
    }
    for age in [39.9, 69.1, 85.0] {
        assert!(
            matches!(
                score2_risk(&score2_patient(age), &bundle),
                Err(RiskError::Validation(_))
            ),
            "age {age}"
        );
    }
}

#[test]
fn ckdpc_missing_and_negative_acr_agree() {
    let bundle = load_ckdpc_bundle(None).unwrap();
    let mut missing = ckdpc_patient();
    missing.acr_mg_g = None;
    let mut negative = ckdpc_patient();
    negative.acr_mg_g = Some(-5.0);
    assert_eq!(
        ckdpc_risk_5y(&missing, &bundle).unwrap(),
        ckdpc_risk_5y(&negative, &bundle).unwrap()
    );
}

#[test]
fn ckdpc_diabetic_patient_uses_diabetic_model() {
    let bundle = load_ckdpc_bundle(None).unwrap();
    let mut patient = ckdpc_patient();
    patient.diabetes = true;
    assert!(matches!(
        ckdpc_risk_5y(&patient, &bundle),
        Err(RiskError::Validation(_))
    ));
    patient.hba1c = Some(7.2);
    patient.dm_medication_status = Some(DmMedication::Oral);
    let risk = ckdpc_risk_5y(&patient, &bundle).unwrap();
    assert!((0.0..=100.0).contains(&risk));
}

#[test]
fn gdrs_both_parents_take_precedence_over_one_parent() {
    let bundle = load_gdrs_bundle(None).unwrap();
    let mut both_only = gdrs_patient();
    both_only.diabetes_one_parent = false;
    both_only.diabetes_both_parents = true;
    let mut both_and_one = both_only.clone();
    both_and_one.diabetes_one_parent = true;
    assert_eq!(
        gdrs_risk(&both_only, &bundle).unwrap(),
        gdrs_risk(&both_and_one, &bundle).unwrap()
    );
}

#[test]
fn caide_apoe_model_adds_genotype_points() {
    let bundle = load_caide_bundle(None).unwrap();
    let basic = caide_patient(CaideModel::Basic, None);
    let without_apoe = caide_patient(CaideModel::Apoe, None);
    assert!(matches!(
        caide_risk(&without_apoe, &bundle),
        Err(RiskError::Validation(_))
    ));

    let with_apoe = caide_patient(CaideModel::Apoe, Some(ApoeStatus::E4));
    let basic_points = caide_points(&basic, &bundle).unwrap();
    let apoe_points = caide_points(&with_apoe, &bundle).unwrap();
    assert_eq!(apoe_points - basic_points, 2.0);

    // beta0 + beta1 (20-year follow-up) + beta2 * points for the APOE variant.
    let eta = -6.1124 + 0.4187 + 0.2893 * apoe_points;
    let expected = 100.0 / (1.0 + (-eta).exp());
    assert_abs_diff_eq!(caide_risk(&with_apoe, &bundle).unwrap(), expected, epsilon = 1e-9);
}

#[test]
fn clivd_alcohol_above_cap_equals_alcohol_at_cap() {
    let bundle = load_clivd_bundle(None).unwrap();
    let capped = clivd_risk(&clivd_patient(60.0), &bundle).unwrap();
    let excess = clivd_risk(&clivd_patient(100.0), &bundle).unwrap();
    assert_eq!(capped, excess);
}

#[test]
fn plco_current_smokers_ignore_quit_time() {
    let bundle = load_plcom2012_bundle(None).unwrap();
    let mut other = plco_patient();
    other.quit_time_years = None;
    assert_eq!(
        plcom2012_risk_6y(&plco_patient(), &bundle).unwrap(),
        plcom2012_risk_6y(&other, &bundle).unwrap()
    );
}

// ----------------------------------------------------------------------------------------
// Ranges, idempotence, sharing
// ----------------------------------------------------------------------------------------

#[test]
fn risks_lie_in_percent_range() {
    let ckdpc = ckdpc_risk_5y(&ckdpc_patient(), &load_ckdpc_bundle(None).unwrap()).unwrap();
    let gdrs = gdrs_risk(&gdrs_patient(), &load_gdrs_bundle(None).unwrap()).unwrap();
    let score2 = score2_risk(&score2_patient(60.0), &load_score2_bundle(None).unwrap()).unwrap();
    let caide = caide_risk(
        &caide_patient(CaideModel::Basic, None),
        &load_caide_bundle(None).unwrap(),
    )
    .unwrap();
    let plco = plcom2012_risk_6y(&plco_patient(), &load_plcom2012_bundle(None).unwrap()).unwrap();

    for (name, risk) in [
        ("ckdpc", ckdpc),
        ("gdrs original", gdrs.original_risk_percent),
        ("gdrs clinical", gdrs.clinical_risk_percent),
        ("score2", score2),
        ("caide", caide),
        ("plcom2012", plco.risk_6y),
    ] {
        assert!((0.0..=100.0).contains(&risk), "{name} risk {risk} out of range");
    }
    assert!((0.0..=1.0).contains(&plco.prob_6y));
    assert_abs_diff_eq!(plco.risk_6y, plco.prob_6y * 100.0, epsilon = 1e-12);
}

#[test]
fn repeated_evaluations_are_bit_identical() {
    let ckdpc = load_ckdpc_bundle(None).unwrap();
    let clivd = load_clivd_bundle(None).unwrap();
    let first = ckdpc_risk_5y(&ckdpc_patient(), &ckdpc).unwrap();
    let first_clivd = clivd_risk(&clivd_patient(14.0), &clivd).unwrap();
    for _ in 0..10 {
        assert_eq!(
            ckdpc_risk_5y(&ckdpc_patient(), &ckdpc).unwrap().to_bits(),
            first.to_bits()
        );
        assert_eq!(
            clivd_risk(&clivd_patient(14.0), &clivd)
                .unwrap()
                .linear_predictor
                .to_bits(),
            first_clivd.linear_predictor.to_bits()
        );
    }
}

#[test]
fn one_bundle_serves_concurrent_evaluations() {
    let bundle = load_score2_bundle(None).unwrap();
    let expected = score2_risk(&score2_patient(58.0), &bundle).unwrap();
    let results: Vec<f64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| score2_risk(&score2_patient(58.0), &bundle).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for risk in results {
        assert_eq!(risk.to_bits(), expected.to_bits());
    }
}
