// ========================================================================================
//
//                              CLINRISK COMMAND LINE
//
// ========================================================================================
//
// Thin driver over the `clinrisk` library. Each subcommand loads one coefficient
// bundle (embedded, or from `--bundle-dir`), reads patient inputs from a TOML file,
// evaluates the calculator, and prints the result. `demo` runs every calculator on a
// fixed reference patient.

use clap::{Args, Parser, Subcommand};
use clinrisk::calculators::caide::{ApoeStatus, CaideModel};
use clinrisk::calculators::ckdpc::DmMedication;
use clinrisk::calculators::clivd::ClivdSmoking;
use clinrisk::calculators::copd::{CopdSmokingStatus, LrtiCount};
use clinrisk::calculators::gdrs::GdrsSmoking;
use clinrisk::calculators::plcom2012::{PlcoSmokingStatus, Race};
use clinrisk::calculators::score2::Region;
use clinrisk::calculators::{
    Calculator, caide::load_caide_bundle_from, ckdpc::load_ckdpc_bundle_from,
    clivd::load_clivd_bundle_from, copd::load_copd_bundle_from, gdrs::load_gdrs_bundle_from,
    plcom2012::load_plcom2012_bundle_from, score2::load_score2_bundle_from,
};
use clinrisk::config::Settings;
use clinrisk::{
    CaideInputs, CkdpcInputs, ClivdInputs, CopdInputs, GdrsInputs, PlcoInputs, Score2Inputs, Sex,
    caide_points, caide_risk, ckdpc_risk_5y, clivd_risk, copd_casefinding_score, gdrs_risk,
    plcom2012_risk_6y, score2_risk,
};
use log::info;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

// ========================================================================================
//                         COMMAND-LINE INTERFACE DEFINITION
// ========================================================================================

#[derive(Parser)]
#[command(
    name = "clinrisk",
    version,
    about = "Clinical risk calculators driven by JSON coefficient bundles",
    long_about = "Evaluates published clinical risk models (CKD-PC, GDRS, SCORE2, CAIDE, \
                 CLivD, PLCOm2012, COPD case-finding) on patient inputs read from TOML files."
)]
struct Cli {
    /// Settings file (TOML) with bundle overrides and defaults
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory to load coefficient bundles from instead of the embedded copies
    #[arg(long, global = true, value_name = "DIR")]
    bundle_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Patient inputs as a TOML table
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every calculator on the reference demo patient
    Demo,
    /// 5-year CKD risk (CKD-PC)
    Ckdpc(InputArgs),
    /// 5-year type 2 diabetes risk (German Diabetes Risk Score)
    Gdrs(InputArgs),
    /// 10-year cardiovascular risk (SCORE2)
    Score2(InputArgs),
    /// 20-year dementia risk (CAIDE)
    Caide(InputArgs),
    /// Severe liver disease score (CLivD)
    Clivd(InputArgs),
    /// 6-year lung cancer risk (PLCOm2012)
    Plcom2012(InputArgs),
    /// COPD case-finding score
    Copd(InputArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if cli.bundle_dir.is_some() {
        settings.bundle_dir = cli.bundle_dir;
    }
    if let Some(dir) = &settings.bundle_dir {
        info!("Loading bundles from {}", dir.display());
    }

    match cli.command {
        Commands::Demo => run_demo(&settings),
        Commands::Ckdpc(args) => {
            let inputs: CkdpcInputs = read_inputs(&args.input, |_| {})?;
            print_ckdpc(&settings, &inputs)
        }
        Commands::Gdrs(args) => {
            let inputs: GdrsInputs = read_inputs(&args.input, |_| {})?;
            print_gdrs(&settings, &inputs)
        }
        Commands::Score2(args) => {
            let region = settings.score2_region;
            let inputs: Score2Inputs = read_inputs(&args.input, |table| {
                if let Some(region) = region {
                    table
                        .entry("region")
                        .or_insert(toml::Value::String(region.code().to_string()));
                }
            })?;
            print_score2(&settings, &inputs)
        }
        Commands::Caide(args) => {
            let inputs: CaideInputs = read_inputs(&args.input, |_| {})?;
            print_caide(&settings, &inputs)
        }
        Commands::Clivd(args) => {
            let inputs: ClivdInputs = read_inputs(&args.input, |_| {})?;
            print_clivd(&settings, &inputs)
        }
        Commands::Plcom2012(args) => {
            let inputs: PlcoInputs = read_inputs(&args.input, |_| {})?;
            print_plcom2012(&settings, &inputs)
        }
        Commands::Copd(args) => {
            let threshold = settings.copd_threshold;
            let inputs: CopdInputs = read_inputs(&args.input, |table| {
                if let Some(threshold) = threshold {
                    table
                        .entry("threshold")
                        .or_insert(toml::Value::Float(threshold));
                }
            })?;
            print_copd(&settings, &inputs)
        }
    }
}

/// Reads a TOML table of patient inputs. `fill_defaults` may add keys the file
/// leaves out before the table is decoded.
fn read_inputs<T: DeserializeOwned>(
    path: &Path,
    fill_defaults: impl FnOnce(&mut toml::Table),
) -> Result<T, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read input file '{}': {e}", path.display()))?;
    let mut table: toml::Table = text
        .parse()
        .map_err(|e| format!("Failed to parse input file '{}': {e}", path.display()))?;
    fill_defaults(&mut table);
    let inputs = toml::Value::Table(table)
        .try_into()
        .map_err(|e| format!("Invalid inputs in '{}': {e}", path.display()))?;
    Ok(inputs)
}

// ========================================================================================
//                                RESULT REPORTING
// ========================================================================================

fn print_ckdpc(settings: &Settings, inputs: &CkdpcInputs) -> Result<(), Box<dyn Error>> {
    let bundle =
        load_ckdpc_bundle_from(&settings.bundle_source(), settings.bundle_file(Calculator::Ckdpc))?;
    let risk = ckdpc_risk_5y(inputs, &bundle)?;
    println!("CKD-PC 5-year risk of eGFR < 60: {risk:.2}%");
    Ok(())
}

fn print_gdrs(settings: &Settings, inputs: &GdrsInputs) -> Result<(), Box<dyn Error>> {
    let bundle =
        load_gdrs_bundle_from(&settings.bundle_source(), settings.bundle_file(Calculator::Gdrs))?;
    let risk = gdrs_risk(inputs, &bundle)?;
    println!(
        "GDRS original score: {:.1} points, 5-year risk {:.2}%",
        risk.original_points, risk.original_risk_percent
    );
    println!(
        "GDRS clinical score: {:.1} points, 5-year risk {:.2}%",
        risk.clinical_points, risk.clinical_risk_percent
    );
    Ok(())
}

fn print_score2(settings: &Settings, inputs: &Score2Inputs) -> Result<(), Box<dyn Error>> {
    let bundle = load_score2_bundle_from(
        &settings.bundle_source(),
        settings.bundle_file(Calculator::Score2),
    )?;
    let risk = score2_risk(inputs, &bundle)?;
    println!(
        "SCORE2 10-year CVD risk ({} risk region): {risk:.2}%",
        inputs.region
    );
    Ok(())
}

fn print_caide(settings: &Settings, inputs: &CaideInputs) -> Result<(), Box<dyn Error>> {
    let bundle =
        load_caide_bundle_from(&settings.bundle_source(), settings.bundle_file(Calculator::Caide))?;
    let points = caide_points(inputs, &bundle)?;
    let risk = caide_risk(inputs, &bundle)?;
    println!(
        "CAIDE ({} model): {points} points, 20-year dementia risk {risk:.2}%",
        inputs.model
    );
    Ok(())
}

fn print_clivd(settings: &Settings, inputs: &ClivdInputs) -> Result<(), Box<dyn Error>> {
    let bundle =
        load_clivd_bundle_from(&settings.bundle_source(), settings.bundle_file(Calculator::Clivd))?;
    let score = clivd_risk(inputs, &bundle)?;
    println!(
        "CLivD linear predictor: {:.4}, hazard ratio {:.3}, 15-year risk group: {}",
        score.linear_predictor, score.hazard_ratio, score.risk_group_15y
    );
    Ok(())
}

fn print_plcom2012(settings: &Settings, inputs: &PlcoInputs) -> Result<(), Box<dyn Error>> {
    let bundle = load_plcom2012_bundle_from(
        &settings.bundle_source(),
        settings.bundle_file(Calculator::Plcom2012),
    )?;
    let risk = plcom2012_risk_6y(inputs, &bundle)?;
    println!("PLCOm2012 6-year lung cancer risk: {:.2}%", risk.risk_6y);
    Ok(())
}

fn print_copd(settings: &Settings, inputs: &CopdInputs) -> Result<(), Box<dyn Error>> {
    let bundle =
        load_copd_bundle_from(&settings.bundle_source(), settings.bundle_file(Calculator::Copd))?;
    let result = copd_casefinding_score(inputs, &bundle)?;
    println!("{result}");
    Ok(())
}

// ========================================================================================
//                                  DEMO PATIENT
// ========================================================================================

fn run_demo(settings: &Settings) -> Result<(), Box<dyn Error>> {
    print_ckdpc(
        settings,
        &CkdpcInputs {
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
        },
    )?;
    print_ckdpc(
        settings,
        &CkdpcInputs {
            diabetes: true,
            age: 58.0,
            sex: Sex::Female,
            black: false,
            egfr: 72.0,
            history_cvd: false,
            ever_smoker: false,
            hypertensive: true,
            bmi: 31.0,
            acr_mg_g: Some(40.0),
            hba1c: Some(7.5),
            dm_medication_status: Some(DmMedication::Insulin),
        },
    )?;
    print_gdrs(
        settings,
        &GdrsInputs {
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
        },
    )?;
    print_score2(
        settings,
        &Score2Inputs {
            age: 55.0,
            sex: Sex::Male,
            smoker: true,
            sbp: 140.0,
            tchol: 5.5,
            hdl: 1.3,
            region: settings.score2_region.unwrap_or(Region::Moderate),
        },
    )?;
    for (model, apoe_status) in [
        (CaideModel::Basic, None),
        (CaideModel::Apoe, Some(ApoeStatus::E4)),
    ] {
        print_caide(
            settings,
            &CaideInputs {
                age: 50,
                sex: Sex::Female,
                education_years: 8,
                sbp_mmhg: 150.0,
                bmi: 27.0,
                total_chol_mmol_l: 7.0,
                physically_active: false,
                apoe_status,
                model,
            },
        )?;
    }
    print_clivd(
        settings,
        &ClivdInputs {
            age: 52.0,
            sex: Sex::Male,
            whr: 1.10,
            alcohol: 14.0,
            ggt: 65.0,
            diabetes: true,
            smoking: ClivdSmoking::Current,
        },
    )?;
    print_plcom2012(
        settings,
        &PlcoInputs {
            age_years: 62.0,
            race: Race::White,
            education_level: 4,
            bmi: 27.0,
            copd: false,
            personal_history_cancer: false,
            family_history_lung_cancer: true,
            smoking_status: PlcoSmokingStatus::Current,
            smoking_intensity_cigs_per_day: 20.0,
            smoking_duration_years: 40.0,
            quit_time_years: None,
        },
    )?;
    print_copd(
        settings,
        &CopdInputs {
            smoking_status: CopdSmokingStatus::Former,
            asthma_history: true,
            lrti_count_3y: LrtiCount::One,
            salbutamol_3y: true,
            threshold: settings.copd_threshold,
        },
    )?;
    Ok(())
}
