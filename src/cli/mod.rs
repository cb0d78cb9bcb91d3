//! Accident severity CLI
//!
//! Stage runner and prediction front-end over the library.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::data::{Severity, TARGET_COLUMN, USER_FACING_FIELDS};
use crate::inference::{FeatureRecord, Prediction, SeverityPredictor};
use crate::pipeline::TrainingPipeline;
use crate::preprocessing::ColumnType;
use crate::utils::{DataLoader, DatasetInfo};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "accident-severity")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Road accident severity training pipeline and predictor")]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct Settings {
    /// YAML pipeline configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for pipeline artifacts (ignored when --config is set)
    #[arg(short, long, global = true)]
    pub artifacts: Option<PathBuf>,

    /// Raw accident report CSV
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,
}

impl Settings {
    /// Resolve the pipeline configuration these options describe
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match (&self.config, &self.artifacts) {
            (Some(path), _) => PipelineConfig::from_yaml_file(path)?,
            (None, Some(root)) => PipelineConfig::rooted_at(root),
            (None, None) => PipelineConfig::default(),
        };
        if let Some(data) = &self.data {
            config = config.with_data_path(data);
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run transformation, training and evaluation
    Run,

    /// Encode, split and rebalance the raw data
    Transform,

    /// Train the model on the resampled split
    Train,

    /// Score the trained model on the test split
    Evaluate,

    /// Predict the severity of a single report
    Predict {
        /// Field value as name=value, repeatable
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },

    /// Predict every row of a CSV file
    BatchPredict {
        /// Input CSV (raw or canonical column names)
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV with predictions appended
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show dataset information
    Info {
        /// CSV to inspect, defaults to the configured raw data
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(settings: &Settings) -> anyhow::Result<()> {
    section("Pipeline");
    let config = settings.pipeline_config()?;

    let report = TrainingPipeline::new(config).run()?;

    step_ok(&format!(
        "{} train / {} test rows, {} after resampling",
        report.artifacts.n_train, report.artifacts.n_test, report.artifacts.n_resampled
    ));
    print_metrics(report.metrics.f1_score, report.metrics.accuracy_score);
    println!("  {:<16} {}", muted("Time"), format!("{:.3}s", report.elapsed_secs).white());
    println!();
    Ok(())
}

pub fn cmd_transform(settings: &Settings) -> anyhow::Result<()> {
    section("Data Transformation");
    let config = settings.pipeline_config()?;

    let start = Instant::now();
    let artifacts = TrainingPipeline::new(config).run_transformation()?;

    step_ok(&format!("train   {} rows → {}", artifacts.n_train, artifacts.train_path.display()));
    step_ok(&format!("test    {} rows → {}", artifacts.n_test, artifacts.test_path.display()));
    step_ok(&format!("resampled {} rows → {}", artifacts.n_resampled, artifacts.resampled_path.display()));
    step_ok(&format!("preprocessor → {}", artifacts.preprocessor_path.display()));
    println!("  {:<16} {}", muted("Time"), format!("{:?}", start.elapsed()).white());
    println!();
    Ok(())
}

pub fn cmd_train(settings: &Settings) -> anyhow::Result<()> {
    section("Model Trainer");
    let config = settings.pipeline_config()?;
    let model_path = config.model_trainer.model_path();

    let start = Instant::now();
    TrainingPipeline::new(config).run_training()?;

    step_ok(&format!("model → {}", model_path.display()));
    println!("  {:<16} {}", muted("Time"), format!("{:?}", start.elapsed()).white());
    println!();
    Ok(())
}

pub fn cmd_evaluate(settings: &Settings) -> anyhow::Result<()> {
    section("Model Evaluation");
    let config = settings.pipeline_config()?;
    let metric_path = config.model_evaluation.metric_file_name.clone();

    let metrics = TrainingPipeline::new(config).run_evaluation()?;

    print_metrics(metrics.f1_score, metrics.accuracy_score);
    step_ok(&format!("metrics → {}", metric_path.display()));
    println!();
    Ok(())
}

pub fn cmd_predict(settings: &Settings, fields: &[String]) -> anyhow::Result<()> {
    section("Predict");
    let predictor = SeverityPredictor::from_config(&settings.pipeline_config()?)?;

    let record = FeatureRecord::from_pairs(fields)?;
    let prediction = predictor.predict_record(&record)?;
    print_prediction(&prediction);
    Ok(())
}

pub fn cmd_batch_predict(settings: &Settings, input: &Path, output: &Path) -> anyhow::Result<()> {
    section("Batch Predict");
    let predictor = SeverityPredictor::from_config(&settings.pipeline_config()?)?;

    step_run(&format!("Scoring {}", input.display()));
    let start = Instant::now();
    let rows = predictor.predict_csv(input, output)?;
    step_done(&format!("{} rows in {:?}", rows, start.elapsed()));
    step_ok(&format!("predictions → {}", output.display()));
    println!();
    Ok(())
}

pub fn cmd_info(settings: &Settings, file: Option<&Path>) -> anyhow::Result<()> {
    section("Data Info");
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => settings.pipeline_config()?.data_transformation.data_path,
    };

    let df = DataLoader::new().load_csv(&path)?;
    let target = ["Accident_severity", TARGET_COLUMN]
        .into_iter()
        .find(|name| df.get_column_index(name).is_some());
    let info = DatasetInfo::from_frame(&df, target);

    println!("  {:<12} {}", muted("File"), path.display());
    println!("  {:<12} {}", muted("Rows"), info.n_rows);
    println!("  {:<12} {}", muted("Columns"), info.n_cols);
    println!();

    println!("  {:<30} {:<10} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(48)));
    for col in &info.columns {
        println!(
            "  {:<30} {:<10} {:>6}",
            col.name,
            col.dtype.truecolor(140, 140, 140),
            col.null_count
        );
    }

    if let Some(distribution) = &info.target_distribution {
        section("Target");
        for (label, count) in distribution {
            let share = *count as f64 / info.n_rows.max(1) as f64 * 100.0;
            println!("  {:<30} {:>6} {}", label, count, dim(&format!("{:.1}%", share)));
        }
    }

    println!();
    Ok(())
}

fn print_metrics(f1: f64, accuracy: f64) {
    println!();
    println!("  {:<16} {}", muted("Weighted F1"), format!("{:.4}", f1).white().bold());
    println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", accuracy).white().bold());
}

fn print_prediction(prediction: &Prediction) {
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", prediction.severity.label().white().bold()));
    line_box_empty();
    line_box_sep();
    for severity in Severity::ALL {
        let p = prediction
            .probabilities
            .get(severity.code() as usize)
            .copied()
            .unwrap_or_default();
        line_box(&kv(&format!("{:<16}", severity.label()), &format!("{:.3}", p)));
    }
    line_box_bottom();
    println!();
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "Accident Severity".truecolor(120, 170, 255).bold());
    println!("       {}", dim(&format!("prediction form  ·  v{}", env!("CARGO_PKG_VERSION"))));
    println!();
}

const SKIP: &str = "(leave blank)";

/// Ask for one field; `None` leaves it missing
fn prompt_field(
    theme: &dialoguer::theme::ColorfulTheme,
    predictor: &SeverityPredictor,
    field: &str,
) -> anyhow::Result<Option<String>> {
    use dialoguer::{Input, Select};

    let preprocessor = predictor.preprocessor();
    if let (Some(ColumnType::Categorical), Some(categories)) =
        (preprocessor.column_type(field), preprocessor.categories(field))
    {
        let mut items: Vec<&str> = categories.iter().map(String::as_str).collect();
        items.push(SKIP);
        let sel = Select::with_theme(theme)
            .with_prompt(field)
            .items(&items)
            .default(0)
            .interact_opt()?;
        return Ok(sel.and_then(|i| categories.get(i).cloned()));
    }

    let value: String = Input::with_theme(theme)
        .with_prompt(field)
        .allow_empty(true)
        .interact_text()?;
    Ok(Some(value).filter(|v| !v.trim().is_empty()))
}

/// Prompt for the user-facing fields and predict until the user quits.
/// Prediction failures are shown and the form starts over.
pub fn cmd_interactive(settings: &Settings) -> anyhow::Result<()> {
    use dialoguer::{theme::ColorfulTheme, Confirm};

    print_banner();

    let predictor = match settings
        .pipeline_config()
        .and_then(|config| Ok(SeverityPredictor::from_config(&config)?))
    {
        Ok(p) => p,
        Err(e) => {
            println!("  {} {}", "error".red().bold(), e);
            println!("  {}", dim("run `accident-severity run` to train a model first"));
            println!();
            return Ok(());
        }
    };

    let theme = ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    };

    let expected = predictor.expected_fields();
    loop {
        section("Accident report");

        let mut record = FeatureRecord::new();
        for field in USER_FACING_FIELDS.iter().filter(|f| expected.iter().any(|e| e.as_str() == **f)) {
            if let Some(value) = prompt_field(&theme, &predictor, field)? {
                record.insert(*field, value);
            }
        }

        match predictor.predict_record(&record) {
            Ok(prediction) => print_prediction(&prediction),
            Err(e) => println!("  {} {}", "error".red().bold(), e),
        }

        let again = Confirm::with_theme(&theme)
            .with_prompt("Predict another report")
            .default(true)
            .interact_opt()?;
        if again != Some(true) {
            println!();
            println!("  {}", dim("goodbye"));
            println!();
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "text".red());
        assert_eq!(strip_ansi(&colored), "text");
    }

    #[test]
    fn test_parse_predict_fields() {
        let cli = Cli::parse_from([
            "accident-severity",
            "--artifacts",
            "out",
            "predict",
            "--field",
            "driver_age=18-30",
            "-f",
            "lanes=Undivided Two way",
        ]);
        match cli.command {
            Some(Commands::Predict { fields }) => assert_eq!(fields.len(), 2),
            _ => panic!("expected predict"),
        }
        assert_eq!(cli.settings.artifacts, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_settings_resolve_config() {
        let settings = Settings {
            config: None,
            artifacts: Some(PathBuf::from("runs/a")),
            data: Some(PathBuf::from("reports.csv")),
        };
        let config = settings.pipeline_config().unwrap();
        assert_eq!(config.artifacts_root, PathBuf::from("runs/a"));
        assert_eq!(config.data_transformation.data_path, PathBuf::from("reports.csv"));

        let defaulted = Settings::default().pipeline_config().unwrap();
        assert_eq!(defaulted, PipelineConfig::default());
    }
}
