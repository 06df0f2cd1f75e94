//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_model_store::JsonModelStore;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{run_backtests, BacktestReport};
use crate::domain::config_validation::AppConfig;
use crate::domain::error::MltraderError;
use crate::domain::features::{build_features, PreparedData};
use crate::domain::model::default_roster;
use crate::domain::ohlcv::split_chronological;
use crate::domain::training::{run_training, TrainingData, TrainingMode, TrainingReport};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "mltrader",
    about = "Indicator features, model training and prediction backtests"
)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build features, train the model roster and backtest its predictions
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Train models one after another instead of on a worker pool
        #[arg(long)]
        sequential: bool,
        /// JSON report path, overrides [output] results_path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build the feature table for the whole series
    Features {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the prepared table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);

    let result = match cli.command {
        Command::Run {
            config,
            sequential,
            output,
        } => run_pipeline_command(&config, sequential, output),
        Command::Features { config, output } => run_features(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Installs the stderr fmt subscriber. A second call is a no-op.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<AppConfig, MltraderError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    AppConfig::from_port(&adapter)
}

/// Everything one `run` produces.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub train: PreparedData,
    pub test: PreparedData,
    pub training: TrainingReport,
    pub backtest: BacktestReport,
}

/// Bars → split → features per half → training → backtest on the test half.
pub fn run_pipeline(
    config: &AppConfig,
    data_port: &dyn DataPort,
    mode: TrainingMode,
) -> Result<PipelineOutcome, MltraderError> {
    let bars = data_port.fetch_bars()?;
    info!(bars = bars.len(), "bars loaded");

    let (train_bars, test_bars) = split_chronological(&bars, config.data.train_fraction)?;
    let train = build_features(train_bars, &config.features)?;
    let test = build_features(test_bars, &config.features)?;
    info!(
        train_rows = train.len(),
        test_rows = test.len(),
        features = train.features.n_features(),
        "features prepared"
    );

    let x_train = train.features.to_matrix();
    let x_test = test.features.to_matrix();
    let data =
        TrainingData::new(&x_train, &train.labels).with_validation(&x_test, &test.labels);
    let training = run_training(default_roster(config.training.seed), data, mode)?;

    let backtest = run_backtests(
        &training.predictions(),
        &test.labels,
        &test.closes,
        &config.backtest,
    )?;

    Ok(PipelineOutcome {
        train,
        test,
        training,
        backtest,
    })
}

fn run_pipeline_command(
    config_path: &Path,
    sequential: bool,
    output: Option<PathBuf>,
) -> Result<(), MltraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    let data_port = CsvAdapter::new(config.require_data_path()?.clone());

    let mode = if sequential {
        TrainingMode::Sequential
    } else {
        config.training.mode
    };

    let outcome = run_pipeline(&config, &data_port, mode)?;
    eprintln!(
        "Features: {} columns, {} train rows, {} test rows",
        outcome.train.features.n_features(),
        outcome.train.len(),
        outcome.test.len()
    );

    print_training_summary(&outcome.training);
    print_backtest_summary(&outcome.backtest);
    print_comparison(&outcome.backtest);

    if let Some(path) = output.or_else(|| config.output.results_path.clone()) {
        JsonReportAdapter::new().write(&outcome.backtest, &path)?;
        eprintln!("\nReport written to {}", path.display());
    }

    if let Some(dir) = &config.output.models_dir {
        let store = JsonModelStore::new(dir.clone());
        let failed = outcome.training.save_models(&store);
        for (model, e) in &failed {
            eprintln!("warning: could not save {}: {}", model, e);
        }
        eprintln!(
            "Saved {} models to {}",
            outcome.training.success_count() - failed.len(),
            dir.display()
        );
    }

    Ok(())
}

fn print_training_summary(report: &TrainingReport) {
    eprintln!("\n=== Training ===");
    for (id, result) in &report.results {
        if result.success {
            eprintln!("  {:<16} ok      {:>8} ms", id, result.elapsed.as_millis());
        } else {
            eprintln!(
                "  {:<16} FAILED  {}",
                id,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    eprintln!(
        "  {}/{} models trained in {} ms",
        report.success_count(),
        report.results.len(),
        report.total_elapsed.as_millis()
    );
}

fn print_backtest_summary(report: &BacktestReport) {
    for (id, r) in &report.results {
        eprintln!("\n=== {} ===", id);
        eprintln!("Accuracy:         {:.4}", r.accuracy);
        eprintln!("Precision:        {:.4}", r.precision);
        eprintln!("Recall:           {:.4}", r.recall);
        eprintln!("F1 Score:         {:.4}", r.f1_score);
        eprintln!("Final Capital:    {:.2}", r.final_capital);
        eprintln!("Total Return:     {:.2}%", r.total_return_pct);
        eprintln!("Annualized:       {:.2}%", r.annualized_return_pct);
        eprintln!("Sharpe Ratio:     {:.2}", r.sharpe_ratio);
        eprintln!("Max Drawdown:     {:.2}%", r.max_drawdown_pct);
        eprintln!("Win Rate:         {:.1}%", r.win_rate_pct);
        eprintln!("Total Trades:     {}", r.total_trades);
        eprintln!("Buy & Hold:       {:.2}%", r.buy_hold_return_pct);
        eprintln!("vs Buy & Hold:    {:+.2}%", r.vs_buy_hold * 100.0);
    }
    for (id, reason) in &report.failures {
        eprintln!("\nwarning: no backtest for {} ({})", id, reason);
    }
}

fn print_comparison(report: &BacktestReport) {
    if report.results.is_empty() {
        eprintln!("\nNo models to compare");
        return;
    }

    eprintln!("\n=== Model Comparison ===");
    eprintln!(
        "  {:<16} {:>9} {:>11} {:>8} {:>10}",
        "model", "accuracy", "return %", "sharpe", "max dd %"
    );
    for (id, r) in &report.results {
        eprintln!(
            "  {:<16} {:>9.4} {:>11.2} {:>8.2} {:>10.2}",
            id, r.accuracy, r.total_return_pct, r.sharpe_ratio, r.max_drawdown_pct
        );
    }

    let best = &report.best;
    for (label, entry) in [
        ("accuracy", &best.accuracy),
        ("sharpe", &best.sharpe_ratio),
        ("total return", &best.total_return),
    ] {
        if let Some(b) = entry {
            eprintln!("  Best {:<13} {} ({:.4})", format!("{}:", label), b.model_id, b.value);
        }
    }
}

fn run_features(config_path: &Path, output: Option<&Path>) -> Result<(), MltraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    let bars = CsvAdapter::new(config.require_data_path()?.clone()).fetch_bars()?;
    let prepared = build_features(&bars, &config.features)?;

    let ups = prepared.labels.iter().filter(|&&l| l == 1).count();
    eprintln!("Bars:             {}", bars.len());
    eprintln!("Rows:             {}", prepared.len());
    eprintln!("Dropped rows:     {}", prepared.dropped_rows);
    eprintln!("Features:         {}", prepared.features.n_features());
    eprintln!("Up labels:        {} of {}", ups, prepared.len());

    if let Some(path) = output {
        let file = fs::File::create(path).map_err(|e| MltraderError::Report {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        prepared.to_csv(BufWriter::new(file))?;
        eprintln!("Feature table written to {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), MltraderError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;

    match &config.data.path {
        Some(path) => eprintln!("  data:       {}", path.display()),
        None => eprintln!("  data:       (not set, required for run and features)"),
    }
    eprintln!(
        "  lookback:   {} bars (minimum input {})",
        config.features.longest_lookback(),
        config.features.minimum_bars()
    );
    eprintln!("  training:   {:?}, seed {}", config.training.mode, config.training.seed);
    eprintln!(
        "  backtest:   capital {:.2}, commission {}",
        config.backtest.initial_capital, config.backtest.commission
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_flags() {
        let cli = Cli::try_parse_from([
            "mltrader",
            "--log-level",
            "debug",
            "run",
            "--config",
            "cfg.ini",
            "--sequential",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Run {
                config,
                sequential,
                output,
            } => {
                assert_eq!(config, PathBuf::from("cfg.ini"));
                assert!(sequential);
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn log_level_is_global() {
        let cli =
            Cli::try_parse_from(["mltrader", "validate", "-c", "a.ini", "--log-level", "info"])
                .unwrap();
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn config_is_required() {
        assert!(Cli::try_parse_from(["mltrader", "features"]).is_err());
    }
}
