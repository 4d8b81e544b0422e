//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_log::CsvTradeLog;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::markdown_report::{format_profit_factor, Assessment, MarkdownReport};
use crate::domain::backtest::{self as backtest_engine, BacktestResult};
use crate::domain::bar::count_gaps;
use crate::domain::config::StrategyConfig;
use crate::domain::config_validation::{parse_optional_date, parse_session_time, validate_config};
use crate::domain::error::EngineError;
use crate::domain::session::SessionWindow;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_TRADES_OUTPUT: &str = "backtest_trades.csv";
const DEFAULT_REPORT_OUTPUT: &str = "backtest_report.md";

#[derive(Parser, Debug)]
#[command(
    name = "london-imbalance",
    about = "London-open imbalance strategy backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bar CSV, overrides [backtest] data_file
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        trades_out: Option<PathBuf>,
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file and print the resolved parameters
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the range and gaps of a bar file
    Info {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long, default_value_t = 5)]
        bar_interval_minutes: i64,
    },
}

/// Where the pipeline reads bars from and writes its sinks to.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    pub data: PathBuf,
    pub trades_out: PathBuf,
    pub report: PathBuf,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            trades_out,
            report,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, data)
            } else {
                run_backtest(&config, data, trades_out, report)
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            data,
            bar_interval_minutes,
        } => run_info(&data, bar_interval_minutes),
    }
}

fn fail(err: &EngineError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, EngineError> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn invalid(section: &str, key: &str, reason: &str) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn get_count(adapter: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, EngineError> {
    let value = adapter.get_int("signal", key, default);
    usize::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| invalid("signal", key, "must be at least 1"))
}

/// Validate and assemble the immutable engine configuration.
pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, EngineError> {
    validate_config(adapter)?;
    let defaults = StrategyConfig::default();

    let start = parse_session_time(adapter, "start", "03:00")?;
    let end = parse_session_time(adapter, "end", "06:00")?;
    let offset_hours = adapter.get_double("session", "utc_offset_hours", -5.0);
    let session = SessionWindow::new(start, end, (offset_hours * 60.0).round() as i32);

    Ok(StrategyConfig {
        symbol: adapter
            .get_string("instrument", "symbol")
            .unwrap_or(defaults.symbol),
        pip_size: adapter.get_double("instrument", "pip_size", defaults.pip_size),
        bar_interval_minutes: adapter.get_int(
            "instrument",
            "bar_interval_minutes",
            defaults.bar_interval_minutes,
        ),
        session,
        volume_spike_multiple: adapter.get_double(
            "signal",
            "volume_spike_multiple",
            defaults.volume_spike_multiple,
        ),
        volume_window: get_count(adapter, "volume_window", defaults.volume_window as i64)?,
        min_wick_pips: adapter.get_double("signal", "min_wick_pips", defaults.min_wick_pips),
        min_body_pips: adapter.get_double("signal", "min_body_pips", defaults.min_body_pips),
        ema_period: get_count(adapter, "ema_period", defaults.ema_period as i64)?,
        key_level_tolerance_pips: adapter.get_double(
            "signal",
            "key_level_tolerance_pips",
            defaults.key_level_tolerance_pips,
        ),
        round_number_step_pips: adapter.get_double(
            "signal",
            "round_number_step_pips",
            defaults.round_number_step_pips,
        ),
        require_price_beyond_ema: adapter.get_bool(
            "signal",
            "require_price_beyond_ema",
            defaults.require_price_beyond_ema,
        ),
        stop_loss_pips: adapter.get_double("risk", "stop_loss_pips", defaults.stop_loss_pips),
        target1_pips: adapter.get_double("risk", "target1_pips", defaults.target1_pips),
        target2_pips: adapter.get_double("risk", "target2_pips", defaults.target2_pips),
        partial_close_fraction: adapter.get_double(
            "risk",
            "partial_close_fraction",
            defaults.partial_close_fraction,
        ),
        trail_to_breakeven: adapter.get_bool(
            "risk",
            "trail_to_breakeven",
            defaults.trail_to_breakeven,
        ),
    })
}

/// Resolve input and output paths: command line flags win over the config file.
pub fn resolve_paths(
    adapter: &dyn ConfigPort,
    data: Option<PathBuf>,
    trades_out: Option<PathBuf>,
    report: Option<PathBuf>,
) -> Result<RunPaths, EngineError> {
    let data = data
        .or_else(|| adapter.get_string("backtest", "data_file").map(PathBuf::from))
        .ok_or_else(|| EngineError::ConfigMissing {
            section: "backtest".into(),
            key: "data_file".into(),
        })?;
    let trades_out = trades_out.unwrap_or_else(|| {
        PathBuf::from(
            adapter
                .get_string("backtest", "trades_output")
                .unwrap_or_else(|| DEFAULT_TRADES_OUTPUT.to_string()),
        )
    });
    let report = report.unwrap_or_else(|| {
        PathBuf::from(
            adapter
                .get_string("backtest", "report_output")
                .unwrap_or_else(|| DEFAULT_REPORT_OUTPUT.to_string()),
        )
    });

    Ok(RunPaths {
        data,
        trades_out,
        report,
        start_date: parse_optional_date(adapter, "start_date")?,
        end_date: parse_optional_date(adapter, "end_date")?,
    })
}

fn run_backtest(
    config_path: &Path,
    data: Option<PathBuf>,
    trades_out: Option<PathBuf>,
    report: Option<PathBuf>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let config = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let paths = match resolve_paths(&adapter, data, trades_out, report) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(paths.data.clone());
    let result = match run_backtest_pipeline(&data_port, &config, paths.start_date, paths.end_date)
    {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_summary(&result, &config);

    let sinks: [(&dyn ReportPort, &Path); 2] = [
        (&CsvTradeLog, paths.trades_out.as_path()),
        (&MarkdownReport, paths.report.as_path()),
    ];
    for (sink, path) in sinks {
        if let Err(e) = sink.write(&result, &config, path) {
            return fail(&e);
        }
    }
    eprintln!("\nTrades written to: {}", paths.trades_out.display());
    eprintln!("Report written to: {}", paths.report.display());
    ExitCode::SUCCESS
}

/// Load bars through `data_port` and run the engine over them.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &StrategyConfig,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<BacktestResult, EngineError> {
    info!("loading bars from {}", data_port.source_name());
    let bars = data_port.fetch_bars(start_date, end_date)?;
    if bars.is_empty() {
        return Err(EngineError::NoData {
            source_name: data_port.source_name(),
        });
    }
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        info!(
            "running {} over {} bars, {} to {}",
            config.symbol,
            bars.len(),
            first.timestamp,
            last.timestamp
        );
    }
    backtest_engine::run_backtest(&bars, config)
}

pub fn print_summary(result: &BacktestResult, config: &StrategyConfig) {
    let s = &result.summary;
    eprintln!("\n=== {} Results ===", config.symbol);
    eprintln!("Bars Scanned:     {}", result.bars_scanned);
    eprintln!("Session Bars:     {}", result.session_bars_checked);
    eprintln!("Data Gaps:        {}", result.gaps_detected);
    eprintln!("Total Trades:     {}", s.trade_count);
    eprintln!("Win Rate:         {:.1}%", s.win_rate * 100.0);
    eprintln!("Profit Factor:    {}", format_profit_factor(s.profit_factor));
    eprintln!("Total Pips:       {:+.1}", s.total_pips);
    eprintln!("Expectancy:       {:+.2} pips/trade", s.expectancy_pips);
    eprintln!("Avg Win / Loss:   {:.1} / {:.1} pips", s.average_win_pips, s.average_loss_pips);
    eprintln!("Assessment:       {}", Assessment::from_summary(s));

    if !result.trades.is_empty() {
        eprintln!("\n=== Trades ===");
        for t in &result.trades {
            eprintln!(
                "  {}  {:<5} {:.5} -> {:.5}  {:<11} {:+.1}",
                t.entry_timestamp(),
                t.direction(),
                t.entry_price(),
                t.exit_price,
                t.exit_reason,
                t.pnl_pips
            );
        }
    }
}

fn print_config(config: &StrategyConfig) {
    eprintln!("\nInstrument:");
    eprintln!("  symbol: {}", config.symbol);
    eprintln!("  pip_size: {}", config.pip_size);
    eprintln!("  bar_interval_minutes: {}", config.bar_interval_minutes);
    eprintln!("\nSession (local, UTC offset {} min):", config.session.utc_offset_minutes);
    eprintln!(
        "  {} - {}",
        config.session.start.format("%H:%M"),
        config.session.end.format("%H:%M")
    );
    eprintln!("\nSignal:");
    eprintln!(
        "  volume spike: {}x mean of {} bars",
        config.volume_spike_multiple, config.volume_window
    );
    eprintln!(
        "  min wick / body: {} / {} pips",
        config.min_wick_pips, config.min_body_pips
    );
    eprintln!(
        "  key levels: every {} pips or prior-day high/low, within {} pips",
        config.round_number_step_pips, config.key_level_tolerance_pips
    );
    eprintln!(
        "  EMA period: {}{}",
        config.ema_period,
        if config.require_price_beyond_ema {
            ", price must be beyond EMA"
        } else {
            ""
        }
    );
    eprintln!("\nRisk:");
    eprintln!(
        "  stop / target1 / target2: {} / {} / {} pips",
        config.stop_loss_pips, config.target1_pips, config.target2_pips
    );
    eprintln!(
        "  partial close: {:.0}%, break-even trail: {}",
        config.partial_close_fraction * 100.0,
        config.trail_to_breakeven
    );
}

pub fn run_dry_run(config_path: &Path, data: Option<PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let config = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let paths = match resolve_paths(&adapter, data, None, None) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    eprintln!("Config validated successfully");
    print_config(&config);

    eprintln!("\nData:");
    eprintln!("  file: {}", paths.data.display());
    if !paths.data.exists() {
        warn!("data file {} does not exist yet", paths.data.display());
    }
    eprintln!("  trades output: {}", paths.trades_out.display());
    eprintln!("  report output: {}", paths.report.display());

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    match build_strategy_config(&adapter) {
        Ok(config) => {
            print_config(&config);
            eprintln!("\nConfiguration is valid");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_info(data: &Path, bar_interval_minutes: i64) -> ExitCode {
    let adapter = CsvAdapter::new(data.to_path_buf());
    let range = match adapter.get_data_range() {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    let Some((first, last, count)) = range else {
        return fail(&EngineError::NoData {
            source_name: adapter.source_name(),
        });
    };

    let bars = match adapter.fetch_bars(None, None) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    println!("{}: {} bars, {} to {}", adapter.source_name(), count, first, last);
    println!(
        "data gaps (> {} min): {}",
        bar_interval_minutes,
        count_gaps(&bars, bar_interval_minutes)
    );
    ExitCode::SUCCESS
}
