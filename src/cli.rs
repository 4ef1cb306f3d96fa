//! CLI definition and dispatch.

use chrono::Local;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_strategy_store::JsonStrategyStore;
use crate::domain::backtest::{SimulationResult, run_backtest};
use crate::domain::config_validation::{
    read_bool, read_date, read_list, read_value, validate_backtest_config, validate_data_config,
    validate_optimize_config, validate_strategy_config,
};
use crate::domain::error::TrendgridError;
use crate::domain::optimizer::{GridSearchReport, GridSpec, enumerate_tasks, run_grid_search};
use crate::domain::params::{SimulationParams, StrategyMode};
use crate::domain::strategy::SavedStrategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::strategy_store_port::StrategyStore;

#[derive(Parser, Debug)]
#[command(name = "trendgrid", about = "Moving-average strategy backtester and grid-search optimizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the [strategy] section against one asset
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: Option<String>,
        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Save the result to the strategy store under this name
        #[arg(long)]
        save: Option<String>,
    },
    /// Grid-search the [optimize] parameter space
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List assets with price files in the data directory
    ListAssets {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List saved strategies, newest first
    ListStrategies {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Delete a saved strategy by id
    DeleteStrategy {
        #[arg(short, long)]
        config: PathBuf,
        id: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            asset,
            output,
            save,
        } => run_backtest_command(&config, asset.as_deref(), output.as_deref(), save.as_deref()),
        Command::Optimize { config, asset, output } => {
            run_optimize(&config, asset.as_deref(), output.as_deref())
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListAssets { config } => run_list_assets(&config),
        Command::ListStrategies { config } => run_list_strategies(&config),
        Command::DeleteStrategy { config, id } => run_delete_strategy(&config, &id),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TrendgridError> {
    FileConfigAdapter::from_file(path)
}

pub fn build_simulation_params(config: &dyn ConfigPort) -> Result<SimulationParams, TrendgridError> {
    let d = SimulationParams::default();
    Ok(SimulationParams {
        initial_cash: read_value(config, "backtest", "initial_cash", d.initial_cash)?,
        leverage: read_value(config, "backtest", "leverage", d.leverage)?,
        fee_rate: read_value(config, "backtest", "fee_rate", d.fee_rate)?,
        slippage: read_value(config, "backtest", "slippage", d.slippage)?,
        strategy_mode: read_value(config, "strategy", "mode", d.strategy_mode)?,
        ma_fast: read_value(config, "strategy", "ma_fast", d.ma_fast)?,
        ma_slow: read_value(config, "strategy", "ma_slow", d.ma_slow)?,
        trade_direction: read_value(config, "strategy", "direction", d.trade_direction)?,
        enable_rebalance: read_bool(config, "backtest", "enable_rebalance", d.enable_rebalance)?,
        enable_yield: read_bool(config, "backtest", "enable_yield", d.enable_yield)?,
        annual_yield: read_value(config, "backtest", "annual_yield", d.annual_yield)?,
        start_date: read_date(config, "backtest", "start_date")?,
        end_date: read_date(config, "backtest", "end_date")?,
    })
}

pub fn build_grid_spec(config: &dyn ConfigPort, base: SimulationParams) -> Result<GridSpec, TrendgridError> {
    let d = GridSpec::default();
    Ok(GridSpec {
        strategy_modes: read_list(config, "optimize", "strategy_modes", d.strategy_modes)?,
        directions: read_list(config, "optimize", "directions", d.directions)?,
        ma_fast_range: read_list(config, "optimize", "ma_fast_range", d.ma_fast_range)?,
        ma_slow_range: read_list(config, "optimize", "ma_slow_range", d.ma_slow_range)?,
        leverage_range: read_list(config, "optimize", "leverage_range", d.leverage_range)?,
        top_n: read_value(config, "optimize", "top_n", d.top_n)?,
        sort_by: read_value(config, "optimize", "sort_by", d.sort_by)?,
        workers: read_value(config, "optimize", "workers", d.workers)?,
        base,
    })
}

pub fn resolve_asset(asset_override: Option<&str>, config: &dyn ConfigPort) -> Result<String, TrendgridError> {
    asset_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "asset"))
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| TrendgridError::ConfigMissing {
            section: "data".into(),
            key: "asset".into(),
        })
}

fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, TrendgridError> {
    validate_data_config(config)?;
    Ok(PathBuf::from(config.get_string("data", "dir").unwrap_or_default().trim()))
}

/// `[store] path`, defaulting to `strategies.json` in the data directory.
pub fn store_path(config: &dyn ConfigPort) -> Result<PathBuf, TrendgridError> {
    match config.get_string("store", "path").filter(|p| !p.trim().is_empty()) {
        Some(path) => Ok(PathBuf::from(path.trim())),
        None => Ok(data_dir(config)?.join("strategies.json")),
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), TrendgridError> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("\nResult written to: {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn print_summary(asset: &str, params: &SimulationParams, result: &SimulationResult) {
    eprintln!("\n=== {} | {} {} ===", asset, params.strategy_mode, params.trade_direction);
    eprintln!("Total Return:     {:.2}%", result.total_return);
    eprintln!("CAGR:             {:.2}%", result.cagr);
    eprintln!("Max Drawdown:     -{:.2}%", result.mdd);
    if let (Some(start), Some(end)) = (result.mdd_start, result.mdd_end) {
        eprintln!("  Peak -> Trough: {} -> {}", start, end);
    }
    eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", result.sortino_ratio);
    eprintln!("Calmar Ratio:     {:.2}", result.calmar_ratio);
    eprintln!("Total Trades:     {}", result.total_trades);
    eprintln!("Win Rate:         {:.2}%", result.win_rate);
    eprintln!("Profit Factor:    {:.2}", result.profit_factor);
}

fn run_backtest_command(
    config_path: &Path,
    asset_override: Option<&str>,
    output_path: Option<&Path>,
    save_name: Option<&str>,
) -> Result<(), TrendgridError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;

    let params = build_simulation_params(&config)?;
    let asset = resolve_asset(asset_override, &config)?;
    let data = CsvPriceAdapter::new(data_dir(&config)?);
    let series = data.fetch_series(&asset)?;

    eprintln!(
        "Running {} {} on {} ({} rows)",
        params.strategy_mode,
        params.trade_direction,
        asset,
        series.len()
    );
    let result = run_backtest(&series, &params)?;
    print_summary(&asset, &params, &result);

    write_output(output_path, &serde_json::to_string_pretty(&result)?)?;

    if let Some(name) = save_name {
        let store = JsonStrategyStore::new(store_path(&config)?);
        let saved = SavedStrategy::from_backtest(name, &asset, &params, &result, Local::now().naive_local());
        let id = store.save(&saved)?;
        eprintln!("Saved strategy: {id}");
    }
    Ok(())
}

fn optimize_json(asset: &str, spec: &GridSpec, report: &GridSearchReport) -> serde_json::Value {
    let skipped: Vec<_> = report
        .skipped
        .iter()
        .map(|s| {
            json!({
                "strategy": s.task.strategy,
                "direction": s.task.direction,
                "ma_fast": s.task.ma_fast,
                "ma_slow": s.task.ma_slow,
                "leverage": s.task.leverage,
                "reason": s.reason.to_string(),
            })
        })
        .collect();
    json!({
        "asset": asset,
        "sort_by": spec.sort_by,
        "evaluated": report.evaluated,
        "results": report.ranked,
        "skipped": skipped,
    })
}

fn run_optimize(config_path: &Path, asset_override: Option<&str>, output_path: Option<&Path>) -> Result<(), TrendgridError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    validate_optimize_config(&config)?;

    let spec = build_grid_spec(&config, build_simulation_params(&config)?)?;
    let asset = resolve_asset(asset_override, &config)?;
    let data = CsvPriceAdapter::new(data_dir(&config)?);
    let series = data.fetch_series(&asset)?;

    eprintln!(
        "Optimizing {} ({} rows) on {} workers, ranking by {}",
        asset,
        series.len(),
        spec.workers,
        spec.sort_by
    );
    let report = run_grid_search(&series, &spec)?;

    eprintln!(
        "\n=== Top {} of {} candidates ({} skipped) ===",
        report.ranked.len(),
        report.evaluated,
        report.skipped.len()
    );
    for (rank, row) in report.ranked.iter().enumerate() {
        let slow = row.ma_slow.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        eprintln!(
            "{:>3}. {:<12} {:<10} fast={:<3} slow={:<3} {:.1}x  return {:>8.2}%  mdd {:>6.2}%  sharpe {:>5.2}",
            rank + 1,
            row.strategy,
            row.direction,
            row.ma_fast,
            slow,
            row.leverage,
            row.total_return,
            row.mdd,
            row.sharpe_ratio
        );
    }

    let json = optimize_json(&asset, &spec, &report);
    write_output(output_path, &serde_json::to_string_pretty(&json)?)
}

fn run_validate(config_path: &Path) -> Result<(), TrendgridError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;
    validate_optimize_config(&config)?;

    let params = build_simulation_params(&config)?;
    params.validate()?;
    let spec = build_grid_spec(&config, params.clone())?;
    spec.validate()?;

    eprintln!("\nStrategy: {} {}", params.strategy_mode, params.trade_direction);
    if params.strategy_mode != StrategyMode::BuyAndHold {
        eprintln!("  ma_fast = {}, ma_slow = {}", params.ma_fast, params.ma_slow);
    }
    eprintln!(
        "  cash {} | leverage {}x | fee {} | slippage {}",
        params.initial_cash, params.leverage, params.fee_rate, params.slippage
    );
    eprintln!(
        "Optimize: {} tasks, top {} by {} on {} workers",
        enumerate_tasks(&spec).len(),
        spec.top_n,
        spec.sort_by,
        spec.workers
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_assets(config_path: &Path) -> Result<(), TrendgridError> {
    let config = load_config(config_path)?;
    let data = CsvPriceAdapter::new(data_dir(&config)?);
    let assets = data.list_assets()?;

    if assets.is_empty() {
        eprintln!("No price files found");
    } else {
        for asset in &assets {
            println!("{}", asset);
        }
        eprintln!("{} assets found", assets.len());
    }
    Ok(())
}

fn run_list_strategies(config_path: &Path) -> Result<(), TrendgridError> {
    let config = load_config(config_path)?;
    let store = JsonStrategyStore::new(store_path(&config)?);
    let strategies = store.list()?;

    println!("{}", serde_json::to_string_pretty(&strategies)?);
    eprintln!("{} saved strategies", strategies.len());
    Ok(())
}

fn run_delete_strategy(config_path: &Path, id: &str) -> Result<(), TrendgridError> {
    let config = load_config(config_path)?;
    let store = JsonStrategyStore::new(store_path(&config)?);
    store.delete(id)?;
    eprintln!("Deleted strategy: {id}");
    Ok(())
}
