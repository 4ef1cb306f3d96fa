//! Parallel grid search over strategy parameters.
//!
//! Tasks are enumerated mode -> direction -> leverage -> fast -> slow and run
//! on a bounded rayon pool. Each task yields an explicit `TaskOutcome`; a
//! failing task never aborts its siblings.

use std::fmt;
use std::str::FromStr;

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use super::backtest::{SimulationResult, run_backtest};
use super::error::TrendgridError;
use super::params::{SimulationParams, StrategyMode, TradeDirection};
use super::price_series::PriceSeries;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TOP_N: usize = 10;

/// Placeholder averages for buy_and_hold candidates; unused by its signals.
const BUY_AND_HOLD_MA: (usize, usize) = (20, 60);

/// Candidates at or beyond these levels are treated as liquidated.
const DEGENERATE_MDD: f64 = 99.0;
const DEGENERATE_RETURN: f64 = -99.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    TotalReturn,
    Cagr,
    Mdd,
    SharpeRatio,
    CalmarRatio,
    TotalTrades,
    WinRate,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::TotalReturn => "total_return",
            SortKey::Cagr => "cagr",
            SortKey::Mdd => "mdd",
            SortKey::SharpeRatio => "sharpe_ratio",
            SortKey::CalmarRatio => "calmar_ratio",
            SortKey::TotalTrades => "total_trades",
            SortKey::WinRate => "win_rate",
        }
    }

    pub fn value(&self, summary: &OptimizationSummary) -> f64 {
        match self {
            SortKey::TotalReturn => summary.total_return,
            SortKey::Cagr => summary.cagr,
            SortKey::Mdd => summary.mdd,
            SortKey::SharpeRatio => summary.sharpe_ratio,
            SortKey::CalmarRatio => summary.calmar_ratio,
            SortKey::TotalTrades => summary.total_trades as f64,
            SortKey::WinRate => summary.win_rate,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "total_return" => Ok(SortKey::TotalReturn),
            "cagr" => Ok(SortKey::Cagr),
            "mdd" => Ok(SortKey::Mdd),
            "sharpe_ratio" => Ok(SortKey::SharpeRatio),
            "calmar_ratio" => Ok(SortKey::CalmarRatio),
            "total_trades" => Ok(SortKey::TotalTrades),
            "win_rate" => Ok(SortKey::WinRate),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// The parameter space plus the fixed settings shared by every candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub strategy_modes: Vec<StrategyMode>,
    pub directions: Vec<TradeDirection>,
    pub ma_fast_range: Vec<usize>,
    pub ma_slow_range: Vec<usize>,
    pub leverage_range: Vec<f64>,
    pub top_n: usize,
    pub sort_by: SortKey,
    pub workers: usize,
    /// Cash, costs, rebalance/yield switches and date window for every task.
    pub base: SimulationParams,
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec {
            strategy_modes: vec![StrategyMode::BuyAndHold, StrategyMode::SingleMa, StrategyMode::DualMa],
            directions: vec![TradeDirection::LongOnly, TradeDirection::LongShort],
            ma_fast_range: vec![5, 10, 20, 30, 60],
            ma_slow_range: vec![60, 120, 200],
            leverage_range: vec![1.0, 2.0, 3.0],
            top_n: DEFAULT_TOP_N,
            sort_by: SortKey::SharpeRatio,
            workers: DEFAULT_WORKERS,
            base: SimulationParams::default(),
        }
    }
}

impl GridSpec {
    pub fn validate(&self) -> Result<(), TrendgridError> {
        let invalid = |reason: &str| Err(TrendgridError::InvalidParams { reason: reason.to_string() });

        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        if self.top_n == 0 {
            return invalid("top_n must be at least 1");
        }
        if self.strategy_modes.is_empty() {
            return invalid("no strategy modes to search");
        }
        if self.leverage_range.is_empty() {
            return invalid("leverage range is empty");
        }
        let needs_ma = self.strategy_modes.iter().any(|m| *m != StrategyMode::BuyAndHold);
        if needs_ma && (self.directions.is_empty() || self.ma_fast_range.is_empty()) {
            return invalid("moving-average modes need at least one direction and one fast period");
        }
        if self.strategy_modes.contains(&StrategyMode::DualMa) && self.ma_slow_range.is_empty() {
            return invalid("dual_ma needs at least one slow period");
        }
        Ok(())
    }
}

/// One candidate: the full parameters plus the labels it is reported under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationTask {
    pub strategy: StrategyMode,
    pub direction: TradeDirection,
    pub ma_fast: usize,
    pub ma_slow: Option<usize>,
    pub leverage: f64,
    #[serde(skip)]
    pub params: SimulationParams,
}

impl fmt::Display for OptimizationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} fast={}", self.strategy, self.direction, self.ma_fast)?;
        if let Some(slow) = self.ma_slow {
            write!(f, " slow={slow}")?;
        }
        write!(f, " lev={}x", self.leverage)
    }
}

pub fn enumerate_tasks(spec: &GridSpec) -> Vec<OptimizationTask> {
    let mut tasks = Vec::new();
    let mut seen_modes = Vec::new();

    for &mode in &spec.strategy_modes {
        if seen_modes.contains(&mode) {
            continue;
        }
        seen_modes.push(mode);

        let params_for = |direction: TradeDirection, leverage: f64, fast: usize, slow: usize| SimulationParams {
            strategy_mode: mode,
            trade_direction: direction,
            leverage,
            ma_fast: fast,
            ma_slow: slow,
            ..spec.base.clone()
        };

        match mode {
            StrategyMode::BuyAndHold => {
                for &leverage in &spec.leverage_range {
                    let (fast, slow) = BUY_AND_HOLD_MA;
                    tasks.push(OptimizationTask {
                        strategy: mode,
                        direction: TradeDirection::LongOnly,
                        ma_fast: 0,
                        ma_slow: None,
                        leverage,
                        params: params_for(TradeDirection::LongOnly, leverage, fast, slow),
                    });
                }
            }
            StrategyMode::SingleMa => {
                for &direction in &spec.directions {
                    for &leverage in &spec.leverage_range {
                        for &fast in &spec.ma_fast_range {
                            tasks.push(OptimizationTask {
                                strategy: mode,
                                direction,
                                ma_fast: fast,
                                ma_slow: None,
                                leverage,
                                params: params_for(direction, leverage, fast, fast),
                            });
                        }
                    }
                }
            }
            StrategyMode::DualMa => {
                for &direction in &spec.directions {
                    for &leverage in &spec.leverage_range {
                        for &fast in &spec.ma_fast_range {
                            for &slow in spec.ma_slow_range.iter().filter(|&&slow| slow > fast) {
                                tasks.push(OptimizationTask {
                                    strategy: mode,
                                    direction,
                                    ma_fast: fast,
                                    ma_slow: Some(slow),
                                    leverage,
                                    params: params_for(direction, leverage, fast, slow),
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    tasks
}

/// Ranked row: labels plus the scalar metrics, without curve or trade log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationSummary {
    pub strategy: StrategyMode,
    pub direction: TradeDirection,
    pub ma_fast: usize,
    pub ma_slow: Option<usize>,
    pub leverage: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub mdd: f64,
    pub sharpe_ratio: f64,
    pub calmar_ratio: f64,
    pub total_trades: usize,
    pub win_rate: f64,
}

impl OptimizationSummary {
    fn new(task: &OptimizationTask, result: &SimulationResult) -> Self {
        OptimizationSummary {
            strategy: task.strategy,
            direction: task.direction,
            ma_fast: task.ma_fast,
            ma_slow: task.ma_slow,
            leverage: task.leverage,
            total_return: result.total_return,
            cagr: result.cagr,
            mdd: result.mdd,
            sharpe_ratio: result.sharpe_ratio,
            calmar_ratio: result.calmar_ratio,
            total_trades: result.total_trades,
            win_rate: result.win_rate,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.mdd >= DEGENERATE_MDD || self.total_return <= DEGENERATE_RETURN
    }
}

#[derive(Debug)]
pub enum SkipReason {
    Failed(TrendgridError),
    Degenerate { mdd: f64, total_return: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Failed(err) => write!(f, "failed: {err}"),
            SkipReason::Degenerate { mdd, total_return } => {
                write!(f, "liquidated: mdd {mdd:.2}%, total return {total_return:.2}%")
            }
        }
    }
}

#[derive(Debug)]
pub struct SkippedTask {
    pub task: OptimizationTask,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub enum TaskOutcome {
    Completed(OptimizationSummary),
    Skipped(SkippedTask),
}

pub fn run_task(series: &PriceSeries, task: &OptimizationTask) -> TaskOutcome {
    let skipped = |reason| {
        TaskOutcome::Skipped(SkippedTask {
            task: task.clone(),
            reason,
        })
    };

    match run_backtest(series, &task.params) {
        Ok(result) => {
            let summary = OptimizationSummary::new(task, &result);
            if summary.is_degenerate() {
                skipped(SkipReason::Degenerate {
                    mdd: summary.mdd,
                    total_return: summary.total_return,
                })
            } else {
                TaskOutcome::Completed(summary)
            }
        }
        Err(err) => skipped(SkipReason::Failed(err)),
    }
}

#[derive(Debug)]
pub struct GridSearchReport {
    /// Best first by the requested key, at most `top_n` rows.
    pub ranked: Vec<OptimizationSummary>,
    pub skipped: Vec<SkippedTask>,
    pub evaluated: usize,
}

/// Stable descending sort; equal keys keep enumeration order.
pub fn rank(mut candidates: Vec<OptimizationSummary>, sort_by: SortKey, top_n: usize) -> Vec<OptimizationSummary> {
    candidates.sort_by(|a, b| sort_by.value(b).total_cmp(&sort_by.value(a)));
    candidates.truncate(top_n);
    candidates
}

pub fn run_grid_search(series: &PriceSeries, spec: &GridSpec) -> Result<GridSearchReport, TrendgridError> {
    spec.validate()?;
    let tasks = enumerate_tasks(spec);
    info!("grid search: {} tasks on {} workers", tasks.len(), spec.workers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(spec.workers)
        .build()
        .map_err(|e| TrendgridError::WorkerPool { reason: e.to_string() })?;

    // collect() on an indexed parallel iterator keeps enumeration order
    let outcomes: Vec<TaskOutcome> = pool.install(|| tasks.par_iter().map(|task| run_task(series, task)).collect());

    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            TaskOutcome::Completed(summary) => candidates.push(summary),
            TaskOutcome::Skipped(skip) => {
                warn!("skipping {}: {}", skip.task, skip.reason);
                skipped.push(skip);
            }
        }
    }

    let evaluated = tasks.len();
    info!(
        "grid search done: {} candidates, {} skipped, keeping top {} by {}",
        candidates.len(),
        skipped.len(),
        spec.top_n,
        spec.sort_by
    );

    Ok(GridSearchReport {
        ranked: rank(candidates, spec.sort_by, spec.top_n),
        skipped,
        evaluated,
    })
}
