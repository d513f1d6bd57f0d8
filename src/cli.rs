//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_task_store::MemoryTaskStore;
use crate::domain::condition_parser::{format_ladder, parse_ladder};
use crate::domain::condition_registry::ConditionRegistry;
use crate::domain::config_validation::{
    build_data_config, build_goal_config, build_indicator_config, build_ladder_config,
    validate_data_config, validate_goal_config, validate_indicator_config, DataConfig,
};
use crate::domain::error::LadderError;
use crate::domain::goal::Goal;
use crate::domain::indicator::compute_indicator_frame;
use crate::domain::job_queue::JobQueue;
use crate::domain::metrics::{AggregateSummary, BacktestSummary};
use crate::domain::pipeline::{fetch_available, goals_for, BacktestPipeline};
use crate::domain::price_bar::Granularity;
use crate::domain::signal::{
    reversal_signals, SignalEvent, REVERSAL_DISPERSION_THRESHOLD, REVERSAL_RUN_THRESHOLD,
};
use crate::domain::strategy::Strategy;
use crate::domain::task::{TaskParams, TaskRequest, TaskResult, TaskStatus};
use crate::domain::universe::resolve_universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "ladderquant", about = "Staged-condition ladder backtester")]
pub struct Cli {
    /// Debug-level logging for ladderquant
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the ladder strategy over the configured universe
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated codes, overriding [backtest]
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Detect swing goals on daily bars
    Goals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List regime reversal buy points
    Reversals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List the known condition keys
    Conditions,
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest { config, code, json } => run_backtest(&config, code.as_deref(), json),
        Command::Goals { config, code, json } => run_goals(&config, code.as_deref(), json),
        Command::Reversals { config, code, json } => {
            run_reversals(&config, code.as_deref(), json)
        }
        Command::Conditions => {
            run_conditions();
            Ok(())
        }
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, LadderError> {
    log::info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Build the ladder, printing the failing input with a caret on parse errors.
pub fn load_strategy(config: &dyn ConfigPort) -> Result<Strategy, LadderError> {
    build_ladder_config(config).inspect_err(|e| {
        if let LadderError::ConditionParse(parse_error) = e {
            for key in ["buy_conditions", "sell_conditions"] {
                if let Some(input) = config.get_string("strategy", key) {
                    if parse_ladder(&input).is_err() {
                        eprintln!("{key}:\n{}", parse_error.display_with_context(&input));
                        break;
                    }
                }
            }
        }
    })
}

fn open_data(config: &dyn ConfigPort) -> Result<(DataConfig, Arc<dyn DataPort>), LadderError> {
    let data_config = build_data_config(config)?;
    let data: Arc<dyn DataPort> = Arc::new(CsvAdapter::new(data_config.path.clone()));
    Ok((data_config, data))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LadderError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    println!("{rendered}");
    Ok(())
}

fn run_backtest(config_path: &Path, code: Option<&str>, json: bool) -> Result<(), LadderError> {
    let config = load_config(config_path)?;
    let indicators = build_indicator_config(&config)?;
    let strategy = load_strategy(&config)?;
    let (data_config, data) = open_data(&config)?;
    let codes = resolve_universe(&config, code, data.as_ref(), data_config.granularity)?;

    log::info!(
        "backtesting '{}' on {} {} instruments",
        strategy.name,
        codes.len(),
        data_config.granularity
    );

    let queue = JobQueue::new(
        Arc::new(MemoryTaskStore::new()),
        Arc::new(BacktestPipeline::new(Arc::clone(&data))),
    );
    queue.add_listener("cli", |status| {
        log::debug!(
            "queue: processing {:?}, {} waiting, {} done, {} failed",
            status.current_task,
            status.queue_length,
            status.completed_count,
            status.failed_count
        );
    });
    let name = strategy.name.clone();
    let id = queue.add_task(TaskRequest::new(
        name,
        TaskParams {
            codes,
            granularity: data_config.granularity,
            indicators,
            strategy,
        },
    ))?;
    queue.wait_idle();

    let task = queue.task(id)?.ok_or_else(|| LadderError::TaskStore {
        reason: format!("{id} missing after run"),
    })?;

    if json {
        print_json(&task)?;
    }

    match (task.status, &task.result) {
        (TaskStatus::Completed, Some(result)) => {
            if !json {
                print_result(result);
            }
            Ok(())
        }
        _ => Err(LadderError::TaskStore {
            reason: format!(
                "{} {}: {}",
                id,
                task.status,
                task.error.as_deref().unwrap_or("no result")
            ),
        }),
    }
}

fn print_summary_line(code: &str, s: &BacktestSummary) {
    println!(
        "  {:<10} {:>4} trades  win {:>5.1}%  strategy {:>+8.2}%  hold {:>+8.2}%  diff {:>+8.2}%{}",
        code,
        s.total_trades,
        s.win_rate * 100.0,
        s.price_change,
        s.day_line_price_change,
        s.price_change_diff,
        if s.open_position { "  (open)" } else { "" }
    );
}

fn print_aggregate(a: &AggregateSummary) {
    println!("\n=== Aggregate ({} instruments) ===", a.instrument_count);
    println!("Total Trades:       {}", a.total_trades);
    println!("Profit / Loss:      {} / {}", a.profit_trades, a.loss_trades);
    println!("Win Rate:           {:.1}%", a.win_rate * 100.0);
    println!("Strategy Change:    {:.2}%", a.price_change);
    println!("Daily Change:       {:.3}%", a.daily_change);
    println!("Buy & Hold Change:  {:.2}%", a.day_line_price_change);
    println!("Excess Change:      {:.2}%", a.price_change_diff);
    println!("Max Drawdown:       {:.2}%", a.max_drawdown);
    println!("Avg Holding Days:   {:.1}", a.avg_holding_days);
    println!("Open Positions:     {}", a.open_positions);
}

fn print_result(result: &TaskResult) {
    println!("=== Per-Instrument Summary ===");
    for instrument in &result.instruments {
        print_summary_line(&instrument.code, &instrument.summary);
    }
    if !result.skipped.is_empty() {
        println!("  skipped (no data): {}", result.skipped.join(", "));
    }
    print_aggregate(&result.aggregate);
}

#[derive(Serialize)]
struct InstrumentGoals<'a> {
    code: &'a str,
    goals: Vec<Goal>,
}

fn run_goals(config_path: &Path, code: Option<&str>, json: bool) -> Result<(), LadderError> {
    let config = load_config(config_path)?;
    let goal_config = build_goal_config(&config)?;
    let (_, data) = open_data(&config)?;
    let codes = resolve_universe(&config, code, data.as_ref(), Granularity::Day)?;

    let mut found = Vec::new();
    for code in &codes {
        match goals_for(data.as_ref(), code, &goal_config)? {
            Some(goals) => {
                log::info!("{}: {} goals", code, goals.len());
                found.push(InstrumentGoals { code, goals });
            }
            None => log::warn!("{}: no daily data, skipped", code),
        }
    }

    if json {
        return print_json(&found);
    }

    for entry in &found {
        println!("=== {} ({} goals) ===", entry.code, entry.goals.len());
        for g in &entry.goals {
            println!(
                "  #{:<3} {:<4} {} -> {}  {:>8.2} -> {:>8.2}  {:>+7.2}%  {:>6.1}d  {:>+6.2}%/d  {}{}",
                g.index,
                g.goal_type,
                g.start_time.date(),
                g.end_time.date(),
                g.start_price,
                g.end_price,
                g.profit_percent,
                g.duration_days,
                g.daily_profit_percent,
                g.trend_category,
                if g.used_slope_analysis { "  (slope)" } else { "" }
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct InstrumentSignals<'a> {
    code: &'a str,
    signals: Vec<SignalEvent>,
}

fn run_reversals(config_path: &Path, code: Option<&str>, json: bool) -> Result<(), LadderError> {
    let config = load_config(config_path)?;
    let indicators = build_indicator_config(&config)?;
    let (data_config, data) = open_data(&config)?;
    let codes = resolve_universe(&config, code, data.as_ref(), data_config.granularity)?;

    let mut found = Vec::new();
    for code in &codes {
        let Some(bars) = fetch_available(data.as_ref(), code, data_config.granularity)? else {
            log::warn!("{}: no data, skipped", code);
            continue;
        };
        let frame = compute_indicator_frame(&bars, &indicators);
        let signals =
            reversal_signals(&frame, REVERSAL_RUN_THRESHOLD, REVERSAL_DISPERSION_THRESHOLD);
        found.push(InstrumentSignals { code, signals });
    }

    if json {
        return print_json(&found);
    }

    for entry in &found {
        for s in &entry.signals {
            println!("{:<10} {}  {:>10.3}", entry.code, s.timestamp, s.price);
        }
    }
    Ok(())
}

fn run_conditions() {
    let registry = ConditionRegistry::global();
    for descriptor in registry.iter() {
        println!(
            "{:<24} {:<7} {}",
            descriptor.key, descriptor.group, descriptor.label
        );
    }
    eprintln!("{} conditions", registry.len());
}

fn run_validate(config_path: &Path) -> Result<(), LadderError> {
    let config = load_config(config_path)?;

    validate_indicator_config(&config)?;
    validate_goal_config(&config)?;
    validate_data_config(&config)?;
    let strategy = load_strategy(&config)?;

    println!("Strategy: {}", strategy.name);
    println!("\nBuy ladder:");
    for (n, stage) in strategy.buy.iter().enumerate() {
        println!("  stage {}: {}", n + 1, format_ladder(std::slice::from_ref(stage)));
    }
    println!("\nSell ladder:");
    for (n, stage) in strategy.sell.iter().enumerate() {
        println!("  stage {}: {}", n + 1, format_ladder(std::slice::from_ref(stage)));
    }

    println!("\nConfiguration is valid.");
    Ok(())
}
