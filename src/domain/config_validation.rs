//! Configuration validation and typed config builders.
//!
//! Every builder validates its section first, so a built config is always
//! usable by the engine.

use crate::domain::error::LadderError;
use crate::domain::goal::GoalConfig;
use crate::domain::indicator::{IndicatorConfig, KdjPeriods, MaPeriods, MacdPeriods};
use crate::domain::price_bar::Granularity;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConfig {
    pub path: PathBuf,
    pub granularity: Granularity,
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), LadderError> {
    let defaults = IndicatorConfig::default();
    let periods = [
        ("ma_short", defaults.ma.short),
        ("ma_middle", defaults.ma.middle),
        ("ma_long", defaults.ma.long),
        ("ma_extra", defaults.ma.extra),
        ("macd_fast", defaults.macd.fast),
        ("macd_slow", defaults.macd.slow),
        ("macd_signal", defaults.macd.signal),
        ("kdj_period", defaults.kdj.period),
        ("kdj_k_smooth", defaults.kdj.k_smooth),
        ("kdj_d_smooth", defaults.kdj.d_smooth),
    ];
    for (key, default) in periods {
        period(config, "indicators", key, default)?;
    }

    let fast = period(config, "indicators", "macd_fast", defaults.macd.fast)?;
    let slow = period(config, "indicators", "macd_slow", defaults.macd.slow)?;
    if fast >= slow {
        return Err(LadderError::ConfigInvalid {
            section: "indicators".to_string(),
            key: "macd_fast".to_string(),
            reason: "macd_fast must be less than macd_slow".to_string(),
        });
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), LadderError> {
    build_ladder_config(config).map(|_| ())
}

pub fn validate_goal_config(config: &dyn ConfigPort) -> Result<(), LadderError> {
    let defaults = GoalConfig::default();
    period(config, "goal", "window_radius", defaults.window_radius)?;

    let thresholds = [
        ("slope_threshold", defaults.slope_threshold),
        ("profit_filter", defaults.profit_filter),
        ("daily_profit_filter", defaults.daily_profit_filter),
        ("duration_filter", defaults.duration_filter),
        ("liquidity_filter", defaults.liquidity_filter),
    ];
    for (key, default) in thresholds {
        non_negative(config, "goal", key, default)?;
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), LadderError> {
    build_data_config(config).map(|_| ())
}

pub fn build_indicator_config(config: &dyn ConfigPort) -> Result<IndicatorConfig, LadderError> {
    validate_indicator_config(config)?;
    let d = IndicatorConfig::default();
    Ok(IndicatorConfig {
        ma: MaPeriods {
            short: period(config, "indicators", "ma_short", d.ma.short)?,
            middle: period(config, "indicators", "ma_middle", d.ma.middle)?,
            long: period(config, "indicators", "ma_long", d.ma.long)?,
            extra: period(config, "indicators", "ma_extra", d.ma.extra)?,
        },
        macd: MacdPeriods {
            fast: period(config, "indicators", "macd_fast", d.macd.fast)?,
            slow: period(config, "indicators", "macd_slow", d.macd.slow)?,
            signal: period(config, "indicators", "macd_signal", d.macd.signal)?,
        },
        kdj: KdjPeriods {
            period: period(config, "indicators", "kdj_period", d.kdj.period)?,
            k_smooth: period(config, "indicators", "kdj_k_smooth", d.kdj.k_smooth)?,
            d_smooth: period(config, "indicators", "kdj_d_smooth", d.kdj.d_smooth)?,
        },
    })
}

/// Parse the `[strategy]` ladders. Both sides must be present; an empty
/// stage is a parse error.
pub fn build_ladder_config(config: &dyn ConfigPort) -> Result<Strategy, LadderError> {
    let buy = required(config, "strategy", "buy_conditions")?;
    let sell = required(config, "strategy", "sell_conditions")?;
    let name = config
        .get_string("strategy", "name")
        .unwrap_or_else(|| "unnamed".to_string());

    Ok(Strategy::parse(&name, &buy, &sell)?)
}

pub fn build_goal_config(config: &dyn ConfigPort) -> Result<GoalConfig, LadderError> {
    validate_goal_config(config)?;
    let d = GoalConfig::default();
    Ok(GoalConfig {
        window_radius: period(config, "goal", "window_radius", d.window_radius)?,
        slope_threshold: config.get_double("goal", "slope_threshold", d.slope_threshold),
        profit_filter: config.get_double("goal", "profit_filter", d.profit_filter),
        daily_profit_filter: config.get_double("goal", "daily_profit_filter", d.daily_profit_filter),
        duration_filter: config.get_double("goal", "duration_filter", d.duration_filter),
        liquidity_filter: config.get_double("goal", "liquidity_filter", d.liquidity_filter),
    })
}

pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig, LadderError> {
    let path = required(config, "data", "path")?;
    let granularity = match config.get_string("data", "granularity") {
        None => Granularity::default(),
        Some(raw) => raw.parse().map_err(|reason| LadderError::ConfigInvalid {
            section: "data".to_string(),
            key: "granularity".to_string(),
            reason,
        })?,
    };
    Ok(DataConfig {
        path: PathBuf::from(path),
        granularity,
    })
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, LadderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(LadderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Positive integer setting; a present but non-numeric value is rejected
/// rather than silently defaulted.
fn period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, LadderError> {
    if let Some(raw) = config.get_string(section, key) {
        if raw.trim().parse::<i64>().is_err() {
            return Err(LadderError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("{key} must be an integer"),
            });
        }
    }
    let value = config.get_int(section, key, default as i64);
    if value < 1 {
        return Err(LadderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be at least 1"),
        });
    }
    Ok(value as usize)
}

fn non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, LadderError> {
    let value = config.get_double(section, key, default);
    if value < 0.0 {
        return Err(LadderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be non-negative"),
        });
    }
    Ok(value)
}
