//! Instrument universe resolution.
//!
//! Code lists come from the command line, the `[backtest]` section, or, when
//! neither names any codes, every symbol the data source offers.

use crate::domain::error::LadderError;
use crate::domain::price_bar::Granularity;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

fn parse_config_codes(key: &str, raw: &str) -> Result<Vec<String>, LadderError> {
    parse_codes(raw).map_err(|e| LadderError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: e.to_string(),
    })
}

pub fn resolve_universe(
    config: &dyn ConfigPort,
    cli_codes: Option<&str>,
    data: &dyn DataPort,
    granularity: Granularity,
) -> Result<Vec<String>, LadderError> {
    let codes = if let Some(raw) = cli_codes {
        parse_config_codes("codes", raw)?
    } else if let Some(raw) = config.get_string("backtest", "codes") {
        parse_config_codes("codes", &raw)?
    } else if let Some(raw) = config.get_string("backtest", "code") {
        parse_config_codes("code", &raw)?
    } else {
        let symbols = data.list_symbols(granularity)?;
        log::info!("no codes configured, using all {} {} symbols", symbols.len(), granularity);
        symbols
    };

    if codes.is_empty() {
        return Err(LadderError::NoData {
            code: "universe".into(),
        });
    }
    log::info!("universe: {} codes", codes.len());
    Ok(codes)
}
