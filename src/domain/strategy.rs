//! Ladder strategy: ordered buy and sell condition stages.

use crate::domain::condition::ConditionGroup;
use crate::domain::condition_parser::{format_ladder, parse_ladder};
use crate::domain::error::ParseError;
use serde::ser::{Serialize, SerializeStruct, Serializer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub buy: Vec<ConditionGroup>,
    pub sell: Vec<ConditionGroup>,
}

impl Strategy {
    pub fn parse(name: &str, buy: &str, sell: &str) -> Result<Self, ParseError> {
        Ok(Self {
            name: name.to_string(),
            buy: parse_ladder(buy)?,
            sell: parse_ladder(sell)?,
        })
    }

    /// A strategy with an empty side or an empty stage can never fire.
    pub fn is_degenerate(&self) -> bool {
        self.buy.is_empty()
            || self.sell.is_empty()
            || self.buy.iter().any(Vec::is_empty)
            || self.sell.iter().any(Vec::is_empty)
    }

    pub fn buy_ladder(&self) -> String {
        format_ladder(&self.buy)
    }

    pub fn sell_ladder(&self) -> String {
        format_ladder(&self.sell)
    }
}

/// Ladders serialise in their string form.
impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Strategy", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("buy", &self.buy_ladder())?;
        state.serialize_field("sell", &self.sell_ladder())?;
        state.end()
    }
}
