//! Immutable table of named conditions.
//!
//! Built once, then only read. Keys are resolved to [`Condition`] variants when
//! a ladder is parsed, never inside the per-bar scan.

use crate::domain::condition::{Condition, DependencyGroup, MaLine, MaPair};
use crate::domain::error::LadderError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const SIGN1_THRESHOLD: i64 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ConditionDescriptor {
    pub key: String,
    pub label: String,
    pub group: DependencyGroup,
    #[serde(skip)]
    pub condition: Condition,
}

#[derive(Debug)]
pub struct ConditionRegistry {
    descriptors: Vec<ConditionDescriptor>,
    by_key: HashMap<String, usize>,
}

static REGISTRY: LazyLock<ConditionRegistry> = LazyLock::new(ConditionRegistry::build);

impl ConditionRegistry {
    /// The shared registry.
    pub fn global() -> &'static ConditionRegistry {
        &REGISTRY
    }

    fn build() -> Self {
        let mut registry = ConditionRegistry {
            descriptors: Vec::new(),
            by_key: HashMap::new(),
        };

        for pair in MaPair::ALL {
            let (a, b) = pair.lines();
            let (pa, pb) = (a.prefix(), b.prefix());
            let (na, nb) = (line_name(a), line_name(b));
            registry.insert(
                format!("{pa}_GT_{pb}"),
                format!("{na} MA above {nb} MA"),
                Condition::MaAbove(pair),
            );
            registry.insert(
                format!("{pa}_LT_{pb}"),
                format!("{na} MA below {nb} MA"),
                Condition::MaBelow(pair),
            );
            registry.insert(
                format!("{pa}_CROSS_UP_{pb}"),
                format!("{na} MA crosses above {nb} MA"),
                Condition::MaCrossUp(pair),
            );
            registry.insert(
                format!("{pa}_CROSS_DOWN_{pb}"),
                format!("{na} MA crosses below {nb} MA"),
                Condition::MaCrossDown(pair),
            );
        }

        registry.insert("VOLUME_HIGH", "volume up more than 10%", Condition::VolumeSpike);
        registry.insert("VOLUME_LOW", "volume down more than 10%", Condition::VolumeShrink);
        registry.insert("MACD_CROSS_UP_GOLDEN", "MACD golden cross", Condition::MacdGoldenCross);
        registry.insert("MACD_CROSS_DOWN_DEAD", "MACD dead cross", Condition::MacdDeadCross);
        registry.insert(
            "MACD_BOTTOM_DEVIATION",
            "MACD bottom divergence",
            Condition::MacdBottomDivergence,
        );
        registry.insert("MACD_TOP_DEVIATION", "MACD top divergence", Condition::MacdTopDivergence);
        registry.insert("KDJ_OVERBOUGHT", "KDJ overbought (K, D > 80)", Condition::KdjOverbought);
        registry.insert("KDJ_OVERSOLD", "KDJ oversold (K, D < 20)", Condition::KdjOversold);
        registry.insert(
            "SIGN1",
            format!("sign1 below {SIGN1_THRESHOLD}"),
            Condition::Sign1Below(SIGN1_THRESHOLD),
        );

        for line in MaLine::ALL {
            let (p, n) = (line.prefix(), line_name(line));
            registry.insert(format!("{p}_UP"), format!("{n} MA rising"), Condition::MaRising(line));
            registry.insert(
                format!("{p}_DOWN"),
                format!("{n} MA falling"),
                Condition::MaFalling(line),
            );
        }
        for line in MaLine::ALL {
            let (p, n) = (line.prefix(), line_name(line));
            registry.insert(
                format!("{p}_UPTREND"),
                format!("{n} MA turns up"),
                Condition::MaTurnUp(line),
            );
            registry.insert(
                format!("{p}_DOWNTREND"),
                format!("{n} MA turns down"),
                Condition::MaTurnDown(line),
            );
        }

        for pair in MaPair::ALL {
            let (a, b) = pair.lines();
            let (pa, pb) = (a.prefix(), b.prefix());
            let (na, nb) = (line_name(a), line_name(b));
            registry.insert(
                format!("{pa}_EXPEND_{pb}"),
                format!("{na} MA pulling away from {nb} MA"),
                Condition::MaExpanding(pair),
            );
            registry.insert(
                format!("{pa}_CONTRACT_{pb}"),
                format!("{na} MA closing on {nb} MA"),
                Condition::MaContracting(pair),
            );
        }

        registry
    }

    fn insert(&mut self, key: impl Into<String>, label: impl Into<String>, condition: Condition) {
        let key = key.into();
        self.by_key.insert(key.clone(), self.descriptors.len());
        self.descriptors.push(ConditionDescriptor {
            group: condition.dependency_group(),
            key,
            label: label.into(),
            condition,
        });
    }

    pub fn get(&self, key: &str) -> Option<&ConditionDescriptor> {
        self.by_key.get(key).map(|&idx| &self.descriptors[idx])
    }

    pub fn resolve(&self, key: &str) -> Result<Condition, LadderError> {
        self.get(key)
            .map(|d| d.condition)
            .ok_or_else(|| LadderError::UnknownCondition {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ConditionDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn line_name(line: MaLine) -> &'static str {
    match line {
        MaLine::Short => "short",
        MaLine::Middle => "middle",
        MaLine::Long => "long",
        MaLine::Extra => "extra-long",
    }
}
