//! Condition predicates over an indicator frame.
//!
//! Each [`Condition`] is a closed variant resolved once from its registry key,
//! so the per-bar scan dispatches with a `match` instead of a map lookup.
//!
//! # Evaluation Semantics
//!
//! - A predicate looks back at most [`Condition::lookback`] bars
//! - Any bar index that would reach before the series start, or past its end,
//!   evaluates to `false`
//! - `AND`: short-circuits on first `false`
//! - `OR`: short-circuits on first `true`

use crate::domain::indicator::IndicatorFrame;

const VOLUME_SPIKE_RATIO: f64 = 1.1;
const VOLUME_SHRINK_RATIO: f64 = 0.9;
const MACD_NEAR_ZERO: f64 = 0.05;
const KDJ_OVERBOUGHT: f64 = 80.0;
const KDJ_OVERSOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaLine {
    Short,
    Middle,
    Long,
    Extra,
}

impl MaLine {
    pub const ALL: [MaLine; 4] = [MaLine::Short, MaLine::Middle, MaLine::Long, MaLine::Extra];

    pub fn series(self, frame: &IndicatorFrame) -> &[f64] {
        match self {
            MaLine::Short => &frame.ma_s,
            MaLine::Middle => &frame.ma_m,
            MaLine::Long => &frame.ma_l,
            MaLine::Extra => &frame.ma_x,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            MaLine::Short => "MAS",
            MaLine::Middle => "MAM",
            MaLine::Long => "MAL",
            MaLine::Extra => "MAX",
        }
    }
}

/// Adjacent moving-average pair, faster line first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaPair {
    ShortMiddle,
    MiddleLong,
    LongExtra,
}

impl MaPair {
    pub const ALL: [MaPair; 3] = [MaPair::ShortMiddle, MaPair::MiddleLong, MaPair::LongExtra];

    pub fn lines(self) -> (MaLine, MaLine) {
        match self {
            MaPair::ShortMiddle => (MaLine::Short, MaLine::Middle),
            MaPair::MiddleLong => (MaLine::Middle, MaLine::Long),
            MaPair::LongExtra => (MaLine::Long, MaLine::Extra),
        }
    }
}

/// Which indicator family a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyGroup {
    Ma,
    Volume,
    Macd,
    Kdj,
}

impl std::fmt::Display for DependencyGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DependencyGroup::Ma => "ma",
            DependencyGroup::Volume => "volume",
            DependencyGroup::Macd => "macd",
            DependencyGroup::Kdj => "kdj",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    MaAbove(MaPair),
    MaBelow(MaPair),
    MaCrossUp(MaPair),
    MaCrossDown(MaPair),
    MaRising(MaLine),
    MaFalling(MaLine),
    MaTurnUp(MaLine),
    MaTurnDown(MaLine),
    MaExpanding(MaPair),
    MaContracting(MaPair),
    VolumeSpike,
    VolumeShrink,
    MacdGoldenCross,
    MacdDeadCross,
    MacdBottomDivergence,
    MacdTopDivergence,
    KdjOverbought,
    KdjOversold,
    Sign1Below(i64),
}

impl Condition {
    pub fn dependency_group(&self) -> DependencyGroup {
        match self {
            Condition::VolumeSpike | Condition::VolumeShrink => DependencyGroup::Volume,
            Condition::MacdGoldenCross
            | Condition::MacdDeadCross
            | Condition::MacdBottomDivergence
            | Condition::MacdTopDivergence => DependencyGroup::Macd,
            Condition::KdjOverbought | Condition::KdjOversold => DependencyGroup::Kdj,
            _ => DependencyGroup::Ma,
        }
    }

    /// Number of bars before `i` the predicate reads.
    pub fn lookback(&self) -> usize {
        match self {
            Condition::MaAbove(_)
            | Condition::MaBelow(_)
            | Condition::KdjOverbought
            | Condition::KdjOversold
            | Condition::Sign1Below(_) => 0,
            Condition::MaCrossUp(_)
            | Condition::MaCrossDown(_)
            | Condition::MaExpanding(_)
            | Condition::MaContracting(_)
            | Condition::VolumeSpike
            | Condition::VolumeShrink
            | Condition::MacdGoldenCross
            | Condition::MacdDeadCross => 1,
            Condition::MaRising(_)
            | Condition::MaFalling(_)
            | Condition::MaTurnUp(_)
            | Condition::MaTurnDown(_) => 2,
            // divergence only fires once three prior bars exist
            Condition::MacdBottomDivergence | Condition::MacdTopDivergence => 3,
        }
    }

    pub fn evaluate(&self, frame: &IndicatorFrame, i: usize) -> bool {
        if i >= frame.len() || i < self.lookback() {
            return false;
        }

        match *self {
            Condition::MaAbove(pair) => {
                let (a, b) = series_pair(frame, pair);
                a[i] > b[i]
            }
            Condition::MaBelow(pair) => {
                let (a, b) = series_pair(frame, pair);
                a[i] < b[i]
            }
            Condition::MaCrossUp(pair) => {
                let (a, b) = series_pair(frame, pair);
                crosses_up(a, b, i)
            }
            Condition::MaCrossDown(pair) => {
                let (a, b) = series_pair(frame, pair);
                crosses_down(a, b, i)
            }
            Condition::MaRising(line) => {
                let a = line.series(frame);
                a[i - 2] < a[i - 1] && a[i - 1] < a[i]
            }
            Condition::MaFalling(line) => {
                let a = line.series(frame);
                a[i - 2] > a[i - 1] && a[i - 1] > a[i]
            }
            Condition::MaTurnUp(line) => {
                let a = line.series(frame);
                a[i - 2] > a[i - 1] && a[i] > a[i - 1]
            }
            Condition::MaTurnDown(line) => {
                let a = line.series(frame);
                a[i - 2] < a[i - 1] && a[i] < a[i - 1]
            }
            Condition::MaExpanding(pair) => {
                let (a, b) = series_pair(frame, pair);
                a[i] - a[i - 1] > b[i] - b[i - 1]
            }
            Condition::MaContracting(pair) => {
                let (a, b) = series_pair(frame, pair);
                a[i] - a[i - 1] < b[i] - b[i - 1]
            }
            Condition::VolumeSpike => frame.volume[i] > frame.volume[i - 1] * VOLUME_SPIKE_RATIO,
            Condition::VolumeShrink => {
                frame.volume[i] < frame.volume[i - 1] * VOLUME_SHRINK_RATIO
            }
            Condition::MacdGoldenCross => {
                let prev_dea = frame.dea[i - 1];
                crosses_up(&frame.dif, &frame.dea, i)
                    && (prev_dea <= 0.0 || prev_dea.abs() < MACD_NEAR_ZERO)
            }
            Condition::MacdDeadCross => {
                let prev_dea = frame.dea[i - 1];
                crosses_down(&frame.dif, &frame.dea, i)
                    && (prev_dea >= 0.0 || prev_dea.abs() < MACD_NEAR_ZERO)
            }
            Condition::MacdBottomDivergence => {
                frame.low[i] < frame.low[i - 1]
                    && frame.dif[i] > frame.dif[i - 1]
                    && frame.dif[i] < 0.0
            }
            Condition::MacdTopDivergence => {
                frame.high[i] > frame.high[i - 1]
                    && frame.dif[i] < frame.dif[i - 1]
                    && frame.dif[i] > 0.0
            }
            Condition::KdjOverbought => {
                frame.kdj_k[i] > KDJ_OVERBOUGHT && frame.kdj_d[i] > KDJ_OVERBOUGHT
            }
            Condition::KdjOversold => {
                frame.kdj_k[i] < KDJ_OVERSOLD && frame.kdj_d[i] < KDJ_OVERSOLD
            }
            Condition::Sign1Below(threshold) => frame.sign1[i] < threshold,
        }
    }
}

fn series_pair(frame: &IndicatorFrame, pair: MaPair) -> (&[f64], &[f64]) {
    let (a, b) = pair.lines();
    (a.series(frame), b.series(frame))
}

fn crosses_up(a: &[f64], b: &[f64], i: usize) -> bool {
    a[i - 1] < b[i - 1] && a[i] >= b[i]
}

fn crosses_down(a: &[f64], b: &[f64], i: usize) -> bool {
    a[i - 1] > b[i - 1] && a[i] <= b[i]
}

/// Boolean composition of conditions, as written in a ladder stage entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionTree {
    Leaf { key: String, condition: Condition },
    And(Vec<ConditionTree>),
    Or(Vec<ConditionTree>),
    Not(Box<ConditionTree>),
}

impl ConditionTree {
    pub fn evaluate(&self, frame: &IndicatorFrame, i: usize) -> bool {
        match self {
            ConditionTree::Leaf { condition, .. } => condition.evaluate(frame, i),
            ConditionTree::And(children) => children.iter().all(|c| c.evaluate(frame, i)),
            ConditionTree::Or(children) => children.iter().any(|c| c.evaluate(frame, i)),
            ConditionTree::Not(child) => !child.evaluate(frame, i),
        }
    }

    /// Registry keys referenced anywhere in the tree, in order of appearance.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ConditionTree::Leaf { key, .. } => out.push(key),
            ConditionTree::And(children) | ConditionTree::Or(children) => {
                for child in children {
                    child.collect_keys(out);
                }
            }
            ConditionTree::Not(child) => child.collect_keys(out),
        }
    }
}

impl std::fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |f: &mut std::fmt::Formatter<'_>, op: &str, children: &[ConditionTree]| {
            write!(f, "{op}(")?;
            for (n, child) in children.iter().enumerate() {
                if n > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")
        };
        match self {
            ConditionTree::Leaf { key, .. } => write!(f, "{key}"),
            ConditionTree::And(children) => join(f, "AND", children),
            ConditionTree::Or(children) => join(f, "OR", children),
            ConditionTree::Not(child) => write!(f, "NOT({child})"),
        }
    }
}

/// One ladder stage: every entry must hold on the same bar.
pub type ConditionGroup = Vec<ConditionTree>;
