use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

/// Position buckets used to narrow a dataset. A record belongs to a group
/// when its position text contains one of the group's codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionGroup {
    Goalkeeper,
    CentreBack,
    LeftBack,
    RightBack,
    DefensiveMidfield,
    CentralMidfield,
    AttackingMidfield,
    Winger,
    Striker,
}

impl PositionGroup {
    pub const ALL: [PositionGroup; 9] = [
        PositionGroup::Goalkeeper,
        PositionGroup::CentreBack,
        PositionGroup::LeftBack,
        PositionGroup::RightBack,
        PositionGroup::DefensiveMidfield,
        PositionGroup::CentralMidfield,
        PositionGroup::AttackingMidfield,
        PositionGroup::Winger,
        PositionGroup::Striker,
    ];

    pub fn codes(self) -> &'static [&'static str] {
        match self {
            PositionGroup::Goalkeeper => &["GK"],
            PositionGroup::CentreBack => &["CB"],
            PositionGroup::LeftBack => &["LB", "LWB"],
            PositionGroup::RightBack => &["RB", "RWB"],
            PositionGroup::DefensiveMidfield => &["DMF"],
            PositionGroup::CentralMidfield => &["CMF"],
            PositionGroup::AttackingMidfield => &["AMF"],
            PositionGroup::Winger => &["RW", "LW", "LWF", "RWF"],
            PositionGroup::Striker => &["CF"],
        }
    }

    pub fn matches(self, position: &str) -> bool {
        self.codes().iter().any(|code| position.contains(code))
    }

    pub fn label(self) -> &'static str {
        match self {
            PositionGroup::Goalkeeper => "goalkeeper",
            PositionGroup::CentreBack => "centre-back",
            PositionGroup::LeftBack => "left-back",
            PositionGroup::RightBack => "right-back",
            PositionGroup::DefensiveMidfield => "defensive-midfield",
            PositionGroup::CentralMidfield => "central-midfield",
            PositionGroup::AttackingMidfield => "attacking-midfield",
            PositionGroup::Winger => "winger",
            PositionGroup::Striker => "striker",
        }
    }

    /// Accepts the English labels, the Spanish sidebar labels or a bare
    /// position code.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_lowercase();
        let group = match s.as_str() {
            "goalkeeper" | "gk" | "arquero" | "portero" => PositionGroup::Goalkeeper,
            "centre-back" | "center-back" | "cb" | "defensa" => PositionGroup::CentreBack,
            "left-back" | "lb" | "lwb" | "lateral izquierdo" => PositionGroup::LeftBack,
            "right-back" | "rb" | "rwb" | "lateral derecho" => PositionGroup::RightBack,
            "defensive-midfield" | "dmf" | "mediocampista defensivo" => {
                PositionGroup::DefensiveMidfield
            }
            "central-midfield" | "cmf" | "mediocampista central" => PositionGroup::CentralMidfield,
            "attacking-midfield" | "amf" | "mediocampista ofensivo" => {
                PositionGroup::AttackingMidfield
            }
            "winger" | "rw" | "lw" | "lwf" | "rwf" | "extremos" => PositionGroup::Winger,
            "striker" | "forward" | "cf" | "delantero" => PositionGroup::Striker,
            _ => return None,
        };
        Some(group)
    }
}

/// Suggested metric lists per playing role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricPreset {
    Goalkeeper,
    Defender,
    FullBack,
    Midfielder,
    Winger,
    Forward,
}

const GOALKEEPER_METRICS: &[&str] = &[
    "Matches played",
    "Minutes played",
    "Conceded goals per 90",
    "xG against per 90",
    "Prevented goals per 90",
    "Save rate, %",
    "Exits per 90",
    "Aerial duels per 90",
    "Back passes received as GK per 90",
    "Accurate passes, %",
    "Accurate forward passes, %",
    "Accurate long passes, %",
];

const DEFENDER_METRICS: &[&str] = &[
    "Matches played",
    "Minutes played",
    "Accelerations per 90",
    "Progressive runs per 90",
    "Aerial duels per 90",
    "Aerial duels won, %",
    "Defensive duels won, %",
    "Duels won, %",
    "Sliding tackles per 90",
    "Interceptions per 90",
    "Key passes per 90",
    "Short / medium passes per 90",
    "Forward passes per 90",
    "Long passes per 90",
    "Passes per 90",
    "PAdj Interceptions",
    "Accurate passes to final third, %",
    "Accurate forward passes, %",
    "Accurate back passes, %",
    "Accurate long passes, %",
    "Accurate passes, %",
];

const FULL_BACK_METRICS: &[&str] = &[
    "Matches played",
    "Minutes played",
    "Successful attacking actions per 90",
    "Successful defensive actions per 90",
    "Accelerations per 90",
    "Progressive runs per 90",
    "Crosses to goalie box per 90",
    "Crosses from final third per 90",
    "Aerial duels won, %",
    "Offensive duels won, %",
    "Defensive duels won, %",
    "Defensive duels per 90",
    "Duels won, %",
    "Interceptions per 90",
    "Passes per 90",
    "Forward passes per 90",
    "Accurate passes to penalty area, %",
    "Received passes per 90",
    "Accurate passes to final third, %",
    "Accurate through passes, %",
    "Accurate forward passes, %",
    "Accurate progressive passes, %",
    "Third assists per 90",
    "xA per 90",
];

const MIDFIELDER_METRICS: &[&str] = &[
    "Matches played",
    "Minutes played",
    "Assists per 90",
    "xA per 90",
    "Offensive duels won, %",
    "Aerial duels won, %",
    "Defensive duels won, %",
    "Interceptions per 90",
    "Received passes per 90",
    "Accurate short / medium passes, %",
    "Accurate passes to final third, %",
    "Accurate long passes, %",
    "Accurate progressive passes, %",
    "Successful dribbles, %",
    "xG per 90",
    "Goals per 90",
];

const WINGER_METRICS: &[&str] = &[
    "Matches played",
    "Minutes played",
    "xG per 90",
    "Goals per 90",
    "Assists per 90",
    "xA per 90",
    "Received passes per 90",
    "Accurate crosses, %",
    "Accurate through passes, %",
    "Accurate progressive passes, %",
    "Crosses to goalie box per 90",
    "Accurate passes to penalty area, %",
    "Offensive duels won, %",
    "Defensive duels won, %",
    "Interceptions per 90",
    "Successful dribbles, %",
];

const FORWARD_METRICS: &[&str] = &[
    "Matches played",
    "Minutes played",
    "Goals per 90",
    "Head goals per 90",
    "Non-penalty goals per 90",
    "Goal conversion, %",
    "xG per 90",
    "xA per 90",
    "Assists per 90",
    "Key passes per 90",
    "Passes per 90",
    "Passes to penalty area per 90",
    "Passes to final third per 90",
    "Accurate passes, %",
    "Accurate passes to final third, %",
    "Aerial duels won, %",
    "Duels won, %",
    "Shots per 90",
    "Shots on target, %",
    "Touches in box per 90",
];

impl MetricPreset {
    pub fn metrics(self) -> &'static [&'static str] {
        match self {
            MetricPreset::Goalkeeper => GOALKEEPER_METRICS,
            MetricPreset::Defender => DEFENDER_METRICS,
            MetricPreset::FullBack => FULL_BACK_METRICS,
            MetricPreset::Midfielder => MIDFIELDER_METRICS,
            MetricPreset::Winger => WINGER_METRICS,
            MetricPreset::Forward => FORWARD_METRICS,
        }
    }

    /// The preset's metrics that exist as numeric columns in `dataset`,
    /// in preset order.
    pub fn available(self, dataset: &Dataset) -> Vec<String> {
        let numeric = dataset.numeric_columns();
        self.metrics()
            .iter()
            .filter(|m| numeric.iter().any(|c| c == *m))
            .map(|m| m.to_string())
            .collect()
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_lowercase();
        let preset = match s.as_str() {
            "goalkeeper" | "gk" | "arquero" | "portero" => MetricPreset::Goalkeeper,
            "defender" | "centre-back" | "cb" | "defensa" => MetricPreset::Defender,
            "full-back" | "fullback" | "lateral" => MetricPreset::FullBack,
            "midfielder" | "mediocampista" => MetricPreset::Midfielder,
            "winger" | "extremos" | "extremo" => MetricPreset::Winger,
            "forward" | "striker" | "delantero" => MetricPreset::Forward,
            _ => return None,
        };
        Some(preset)
    }
}
