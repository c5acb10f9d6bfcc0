use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Buy,
    Sell,
    Hold,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Buy => "buy",
            ActionKind::Sell => "sell",
            ActionKind::Hold => "hold",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    Long,
    Short,
}

impl PositionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionType::Long => "long",
            PositionType::Short => "short",
        }
    }
}

/// A validated decision. For `Hold`, `position_type`, `amount`, `go_in` and
/// `go_out` are always `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingAction {
    pub action: ActionKind,
    pub position_type: Option<PositionType>,
    /// Monetary amount exactly as the model wrote it (e.g. `"500"`).
    pub amount: Option<String>,
    pub go_in: Option<f64>,
    pub go_out: Option<f64>,
    pub look_back_in_seconds: u32,
    pub reason_of_decision: String,
}

/// Outcome of parsing a model reply. `Unknown` keeps the raw reply verbatim so
/// the user still receives it.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Action(TradingAction),
    Unknown { raw: String },
}

impl Proposal {
    pub fn label(&self) -> &'static str {
        match self {
            Proposal::Action(action) => action.action.as_str(),
            Proposal::Unknown { .. } => "unknown",
        }
    }
}
