use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    None,
    Long,
    Short,
}

impl PositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKind::None => "none",
            PositionKind::Long => "long",
            PositionKind::Short => "short",
        }
    }
}

/// Holding per ticker. Written by this system only to initialise a missing
/// record; trades are executed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub amount: String,
    #[serde(alias = "buy_type")]
    pub position_kind: PositionKind,
}

impl Default for UserPosition {
    fn default() -> Self {
        Self {
            amount: "0".to_string(),
            position_kind: PositionKind::None,
        }
    }
}

/// How the current position is described to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionTextMode {
    /// Report the stored amount and kind.
    #[default]
    Describe,
    /// Historical behaviour: always claims the user is invested.
    Legacy,
}

impl PositionTextMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "describe" => Some(Self::Describe),
            "legacy" => Some(Self::Legacy),
            _ => None,
        }
    }
}

impl UserPosition {
    pub fn is_flat(&self) -> bool {
        self.position_kind == PositionKind::None
            || self
                .amount
                .trim()
                .parse::<f64>()
                .map(|v| v == 0.0)
                .unwrap_or(false)
    }

    pub fn describe(&self, mode: PositionTextMode) -> String {
        match mode {
            PositionTextMode::Legacy => "User is invested in the stock.".to_string(),
            PositionTextMode::Describe if self.is_flat() => {
                "User has no open position in the stock.".to_string()
            }
            PositionTextMode::Describe => format!(
                "User is invested in the stock.\nCurrent Position Amount: {}\nPosition Type: {}",
                self.amount.trim(),
                self.position_kind.as_str()
            ),
        }
    }
}
