use crate::domain::action::{ActionKind, PositionType, TradingAction};
use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Version of the reply schema described to the model.
pub const SCHEMA_VERSION: u32 = 2;

pub const MIN_LOOK_BACK_SECS: u32 = 600;
pub const MAX_LOOK_BACK_SECS: u32 = 86_400;

/// Wire shape of the fenced JSON block the model is asked to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmTradingAction {
    pub action: ActionKind,
    #[serde(default, alias = "buy_type")]
    pub position_type: Option<PositionType>,
    #[serde(default)]
    pub amount: Option<LlmAmount>,
    #[serde(default)]
    pub go_in: Option<f64>,
    #[serde(default)]
    pub go_out: Option<f64>,
    pub look_back_in_seconds: u32,
    pub reason_of_decision: String,
}

/// Models emit amounts both as `"1000"` and `1000`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LlmAmount {
    Text(String),
    Number(serde_json::Number),
}

impl LlmAmount {
    fn into_literal(self) -> String {
        match self {
            LlmAmount::Text(s) => s.trim().to_string(),
            LlmAmount::Number(n) => n.to_string(),
        }
    }
}

impl LlmTradingAction {
    pub fn validate_and_into_action(self) -> anyhow::Result<TradingAction> {
        ensure!(
            (MIN_LOOK_BACK_SECS..=MAX_LOOK_BACK_SECS).contains(&self.look_back_in_seconds),
            "look_back_in_seconds must be within {MIN_LOOK_BACK_SECS}..={MAX_LOOK_BACK_SECS} (got {})",
            self.look_back_in_seconds
        );

        let reason_of_decision = self.reason_of_decision.trim().to_string();
        ensure!(
            !reason_of_decision.is_empty(),
            "reason_of_decision must be non-empty"
        );

        if self.action == ActionKind::Hold {
            ensure!(
                self.position_type.is_none()
                    && self.amount.is_none()
                    && self.go_in.is_none()
                    && self.go_out.is_none(),
                "hold must not carry amount, position_type, go_in or go_out"
            );
        }

        let amount = match self.amount {
            Some(raw) => {
                let literal = raw.into_literal();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| anyhow::anyhow!("amount is not numeric: {literal:?}"))?;
                ensure!(
                    value.is_finite() && value >= 0.0,
                    "amount must be a non-negative number (got {literal})"
                );
                Some(literal)
            }
            None => None,
        };

        for (name, price) in [("go_in", self.go_in), ("go_out", self.go_out)] {
            if let Some(p) = price {
                ensure!(p.is_finite() && p > 0.0, "{name} must be a positive price (got {p})");
            }
        }

        Ok(TradingAction {
            action: self.action,
            position_type: self.position_type,
            amount,
            go_in: self.go_in,
            go_out: self.go_out,
            look_back_in_seconds: self.look_back_in_seconds,
            reason_of_decision,
        })
    }
}
