use crate::domain::action::{Proposal, TradingAction};
use crate::domain::contract::LlmTradingAction;
use anyhow::Context;
use regex::Regex;
use std::sync::OnceLock;

/// Body of the first fenced block labelled `json`. Later blocks are ignored.
pub fn extract_json(text: &str) -> Option<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?is)```json(.*?)```").unwrap());
    fence
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
}

pub fn parse_action(text: &str) -> anyhow::Result<TradingAction> {
    let json_str = extract_json(text).context("LLM output has no ```json fenced block")?;
    let parsed = serde_json::from_str::<LlmTradingAction>(json_str)
        .with_context(|| format!("LLM output does not match the action schema: {json_str}"))?;
    parsed.validate_and_into_action()
}

/// Never fails: anything that does not conform becomes `Proposal::Unknown`
/// carrying the reply verbatim.
pub fn parse_response(text: &str) -> Proposal {
    match parse_action(text) {
        Ok(action) => Proposal::Action(action),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "model reply rejected; falling back to raw text");
            Proposal::Unknown {
                raw: text.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionKind, PositionType};

    fn fenced(body: &str) -> String {
        format!("Here is my decision.\n```json\n{body}\n```\nGood luck!")
    }

    #[test]
    fn extract_json_takes_first_block_only() {
        let text = "```json\n{\"a\":1}\n```\nand\n```json\n{\"a\":2}\n```";
        assert_eq!(extract_json(text), Some("{\"a\":1}"));
    }

    #[test]
    fn extract_json_ignores_unlabelled_fences() {
        assert_eq!(extract_json("```\n{\"a\":1}\n```"), None);
        assert_eq!(extract_json("{\"a\":1}"), None);
    }

    #[test]
    fn parses_sell_with_string_amount() {
        let text = fenced(
            r#"{"action": "sell", "position_type": "long", "amount": "500", "look_back_in_seconds": 1200, "reason_of_decision": "Reversal."}"#,
        );
        let action = parse_action(&text).unwrap();
        assert_eq!(action.action, ActionKind::Sell);
        assert_eq!(action.position_type, Some(PositionType::Long));
        assert_eq!(action.amount.as_deref(), Some("500"));
        assert_eq!(action.look_back_in_seconds, 1200);
    }

    #[test]
    fn numeric_amount_and_legacy_buy_type_are_accepted() {
        let text = fenced(
            r#"{"action": "buy", "buy_type": "short", "amount": 1000, "go_in": 101.5, "go_out": 98.0, "look_back_in_seconds": 600, "reason_of_decision": "Breakdown."}"#,
        );
        let action = parse_action(&text).unwrap();
        assert_eq!(action.position_type, Some(PositionType::Short));
        assert_eq!(action.amount.as_deref(), Some("1000"));
        assert_eq!(action.go_in, Some(101.5));
    }

    #[test]
    fn hold_has_null_amount_and_position_fields() {
        let text = fenced(
            r#"{"action": "hold", "position_type": null, "amount": null, "go_in": null, "go_out": null, "look_back_in_seconds": 1800, "reason_of_decision": "Inconclusive."}"#,
        );
        let Proposal::Action(action) = parse_response(&text) else {
            panic!("expected a parsed action");
        };
        assert_eq!(action.action, ActionKind::Hold);
        assert_eq!(action.amount, None);
        assert_eq!(action.position_type, None);
        assert_eq!(action.go_in, None);
        assert_eq!(action.go_out, None);
    }

    #[test]
    fn hold_with_amount_is_rejected_to_unknown() {
        let text = fenced(
            r#"{"action": "hold", "amount": "100", "look_back_in_seconds": 1800, "reason_of_decision": "x"}"#,
        );
        assert_eq!(parse_response(&text), Proposal::Unknown { raw: text.clone() });
    }

    #[test]
    fn missing_block_returns_unknown_with_verbatim_text() {
        let text = "I think you should buy.\n  Really.  ";
        let proposal = parse_response(text);
        assert_eq!(proposal.label(), "unknown");
        assert_eq!(proposal, Proposal::Unknown { raw: text.to_string() });
    }

    #[test]
    fn schema_violations_are_rejected() {
        let cases = [
            // look-back below the minimum
            r#"{"action": "buy", "amount": "1", "look_back_in_seconds": 120, "reason_of_decision": "x"}"#,
            // unknown action
            r#"{"action": "short", "amount": "1", "look_back_in_seconds": 600, "reason_of_decision": "x"}"#,
            // unknown key
            r#"{"action": "buy", "amount": "1", "look_back_in_seconds": 600, "reason_of_decision": "x", "confidence": 0.9}"#,
            // non-numeric amount
            r#"{"action": "buy", "amount": "lots", "look_back_in_seconds": 600, "reason_of_decision": "x"}"#,
            // trailing comma
            r#"{"action": "buy", "amount": "1", "look_back_in_seconds": 600, "reason_of_decision": "x",}"#,
        ];
        for body in cases {
            let text = fenced(body);
            assert!(parse_action(&text).is_err(), "accepted: {body}");
            assert_eq!(parse_response(&text).label(), "unknown");
        }
    }
}
