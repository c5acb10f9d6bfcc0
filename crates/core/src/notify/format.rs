use crate::domain::action::{Proposal, TradingAction};
use chrono::DateTime;
use chrono_tz::Tz;
use pulldown_cmark::{html, Options, Parser};

fn or_none<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

fn format_action(a: &TradingAction) -> String {
    format!(
        "**Action:** {}\n\n\
         **Position Type:** {}\n\n\
         **Amount:** {}\n\n\
         **Entry Price:** {}\n\n\
         **Exit Price:** {}\n\n\
         **Rechecking process in seconds:** {}\n\n\
         **Reason of Decision:** {}",
        a.action,
        or_none(a.position_type.map(|p| p.as_str())),
        or_none(a.amount.as_deref()),
        or_none(a.go_in),
        or_none(a.go_out),
        a.look_back_in_seconds,
        a.reason_of_decision,
    )
}

/// Markdown summary of the decision; an unparsed reply is passed through as-is.
pub fn format_proposal(proposal: &Proposal) -> String {
    match proposal {
        Proposal::Action(action) => format_action(action),
        Proposal::Unknown { raw } => raw.clone(),
    }
}

pub fn body(formatted: &str, context: &str) -> String {
    format!("{formatted}\n\n\nHere is the data I used to support my decision:\n{context}")
}

pub fn subject(ticker: &str, proposal: &Proposal, now: DateTime<Tz>) -> String {
    format!(
        "A new Trading Proposal for {ticker}! ({}) - {}",
        proposal.label(),
        now.format("%Y-%m-%d %H:%M:%S %Z")
    )
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
