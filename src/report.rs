//! Performance and status rendering for the CLI.

use chrono::Duration;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::ledger::Ledger;
use crate::error::Result;

fn kv_table(title: &str, rows: &[(String, String)]) -> String {
    let mut builder = Builder::default();
    builder.push_record([title, ""]);
    for (key, value) in rows {
        builder.push_record([key.as_str(), value.as_str()]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn fmt_money(value: Decimal) -> String {
    format!("${}", value.round_dp(4))
}

/// One-screen status: totals plus the last hour of risk events.
pub fn render_status(ledger: &Ledger) -> Result<String> {
    let opportunities = ledger.opportunity_summary()?;
    let tradesets = ledger.tradeset_summary()?;
    let risk = ledger.risk_event_counts(Duration::hours(1))?;

    let mut rows = vec![
        (
            "Opportunities detected".into(),
            opportunities.total.to_string(),
        ),
        ("Signals traded".into(), opportunities.traded.to_string()),
        ("Signals skipped".into(), opportunities.skipped().to_string()),
    ];
    if let Some(edge) = opportunities.mean_edge {
        rows.push(("Mean edge".into(), edge.round_dp(4).to_string()));
    }
    rows.push(("Trade sets".into(), tradesets.total.to_string()));
    rows.push(("Total PnL".into(), fmt_money(tradesets.total_pnl)));
    rows.push(("Total fees".into(), fmt_money(tradesets.total_fees)));

    let mut risk_rows: Vec<(String, String)> = risk
        .iter()
        .map(|(kind, count)| (kind.to_string(), count.to_string()))
        .collect();
    risk_rows.sort();
    if risk_rows.is_empty() {
        risk_rows.push(("(none)".into(), String::new()));
    }

    Ok(format!(
        "{}\n{}",
        kv_table("Status", &rows),
        kv_table("Risk events (1h)", &risk_rows)
    ))
}

/// Full performance report over a trailing window of days.
pub fn render_report(ledger: &Ledger, days: u32) -> Result<String> {
    let opportunities = ledger.opportunity_summary()?;
    let tradesets = ledger.tradeset_summary()?;
    let risk = ledger.risk_event_counts(Duration::hours(24 * i64::from(days)))?;

    let mut sections = Vec::new();

    let mut opp_rows = vec![
        ("Total detected".into(), opportunities.total.to_string()),
        ("Traded".into(), opportunities.traded.to_string()),
        ("Skipped".into(), opportunities.skipped().to_string()),
    ];
    if opportunities.total > 0 {
        let rate = Decimal::from(opportunities.traded) * Decimal::ONE_HUNDRED
            / Decimal::from(opportunities.total);
        opp_rows.push(("Trade rate".into(), format!("{}%", rate.round_dp(1))));
    }
    if let Some(edge) = opportunities.mean_edge {
        opp_rows.push(("Mean edge".into(), edge.round_dp(4).to_string()));
    }
    if let Some(cost) = opportunities.mean_sum_cost {
        opp_rows.push(("Mean sum cost".into(), fmt_money(cost)));
    }
    sections.push(kv_table("Opportunities", &opp_rows));

    if !opportunities.by_decision.is_empty() {
        let rows: Vec<(String, String)> = opportunities
            .by_decision
            .iter()
            .map(|(decision, count)| (decision.clone(), count.to_string()))
            .collect();
        sections.push(kv_table("Decisions", &rows));
    }

    let net_pnl = tradesets.total_pnl;
    let net_display = if net_pnl >= Decimal::ZERO {
        fmt_money(net_pnl).green().to_string()
    } else {
        fmt_money(net_pnl).red().to_string()
    };
    let mut trade_rows = vec![
        ("Trade sets".into(), tradesets.total.to_string()),
        ("Realized PnL".into(), net_display),
        ("Fees paid".into(), fmt_money(tradesets.total_fees)),
    ];
    if tradesets.total > 0 {
        let avg = tradesets.total_pnl / Decimal::from(tradesets.total);
        trade_rows.push(("Avg PnL per set".into(), fmt_money(avg)));
    }
    sections.push(kv_table("Trading", &trade_rows));

    if !tradesets.by_status.is_empty() {
        let rows: Vec<(String, String)> = tradesets
            .by_status
            .iter()
            .map(|(status, count)| (status.clone(), count.to_string()))
            .collect();
        sections.push(kv_table("Trade set status", &rows));
    }

    let mut risk_rows: Vec<(String, String)> = risk
        .iter()
        .map(|(kind, count)| (kind.to_string(), count.to_string()))
        .collect();
    risk_rows.sort();
    if !risk_rows.is_empty() {
        sections.push(kv_table(
            &format!("Risk events ({days}d)"),
            &risk_rows,
        ));
    }

    Ok(sections.join("\n"))
}
