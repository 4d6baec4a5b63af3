//! Report aggregation and text rendering.

use crate::models::ReportLineItem;

/// Printed instead of a report when no session accrued usage.
pub const NO_USAGE_MESSAGE: &str = "No usage recorded since last report.";

const REPORT_TITLE: &str = "📊 **Daily Usage Report**";

/// Decimal places shown for every cost in a rendered report.
const COST_DECIMALS: usize = 4;

/// Priced usage for one reporting period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// One item per session with non-zero usage, in feed order.
    pub line_items: Vec<ReportLineItem>,
    /// Exact sum of the line-item costs.
    pub total_cost: f64,
}

impl Report {
    pub fn from_line_items(line_items: Vec<ReportLineItem>) -> Self {
        let total_cost = line_items.iter().map(|item| item.delta_cost).sum();
        Self {
            line_items,
            total_cost,
        }
    }

    /// `true` when there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    pub fn total_tokens(&self) -> u64 {
        self.line_items.iter().map(|item| item.delta_tokens).sum()
    }
}

/// Render `report` as the chat message delivered to the operator.
///
/// ```
/// use reporter_core::models::ReportLineItem;
/// use reporter_core::report::{render_report, Report};
///
/// let report = Report::from_line_items(vec![ReportLineItem {
///     session_id: "a".into(),
///     model: "m1".into(),
///     delta_tokens: 500_000,
///     delta_cost: 0.6,
/// }]);
/// assert_eq!(
///     render_report(&report),
///     "📊 **Daily Usage Report**\n\n\
///      - **m1**: 500,000 tokens (~$0.6000)\n\
///      \n💰 **Total Daily Spend: $0.6000**"
/// );
/// ```
pub fn render_report(report: &Report) -> String {
    let mut out = format!("{REPORT_TITLE}\n\n");
    for item in &report.line_items {
        out.push_str(&format!(
            "- **{}**: {} tokens (~{})\n",
            item.model,
            format_tokens(item.delta_tokens),
            format_cost(item.delta_cost)
        ));
    }
    out.push_str(&format!(
        "\n💰 **Total Daily Spend: {}**",
        format_cost(report.total_cost)
    ));
    out
}

/// Format a token count with thousands separators.
///
/// ```
/// use reporter_core::report::format_tokens;
///
/// assert_eq!(format_tokens(0), "0");
/// assert_eq!(format_tokens(1234567), "1,234,567");
/// ```
pub fn format_tokens(tokens: u64) -> String {
    let mut groups = Vec::new();
    let mut rest = tokens;
    while rest >= 1_000 {
        groups.push(format!("{:03}", rest % 1_000));
        rest /= 1_000;
    }
    groups.push(rest.to_string());
    groups.reverse();
    groups.join(",")
}

/// Format a dollar amount with four decimal places and no grouping.
///
/// ```
/// use reporter_core::report::format_cost;
///
/// assert_eq!(format_cost(0.6), "$0.6000");
/// assert_eq!(format_cost(1234.56789), "$1234.5679");
/// ```
pub fn format_cost(amount: f64) -> String {
    format!("${:.prec$}", amount, prec = COST_DECIMALS)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
