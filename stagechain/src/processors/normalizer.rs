//! Summary totals and spending insights.

use super::model::{CategoryTotals, ProcessedData};
use super::{add_amount, timestamp, ProcessorError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Categories above this share of spending get their own insight.
const SIGNIFICANT_SHARE_PERCENT: f64 = 10.0;

/// Income, spending and their difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Sum of credits.
    pub total_credits: i64,
    /// Sum of debits.
    pub total_debits: i64,
    /// Credits minus debits.
    pub net_balance: i64,
}

impl Summary {
    /// Totals the processed transactions.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Malformed`] if a total overflows.
    pub fn of(processed: &ProcessedData) -> Result<Self, ProcessorError> {
        let by_type = &processed.transactions_by_type;
        let mut total_credits = 0;
        for t in &by_type.credits {
            add_amount(&mut total_credits, t.transaction.amount)?;
        }
        let mut total_debits = 0;
        for t in &by_type.debits {
            add_amount(&mut total_debits, t.transaction.amount)?;
        }
        let net_balance = total_credits
            .checked_sub(total_debits)
            .ok_or_else(|| ProcessorError::Malformed("net balance overflows".to_string()))?;
        Ok(Self {
            total_credits,
            total_debits,
            net_balance,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: i64, total: i64) -> Option<f64> {
    (total != 0).then(|| part as f64 / total as f64 * 100.0)
}

/// Builds the human-readable insights for a summary.
#[must_use]
pub fn insights(summary: &Summary, categories: &BTreeMap<String, CategoryTotals>) -> Vec<String> {
    let mut insights = Vec::new();

    match percentage(summary.net_balance, summary.total_credits) {
        Some(rate) => insights.push(format!("Net savings rate: {rate:.2}% of total income")),
        None => insights.push("Net savings rate: n/a (no income recorded)".to_string()),
    }

    if summary.total_debits > 0 {
        let mut ranked: Vec<(&String, &CategoryTotals)> = categories.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| b.total.cmp(&a.total));

        if let Some((top, totals)) = ranked.first() {
            let share = percentage(totals.total, summary.total_debits).unwrap_or_default();
            insights.push(format!(
                "Highest expense category is {top} at {share:.2}% of total expenses"
            ));
        }

        for (category, totals) in &ranked {
            let share = percentage(totals.total, summary.total_debits).unwrap_or_default();
            if share > SIGNIFICANT_SHARE_PERCENT {
                insights.push(format!("{category} expenses: {share:.2}% of total spending"));
            }
        }
    }

    insights
}

/// Runs the normalizer on a stage `data` value.
pub fn process(data: &Value, now: DateTime<Utc>) -> Result<Value, ProcessorError> {
    if data.get("transactions_by_type").is_none() {
        return Err(ProcessorError::InvalidInput(
            "expecting processed transaction data",
        ));
    }
    let processed: ProcessedData = serde_json::from_value(data.clone())
        .map_err(|e| ProcessorError::Malformed(format!("bad processed data: {e}")))?;

    let summary = Summary::of(&processed)?;
    let insights = insights(&summary, &processed.categories);

    Ok(json!({
        "analysis": {
            "summary": summary,
            "categorized_expenses": processed.categories,
            "daily_summary": processed.daily_totals,
            "insights": insights,
        },
        "metadata": {
            "processing_timestamp": timestamp(now),
        }
    }))
}
