//! Transaction records exchanged between the processors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money in.
    Credit,
    /// Money out.
    Debit,
}

/// One parsed statement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Counterparty, e.g. `Amazon`.
    pub source: String,
    /// Amount in whole rupees.
    pub amount: i64,
    /// Credit or debit.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
}

/// A transaction with its spending category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedTransaction {
    /// The transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Category derived from the source.
    pub category: String,
}

/// Transactions split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionsByType {
    /// Incoming transactions.
    pub credits: Vec<CategorizedTransaction>,
    /// Outgoing transactions.
    pub debits: Vec<CategorizedTransaction>,
}

/// Per-day sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotals {
    /// Sum of credits that day.
    pub credits: i64,
    /// Sum of debits that day.
    pub debits: i64,
}

/// Spending within one category. Only debits count toward the total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    /// Sum of debits.
    pub total: i64,
    /// Sources of the counted debits.
    pub transactions: Vec<String>,
}

/// Output of the preprocessor, input of the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedData {
    /// Transactions split by direction.
    pub transactions_by_type: TransactionsByType,
    /// Totals keyed by date.
    #[serde(default)]
    pub daily_totals: BTreeMap<String, DailyTotals>,
    /// Totals keyed by category.
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryTotals>,
}
