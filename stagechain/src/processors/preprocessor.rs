//! Groups transactions by direction, day and category.

use super::model::{
    CategorizedTransaction, ProcessedData, Transaction, TransactionType,
};
use super::{add_amount, timestamp, ProcessorError};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Source keywords and the category they map to. First match wins.
pub const CATEGORY_KEYWORDS: [(&str, &str); 5] = [
    ("amazon", "shopping"),
    ("swiggy", "food"),
    ("netflix", "entertainment"),
    ("hdfc", "banking"),
    ("phonepe", "transfer"),
];

/// Category for sources matching no keyword.
pub const OTHER_CATEGORY: &str = "other";

/// Returns the spending category of a transaction source.
#[must_use]
pub fn categorize(source: &str) -> &'static str {
    let source = source.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| source.contains(keyword))
        .map_or(OTHER_CATEGORY, |(_, category)| category)
}

/// Groups transactions. Category totals count debits only, but every
/// category seen gets an entry.
///
/// # Errors
///
/// Returns [`ProcessorError::Malformed`] if a total overflows.
pub fn group(transactions: &[Transaction]) -> Result<ProcessedData, ProcessorError> {
    let mut processed = ProcessedData::default();

    for transaction in transactions {
        let category = categorize(&transaction.source);

        let day = processed
            .daily_totals
            .entry(transaction.date.clone())
            .or_default();
        match transaction.kind {
            TransactionType::Credit => add_amount(&mut day.credits, transaction.amount)?,
            TransactionType::Debit => add_amount(&mut day.debits, transaction.amount)?,
        }

        let totals = processed
            .categories
            .entry(category.to_string())
            .or_default();
        if transaction.kind == TransactionType::Debit {
            add_amount(&mut totals.total, transaction.amount)?;
            totals.transactions.push(transaction.source.clone());
        }

        let categorized = CategorizedTransaction {
            transaction: transaction.clone(),
            category: category.to_string(),
        };
        match transaction.kind {
            TransactionType::Credit => processed.transactions_by_type.credits.push(categorized),
            TransactionType::Debit => processed.transactions_by_type.debits.push(categorized),
        }
    }

    Ok(processed)
}

/// Runs the preprocessor on a stage `data` value.
pub fn process(data: &Value, now: DateTime<Utc>) -> Result<Value, ProcessorError> {
    let items = data
        .as_array()
        .ok_or(ProcessorError::InvalidInput("expecting array of transactions"))?;
    let transactions = items
        .iter()
        .map(|item| serde_json::from_value::<Transaction>(item.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProcessorError::Malformed(format!("bad transaction: {e}")))?;

    Ok(json!({
        "processed_data": group(&transactions)?,
        "metadata": {
            "transactions_processed": transactions.len(),
            "processing_timestamp": timestamp(now),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tx(source: &str, amount: i64, kind: TransactionType, date: &str) -> Transaction {
        Transaction {
            source: source.to_string(),
            amount,
            kind,
            date: date.to_string(),
        }
    }

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("Amazon Pay"), "shopping");
        assert_eq!(categorize("SWIGGY order"), "food");
        assert_eq!(categorize("HDFC Bank"), "banking");
        assert_eq!(categorize("Corner store"), "other");
    }

    #[test]
    fn test_group_splits_and_totals() {
        let processed = group(&[
            tx("Amazon", 1200, TransactionType::Debit, "2024-01-05"),
            tx("Salary", 50_000, TransactionType::Credit, "2024-01-05"),
            tx("Amazon", 300, TransactionType::Debit, "2024-01-06"),
        ])
        .unwrap();

        assert_eq!(processed.transactions_by_type.debits.len(), 2);
        assert_eq!(processed.transactions_by_type.credits.len(), 1);
        assert_eq!(processed.daily_totals["2024-01-05"].credits, 50_000);
        assert_eq!(processed.daily_totals["2024-01-05"].debits, 1200);
        assert_eq!(processed.categories["shopping"].total, 1500);
        assert_eq!(processed.categories["shopping"].transactions, vec!["Amazon", "Amazon"]);
        // credits create the category entry without adding to it
        assert_eq!(processed.categories["other"].total, 0);
        assert!(processed.categories["other"].transactions.is_empty());
    }

    #[test]
    fn test_process_output_shape() {
        let input = json!([
            {"source": "Amazon", "amount": 1200, "type": "debit", "date": "2024-01-05"}
        ]);
        let output = process(&input, Utc::now()).unwrap();

        let debit = &output["processed_data"]["transactions_by_type"]["debits"][0];
        assert_eq!(debit["category"], json!("shopping"));
        assert_eq!(debit["source"], json!("Amazon"));
        assert_eq!(output["metadata"]["transactions_processed"], json!(1));
    }

    #[test]
    fn test_overflowing_total_is_malformed() {
        let input = json!([
            {"source": "Amazon", "amount": i64::MAX, "type": "debit", "date": "2024-01-05"},
            {"source": "Amazon", "amount": 1, "type": "debit", "date": "2024-01-05"}
        ]);
        let err = process(&input, Utc::now()).unwrap_err();
        assert!(matches!(err, ProcessorError::Malformed(_)));
    }

    #[test]
    fn test_process_rejects_text() {
        let err = process(&json!("- Amazon: INR 1,200 (Debit) - 05/01/2024"), Utc::now())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: expecting array of transactions"
        );
    }
}
