//! Statement text to transactions.

use super::model::{Transaction, TransactionType};
use super::{timestamp, ProcessorError};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)]
static TRANSACTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"- (.*?): INR ([0-9,]+) \((Credit|Debit)\) - ([0-9]{2})/([0-9]{2})/([0-9]{4})")
        .expect("transaction pattern is valid")
});

/// Parses every `INR` line of a statement.
///
/// Lines look like `- Amazon: INR 1,200 (Debit) - 05/01/2024`; anything
/// else is skipped.
#[must_use]
pub fn parse_transactions(text: &str) -> Vec<Transaction> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && line.contains("INR"))
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<Transaction> {
    let caps = TRANSACTION_LINE.captures(line)?;
    let amount = match caps[2].replace(',', "").parse::<i64>() {
        Ok(amount) => amount,
        Err(e) => {
            debug!(line, error = %e, "skipping line with unreadable amount");
            return None;
        }
    };
    let kind = if &caps[3] == "Credit" {
        TransactionType::Credit
    } else {
        TransactionType::Debit
    };

    Some(Transaction {
        source: caps[1].trim().to_string(),
        amount,
        kind,
        date: format!("{}-{}-{}", &caps[6], &caps[5], &caps[4]),
    })
}

/// Runs the cleaner on a stage `data` value.
pub fn process(data: &Value, now: DateTime<Utc>) -> Result<Value, ProcessorError> {
    let text = data
        .as_str()
        .ok_or(ProcessorError::InvalidInput("expecting statement text"))?;
    let transactions = parse_transactions(text);

    Ok(json!({
        "cleaned_transactions": transactions,
        "metadata": {
            "total_transactions": transactions.len(),
            "processing_timestamp": timestamp(now),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_debit() {
        let parsed = parse_transactions("- Amazon: INR 1,200 (Debit) - 05/01/2024");
        assert_eq!(
            parsed,
            vec![Transaction {
                source: "Amazon".to_string(),
                amount: 1200,
                kind: TransactionType::Debit,
                date: "2024-01-05".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_skips_noise_lines() {
        let text = "Statement for January\n\n\
                    - Salary: INR 50,000 (Credit) - 01/01/2024\n\
                    - Swiggy: 300 rupees\n\
                    - Netflix: INR 649 (Debit) - 03/01/2024\n";
        let parsed = parse_transactions(text);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].kind, TransactionType::Credit);
        assert_eq!(parsed[0].amount, 50_000);
        assert_eq!(parsed[1].source, "Netflix");
        assert_eq!(parsed[1].date, "2024-01-03");
    }

    #[test]
    fn test_parse_ascii_digits_only() {
        let arabic_indic_date = "- Amazon: INR 1,200 (Debit) - \u{665}\u{660}/\u{660}\u{661}/\u{662}\u{660}\u{662}\u{664}";
        assert!(parse_transactions(arabic_indic_date).is_empty());
        assert!(parse_transactions("- Amazon: INR \u{661},200 (Debit) - 05/01/2024").is_empty());
    }

    #[test]
    fn test_process_output_shape() {
        let now = Utc::now();
        let output = process(&json!("- HDFC: INR 10 (Credit) - 02/02/2024"), now).unwrap();

        assert_eq!(output["metadata"]["total_transactions"], json!(1));
        assert_eq!(output["cleaned_transactions"][0]["type"], json!("credit"));
        assert_eq!(output["cleaned_transactions"][0]["amount"], json!(10));
    }

    #[test]
    fn test_process_rejects_non_text() {
        let err = process(&json!([1, 2]), Utc::now()).unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidInput(_)));
    }
}
