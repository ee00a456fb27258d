//! Testing utilities for stagechain pipelines.
//!
//! This module provides:
//! - A scripted stage transport that records every call
//! - Sample request text

mod mocks;

pub use mocks::ScriptedTransport;

/// A one-transaction request: a debit of INR 1,200 to Amazon on 5 Jan 2024.
pub const SAMPLE_REQUEST: &str = "- Amazon: INR 1,200 (Debit) - 05/01/2024";

/// A mixed statement with credits, debits and an unparsable line.
pub const SAMPLE_STATEMENT: &str = "\
Account statement
- Salary ACME Corp: INR 50,000 (Credit) - 01/01/2024
- Amazon order: INR 2,499 (Debit) - 03/01/2024
- Swiggy: INR 350 (Debit) - 03/01/2024
- HDFC credit card bill: INR 12,000 (Debit) - 10/01/2024
- Misc transfer INR 100 - 11/01/2024
";
