//! CSV format handling for operation scripts and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - ScriptRecord structure for deserialization
//! - Conversion from script records to [`Operation`]s
//! - Balance output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Script format
//!
//! ```text
//! op,account,to,amount
//! create,left,,
//! deposit,left,,100
//! transfer,left,right,25
//! ```
//!
//! Conversion only checks structure (known op, required fields present,
//! amount is an integer). Semantic checks such as blank ids or non-positive
//! amounts are left to the ledger so they count as rejected operations.

use crate::types::{Account, Amount, Operation, OperationKind};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScriptRecord {
    pub op: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// Convert a ScriptRecord to an Operation
///
/// # Arguments
///
/// * `record` - The deserialized CSV record
///
/// # Returns
///
/// * `Ok(Operation)` - Successfully converted record
/// * `Err(String)` - Description of the conversion failure
pub fn convert_script_record(record: ScriptRecord) -> Result<Operation, String> {
    let kind = match record.op.to_lowercase().as_str() {
        "create" => OperationKind::Create,
        "deposit" => OperationKind::Deposit,
        "transfer" => OperationKind::Transfer,
        _ => return Err(format!("Unknown operation '{}'", record.op)),
    };

    let account = record
        .account
        .ok_or_else(|| format!("{:?} requires an account", kind))?;

    let amount = match record.amount.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse::<Amount>()
                .map_err(|_| format!("Invalid amount '{}' for account '{}'", raw, account))?,
        ),
        _ => None,
    };

    let operation = match kind {
        OperationKind::Create => Operation::Create { account },
        OperationKind::Deposit => Operation::Deposit {
            amount: amount.ok_or_else(|| format!("Deposit to '{}' requires an amount", account))?,
            account,
        },
        OperationKind::Transfer => {
            let to = record
                .to
                .ok_or_else(|| format!("Transfer from '{}' requires a target account", account))?;
            Operation::Transfer {
                amount: amount.ok_or_else(|| {
                    format!("Transfer from '{}' requires an amount", account)
                })?,
                from: account,
                to,
            }
        }
    };

    Ok(operation)
}

/// Write account balances to CSV format
///
/// Writes accounts in CSV format with columns: account, balance
/// Accounts are sorted by id for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of account snapshots to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_balances_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    for account in sorted {
        writer
            .write_record([account.id.clone(), account.balance.to_string()])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(op: &str, account: Option<&str>, to: Option<&str>, amount: Option<&str>) -> ScriptRecord {
        ScriptRecord {
            op: op.to_string(),
            account: account.map(str::to_string),
            to: to.map(str::to_string),
            amount: amount.map(str::to_string),
        }
    }

    #[rstest]
    #[case::create(
        record("create", Some("left"), None, None),
        Operation::Create { account: "left".into() }
    )]
    #[case::deposit(
        record("deposit", Some("left"), None, Some(" 100 ")),
        Operation::Deposit { account: "left".into(), amount: 100 }
    )]
    #[case::transfer_uppercase(
        record("TRANSFER", Some("left"), Some("right"), Some("5")),
        Operation::Transfer { from: "left".into(), to: "right".into(), amount: 5 }
    )]
    #[case::negative_amount_left_to_ledger(
        record("deposit", Some("left"), None, Some("-3")),
        Operation::Deposit { account: "left".into(), amount: -3 }
    )]
    #[case::create_ignores_amount(
        record("create", Some("left"), None, Some("9")),
        Operation::Create { account: "left".into() }
    )]
    fn test_convert_script_record_valid(#[case] input: ScriptRecord, #[case] expected: Operation) {
        assert_eq!(convert_script_record(input), Ok(expected));
    }

    #[rstest]
    #[case::unknown_op(record("withdraw", Some("a"), None, Some("1")), "Unknown operation")]
    #[case::missing_account(record("create", None, None, None), "requires an account")]
    #[case::deposit_missing_amount(record("deposit", Some("a"), None, None), "requires an amount")]
    #[case::deposit_blank_amount(record("deposit", Some("a"), None, Some("  ")), "requires an amount")]
    #[case::fractional_amount(record("deposit", Some("a"), None, Some("1.5")), "Invalid amount")]
    #[case::transfer_missing_target(
        record("transfer", Some("a"), None, Some("1")),
        "requires a target account"
    )]
    fn test_convert_script_record_errors(#[case] input: ScriptRecord, #[case] expected_error: &str) {
        let result = convert_script_record(input);
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[rstest]
    #[case::sorted(
        vec![
            Account { id: "right".into(), balance: 215, version: Some(3) },
            Account { id: "left".into(), balance: 135, version: Some(9) },
        ],
        "account,balance\nleft,135\nright,215\n"
    )]
    #[case::quoted_id(
        vec![Account { id: "a,b".into(), balance: 0, version: None }],
        "account,balance\n\"a,b\",0\n"
    )]
    #[case::empty(vec![], "account,balance\n")]
    fn test_write_balances_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_balances_csv(&accounts, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }
}
