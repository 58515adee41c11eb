// 📤 CSV export of an account's ledger

use crate::entities::ledger::LedgerEntry;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Type")]
    kind: &'static str,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Reference")]
    reference: &'a str,
}

/// Write entries (in the order given) as CSV with a header row
pub fn write_history_csv<W: Write>(writer: W, entries: &[LedgerEntry]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    for entry in entries {
        wtr.serialize(HistoryRow {
            timestamp: entry.timestamp.to_rfc3339(),
            kind: entry.kind.as_str(),
            amount: entry.amount.to_string(),
            reference: &entry.reference,
        })?;
    }

    if entries.is_empty() {
        wtr.write_record(["Timestamp", "Type", "Amount", "Reference"])?;
    }

    wtr.flush()?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ledger::EntryKind;
    use crate::money::Amount;
    use chrono::{TimeZone, Utc};

    fn entry(id: i64, kind: EntryKind, amount: &str) -> LedgerEntry {
        LedgerEntry {
            id,
            reference: format!("ref-{}", id),
            account_id: 1,
            kind,
            amount: Amount::parse(amount).unwrap(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, id as u32).unwrap(),
        }
    }

    #[test]
    fn test_csv_export() {
        let entries = vec![
            entry(2, EntryKind::Withdrawal, "30"),
            entry(1, EntryKind::Deposit, "100"),
        ];

        let mut out = Vec::new();
        let written = write_history_csv(&mut out, &entries).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(written, 2);
        assert_eq!(lines[0], "Timestamp,Type,Amount,Reference");
        assert_eq!(lines[1], "2024-01-01T12:00:02+00:00,Withdrawal,30.00,ref-2");
        assert_eq!(lines[2], "2024-01-01T12:00:01+00:00,Deposit,100.00,ref-1");
    }

    #[test]
    fn test_csv_amounts_match_stored_values() {
        let entries = vec![
            entry(1, EntryKind::Deposit, "0.05"),
            entry(2, EntryKind::Deposit, "12.34"),
            entry(3, EntryKind::Withdrawal, "7.1"),
        ];

        let mut out = Vec::new();
        write_history_csv(&mut out, &entries).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_slice());
        let amounts: Vec<rust_decimal::Decimal> = rdr
            .records()
            .map(|r| r.unwrap()[2].parse().unwrap())
            .collect();
        let stored: Vec<_> = entries.iter().map(|e| e.amount.value()).collect();
        assert_eq!(amounts, stored);
    }

    #[test]
    fn test_csv_export_empty_has_header() {
        let mut out = Vec::new();
        write_history_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "Timestamp,Type,Amount,Reference");
    }
}
