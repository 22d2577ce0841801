//! CSV summaries for bills, refunds and deposits.
//!
//! Output uses `;` as the field separator, a comma as the decimal separator
//! and plain LF line endings.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};

use crate::records::{Bill, Deposit, Price, Refund};

pub const BILLS_FILE: &str = "bills.csv";
pub const DEPOSITS_FILE: &str = "deposits.csv";

const BILLS_HEADER: [&str; 6] = ["Facture", "Date", "Prix HT", "TVA", "Prix TTC", "Prélèvement"];
const DEPOSITS_HEADER: [&str; 4] = ["Prélèvement", "Date", "Prix TTC", "Factures"];
const TOTALS_LABEL: &str = "Totaux";

/// Reformat an ISO 8601 date `YYYY-MM-DD...` as `DD/MM/YYYY`.
///
/// Uses fixed positions instead of parsing.
/// Values that are too short to slice are returned unchanged.
#[must_use]
pub fn format_date(date: &str) -> String {
    match (date.get(..4), date.get(5..7), date.get(8..10)) {
        (Some(year), Some(month), Some(day)) => format!("{day}/{month}/{year}"),
        _ => date.to_string(),
    }
}

/// Format an amount with two decimals and a comma as the decimal separator.
///
/// Values that round to zero are written as `0,00` without a sign.
#[must_use]
pub fn format_amount(value: f64) -> String {
    let text = format!("{value:.2}");
    let text = text.strip_prefix('-').filter(|digits| *digits == "0.00").unwrap_or(text.as_str());
    text.replace('.', ",")
}

/// Running sums over all bill and refund rows.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Totals {
    pub without_tax: f64,
    pub tax: f64,
    pub with_tax: f64,
}

impl Totals {
    fn add(&mut self, without_tax: &Price, tax: &Price, with_tax: &Price) {
        self.without_tax += without_tax.value;
        self.tax += tax.value;
        self.with_tax += with_tax.value;
    }
}

/// Maps a bill id to the id of the deposit that paid it.
#[derive(Debug, Default)]
pub struct DepositIndex {
    paid_by: HashMap<String, String>,
}

impl DepositIndex {
    /// Record every bill in `bill_ids` as paid by `deposit_id`.
    pub fn insert(&mut self, deposit_id: &str, bill_ids: &[String]) {
        for bill_id in bill_ids {
            self.paid_by.insert(bill_id.clone(), deposit_id.to_string());
        }
    }

    #[must_use]
    pub fn deposit_for(&self, bill_id: &str) -> Option<&str> {
        self.paid_by.get(bill_id).map(String::as_str)
    }
}

/// Rows for `bills.csv`: bills and refunds followed by a totals row.
#[derive(Debug, Default)]
pub struct BillsLedger {
    rows: Vec<[String; 6]>,
    totals: Totals,
    currency: Option<String>,
    mixed_currency: bool,
}

impl BillsLedger {
    pub fn add_bill(&mut self, bill: &Bill, deposit_id: Option<&str>) {
        self.push(
            &bill.bill_id,
            &bill.date,
            [&bill.price_without_tax, &bill.tax, &bill.price_with_tax],
            deposit_id.unwrap_or_default(),
        );
    }

    pub fn add_refund(&mut self, refund: &Refund) {
        self.push(
            &refund.refund_id,
            &refund.date,
            [&refund.price_without_tax, &refund.tax, &refund.price_with_tax],
            "",
        );
    }

    fn push(&mut self, id: &str, date: &str, [without_tax, tax, with_tax]: [&Price; 3], deposit_id: &str) {
        self.track_currency(with_tax);
        self.totals.add(without_tax, tax, with_tax);
        self.rows.push([
            id.to_string(),
            format_date(date),
            format_amount(without_tax.value),
            format_amount(tax.value),
            format_amount(with_tax.value),
            deposit_id.to_string(),
        ]);
    }

    fn track_currency(&mut self, price: &Price) {
        if price.currency_code.is_empty() {
            return;
        }
        match &self.currency {
            None => self.currency = Some(price.currency_code.clone()),
            Some(currency) if *currency != price.currency_code => self.mixed_currency = true,
            Some(_) => {}
        }
    }

    #[must_use]
    pub const fn totals(&self) -> &Totals {
        &self.totals
    }

    /// True if rows with different currency codes were added, which makes the totals meaningless.
    #[must_use]
    pub const fn has_mixed_currency(&self) -> bool {
        self.mixed_currency
    }

    #[must_use]
    pub fn totals_row(&self) -> [String; 6] {
        [
            TOTALS_LABEL.to_string(),
            String::new(),
            format_amount(self.totals().without_tax),
            format_amount(self.totals().tax),
            format_amount(self.totals().with_tax),
            String::new(),
        ]
    }

    /// Write header, rows and the totals row.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv_writer(writer);
        writer.write_record(BILLS_HEADER)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.write_record(self.totals_row())?;
        writer.flush()?;
        Ok(())
    }

    /// Write the ledger to the given file, replacing any previous version.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_to(file)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Rows for `deposits.csv`.
#[derive(Debug, Default)]
pub struct DepositsLedger {
    rows: Vec<[String; 4]>,
}

impl DepositsLedger {
    pub fn add(&mut self, deposit: &Deposit, paid_bills: &[String]) {
        self.rows.push([
            deposit.deposit_id.clone(),
            format_date(&deposit.date),
            format_amount(deposit.amount.value),
            paid_bills.join(", "),
        ]);
    }

    /// Write header and rows.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv_writer(writer);
        writer.write_record(DEPOSITS_HEADER)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the ledger to the given file, replacing any previous version.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_to(file)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer)
}

#[cfg(test)]
mod test_ledger {
    use super::*;

    fn price(value: f64) -> Price {
        Price {
            value,
            text: format!("{value:.2} €"),
            currency_code: "EUR".to_string(),
        }
    }

    fn bill(id: &str, without_tax: f64, tax: f64) -> Bill {
        Bill {
            bill_id: id.to_string(),
            pdf_url: format!("https://example.com/{id}.pdf"),
            date: "2024-03-15T10:00:00+01:00".to_string(),
            price_without_tax: price(without_tax),
            tax: price(tax),
            price_with_tax: price(without_tax + tax),
        }
    }

    fn refund(id: &str, without_tax: f64, tax: f64) -> Refund {
        Refund {
            refund_id: id.to_string(),
            pdf_url: format!("https://example.com/{id}.pdf"),
            date: "2024-03-20T08:30:00+01:00".to_string(),
            price_without_tax: price(without_tax),
            tax: price(tax),
            price_with_tax: price(without_tax + tax),
        }
    }

    fn written(ledger: &BillsLedger) -> String {
        let mut buffer = Vec::new();
        ledger.write_to(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn format_date_reorders_iso_date() {
        assert_eq!(format_date("2024-03-15T10:00:00+01:00"), "15/03/2024");
        assert_eq!(format_date("2023-12-01"), "01/12/2023");
    }

    #[test]
    fn format_date_keeps_short_values() {
        assert_eq!(format_date("2024-03"), "2024-03");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn format_amount_uses_comma() {
        assert_eq!(format_amount(1234.5), "1234,50");
        assert_eq!(format_amount(0.0), "0,00");
        assert_eq!(format_amount(-12.345), "-12,35");
        assert_eq!(format_amount(7.0), "7,00");
    }

    #[test]
    fn format_amount_drops_sign_of_zero() {
        assert_eq!(format_amount(-0.0), "0,00");
        assert_eq!(format_amount(-0.001), "0,00");
        assert_eq!(format_amount(-0.1 - 0.2 + 0.3), "0,00");
        assert_eq!(format_amount(-0.005_1), "-0,01");
    }

    #[test]
    fn totals_that_cancel_out_are_unsigned() {
        let mut ledger = BillsLedger::default();
        ledger.add_refund(&refund("AV1", -0.1, 0.0));
        ledger.add_refund(&refund("AV2", -0.2, 0.0));
        ledger.add_bill(&bill("FR1", 0.3, 0.0), None);

        let output = written(&ledger);
        assert_eq!(output.lines().last(), Some("Totaux;;0,00;0,00;0,00;"));
    }

    #[test]
    fn empty_bills_ledger_has_header_and_zero_totals() {
        let ledger = BillsLedger::default();
        assert_eq!(
            written(&ledger),
            "Facture;Date;Prix HT;TVA;Prix TTC;Prélèvement\nTotaux;;0,00;0,00;0,00;\n"
        );
    }

    #[test]
    fn empty_deposits_ledger_has_only_header() {
        let mut buffer = Vec::new();
        DepositsLedger::default().write_to(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "Prélèvement;Date;Prix TTC;Factures\n");
    }

    #[test]
    fn totals_sum_bills_and_refunds() {
        let mut ledger = BillsLedger::default();
        ledger.add_bill(&bill("FR1", 10.0, 2.0), Some("DEP1"));
        ledger.add_bill(&bill("FR2", 0.1, 0.02), None);
        ledger.add_refund(&refund("AV1", -5.0, -1.0));

        let totals = ledger.totals();
        ovh_invoice::assert_f64_eq(totals.without_tax, 10.0 + 0.1 - 5.0);
        ovh_invoice::assert_f64_eq(totals.tax, 2.0 + 0.02 - 1.0);
        ovh_invoice::assert_f64_eq(totals.with_tax, 12.0 + 0.12 - 6.0);

        let output = written(&ledger);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "FR1;15/03/2024;10,00;2,00;12,00;DEP1");
        assert_eq!(lines[2], "FR2;15/03/2024;0,10;0,02;0,12;");
        assert_eq!(lines[3], "AV1;20/03/2024;-5,00;-1,00;-6,00;");
        assert_eq!(lines[4], "Totaux;;5,10;1,02;6,12;");
    }

    #[test]
    fn output_uses_lf_line_endings() {
        let mut ledger = BillsLedger::default();
        ledger.add_bill(&bill("FR1", 1.0, 0.2), None);
        assert!(!written(&ledger).contains('\r'));
    }

    #[test]
    fn deposit_row_lists_paid_bills() {
        let mut ledger = DepositsLedger::default();
        let deposit = Deposit {
            deposit_id: "DEP1".to_string(),
            pdf_url: String::new(),
            date: "2024-03-20T00:00:00+01:00".to_string(),
            amount: price(1234.5),
        };
        ledger.add(&deposit, &["FR1".to_string(), "FR2".to_string()]);

        let mut buffer = Vec::new();
        ledger.write_to(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output.lines().nth(1), Some("DEP1;20/03/2024;1234,50;FR1, FR2"));
    }

    #[test]
    fn deposit_index_maps_bills() {
        let mut index = DepositIndex::default();
        index.insert("DEP1", &["FR1".to_string(), "FR2".to_string()]);
        index.insert("DEP2", &["FR3".to_string()]);
        assert_eq!(index.deposit_for("FR2"), Some("DEP1"));
        assert_eq!(index.deposit_for("FR3"), Some("DEP2"));
        assert_eq!(index.deposit_for("FR4"), None);
    }

    #[test]
    fn mixed_currency_is_detected() {
        let mut ledger = BillsLedger::default();
        ledger.add_bill(&bill("FR1", 1.0, 0.2), None);
        assert!(!ledger.has_mixed_currency());

        let mut other = bill("CA1", 1.0, 0.0);
        other.price_with_tax.currency_code = "CAD".to_string();
        ledger.add_bill(&other, None);
        assert!(ledger.has_mixed_currency());
    }

    #[test]
    fn write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BILLS_FILE);
        BillsLedger::default().write(&path).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("Facture;"));
    }
}
