//! Main download workflow for ovh-invoice.
//!
//! Fetches deposits, bills and refunds for one month, stores their PDF documents
//! and writes the `deposits.csv` and `bills.csv` summaries.
//! Errors for a single record are printed and the record is skipped.

use std::fmt;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::ProgressBar;

use crate::api::BillingApi;
use crate::config::Config;
use crate::ledger::{BILLS_FILE, BillsLedger, DEPOSITS_FILE, DepositIndex, DepositsLedger, format_date};
use crate::ovh::OvhClient;
use crate::period::BillingPeriod;
use crate::records::{Bill, Deposit, Record, RecordKind, Refund};
use crate::storage::InvoiceDirectory;

/// Counters for the end of run summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub deposits: usize,
    pub bills: usize,
    pub refunds: usize,
    /// Documents downloaded during this run.
    pub downloaded: usize,
    /// Documents that were already on disk.
    pub existing: usize,
    pub failed_downloads: usize,
    /// Records that could not be fetched and are missing from the CSV files.
    pub skipped_records: usize,
}

impl RunSummary {
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.failed_downloads > 0 || self.skipped_records > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {} {}", "Deposits:".bold(), self.deposits)?;
        writeln!(f, "  {} {}", "Bills:".bold(), self.bills)?;
        writeln!(f, "  {} {}", "Refunds:".bold(), self.refunds)?;
        write!(
            f,
            "  {} {} new, {} existing",
            "Documents:".bold(),
            self.downloaded.to_string().green(),
            self.existing
        )?;
        if self.failed_downloads > 0 {
            write!(f, "\n  {} {}", "Failed downloads:".red(), self.failed_downloads)?;
        }
        if self.skipped_records > 0 {
            write!(f, "\n  {} {}", "Skipped records:".red(), self.skipped_records)?;
        }
        Ok(())
    }
}

/// Runs the fetch and download phases against a billing API.
pub struct InvoiceDownloader<A: BillingApi> {
    api: A,
    period: BillingPeriod,
    directory: InvoiceDirectory,
    verbose: bool,
    summary: RunSummary,
    spinner: ProgressBar,
}

impl<A: BillingApi> InvoiceDownloader<A> {
    #[must_use]
    pub fn new(api: A, period: BillingPeriod, directory: InvoiceDirectory, verbose: bool) -> Self {
        Self {
            api,
            period,
            directory,
            verbose,
            summary: RunSummary::default(),
            spinner: Self::create_spinner(),
        }
    }

    /// Fetch all records for the period and write both CSV files.
    ///
    /// # Errors
    /// Returns an error if listing records fails or a CSV file cannot be written.
    /// Errors for individual records are printed and counted instead.
    pub async fn run(mut self) -> Result<RunSummary> {
        let mut deposit_index = DepositIndex::default();
        let mut deposits = DepositsLedger::default();
        let mut bills = BillsLedger::default();

        self.collect_deposits(&mut deposits, &mut deposit_index).await?;
        self.collect_bills(&mut bills, &deposit_index).await?;
        self.collect_refunds(&mut bills).await?;

        self.spinner.finish_and_clear();

        if bills.has_mixed_currency() {
            ovh_invoice::print_warning!("Bills use more than one currency, totals mix currencies");
        }

        deposits.write(&self.directory.csv_path(DEPOSITS_FILE))?;
        bills.write(&self.directory.csv_path(BILLS_FILE))?;

        Ok(self.summary)
    }

    async fn collect_deposits(&mut self, ledger: &mut DepositsLedger, index: &mut DepositIndex) -> Result<()> {
        for id in self.list(RecordKind::Deposit).await? {
            let Some(deposit) = self.fetch::<Deposit>(&id).await else {
                continue;
            };
            self.ensure_document(&deposit).await;

            let paid_bills = match self.api.paid_bills(&id).await {
                Ok(bill_ids) => bill_ids,
                Err(error) => {
                    self.report_error(&format!("Failed to get paid bills for deposit {id}: {error:#}"));
                    Vec::new()
                }
            };

            index.insert(&id, &paid_bills);
            ledger.add(&deposit, &paid_bills);
            self.summary.deposits += 1;
        }
        Ok(())
    }

    async fn collect_bills(&mut self, ledger: &mut BillsLedger, index: &DepositIndex) -> Result<()> {
        for id in self.list(RecordKind::Bill).await? {
            let Some(bill) = self.fetch::<Bill>(&id).await else {
                continue;
            };
            ledger.add_bill(&bill, index.deposit_for(&id));
            self.summary.bills += 1;
            self.ensure_document(&bill).await;
        }
        Ok(())
    }

    async fn collect_refunds(&mut self, ledger: &mut BillsLedger) -> Result<()> {
        for id in self.list(RecordKind::Refund).await? {
            let Some(refund) = self.fetch::<Refund>(&id).await else {
                continue;
            };
            ledger.add_refund(&refund);
            self.summary.refunds += 1;
            self.ensure_document(&refund).await;
        }
        Ok(())
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<String>> {
        self.spinner.set_message(format!("Listing {kind}s for {}", self.period));
        let ids = self
            .api
            .list_ids(kind, &self.period)
            .await
            .with_context(|| format!("Failed to list {kind}s for {}", self.period))?;
        if self.verbose {
            self.spinner.suspend(|| println!("{} {}s: {}", "Found".bold(), kind, ids.len()));
        }
        Ok(ids)
    }

    /// Fetch a record, printing and counting the error if it fails.
    async fn fetch<R: Record>(&mut self, id: &str) -> Option<R> {
        self.spinner.set_message(format!("Fetching {} {id}", R::KIND));
        match self.api.get_record::<R>(id).await {
            Ok(record) => Some(record),
            Err(error) => {
                self.report_error(&format!("Failed to get {} {id}: {error:#}", R::KIND));
                self.summary.skipped_records += 1;
                None
            }
        }
    }

    /// Download the record's PDF unless it is already stored.
    async fn ensure_document<R: Record>(&mut self, record: &R) {
        let id = record.id();
        if self.directory.has_document(id) {
            self.summary.existing += 1;
            self.print_record(record, "exists".dimmed());
            return;
        }

        self.spinner.set_message(format!("Downloading {} {id}", R::KIND));
        let result = match self.api.download_document(record.pdf_url()).await {
            Ok(bytes) => self.directory.store_document(id, &bytes),
            Err(error) => Err(error),
        };

        match result {
            Ok(_) => {
                self.summary.downloaded += 1;
                self.print_record(record, "downloaded".green());
            }
            Err(error) => {
                self.summary.failed_downloads += 1;
                self.report_error(&format!("Failed to download {} {id}: {error:#}", R::KIND));
            }
        }
    }

    fn print_record<R: Record>(&self, record: &R, status: colored::ColoredString) {
        if self.verbose {
            self.spinner.suspend(|| {
                println!(
                    "  {:<8} {:<14} {} {:>12}  {status}",
                    R::KIND.to_string(),
                    record.id(),
                    format_date(record.date()),
                    record.amount().text,
                );
            });
        }
    }

    fn report_error(&self, message: &str) {
        self.spinner.suspend(|| ovh_invoice::print_error!("{message}"));
    }

    /// Create a spinner that is hidden during tests.
    fn create_spinner() -> ProgressBar {
        #[cfg(test)]
        {
            ProgressBar::hidden()
        }
        #[cfg(not(test))]
        {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                indicatif::ProgressStyle::with_template("{spinner:.green} {msg}")
                    .expect("Failed to set spinner template"),
            );
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));
            spinner
        }
    }
}

/// Download all documents for the configured month.
///
/// The invoice directory is checked before any network request is made.
///
/// # Errors
/// Returns an error if the invoice directory is missing, the API client cannot be created,
/// listing records fails, or the CSV files cannot be written.
pub async fn download_invoices(config: &Config) -> Result<RunSummary> {
    let directory = InvoiceDirectory::prepare(&config.dir, &config.period)?;
    let client = OvhClient::connect(&config.endpoint, config.credentials.clone())
        .await
        .context("Failed to connect to the OVH API")?;

    println!(
        "{} {} to {}",
        "Downloading".bold(),
        config.period.to_string().cyan(),
        ovh_invoice::path_to_string_relative(directory.path())
    );
    if config.verbose {
        println!("{} {}", "API:".bold(), client.base_url());
    }

    InvoiceDownloader::new(client, config.period.clone(), directory, config.verbose)
        .run()
        .await
}
