use anyhow::Result;

use crate::period::BillingPeriod;
use crate::records::{Record, RecordKind};

/// Operations the download workflow needs from the billing API.
pub trait BillingApi {
    /// List the ids of records of the given kind issued during the period.
    async fn list_ids(&self, kind: RecordKind, period: &BillingPeriod) -> Result<Vec<String>>;

    /// Fetch the full record for an id.
    async fn get_record<R: Record>(&self, id: &str) -> Result<R>;

    /// List the ids of the bills settled by a deposit.
    async fn paid_bills(&self, deposit_id: &str) -> Result<Vec<String>>;

    /// Download a document from its url.
    async fn download_document(&self, url: &str) -> Result<Vec<u8>>;
}
