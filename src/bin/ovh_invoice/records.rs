//! Billing record types returned by the `/me` API.

use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Monetary amount as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    #[serde(default)]
    pub value: f64,
    /// Display text, e.g. `"12.00 €"`.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub currency_code: String,
}

/// The three record types fetched for a billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Deposit,
    Bill,
    Refund,
}

impl RecordKind {
    /// Path segment under `/me`.
    #[must_use]
    pub const fn api_path(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Bill => "bill",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_path())
    }
}

/// Common accessors for records that have a downloadable PDF document.
pub trait Record: DeserializeOwned {
    const KIND: RecordKind;

    fn id(&self) -> &str;

    fn pdf_url(&self) -> &str;

    /// Issue date as an ISO 8601 string.
    fn date(&self) -> &str;

    /// Tax-inclusive amount shown in status output.
    fn amount(&self) -> &Price;
}

/// Invoice issued for a billing period.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub bill_id: String,
    pub pdf_url: String,
    pub date: String,
    pub price_without_tax: Price,
    pub tax: Price,
    pub price_with_tax: Price,
}

/// Credit issued back to the customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub refund_id: String,
    pub pdf_url: String,
    pub date: String,
    pub price_without_tax: Price,
    pub tax: Price,
    pub price_with_tax: Price,
}

/// Payment transaction that settles one or more bills.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub deposit_id: String,
    pub pdf_url: String,
    pub date: String,
    pub amount: Price,
}

impl Record for Bill {
    const KIND: RecordKind = RecordKind::Bill;

    fn id(&self) -> &str {
        &self.bill_id
    }

    fn pdf_url(&self) -> &str {
        &self.pdf_url
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn amount(&self) -> &Price {
        &self.price_with_tax
    }
}

impl Record for Refund {
    const KIND: RecordKind = RecordKind::Refund;

    fn id(&self) -> &str {
        &self.refund_id
    }

    fn pdf_url(&self) -> &str {
        &self.pdf_url
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn amount(&self) -> &Price {
        &self.price_with_tax
    }
}

impl Record for Deposit {
    const KIND: RecordKind = RecordKind::Deposit;

    fn id(&self) -> &str {
        &self.deposit_id
    }

    fn pdf_url(&self) -> &str {
        &self.pdf_url
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn amount(&self) -> &Price {
        &self.amount
    }
}
