//! Invoice directory layout: `<dir>/<year>/<month>/<id>.pdf`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

use crate::period::BillingPeriod;

/// Month directory where documents and CSV summaries are stored.
#[derive(Debug, Clone)]
pub struct InvoiceDirectory {
    month_dir: PathBuf,
}

impl InvoiceDirectory {
    /// Check that the base directory exists and create the year and month directories under it.
    ///
    /// # Errors
    /// Returns an error if the base directory is missing or the month directory cannot be created.
    pub fn prepare(base_dir: &Path, period: &BillingPeriod) -> Result<Self> {
        let base_dir =
            ovh_invoice::resolve_existing_directory(base_dir).context("Invoice directory does not exist")?;
        let month_dir = base_dir.join(period.year_dir()).join(period.month_dir());
        fs::create_dir_all(&month_dir)
            .with_context(|| format!("Failed to create directory: '{}'", month_dir.display()))?;
        Ok(Self { month_dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.month_dir
    }

    /// Path of the PDF for the given record id.
    ///
    /// # Errors
    /// Returns an error if the id cannot be used as a file name.
    pub fn document_path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            bail!("Invalid document id: '{id}'");
        }
        Ok(self.month_dir.join(format!("{id}.pdf")))
    }

    /// A stored document counts as already downloaded.
    #[must_use]
    pub fn has_document(&self, id: &str) -> bool {
        self.document_path(id).is_ok_and(|path| path.exists())
    }

    /// Write the document through a temporary file so an interrupted write never leaves a partial PDF.
    ///
    /// # Errors
    /// Returns an error if writing or renaming the file fails.
    pub fn store_document(&self, id: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.document_path(id)?;
        let mut file = NamedTempFile::new_in(&self.month_dir)
            .with_context(|| format!("Failed to create temporary file in {}", self.month_dir.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("Failed to write document {id}"))?;
        file.as_file()
            .sync_all()
            .with_context(|| format!("Failed to flush document {id}"))?;
        file.persist(&path)
            .map_err(|error| error.error)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        Ok(path)
    }

    #[must_use]
    pub fn csv_path(&self, file_name: &str) -> PathBuf {
        self.month_dir.join(file_name)
    }
}
