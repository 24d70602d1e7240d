//! Durable storage for grouped invoices.
//!
//! Files are named `grouped_invoice_<invoiceId>.pdf` inside the configured
//! directory. Invoice ids are restricted to `[A-Za-z0-9_-]` so a lookup can
//! never leave that directory.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Longest invoice id accepted for storage.
const MAX_INVOICE_ID_LENGTH: usize = 128;

/// Errors from the invoice directory.
#[derive(Debug, Error)]
pub enum InvoiceStoreError {
    /// The id is empty, too long or has characters outside `[A-Za-z0-9_-]`.
    #[error("invalid invoice id")]
    InvalidId,

    /// No invoice was stored under this id.
    #[error("invoice not found")]
    NotFound,

    /// Filesystem failure.
    #[error("invoice storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory of rendered grouped invoices.
#[derive(Debug, Clone)]
pub struct InvoiceStore {
    dir: PathBuf,
}

impl InvoiceStore {
    /// Use `dir` for invoices. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, invoice_id: &str) -> Result<PathBuf, InvoiceStoreError> {
        if !is_valid_invoice_id(invoice_id) {
            return Err(InvoiceStoreError::InvalidId);
        }
        Ok(self.dir.join(format!("grouped_invoice_{invoice_id}.pdf")))
    }

    /// Write (or overwrite) an invoice.
    ///
    /// # Errors
    ///
    /// Returns `InvalidId` for an unsafe id and `Io` if the write fails.
    pub async fn save(&self, invoice_id: &str, pdf: &[u8]) -> Result<PathBuf, InvoiceStoreError> {
        let path = self.path_for(invoice_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, pdf).await?;
        tracing::debug!(path = %path.display(), "Invoice saved");
        Ok(path)
    }

    /// Read a previously saved invoice.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing was saved under this id (an unsafe id is
    /// also reported as `InvalidId`), and `Io` for other read failures.
    pub async fn load(&self, invoice_id: &str) -> Result<Vec<u8>, InvoiceStoreError> {
        let path = self.path_for(invoice_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(InvoiceStoreError::NotFound),
            Err(e) => Err(InvoiceStoreError::Io(e)),
        }
    }
}

/// Whether an id is safe to embed in a filename.
#[must_use]
pub fn is_valid_invoice_id(invoice_id: &str) -> bool {
    !invoice_id.is_empty()
        && invoice_id.len() <= MAX_INVOICE_ID_LENGTH
        && invoice_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_id_validation() {
        assert!(is_valid_invoice_id("pay_Nx81kQ2-a"));
        assert!(!is_valid_invoice_id(""));
        assert!(!is_valid_invoice_id("../etc/passwd"));
        assert!(!is_valid_invoice_id("a/b"));
        assert!(!is_valid_invoice_id("inv.pdf"));
        assert!(!is_valid_invoice_id(&"a".repeat(129)));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = InvoiceStore::new(tmp.path().join("invoices"));

        let path = store.save("pay_1", b"%PDF-1.4 test").await.unwrap();

        assert_eq!(path, tmp.path().join("invoices/grouped_invoice_pay_1.pdf"));
        assert_eq!(store.load("pay_1").await.unwrap(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = InvoiceStore::new(tmp.path());

        assert!(matches!(
            store.load("pay_missing").await,
            Err(InvoiceStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = InvoiceStore::new(tmp.path());

        assert!(matches!(
            store.load("../secret").await,
            Err(InvoiceStoreError::InvalidId)
        ));
        assert!(matches!(
            store.save("../secret", b"x").await,
            Err(InvoiceStoreError::InvalidId)
        ));
    }
}
