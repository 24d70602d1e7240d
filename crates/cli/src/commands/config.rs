//! Configuration check command.

use parlour_server::config::{AppConfig, ConfigError};

/// Load the server configuration the same way the server does and report
/// the non-secret parts.
///
/// # Errors
///
/// Returns the first missing or invalid variable.
pub fn check() -> Result<(), ConfigError> {
    let config = AppConfig::from_env()?;

    tracing::info!(
        addr = %config.socket_addr(),
        business = %config.business.name,
        smtp_host = %config.email.smtp_host,
        payment_base_url = %config.payment.base_url,
        invoice_dir = %config.invoice_dir.display(),
        origins = config.allowed_origins.len(),
        sentry = config.sentry_dsn.is_some(),
        "Configuration OK"
    );
    Ok(())
}
