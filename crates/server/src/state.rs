//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Stores;
use crate::services::appointments::Scheduler;
use crate::services::auth::{AuthService, SessionTokens};
use crate::services::chatbot::Chatbot;
use crate::services::email::Notifier;
use crate::services::invoice::InvoiceStore;
use crate::services::orders::Reconciler;
use crate::services::payment::{PaymentGateway, Payments};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Every external collaborator (stores, mail
/// relay, payment gateway, chatbot) is constructed once at startup and
/// injected here, so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    stores: Stores,
    notifier: Arc<dyn Notifier>,
    gateway: Arc<dyn PaymentGateway>,
    chatbot: Arc<dyn Chatbot>,
    tokens: SessionTokens,
    invoices: InvoiceStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: AppConfig,
        stores: Stores,
        notifier: Arc<dyn Notifier>,
        gateway: Arc<dyn PaymentGateway>,
        chatbot: Arc<dyn Chatbot>,
    ) -> Self {
        let tokens = SessionTokens::new(config.token_secret.clone());
        let invoices = InvoiceStore::new(config.invoice_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                notifier,
                gateway,
                chatbot,
                tokens,
                invoices,
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get a reference to the chatbot relay.
    #[must_use]
    pub fn chatbot(&self) -> &dyn Chatbot {
        self.inner.chatbot.as_ref()
    }

    /// Account operations for this request.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.inner.stores.users.as_ref(),
            self.inner.notifier.as_ref(),
            &self.inner.tokens,
        )
    }

    /// Slot booking for this request.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler<'_> {
        Scheduler::new(
            self.inner.stores.appointments.as_ref(),
            self.inner.notifier.as_ref(),
            &self.inner.config.business,
        )
    }

    /// Order reconciliation for this request.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(
            self.inner.stores.orders.as_ref(),
            self.inner.notifier.as_ref(),
            &self.inner.invoices,
            &self.inner.config.business.name,
        )
    }

    /// Gateway order creation for this request.
    #[must_use]
    pub fn payments(&self) -> Payments<'_> {
        Payments::new(self.inner.gateway.as_ref())
    }
}
