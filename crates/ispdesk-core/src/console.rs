// ── Console facade ──
//
// Owns the store, the device backend and every service handle. Callers
// log in once, then reach the services through an authorized `Session`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::auth::{Authenticator, Principal, SessionToken};
use crate::backend::{DeviceBackend, RouterOsConnector, SimulatedRouter};
use crate::billing::{Customers, Invoices, Packages};
use crate::config::{BackendMode, ConsoleConfig};
use crate::dashboard::{Dashboard, InsightProvider};
use crate::editor::ConfigEditor;
use crate::error::CoreError;
use crate::locks::DeviceLocks;
use crate::monitor::ClientMonitor;
use crate::registry::Registry;
use crate::store::{DataStore, Repository};
use crate::tester::ConnectionTester;

/// Entry point for every front end.
///
/// Cheaply cloneable via `Arc<ConsoleInner>`.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    store: Arc<DataStore>,
    repository: Repository,
    auth: Authenticator,
    registry: Registry,
    tester: ConnectionTester,
    editor: ConfigEditor,
    monitor: ClientMonitor,
    customers: Customers,
    packages: Packages,
    invoices: Invoices,
    dashboard: Dashboard,
}

impl Console {
    /// Load state from `repository` and wire up the services.
    pub fn open(config: ConsoleConfig, repository: Repository) -> Result<Self, CoreError> {
        let store = repository.load()?;
        Self::with_store(config, Arc::new(store), repository)
    }

    pub fn with_store(
        config: ConsoleConfig,
        store: Arc<DataStore>,
        repository: Repository,
    ) -> Result<Self, CoreError> {
        let backend = Arc::new(match config.backend.mode {
            BackendMode::Simulated => DeviceBackend::Simulated(SimulatedRouter::new(
                Arc::clone(&store),
                config.backend.simulated_latency,
                config.backend.unreachable_hosts.iter().cloned(),
            )),
            BackendMode::RouterOs => DeviceBackend::RouterOs(RouterOsConnector::new()),
        });
        let locks = Arc::new(DeviceLocks::new());
        let insights = InsightProvider::from_settings(&config.insights)?;
        debug!(backend = %config.backend.mode, insights = matches!(insights, InsightProvider::Gemini(_)), "console starting");

        let invoices = Invoices::new(Arc::clone(&store), config.billing.invoice_due_days);
        let overdue = invoices.refresh_overdue(Utc::now().date_naive());
        if overdue > 0 {
            info!(count = overdue, "invoices moved to overdue");
        }

        let inner = ConsoleInner {
            auth: Authenticator::new(&config.auth),
            registry: Registry::new(Arc::clone(&store), Arc::clone(&locks)),
            tester: ConnectionTester::new(
                Arc::clone(&store),
                Arc::clone(&backend),
                config.backend.probe_reset,
            ),
            editor: ConfigEditor::new(Arc::clone(&store), Arc::clone(&backend), Arc::clone(&locks)),
            monitor: ClientMonitor::new(Arc::clone(&store), Arc::clone(&backend), locks),
            customers: Customers::new(Arc::clone(&store)),
            packages: Packages::new(Arc::clone(&store)),
            invoices,
            dashboard: Dashboard::new(
                Arc::clone(&store),
                insights,
                config.billing.clone(),
                config.insights.timeout,
            ),
            store,
            repository,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Exchange the admin credentials for a bearer token.
    pub fn login(&self, username: &str, password: &str) -> Result<SessionToken, CoreError> {
        self.inner.auth.login(username, password)
    }

    /// Validate a bearer token. Missing or tampered tokens fail with
    /// `AuthenticationFailed`, stale ones with `SessionExpired`.
    pub fn authorize(&self, token: &str) -> Result<Session, CoreError> {
        let principal = self.inner.auth.verify(token)?;
        Ok(Session {
            console: self.clone(),
            principal,
        })
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// Write the store back if anything changed.
    pub fn save(&self) -> Result<bool, CoreError> {
        if !self.inner.store.is_dirty() {
            return Ok(false);
        }
        self.inner.repository.save(&self.inner.store)?;
        Ok(true)
    }
}

/// An authenticated view of the console. Every accessor re-checks that
/// the token is still within its lifetime.
#[derive(Clone)]
pub struct Session {
    console: Console,
    principal: Principal,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.principal.username
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    fn live(&self) -> Result<&ConsoleInner, CoreError> {
        if self.principal.is_expired() {
            return Err(CoreError::SessionExpired);
        }
        Ok(&self.console.inner)
    }

    pub fn registry(&self) -> Result<&Registry, CoreError> {
        Ok(&self.live()?.registry)
    }

    pub fn tester(&self) -> Result<&ConnectionTester, CoreError> {
        Ok(&self.live()?.tester)
    }

    pub fn editor(&self) -> Result<&ConfigEditor, CoreError> {
        Ok(&self.live()?.editor)
    }

    pub fn monitor(&self) -> Result<&ClientMonitor, CoreError> {
        Ok(&self.live()?.monitor)
    }

    pub fn customers(&self) -> Result<&Customers, CoreError> {
        Ok(&self.live()?.customers)
    }

    pub fn packages(&self) -> Result<&Packages, CoreError> {
        Ok(&self.live()?.packages)
    }

    pub fn invoices(&self) -> Result<&Invoices, CoreError> {
        Ok(&self.live()?.invoices)
    }

    pub fn dashboard(&self) -> Result<&Dashboard, CoreError> {
        Ok(&self.live()?.dashboard)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn console() -> Console {
        Console::open(ConsoleConfig::default(), Repository::Memory).unwrap()
    }

    #[test]
    fn services_need_a_valid_token() {
        let console = console();
        assert_eq!(
            console.authorize("garbage").err().map(|e| e.kind()),
            Some(ErrorKind::Auth)
        );

        let token = console.login("admin", "password").unwrap();
        let session = console.authorize(&token.token).unwrap();
        assert_eq!(session.username(), "admin");
        assert_eq!(session.registry().unwrap().list().len(), 3);
    }

    #[test]
    fn startup_marks_stale_invoices_overdue() {
        let console = console();
        let token = console.login("admin", "password").unwrap();
        let session = console.authorize(&token.token).unwrap();
        let invoices = session.invoices().unwrap();
        assert!(invoices.list(Some(crate::model::InvoiceStatus::Due)).is_empty());
        assert!(console.store().is_dirty());
    }

    #[test]
    fn save_is_a_no_op_when_clean() {
        let store = Arc::new(crate::store::seed::demo_store());
        let console =
            Console::with_store(ConsoleConfig::default(), Arc::clone(&store), Repository::Memory)
                .unwrap();
        assert!(console.save().unwrap());
        assert!(!console.save().unwrap());
    }
}
