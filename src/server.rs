//! Service runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: database and migrations, the
//! automation service with its adapters, the schedule controller, the REST
//! API and graceful shutdown. [`run_once`] wires the same components for a
//! single synchronous run without serving HTTP.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::services::{
    AutomationService, RunOutcome, ScheduleController, TariffStore, Trigger,
};
use crate::config::AppConfig;
use crate::domain::Period;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{
    init_database, DatabaseConfig, JsonTariffRepository, PdfReportRenderer, SeaOrmRunLedger,
    SmappeeSourceFactory, SmtpNotifierFactory,
};
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── Wiring ─────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process, so a
/// restart within the same process reuses the first handle.
fn prometheus_handle() -> PrometheusHandle {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    PROM_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            match metrics::set_global_recorder(recorder) {
                Ok(()) => info!("📊 Prometheus metrics recorder installed"),
                Err(e) => warn!(error = %e, "Metrics recorder already installed, /metrics stays empty"),
            }
            handle
        })
        .clone()
}

async fn open_ledger(
    config: &AppConfig,
    auto_migrate: bool,
) -> Result<DatabaseConnection, BoxError> {
    tokio::fs::create_dir_all(&config.storage.data_dir).await?;

    let db = init_database(&DatabaseConfig {
        url: config.connection_url(),
    })
    .await?;

    if auto_migrate {
        info!("Running database migrations...");
        Migrator::up(&db, None).await?;
        info!("Migrations completed");
    }
    Ok(db)
}

fn build_automation(
    config: &AppConfig,
    db: DatabaseConnection,
) -> Result<Arc<AutomationService>, BoxError> {
    let tariff_file = config.storage.tariff_file();
    let output_dir = config.storage.output_dir();
    info!(
        tariffs = %tariff_file.display(),
        output = %output_dir.display(),
        provider = %config.provider.base_url,
        "Wiring automation components"
    );

    Ok(Arc::new(AutomationService::new(
        Arc::new(SeaOrmRunLedger::new(db)),
        Arc::new(TariffStore::new(Arc::new(JsonTariffRepository::new(
            tariff_file,
        )))),
        Arc::new(SmappeeSourceFactory::new(&config.provider.base_url)?),
        Arc::new(PdfReportRenderer::new(
            output_dir,
            config.storage.logo_path.clone(),
        )),
        Arc::new(SmtpNotifierFactory),
        config.automation_defaults(),
    )))
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to the running service.
///
/// ```rust,no_run
/// use recharge::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub automation: Arc<AutomationService>,
    pub scheduler: Arc<ScheduleController>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    pub api_port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the service:
    ///
    /// 1. Install the Prometheus recorder
    /// 2. Open the run ledger and run migrations
    /// 3. Build the automation service and install the schedule
    /// 4. Serve the REST API (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, BoxError> {
        let config = opts.config;
        info!("Starting Recharge automation service...");

        let prometheus = prometheus_handle();
        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();
        spawn_metrics_upkeep(prometheus.clone(), shutdown_signal.clone());

        let db = open_ledger(&config, opts.auto_migrate).await?;
        let automation = build_automation(&config, db.clone())?;

        let scheduler = Arc::new(ScheduleController::new(
            automation.clone(),
            shutdown_signal.clone(),
        ));
        match scheduler.start().await {
            Some(next) => info!(next_fire = %next, "📅 Next scheduled run"),
            None => info!("📅 No scheduled run"),
        }

        let router = create_api_router(AppState::new(
            automation.clone(),
            scheduler.clone(),
            prometheus,
        ));

        let api_port = config.server.api_port;
        let api_addr = format!("{}:{}", config.server.api_host, api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Recharge automation service started");

        Ok(Self {
            automation,
            scheduler,
            config,
            api_port,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered.
    /// Runs already in flight are not awaited.
    pub async fn wait(self) {
        let Self {
            scheduler,
            db,
            shutdown,
            api_task,
            ..
        } = self;

        let completed = shutdown
            .run_cleanup(|| async move {
                scheduler.shutdown().await;
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task panicked: {}", e),
                }
            })
            .await;
        if !completed {
            warn!("Some tasks did not stop in time");
        }

        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 Recharge automation service stopped");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down Recharge automation service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

fn spawn_metrics_upkeep(handle: PrometheusHandle, shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        let stop = shutdown.notified().wait();
        tokio::pin!(stop);
        let mut ticker = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => handle.run_upkeep(),
                _ = &mut stop => break,
            }
        }
    });
}

/// Run the pipeline once for `period` as a manual trigger and return its
/// outcome. Nothing is served and no schedule is installed.
pub async fn run_once(opts: ServerOptions, period: Period) -> Result<RunOutcome, BoxError> {
    let db = open_ledger(&opts.config, opts.auto_migrate).await?;
    let automation = build_automation(&opts.config, db.clone())?;

    let outcome = automation.run(period, Trigger::Manual).await;

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    }
    Ok(outcome?)
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}
