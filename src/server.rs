/// Server setup and initialization
///
/// Wires together all components: storage, bot sessions, registry, execution
/// engine, triggers and HTTP routes.

use crate::{
    api::{create_bot_routes, create_command_routes, create_webhook_routes, create_workflow_routes, AppState},
    bot::{BotRegistry, MatrixConnector},
    command::CommandCatalog,
    config::Config,
    runtime::{
        engine::ExecutionEngine,
        executor::{ExternalAuth, RunnerCatalog, RunnerDeps},
        scheduler::PollSchedulerService,
    },
    trigger::{CommandTrigger, TriggerDispatcher},
    workflow::{
        registry::WorkflowRegistry,
        storage::{BotSource, WorkflowStorage},
    },
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Create the main Axum application with all routes
///
/// Opens the database, logs every active bot in, loads workflows and starts
/// the poll scheduler in the background.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("📋 Initializing workflow storage");
    let storage = WorkflowStorage::connect(&config.database.url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open workflow database: {}", e))?;
    storage
        .init_schema()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize schema: {}", e))?;

    let http = config
        .http
        .build_client()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

    tracing::info!("🤖 Logging bots in");
    let bot_records = storage
        .find_active_bots()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load bot records: {}", e))?;
    let connector = MatrixConnector::new(config.matrix.default_homeserver.clone(), http.clone());
    let bots = Arc::new(BotRegistry::connect(bot_records, &connector).await);
    if let Err(e) = bots.get_primary_client() {
        tracing::error!("❌ {}: command replies and presence filtering will fail", e);
    }

    let deps = RunnerDeps::new(bots, http).with_external_auth(ExternalAuth {
        header: config.http.external_auth_header.clone(),
        value: config.http.external_auth_value.clone(),
    });

    let (app, state) = assemble(storage, deps).await?;

    tracing::info!("🚀 Starting poll scheduler");
    let scheduler = Arc::clone(&state.scheduler);
    tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            tracing::error!("❌ Failed to start poll scheduler: {}", e);
        }
    });

    Ok(app)
}

/// Build the router and shared state on top of ready storage and sessions
///
/// Loads all workflows into the registry but does not start the scheduler.
pub async fn assemble(storage: WorkflowStorage, deps: RunnerDeps) -> Result<(Router, AppState)> {
    tracing::info!("📊 Initializing workflow registry");
    let registry = Arc::new(WorkflowRegistry::new(storage.clone()));
    registry
        .init_from_storage()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load workflows from storage: {}", e))?;

    let bots = Arc::clone(&deps.bots);
    let http = deps.http.clone();

    tracing::info!("⚙️ Initializing execution engine");
    let catalog = Arc::new(RunnerCatalog::default());
    tracing::debug!("🧩 Step varieties: {:?}", catalog.varieties());
    let engine = Arc::new(ExecutionEngine::new(Arc::new(storage.clone()), catalog, deps));
    let dispatcher = Arc::new(TriggerDispatcher::new(Arc::clone(&registry), engine));

    let commands = Arc::new(CommandTrigger::new(
        Arc::new(CommandCatalog::default()),
        Arc::clone(&dispatcher),
        Arc::clone(&bots),
    ));

    let scheduler = Arc::new(
        PollSchedulerService::new(Arc::clone(&registry), Arc::clone(&dispatcher), http)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize poll scheduler: {}", e))?,
    );

    let state = AppState {
        storage,
        registry,
        scheduler,
        dispatcher,
        commands,
        bots,
    };

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_workflow_routes())
        .merge(create_bot_routes())
        .merge(create_command_routes())
        .merge(create_webhook_routes())
        .with_state(state.clone());

    tracing::info!("✅ Application initialized successfully");
    Ok((app, state))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting roomflow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
