//! club-booking - HTTP server and admin CLI.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use club_booking::config::{Cli, Command, ServerConfig};
use club_booking::events::BookingEvents;
use club_booking::middleware::session::SessionKeys;
use club_booking::service::SetupOutcome;
use club_booking::store::{BookingStore, MemoryBookingStore, PgBookingStore};
use club_booking::{build_router, AppState, BookingService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "club_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = open_store(&cli.config).await?;
    store.initialize().await.context("schema initialization failed")?;

    let service = BookingService::new(
        store,
        BookingEvents::new(cli.config.event_channel_capacity),
    )
    .with_password_cost(cli.config.password_cost);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config, service).await,
        Command::InitDb => {
            match service.setup(&cli.config.seed()).await? {
                SetupOutcome::Initialized => println!("Database initialized with test data!"),
                SetupOutcome::AlreadyInitialized => println!("Database already initialized."),
            }
            Ok(())
        }
        Command::AddClub { name } => {
            let club = service.add_club(&name).await?;
            println!("Created club {} (id {})", club.name, club.id);
            Ok(())
        }
        Command::AddUser {
            username,
            password,
            role,
            club,
        } => {
            let user = service
                .add_user(&username, &password, role, club.as_deref())
                .await?;
            println!("Created {} {} (id {})", user.role, user.username, user.id);
            Ok(())
        }
    }
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn BookingStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(url)
                .await
                .context("failed to connect to database")?;
            tracing::info!("Connected to database");
            Ok(Arc::new(PgBookingStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; bookings are kept in memory and lost on exit");
            Ok(Arc::new(MemoryBookingStore::new()))
        }
    }
}

async fn serve(config: ServerConfig, service: BookingService) -> anyhow::Result<()> {
    if config.uses_default_secret() {
        tracing::warn!("SECRET_KEY not set; using the development secret");
    }

    let sessions = SessionKeys::from_secret(config.secret_key.as_bytes(), config.session_ttl());
    let state = AppState::new(service, sessions, config.seed());
    let shutdown = state.shutdown.clone();
    let app = build_router(state, &config.static_dir);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("club-booking listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.trigger();
        })
        .await
        .context("server error")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
