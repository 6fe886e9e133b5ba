use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use identity::config::Config;
use identity::models::token::{mask, Token};
use identity::store::memory::MemoryStore;
use identity::store::postgres::PgStore;
use identity::store::seed::Seed;
use identity::store::{DirectoryStore, IdentityStore, TemplateStore, TokenStore};
use identity::{api, cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;
    init_tracing(cfg.log_json)?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Seed { file }) => {
            let db = connect_admin(&cfg).await?;
            let report = Seed::load(&file)?.apply(&db).await?;
            println!(
                "Seed applied: {} tenants, {} users, {} tokens, {} templates",
                report.tenants, report.users, report.tokens, report.templates
            );
            Ok(())
        }
        Some(cli::Commands::Token { command }) => {
            let db = connect_admin(&cfg).await?;
            handle_token_command(command, &db, &cfg).await
        }
        Some(cli::Commands::Template { command }) => {
            let db = connect_admin(&cfg).await?;
            handle_template_command(command, &db).await
        }
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "identityd"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "identity=debug,tower_http=debug".into()),
        ))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(telemetry_layer)
        .init();
    Ok(())
}

async fn open_store(cfg: &Config) -> anyhow::Result<Arc<dyn IdentityStore>> {
    match cfg.database_url.as_deref() {
        Some(url) => {
            let db = PgStore::connect(url).await?;
            db.migrate().await?;
            tracing::info!("Connected to Postgres, migrations applied");
            Ok(Arc::new(db))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL is not set: using the in-memory store. \
                 Tokens, tenants and endpoints are lost on restart."
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Administrative commands operate on the shared database; the in-memory
/// store only exists inside a running server.
async fn connect_admin(cfg: &Config) -> anyhow::Result<PgStore> {
    let url = cfg
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for administrative commands")?;
    let db = PgStore::connect(url).await?;
    db.migrate().await?;
    Ok(db)
}

async fn run_server(cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(cfg.port);
    let store = open_store(&cfg).await?;
    if cfg.production && !store.is_durable() {
        anyhow::bail!(
            "IDENTITY_ENV=production requires DATABASE_URL: the {} store loses every \
             token and endpoint on restart",
            store.backend_name()
        );
    }

    if let Some(path) = &cfg.seed_file {
        Seed::load(path)?.apply(store.as_ref()).await?;
    }

    let cleanup_every = Duration::from_secs(cfg.cleanup_interval_secs.max(1));
    let retention = cfg.token_retention();
    let state = Arc::new(AppState::new(store.clone(), cfg));

    let cleanup = jobs::cleanup::spawn(store.clone(), cleanup_every, retention);
    tracing::info!(
        "Background cleanup job started (expired tokens every {}s)",
        cleanup_every.as_secs()
    );

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(backend = store.backend_name(), "identityd listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    cleanup.abort();
    Ok(())
}

async fn handle_token_command(
    cmd: cli::TokenCommands,
    db: &PgStore,
    cfg: &Config,
) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Issue { user, tenant, ttl } => {
            let owner = db
                .get_user(&user)
                .await?
                .with_context(|| format!("user {} does not exist", user))?;
            let tenant = tenant.or(owner.tenant_id);
            let ttl = match ttl {
                Some(secs) => config::lifetime(secs).with_context(|| {
                    format!(
                        "--ttl must be between 1 and {} seconds",
                        config::MAX_LIFETIME_SECS
                    )
                })?,
                None => cfg.token_ttl(),
            };
            let token = db
                .insert_token(Token::issue(&user, tenant.as_deref(), ttl, Utc::now()))
                .await?;
            println!("Token issued!");
            println!("ID: {}", token.id);
            println!("Expires: {}", token.expires_at.to_rfc3339());
        }
        cli::TokenCommands::Disable { id } => {
            if db.revoke_token(&id).await? {
                println!("Token {} disabled", mask(&id));
            } else {
                anyhow::bail!("token not found");
            }
        }
        cli::TokenCommands::Revoke { id } => {
            if db.delete_token(&id).await? {
                println!("Token {} destroyed", mask(&id));
            } else {
                anyhow::bail!("token not found");
            }
        }
        cli::TokenCommands::Purge => {
            let purged =
                jobs::cleanup::purge_expired_tokens(db, cfg.token_retention(), Utc::now()).await?;
            println!("Purged {} expired tokens", purged);
        }
    }
    Ok(())
}

async fn handle_template_command(cmd: cli::TemplateCommands, db: &PgStore) -> anyhow::Result<()> {
    match cmd {
        cli::TemplateCommands::List => {
            let templates = db.list_templates().await?;
            if templates.is_empty() {
                println!("No endpoint templates.");
            }
            for t in templates {
                println!(
                    "{:>4}  {:<16} {:<12} {}",
                    t.id, t.name, t.service_type, t.public_url
                );
            }
        }
        cli::TemplateCommands::Delete { id } => {
            if db.delete_template(id).await? {
                println!("Endpoint template {} deleted", id);
            } else {
                anyhow::bail!("endpoint template {} not found", id);
            }
        }
    }
    Ok(())
}
