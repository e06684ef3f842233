use std::{net::SocketAddr, path::Path, sync::Arc};

use busgate::{
    adapters::{HttpClientAdapter, ProxyHandler},
    config::{AppConfig, AppConfigValidator, PROXY_PREFIX, load_config},
    console::Console,
    core::{ApiError, Role},
    models::{BusStatus, LoginCredentials, RegisterData},
    ports::http_client::HttpClient,
    tracing_setup,
    utils::graceful_shutdown::GracefulShutdown,
};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

const DEFAULT_CONFIG: &str = "busgate.toml";

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML, JSON or YAML)
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the reverse proxy (default)
    Serve,
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file
    Init,
    /// Sign in and persist the session
    Login { email: String, password: String },
    /// Create an account and sign in with it
    Register {
        email: String,
        password: String,
        name: String,
        /// admin, driver or parent
        role: Role,
        #[clap(long)]
        phone: Option<String>,
    },
    /// Drop the persisted session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Visit a console location through the route guard
    Open {
        /// e.g. /admin/dashboard
        path: String,
    },
    /// Change a bus's status and print the refreshed fleet
    BusStatus {
        bus_id: String,
        /// offline, active, in_route, stopped or maintenance
        status: BusStatus,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config_path = args.config;
    let command = args.command.unwrap_or(Commands::Serve);

    match command {
        Commands::Validate => return validate_config_command(&config_path).await,
        Commands::Init => return init_config_command(&config_path).await,
        _ => {}
    }

    let config = load_config(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    AppConfigValidator::validate(&config).context("Invalid configuration")?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    match command {
        Commands::Serve => serve_command(&config).await,
        command => console_command(&config, command).await,
    }
}

async fn serve_command(config: &AppConfig) -> Result<()> {
    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);
    let handler = Arc::new(ProxyHandler::from_config(&config.proxy, http_client));

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let addr: SocketAddr = config
        .proxy
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Busgate proxy listening on {} ({}/* -> {})",
        addr,
        PROXY_PREFIX,
        handler.backend_base_url()
    );
    println!(
        "Busgate proxy listening on {} ({}/* -> {})",
        addr,
        PROXY_PREFIX,
        handler.backend_base_url()
    );

    let app = handler.router();

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")?;
        },
        shutdown_reason = graceful_shutdown.wait_for_shutdown_signal() => {
            tracing::info!("Shutdown signal received: {:?}", shutdown_reason);
            tracing::info!("Graceful shutdown completed");
        }
    }

    Ok(())
}

async fn console_command(config: &AppConfig, command: Commands) -> Result<()> {
    let console = Console::from_config(config).await?;

    let outcome = match command {
        Commands::Login { email, password } => console
            .queries
            .login(&LoginCredentials { email, password })
            .await
            .map(|response| {
                println!(
                    "✅ Signed in as {} ({})",
                    response.user.name, response.user.role
                );
                println!("   Next: {}", response.user.role.dashboard_path());
            }),
        Commands::Register {
            email,
            password,
            name,
            role,
            phone,
        } => console
            .queries
            .register(&RegisterData {
                email,
                password,
                name,
                role,
                phone,
            })
            .await
            .map(|response| {
                println!(
                    "✅ Registered and signed in as {} ({})",
                    response.user.name, response.user.role
                );
                println!("   Next: {}", response.user.role.dashboard_path());
            }),
        Commands::Logout => {
            console
                .guard
                .logout()
                .await
                .context("Failed to clear the session")?;
            println!("👋 Signed out");
            Ok(())
        }
        Commands::Whoami => {
            if !console.session.is_authenticated() {
                println!("🔒 Not signed in");
                return Ok(());
            }
            console.queries.me().await.map(|user| {
                println!("👤 {} <{}>", user.name, user.email);
                println!("   • Role: {}", user.role);
                println!("   • Id: {}", user.id);
            })
        }
        Commands::Open { path } => console.open(&path).await.and_then(|visit| {
            for hop in &visit.trail {
                println!("↪️  {hop}");
            }
            println!("📍 {}", visit.location);
            if let Some(user) = &visit.user {
                println!("   Signed in as {} ({})", user.name, user.role);
            }
            if let Some(dashboard) = &visit.dashboard {
                let rendered = serde_json::to_string_pretty(dashboard)
                    .map_err(ApiError::invalid_response)?;
                println!("{rendered}");
            }
            Ok(())
        }),
        Commands::BusStatus { bus_id, status } => console
            .dashboards
            .update_bus_status(&bus_id, status)
            .await
            .map(|fleet| {
                println!("✅ Bus {bus_id} is now {status}");
                println!();
                println!("🚌 Fleet:");
                for bus in fleet {
                    println!(
                        "   • {} #{} {} [{}]",
                        bus.id, bus.bus_number, bus.license_plate, bus.status
                    );
                }
            }),
        Commands::Serve | Commands::Validate | Commands::Init => Ok(()),
    };

    if let Err(e) = outcome {
        report_api_error(&e);
        if let Some(target) = console.navigator.history().last() {
            println!("   Redirected to {target}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn report_api_error(error: &ApiError) {
    eprintln!("❌ {}", error.message);
    eprintln!("   • Status: {}", error.status);
    eprintln!("   • Code: {}", error.code);
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match AppConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Proxy Listen Address: {}", config.proxy.listen_addr);
            println!("   • Backend: {}", config.proxy.backend_base_url);
            println!("   • Client Base URL: {}", config.client.effective_base_url());
            println!("   • Request Timeout: {}ms", config.client.timeout_ms);
            println!(
                "   • Session File: {}",
                config.session.resolved_path().display()
            );
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure all URLs start with http:// or https://");
            println!("   • Verify listen address format (e.g., '127.0.0.1:3000')");
            println!("   • Timeouts must be greater than zero");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Busgate Configuration

# Reverse proxy: ANY /api/proxy/{*path} is relayed to backend_base_url
[proxy]
listen_addr = "127.0.0.1:3000"
backend_base_url = "http://localhost:8000/api"
health_timeout_secs = 5

# Client layer
[client]
api_base_url = "http://localhost:8000/api"
timeout_ms = 10000
# Send every call through the proxy above instead of straight to the backend
use_proxy = false
proxy_base_url = "http://127.0.0.1:3000"

[session]
store_path = "~/.config/busgate/session.json"

[guard]
unauthorized_redirect_delay_secs = 3

[logging]
level = "info"
json = false
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'busgate serve --config {config_path}' to start the proxy");
    Ok(())
}
