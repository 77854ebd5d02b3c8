use clap::{Parser, Subcommand};
use linehook::config::{self, Config};

mod logging;

#[derive(Parser)]
#[command(name = "linehook")]
#[command(about = "LINE webhook receiver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server (GET / health probe, POST /webhook).
    Serve {
        /// Config file path (default: LINEHOOK_CONFIG_PATH or ~/.linehook/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (overrides PORT env and config; default 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Load and validate the configuration, then print it with the token redacted.
    CheckConfig {
        /// Config file path (default: LINEHOOK_CONFIG_PATH or ~/.linehook/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; values may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("linehook {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                fail("serve", e);
            }
        }
        Some(Commands::CheckConfig { config }) => {
            if let Err(e) = run_check_config(config) {
                fail("check-config", e);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// Log the error (installing a console-only logger if startup failed before logging was up) and exit 1.
fn fail(command: &str, e: anyhow::Error) -> ! {
    let _ = logging::init(None);
    log::error!("{} failed: {:#}", command, e);
    std::process::exit(1);
}

fn resolve_config(config_path: Option<std::path::PathBuf>) -> anyhow::Result<(Config, std::path::PathBuf)> {
    let (mut config, path) = config::load_config(config_path)?;
    config::apply_env_overrides(&mut config)?;
    Ok((config, path))
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = resolve_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    logging::init(config.logging.error_log.as_deref())?;
    log::info!("using config {}", path.display());
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    linehook::gateway::run_gateway(config).await
}

fn run_check_config(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, path) = resolve_config(config_path)?;
    config::validate(&config)?;
    let token = if config::line_token(&config).is_some() {
        "configured"
    } else {
        "missing"
    };
    println!("config:        {}", path.display());
    println!("listen:        {}:{}", config.gateway.bind, config.gateway.port);
    println!("line api:      {}", config.channels.line.api_base);
    println!("line token:    {}", token);
    println!("line timeout:  {}s", config.channels.line.timeout_secs);
    println!(
        "rate limit:    {} per {}s per client{}",
        config.rate_limit.max_requests,
        config.rate_limit.window_secs,
        if config.rate_limit.trust_proxy {
            " (client ip from proxy headers)"
        } else {
            ""
        }
    );
    match &config.logging.error_log {
        Some(p) => println!("error log:     {}", p.display()),
        None => println!("error log:     disabled"),
    }
    if token == "missing" {
        anyhow::bail!("LINE access token not configured (set channels.line.accessToken or LINE_ACCESS_TOKEN)");
    }
    Ok(())
}
