//! ClubHub Web Server
//!
//! Club membership management: users, categories, groups, and members
//! behind a token-authenticated HTTP API.

use clap::Parser;
use clubhub_core::{init_logging, LoggingConfig};
use clubhub_web::server::ClubServerBuilder;
use clubhub_web::WebConfig;
use tracing::{error, info};

/// ClubHub Web Server - club membership management
#[derive(Parser)]
#[command(name = "clubhub-web")]
#[command(about = "A web interface for ClubHub")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&LoggingConfig::with_level(&args.log_level)) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = WebConfig::from_env();
    config.host = args.host;
    config.port = args.port;
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    info!(address = %config.address(), "Starting ClubHub web server");

    let server = match ClubServerBuilder::new()
        .host(config.host.clone())
        .port(config.port)
        .database_url(config.database_url.clone())
        .build()
        .await
    {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to build server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_with_defaults_and_overrides() {
        let args = Args::parse_from(["clubhub-web"]);
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert!(args.database_url.is_none());

        let args = Args::parse_from([
            "clubhub-web",
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
            "--database-url",
            "sqlite:club.db",
        ]);
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 3000);
        assert_eq!(args.database_url.as_deref(), Some("sqlite:club.db"));
    }
}
