use anyhow::Result;
use clap::Parser;
use partygame_functions::app::App;
use partygame_functions::server;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "partygame-functions")]
#[command(about = "Serve the party game question and portrait functions")]
struct CliArgs {
    /// Address to listen on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "partygame_functions=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting partygame-functions");

    let args = CliArgs::parse();

    match App::new().await {
        Ok(app) => match server::serve(Arc::new(app), args.listen).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Server failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn test_listen_defaults_to_all_interfaces() {
        let args = CliArgs::try_parse_from(["partygame-functions"]).unwrap();
        assert_eq!(args.listen.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_listen_flag() {
        let args =
            CliArgs::try_parse_from(["partygame-functions", "--listen", "127.0.0.1:9000"]).unwrap();
        assert_eq!(args.listen.port(), 9000);
    }

    #[test]
    fn test_invalid_listen_address() {
        assert!(CliArgs::try_parse_from(["partygame-functions", "--listen", "nope"]).is_err());
    }
}
