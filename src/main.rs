use esxi_mcp::{logging, AppConfig, LogFormat};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            logging::init(LogFormat::Text, "info");
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    logging::init(config.log_format, &config.log_filter);
    info!(
        version = esxi_mcp::server::SERVER_VERSION,
        esxi = %config.esxi.host,
        user = %config.esxi.username,
        insecure = config.esxi.insecure,
        "Starting esxi-mcp"
    );

    esxi_mcp::start_server(&config).await
}
