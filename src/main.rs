/// W3CP Signer - attestation gateway for charge point DIDs
use std::env;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use w3cp_signer::{config::ServerConfig, context::AppContext, error::SignerResult, server};

#[tokio::main]
async fn main() -> SignerResult<()> {
    // Initialize logging
    let json_logs = env::var("W3CP_LOG_FORMAT").is_ok_and(|format| format == "json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "w3cp_signer=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    print_banner();

    let config = ServerConfig::from_env()?;
    info!("Configuration loaded: {:?}", config);

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
 __        _______  ____ ____     ____  _
 \ \      / /___ / / ___|  _ \   / ___|(_) __ _ _ __   ___ _ __
  \ \ /\ / /  |_ \| |   | |_) |  \___ \| |/ _` | '_ \ / _ \ '__|
   \ V  V /  ___) | |___|  __/    ___) | | (_| | | | |  __/ |
    \_/\_/  |____/ \____|_|      |____/|_|\__, |_| |_|\___|_|
                                          |___/
        Charge point DID attestation gateway v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
