use anyhow::Context;
use clap::Parser;
use desa_bridge::http::{self, AppState};
use desa_bridge::utils::{logger, validation::Validate};
use desa_bridge::{BridgeError, ProxyCli, ProxyConfig, ResilientClient};
use std::sync::Arc;

fn load_config(cli: &ProxyCli) -> desa_bridge::Result<ProxyConfig> {
    let mut config = match &cli.config {
        Some(path) => ProxyConfig::from_file(path)?,
        None => ProxyConfig::from_env(),
    };

    // 命令列參數優先於設定檔
    if let Some(bind) = &cli.bind {
        config.bind = bind.clone();
    }
    if let Some(backend_url) = &cli.backend_url {
        config.override_backend(backend_url);
    }
    if let Some(max_retries) = cli.max_retries {
        config.retry.max_retries = max_retries;
    }

    config.validate()?;
    Ok(config)
}

fn exit_with(e: &BridgeError) -> ! {
    tracing::error!(
        "❌ API proxy failed: {} (Severity: {:?})",
        e,
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ProxyCli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting desa-bridge API proxy");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    for (route, upstream) in &config.routes {
        tracing::info!("🔗 /api/{} -> {}", route, upstream);
    }

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let client = ResilientClient::new(config.retry.to_policy());
    let state = AppState::new(client, Arc::new(config));

    if let Err(e) = http::serve(listener, state).await {
        exit_with(&e);
    }

    tracing::info!("✅ API proxy stopped");
    Ok(())
}
