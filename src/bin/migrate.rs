use anyhow::Context;
use clap::Parser;
use desa_bridge::utils::{logger, report, validation::Validate};
use desa_bridge::{
    BridgeError, DestinationConfig, MigrateCli, MigrationPlan, Migrator, MySqlDestination,
    SqliteOpener,
};

fn load_plan(cli: &MigrateCli) -> desa_bridge::Result<MigrationPlan> {
    let mut plan = match &cli.config {
        Some(path) => MigrationPlan::from_file(path)?,
        None => MigrationPlan::builtin()?,
    };

    if let Some(policy) = cli.on_conflict {
        plan.conflict_policy = policy;
    }
    if let (Some(admin), Some(password)) = (plan.admin.as_mut(), &cli.admin_password) {
        admin.password = password.clone();
    }

    plan.validate()?;
    Ok(plan)
}

fn exit_with(stage: &str, e: &BridgeError) -> ! {
    tracing::error!("❌ {} failed: {} (Severity: {:?})", stage, e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = MigrateCli::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting desa-migrate");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let plan = match load_plan(&cli) {
        Ok(plan) => plan,
        Err(e) => exit_with("Loading migration plan", &e),
    };

    let destination_config = match DestinationConfig::from_env().and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => exit_with("Reading destination settings", &e),
    };

    // 連線失敗是唯一會中止整個遷移的錯誤
    let destination = match MySqlDestination::connect(&destination_config).await {
        Ok(destination) => destination,
        Err(e) => exit_with("Connecting to MySQL", &e),
    };
    tracing::info!("✅ Connected to MySQL");

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let migrator = Migrator::new_with_monitoring(SqliteOpener, plan, cli.monitor);
    let summary = match migrator.run(&destination).await {
        Ok(summary) => summary,
        Err(e) => exit_with("Migration", &e),
    };

    if let Some(path) = &cli.report {
        report::write_summary_csv(&summary, path)
            .with_context(|| format!("failed to write report to {}", path))?;
        println!("📁 Report saved to: {}", path);
    }

    println!("✅ Migration finished");
    Ok(())
}
