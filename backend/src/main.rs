use std::path::PathBuf;

use gym_ledger::domain::{calendar, DashboardService};
use gym_ledger::{initialize_backend, LedgerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "gym-ledger.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = LedgerConfig::load_or_default(&config_path)?;

    let gym = initialize_backend(&config).await?;

    let shift = DashboardService::current_shift();
    let stats = gym.dashboard.compute_stats(shift).await;
    info!(shift = %shift, stats = %serde_json::to_string(&stats)?, "Dashboard");

    let expiring = gym.expiring_soon().await?;
    info!(
        count = expiring.len(),
        threshold_days = config.expiring_threshold_days,
        "Members expiring soon"
    );
    for member in &expiring {
        info!(
            member_id = %member.id,
            name = %format!("{} {}", member.name, member.family),
            end_date = %calendar::format_long(&member.end_date),
            remaining_days = member.remaining_days,
            "Expiring"
        );
    }

    info!(monthly_fee = gym.settings.get_monthly_fee().await, "Current monthly fee");

    gym.db.close().await;
    Ok(())
}
