//! Background scheduled tasks for the application.
//!
//! Call `spawn_all` once during startup to launch them.

use crate::services::CampaignService;
use std::time::Duration;

/// Spawn all background tasks. Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(campaign_service: CampaignService, sweep_interval_secs: u64) {
    // 停用已过结束时间的活动
    {
        let svc = campaign_service.clone();
        let interval = Duration::from_secs(sweep_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.expire_campaigns().await {
                    Ok(n) if n > 0 => log::info!("Expired campaigns deactivated: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire campaigns: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
