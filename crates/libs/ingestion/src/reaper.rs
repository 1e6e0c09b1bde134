//! Detects runs that died without reaching a terminal state. A processing
//! album whose lease expired is marked failed so the caller can resubmit.

use crate::context::ServiceContext;
use chrono::Utc;
use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

const LEASE_EXPIRED_MESSAGE: &str =
    "processing lease expired; the run was interrupted before finishing";

/// Periodic sweep loop, spawned once at process start.
pub async fn run_reaper(ctx: Arc<ServiceContext>) {
    let interval = Duration::from_secs(ctx.settings.ingestion.reaper_interval_seconds);
    loop {
        sleep(interval).await;
        match sweep_expired_leases(&ctx).await {
            Ok(0) => {}
            Ok(reaped) => info!("Reaped {} stuck album runs", reaped),
            Err(e) => error!("Lease sweep failed: {:#}", e),
        }
    }
}

/// Fails every processing album whose lease expired, along with its active
/// job. Returns how many albums were reaped.
pub async fn sweep_expired_leases(ctx: &Arc<ServiceContext>) -> Result<u64> {
    let expired = ctx.store.expired_processing_albums(Utc::now()).await?;
    let mut reaped = 0;
    for album in expired {
        info!(
            "Album {} lease expired (owner {:?}); marking failed",
            album.id, album.lease_owner
        );
        if let Some(job) = ctx.store.active_job_for_album(&album.id).await? {
            ctx.store.fail_job(&job.id, LEASE_EXPIRED_MESSAGE).await?;
        }
        ctx.store.fail_album(&album.id, LEASE_EXPIRED_MESSAGE).await?;
        reaped += 1;
    }
    Ok(reaped)
}
