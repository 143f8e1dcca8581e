use crate::service::LobbyService;
use std::{
    future::Future,
    time::Duration,
};
use tokio::time::{
    interval,
    MissedTickBehavior,
};

/// How often and how hard the tracker polls the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Must be non-zero.
    pub interval: Duration,
    pub limit: usize,
    pub ttl: Duration,
}

/// Syncs and expires servers on every tick until `shutdown` resolves.
///
/// A tick that falls due while a cycle is still running is skipped. Failed
/// cycles are logged and the loop carries on.
pub async fn watch(service: &LobbyService, schedule: Schedule, shutdown: impl Future<Output = ()>) -> u64 {
    let mut ticker = interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(interval = ?schedule.interval, limit = schedule.limit, ttl = ?schedule.ttl, "watching lobby");

    let mut cycles = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(cycles, "stopped watching lobby");
                return cycles;
            }
            _ = ticker.tick() => {
                cycles += 1;
                run_cycle(service, &schedule).await;
            }
        }
    }
}

#[instrument(level = "debug", skip_all)]
async fn run_cycle(service: &LobbyService, schedule: &Schedule) {
    match service.sync_local_servers(schedule.limit).await {
        Ok(inserted) => debug!(inserted, "synced"),
        Err(err) => error!(%err, "sync failed"),
    }
    match service.clear_expired_servers(schedule.ttl).await {
        Ok((deleted, remaining)) => debug!(deleted, remaining, "expired"),
        Err(err) => error!(%err, "clearing expired servers failed"),
    }
}
