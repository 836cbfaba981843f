// src/services/sweeper.rs

use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use crate::services::session::SessionService;

/// Periodically expires open sessions nobody has touched since their deadline.
///
/// Lazy expiry on access still applies; this only keeps listings and
/// monitoring views honest. Stops when `shutdown` flips to `true`.
pub fn spawn_expiry_sweeper(
    sessions: SessionService,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => {
                    if let Err(err) = sessions.expire_stale_sessions().await {
                        tracing::error!(error = %err, "expire_stale_sessions failed");
                    }
                }
            }
        }
        tracing::debug!("Expiry sweeper stopped");
    })
}
