//! Periodic heartbeat for the open session.
//!
//! One task per session. Each tick hops to the blocking pool (the tick
//! touches the store) and the task stops on cancellation, when the tick
//! reports that its controller is gone, or when the tick itself panics.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::SessionId;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Work done on each tick. Returns `false` once there is nothing left to
/// beat for. Receives the timer's token so it can bail out if the timer
/// was cancelled while the tick was queued.
pub(crate) type TickFn = Arc<dyn Fn(&CancellationToken) -> bool + Send + Sync>;

/// Handle to a running heartbeat. Dropping it stops the timer.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    token: CancellationToken,
}

impl Heartbeat {
    /// Starts ticking every `period`, first tick one period from now.
    pub(crate) fn spawn(
        runtime: &Handle,
        period: Duration,
        session_id: SessionId,
        tick: TickFn,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        runtime.spawn(async move {
            debug!(session_id = %session_id, ?period, "Heartbeat started");

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = task_token.cancelled() => break,

                    _ = ticker.tick() => {
                        let tick = Arc::clone(&tick);
                        let tick_token = task_token.clone();
                        match tokio::task::spawn_blocking(move || tick(&tick_token)).await {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(e) => {
                                warn!(session_id = %session_id, error = %e, "Heartbeat tick failed");
                                break;
                            }
                        }
                    }
                }
            }

            debug!(session_id = %session_id, "Heartbeat stopped");
        });

        Self { token }
    }

    #[cfg(test)]
    fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
