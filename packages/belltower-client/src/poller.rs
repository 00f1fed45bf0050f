use crate::session::SessionMonitor;
use crate::store::{NotificationStore, RefreshOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

enum PollState {
    Idle,
    Polling {
        ticker: Interval,
        in_flight: Option<JoinHandle<RefreshOutcome>>,
    },
}

fn spawn_refresh(store: &Arc<NotificationStore>, show_loading: bool) -> JoinHandle<RefreshOutcome> {
    let store = Arc::clone(store);
    tokio::spawn(async move { store.refresh(show_loading).await })
}

fn stop(store: &NotificationStore, in_flight: Option<JoinHandle<RefreshOutcome>>) {
    store.end_session();
    if let Some(task) = in_flight {
        task.abort();
    }
}

/// Runs [`run_polling`] on the current runtime.
pub fn spawn_polling(
    store: Arc<NotificationStore>,
    sessions: SessionMonitor,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(run_polling(store, sessions, period))
}

/// Idle until a session is active, then refresh immediately (with the
/// loading flag) and again every `period` (without it). Refreshes run as
/// their own tasks so a slow fetch never delays a session change. When the
/// session ends the timer and any in-flight refresh are dropped and the
/// store cleared. Returns once every session source is gone.
pub async fn run_polling(
    store: Arc<NotificationStore>,
    mut sessions: SessionMonitor,
    period: Duration,
) {
    let mut state = PollState::Idle;

    loop {
        let session = sessions.current();
        // 等待登录状态加载完成
        if !session.loading {
            state = match (state, session.active) {
                (PollState::Idle, true) => {
                    info!(?period, "session active, polling notifications");
                    store.start_session();
                    let in_flight = Some(spawn_refresh(&store, true));
                    let mut ticker = interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    PollState::Polling { ticker, in_flight }
                }
                (PollState::Polling { in_flight, .. }, false) => {
                    info!("session inactive, polling stopped");
                    stop(&store, in_flight);
                    PollState::Idle
                }
                (state, _) => state,
            };
        }

        let alive = match &mut state {
            PollState::Idle => sessions.changed().await,
            PollState::Polling { ticker, in_flight } => {
                tokio::select! {
                    _ = ticker.tick() => {
                        if in_flight.as_ref().is_some_and(|task| !task.is_finished()) {
                            debug!("previous refresh still running, skipping tick");
                        } else {
                            *in_flight = Some(spawn_refresh(&store, false));
                        }
                        true
                    }
                    alive = sessions.changed() => alive,
                }
            }
        };
        if !alive {
            break;
        }
    }

    if let PollState::Polling { in_flight, .. } = state {
        stop(&store, in_flight);
    }
}
