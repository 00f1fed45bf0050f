//! Login signal driving the polling lifecycle.
//!
//! Several independent login mechanisms may exist side by side. Each one
//! publishes a [`SessionState`] on a `watch` channel and the monitor ORs them
//! together: a user is signed in if any mechanism says so, and the answer is
//! still loading if any mechanism is still loading.

use futures_util::future::select_all;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub active: bool,
    pub loading: bool,
}

impl SessionState {
    pub fn active() -> Self {
        Self {
            active: true,
            loading: false,
        }
    }

    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            active: false,
            loading: true,
        }
    }

    pub fn combine(states: impl IntoIterator<Item = SessionState>) -> Self {
        states
            .into_iter()
            .fold(Self::default(), |acc, state| Self {
                active: acc.active || state.active,
                loading: acc.loading || state.loading,
            })
    }
}

pub struct SessionMonitor {
    sources: Vec<watch::Receiver<SessionState>>,
}

impl SessionMonitor {
    pub fn new(sources: Vec<watch::Receiver<SessionState>>) -> Self {
        Self { sources }
    }

    pub fn single(source: watch::Receiver<SessionState>) -> Self {
        Self::new(vec![source])
    }

    pub fn current(&self) -> SessionState {
        SessionState::combine(self.sources.iter().map(|rx| *rx.borrow()))
    }

    /// Waits until any source publishes. A source whose sender is gone stops
    /// counting towards the combined state. Returns `false` once no source
    /// is left.
    pub async fn changed(&mut self) -> bool {
        if self.sources.is_empty() {
            return false;
        }

        let (result, index) = {
            let (result, index, _pending) =
                select_all(self.sources.iter_mut().map(|rx| Box::pin(rx.changed()))).await;
            (result, index)
        };

        if result.is_err() {
            self.sources.remove(index);
        }
        !self.sources.is_empty()
    }
}
