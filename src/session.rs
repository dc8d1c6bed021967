// Per-launch context. A fresh `Session` is created for every `launch` call and
// threaded explicitly through the orchestration steps, so concurrent launches
// in one process share nothing mutable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use transgate_core::codec::ChainType;
use uuid::Uuid;

use crate::channel::ChannelState;

/// Cooperative cancellation shared between a session and whoever may abort it
/// (a modal close button, Ctrl-C, the embedding application).
#[derive(Clone, Default)]
pub struct CancelFlag {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancelFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelFlag")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    app_id: String,
    chain_type: ChainType,
    cancel: CancelFlag,
    state: ChannelState,
}

impl Session {
    pub fn new(app_id: impl Into<String>, chain_type: ChainType, cancel: CancelFlag) -> Self {
        Self {
            id: Uuid::new_v4(),
            app_id: app_id.into(),
            chain_type,
            cancel,
            state: ChannelState::SelectingChannel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Moves to `next`. Terminal states are sticky; later transitions are ignored.
    pub fn transition(&mut self, next: ChannelState) {
        if self.state.is_terminal() {
            tracing::debug!(session_id = %self.id, state = ?self.state, ignored = ?next, "session already terminal");
            return;
        }
        tracing::info!(session_id = %self.id, from = ?self.state, to = ?next, "channel state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let flag = CancelFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.cancelled().await })
        };
        tokio::task::yield_now().await;
        assert!(!flag.is_cancelled());
        flag.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .expect("join");
        assert!(flag.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_set() {
        let flag = CancelFlag::new();
        flag.cancel();
        flag.cancel();
        tokio::time::timeout(Duration::from_millis(50), flag.cancelled())
            .await
            .expect("already cancelled");
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut session = Session::new("app", ChainType::Evm, CancelFlag::new());
        assert_eq!(session.state(), ChannelState::SelectingChannel);
        session.transition(ChannelState::AwaitingQrScan);
        session.transition(ChannelState::Cancelled);
        session.transition(ChannelState::Completed);
        assert_eq!(session.state(), ChannelState::Cancelled);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = Session::new("app", ChainType::Evm, CancelFlag::new());
        let b = Session::new("app", ChainType::Evm, CancelFlag::new());
        assert_ne!(a.id(), b.id());
    }
}
