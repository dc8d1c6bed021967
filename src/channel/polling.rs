// Result polling for the deep-link and QR channels.

use std::time::Duration;

use transgate_core::schema::ProofStatus;

use super::ChannelOutcome;
use crate::config::{MAX_POLL_ATTEMPTS, POLL_INTERVAL};
use crate::gateway::Gateway;
use crate::presenter::Presenter;
use crate::session::CancelFlag;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

/// Sleeps for `interval` unless `cancel` fires first. Returns true when cancelled.
async fn pause(interval: Duration, cancel: &CancelFlag) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(interval) => false,
    }
}

/// Polls the result endpoint until a result lands, the session is cancelled,
/// or `max_attempts` polls have gone unanswered.
///
/// Cancellation is checked before every request and interrupts both an
/// in-flight request and the delay between requests.
pub async fn poll_for_result(
    gateway: &dyn Gateway,
    task_id: &str,
    cancel: &CancelFlag,
    settings: PollSettings,
) -> ChannelOutcome {
    for attempt in 1..=settings.max_attempts {
        if cancel.is_cancelled() {
            return ChannelOutcome::Cancelled;
        }
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            polled = gateway.poll_result(task_id) => Some(polled),
        };
        match polled {
            None => return ChannelOutcome::Cancelled,
            Some(Ok(Some(result))) => {
                return match result.status {
                    ProofStatus::Success => ChannelOutcome::Completed(result),
                    ProofStatus::NotMatchRequirements => ChannelOutcome::NotMatchRequirements,
                    ProofStatus::Failed => {
                        ChannelOutcome::UnexpectedVerifyError("validator reported a failed proof".to_string())
                    }
                };
            }
            Some(Ok(None)) => tracing::debug!(task_id, attempt, "result not ready"),
            Some(Err(e)) => tracing::warn!(task_id, attempt, "result poll failed: {}", e),
        }
        if attempt < settings.max_attempts && pause(settings.interval, cancel).await {
            return ChannelOutcome::Cancelled;
        }
    }
    tracing::warn!(task_id, attempts = settings.max_attempts, "gave up waiting for result");
    ChannelOutcome::TimedOut
}

/// Watches the scan endpoint and tells the presenter once a device has picked
/// up the task. Returns after that signal, on cancellation, or after the same
/// attempt ceiling as result polling.
pub async fn watch_scan(
    gateway: &dyn Gateway,
    task_id: &str,
    cancel: &CancelFlag,
    settings: PollSettings,
    presenter: &dyn Presenter,
) {
    for attempt in 1..=settings.max_attempts {
        if cancel.is_cancelled() {
            return;
        }
        match gateway.scan_status(task_id).await {
            Ok(true) => {
                tracing::info!(task_id, "task picked up by a device");
                presenter.mark_consumed();
                return;
            }
            Ok(false) => {}
            Err(e) => tracing::debug!(task_id, attempt, "scan status failed: {}", e),
        }
        if pause(settings.interval, cancel).await {
            return;
        }
    }
}
