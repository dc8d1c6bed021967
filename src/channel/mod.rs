// Channel orchestration: pick a delivery channel, drive it to a terminal
// outcome, keep the presentation layer informed.
//
//   SelectingChannel ─┬─> AwaitingExtensionMessage ─┐
//                     ├─> AwaitingDeepLink ─────────┼─> Completed | Cancelled | TimedOut | Failed
//                     └─> AwaitingQrScan ───────────┘
//
// Exactly one awaiting state is active per session.

pub mod extension;
pub mod polling;

pub use extension::{BusError, ExtensionMessage, LaunchMessage, MessageBus, MessageKind, Subscription};
pub use polling::PollSettings;

use std::str::FromStr;
use std::sync::Arc;

use reqwest::Url;
use transgate_core::codec::ChainType;
use transgate_core::schema::{ProofResult, Task};

use crate::gateway::Gateway;
use crate::presenter::Presenter;
use crate::session::Session;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Platform {
    #[default]
    Desktop,
    Ios,
    Android,
}

impl Platform {
    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Ios | Platform::Android)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Platform::Desktop),
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Extension,
    DeepLink,
    QrCode,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Extension => "extension",
            Channel::DeepLink => "deep-link",
            Channel::QrCode => "qr",
        }
    }

    fn awaiting_state(&self) -> ChannelState {
        match self {
            Channel::Extension => ChannelState::AwaitingExtensionMessage,
            Channel::DeepLink => ChannelState::AwaitingDeepLink,
            Channel::QrCode => ChannelState::AwaitingQrScan,
        }
    }
}

/// Mobile always deep-links; desktop uses the extension when present, else a QR code.
pub fn select_channel(platform: Platform, extension_installed: bool) -> Channel {
    match platform {
        Platform::Ios | Platform::Android => Channel::DeepLink,
        Platform::Desktop if extension_installed => Channel::Extension,
        Platform::Desktop => Channel::QrCode,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    SelectingChannel,
    AwaitingExtensionMessage,
    AwaitingDeepLink,
    AwaitingQrScan,
    Completed,
    Cancelled,
    TimedOut,
    Failed,
}

impl ChannelState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChannelState::Completed | ChannelState::Cancelled | ChannelState::TimedOut | ChannelState::Failed
        )
    }
}

/// How a channel finished.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelOutcome {
    Completed(ProofResult),
    Cancelled,
    TimedOut,
    NotMatchRequirements,
    InvalidSchema,
    UnexpectedVerifyError(String),
    Failed(String),
}

impl ChannelOutcome {
    pub fn state(&self) -> ChannelState {
        match self {
            ChannelOutcome::Completed(_) => ChannelState::Completed,
            ChannelOutcome::Cancelled => ChannelState::Cancelled,
            ChannelOutcome::TimedOut => ChannelState::TimedOut,
            ChannelOutcome::NotMatchRequirements
            | ChannelOutcome::InvalidSchema
            | ChannelOutcome::UnexpectedVerifyError(_)
            | ChannelOutcome::Failed(_) => ChannelState::Failed,
        }
    }
}

/// What a channel needs to hand a verified task to a validator.
pub struct LaunchContext<'a> {
    pub app_id: &'a str,
    pub schema_id: &'a str,
    pub chain_type: ChainType,
    pub task: &'a Task,
    pub schema: &'a serde_json::Value,
    pub recipient: Option<&'a str>,
    pub callback_url: Option<&'a str>,
    pub extension_installed: bool,
}

/// Deep-link (and QR payload) URL carrying the task to the mobile app.
pub fn deep_link(base: &str, launch: &LaunchContext<'_>) -> Result<Url, String> {
    let mut url = Url::parse(base).map_err(|e| format!("invalid deep link base {}: {}", base, e))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("app_id", launch.app_id)
            .append_pair("task_id", &launch.task.task_id)
            .append_pair("schema_id", launch.schema_id)
            .append_pair("chain_type", launch.chain_type.name())
            .append_pair("callback_url", launch.callback_url.unwrap_or_default());
        if let Some(account) = launch.recipient {
            query.append_pair("account", account);
        }
    }
    Ok(url)
}

pub struct Orchestrator<'a> {
    pub gateway: &'a dyn Gateway,
    pub bus: &'a Arc<MessageBus>,
    pub presenter: &'a dyn Presenter,
    pub platform: Platform,
    pub poll: PollSettings,
    pub deep_link_base: &'a str,
}

impl Orchestrator<'_> {
    /// Drives one channel to a terminal outcome and records the transitions on `session`.
    pub async fn run(&self, session: &mut Session, launch: &LaunchContext<'_>) -> ChannelOutcome {
        let channel = select_channel(self.platform, launch.extension_installed);
        tracing::info!(session_id = %session.id(), channel = channel.name(), "channel selected");
        session.transition(channel.awaiting_state());

        let cancel = session.cancel_flag().clone();
        let task_id = launch.task.task_id.as_str();
        self.presenter.show_pending(channel);

        let outcome = match channel {
            Channel::Extension => {
                let message = LaunchMessage::new(launch);
                extension::await_extension(self.bus, message, &cancel).await
            }
            Channel::DeepLink => match deep_link(self.deep_link_base, launch) {
                Ok(url) => {
                    self.presenter.open_deep_link(url.as_str(), cancel.clone());
                    polling::poll_for_result(self.gateway, task_id, &cancel, self.poll).await
                }
                Err(e) => ChannelOutcome::Failed(e),
            },
            Channel::QrCode => match deep_link(self.deep_link_base, launch) {
                Ok(url) => {
                    self.presenter.show_qr(url.as_str(), cancel.clone());
                    let poll = polling::poll_for_result(self.gateway, task_id, &cancel, self.poll);
                    let watch = polling::watch_scan(self.gateway, task_id, &cancel, self.poll, self.presenter);
                    tokio::pin!(poll);
                    tokio::select! {
                        biased;
                        outcome = &mut poll => outcome,
                        _ = watch => poll.await,
                    }
                }
                Err(e) => ChannelOutcome::Failed(e),
            },
        };

        self.presenter.hide_pending();
        session.transition(outcome.state());
        outcome
    }
}
