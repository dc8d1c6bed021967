// Signals to the presentation layer (modal, QR code, pending spinner).
// Rendering is out of scope; implementations decide how to show these.

use colored::Colorize;

use crate::channel::Channel;
use crate::session::CancelFlag;

pub trait Presenter: Send + Sync {
    fn show_pending(&self, channel: Channel);

    /// Called on every terminal transition.
    fn hide_pending(&self);

    /// Display `url` as a QR code. Closing the modal should call `cancel.cancel()`.
    fn show_qr(&self, url: &str, cancel: CancelFlag);

    /// Hand `url` to the mobile app. Dismissing the prompt should call `cancel.cancel()`.
    fn open_deep_link(&self, url: &str, cancel: CancelFlag);

    /// The task was picked up by a device; visual only.
    fn mark_consumed(&self);
}

/// Terminal presenter for the CLI: prints the URL, logs everything else.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_pending(&self, channel: Channel) {
        tracing::info!(channel = channel.name(), "waiting for proof");
    }

    fn hide_pending(&self) {
        tracing::debug!("pending indicator hidden");
    }

    fn show_qr(&self, url: &str, _cancel: CancelFlag) {
        println!("{} scan with the TransGate app:", "QR".cyan().bold());
        println!("  {}", url);
    }

    fn open_deep_link(&self, url: &str, _cancel: CancelFlag) {
        println!("{} open on your device:", "Deep link".cyan().bold());
        println!("  {}", url);
    }

    fn mark_consumed(&self) {
        println!("{}", "Task picked up by a device, waiting for the proof...".yellow());
    }
}
