//! Transient status messages
//!
//! Components that hit a recoverable failure post a message through a
//! cloneable [`StatusSender`]. The [`StatusBoard`] shows the newest message
//! and dismisses it after a fixed duration. Alerts are the exception: they
//! stay until acknowledged.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
    /// Blocking alert (unavailable hardware, unsupported file type)
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Alert,
            text: text.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.level == StatusLevel::Alert
    }
}

/// Sending half of the status channel
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: Sender<StatusMessage>,
}

impl StatusSender {
    /// Post a message. A dropped board is not an error for the sender.
    pub fn send(&self, message: StatusMessage) {
        tracing::debug!(level = ?message.level, text = %message.text, "Status message");
        let _ = self.tx.send(message);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.send(StatusMessage::info(text));
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.send(StatusMessage::warning(text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.send(StatusMessage::error(text));
    }

    pub fn alert(&self, text: impl Into<String>) {
        self.send(StatusMessage::alert(text));
    }

    /// A sender whose messages go nowhere
    pub fn detached() -> Self {
        let (tx, _rx) = crossbeam_channel::unbounded();
        Self { tx }
    }
}

/// Receiving end that tracks the currently displayed message
pub struct StatusBoard {
    rx: Receiver<StatusMessage>,
    tx: Sender<StatusMessage>,
    current: Option<(StatusMessage, Instant)>,
    display_duration: Duration,
}

impl StatusBoard {
    /// Create a board that dismisses messages after `display_duration`
    pub fn new(display_duration: Duration) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rx,
            tx,
            current: None,
            display_duration,
        }
    }

    pub fn sender(&self) -> StatusSender {
        StatusSender {
            tx: self.tx.clone(),
        }
    }

    /// Take pending messages and expire the current one.
    ///
    /// The newest pending message replaces whatever is shown, except that a
    /// shown alert is only replaced by another alert.
    pub fn poll(&mut self, now: Instant) -> Option<&StatusMessage> {
        while let Ok(message) = self.rx.try_recv() {
            let alert_showing = matches!(&self.current, Some((m, _)) if m.is_blocking());
            if !alert_showing || message.is_blocking() {
                self.current = Some((message, now));
            }
        }

        if let Some((message, shown_at)) = &self.current {
            if !message.is_blocking() && now.duration_since(*shown_at) >= self.display_duration {
                self.current = None;
            }
        }

        self.current.as_ref().map(|(m, _)| m)
    }

    /// Message currently displayed, without draining the channel
    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref().map(|(m, _)| m)
    }

    /// Dismiss the current message, including alerts
    pub fn acknowledge(&mut self) {
        self.current = None;
    }

    pub fn display_duration(&self) -> Duration {
        self.display_duration
    }
}
