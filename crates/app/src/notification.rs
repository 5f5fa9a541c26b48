// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, message)
    }

    #[must_use]
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, message)
    }

    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, message)
    }

    fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Sink for notifications.
///
/// Delivery is fire-and-forget and must never block the caller.
pub trait Notify {
    fn notify(&self, notification: Notification);
}

impl Notify for mpsc::UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(notification)) = self.send(notification) {
            log::debug!("Discarding notification without receiver: {notification:?}");
        }
    }
}

/// Write notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotify;

impl Notify for LogNotify {
    fn notify(&self, notification: Notification) {
        let Notification {
            severity,
            title,
            message,
        } = notification;
        let level = match severity {
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        };
        log::log!(level, "{title}: {message}");
    }
}
