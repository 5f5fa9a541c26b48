// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::future::Future;

use discro::{Publisher, Ref, Subscriber};

mod environment;
pub use self::environment::Environment;

/// Catalog loading
pub mod catalog;

/// User-facing notifications
pub mod notification;

/// Playback of catalog entries
pub mod playback;

/// Settings management
pub mod settings;

/// Catalog sources
pub mod source;

mod webapi;

pub type ObservableRef<'a, T> = Ref<'a, T>;

/// Manages the mutable, observable state
#[derive(Debug)]
pub struct Observable<T> {
    publisher: Publisher<T>,
}

impl<T> Observable<T> {
    #[must_use]
    pub fn new(initial_value: T) -> Self {
        let publisher = Publisher::new(initial_value);
        Self { publisher }
    }

    #[must_use]
    pub fn read(&self) -> ObservableRef<'_, T> {
        self.publisher.read()
    }

    /// Subscribe with the current value marked as unseen.
    #[must_use]
    pub fn subscribe(&self) -> Subscriber<T> {
        self.publisher.subscribe()
    }

    /// Subscribe with the current value marked as seen.
    #[must_use]
    pub fn subscribe_changed(&self) -> Subscriber<T> {
        self.publisher.subscribe_changed()
    }

    #[allow(clippy::must_use_candidate)]
    pub fn modify(&self, modify: impl FnOnce(&mut T) -> bool) -> bool {
        self.publisher.modify(modify)
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

/// Reply of a listener after being notified about a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnChanged {
    Continue,
    Abort,
}

/// Listen for changes of an observable value.
///
/// The callback is invoked with the current value first and then
/// after every change until it replies with [`OnChanged::Abort`]
/// or the publisher disappears.
pub fn on_changed<T>(
    mut subscriber: Subscriber<T>,
    mut on_changed: impl FnMut(&T) -> OnChanged + Send + 'static,
) -> impl Future<Output = ()> + Send + 'static
where
    T: Send + Sync + 'static,
{
    async move {
        log::debug!("Starting on_changed");
        loop {
            let reply = {
                let value = subscriber.read_ack();
                on_changed(&value)
            };
            if reply == OnChanged::Abort {
                // Consumer has rejected the notification
                log::debug!("Aborting on_changed");
                return;
            }
            if subscriber.changed().await.is_err() {
                // Publisher has disappeared
                log::debug!("Aborting on_changed");
                break;
            }
        }
        log::debug!("Stopping on_changed");
    }
}

#[cfg(test)]
mod tests;
