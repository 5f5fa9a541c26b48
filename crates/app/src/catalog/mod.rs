// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{mem, sync::Arc};

use discro::Subscriber;
use tokio::task::JoinHandle;

use vidshelf_core::catalog::{
    Entry, Filtered, LoadError, NO_VALID_ENTRIES_MESSAGE, filter_valid,
};
use vidshelf_core_json::catalog::decode_candidates;

use crate::{
    Observable, ObservableRef,
    notification::{Notification, Notify},
    source::Source,
};

pub mod tasklet;

pub const REFRESHING_TITLE: &str = "Refreshing";

pub const NO_CONTENT_TITLE: &str = "No Content";

pub const LOADING_ERROR_TITLE: &str = "Loading Error";

/// The published outcome of load cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Pending {
        fetched_before: Vec<Entry>,
    },
    Ready {
        fetched: Vec<Entry>,
    },
    Failed {
        fetched_before: Vec<Entry>,
        error: LoadError,
    },
}

impl Default for State {
    fn default() -> Self {
        // The first cycle starts immediately after creation.
        Self::Pending {
            fetched_before: Vec::new(),
        }
    }
}

impl State {
    /// The currently published entries.
    ///
    /// Retained while a cycle is pending or after it failed.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        match self {
            Self::Pending { fetched_before } | Self::Failed { fetched_before, .. } => {
                fetched_before
            }
            Self::Ready { fetched } => fetched,
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    #[must_use]
    pub const fn error(&self) -> Option<&LoadError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Pending { .. } | Self::Ready { .. } => None,
        }
    }

    /// Message of the most recently completed cycle if unsuccessful.
    ///
    /// An empty result is not an error, but is reported nevertheless.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        match self {
            Self::Pending { .. } => None,
            Self::Ready { fetched } => fetched
                .is_empty()
                .then(|| NO_VALID_ENTRIES_MESSAGE.to_owned()),
            Self::Failed { error, .. } => Some(error.to_string()),
        }
    }

    fn take_entries(&mut self) -> Vec<Entry> {
        match self {
            Self::Pending { fetched_before } | Self::Failed { fetched_before, .. } => {
                mem::take(fetched_before)
            }
            Self::Ready { fetched } => mem::take(fetched),
        }
    }

    pub(crate) fn start_pending(&mut self) -> bool {
        if self.is_loading() {
            // Overlapping cycle
            return false;
        }
        let fetched_before = self.take_entries();
        *self = Self::Pending { fetched_before };
        true
    }

    pub(crate) fn fetch_succeeded(&mut self, fetched: Vec<Entry>) -> bool {
        let next = Self::Ready { fetched };
        if *self == next {
            return false;
        }
        *self = next;
        true
    }

    pub(crate) fn fetch_failed(&mut self, error: LoadError) -> bool {
        let fetched_before = self.take_entries();
        *self = Self::Failed {
            fetched_before,
            error,
        };
        true
    }

    fn fetch_aborted(&mut self) -> bool {
        if !self.is_loading() {
            // Already completed by an overlapping cycle
            return false;
        }
        self.fetch_failed(LoadError::Aborted)
    }
}

/// Read-only access to the catalog state.
#[derive(Debug, Default)]
pub struct ObservableState(Observable<State>);

impl ObservableState {
    #[must_use]
    pub fn read(&self) -> ObservableRef<'_, State> {
        self.0.read()
    }

    /// Subscribe with the current state marked as unseen.
    #[must_use]
    pub fn subscribe(&self) -> Subscriber<State> {
        self.0.subscribe()
    }

    /// Subscribe with the current state marked as seen.
    #[must_use]
    pub fn subscribe_changed(&self) -> Subscriber<State> {
        self.0.subscribe_changed()
    }

    fn modify(&self, modify: impl FnOnce(&mut State) -> bool) -> bool {
        self.0.modify(modify)
    }
}

/// Ends a pending cycle if its future is dropped before completion.
struct PendingGuard<'a> {
    state: Option<&'a ObservableState>,
}

impl<'a> PendingGuard<'a> {
    const fn new(state: &'a ObservableState) -> Self {
        Self { state: Some(state) }
    }

    fn complete(mut self, modify: impl FnOnce(&mut State) -> bool) {
        if let Some(state) = self.state.take() {
            state.modify(modify);
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        if state.modify(State::fetch_aborted) {
            log::warn!("Loading catalog aborted");
        }
    }
}

/// Loads the catalog from a source and publishes the outcome.
#[derive(Debug)]
pub struct Loader<S, N> {
    state: ObservableState,
    source: S,
    notify: N,
}

impl<S, N> Loader<S, N> {
    #[must_use]
    pub fn new(source: S, notify: N) -> Self {
        Self {
            state: Default::default(),
            source,
            notify,
        }
    }

    #[must_use]
    pub const fn observable_state(&self) -> &ObservableState {
        &self.state
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}

impl<S, N> Loader<S, N>
where
    S: Source,
    N: Notify,
{
    async fn fetch_filtered(&self) -> Result<Filtered, LoadError> {
        let body = self
            .source
            .fetch()
            .await
            .map_err(|err| LoadError::Transport(format!("{err:#}")))?;
        let candidates = decode_candidates(&body)?;
        Ok(filter_valid(candidates))
    }

    /// Run a single load cycle.
    ///
    /// Failures are published as state and notified, never returned.
    pub async fn load(&self) {
        log::debug!("Loading catalog");
        self.state.modify(State::start_pending);
        let pending = PendingGuard::new(&self.state);
        match self.fetch_filtered().await {
            Ok(filtered) => {
                let dropped = filtered.dropped();
                let Filtered { entries, total } = filtered;
                if dropped > 0 {
                    log::warn!("Dropped {dropped} of {total} catalog entries");
                }
                let is_empty = entries.is_empty();
                if is_empty {
                    log::warn!("{NO_VALID_ENTRIES_MESSAGE}");
                } else {
                    log::info!("Loaded {num_entries} catalog entries", num_entries = entries.len());
                }
                pending.complete(|state| state.fetch_succeeded(entries));
                if is_empty {
                    self.notify.notify(Notification::warning(
                        NO_CONTENT_TITLE,
                        NO_VALID_ENTRIES_MESSAGE,
                    ));
                }
            }
            Err(err) => {
                log::error!("{err}");
                let message = err.to_string();
                pending.complete(|state| state.fetch_failed(err));
                self.notify
                    .notify(Notification::error(LOADING_ERROR_TITLE, message));
            }
        }
    }

    /// Notify the user and run a load cycle.
    pub async fn refresh(&self) {
        self.notify
            .notify(Notification::info(REFRESHING_TITLE, "Reloading streams"));
        self.load().await;
    }
}

impl<S, N> Loader<S, N>
where
    S: Source + Send + Sync + 'static,
    N: Notify + Send + Sync + 'static,
{
    /// Create a shared loader and start its first cycle.
    ///
    /// Aborting the returned task ends the pending state.
    #[must_use]
    pub fn spawn(source: S, notify: N) -> (Arc<Self>, JoinHandle<()>) {
        let loader = Arc::new(Self::new(source, notify));
        let initial_load = loader.spawn_initial_load();
        (loader, initial_load)
    }

    /// Spawn the first cycle on the current runtime.
    #[must_use]
    pub fn spawn_initial_load(self: &Arc<Self>) -> JoinHandle<()> {
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            loader.load().await;
        })
    }
}

#[cfg(test)]
mod tests;
