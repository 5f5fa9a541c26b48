// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{future::Future, sync::Weak};

use discro::Subscriber;
use unnest::some_or_break;

use vidshelf_core::playback::State;

use super::{EventReceiver, ObservableState};
use crate::OnChanged;

/// Mirror the events of a backend into the state.
pub(super) fn forward_events(
    state: Weak<ObservableState>,
    mut events: EventReceiver,
) -> impl Future<Output = ()> + Send + 'static {
    async move {
        log::debug!("Starting forward_events");
        while let Some(event) = events.recv().await {
            // Stop when the session has disappeared
            let state = some_or_break!(state.upgrade());
            log::trace!("Received playback event: {event:?}");
            state.modify(|state| state.apply_event(event));
        }
        log::debug!("Stopping forward_events");
    }
}

/// Listen for state changes.
///
/// The callback is invoked with the current state first and then
/// after every change.
pub fn on_state_changed(
    subscriber: Subscriber<State>,
    on_changed: impl FnMut(&State) -> OnChanged + Send + 'static,
) -> impl Future<Output = ()> + Send + 'static {
    crate::on_changed(subscriber, on_changed)
}
