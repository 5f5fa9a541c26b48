// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{future::Future, sync::Weak};

use discro::Subscriber;
use tokio::sync::mpsc;
use unnest::some_or_break;

use super::{Loader, State};
use crate::{OnChanged, notification::Notify, source::Source};

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

/// Refresh the catalog on request.
///
/// Requests are handled one after another.
pub fn on_refresh_requested<S, N>(
    loader: Weak<Loader<S, N>>,
    mut requests: mpsc::UnboundedReceiver<()>,
) -> impl Future<Output = ()> + Send + 'static
where
    S: Source + Send + Sync + 'static,
    N: Notify + Send + Sync + 'static,
{
    async move {
        log::debug!("Starting on_refresh_requested");
        while let Some(()) = requests.recv().await {
            // Stop when the loader has disappeared
            let loader = some_or_break!(loader.upgrade());
            loader.refresh().await;
        }
        log::debug!("Stopping on_refresh_requested");
    }
}
