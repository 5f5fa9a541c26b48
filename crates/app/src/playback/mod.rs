// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{future::Future, sync::Arc, time::Duration};

use discro::Subscriber;
use tokio::{sync::mpsc, task::JoinHandle};

use vidshelf_core::{
    CatalogEntry,
    playback::{Event, State, StreamKind},
};

use crate::{Observable, ObservableRef};

#[cfg(unix)]
pub mod mpv;

pub mod tasklet;

pub type EventSender = mpsc::UnboundedSender<Event>;

pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Controls an external media player.
///
/// Implementations report what happens during playback through
/// the events channel that is passed when opening a stream.
pub trait Backend {
    /// Start loading a new stream, replacing the current one.
    ///
    /// Playback starts paused.
    fn open(
        &mut self,
        stream_url: &str,
        stream_kind: StreamKind,
        events: EventSender,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn set_paused(&mut self, paused: bool) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn set_muted(&mut self, muted: bool) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn seek(&mut self, position: Duration) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Stop playback and release all resources.
    fn close(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Read-only access to the playback state.
#[derive(Debug, Default)]
pub struct ObservableState(Observable<State>);

impl ObservableState {
    #[must_use]
    pub fn read(&self) -> ObservableRef<'_, State> {
        self.0.read()
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscriber<State> {
        self.0.subscribe()
    }

    #[must_use]
    pub fn subscribe_changed(&self) -> Subscriber<State> {
        self.0.subscribe_changed()
    }

    fn modify(&self, modify: impl FnOnce(&mut State) -> bool) -> bool {
        self.0.modify(modify)
    }
}

/// Plays catalog entries one at a time.
///
/// Commands are only reflected in the state after the backend
/// accepted them.
#[derive(Debug)]
pub struct Session<B> {
    backend: B,
    state: Arc<ObservableState>,
    forward_events_task: Option<JoinHandle<()>>,
}

impl<B> Session<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Default::default(),
            forward_events_task: None,
        }
    }

    #[must_use]
    pub fn observable_state(&self) -> &ObservableState {
        &self.state
    }

    fn abort_forward_events(&mut self) {
        if let Some(task) = self.forward_events_task.take() {
            task.abort();
        }
    }
}

impl<B: Backend> Session<B> {
    fn ensure_controllable(&self) -> anyhow::Result<()> {
        let state = self.state.read();
        if state.status().is_controllable() {
            return Ok(());
        }
        anyhow::bail!("playback not ready: {status:?}", status = state.status());
    }

    pub async fn open(&mut self, entry: &CatalogEntry) -> anyhow::Result<()> {
        self.abort_forward_events();
        let stream_url = &entry.stream_url;
        let stream_kind = StreamKind::sniff(stream_url);
        log::info!(
            "Opening \"{title}\" ({stream_kind:?}): {stream_url}",
            title = entry.title
        );
        self.state.modify(|state| state.open(stream_url.clone()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        if let Err(err) = self.backend.open(stream_url, stream_kind, event_tx).await {
            log::warn!("Failed to open stream: {err:#}");
            self.state
                .modify(|state| state.apply_event(Event::Error(format!("{err:#}"))));
            return Err(err);
        }
        self.forward_events_task = Some(tokio::spawn(tasklet::forward_events(
            Arc::downgrade(&self.state),
            event_rx,
        )));
        let muted = self.state.read().is_muted();
        if muted {
            self.backend.set_muted(true).await?;
        }
        Ok(())
    }

    pub async fn toggle_play(&mut self) -> anyhow::Result<()> {
        self.ensure_controllable()?;
        let playing = !self.state.read().is_playing();
        self.backend.set_paused(!playing).await?;
        self.state.modify(|state| state.set_playing(playing));
        Ok(())
    }

    /// Toggle the mute setting that survives switching streams.
    pub async fn toggle_mute(&mut self) -> anyhow::Result<()> {
        let (muted, is_open) = {
            let state = self.state.read();
            (!state.is_muted(), state.stream_url().is_some())
        };
        if is_open {
            self.backend.set_muted(muted).await?;
        }
        self.state.modify(|state| state.set_muted(muted));
        Ok(())
    }

    /// Jump to a position, limited by the known duration.
    pub async fn seek(&mut self, position: Duration) -> anyhow::Result<()> {
        self.ensure_controllable()?;
        let position = self.state.read().clamp_position(position);
        self.backend.seek(position).await?;
        self.state.modify(|state| state.seek(position));
        Ok(())
    }

    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.abort_forward_events();
        let result = self.backend.close().await;
        self.state.modify(State::close);
        result
    }
}

impl<B> Drop for Session<B> {
    fn drop(&mut self) {
        self.abort_forward_events();
    }
}
