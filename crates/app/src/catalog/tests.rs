// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::VecDeque,
    future::{self, Future},
    sync::Mutex,
    time::Duration,
};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::{
    OnChanged,
    notification::Severity,
    source::WebSource,
    tests::{new_local_client, serve_http_responses},
};

use super::*;

const SCENARIO_A: &[u8] = br#"[
    {"title": "A", "image": "a.jpg", "stream": "a.mp4"},
    {"title": "B"}
]"#;

/// Replies with the scripted responses in order.
#[derive(Debug, Default)]
struct ScriptedSource {
    responses: Mutex<VecDeque<anyhow::Result<Bytes>>>,
}

impl ScriptedSource {
    fn new(responses: impl IntoIterator<Item = anyhow::Result<&'static [u8]>>) -> Self {
        let responses = responses
            .into_iter()
            .map(|response| response.map(Bytes::from_static))
            .collect();
        Self {
            responses: Mutex::new(responses),
        }
    }
}

impl Source for ScriptedSource {
    fn fetch(&self) -> impl Future<Output = anyhow::Result<Bytes>> + Send {
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no more responses")));
        future::ready(response)
    }
}

/// Replies once the response has been sent through the gate.
#[derive(Debug)]
struct GatedSource {
    gate: Mutex<Option<oneshot::Receiver<anyhow::Result<Bytes>>>>,
}

impl GatedSource {
    fn new() -> (Self, oneshot::Sender<anyhow::Result<Bytes>>) {
        let (tx, rx) = oneshot::channel();
        let source = Self {
            gate: Mutex::new(Some(rx)),
        };
        (source, tx)
    }
}

impl Source for GatedSource {
    fn fetch(&self) -> impl Future<Output = anyhow::Result<Bytes>> + Send {
        let gate = self.gate.lock().unwrap().take();
        async move {
            let Some(gate) = gate else {
                anyhow::bail!("gate already used");
            };
            gate.await?
        }
    }
}

type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

fn new_loader<S: Source>(
    source: S,
) -> (
    Loader<S, mpsc::UnboundedSender<Notification>>,
    NotificationReceiver,
) {
    let (notification_tx, notification_rx) = mpsc::unbounded_channel();
    (Loader::new(source, notification_tx), notification_rx)
}

fn drain(notification_rx: &mut NotificationReceiver) -> Vec<Notification> {
    let mut notifications = Vec::new();
    while let Ok(notification) = notification_rx.try_recv() {
        notifications.push(notification);
    }
    notifications
}

fn entry(title: &str) -> Entry {
    Entry {
        title: title.to_owned(),
        image_url: format!("{}.jpg", title.to_lowercase()),
        stream_url: format!("{}.mp4", title.to_lowercase()),
    }
}

#[test]
fn initial_state_is_loading() {
    let (loader, _notification_rx) = new_loader(ScriptedSource::default());
    let state = loader.observable_state().read();
    assert!(state.is_loading());
    assert!(state.entries().is_empty());
    assert_eq!(None, state.last_error());
}

#[tokio::test]
async fn load_valid_entries_and_drop_invalid() {
    let (loader, mut notification_rx) = new_loader(ScriptedSource::new([Ok(SCENARIO_A)]));
    loader.load().await;
    {
        let state = loader.observable_state().read();
        assert!(!state.is_loading());
        assert_eq!(&[entry("A")], state.entries());
        assert_eq!(None, state.last_error());
    }
    assert!(drain(&mut notification_rx).is_empty());
}

#[tokio::test]
async fn keep_valid_entries_in_source_order() {
    let body = br#"[
        {"title": "C", "image": "c.jpg", "stream": "c.mp4"},
        {"title": "A", "image": "a.jpg"},
        "B",
        {"title": "B", "image": "b.jpg", "stream": "b.mp4"},
        {"title": "C", "image": "c.jpg", "stream": "c.mp4"},
        {"title": "D", "image": "d.jpg", "stream": 4}
    ]"#;
    let (loader, _notification_rx) = new_loader(ScriptedSource::new([Ok(&body[..])]));
    loader.load().await;
    let state = loader.observable_state().read();
    assert_eq!(&[entry("C"), entry("B"), entry("C")], state.entries());
    assert_eq!(None, state.last_error());
}

#[tokio::test]
async fn empty_result_is_reported_but_not_failed() {
    let (loader, mut notification_rx) = new_loader(ScriptedSource::new([Ok(&b"[]"[..])]));
    loader.load().await;
    {
        let state = loader.observable_state().read();
        assert!(!state.is_loading());
        assert!(state.entries().is_empty());
        assert!(state.error().is_none());
        assert_eq!(
            Some(NO_VALID_ENTRIES_MESSAGE),
            state.last_error().as_deref()
        );
    }
    let notifications = drain(&mut notification_rx);
    assert_eq!(1, notifications.len());
    assert_eq!(Severity::Warning, notifications[0].severity);
    assert_eq!(NO_CONTENT_TITLE, notifications[0].title);
}

#[tokio::test]
async fn only_invalid_entries_is_an_empty_result() {
    let body = br#"[{"title": "B"}, 42, null]"#;
    let (loader, _notification_rx) = new_loader(ScriptedSource::new([Ok(&body[..])]));
    loader.load().await;
    let state = loader.observable_state().read();
    assert!(state.entries().is_empty());
    assert_eq!(
        Some(NO_VALID_ENTRIES_MESSAGE),
        state.last_error().as_deref()
    );
}

#[tokio::test]
async fn transport_failure_preserves_entries() {
    let (loader, mut notification_rx) = new_loader(ScriptedSource::new([
        Ok(SCENARIO_A),
        Err(anyhow::anyhow!("connection refused")),
    ]));
    loader.load().await;
    loader.load().await;
    {
        let state = loader.observable_state().read();
        assert!(!state.is_loading());
        assert_eq!(&[entry("A")], state.entries());
        assert!(matches!(state.error(), Some(LoadError::Transport(_))));
        let last_error = state.last_error().unwrap();
        assert!(last_error.starts_with("Failed to load streams"));
        assert!(last_error.contains("connection refused"));
    }
    let notifications = drain(&mut notification_rx);
    assert_eq!(1, notifications.len());
    assert_eq!(Severity::Error, notifications[0].severity);
    assert_eq!(LOADING_ERROR_TITLE, notifications[0].title);
    assert!(notifications[0].message.contains("connection refused"));
}

#[tokio::test]
async fn unsuccessful_status_is_a_transport_error() {
    let addr = serve_http_responses([
        ("200 OK", SCENARIO_A),
        ("503 Service Unavailable", &br#"{"message":"gone"}"#[..]),
    ])
    .await;
    let url = format!("http://{addr}/streams.json").parse().unwrap();
    let (loader, mut notification_rx) = new_loader(WebSource::new(new_local_client(), url));
    loader.load().await;
    assert_eq!(&[entry("A")], loader.observable_state().read().entries());
    loader.load().await;
    {
        let state = loader.observable_state().read();
        assert!(!state.is_loading());
        assert_eq!(&[entry("A")], state.entries());
        assert!(matches!(state.error(), Some(LoadError::Transport(_))));
        assert!(state.last_error().unwrap().contains("503"));
    }
    let notifications = drain(&mut notification_rx);
    assert_eq!(1, notifications.len());
    assert_eq!(LOADING_ERROR_TITLE, notifications[0].title);
}

#[tokio::test]
async fn non_array_response_is_a_format_error() {
    let bodies: [&'static [u8]; 4] = [
        b"\"not an array\"",
        br#"{"title": "A", "image": "a.jpg", "stream": "a.mp4"}"#,
        b"null",
        b"42",
    ];
    for body in bodies {
        let (loader, mut notification_rx) =
            new_loader(ScriptedSource::new([Ok(SCENARIO_A), Ok(body)]));
        loader.load().await;
        loader.load().await;
        {
            let state = loader.observable_state().read();
            assert!(!state.is_loading());
            assert_eq!(&[entry("A")], state.entries());
            assert!(matches!(state.error(), Some(LoadError::Format(_))));
            assert!(
                state
                    .last_error()
                    .unwrap()
                    .contains("Invalid streams data format")
            );
        }
        assert_eq!(1, drain(&mut notification_rx).len());
    }
}

#[tokio::test]
async fn successful_cycle_clears_previous_error() {
    let (loader, _notification_rx) = new_loader(ScriptedSource::new([
        Err(anyhow::anyhow!("timeout")),
        Ok(SCENARIO_A),
    ]));
    loader.load().await;
    assert!(loader.observable_state().read().last_error().is_some());
    loader.load().await;
    let state = loader.observable_state().read();
    assert_eq!(None, state.last_error());
    assert_eq!(&[entry("A")], state.entries());
}

#[tokio::test]
async fn empty_result_replaces_previous_entries() {
    let (loader, _notification_rx) =
        new_loader(ScriptedSource::new([Ok(SCENARIO_A), Ok(&b"[]"[..])]));
    loader.load().await;
    loader.load().await;
    let state = loader.observable_state().read();
    assert!(state.entries().is_empty());
    assert_eq!(
        Some(NO_VALID_ENTRIES_MESSAGE),
        state.last_error().as_deref()
    );
}

#[tokio::test]
async fn refresh_twice_converges() {
    let (loader, mut notification_rx) =
        new_loader(ScriptedSource::new([Ok(SCENARIO_A), Ok(SCENARIO_A)]));
    loader.refresh().await;
    let once = State::clone(&loader.observable_state().read());
    loader.refresh().await;
    assert_eq!(once, *loader.observable_state().read());
    let notifications = drain(&mut notification_rx);
    assert_eq!(2, notifications.len());
    assert!(notifications.iter().all(|notification| {
        notification.severity == Severity::Info && notification.title == REFRESHING_TITLE
    }));
}

#[tokio::test]
async fn is_loading_while_cycle_in_flight() {
    let (source, gate_tx) = GatedSource::new();
    let (loader, _notification_rx) = new_loader(source);
    let loader = Arc::new(loader);
    let mut subscriber = loader.observable_state().subscribe_changed();
    loader.observable_state().modify(|state| state.fetch_succeeded(vec![entry("A")]));
    subscriber.changed().await.unwrap();
    assert!(!subscriber.read_ack().is_loading());
    let load_task = tokio::spawn({
        let loader = Arc::clone(&loader);
        async move { loader.load().await }
    });
    subscriber.changed().await.unwrap();
    {
        let state = subscriber.read_ack();
        assert!(state.is_loading());
        assert!(state.last_error().is_none());
        assert_eq!(&[entry("A")], state.entries());
    }
    gate_tx.send(Ok(Bytes::from_static(b"[]"))).unwrap();
    load_task.await.unwrap();
    assert!(!loader.observable_state().read().is_loading());
}

#[tokio::test]
async fn dropped_cycle_ends_pending_state() {
    let (source, _gate_tx) = GatedSource::new();
    let (loader, _notification_rx) = new_loader(source);
    loader
        .observable_state()
        .modify(|state| state.fetch_succeeded(vec![entry("A")]));
    assert!(
        tokio::time::timeout(Duration::from_millis(10), loader.load())
            .await
            .is_err()
    );
    let state = loader.observable_state().read();
    assert!(!state.is_loading());
    assert_eq!(Some(&LoadError::Aborted), state.error());
    assert_eq!(&[entry("A")], state.entries());
}

#[tokio::test]
async fn spawn_initial_load() {
    let (loader, _notification_rx) = new_loader(ScriptedSource::new([Ok(SCENARIO_A)]));
    let loader = Arc::new(loader);
    loader.spawn_initial_load().await.unwrap();
    assert_eq!(&[entry("A")], loader.observable_state().read().entries());
}

#[tokio::test]
async fn spawn_starts_loading_immediately() {
    let (source, gate_tx) = GatedSource::new();
    let (notification_tx, mut notification_rx) = mpsc::unbounded_channel();
    let (loader, initial_load) = Loader::spawn(source, notification_tx);
    assert!(loader.observable_state().read().is_loading());
    gate_tx.send(Ok(Bytes::from_static(SCENARIO_A))).unwrap();
    initial_load.await.unwrap();
    let state = loader.observable_state().read();
    assert!(!state.is_loading());
    assert_eq!(&[entry("A")], state.entries());
    assert!(drain(&mut notification_rx).is_empty());
}

#[tokio::test]
async fn aborted_initial_load_ends_pending_state() {
    let (source, _gate_tx) = GatedSource::new();
    let (notification_tx, _notification_rx) = mpsc::unbounded_channel();
    let (loader, initial_load) = Loader::spawn(source, notification_tx);
    // Wait until the cycle is waiting for the response
    while loader.source().gate.lock().unwrap().is_some() {
        tokio::task::yield_now().await;
    }
    initial_load.abort();
    assert!(initial_load.await.unwrap_err().is_cancelled());
    let state = loader.observable_state().read();
    assert!(!state.is_loading());
    assert_eq!(Some(&LoadError::Aborted), state.error());
}

#[tokio::test]
async fn refresh_on_request_until_channel_closed() {
    let (loader, mut notification_rx) = new_loader(ScriptedSource::new([
        Ok(SCENARIO_A),
        Err(anyhow::anyhow!("unreachable")),
    ]));
    let loader = Arc::new(loader);
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(tasklet::on_refresh_requested(
        Arc::downgrade(&loader),
        request_rx,
    ));
    request_tx.send(()).unwrap();
    request_tx.send(()).unwrap();
    drop(request_tx);
    task.await.unwrap();
    assert!(matches!(
        loader.observable_state().read().error(),
        Some(LoadError::Transport(_))
    ));
    let titles = drain(&mut notification_rx)
        .into_iter()
        .map(|notification| notification.title)
        .collect::<Vec<_>>();
    assert_eq!(
        vec![REFRESHING_TITLE, REFRESHING_TITLE, LOADING_ERROR_TITLE],
        titles
    );
}

#[tokio::test]
async fn observe_state_changes_until_aborted() {
    let (loader, _notification_rx) = new_loader(ScriptedSource::new([Ok(SCENARIO_A)]));
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(tasklet::on_state_changed(
        loader.observable_state().subscribe(),
        move |state| {
            seen_tx.send(state.clone()).unwrap();
            if state.is_loading() {
                OnChanged::Continue
            } else {
                OnChanged::Abort
            }
        },
    ));
    // Initial state
    assert!(seen_rx.recv().await.unwrap().is_loading());
    loader.load().await;
    task.await.unwrap();
    let mut last_seen = None;
    while let Ok(state) = seen_rx.try_recv() {
        last_seen = Some(state);
    }
    assert_eq!(Some(&[entry("A")][..]), last_seen.as_ref().map(State::entries));
}
