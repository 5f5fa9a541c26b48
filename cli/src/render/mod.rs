// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use vidshelf_app::{
    catalog,
    notification::{Notification, Severity},
};
use vidshelf_core::{CatalogEntry, playback};

pub(crate) fn entry_line(index: usize, entry: &CatalogEntry) -> String {
    let CatalogEntry {
        title,
        image_url,
        stream_url,
    } = entry;
    format!("{index:>3}  {title}\n     stream: {stream_url}\n     image:  {image_url}")
}

pub(crate) fn catalog_state(state: &catalog::State) -> String {
    let mut text = String::new();
    for (index, entry) in state.entries().iter().enumerate() {
        text.push_str(&entry_line(index, entry));
        text.push('\n');
    }
    if state.is_loading() {
        text.push_str("Loading...\n");
    } else if let Some(last_error) = state.last_error() {
        text.push_str(&last_error);
        text.push('\n');
    }
    text
}

pub(crate) fn entries_json(entries: &[CatalogEntry]) -> anyhow::Result<String> {
    let entries = entries
        .iter()
        .cloned()
        .map(vidshelf_core_json::catalog::Entry::from)
        .collect::<Vec<_>>();
    serde_json::to_string_pretty(&entries).map_err(Into::into)
}

pub(crate) fn notification(notification: &Notification) -> String {
    let Notification {
        severity,
        title,
        message,
    } = notification;
    let severity = match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    format!("[{severity}] {title}: {message}")
}

fn timestamp(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub(crate) fn playback_state(state: &playback::State) -> String {
    let status = match state.status() {
        playback::Status::Idle => "idle".to_owned(),
        playback::Status::Loading => "loading".to_owned(),
        playback::Status::Ready => "ready".to_owned(),
        playback::Status::Playing => "playing".to_owned(),
        playback::Status::Paused => "paused".to_owned(),
        playback::Status::Ended => "ended".to_owned(),
        playback::Status::Failed(message) => format!("failed: {message}"),
    };
    let position = state.duration().map_or_else(
        || timestamp(state.current_time()),
        |duration| {
            format!(
                "{current_time} / {duration}",
                current_time = timestamp(state.current_time()),
                duration = timestamp(duration)
            )
        },
    );
    let muted = if state.is_muted() { " (muted)" } else { "" };
    format!("[{status}] {position}{muted}")
}
