// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Remote control of an [mpv](https://mpv.io) process through its
//! JSON IPC protocol.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use anyhow::Context as _;
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
    net::{UnixStream, unix::OwnedWriteHalf},
    process::{Child, Command},
    task::JoinHandle,
};

use vidshelf_core::playback::{Event, StreamKind};

use super::{Backend, EventSender};

pub const DEFAULT_PROGRAM: &str = "mpv";

const CONNECT_ATTEMPTS: usize = 50;

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

const QUIT_TIMEOUT: Duration = Duration::from_secs(1);

const TIME_POS_PROPERTY: &str = "time-pos";

const DURATION_PROPERTY: &str = "duration";

const EOF_REACHED_PROPERTY: &str = "eof-reached";

const OBSERVED_PROPERTIES: [&str; 3] = [TIME_POS_PROPERTY, DURATION_PROPERTY, EOF_REACHED_PROPERTY];

fn new_socket_path() -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "vidshelf-mpv-{pid}-{counter}.sock",
        pid = std::process::id()
    ))
}

fn duration_from_data(data: Option<&Value>) -> Option<Duration> {
    data.and_then(Value::as_f64)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Map a message received from mpv to an event.
///
/// Replies to commands and unrelated messages are ignored.
#[must_use]
pub fn parse_event_line(line: &str) -> Option<Event> {
    let message = match serde_json::from_str::<Value>(line) {
        Ok(message) => message,
        Err(err) => {
            log::debug!("Ignoring malformed message \"{line}\": {err}");
            return None;
        }
    };
    match message.get("event").and_then(Value::as_str)? {
        "file-loaded" => Some(Event::CanPlay),
        "end-file" => match message.get("reason").and_then(Value::as_str) {
            Some("eof") => Some(Event::Ended),
            Some("error") => {
                let file_error = message
                    .get("file_error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                Some(Event::Error(file_error.to_owned()))
            }
            _ => None,
        },
        "property-change" => {
            let data = message.get("data");
            match message.get("name").and_then(Value::as_str)? {
                TIME_POS_PROPERTY => duration_from_data(data).map(Event::TimeUpdated),
                DURATION_PROPERTY => duration_from_data(data).map(Event::DurationKnown),
                EOF_REACHED_PROPERTY => data
                    .and_then(Value::as_bool)
                    .unwrap_or_default()
                    .then_some(Event::Ended),
                _ => None,
            }
        }
        _ => None,
    }
}

async fn read_events(reader: impl AsyncBufRead + Unpin, events: EventSender) {
    log::debug!("Starting to read mpv events");
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(event) = parse_event_line(&line) else {
                    continue;
                };
                if events.send(event).is_err() {
                    log::debug!("Event receiver has disappeared");
                    break;
                }
            }
            Ok(None) => {
                log::debug!("mpv closed the connection");
                break;
            }
            Err(err) => {
                log::warn!("Failed to read from mpv: {err}");
                break;
            }
        }
    }
    log::debug!("Stopped reading mpv events");
}

async fn connect(child: &mut Child, socket_path: &Path) -> anyhow::Result<UnixStream> {
    for _ in 0..CONNECT_ATTEMPTS {
        if let Some(exit_status) = child.try_wait()? {
            anyhow::bail!("mpv exited prematurely: {exit_status}");
        }
        match UnixStream::connect(socket_path).await {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                log::trace!("Connecting to {}: {err}", socket_path.display());
            }
        }
        tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
    }
    anyhow::bail!(
        "unable to connect to mpv through {}",
        socket_path.display()
    )
}

async fn send_command(writer: &mut OwnedWriteHalf, command: Value) -> anyhow::Result<()> {
    let mut line = json!({ "command": command }).to_string();
    log::trace!("Sending mpv command: {line}");
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

#[derive(Debug)]
struct Connection {
    child: Child,
    socket_path: PathBuf,
    writer: OwnedWriteHalf,
    read_events_task: JoinHandle<()>,
}

impl Connection {
    async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Err(err) = send_command(&mut self.writer, json!(["quit"])).await {
            log::debug!("Failed to send quit command: {err}");
        }
        if tokio::time::timeout(QUIT_TIMEOUT, self.child.wait())
            .await
            .is_err()
        {
            log::warn!("Killing unresponsive mpv process");
            self.child.kill().await?;
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.read_events_task.abort();
        if let Err(err) = std::fs::remove_file(&self.socket_path) {
            log::debug!(
                "Failed to remove socket {}: {err}",
                self.socket_path.display()
            );
        }
    }
}

/// Plays streams in a separate mpv window.
#[derive(Debug)]
pub struct MpvBackend {
    program: PathBuf,
    connection: Option<Connection>,
}

impl MpvBackend {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            connection: None,
        }
    }

    async fn spawn(&self, stream_kind: StreamKind, events: EventSender) -> anyhow::Result<Connection> {
        let socket_path = new_socket_path();
        let mut command = Command::new(&self.program);
        command
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .args(["--idle=yes", "--keep-open=yes", "--pause", "--no-terminal"]);
        if stream_kind == StreamKind::Hls {
            command.arg("--cache=yes");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        log::debug!("Spawning {}", self.program.display());
        let mut child = command
            .spawn()
            .with_context(|| format!("spawning {}", self.program.display()))?;
        let stream = connect(&mut child, &socket_path).await?;
        let (reader, writer) = stream.into_split();
        let read_events_task = tokio::spawn(read_events(BufReader::new(reader), events));
        Ok(Connection {
            child,
            socket_path,
            writer,
            read_events_task,
        })
    }

    async fn send_command(&mut self, command: Value) -> anyhow::Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no stream opened"))?;
        send_command(&mut connection.writer, command).await
    }
}

impl Default for MpvBackend {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Backend for MpvBackend {
    async fn open(
        &mut self,
        stream_url: &str,
        stream_kind: StreamKind,
        events: EventSender,
    ) -> anyhow::Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.shutdown().await?;
        }
        let connection = self.spawn(stream_kind, events).await?;
        self.connection = Some(connection);
        for (id, name) in (1..).zip(OBSERVED_PROPERTIES) {
            self.send_command(json!(["observe_property", id, name]))
                .await?;
        }
        self.send_command(json!(["loadfile", stream_url])).await
    }

    async fn set_paused(&mut self, paused: bool) -> anyhow::Result<()> {
        self.send_command(json!(["set_property", "pause", paused]))
            .await
    }

    async fn set_muted(&mut self, muted: bool) -> anyhow::Result<()> {
        self.send_command(json!(["set_property", "mute", muted]))
            .await
    }

    async fn seek(&mut self, position: Duration) -> anyhow::Result<()> {
        self.send_command(json!(["seek", position.as_secs_f64(), "absolute"]))
            .await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        connection.shutdown().await
    }
}
