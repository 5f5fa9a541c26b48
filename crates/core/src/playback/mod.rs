// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Playback state as observed from a media player.
//!
//! The player itself is an external collaborator. It reports [`Event`]s
//! that are mirrored into the [`State`] and receives commands that are
//! only reflected in the [`State`] after the player accepted them.

use std::time::Duration;

/// Format of a stream as far as a player needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// HTTP Live Streaming manifest
    Hls,

    /// Any other, directly playable media resource
    Direct,
}

impl StreamKind {
    /// Guess the kind of a stream from its URL.
    ///
    /// Query and fragment are ignored.
    #[must_use]
    pub fn sniff(stream_url: &str) -> Self {
        let path = stream_url.split(['?', '#']).next().unwrap_or(stream_url);
        let path = path.to_ascii_lowercase();
        if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            Self::Hls
        } else {
            Self::Direct
        }
    }
}

/// Notifications from the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CanPlay,
    Error(String),
    TimeUpdated(Duration),
    DurationKnown(Duration),
    Ended,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Failed(String),
}

impl Status {
    /// Accepts play/pause/seek commands.
    #[must_use]
    pub const fn is_controllable(&self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Playing | Self::Paused | Self::Ended
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    stream_url: Option<String>,
    status: Status,
    muted: bool,
    current_time: Duration,
    duration: Option<Duration>,
}

impl State {
    #[must_use]
    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref()
    }

    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.status, Status::Playing)
    }

    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    #[must_use]
    pub const fn current_time(&self) -> Duration {
        self.current_time
    }

    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Start loading a new stream.
    ///
    /// The mute setting survives switching streams.
    pub fn open(&mut self, stream_url: String) -> bool {
        *self = Self {
            stream_url: Some(stream_url),
            status: Status::Loading,
            muted: self.muted,
            current_time: Duration::ZERO,
            duration: None,
        };
        true
    }

    pub fn close(&mut self) -> bool {
        if self.stream_url.is_none() && self.status == Status::Idle {
            return false;
        }
        *self = Self {
            muted: self.muted,
            ..Default::default()
        };
        true
    }

    pub fn apply_event(&mut self, event: Event) -> bool {
        if self.stream_url.is_none() {
            log::debug!("Ignoring event without stream: {event:?}");
            return false;
        }
        match event {
            Event::CanPlay => {
                if self.status != Status::Loading {
                    return false;
                }
                self.status = Status::Ready;
            }
            Event::Error(message) => {
                if self.status == Status::Failed(message.clone()) {
                    return false;
                }
                self.status = Status::Failed(message);
            }
            Event::TimeUpdated(current_time) => {
                if matches!(self.status, Status::Failed(_)) || self.current_time == current_time
                {
                    return false;
                }
                self.current_time = current_time;
            }
            Event::DurationKnown(duration) => {
                if self.duration == Some(duration) {
                    return false;
                }
                self.duration = Some(duration);
            }
            Event::Ended => {
                if !matches!(self.status, Status::Playing | Status::Paused) {
                    return false;
                }
                self.status = Status::Ended;
            }
        }
        true
    }

    pub fn set_playing(&mut self, playing: bool) -> bool {
        let next_status = match (&self.status, playing) {
            (Status::Ready | Status::Paused | Status::Ended, true) => Status::Playing,
            (Status::Playing, false) => Status::Paused,
            _ => return false,
        };
        self.status = next_status;
        true
    }

    pub fn set_muted(&mut self, muted: bool) -> bool {
        if self.muted == muted {
            return false;
        }
        self.muted = muted;
        true
    }

    /// Limit a seek position to the known duration.
    #[must_use]
    pub fn clamp_position(&self, position: Duration) -> Duration {
        self.duration
            .map_or(position, |duration| position.min(duration))
    }

    pub fn seek(&mut self, position: Duration) -> bool {
        if !self.status.is_controllable() {
            return false;
        }
        let position = self.clamp_position(position);
        if self.current_time == position {
            return false;
        }
        self.current_time = position;
        if self.status == Status::Ended {
            self.status = Status::Paused;
        }
        true
    }
}
