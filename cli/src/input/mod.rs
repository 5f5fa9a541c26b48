// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Line-based commands read from the terminal.

use std::time::Duration;

const QUIT: &str = "q";

/// Commands while watching the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchInput {
    Refresh,
    Quit,
}

impl WatchInput {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" | "r" => Some(Self::Refresh),
            QUIT => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Commands while playing an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlayInput {
    TogglePlay,
    ToggleMute,
    Seek(Duration),
    Quit,
}

impl PlayInput {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let input = match words.next()? {
            "p" => Self::TogglePlay,
            "m" => Self::ToggleMute,
            "s" => {
                let secs = words.next()?.parse::<f64>().ok()?;
                Self::Seek(Duration::try_from_secs_f64(secs).ok()?)
            }
            QUIT => Self::Quit,
            _ => return None,
        };
        if words.next().is_some() {
            return None;
        }
        Some(input)
    }
}
