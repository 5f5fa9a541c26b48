// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Browse and play a catalog of video streams.
//!
//! The sub-crates are re-exported behind features.

pub use vidshelf_core::*;

#[cfg(feature = "json")]
pub use vidshelf_core_json as json;

#[cfg(feature = "app")]
pub use vidshelf_app as app;
