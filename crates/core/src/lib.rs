// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Domain model of the video catalog and its playback.

pub mod catalog;
pub use self::catalog::{Entry as CatalogEntry, LoadError};

pub mod playback;

pub mod prelude {
    pub(crate) use semval::prelude::*;
    // Re-export trait methods from semval
    pub use semval::{IsValid, Validate as _};
}
