// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use url::Url;

pub const FILE_NAME: &str = "vidshelf_settings";

pub const FILE_SUFFIX: &str = "ron";

pub const DEFAULT_CATALOG_URL: &str = "http://[::1]:8080/streams.json";

pub const DEFAULT_REQUEST_TIMEOUT_MILLIS: u64 = 10_000;

pub const DEFAULT_PLAYER_PROGRAM: &str = "mpv";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Location of the catalog, either `http(s):` or `file:`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_url: Option<Url>,

    /// Timeout for the whole catalog request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_millis: Option<u64>,

    /// Executable of the media player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_program: Option<PathBuf>,
}

impl Settings {
    pub fn load(parent_dir: &Path) -> anyhow::Result<Self> {
        let file_path = new_settings_file_path(parent_dir.to_path_buf());
        log::info!("Loading settings from file: {}", file_path.display());
        match fs::read_to_string(&file_path) {
            Ok(text) => ron::from_str(&text).map_err(Into::into),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Default::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Load the settings or fall back to the defaults.
    #[must_use]
    pub fn restore_from_dir(parent_dir: &Path) -> Self {
        Self::load(parent_dir).unwrap_or_else(|err| {
            log::warn!("Failed to load settings: {err:#}");
            Default::default()
        })
    }

    pub fn save(&self, parent_dir: &Path) -> anyhow::Result<()> {
        let file_path = new_settings_file_path(parent_dir.to_path_buf());
        log::info!("Saving current settings into file: {}", file_path.display());
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        if let Some(parent_path) = file_path.parent() {
            fs::create_dir_all(parent_path)?;
        }
        fs::write(&file_path, text)?;
        Ok(())
    }

    pub fn catalog_url(&self) -> anyhow::Result<Url> {
        if let Some(catalog_url) = &self.catalog_url {
            return Ok(catalog_url.clone());
        }
        DEFAULT_CATALOG_URL.parse().map_err(Into::into)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_millis
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MILLIS),
        )
    }

    #[must_use]
    pub fn player_program(&self) -> &Path {
        self.player_program
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PLAYER_PROGRAM))
    }

    pub fn update_catalog_url(&mut self, new_catalog_url: Option<Url>) -> bool {
        if self.catalog_url == new_catalog_url {
            return false;
        }
        if let Some(new_catalog_url) = &new_catalog_url {
            log::info!("Updating catalog URL: {new_catalog_url}");
        } else {
            log::info!("Resetting catalog URL");
        }
        self.catalog_url = new_catalog_url;
        true
    }
}

#[must_use]
pub fn new_settings_file_path(parent_dir: PathBuf) -> PathBuf {
    let mut path_buf = parent_dir;
    path_buf.push(FILE_NAME);
    path_buf.set_extension(FILE_SUFFIX);
    path_buf
}
