// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use reqwest::Client;
use url::Url;

use crate::{settings::Settings, source::AnySource};

/// Shared resources, set up once from the settings.
#[derive(Debug, Clone)]
pub struct Environment {
    client: Client,
    catalog_url: Url,
    player_program: PathBuf,
}

impl Environment {
    /// Set up the runtime environment.
    ///
    /// Modifying the settings at runtime is not supported.
    pub fn commission(settings: &Settings) -> anyhow::Result<Self> {
        log::info!("Commissioning runtime environment");
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        let catalog_url = settings.catalog_url()?;
        let player_program = settings.player_program().to_path_buf();
        Ok(Self {
            client,
            catalog_url,
            player_program,
        })
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub const fn catalog_url(&self) -> &Url {
        &self.catalog_url
    }

    pub fn catalog_source(&self) -> anyhow::Result<AnySource> {
        AnySource::from_url(self.client.clone(), self.catalog_url.clone())
    }

    #[must_use]
    pub fn player_program(&self) -> &Path {
        &self.player_program
    }
}
