// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{future::Future, path::PathBuf};

use anyhow::Context as _;
use bytes::Bytes;
use reqwest::Client;
use url::Url;

use crate::webapi::receive_response_body;

/// Read-only resource that supplies the raw catalog.
pub trait Source {
    /// Fetch the whole, unparsed catalog with a single request.
    fn fetch(&self) -> impl Future<Output = anyhow::Result<Bytes>> + Send;
}

/// Catalog served over HTTP(S).
#[derive(Debug, Clone)]
pub struct WebSource {
    client: Client,
    url: Url,
}

impl WebSource {
    #[must_use]
    pub const fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

impl Source for WebSource {
    async fn fetch(&self) -> anyhow::Result<Bytes> {
        let Self { client, url } = self;
        log::debug!("Fetching catalog from {url}");
        let response = client.get(url.clone()).send().await?;
        receive_response_body(response).await
    }
}

/// Catalog stored in a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for FileSource {
    async fn fetch(&self) -> anyhow::Result<Bytes> {
        let Self { path } = self;
        log::debug!("Reading catalog from file {}", path.display());
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(bytes.into())
    }
}

/// Any source that is addressable by an URL.
#[derive(Debug, Clone)]
pub enum AnySource {
    Web(WebSource),
    File(FileSource),
}

impl AnySource {
    /// Select the source according to the URL scheme.
    pub fn from_url(client: Client, url: Url) -> anyhow::Result<Self> {
        match url.scheme() {
            "http" | "https" => Ok(Self::Web(WebSource::new(client, url))),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| anyhow::anyhow!("invalid file URL: {url}"))?;
                Ok(Self::File(FileSource::new(path)))
            }
            scheme => anyhow::bail!("unsupported catalog URL scheme: {scheme}"),
        }
    }
}

impl Source for AnySource {
    async fn fetch(&self) -> anyhow::Result<Bytes> {
        match self {
            Self::Web(source) => source.fetch().await,
            Self::File(source) => source.fetch().await,
        }
    }
}
