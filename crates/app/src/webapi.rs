// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use bytes::Bytes;
use reqwest::Response;

/// Receive the whole catalog body of a successful response.
///
/// The web catalog source reports a non-success status as an error
/// with the status as message and a JSON error body, if any, as
/// context. The loader turns it into a transport failure.
pub(crate) async fn receive_response_body(response: Response) -> anyhow::Result<Bytes> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(body);
    }
    log::debug!("Catalog request failed with status {status}");
    let err = anyhow::anyhow!("{status}");
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(json) if !json.is_null() => Err(err.context(json)),
        _ => Err(err),
    }
}
