// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::{Ipv4Addr, SocketAddr};

use tokio::{
    io::{AsyncReadExt as _, AsyncWriteExt as _},
    net::TcpListener,
    sync::mpsc,
};

use super::*;

/// Answer one HTTP request per connection with the given status
/// lines and JSON bodies, in order.
pub(crate) async fn serve_http_responses(
    responses: impl IntoIterator<Item = (&'static str, &'static [u8])>,
) -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responses = responses.into_iter().collect::<Vec<_>>();
    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let len = stream.read(&mut buf).await.unwrap();
                if len == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..len]);
            }
            let head = format!(
                "HTTP/1.1 {status}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {len}\r\n\
                 Connection: close\r\n\r\n",
                len = body.len(),
            );
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(body).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    });
    addr
}

/// Client that never routes local test traffic through a proxy.
pub(crate) fn new_local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn on_changed_starts_with_current_value() {
    let observable = Observable::new(1u32);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(on_changed(observable.subscribe(), move |value| {
        seen_tx.send(*value).unwrap();
        if *value < 3 {
            OnChanged::Continue
        } else {
            OnChanged::Abort
        }
    }));
    assert_eq!(Some(1), seen_rx.recv().await);
    assert!(observable.modify(|value| {
        *value = 3;
        true
    }));
    task.await.unwrap();
    assert_eq!(Some(3), seen_rx.recv().await);
    // The callback has been dropped after aborting
    assert_eq!(None, seen_rx.recv().await);
}

#[tokio::test]
async fn on_changed_stops_when_publisher_disappears() {
    let observable = Observable::new("initial".to_owned());
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(on_changed(observable.subscribe(), move |value: &String| {
        seen_tx.send(value.clone()).unwrap();
        OnChanged::Continue
    }));
    assert_eq!(Some("initial".to_owned()), seen_rx.recv().await);
    drop(observable);
    task.await.unwrap();
    assert_eq!(None, seen_rx.recv().await);
}
