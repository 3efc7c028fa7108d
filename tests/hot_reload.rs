//! Routing table reloads while the proxy is serving.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

use vhost_proxy::routing::reload_channel;

mod common;

async fn fetch(proxy: &common::Proxy, host: &str) -> (u16, String) {
    let response = common::http_client()
        .get(proxy.http_url("/"))
        .header("host", host)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn reload_switches_backend() {
    let blue = common::start_http_backend("blue").await;
    let green = common::start_http_backend("green").await;
    let proxy = common::boot_proxy(&common::routes(&[("app", blue.addr)])).await;

    let (status, body) = fetch(&proxy, "app").await;
    assert_eq!(status, 200);
    assert!(body.starts_with("blue\n"));

    proxy.write_routes(&common::routes(&[("app", green.addr), ("beta", blue.addr)]));
    let table = proxy.controller.reload().await.unwrap();
    assert_eq!(table.generation(), 2);

    let (_, body) = fetch(&proxy, "app").await;
    assert!(body.starts_with("green\n"));
    let (status, body) = fetch(&proxy, "beta").await;
    assert_eq!(status, 200);
    assert!(body.starts_with("blue\n"));
}

#[tokio::test]
async fn removed_host_misses_after_reload() {
    let blue = common::start_http_backend("blue").await;
    let proxy =
        common::boot_proxy(&common::routes(&[("app", blue.addr), ("old", blue.addr)])).await;
    assert_eq!(fetch(&proxy, "old").await.0, 200);

    proxy.write_routes(&common::routes(&[("app", blue.addr)]));
    proxy.controller.reload().await.unwrap();

    assert_eq!(fetch(&proxy, "old").await.0, 502);
    assert_eq!(fetch(&proxy, "app").await.0, 200);
}

#[tokio::test]
async fn malformed_routing_file_keeps_current_table() {
    let blue = common::start_http_backend("blue").await;
    let proxy = common::boot_proxy(&common::routes(&[("app", blue.addr)])).await;

    proxy.write_routes("[app\nhost = ");
    assert!(proxy.controller.reload().await.is_err());

    proxy.write_routes("[app]\nhost = \"no-port\"\n");
    assert!(proxy.controller.reload().await.is_err());

    assert_eq!(proxy.controller.current().generation(), 1);
    let (status, body) = fetch(&proxy, "app").await;
    assert_eq!(status, 200);
    assert!(body.starts_with("blue\n"));
}

#[tokio::test]
async fn trigger_reloads_in_background() {
    let blue = common::start_http_backend("blue").await;
    let green = common::start_http_backend("green").await;
    let proxy = common::boot_proxy(&common::routes(&[("app", blue.addr)])).await;

    let (handle, commands) = reload_channel();
    tokio::spawn(Arc::clone(&proxy.controller).run(commands, proxy.shutdown.subscribe()));

    proxy.write_routes(&common::routes(&[("app", green.addr)]));
    for _ in 0..5 {
        assert!(handle.trigger());
    }

    let controller = Arc::clone(&proxy.controller);
    assert!(
        common::eventually(Duration::from_secs(3), || controller.current().generation() >= 2)
            .await
    );
    let (_, body) = fetch(&proxy, "app").await;
    assert!(body.starts_with("green\n"));
}

#[tokio::test]
async fn open_session_survives_reload() {
    let blue = common::start_ws_backend("blue").await;
    let green = common::start_ws_backend("green").await;
    let proxy = common::boot_proxy(&common::routes(&[("app", blue.addr)])).await;

    let mut request = proxy.ws_url("/").into_client_request().unwrap();
    request.headers_mut().insert("host", "app".parse().unwrap());
    let (mut client, _) = tokio_tungstenite::connect_async(request).await.unwrap();

    proxy.write_routes(&common::routes(&[("app", green.addr)]));
    proxy.controller.reload().await.unwrap();

    client.send(Message::text("still-here")).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(3), client.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply, Message::text("blue:still-here"));
    assert_eq!(green.accepts.load(std::sync::atomic::Ordering::SeqCst), 0);
}
