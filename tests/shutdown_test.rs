//! Stop and drain behavior.

use std::time::Duration;

use batqa_proxy::lifecycle::LifecycleState;
use tokio::net::TcpStream;
use tokio::time;

mod common;

#[tokio::test]
async fn test_stop_waits_for_open_sessions() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(common::proxy_config(backend)).await;
    let proxy_addr = proxy.local_addr();

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    common::round_trip(&mut client, b"hello\n").await;

    let stop = proxy.stop();
    tokio::pin!(stop);
    assert!(
        time::timeout(Duration::from_millis(200), &mut stop).await.is_err(),
        "stop returned while a session was still open"
    );
    assert_eq!(proxy.state(), LifecycleState::Draining);

    // The listener is closed while draining.
    assert!(TcpStream::connect(proxy_addr).await.is_err());

    // The open session keeps relaying until its client leaves.
    assert_eq!(common::round_trip(&mut client, b"still\n").await, b"still\n");
    drop(client);

    time::timeout(Duration::from_secs(2), stop)
        .await
        .expect("stop should finish once the session ends");
    assert_eq!(proxy.state(), LifecycleState::Stopped);
    assert_eq!(proxy.stats().active_connections(), 0);
}

#[tokio::test]
async fn test_stop_without_sessions_is_immediate() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(common::proxy_config(backend)).await;

    time::timeout(Duration::from_secs(1), proxy.stop())
        .await
        .expect("idle relay should stop promptly");
    assert_eq!(proxy.state(), LifecycleState::Stopped);

    // Repeated stops are harmless.
    proxy.stop().await;
    proxy.wait().await;
}

#[tokio::test]
async fn test_drain_timeout_closes_lingering_sessions() {
    let backend = common::start_echo_backend().await;
    let mut config = common::proxy_config(backend);
    config.shutdown.drain_timeout = Some(Duration::from_secs(1));
    let proxy = common::start_proxy(config).await;

    let mut client = TcpStream::connect(proxy.local_addr()).await.unwrap();
    common::round_trip(&mut client, b"idle\n").await;

    time::timeout(Duration::from_secs(3), proxy.stop())
        .await
        .expect("drain timeout should bound the stop");

    common::assert_closed(&mut client).await;
    assert_eq!(proxy.state(), LifecycleState::Stopped);
    assert_eq!(proxy.stats().active_connections(), 0);
}
