//! Tokio driver against a scripted loopback server.

#![cfg(feature = "tokio")]

mod fake_server;

use fake_server::{OK, err_packet, spawn};
use zero_mysql::tokio::Conn;
use zero_mysql::{ConnectionStatus, Error};

#[tokio::test]
async fn test_connect_query_close() {
    let (url, server) = spawn(|mut peer| {
        peer.accept_login();
        let (_, ping) = peer.recv();
        assert_eq!(ping, [0x0E]);
        peer.send(1, OK);
        let _ = peer.recv();
        peer.answer_rows("id", &["10", "20"]);
        peer.expect_quit();
    });

    let mut conn = Conn::new(url.as_str()).await.unwrap();
    assert_eq!(conn.connection_id(), 77);

    conn.ping().await.unwrap();
    let result = conn.query("SELECT id FROM t").await.unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[1][0].as_deref(), Some(&b"20"[..]));
    assert_eq!(conn.status(), ConnectionStatus::Connected);

    conn.close().await.unwrap();
    server.join().unwrap();
}

#[tokio::test]
async fn test_engaged_in_multi_function() {
    let (url, server) = spawn(|mut peer| {
        peer.accept_login();
        let _ = peer.recv();
        peer.answer_rows("id", &["1", "2"]);
        peer.expect_quit();
    });

    let mut conn = Conn::new(url.as_str()).await.unwrap();
    conn.start_query("SELECT id FROM t").await.unwrap();
    assert_eq!(conn.read_some_rows(1).await.unwrap().len(), 1);

    // Another command cannot start while rows are pending
    assert!(matches!(conn.ping().await, Err(Error::EngagedInMultiFunction)));
    assert!(!conn.is_broken());

    // Closing mid-result-set is allowed
    assert_eq!(conn.status(), ConnectionStatus::InProgress);
    conn.close().await.unwrap();
    server.join().unwrap();
}

#[tokio::test]
async fn test_query_drop_reports_server_error() {
    let (url, server) = spawn(|mut peer| {
        peer.accept_login();
        let _ = peer.recv();
        peer.send(1, &err_packet(1064, "42000", "You have an error in your SQL syntax"));
        peer.expect_quit();
    });

    let mut conn = Conn::new(url.as_str()).await.unwrap();
    let err = conn.query_drop("SELEC 1").await.unwrap_err();
    assert_eq!(err.server_code(), Some(1064));
    assert!(conn.diagnostics().server_message().starts_with("You have an error"));

    conn.close().await.unwrap();
    server.join().unwrap();
}
