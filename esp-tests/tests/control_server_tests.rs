//! Integration Tests für den HTTP Control Server
//!
//! Die State Machine wird mit synthetischen Events gefüttert, ohne echten Stack.

mod common;

use common::{ConnId, MockNetwork, led_panel};
use esp_core::server::{HTTP_PORT, ServerConnection};
use esp_core::types::{PIXEL_COUNT, TREE_COLOR, TREE_PIXELS};
use esp_core::{
    BindError, ConnAction, ConnEvent, ConnState, HttpControlServer, NetError, SharedState,
};
use rgb::RGB8;

type Server = HttpControlServer<ConnId, 4>;

fn started() -> (Server, MockNetwork) {
    let mut net = MockNetwork::new();
    let mut server = Server::new();
    server.start(&mut net, HTTP_PORT).unwrap();
    (server, net)
}

// ============================================================================
// Tests: start()
// ============================================================================

#[test]
fn test_start_binds_port_80() {
    let (server, net) = started();
    assert_eq!(net.listening, Some(80));
    assert_eq!(server.listener().map(|l| l.port), Some(80));
}

#[test]
fn test_start_reports_bind_error() {
    let mut net = MockNetwork::new();
    net.listen_error = Some(NetError::InvalidState);
    let mut server = Server::new();

    let result = server.start(&mut net, HTTP_PORT);
    assert_eq!(result, Err(BindError::Stack(NetError::InvalidState)));
    assert!(server.listener().is_none());
}

#[test]
fn test_start_twice_is_rejected() {
    let (mut server, mut net) = started();
    assert_eq!(
        server.start(&mut net, HTTP_PORT),
        Err(BindError::AlreadyStarted)
    );
}

// ============================================================================
// Tests: Path Dispatch
// ============================================================================

#[test]
fn test_led_on_sets_tree_pixels_and_flushes() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(1);

    server.accept(&mut net, conn);
    server.handle(
        &mut net,
        conn,
        ConnEvent::Data(b"GET /led/on HTTP/1.1\r\nHost: panel\r\n\r\n"),
        &mut store,
        &mut leds,
    );

    let frame = leds.strip().last_frame.expect("frame flushed");
    for index in TREE_PIXELS {
        assert_eq!(frame.pixel(index), Some(TREE_COLOR));
    }
    assert_eq!(leds.strip().write_count, 1);
    assert!(leds.indicator().on);
    assert!(net.sent_text(conn).starts_with("HTTP/1.1 200 OK\r\n"));
}

#[test]
fn test_led_off_clears_all_pixels() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();

    leds.turn_on().unwrap();

    let conn = ConnId(2);
    server.accept(&mut net, conn);
    server.handle(
        &mut net,
        conn,
        ConnEvent::Data(b"GET /led/off HTTP/1.1\r\n\r\n"),
        &mut store,
        &mut leds,
    );

    let frame = leds.strip().last_frame.expect("frame flushed");
    for index in 0..PIXEL_COUNT {
        assert_eq!(frame.pixel(index), Some(RGB8::default()));
    }
    assert!(!leds.indicator().on);
}

#[test]
fn test_unknown_path_has_no_side_effect_but_returns_page() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(3);

    server.accept(&mut net, conn);
    server.handle(
        &mut net,
        conn,
        ConnEvent::Data(b"GET /nonsense HTTP/1.1\r\n\r\n"),
        &mut store,
        &mut leds,
    );

    assert_eq!(leds.strip().write_count, 0);
    assert!(leds.frame().is_dark());
    assert!(!store.fetch_requested());

    let response = net.sent_text(conn);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/html; charset=UTF-8"));
    assert!(net.closed.contains(&conn));
}

#[test]
fn test_update_requests_fetch() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(4);

    server.accept(&mut net, conn);
    server.handle(
        &mut net,
        conn,
        ConnEvent::Data(b"GET /update HTTP/1.0\r\n\r\n"),
        &mut store,
        &mut leds,
    );

    assert!(store.fetch_requested());
    assert_eq!(leds.strip().write_count, 0);
    assert!(!net.sent_text(conn).is_empty());
}

#[test]
fn test_garbage_request_still_gets_default_page() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(5);

    server.accept(&mut net, conn);
    server.handle(
        &mut net,
        conn,
        ConnEvent::Data(b"\x16\x03\x01\x00"),
        &mut store,
        &mut leds,
    );

    assert!(net.sent_text(conn).contains("<h1>Steuerung LED und Taster</h1>"));
}

#[test]
fn test_led_write_failure_still_responds() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(6);

    server.accept(&mut net, conn);
    // fail_next_write über eine eigene Panel-Instanz setzen
    let mut failing = esp_core::LedPanel::new(
        common::MockLedWriter {
            fail_next_write: true,
            ..Default::default()
        },
        common::MockIndicator::default(),
    );
    server.handle(
        &mut net,
        conn,
        ConnEvent::Data(b"GET /led/on HTTP/1.1\r\n\r\n"),
        &mut store,
        &mut failing,
    );

    assert_eq!(failing.strip().write_count, 0);
    assert!(net.sent_text(conn).starts_with("HTTP/1.1 200 OK"));
    assert_eq!(leds.strip().write_count, 0);
}

// ============================================================================
// Tests: Verbindungs-Lebenszyklus
// ============================================================================

#[test]
fn test_close_without_data_releases_without_response() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(7);

    server.accept(&mut net, conn);
    server.handle(&mut net, conn, ConnEvent::PeerClosed, &mut store, &mut leds);

    assert!(net.sent.is_empty());
    assert!(store.response().is_empty(), "page must not be rendered");
    assert!(net.closed.contains(&conn));
    assert_eq!(server.active_connections(), 0);
}

#[test]
fn test_transport_error_aborts_connection() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(8);

    server.accept(&mut net, conn);
    server.handle(&mut net, conn, ConnEvent::Error, &mut store, &mut leds);

    assert!(net.aborted.contains(&conn));
    assert!(net.sent.is_empty());
    assert_eq!(server.active_connections(), 0);
}

#[test]
fn test_connections_are_independent() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();

    server.accept(&mut net, ConnId(1));
    server.accept(&mut net, ConnId(2));
    assert_eq!(server.active_connections(), 2);

    server.handle(
        &mut net,
        ConnId(2),
        ConnEvent::Data(b"GET / HTTP/1.1\r\n\r\n"),
        &mut store,
        &mut leds,
    );

    assert_eq!(
        server.connection_state(ConnId(1)),
        Some(ConnState::AwaitingRequest)
    );
    assert_eq!(server.connection_state(ConnId(2)), None);
    assert!(net.sent_text(ConnId(1)).is_empty());
    assert!(!net.sent_text(ConnId(2)).is_empty());
}

#[test]
fn test_pool_full_rejects_connection() {
    let (mut server, mut net) = started();
    for id in 0..4 {
        assert!(server.accept(&mut net, ConnId(id)));
    }

    assert!(!server.accept(&mut net, ConnId(9)));
    assert!(net.aborted.contains(&ConnId(9)));
    assert_eq!(server.active_connections(), 4);
}

#[test]
fn test_partial_send_is_not_retried() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let conn = ConnId(1);
    net.send_limit = Some(100);

    server.accept(&mut net, conn);
    server.handle(
        &mut net,
        conn,
        ConnEvent::Data(b"GET / HTTP/1.1\r\n\r\n"),
        &mut store,
        &mut leds,
    );

    assert_eq!(net.sent.len(), 1);
    assert_eq!(net.sent[0].1.len(), 100);
    assert!(net.closed.contains(&conn));
}

#[test]
fn test_event_for_unknown_connection_is_ignored() {
    let (mut server, mut net) = started();
    let mut store = SharedState::new();
    let mut leds = led_panel();

    server.handle(
        &mut net,
        ConnId(42),
        ConnEvent::Data(b"GET /led/on HTTP/1.1\r\n\r\n"),
        &mut store,
        &mut leds,
    );

    assert!(net.sent.is_empty());
    assert_eq!(leds.strip().write_count, 0);
}

// ============================================================================
// Tests: ServerConnection State Machine direkt
// ============================================================================

#[test]
fn test_connection_state_transitions() {
    let mut store = SharedState::new();
    let mut leds = led_panel();
    let mut conn = ServerConnection::new(ConnId(1));
    assert_eq!(conn.state(), ConnState::AwaitingRequest);

    let action = conn.handle(
        ConnEvent::Data(b"GET / HTTP/1.1\r\n\r\n"),
        &mut store,
        &mut leds,
    );
    assert_eq!(action, ConnAction::Respond);
    assert_eq!(conn.state(), ConnState::Responding);
    assert!(!store.response().is_empty());

    // Weitere Daten nach der ersten Anfrage werden ignoriert
    let action = conn.handle(ConnEvent::Data(b"GET /led/on"), &mut store, &mut leds);
    assert_eq!(action, ConnAction::None);
    assert_eq!(leds.strip().write_count, 0);

    conn.finish();
    assert_eq!(conn.state(), ConnState::Closed);
}

#[test]
fn test_rendering_is_idempotent() {
    let mut store = SharedState::new();
    let mut leds = led_panel();

    let mut first = ServerConnection::new(ConnId(1));
    first.handle(ConnEvent::Data(b"GET / HTTP/1.1\r\n"), &mut store, &mut leds);
    let page = store.response().to_string();

    let mut second = ServerConnection::new(ConnId(2));
    second.handle(ConnEvent::Data(b"GET / HTTP/1.1\r\n"), &mut store, &mut leds);

    assert_eq!(page, store.response());
}
