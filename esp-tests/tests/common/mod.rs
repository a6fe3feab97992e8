//! Gemeinsame Mocks für die Host-Tests
//!
//! Ersetzen Netzwerk-Stack, LED-Strip, Status-LED, Taster und Display.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use esp_core::fetch::FetchTarget;
use esp_core::{
    ButtonId, ButtonInput, DisplayError, IndicatorLed, LedError, LedPanel, NetError, NetEvent,
    Network, PixelFrame, PollConfig, PollLoop, SmartLedWriter, TextDisplay,
};

pub const SENSOR_IP: [u8; 4] = [192, 168, 0, 50];

pub fn target() -> FetchTarget {
    FetchTarget::new(SENSOR_IP, 80, "/dados")
}

// ============================================================================
// Mock Network
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnId(pub u8);

/// Ein vorbereitetes Event für die Queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    Accepted(ConnId),
    Connected(ConnId),
    Data(ConnId, Vec<u8>),
    Closed(ConnId),
    Error(ConnId),
}

#[derive(Default)]
pub struct MockNetwork {
    pub events: VecDeque<Scripted>,
    pub listening: Option<u16>,
    pub listen_error: Option<NetError>,
    /// Vorgegebene Ergebnisse für connect(); leer = neue ConnId vergeben
    pub connect_results: VecDeque<Result<ConnId, NetError>>,
    pub connects: Vec<([u8; 4], u16)>,
    pub sent: Vec<(ConnId, Vec<u8>)>,
    pub closed: Vec<ConnId>,
    pub aborted: Vec<ConnId>,
    pub poll_count: usize,
    /// Maximale Bytes pro send(), simuliert volle Sende-Queue
    pub send_limit: Option<usize>,
    next_conn: u8,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            next_conn: 100,
            ..Default::default()
        }
    }

    pub fn push(&mut self, event: Scripted) {
        self.events.push_back(event);
    }

    pub fn push_data(&mut self, conn: ConnId, data: &[u8]) {
        self.events.push_back(Scripted::Data(conn, data.to_vec()));
    }

    /// Alles was an `conn` gesendet wurde, als Text
    pub fn sent_text(&self, conn: ConnId) -> String {
        self.sent
            .iter()
            .filter(|(c, _)| *c == conn)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .collect()
    }

    pub fn was_released(&self, conn: ConnId) -> bool {
        self.closed.contains(&conn) || self.aborted.contains(&conn)
    }
}

impl Network for MockNetwork {
    type Conn = ConnId;

    fn listen(&mut self, port: u16) -> Result<(), NetError> {
        if let Some(e) = self.listen_error {
            return Err(e);
        }
        self.listening = Some(port);
        Ok(())
    }

    fn poll(&mut self, _now_ms: u64) {
        self.poll_count += 1;
    }

    fn next_event(&mut self, buf: &mut [u8]) -> Option<NetEvent<ConnId>> {
        let event = match self.events.pop_front()? {
            Scripted::Accepted(c) => NetEvent::Accepted(c),
            Scripted::Connected(c) => NetEvent::Connected(c),
            Scripted::Data(c, data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                NetEvent::Received(c, len)
            }
            Scripted::Closed(c) => NetEvent::Closed(c),
            Scripted::Error(c) => NetEvent::Error(c),
        };
        Some(event)
    }

    fn connect(&mut self, remote: [u8; 4], port: u16) -> Result<ConnId, NetError> {
        self.connects.push((remote, port));
        if let Some(result) = self.connect_results.pop_front() {
            return result;
        }
        let conn = ConnId(self.next_conn);
        self.next_conn = self.next_conn.wrapping_add(1);
        Ok(conn)
    }

    fn send(&mut self, conn: ConnId, data: &[u8]) -> Result<usize, NetError> {
        let len = self.send_limit.map_or(data.len(), |limit| limit.min(data.len()));
        self.sent.push((conn, data[..len].to_vec()));
        Ok(len)
    }

    fn close(&mut self, conn: ConnId) {
        self.closed.push(conn);
    }

    fn abort(&mut self, conn: ConnId) {
        self.aborted.push(conn);
    }
}

// ============================================================================
// Mock LED Writer + Status-LED
// ============================================================================

#[derive(Default)]
pub struct MockLedWriter {
    pub last_frame: Option<PixelFrame>,
    pub write_count: usize,
    pub fail_next_write: bool,
}

impl SmartLedWriter for MockLedWriter {
    fn write(&mut self, frame: &PixelFrame) -> Result<(), LedError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(LedError::WriteFailed);
        }

        self.last_frame = Some(*frame);
        self.write_count += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockIndicator {
    pub on: bool,
}

impl IndicatorLed for MockIndicator {
    fn set(&mut self, on: bool) {
        self.on = on;
    }
}

pub fn led_panel() -> LedPanel<MockLedWriter, MockIndicator> {
    LedPanel::new(MockLedWriter::default(), MockIndicator::default())
}

// ============================================================================
// Mock Taster + Display
// ============================================================================

/// Pegel beider Pins, `true` = HIGH = nicht gedrückt
pub struct MockButtons {
    pub high: [bool; 2],
}

impl Default for MockButtons {
    fn default() -> Self {
        Self { high: [true; 2] }
    }
}

impl MockButtons {
    pub fn press(&mut self, button: ButtonId) {
        self.high[button.index()] = false;
    }

    pub fn release(&mut self, button: ButtonId) {
        self.high[button.index()] = true;
    }
}

impl ButtonInput for MockButtons {
    fn is_high(&mut self, button: ButtonId) -> bool {
        self.high[button.index()]
    }
}

#[derive(Default)]
pub struct MockDisplay {
    pub screens: Vec<Vec<String>>,
    pub fail: bool,
}

impl TextDisplay for MockDisplay {
    fn show_lines(&mut self, lines: &[&str]) -> Result<(), DisplayError> {
        if self.fail {
            return Err(DisplayError::DrawFailed);
        }
        self.screens
            .push(lines.iter().map(|l| String::from(*l)).collect());
        Ok(())
    }
}

// ============================================================================
// Komplette Anwendung
// ============================================================================

pub type TestApp = PollLoop<MockNetwork, MockLedWriter, MockIndicator, MockButtons, MockDisplay, 4>;

pub fn app() -> TestApp {
    PollLoop::new(
        MockNetwork::new(),
        led_panel(),
        MockButtons::default(),
        MockDisplay::default(),
        PollConfig::new(80, target()),
        0,
    )
}
