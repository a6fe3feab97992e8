//! Remote Fetch Client
//!
//! Holt per HTTP/1.0 die Messwerte von einem festen Sensor-Host, ohne den
//! Poll-Loop zu blockieren. Eine [`FetchSession`] existiert nur, solange ein
//! Abruf läuft; das `fetch_in_progress`-Flag im Store garantiert, dass es
//! höchstens eine gibt.
//!
//! ```text
//! Connecting --Connected/GET--> Receiving --Closed--> Parsing --> Done
//!      |                            |                              ^
//!      +------- Error / Timeout ----+------------------------------+
//! ```
//!
//! Der Empfangspuffer hat feste Größe. Ein Chunk, der nicht mehr passt, wird
//! komplett verworfen; geparst wird trotzdem, was bis dahin angekommen ist.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::json::{self, ParseError};
use crate::state::SharedState;
use crate::traits::{Ipv4Addr, NetError, Network};
use crate::types::SensorReading;

/// Kapazität des Empfangspuffers einer Session
pub const FETCH_BUFFER_SIZE: usize = 1024;

/// Maximale Länge der GET-Anfrage
pub const REQUEST_CAPACITY: usize = 96;

/// Ziel des Abrufs: fester Host, Port und Pfad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTarget {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub path: &'static str,
}

impl FetchTarget {
    pub const fn new(ip: Ipv4Addr, port: u16, path: &'static str) -> Self {
        Self { ip, port, path }
    }

    /// `GET <path> HTTP/1.0\r\nHost: <ip>\r\n\r\n`
    pub fn request(&self) -> Result<String<REQUEST_CAPACITY>, core::fmt::Error> {
        let [a, b, c, d] = self.ip;
        let mut out = String::new();
        write!(
            out,
            "GET {} HTTP/1.0\r\nHost: {}.{}.{}.{}\r\n\r\n",
            self.path, a, b, c, d
        )?;
        Ok(out)
    }
}

/// Fehler beim Starten eines Abrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchError {
    /// Es läuft schon ein Abruf; wird nicht gequeued
    AlreadyInProgress,
    /// Kein Socket für die Session frei
    ResourceExhausted,
    /// Der Connect-Aufruf selbst ist fehlgeschlagen
    ConnectError(NetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchState {
    Connecting,
    Receiving,
    Parsing,
    Done,
}

/// Event für die laufende Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchEvent<'a> {
    Connected,
    Data(&'a [u8]),
    /// Gegenseite hat geschlossen (Payload der Länge 0)
    Closed,
    Error,
    /// Watchdog: Session zu alt
    Timeout,
}

/// Ergebnis eines abgeschlossenen Abrufs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchOutcome {
    /// Beide Werte übernommen
    Committed(SensorReading),
    /// Antwort unbrauchbar, Store unverändert
    Rejected(ParseError),
    /// Transportfehler oder Timeout, Store unverändert
    Failed,
}

/// Was der Client nach einem Session-Event tun muss
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Wait,
    SendRequest,
    Finish(Result<SensorReading, ParseError>),
    Abort,
}

/// Ein laufender Abruf
pub struct FetchSession<C> {
    conn: C,
    state: FetchState,
    buffer: Vec<u8, FETCH_BUFFER_SIZE>,
    truncated: bool,
    started_ms: u64,
}

impl<C: Copy> FetchSession<C> {
    fn new(conn: C, now_ms: u64) -> Self {
        Self {
            conn,
            state: FetchState::Connecting,
            buffer: Vec::new(),
            truncated: false,
            started_ms: now_ms,
        }
    }

    pub fn conn(&self) -> C {
        self.conn
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Füllstand des Empfangspuffers
    pub fn received(&self) -> usize {
        self.buffer.len()
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    fn handle(&mut self, event: FetchEvent<'_>) -> Step {
        match (self.state, event) {
            (_, FetchEvent::Error | FetchEvent::Timeout) => {
                self.state = FetchState::Done;
                Step::Abort
            }
            (FetchState::Connecting, FetchEvent::Connected) => {
                self.state = FetchState::Receiving;
                Step::SendRequest
            }
            (FetchState::Receiving, FetchEvent::Data(chunk)) => {
                self.append(chunk);
                Step::Wait
            }
            (FetchState::Connecting | FetchState::Receiving, FetchEvent::Closed) => {
                self.state = FetchState::Parsing;
                if self.truncated {
                    warn!(
                        "FETCH: Response exceeded {} bytes, parsing truncated body",
                        FETCH_BUFFER_SIZE
                    );
                }
                let result = json::parse_reading(&self.buffer);
                self.state = FetchState::Done;
                Step::Finish(result)
            }
            _ => {
                debug!("FETCH: Event ignored in state {}", self.state);
                Step::Wait
            }
        }
    }

    fn append(&mut self, chunk: &[u8]) {
        if self.buffer.extend_from_slice(chunk).is_err() {
            // Chunk passt nicht mehr: komplett verwerfen
            self.truncated = true;
        }
    }
}

/// Client für den periodischen Abruf
pub struct FetchClient<C> {
    target: FetchTarget,
    timeout_ms: u64,
    session: Option<FetchSession<C>>,
}

impl<C: Copy + Eq> FetchClient<C> {
    pub const fn new(target: FetchTarget, timeout_ms: u64) -> Self {
        Self {
            target,
            timeout_ms,
            session: None,
        }
    }

    pub fn target(&self) -> &FetchTarget {
        &self.target
    }

    pub fn session(&self) -> Option<&FetchSession<C>> {
        self.session.as_ref()
    }

    pub fn owns(&self, conn: C) -> bool {
        self.session.as_ref().is_some_and(|s| s.conn == conn)
    }

    /// Startet einen Abruf
    ///
    /// Das Flag im Store wird erst gesetzt, wenn der Verbindungsaufbau
    /// wirklich angestoßen wurde.
    pub fn start_fetch<N: Network<Conn = C>>(
        &mut self,
        net: &mut N,
        store: &mut SharedState,
        now_ms: u64,
    ) -> Result<(), FetchError> {
        if store.fetch_in_progress() || self.session.is_some() {
            return Err(FetchError::AlreadyInProgress);
        }

        let conn = match net.connect(self.target.ip, self.target.port) {
            Ok(conn) => conn,
            Err(NetError::Exhausted) => return Err(FetchError::ResourceExhausted),
            Err(e) => return Err(FetchError::ConnectError(e)),
        };

        self.session = Some(FetchSession::new(conn, now_ms));
        store.set_fetch_in_progress(true);
        info!("FETCH: Connecting to sensor host");
        Ok(())
    }

    /// Stellt ein Event an die laufende Session zu
    ///
    /// Gibt `Some` zurück, sobald die Session beendet ist.
    pub fn handle<N: Network<Conn = C>>(
        &mut self,
        net: &mut N,
        event: FetchEvent<'_>,
        store: &mut SharedState,
    ) -> Option<FetchOutcome> {
        let session = self.session.as_mut()?;
        let conn = session.conn;

        match session.handle(event) {
            Step::Wait => None,
            Step::SendRequest => {
                if self.send_request(net, conn) {
                    None
                } else {
                    Some(self.finish_failed(net, store))
                }
            }
            Step::Finish(Ok(reading)) => {
                store.commit_reading(reading);
                info!(
                    "FETCH: temperatura={} umidade={}",
                    reading.temperature, reading.humidity
                );
                self.release(net, store, false);
                Some(FetchOutcome::Committed(reading))
            }
            Step::Finish(Err(e)) => {
                warn!("FETCH: Could not parse response: {}", e);
                self.release(net, store, false);
                Some(FetchOutcome::Rejected(e))
            }
            Step::Abort => {
                warn!("FETCH: Transport error, discarding partial data");
                Some(self.finish_failed(net, store))
            }
        }
    }

    /// Watchdog: bricht eine Session ab, die älter als das Timeout ist
    pub fn check_timeout<N: Network<Conn = C>>(
        &mut self,
        net: &mut N,
        store: &mut SharedState,
        now_ms: u64,
    ) -> Option<FetchOutcome> {
        let started = self.session.as_ref()?.started_ms;
        if now_ms.saturating_sub(started) < self.timeout_ms {
            return None;
        }
        warn!("FETCH: No answer after {} ms, aborting", self.timeout_ms);
        self.handle(net, FetchEvent::Timeout, store)
    }

    fn send_request<N: Network<Conn = C>>(&self, net: &mut N, conn: C) -> bool {
        let Ok(request) = self.target.request() else {
            error!("FETCH: Request does not fit into buffer");
            return false;
        };

        match net.send(conn, request.as_bytes()) {
            Ok(sent) if sent == request.len() => {
                debug!("FETCH: Request sent ({} bytes)", sent);
                true
            }
            Ok(sent) => {
                warn!("FETCH: Only {} of {} request bytes queued", sent, request.len());
                false
            }
            Err(e) => {
                warn!("FETCH: Send failed: {}", e);
                false
            }
        }
    }

    fn finish_failed<N: Network<Conn = C>>(
        &mut self,
        net: &mut N,
        store: &mut SharedState,
    ) -> FetchOutcome {
        self.release(net, store, true);
        FetchOutcome::Failed
    }

    /// Done: Verbindung und Session freigeben, Flag löschen
    fn release<N: Network<Conn = C>>(&mut self, net: &mut N, store: &mut SharedState, abort: bool) {
        if let Some(session) = self.session.take() {
            if abort {
                net.abort(session.conn);
            } else {
                net.close(session.conn);
            }
        }
        store.set_fetch_in_progress(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_line() {
        let target = FetchTarget::new([192, 168, 0, 42], 80, "/dados");
        let request = target.request().unwrap();
        assert_eq!(
            request.as_str(),
            "GET /dados HTTP/1.0\r\nHost: 192.168.0.42\r\n\r\n"
        );
    }

    #[test]
    fn test_session_happy_path() {
        let mut session = FetchSession::new(7u8, 0);
        assert_eq!(session.state(), FetchState::Connecting);

        assert_eq!(session.handle(FetchEvent::Connected), Step::SendRequest);
        assert_eq!(session.state(), FetchState::Receiving);

        assert_eq!(session.handle(FetchEvent::Data(b"{\"temperatura\":")), Step::Wait);
        assert_eq!(session.handle(FetchEvent::Data(b"20.5,\"umidade\":60}")), Step::Wait);

        let step = session.handle(FetchEvent::Closed);
        assert_eq!(
            step,
            Step::Finish(Ok(SensorReading {
                temperature: 20.5,
                humidity: 60.0
            }))
        );
        assert_eq!(session.state(), FetchState::Done);
    }

    #[test]
    fn test_session_error_skips_parse() {
        let mut session = FetchSession::new(1u8, 0);
        session.handle(FetchEvent::Connected);
        session.handle(FetchEvent::Data(b"{\"temperatura\":1,\"umidade\":2}"));
        assert_eq!(session.handle(FetchEvent::Error), Step::Abort);
        assert_eq!(session.state(), FetchState::Done);
    }

    #[test]
    fn test_overflowing_chunk_is_dropped() {
        let mut session = FetchSession::new(1u8, 0);
        session.handle(FetchEvent::Connected);

        let filler = [b' '; FETCH_BUFFER_SIZE - 4];
        session.handle(FetchEvent::Data(&filler));
        assert_eq!(session.received(), FETCH_BUFFER_SIZE - 4);
        assert!(!session.truncated());

        session.handle(FetchEvent::Data(b"too long"));
        assert_eq!(session.received(), FETCH_BUFFER_SIZE - 4);
        assert!(session.truncated());

        // Passt noch genau rein
        session.handle(FetchEvent::Data(b"{}{}"));
        assert_eq!(session.received(), FETCH_BUFFER_SIZE);
    }

    #[test]
    fn test_data_before_connect_is_ignored() {
        let mut session = FetchSession::new(1u8, 0);
        assert_eq!(session.handle(FetchEvent::Data(b"early")), Step::Wait);
        assert_eq!(session.received(), 0);
        assert_eq!(session.state(), FetchState::Connecting);
    }
}
