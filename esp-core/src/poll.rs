//! Main Poll Loop
//!
//! Kooperativer Scheduler: ein Tick bedient den Netzwerk-Stack, verteilt
//! dessen Events an Server- und Fetch-State-Machines, liest die Taster und
//! prüft die Deadline für den periodischen Abruf. Nichts davon blockiert;
//! das Warten zwischen zwei Ticks übernimmt der Aufrufer.

use core::fmt::Write;

use heapless::String;

use crate::buttons::ButtonMonitor;
use crate::fetch::{FetchClient, FetchError, FetchEvent, FetchOutcome, FetchTarget};
use crate::led::LedPanel;
use crate::server::{BindError, ConnEvent, HttpControlServer, Listener};
use crate::state::SharedState;
use crate::traits::{ButtonInput, IndicatorLed, NetEvent, Network, SmartLedWriter, TextDisplay};
use crate::types::SensorReading;

/// Abstand der periodischen Abrufe
pub const FETCH_INTERVAL_MS: u64 = 5_000;

/// Pause zwischen zwei Ticks
pub const POLL_INTERVAL_MS: u64 = 100;

/// Watchdog für hängende Abrufe
pub const FETCH_TIMEOUT_MS: u64 = 10_000;

/// Größe des Scratch-Puffers für empfangene Chunks
pub const RX_CHUNK_SIZE: usize = 512;

/// Obergrenze der Events pro Tick, damit ein Tick endlich bleibt
pub const MAX_EVENTS_PER_TICK: usize = 32;

/// Periodische Deadline auf Basis einer Millisekunden-Uhr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    period_ms: u64,
    next_ms: u64,
}

impl Deadline {
    /// Erste Fälligkeit eine Periode nach `now_ms`
    pub const fn new(period_ms: u64, now_ms: u64) -> Self {
        Self {
            period_ms,
            next_ms: now_ms + period_ms,
        }
    }

    /// `true` wenn fällig; die nächste Fälligkeit liegt dann eine Periode
    /// nach `now_ms` (kein Nachholen verpasster Perioden)
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_ms {
            return false;
        }
        self.next_ms = now_ms + self.period_ms;
        true
    }

    pub fn next_ms(&self) -> u64 {
        self.next_ms
    }
}

/// Konfiguration der Schleife
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub http_port: u16,
    pub target: FetchTarget,
    pub fetch_interval_ms: u64,
    pub fetch_timeout_ms: u64,
}

impl PollConfig {
    pub const fn new(http_port: u16, target: FetchTarget) -> Self {
        Self {
            http_port,
            target,
            fetch_interval_ms: FETCH_INTERVAL_MS,
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

/// Komplette Anwendung: Peripherie, Store und beide State Machines
///
/// `MAX_CONN` begrenzt die gleichzeitigen Server-Verbindungen.
pub struct PollLoop<N: Network, L, I, B, D, const MAX_CONN: usize> {
    net: N,
    leds: LedPanel<L, I>,
    buttons: B,
    display: D,
    store: SharedState,
    monitor: ButtonMonitor,
    server: HttpControlServer<N::Conn, MAX_CONN>,
    fetch: FetchClient<N::Conn>,
    schedule: Deadline,
    http_port: u16,
    scratch: [u8; RX_CHUNK_SIZE],
}

impl<N, L, I, B, D, const MAX_CONN: usize> PollLoop<N, L, I, B, D, MAX_CONN>
where
    N: Network,
    L: SmartLedWriter,
    I: IndicatorLed,
    B: ButtonInput,
    D: TextDisplay,
{
    pub fn new(
        net: N,
        leds: LedPanel<L, I>,
        buttons: B,
        display: D,
        config: PollConfig,
        now_ms: u64,
    ) -> Self {
        Self {
            net,
            leds,
            buttons,
            display,
            store: SharedState::new(),
            monitor: ButtonMonitor::new(),
            server: HttpControlServer::new(),
            fetch: FetchClient::new(config.target, config.fetch_timeout_ms),
            schedule: Deadline::new(config.fetch_interval_ms, now_ms),
            http_port: config.http_port,
            scratch: [0; RX_CHUNK_SIZE],
        }
    }

    /// Startet den HTTP-Server (Bind des Listen-Ports)
    pub fn start(&mut self) -> Result<Listener, BindError> {
        self.server.start(&mut self.net, self.http_port)
    }

    /// Ein Durchlauf der Schleife
    pub fn tick(&mut self, now_ms: u64) {
        self.net.poll(now_ms);
        self.dispatch_network_events();

        self.monitor.poll(&mut self.buttons, &mut self.store);

        if let Some(outcome) = self
            .fetch
            .check_timeout(&mut self.net, &mut self.store, now_ms)
        {
            self.on_fetch_outcome(outcome);
        }

        let requested = self.store.take_fetch_request();
        let due = self.schedule.poll(now_ms);
        if requested || due {
            match self.fetch.start_fetch(&mut self.net, &mut self.store, now_ms) {
                Ok(()) => {}
                Err(FetchError::AlreadyInProgress) => {
                    debug!("FETCH: Still in progress, skipping");
                }
                Err(e) => warn!("FETCH: Could not start: {}", e),
            }
        }
    }

    fn dispatch_network_events(&mut self) {
        for _ in 0..MAX_EVENTS_PER_TICK {
            let Some(event) = self.net.next_event(&mut self.scratch) else {
                return;
            };

            match event {
                NetEvent::Accepted(conn) => {
                    self.server.accept(&mut self.net, conn);
                }
                NetEvent::Connected(conn) => self.route(conn, FetchEvent::Connected, None),
                NetEvent::Received(conn, len) => {
                    let len = len.min(RX_CHUNK_SIZE);
                    let data = &self.scratch[..len];
                    if self.fetch.owns(conn) {
                        let outcome = self.fetch.handle(
                            &mut self.net,
                            FetchEvent::Data(data),
                            &mut self.store,
                        );
                        if let Some(outcome) = outcome {
                            self.on_fetch_outcome(outcome);
                        }
                    } else {
                        self.server.handle(
                            &mut self.net,
                            conn,
                            ConnEvent::Data(data),
                            &mut self.store,
                            &mut self.leds,
                        );
                    }
                }
                NetEvent::Closed(conn) => {
                    self.route(conn, FetchEvent::Closed, Some(ConnEvent::PeerClosed))
                }
                NetEvent::Error(conn) => {
                    self.route(conn, FetchEvent::Error, Some(ConnEvent::Error))
                }
            }
        }
        debug!("NET: Event limit reached, continuing next tick");
    }

    /// Verteilt ein datenloses Event an die zuständige State Machine
    fn route(&mut self, conn: N::Conn, fetch_event: FetchEvent<'_>, conn_event: Option<ConnEvent<'_>>) {
        if self.fetch.owns(conn) {
            if let Some(outcome) = self.fetch.handle(&mut self.net, fetch_event, &mut self.store) {
                self.on_fetch_outcome(outcome);
            }
        } else if let Some(conn_event) = conn_event {
            self.server.handle(
                &mut self.net,
                conn,
                conn_event,
                &mut self.store,
                &mut self.leds,
            );
        }
    }

    fn on_fetch_outcome(&mut self, outcome: FetchOutcome) {
        if let FetchOutcome::Committed(reading) = outcome {
            self.show_reading(reading);
        }
    }

    fn show_reading(&mut self, reading: SensorReading) {
        let mut temperature: String<24> = String::new();
        let mut humidity: String<24> = String::new();
        if write!(temperature, "Temp:  {:.2} C", reading.temperature).is_err()
            || write!(humidity, "Umid:  {:.2} %", reading.humidity).is_err()
        {
            return;
        }

        if let Err(e) = self
            .display
            .show_lines(&["Sensor", temperature.as_str(), humidity.as_str()])
        {
            warn!("DISPLAY: Update failed: {}", e);
        }
    }

    pub fn store(&self) -> &SharedState {
        &self.store
    }

    pub fn leds(&self) -> &LedPanel<L, I> {
        &self.leds
    }

    pub fn leds_mut(&mut self) -> &mut LedPanel<L, I> {
        &mut self.leds
    }

    pub fn network(&self) -> &N {
        &self.net
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.net
    }

    pub fn buttons_mut(&mut self) -> &mut B {
        &mut self.buttons
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn server(&self) -> &HttpControlServer<N::Conn, MAX_CONN> {
        &self.server
    }

    pub fn fetch(&self) -> &FetchClient<N::Conn> {
        &self.fetch
    }

    pub fn next_fetch_ms(&self) -> u64 {
        self.schedule.next_ms()
    }
}
