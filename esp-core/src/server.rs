//! HTTP Control Server
//!
//! Nimmt Verbindungen auf dem Listen-Port an, wertet die Request-Zeile aus,
//! führt die passende Aktion aus und antwortet mit der Statusseite.
//!
//! Jede Verbindung ist eine eigene [`ServerConnection`] State Machine:
//!
//! ```text
//! AwaitingRequest --Data--> Dispatching --> Responding --> Closed
//!        |                                                   ^
//!        +-------------- PeerClosed / Error -----------------+
//! ```
//!
//! Keine Header-Auswertung, keine persistenten Verbindungen: eine Anfrage,
//! eine Antwort, dann wird geschlossen.

use heapless::Vec;

use crate::led::LedPanel;
use crate::state::SharedState;
use crate::traits::{IndicatorLed, NetError, Network, SmartLedWriter};

/// Standard-Port des Servers
pub const HTTP_PORT: u16 = 80;

/// Aktion, die eine Anfrage auslöst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    /// `GET /led/on` - Baum-Muster und Status-LED an
    LedOn,
    /// `GET /led/off` - alle Pixel aus
    LedOff,
    /// `GET /update` - Messwerte neu holen
    Update,
    /// Alles andere: nur Statusseite
    Status,
}

impl Route {
    /// Sucht einen bekannten Pfad in den rohen Request-Bytes
    ///
    /// Unvollständige oder kaputte Anfragen ergeben [`Route::Status`].
    pub fn from_request(request: &[u8]) -> Self {
        if contains(request, b"GET /led/on") {
            Route::LedOn
        } else if contains(request, b"GET /led/off") {
            Route::LedOff
        } else if contains(request, b"GET /update") {
            Route::Update
        } else {
            Route::Status
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Zustand einer einzelnen Server-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnState {
    AwaitingRequest,
    Dispatching(Route),
    Responding,
    Closed,
}

/// Event für eine Server-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnEvent<'a> {
    /// Request-Daten empfangen
    Data(&'a [u8]),
    /// Gegenseite hat geschlossen (Payload der Länge 0)
    PeerClosed,
    /// Transportfehler
    Error,
}

/// Was mit der Verbindung nach einem Event passieren soll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnAction {
    /// Nichts tun, auf weitere Events warten
    None,
    /// Antwort aus dem Store senden und schließen
    Respond,
    /// Ohne Antwort schließen
    Close,
    /// Verbindung ist kaputt, abbrechen
    Abort,
}

pub struct ServerConnection<C> {
    conn: C,
    state: ConnState,
}

impl<C: Copy> ServerConnection<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            state: ConnState::AwaitingRequest,
        }
    }

    pub fn conn(&self) -> C {
        self.conn
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Event-Dispatch der State Machine
    ///
    /// Bei Request-Daten wird die Aktion synchron ausgeführt und die Seite in
    /// den Store gerendert. Das Senden selbst übernimmt der Aufrufer.
    pub fn handle<L: SmartLedWriter, I: IndicatorLed>(
        &mut self,
        event: ConnEvent<'_>,
        store: &mut SharedState,
        leds: &mut LedPanel<L, I>,
    ) -> ConnAction {
        match event {
            ConnEvent::PeerClosed => {
                self.state = ConnState::Closed;
                ConnAction::Close
            }
            ConnEvent::Error => {
                self.state = ConnState::Closed;
                ConnAction::Abort
            }
            ConnEvent::Data(request) if self.state == ConnState::AwaitingRequest => {
                let route = Route::from_request(request);
                self.state = ConnState::Dispatching(route);
                dispatch(route, store, leds);

                if store.render_response().is_err() {
                    error!("HTTP: Response buffer too small, page truncated");
                }
                self.state = ConnState::Responding;
                ConnAction::Respond
            }
            // Nur die erste Anfrage zählt, keine Pipelining-Unterstützung
            ConnEvent::Data(_) => ConnAction::None,
        }
    }

    /// Antwort wurde übergeben, Verbindung ist fertig
    pub fn finish(&mut self) {
        self.state = ConnState::Closed;
    }
}

fn dispatch<L: SmartLedWriter, I: IndicatorLed>(
    route: Route,
    store: &mut SharedState,
    leds: &mut LedPanel<L, I>,
) {
    match route {
        Route::LedOn => {
            info!("HTTP: Turning LEDs on");
            if let Err(e) = leds.turn_on() {
                error!("LED: Write failed: {}", e);
            }
        }
        Route::LedOff => {
            info!("HTTP: Turning LEDs off");
            if let Err(e) = leds.turn_off() {
                error!("LED: Write failed: {}", e);
            }
        }
        Route::Update => {
            info!("HTTP: Sensor update requested");
            store.request_fetch();
        }
        Route::Status => {}
    }
}

/// Fehler beim Starten des Servers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindError {
    /// Server lauscht bereits
    AlreadyStarted,
    /// Der Stack konnte den Port nicht öffnen
    Stack(NetError),
}

/// Handle des offenen Listen-Ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Listener {
    pub port: u16,
}

/// Server mit bis zu `MAX` gleichzeitigen Verbindungen
pub struct HttpControlServer<C, const MAX: usize> {
    listener: Option<Listener>,
    connections: Vec<ServerConnection<C>, MAX>,
}

impl<C: Copy + Eq, const MAX: usize> Default for HttpControlServer<C, MAX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Copy + Eq, const MAX: usize> HttpControlServer<C, MAX> {
    pub const fn new() -> Self {
        Self {
            listener: None,
            connections: Vec::new(),
        }
    }

    /// Öffnet den Listen-Port
    ///
    /// Ein Fehler hier ist fatal für den HTTP-Teil und wird nicht wiederholt.
    pub fn start<N: Network<Conn = C>>(
        &mut self,
        net: &mut N,
        port: u16,
    ) -> Result<Listener, BindError> {
        if self.listener.is_some() {
            return Err(BindError::AlreadyStarted);
        }

        net.listen(port).map_err(BindError::Stack)?;

        let listener = Listener { port };
        self.listener = Some(listener);
        info!("HTTP: Server listening on port {}", port);
        Ok(listener)
    }

    pub fn listener(&self) -> Option<Listener> {
        self.listener
    }

    /// Registriert eine neu angenommene Verbindung
    pub fn accept<N: Network<Conn = C>>(&mut self, net: &mut N, conn: C) -> bool {
        if self.owns(conn) {
            return true;
        }
        match self.connections.push(ServerConnection::new(conn)) {
            Ok(()) => {
                debug!("HTTP: Connection accepted ({} active)", self.connections.len());
                true
            }
            Err(_) => {
                warn!("HTTP: Too many connections, rejecting");
                net.abort(conn);
                false
            }
        }
    }

    pub fn owns(&self, conn: C) -> bool {
        self.connections.iter().any(|c| c.conn() == conn)
    }

    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn connection_state(&self, conn: C) -> Option<ConnState> {
        self.connections
            .iter()
            .find(|c| c.conn() == conn)
            .map(|c| c.state())
    }

    /// Stellt ein Event an die zugehörige Verbindung zu
    pub fn handle<N, L, I>(
        &mut self,
        net: &mut N,
        conn: C,
        event: ConnEvent<'_>,
        store: &mut SharedState,
        leds: &mut LedPanel<L, I>,
    ) where
        N: Network<Conn = C>,
        L: SmartLedWriter,
        I: IndicatorLed,
    {
        let Some(index) = self.connections.iter().position(|c| c.conn() == conn) else {
            warn!("HTTP: Event for unknown connection ignored");
            return;
        };

        match self.connections[index].handle(event, store, leds) {
            ConnAction::None => return,
            ConnAction::Respond => {
                let response = store.response().as_bytes();
                // Ein einziger Versuch, Flow-Control wird nicht weiter geprüft
                match net.send(conn, response) {
                    Ok(queued) if queued < response.len() => {
                        warn!(
                            "HTTP: Only {} of {} bytes queued",
                            queued,
                            response.len()
                        );
                    }
                    Ok(queued) => debug!("HTTP: Response queued ({} bytes)", queued),
                    Err(e) => warn!("HTTP: Send failed: {}", e),
                }
                self.connections[index].finish();
                net.close(conn);
            }
            ConnAction::Close => {
                debug!("HTTP: Peer closed connection");
                net.close(conn);
            }
            ConnAction::Abort => {
                warn!("HTTP: Connection error, aborting");
                net.abort(conn);
            }
        }

        self.connections.swap_remove(index);
    }
}
