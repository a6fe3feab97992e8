//! Shared State Store
//!
//! Der gesamte veränderliche Zustand, den Taster-Monitor, HTTP-Server und
//! Fetch-Client gemeinsam nutzen. Es gibt kein Lock: alles läuft im selben
//! Poll-Loop, Events werden nie parallel zugestellt.
//!
//! Jedes Feld hat genau einen Schreiber:
//!
//! | Feld                | Schreiber      | Leser             |
//! |---------------------|----------------|-------------------|
//! | `buttons`           | ButtonMonitor  | HTTP-Server       |
//! | `reading`           | FetchClient    | HTTP-Server       |
//! | `fetch_in_progress` | FetchClient    | FetchClient       |
//! | `fetch_requested`   | HTTP-Server    | PollLoop          |
//! | `response`          | HTTP-Server    | HTTP-Server       |
//!
//! Die Setter sind deshalb `pub(crate)`. Bei einer Portierung auf echte
//! Threads muss der Store hinter einen Mutex.

use heapless::String;

use crate::page;
use crate::types::{ButtonId, ButtonStatus, SensorReading};

/// Größe des Puffers für die komplette HTTP-Antwort (Header + HTML)
pub const RESPONSE_CAPACITY: usize = 1536;

pub struct SharedState {
    buttons: [ButtonStatus; 2],
    reading: SensorReading,
    fetch_in_progress: bool,
    fetch_requested: bool,
    response: String<RESPONSE_CAPACITY>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            buttons: [ButtonStatus::Idle; 2],
            reading: SensorReading {
                temperature: 0.0,
                humidity: 0.0,
            },
            fetch_in_progress: false,
            fetch_requested: false,
            response: String::new(),
        }
    }

    pub fn button(&self, button: ButtonId) -> ButtonStatus {
        self.buttons[button.index()]
    }

    pub(crate) fn set_button(&mut self, button: ButtonId, status: ButtonStatus) {
        self.buttons[button.index()] = status;
    }

    pub fn reading(&self) -> SensorReading {
        self.reading
    }

    /// Übernimmt Temperatur und Luftfeuchtigkeit in einem Schritt
    pub(crate) fn commit_reading(&mut self, reading: SensorReading) {
        self.reading = reading;
    }

    pub fn fetch_in_progress(&self) -> bool {
        self.fetch_in_progress
    }

    pub(crate) fn set_fetch_in_progress(&mut self, in_progress: bool) {
        self.fetch_in_progress = in_progress;
    }

    pub fn fetch_requested(&self) -> bool {
        self.fetch_requested
    }

    pub(crate) fn request_fetch(&mut self) {
        self.fetch_requested = true;
    }

    /// Liest und löscht die Fetch-Anforderung vom HTTP-Server
    pub(crate) fn take_fetch_request(&mut self) -> bool {
        core::mem::replace(&mut self.fetch_requested, false)
    }

    /// Zuletzt gerenderte HTTP-Antwort
    pub fn response(&self) -> &str {
        self.response.as_str()
    }

    /// Rendert die Statusseite neu in den Antwort-Puffer
    pub(crate) fn render_response(&mut self) -> Result<(), core::fmt::Error> {
        let buttons = self.buttons;
        let reading = self.reading;
        page::render(&mut self.response, &buttons, reading)
    }
}
