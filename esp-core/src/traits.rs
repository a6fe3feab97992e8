//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Hardware- und Netzwerk-Zugriff
//! ohne konkrete Implementierung.
//!
//! # Implementierungen
//! - **Production:** esp-firmware (RMT, GPIO, SSD1306, smoltcp)
//! - **Testing:** Mocks in esp-tests

use crate::types::{ButtonId, PixelFrame};

/// Fehler-Typ für LED-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    /// Peripheral konnte nicht konfiguriert werden
    InitFailed,
    WriteFailed,
}

/// Trait für den SmartLED-Strip (WS2812/Neopixel)
pub trait SmartLedWriter {
    /// Schreibt den kompletten Pixel-Puffer auf den Strip
    ///
    /// # Fehlerbehandlung
    /// Gibt `LedError::WriteFailed` zurück wenn Hardware-Zugriff fehlschlägt
    fn write(&mut self, frame: &PixelFrame) -> Result<(), LedError>;
}

/// Einzelne Status-LED an einem GPIO
pub trait IndicatorLed {
    fn set(&mut self, on: bool);
}

/// Zugriff auf die beiden Taster
pub trait ButtonInput {
    /// Roher Pegel des Pins (`true` = HIGH)
    ///
    /// Die Taster sind active-low mit Pull-up: gedrückt liest LOW.
    fn is_high(&mut self, button: ButtonId) -> bool;
}

/// Fehler-Typ für das Display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    InitFailed,
    DrawFailed,
    FlushFailed,
}

/// Zeilenbasiertes Text-Display (z.B. SSD1306 über I2C)
pub trait TextDisplay {
    /// Löscht das Display und zeigt die Zeilen von oben nach unten
    fn show_lines(&mut self, lines: &[&str]) -> Result<(), DisplayError>;
}

// ============================================================================
// Netzwerk
// ============================================================================

/// IPv4-Adresse als Oktette
pub type Ipv4Addr = [u8; 4];

/// Fehler des Netzwerk-Stacks bei synchronen Aufrufen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetError {
    /// Kein freier Socket / kein Speicher
    Exhausted,
    /// Adresse oder Port nicht verwendbar (z.B. noch keine IP)
    Unaddressable,
    /// Socket ist im falschen Zustand für die Operation
    InvalidState,
}

/// Benachrichtigung des Netzwerk-Stacks
///
/// Ersetzt die Callbacks eines klassischen Raw-TCP-Stacks. Pro Verbindung
/// kommen die Events in Transport-Reihenfolge: `Connected`/`Accepted` vor dem
/// ersten `Received`, `Closed` oder `Error` zuletzt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetEvent<C> {
    /// Eingehende Verbindung auf dem Listen-Port angenommen
    Accepted(C),
    /// Ausgehende Verbindung steht
    Connected(C),
    /// `len` Bytes wurden in den Scratch-Puffer geschrieben
    Received(C, usize),
    /// Gegenseite hat geschlossen (Payload der Länge 0)
    Closed(C),
    /// Reset oder anderer Transportfehler
    Error(C),
}

/// Nicht-blockierender TCP-Stack
///
/// Kein Aufruf darf blockieren. Alles Asynchrone wird über
/// [`Network::next_event`] gemeldet.
pub trait Network {
    /// Handle einer Verbindung
    type Conn: Copy + Eq;

    /// Öffnet den Listen-Port für eingehende Verbindungen
    fn listen(&mut self, port: u16) -> Result<(), NetError>;

    /// Interne Verarbeitung des Stacks (muss jeden Tick laufen)
    fn poll(&mut self, now_ms: u64);

    /// Holt das nächste anstehende Event; empfangene Daten landen in `buf`
    fn next_event(&mut self, buf: &mut [u8]) -> Option<NetEvent<Self::Conn>>;

    /// Startet einen Verbindungsaufbau (Ergebnis kommt als Event)
    fn connect(&mut self, remote: Ipv4Addr, port: u16) -> Result<Self::Conn, NetError>;

    /// Stellt Daten in die Sende-Queue, gibt die angenommene Länge zurück
    fn send(&mut self, conn: Self::Conn, data: &[u8]) -> Result<usize, NetError>;

    /// Schließt geordnet (FIN nach den gequeueten Daten) und gibt den Handle frei
    fn close(&mut self, conn: Self::Conn);

    /// Bricht ab (RST) und gibt den Handle frei
    fn abort(&mut self, conn: Self::Conn);
}
