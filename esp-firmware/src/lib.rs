// Library-Root: Hardware-Anbindung für die Logik aus esp-core
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod net;

use core::fmt::Write;

use defmt::{error, warn};
use embassy_time::{Duration, Timer};
use esp_core::fetch::FetchTarget;
use esp_core::server::HTTP_PORT;
use esp_core::{Ipv4Addr, PollConfig, PollLoop, TextDisplay};
use heapless::String;

use crate::config::{HTTP_SOCKET_COUNT, SENSOR_IP, SENSOR_PATH, SENSOR_PORT};
use crate::hal::{GpioButtons, GpioIndicator, OledDisplay, RmtLedWriter};
use crate::net::SmolNetwork;

// ============================================================================
// Type-Aliase
// ============================================================================

/// Komplette Anwendung mit echter Hardware
///
/// Statt:  PollLoop<SmolNetwork<'a>, RmtLedWriter<'a>, GpioIndicator<'a>, ...>
/// Nutze:  App<'a>
pub type App<'a> = PollLoop<
    SmolNetwork<'a>,
    RmtLedWriter<'a>,
    GpioIndicator<'a>,
    GpioButtons<'a>,
    OledDisplay<'a>,
    HTTP_SOCKET_COUNT,
>;

/// Ports, Sensor-Endpunkt und Intervalle für den Poll-Loop
pub const POLL_CONFIG: PollConfig = PollConfig::new(
    HTTP_PORT,
    FetchTarget::new(SENSOR_IP, SENSOR_PORT, SENSOR_PATH),
);

// ============================================================================
// Display-Helfer
// ============================================================================

/// Zeigt Zeilen an, Fehler werden nur geloggt
pub fn show(display: &mut dyn TextDisplay, lines: &[&str]) {
    if let Err(e) = display.show_lines(lines) {
        warn!("DISPLAY: Update failed: {}", e);
    }
}

/// Begrüßung beim Start
pub fn show_welcome(display: &mut dyn TextDisplay) {
    show(display, &["  Willkommen!", "", "  Sensor-Panel", "  ESP32-C6"]);
}

/// Zeigt die per DHCP bezogene Adresse
pub fn show_address(display: &mut dyn TextDisplay, address: Ipv4Addr) {
    let [a, b, c, d] = address;
    let mut line: String<16> = String::new();
    if write!(line, "{}.{}.{}.{}", a, b, c, d).is_err() {
        return;
    }
    show(display, &["WiFi verbunden", "IP-Adresse:", line.as_str()]);
}

/// Fataler Startfehler: Meldung auf Display und Log, danach Stillstand
///
/// Ohne Display (z.B. wenn gerade dessen Init gescheitert ist) wird nur geloggt.
pub async fn fatal(display: Option<&mut dyn TextDisplay>, message: &str) -> ! {
    error!("FATAL: {}", message);
    if let Some(display) = display {
        show(display, &["FEHLER", message]);
    }

    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
