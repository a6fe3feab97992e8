// SmartLED Writer für die 5x5 Matrix
//
// Implementiert den SmartLedWriter-Trait aus esp-core über das RMT Peripheral.
// Mock-Implementierungen für Tests liegen in esp-tests.

use esp_core::{LedError, PixelFrame, SmartLedWriter};
use esp_hal::Blocking;
use esp_hal::rmt::{PulseCode, Rmt};
use esp_hal::time::Rate;
use esp_hal_smartled::SmartLedsAdapter;
use smart_leds_trait::SmartLedsWrite;

use crate::config::LED_COUNT;

/// Buffer-Größe: (3 Farben * 8 Bits) pro LED + 1 Reset
pub const LED_BUFFER_SIZE: usize = LED_COUNT * 24 + 1;

/// Real Hardware LED Writer
///
/// Nutzt ESP32 RMT Peripheral um WS2812 LEDs anzusteuern.
///
/// Hinweis: Der Buffer wird vom Aufrufer erstellt (smart_led_buffer! Macro)
/// und muss so lange leben wie der Writer.
pub struct RmtLedWriter<'a> {
    led: SmartLedsAdapter<'a, LED_BUFFER_SIZE>,
}

impl<'a> RmtLedWriter<'a> {
    /// Erstellt einen neuen RmtLedWriter
    ///
    /// # Parameter
    /// - `gpio8`: GPIO8 Peripheral für LED-Datenleitung
    /// - `rmt_peripheral`: RMT Peripheral
    /// - `rmt_clock_mhz`: RMT Clock Frequenz in MHz (z.B. 80)
    /// - `buffer`: Buffer für LED-Daten (erstellt mit smart_led_buffer!(25))
    pub fn new(
        gpio8: esp_hal::peripherals::GPIO8<'a>,
        rmt_peripheral: esp_hal::peripherals::RMT<'a>,
        rmt_clock_mhz: u32,
        buffer: &'a mut [PulseCode; LED_BUFFER_SIZE],
    ) -> Result<Self, LedError> {
        let rmt: Rmt<'a, Blocking> = Rmt::new(rmt_peripheral, Rate::from_mhz(rmt_clock_mhz))
            .map_err(|_| LedError::InitFailed)?;

        let led = SmartLedsAdapter::new(rmt.channel0, gpio8, buffer);

        Ok(Self { led })
    }
}

impl SmartLedWriter for RmtLedWriter<'_> {
    fn write(&mut self, frame: &PixelFrame) -> Result<(), LedError> {
        self.led
            .write(frame.pixels().iter().copied())
            .map_err(|_| LedError::WriteFailed)
    }
}
