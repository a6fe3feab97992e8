//! LED-Panel: Pixel-Matrix plus Status-LED
//!
//! Hält den Pixel-Puffer und schreibt ihn über den [`SmartLedWriter`] raus.
//! Der generische Writer erlaubt Hardware (RMT) in der Firmware und einen
//! Mock in den Tests.

use crate::traits::{IndicatorLed, LedError, SmartLedWriter};
use crate::types::PixelFrame;

pub struct LedPanel<L, I> {
    frame: PixelFrame,
    strip: L,
    indicator: I,
}

impl<L: SmartLedWriter, I: IndicatorLed> LedPanel<L, I> {
    pub fn new(strip: L, indicator: I) -> Self {
        Self {
            frame: PixelFrame::new(),
            strip,
            indicator,
        }
    }

    /// Baum-Muster an, Status-LED an
    pub fn turn_on(&mut self) -> Result<(), LedError> {
        self.indicator.set(true);
        self.frame.show_tree();
        self.flush()
    }

    /// Alle 25 Pixel aus, Status-LED aus
    pub fn turn_off(&mut self) -> Result<(), LedError> {
        self.indicator.set(false);
        self.frame.clear();
        self.flush()
    }

    /// Schreibt den aktuellen Puffer auf den Strip
    pub fn flush(&mut self) -> Result<(), LedError> {
        self.strip.write(&self.frame)
    }

    pub fn frame(&self) -> &PixelFrame {
        &self.frame
    }

    pub fn strip(&self) -> &L {
        &self.strip
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}
