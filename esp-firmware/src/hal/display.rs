// OLED Display (SSD1306, 128x64) über I2C
//
// Implementiert den zeilenbasierten TextDisplay-Trait aus esp-core.

use embedded_graphics::{
    mono_font::{MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_6X10},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text, TextStyle, TextStyleBuilder},
};
use esp_core::{DisplayError, TextDisplay};
use esp_hal::Blocking;
use esp_hal::gpio::interconnect::{PeripheralInput, PeripheralOutput};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::I2C0;
use esp_hal::time::Rate;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use crate::config::{DISPLAY_LINE_HEIGHT, I2C_FREQUENCY_KHZ};

type Driver<'a> = Ssd1306<
    I2CInterface<I2c<'a, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// Maximale Zeilen bei FONT_6X10 auf 64 Pixel Höhe
const MAX_LINES: usize = 6;

pub struct OledDisplay<'a> {
    driver: Driver<'a>,
    text_style: MonoTextStyle<'static, BinaryColor>,
    baseline_style: TextStyle,
}

impl<'a> OledDisplay<'a> {
    /// Initialisiert I2C und den Controller, Display ist danach leer
    pub fn new(
        i2c_periph: I2C0<'a>,
        sda: impl PeripheralOutput<'a> + PeripheralInput<'a>,
        scl: impl PeripheralOutput<'a> + PeripheralInput<'a>,
    ) -> Result<Self, DisplayError> {
        let i2c = I2c::new(
            i2c_periph,
            I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
        )
        .map_err(|_| DisplayError::InitFailed)?
        .with_sda(sda)
        .with_scl(scl);

        let interface = I2CDisplayInterface::new(i2c);
        let mut driver = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        driver.init().map_err(|_| DisplayError::InitFailed)?;

        let text_style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();
        let baseline_style = TextStyleBuilder::new().baseline(Baseline::Top).build();

        let mut display = Self {
            driver,
            text_style,
            baseline_style,
        };
        display.show_lines(&[])?;
        Ok(display)
    }
}

impl TextDisplay for OledDisplay<'_> {
    fn show_lines(&mut self, lines: &[&str]) -> Result<(), DisplayError> {
        self.driver.clear_buffer();

        let mut y = 0;
        for line in lines.iter().take(MAX_LINES) {
            Text::with_text_style(line, Point::new(0, y), self.text_style, self.baseline_style)
                .draw(&mut self.driver)
                .map_err(|_| DisplayError::DrawFailed)?;
            y += DISPLAY_LINE_HEIGHT;
        }

        self.driver.flush().map_err(|_| DisplayError::FlushFailed)
    }
}
