//! Core Types für das Sensor-Panel
//!
//! Datenstrukturen ohne Hardware-Dependencies

use rgb::RGB8;

/// Anzahl der Pixel in der LED-Matrix (5x5)
pub const PIXEL_COUNT: usize = 25;

/// Farbe für das "Baum"-Muster bei `/led/on`
pub const TREE_COLOR: RGB8 = RGB8 { r: 0, g: 255, b: 0 };

/// Pixel-Indizes des Baum-Musters (Spitze, Äste, Stamm)
pub const TREE_PIXELS: [usize; 10] = [2, 6, 8, 10, 11, 14, 15, 17, 19, 22];

/// Kennung der beiden Taster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    One,
    Two,
}

impl ButtonId {
    pub const ALL: [ButtonId; 2] = [ButtonId::One, ButtonId::Two];

    /// Index in Arrays (0 oder 1)
    pub fn index(self) -> usize {
        match self {
            ButtonId::One => 0,
            ButtonId::Two => 1,
        }
    }

    /// Nummer wie auf der Platine beschriftet (1 oder 2)
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

/// Zustand eines Tasters, wie er auf der Webseite erscheint
///
/// Wird nur bei Flanken geändert, nie pro Tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonStatus {
    /// Noch kein Ereignis seit dem Start
    #[default]
    Idle,
    Pressed,
    Released,
}

impl ButtonStatus {
    /// Text für die Statusseite
    pub fn describe(self) -> &'static str {
        match self {
            ButtonStatus::Idle => "Kein Ereignis",
            ButtonStatus::Pressed => "Gedrückt!",
            ButtonStatus::Released => "Losgelassen!",
        }
    }
}

/// Letzter Messwert vom entfernten Sensor
///
/// Temperatur und Luftfeuchtigkeit werden immer gemeinsam geschrieben.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
}

/// Pixel-Puffer der LED-Matrix
///
/// Wird bei jeder Aktion komplett neu beschrieben, kein Double-Buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFrame {
    pixels: [RGB8; PIXEL_COUNT],
}

impl Default for PixelFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelFrame {
    pub const fn new() -> Self {
        Self {
            pixels: [RGB8 { r: 0, g: 0, b: 0 }; PIXEL_COUNT],
        }
    }

    /// Setzt einen Pixel; Indizes außerhalb der Matrix werden ignoriert
    pub fn set_pixel(&mut self, index: usize, r: u8, g: u8, b: u8) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = RGB8 { r, g, b };
        }
    }

    /// Schaltet alle Pixel aus
    pub fn clear(&mut self) {
        self.pixels = [RGB8::default(); PIXEL_COUNT];
    }

    /// Baum-Muster: alles aus, die zehn Baum-Pixel grün
    pub fn show_tree(&mut self) {
        self.clear();
        for index in TREE_PIXELS {
            self.set_pixel(index, TREE_COLOR.r, TREE_COLOR.g, TREE_COLOR.b);
        }
    }

    pub fn pixel(&self, index: usize) -> Option<RGB8> {
        self.pixels.get(index).copied()
    }

    pub fn pixels(&self) -> &[RGB8; PIXEL_COUNT] {
        &self.pixels
    }

    pub fn is_dark(&self) -> bool {
        self.pixels.iter().all(|p| *p == RGB8::default())
    }
}

// ============================================================================
// defmt::Format Implementations (optional feature)
// ============================================================================

#[cfg(feature = "defmt")]
impl defmt::Format for SensorReading {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "SensorReading {{ temperatura: {}, umidade: {} }}",
            self.temperature,
            self.humidity
        )
    }
}
