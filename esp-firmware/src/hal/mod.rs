// Hardware Abstraction Layer (HAL) Module
//
// Implementiert die Traits aus esp-core für die echte Hardware.
// Mocks für die Host-Tests liegen in esp-tests.

pub mod display;
pub mod gpio;
pub mod led_writer;

pub use display::OledDisplay;
pub use gpio::{GpioButtons, GpioIndicator};
pub use led_writer::{LED_BUFFER_SIZE, RmtLedWriter};
