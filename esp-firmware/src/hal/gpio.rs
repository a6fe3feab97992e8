// GPIO-Peripherie: Status-LED und die beiden Taster

use esp_core::{ButtonId, ButtonInput, IndicatorLed};
use esp_hal::gpio::{Input, InputConfig, InputPin, Level, Output, OutputConfig, OutputPin, Pull};

/// Status-LED an einem Output-Pin (HIGH = an)
pub struct GpioIndicator<'a> {
    pin: Output<'a>,
}

impl<'a> GpioIndicator<'a> {
    pub fn new(pin: impl OutputPin + 'a) -> Self {
        Self {
            pin: Output::new(pin, Level::Low, OutputConfig::default()),
        }
    }
}

impl IndicatorLed for GpioIndicator<'_> {
    fn set(&mut self, on: bool) {
        self.pin.set_level(Level::from(on));
    }
}

/// Beide Taster mit internem Pull-up
///
/// Gedrückt zieht den Pin auf GND, der Pegel wird roh weitergegeben;
/// die Invertierung macht der ButtonMonitor.
pub struct GpioButtons<'a> {
    pins: [Input<'a>; 2],
}

impl<'a> GpioButtons<'a> {
    pub fn new(button1: impl InputPin + 'a, button2: impl InputPin + 'a) -> Self {
        let config = InputConfig::default().with_pull(Pull::Up);
        Self {
            pins: [Input::new(button1, config), Input::new(button2, config)],
        }
    }
}

impl ButtonInput for GpioButtons<'_> {
    fn is_high(&mut self, button: ButtonId) -> bool {
        self.pins[button.index()].is_high()
    }
}
