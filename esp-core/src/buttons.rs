//! Taster-Monitor
//!
//! Flankenerkennung für die beiden Taster, einmal pro Tick aufgerufen.

use crate::state::SharedState;
use crate::traits::ButtonInput;
use crate::types::{ButtonId, ButtonStatus};

/// Merkt sich den zuletzt gesehenen Zustand beider Taster
#[derive(Debug, Default)]
pub struct ButtonMonitor {
    last_pressed: [bool; 2],
}

impl ButtonMonitor {
    pub const fn new() -> Self {
        Self {
            last_pressed: [false; 2],
        }
    }

    /// Liest beide Taster und schreibt Flanken in den Store
    ///
    /// Gibt die Anzahl der erkannten Flanken zurück. Ein gehaltener Taster
    /// erzeugt genau eine Flanke, egal wie viele Ticks er gedrückt bleibt.
    pub fn poll<B: ButtonInput>(&mut self, input: &mut B, store: &mut SharedState) -> usize {
        let mut changes = 0;

        for id in ButtonId::ALL {
            // active-low: gedrückt = LOW
            let pressed = !input.is_high(id);
            let last = &mut self.last_pressed[id.index()];

            if pressed == *last {
                continue;
            }
            *last = pressed;
            changes += 1;

            if pressed {
                store.set_button(id, ButtonStatus::Pressed);
                info!("BTN: Button {} pressed", id.number());
            } else {
                store.set_button(id, ButtonStatus::Released);
                info!("BTN: Button {} released", id.number());
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pegel für beide Pins, `true` = HIGH (nicht gedrückt)
    struct Levels([bool; 2]);

    impl ButtonInput for Levels {
        fn is_high(&mut self, button: ButtonId) -> bool {
            self.0[button.index()]
        }
    }

    #[test]
    fn test_released_pins_produce_no_change() {
        let mut monitor = ButtonMonitor::new();
        let mut store = SharedState::new();
        let mut pins = Levels([true, true]);

        assert_eq!(monitor.poll(&mut pins, &mut store), 0);
        assert_eq!(store.button(ButtonId::One), ButtonStatus::Idle);
    }

    #[test]
    fn test_press_and_release() {
        let mut monitor = ButtonMonitor::new();
        let mut store = SharedState::new();
        let mut pins = Levels([false, true]);

        assert_eq!(monitor.poll(&mut pins, &mut store), 1);
        assert_eq!(store.button(ButtonId::One), ButtonStatus::Pressed);
        assert_eq!(store.button(ButtonId::Two), ButtonStatus::Idle);

        pins.0[0] = true;
        assert_eq!(monitor.poll(&mut pins, &mut store), 1);
        assert_eq!(store.button(ButtonId::One), ButtonStatus::Released);
    }

    #[test]
    fn test_held_button_signals_once() {
        let mut monitor = ButtonMonitor::new();
        let mut store = SharedState::new();
        let mut pins = Levels([true, false]);

        let total: usize = (0..50).map(|_| monitor.poll(&mut pins, &mut store)).sum();
        assert_eq!(total, 1);
        assert_eq!(store.button(ButtonId::Two), ButtonStatus::Pressed);
    }
}
