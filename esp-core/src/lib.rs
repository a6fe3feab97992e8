//! ESP Core - Platform-agnostic Logic, State Machines and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert Traits, den Shared State Store, die beiden Netzwerk-State-
//! Machines (HTTP-Server, Fetch-Client), die Abbildung von Socket-Zuständen
//! auf Events und den Poll-Loop. Alles ist auf dem
//! Host mit Mock-Implementierungen testbar.

#![no_std]

// Muss vor den anderen Modulen stehen (Makros)
#[macro_use]
mod fmt;

pub mod buttons;
pub mod fetch;
pub mod json;
pub mod led;
pub mod link;
pub mod page;
pub mod poll;
pub mod server;
pub mod state;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use buttons::ButtonMonitor;
pub use fetch::{FetchClient, FetchError, FetchEvent, FetchOutcome, FetchState, FetchTarget};
pub use json::{ParseError, parse_reading};
pub use led::LedPanel;
pub use link::{LinkStep, Recycle, SocketPhase, SocketView, TcpState};
pub use poll::{Deadline, PollConfig, PollLoop};
pub use server::{BindError, ConnAction, ConnEvent, ConnState, HttpControlServer, Listener, Route};
pub use state::SharedState;
pub use traits::{
    ButtonInput, DisplayError, IndicatorLed, Ipv4Addr, LedError, NetError, NetEvent, Network,
    SmartLedWriter, TextDisplay,
};
pub use types::{ButtonId, ButtonStatus, PixelFrame, SensorReading};
