// Netzwerk-Modul: WiFi-Verbindung und smoltcp-Stack
//
// Der Stack wird nicht in einem eigenen Task betrieben, sondern vom
// Poll-Loop aus esp-core bei jedem Tick bedient.

pub mod stack;
pub mod wifi;

pub use stack::{NetResources, SmolNetwork};
pub use wifi::{WifiJoinError, join};
