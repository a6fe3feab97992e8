// WiFi - Einmaliger Verbindungsaufbau als Station
//
// Kein Reconnect: scheitert die Verbindung innerhalb des Timeouts, meldet
// main() das als fatalen Fehler.
use defmt::{Debug2Format, error, info};
use embassy_time::{Duration, with_timeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};

use crate::config::{WIFI_CONNECT_TIMEOUT_MS, WIFI_PASSWORD, WIFI_SSID};

/// Fehler beim Verbindungsaufbau
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum WifiJoinError {
    /// Station-Konfiguration abgelehnt
    Config,
    /// Radio startet nicht
    Start,
    /// Access Point hat die Verbindung abgelehnt
    Connect,
    /// Keine Verbindung innerhalb von WIFI_CONNECT_TIMEOUT_MS
    Timeout,
}

/// Konfiguriert die Station und verbindet mit dem Access Point
pub async fn join(controller: &mut WifiController<'static>) -> Result<(), WifiJoinError> {
    info!("WiFi: Configuring and starting...");

    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(WIFI_SSID.into())
            .with_password(WIFI_PASSWORD.into()),
    );

    controller.set_config(&client_config).map_err(|e| {
        error!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
        WifiJoinError::Config
    })?;

    controller.start_async().await.map_err(|e| {
        error!("WiFi: Failed to start: {}", Debug2Format(&e));
        WifiJoinError::Start
    })?;

    info!("WiFi: Connecting to '{}'...", WIFI_SSID);
    match with_timeout(
        Duration::from_millis(WIFI_CONNECT_TIMEOUT_MS),
        controller.connect_async(),
    )
    .await
    {
        Ok(Ok(())) => {
            info!("WiFi: Connected successfully!");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("WiFi: Connection failed: {}", Debug2Format(&e));
            Err(WifiJoinError::Connect)
        }
        Err(_) => {
            error!("WiFi: No connection after {} ms", WIFI_CONNECT_TIMEOUT_MS);
            Err(WifiJoinError::Timeout)
        }
    }
}
