// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen
#![allow(dead_code)]

// ============================================================================
// LED Konfiguration
// ============================================================================

/// GPIO-Pin für die 5x5 RGB-Matrix (WS2812/Neopixel)
pub const LED_GPIO_PIN: u8 = 8;

/// GPIO-Pin für die einzelne Status-LED
pub const INDICATOR_GPIO_PIN: u8 = 10;

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

/// Anzahl der LEDs in der Matrix
pub const LED_COUNT: usize = esp_core::types::PIXEL_COUNT;

// ============================================================================
// Taster
// ============================================================================

/// GPIO-Pins der Taster (active-low, interner Pull-up)
pub const BUTTON1_GPIO_PIN: u8 = 5;
pub const BUTTON2_GPIO_PIN: u8 = 6;

// ============================================================================
// Display Konfiguration (SSD1306, 128x64, I2C)
// ============================================================================

pub const I2C_SDA_GPIO_PIN: u8 = 2;
pub const I2C_SCL_GPIO_PIN: u8 = 1;

/// I2C Taktfrequenz in kHz
pub const I2C_FREQUENCY_KHZ: u32 = 400;

/// Zeilenhöhe in Pixeln (FONT_6X10)
pub const DISPLAY_LINE_HEIGHT: i32 = 10;

/// Wie lange der Begrüßungsbildschirm stehen bleibt
pub const BOOT_SCREEN_SECS: u64 = 3;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
/// Setze diese in .env file (siehe .env.example)
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// WiFi Passwort
/// Wird zur Build-Zeit aus der Environment Variable WIFI_PASSWORD geladen
/// Setze diese in .env file (siehe .env.example)
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Timeout für Assoziierung mit dem Access Point (kein Retry)
pub const WIFI_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Timeout für die erste DHCP-Adresse
pub const DHCP_TIMEOUT_MS: u64 = 10_000;

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

// ============================================================================
// Sensor-Endpunkt
// ============================================================================

/// IPv4-Adresse des Sensor-Servers als Text ("a.b.c.d")
/// Wird zur Build-Zeit aus der Environment Variable SENSOR_HOST geladen
pub const SENSOR_HOST: &str = env!(
    "SENSOR_HOST",
    "Sensor-Adresse nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Geparste Sensor-Adresse; ungültiger Text bricht den Build ab
pub const SENSOR_IP: [u8; 4] = parse_ipv4(SENSOR_HOST);

pub const SENSOR_PORT: u16 = 80;

/// Pfad der JSON-Ressource auf dem Sensor-Server
pub const SENSOR_PATH: &str = "/dados";

// ============================================================================
// TCP/IP Konfiguration
// ============================================================================

/// Anzahl der Listen-Sockets für den HTTP-Server
pub const HTTP_SOCKET_COUNT: usize = 4;

/// Sockets gesamt: HTTP + Fetch-Client + DHCP
pub const SOCKET_COUNT: usize = HTTP_SOCKET_COUNT + 2;

/// TCP RX Buffer-Größe in Bytes (Request-Zeile + Header)
pub const TCP_RX_BUFFER_SIZE: usize = 1024;

/// TCP TX Buffer-Größe in Bytes
/// Die komplette Statusseite muss in einem Rutsch hineinpassen
pub const TCP_TX_BUFFER_SIZE: usize = esp_core::state::RESPONSE_CAPACITY;

/// Wie lange ein geschlossener Server-Socket auf das FIN des Peers wartet,
/// bevor er abgebrochen und wieder auf Listen gesetzt wird
pub const SERVER_LINGER_MS: u64 = 5_000;

/// RX Buffer des Fetch-Clients
pub const FETCH_RX_BUFFER_SIZE: usize = esp_core::fetch::FETCH_BUFFER_SIZE;

/// TX Buffer des Fetch-Clients (nur die GET-Zeile)
pub const FETCH_TX_BUFFER_SIZE: usize = 128;

/// DHCP Hostname (Option 12)
pub const DHCP_HOSTNAME: &[u8] = b"sensor-panel";

// ============================================================================
// Hilfsfunktionen
// ============================================================================

/// Parst "a.b.c.d" zur Compile-Zeit
const fn parse_ipv4(text: &str) -> [u8; 4] {
    let bytes = text.as_bytes();
    let mut octets = [0u8; 4];
    let mut index = 0;
    let mut value: u16 = 0;
    let mut digits = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'.' {
            assert!(digits > 0 && index < 3, "SENSOR_HOST ist keine IPv4-Adresse");
            octets[index] = value as u8;
            index += 1;
            value = 0;
            digits = 0;
        } else {
            assert!(b.is_ascii_digit(), "SENSOR_HOST ist keine IPv4-Adresse");
            value = value * 10 + (b - b'0') as u16;
            digits += 1;
            assert!(value <= 255 && digits <= 3, "SENSOR_HOST Oktett > 255");
        }
        i += 1;
    }

    assert!(digits > 0 && index == 3, "SENSOR_HOST ist keine IPv4-Adresse");
    octets[3] = value as u8;
    octets
}
