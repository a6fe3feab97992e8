// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Embassy Async Runtime
use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_hal_smartled::smart_led_buffer;
use static_cell::{ConstStaticCell, StaticCell};

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Logik aus esp-core, Hardware aus diesem Crate
use esp_core::poll::POLL_INTERVAL_MS;
use esp_core::{LedPanel, Network, PollLoop};
use esp_sensor_panel::config::{
    BOOT_SCREEN_SECS, DHCP_TIMEOUT_MS, EXTRA_HEAP_SIZE, LED_COUNT, RMT_CLOCK_MHZ, WIFI_HEAP_SIZE,
};
use esp_sensor_panel::hal::{GpioButtons, GpioIndicator, OledDisplay, RmtLedWriter};
use esp_sensor_panel::net::{self, NetResources, SmolNetwork};
use esp_sensor_panel::{App, POLL_CONFIG, fatal, show_address, show_welcome};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Socket-Tabelle und TCP-Puffer (zu groß für den Stack)
static NET_RESOURCES: ConstStaticCell<NetResources> = ConstStaticCell::new(NetResources::new());

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Main Entry Point
///
/// Initialisiert Display, LED-Matrix, Taster und WiFi, wartet auf DHCP und
/// betreibt danach den Poll-Loop aus esp-core: ein Tick, 100 ms Pause.
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap Allocator initialisieren (WiFi braucht dynamischen Speicher!)
    // Zwei Bereiche: reclaimed RAM (64 KB) + extra (36 KB) = 100 KB total
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // Display zuerst, damit alle weiteren Fehler sichtbar sind
    // SDA = GPIO2, SCL = GPIO1
    let mut display = match OledDisplay::new(peripherals.I2C0, peripherals.GPIO2, peripherals.GPIO1)
    {
        Ok(display) => display,
        Err(e) => {
            error!("DISPLAY: Init failed: {}", e);
            fatal(None, "Display").await
        }
    };
    show_welcome(&mut display);

    // LED-Matrix (GPIO8) + Status-LED (GPIO10)
    // Macro allokiert Speicher im richtigen Format für RMT
    let mut rmt_buffer = smart_led_buffer!(LED_COUNT);
    let strip = match RmtLedWriter::new(
        peripherals.GPIO8,
        peripherals.RMT,
        RMT_CLOCK_MHZ,
        &mut rmt_buffer,
    ) {
        Ok(strip) => strip,
        Err(e) => {
            error!("LED: Init failed: {}", e);
            fatal(Some(&mut display), "LED-Matrix").await
        }
    };
    let mut leds = LedPanel::new(strip, GpioIndicator::new(peripherals.GPIO10));
    if let Err(e) = leds.turn_off() {
        warn!("LED: Initial clear failed: {}", e);
    }

    // Taster 1 = GPIO5, Taster 2 = GPIO6 (Pull-up, active-low)
    let buttons = GpioButtons::new(peripherals.GPIO5, peripherals.GPIO6);

    Timer::after(Duration::from_secs(BOOT_SCREEN_SECS)).await;

    // WiFi Hardware initialisieren
    static RADIO_INIT: StaticCell<esp_radio::Controller> = StaticCell::new();
    let radio_init = match esp_radio::init() {
        Ok(radio) => RADIO_INIT.init(radio),
        Err(e) => {
            error!("WiFi: Radio init failed: {}", defmt::Debug2Format(&e));
            fatal(Some(&mut display), "WiFi Init").await
        }
    };

    // Controller muss am Leben bleiben, sonst wird die Station gestoppt
    let (mut wifi_controller, wifi_interface) =
        match esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default()) {
            Ok(pair) => pair,
            Err(e) => {
                error!("WiFi: Driver init failed: {}", defmt::Debug2Format(&e));
                fatal(Some(&mut display), "WiFi Init").await
            }
        };

    if net::join(&mut wifi_controller).await.is_err() {
        fatal(Some(&mut display), "WiFi Verbindung").await;
    }

    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let mut network = SmolNetwork::new(wifi_interface.sta, NET_RESOURCES.take(), seed, now_ms());

    // Auf DHCP-Lease warten
    info!("WiFi: Link is up, waiting for IP address...");
    let dhcp_deadline = now_ms() + DHCP_TIMEOUT_MS;
    let address = loop {
        network.poll(now_ms());
        if let Some(address) = network.address() {
            break address;
        }
        if now_ms() >= dhcp_deadline {
            fatal(Some(&mut display), "Keine IP (DHCP)").await;
        }
        Timer::after(Duration::from_millis(POLL_INTERVAL_MS)).await;
    };

    let [a, b, c, d] = address;
    info!("WiFi: Got IP address {}.{}.{}.{}", a, b, c, d);
    show_address(&mut display, address);

    // Ab hier übernimmt der Poll-Loop
    let mut app: App<'_> = PollLoop::new(network, leds, buttons, display, POLL_CONFIG, now_ms());
    match app.start() {
        Ok(listener) => info!("HTTP: Control page at http://{}.{}.{}.{}:{}/", a, b, c, d, listener.port),
        Err(e) => {
            error!("HTTP: Could not bind: {}", e);
            fatal(Some(app.display_mut()), "HTTP Server").await
        }
    }

    loop {
        app.tick(now_ms());
        Timer::after(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}
