//! SimpleIOT device: ESP-IDF entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  Uplink             EspOtaPlatform        LogHandler     │
//! │  (MQTT | UART relay)(Fetch+Flash+System)  (DeviceHandler)│
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │          IotSession (protocol · OTA controller)    │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, bail};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use simpleiot::adapters::device_id;
use simpleiot::adapters::esp_ota::{EspOtaPlatform, check_rollback};
use simpleiot::adapters::log_handler::LogHandler;
use simpleiot::adapters::mqtt::EspMqttTransport;
use simpleiot::adapters::relay::RelayTransport;
use simpleiot::adapters::uart_link::{GATEWAY_BAUD, UartLink};
use simpleiot::adapters::uplink::Uplink;
use simpleiot::{Error, IotConfig, IotSession};

const NVS_NAMESPACE: &str = "siot";
const NVS_CONFIG_KEY: &str = "config";

/// Seconds between uptime reports.
const UPTIME_EVERY_SECS: u64 = 60;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("SimpleIOT device v{}", env!("CARGO_PKG_VERSION"));

    check_rollback();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_part = EspDefaultNvsPartition::take()?;

    // ── 2. Config from NVS (or build-time defaults) ───────────
    let mut nvs = EspNvs::<NvsDefault>::new(nvs_part.clone(), NVS_NAMESPACE, true)?;
    let config = load_config(&mut nvs)?;

    // ── 3. Uplink: gateway relay over UART, or Wi-Fi + MQTT ───
    let identity = config.identity().map_err(Error::from)?;
    // Wi-Fi must outlive the session; dropping it disconnects.
    let (transport, _wifi) = if config.with_gateway {
        let uart = UartDriver::new(
            peripherals.uart1,
            peripherals.pins.gpio17,
            peripherals.pins.gpio18,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &UartConfig::default().baudrate(Hertz(GATEWAY_BAUD)),
        )?;
        info!("Uplink: gateway relay on UART1 @ {} baud", GATEWAY_BAUD);
        (Uplink::Gateway(RelayTransport::new(UartLink::new(uart))), None)
    } else {
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_part))?,
            sys_loop,
        )?;
        connect_wifi(&mut wifi)?;
        let mqtt = EspMqttTransport::connect(&config, identity.client_id().as_str())?;
        (Uplink::Direct(mqtt), Some(wifi))
    };

    // ── 4. Session ────────────────────────────────────────────
    let mut session = IotSession::new(config, transport, LogHandler::new()).map_err(Error::from)?;
    let mut platform = EspOtaPlatform::new();

    session.start()?;
    session.check_for_update(false)?;

    // ── 5. Poll loop ──────────────────────────────────────────
    let boot = std::time::Instant::now();
    let mut last_report = 0u64;
    loop {
        if let Err(e) = session.poll(&mut platform) {
            warn!("transport: {} (retrying)", e);
            FreeRtos::delay_ms(1000);
        }

        if let Some(offer) = session.handler_mut().take_offer() {
            match offer.download_url {
                Some(url) => {
                    if let Err(e) = session.fetch(&url, &mut platform) {
                        warn!("update not started: {}", e);
                    }
                }
                None => warn!("update offer without url ignored"),
            }
        }

        let uptime = boot.elapsed().as_secs();
        if uptime >= last_report + UPTIME_EVERY_SECS {
            last_report = uptime;
            if let Err(e) = session.set("uptime", uptime as i64) {
                warn!("uptime report failed: {}", e);
            }
        }
    }
}

fn load_config(nvs: &mut EspNvs<NvsDefault>) -> Result<IotConfig> {
    let mut buf = [0u8; 512];
    if let Some(blob) = nvs.get_raw(NVS_CONFIG_KEY, &mut buf)? {
        match IotConfig::from_postcard(blob) {
            Ok(config) => {
                info!("Config loaded from NVS");
                return Ok(config);
            }
            Err(e) => warn!("stored config rejected ({}), using defaults", e),
        }
    }

    let mut config = IotConfig::new(
        option_env!("SIOT_PROJECT").unwrap_or("SimpleIOT"),
        option_env!("SIOT_MODEL").unwrap_or("esp32"),
        option_env!("SIOT_SERIAL").unwrap_or(""),
    );
    config.host = option_env!("SIOT_HOST").unwrap_or("localhost").into();
    config.firmware_version = env!("CARGO_PKG_VERSION").into();
    device_id::ensure_serial(&mut config.serial);

    let blob = config.to_postcard().map_err(Error::from)?;
    nvs.set_raw(NVS_CONFIG_KEY, &blob)?;
    Ok(config)
}

fn connect_wifi(wifi: &mut BlockingWifi<EspWifi<'static>>) -> Result<()> {
    let ssid = option_env!("SIOT_WIFI_SSID").unwrap_or("");
    let password = option_env!("SIOT_WIFI_PASS").unwrap_or("");
    if ssid.is_empty() {
        bail!("WiFi SSID cannot be empty (set SIOT_WIFI_SSID at build time)");
    }

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid
            .try_into()
            .map_err(|()| anyhow::anyhow!("invalid SSID: {}", ssid))?,
        password: password
            .try_into()
            .map_err(|()| anyhow::anyhow!("invalid WiFi password"))?,
        auth_method: if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi connected to {}", ssid);
    Ok(())
}
