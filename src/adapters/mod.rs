//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                      | Connects to                 |
//! |---------------|---------------------------------|-----------------------------|
//! | `log_handler` | DeviceHandler                   | Serial log output           |
//! | `relay`       | Transport                       | Gateway over a byte link    |
//! | `uart_link`   | ByteLink                        | UART to the gateway         |
//! | `uplink`      | Transport                       | Direct or relay, per config |
//! | `mqtt`        | Transport                       | ESP-IDF MQTT client (TLS)   |
//! | `esp_ota`     | FetchPort · FlashPort · SystemPort | HTTP client + OTA partition |
//! | `sim`         | Transport · FetchPort · FlashPort · SystemPort | In-memory (host) |
//! | `device_id`   | -                               | Factory MAC → serial        |

pub mod device_id;
pub mod esp_ota;
pub mod log_handler;
pub mod mqtt;
pub mod relay;
pub mod sim;
pub mod uart_link;
pub mod uplink;
