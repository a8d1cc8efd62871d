//! ESP-IDF OTA platform: HTTP(S) fetch, flash slot and restart.
//!
//! Implements [`FetchPort`], [`FlashPort`] and [`SystemPort`] in one
//! adapter so the session can be handed a single platform value.  Flash
//! writes go through the `esp-ota` crate; the image is streamed straight
//! from the HTTP client into the inactive partition.
//!
//! [`FetchPort`]: crate::app::ports::FetchPort
//! [`FlashPort`]: crate::app::ports::FlashPort
//! [`SystemPort`]: crate::app::ports::SystemPort

use crate::app::ports::ContentLength;

/// Map a `Content-Length` header to the fetch contract.  Missing,
/// unparsable and zero values all mean the length is unknown.
pub fn content_length(header: Option<&str>) -> ContentLength {
    match header.and_then(|v| v.trim().parse::<u32>().ok()) {
        Some(n) if n > 0 => ContentLength::Known(n),
        _ => ContentLength::Unknown,
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspOtaPlatform;

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;

    use embedded_svc::http::Method;
    use embedded_svc::io::Read;
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_svc::http::client::{
        Configuration as HttpConfig, EspHttpConnection, FollowRedirectsPolicy,
    };
    use log::{info, warn};

    use super::content_length;
    use crate::app::ports::{ContentLength, FetchPort, FlashPort, SystemPort};
    use crate::error::UpdateError;

    #[derive(Default)]
    pub struct EspOtaPlatform {
        conn: Option<EspHttpConnection>,
        update: Option<esp_ota::OtaUpdate>,
    }

    impl EspOtaPlatform {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl FetchPort for EspOtaPlatform {
        fn open(&mut self, url: &str) -> Result<ContentLength, UpdateError> {
            let mut conn = EspHttpConnection::new(&HttpConfig {
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                timeout: Some(Duration::from_secs(60)),
                follow_redirects_policy: FollowRedirectsPolicy::FollowAll,
                buffer_size: Some(4096),
                ..Default::default()
            })
            .map_err(|e| {
                warn!("HTTP: client init failed: {:?}", e);
                UpdateError::FetchFailed
            })?;

            conn.initiate_request(Method::Get, url, &[])
                .and_then(|()| conn.initiate_response())
                .map_err(|e| {
                    warn!("HTTP: request to {} failed: {:?}", url, e);
                    UpdateError::FetchFailed
                })?;

            let status = conn.status();
            if status != 200 {
                warn!("HTTP: {} from {}", status, url);
                return Err(UpdateError::FetchFailed);
            }

            let total = content_length(conn.header("Content-Length"));
            self.conn = Some(conn);
            Ok(total)
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, UpdateError> {
            let Some(conn) = self.conn.as_mut() else {
                return Ok(0);
            };
            match Read::read(conn, buf) {
                Ok(0) => {
                    self.conn = None;
                    Ok(0)
                }
                Ok(n) => Ok(n),
                Err(e) => {
                    warn!("HTTP: read failed: {:?}", e);
                    self.conn = None;
                    Err(UpdateError::FetchFailed)
                }
            }
        }

        fn is_open(&self) -> bool {
            self.conn.is_some()
        }

        fn close(&mut self) {
            self.conn = None;
        }
    }

    impl FlashPort for EspOtaPlatform {
        fn begin_write(&mut self, _expected: ContentLength) -> Result<(), UpdateError> {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("esp-ota begin failed: {:?}", e);
                UpdateError::WriteFailed
            })?;
            self.update = Some(update);
            Ok(())
        }

        fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UpdateError> {
            let update = self.update.as_mut().ok_or(UpdateError::NotDownloading)?;
            update.write(chunk).map_err(|e| {
                warn!("esp-ota write failed: {:?}", e);
                UpdateError::WriteFailed
            })
        }

        fn commit(&mut self) -> Result<(), UpdateError> {
            let update = self.update.take().ok_or(UpdateError::NotDownloading)?;
            let mut completed = update.finalize().map_err(|e| {
                warn!("esp-ota finalize failed: {:?}", e);
                UpdateError::VerifyFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!("esp-ota set_as_boot_partition failed: {:?}", e);
                UpdateError::VerifyFailed
            })?;
            info!("OTA: new image set as boot partition");
            Ok(())
        }

        fn abort(&mut self) {
            // esp-ota aborts automatically when OtaUpdate is dropped
            self.update.take();
        }
    }

    impl SystemPort for EspOtaPlatform {
        fn delay_ms(&mut self, ms: u32) {
            FreeRtos::delay_ms(ms);
        }

        fn restart(&mut self) {
            info!("OTA: rebooting into new firmware");
            esp_ota::restart();
        }
    }
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running image valid.
///
/// Without this, the bootloader rolls back to the previous image after a
/// failed boot.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => log::info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => log::warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    log::info!("OTA rollback check (simulation): skipped");
}
