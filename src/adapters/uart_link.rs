//! UART byte link to a gateway co-processor.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`UartLink`] over `esp_idf_hal::uart::UartDriver`.
//! - **all other targets**: use [`MemoryLink`](crate::link::transport::MemoryLink).

/// Line rate shared with the gateway firmware.
pub const GATEWAY_BAUD: u32 = 115_200;

#[cfg(target_os = "espidf")]
pub use esp::UartLink;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_hal::delay::{BLOCK, NON_BLOCK};
    use esp_idf_hal::uart::UartDriver;
    use log::warn;

    use crate::error::TransportError;
    use crate::link::transport::ByteLink;

    pub struct UartLink<'d> {
        uart: UartDriver<'d>,
    }

    impl<'d> UartLink<'d> {
        pub fn new(uart: UartDriver<'d>) -> Self {
            Self { uart }
        }
    }

    impl ByteLink for UartLink<'_> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            self.uart.read(buf, NON_BLOCK).map_err(|e| {
                warn!("UART: read failed: {:?}", e);
                TransportError::Io
            })
        }

        fn write_all(&mut self, mut data: &[u8]) -> Result<(), TransportError> {
            while !data.is_empty() {
                let n = self.uart.write(data).map_err(|e| {
                    warn!("UART: write failed: {:?}", e);
                    TransportError::Io
                })?;
                data = &data[n..];
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<(), TransportError> {
            self.uart.wait_tx_done(BLOCK).map_err(|_| TransportError::Io)
        }
    }
}
