//! OTA update controller: streamed download into a single image slot.
//!
//! Flow: check → (trigger arrives) → fetch/begin → N × ingest → commit →
//! "received" → acknowledged → restart.
//!
//! The controller is pure: the flash-write primitive is injected per call
//! and the session drives it from its poll loop.  Exactly one attempt is in
//! flight at a time.

use log::{debug, info, warn};

use crate::app::ports::{ContentLength, FlashPort};
use crate::error::UpdateError;

/// Largest image the slot accepts.
pub const MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024; // 4 MB

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    /// A "check" message went out; waiting for a trigger (or nothing).
    CheckRequested,
    Downloading,
    /// All bytes are written; commit pending.
    Flashing,
    Completed,
    /// "received" was published; restart is expected.
    Acknowledged,
    Aborted(UpdateError),
}

/// Byte accounting for the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProgress {
    pub total: ContentLength,
    pub current: u32,
    pub last_percent: u8,
}

impl UpdateProgress {
    const ZERO: Self = Self {
        total: ContentLength::Known(0),
        current: 0,
        last_percent: 0,
    };
}

/// Progress notification produced by [`UpdateController::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: u32,
    pub total: u32,
    pub percent: u8,
}

pub struct UpdateController {
    state: UpdateState,
    progress: UpdateProgress,
}

impl Default for UpdateController {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateController {
    pub const fn new() -> Self {
        Self {
            state: UpdateState::Idle,
            progress: UpdateProgress::ZERO,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn progress(&self) -> UpdateProgress {
        self.progress
    }

    /// True while a download or commit is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, UpdateState::Downloading | UpdateState::Flashing)
    }

    /// True from `begin` until the "received" acknowledgement went out.
    pub fn holds_attempt(&self) -> bool {
        self.is_busy() || self.state == UpdateState::Completed
    }

    /// Record that a "check" message was sent.  Ignored while an attempt
    /// is held.
    pub fn request_check(&mut self) {
        if self.holds_attempt() {
            debug!("OTA: check requested during transfer, state kept");
            return;
        }
        self.state = UpdateState::CheckRequested;
    }

    /// Start an attempt. Validates size and opens the flash slot.
    ///
    /// A controller holding an attempt is left untouched, including one
    /// whose committed image is not yet acknowledged.
    pub fn begin(
        &mut self,
        total: ContentLength,
        flash: &mut impl FlashPort,
    ) -> Result<(), UpdateError> {
        if self.holds_attempt() {
            return Err(UpdateError::AlreadyInProgress);
        }
        if let ContentLength::Known(n) = total {
            if n == 0 || n > MAX_FIRMWARE_SIZE {
                warn!("OTA: rejected image of {} bytes", n);
                return Err(UpdateError::InvalidSize);
            }
        }

        self.progress = UpdateProgress {
            total,
            ..UpdateProgress::ZERO
        };

        if let Err(e) = flash.begin_write(total) {
            warn!("OTA: flash begin failed: {}", e);
            self.fail(e, flash);
            return Err(e);
        }

        self.state = UpdateState::Downloading;
        match total {
            ContentLength::Known(n) => info!("OTA: begin ({} bytes)", n),
            ContentLength::Unknown => info!("OTA: begin (length unknown)"),
        }
        Ok(())
    }

    /// Write one chunk through to flash.
    ///
    /// Returns a progress event only when the integer percent changed.
    /// Reaching the declared length moves the controller to
    /// [`UpdateState::Flashing`].
    pub fn ingest(
        &mut self,
        chunk: &[u8],
        flash: &mut impl FlashPort,
    ) -> Result<Option<ProgressEvent>, UpdateError> {
        if self.state != UpdateState::Downloading {
            return Err(UpdateError::NotDownloading);
        }
        if chunk.is_empty() {
            return Ok(None);
        }

        let len = u32::try_from(chunk.len()).map_err(|_| UpdateError::Overflow)?;
        let next = self.progress.current.checked_add(len);
        let next = match (next, self.progress.total) {
            (Some(n), ContentLength::Known(total)) if n <= total => n,
            (Some(n), ContentLength::Unknown) => n,
            _ => {
                self.fail(UpdateError::Overflow, flash);
                return Err(UpdateError::Overflow);
            }
        };

        if let Err(e) = flash.write_chunk(chunk) {
            warn!("OTA: write failed at offset {}: {}", self.progress.current, e);
            self.fail(UpdateError::WriteFailed, flash);
            return Err(UpdateError::WriteFailed);
        }
        self.progress.current = next;

        let ContentLength::Known(total) = self.progress.total else {
            return Ok(None);
        };

        if next == total {
            self.state = UpdateState::Flashing;
            info!("OTA: all {} bytes written", total);
        }

        let percent = (u64::from(next) * 100 / u64::from(total)) as u8;
        if percent == self.progress.last_percent {
            return Ok(None);
        }
        self.progress.last_percent = percent;
        Ok(Some(ProgressEvent {
            current: next,
            total,
            percent,
        }))
    }

    /// The fetch source closed.
    ///
    /// A known-length transfer that is short aborts with
    /// [`UpdateError::LengthMismatch`].  An unknown-length transfer moves to
    /// [`UpdateState::Flashing`] if it received anything at all.
    pub fn end_of_stream(&mut self, flash: &mut impl FlashPort) -> Result<(), UpdateError> {
        match self.state {
            UpdateState::Flashing => return Ok(()),
            UpdateState::Downloading => {}
            _ => return Err(UpdateError::NotDownloading),
        }

        let complete = match self.progress.total {
            ContentLength::Known(total) => self.progress.current == total,
            ContentLength::Unknown => self.progress.current > 0,
        };
        if !complete {
            warn!(
                "OTA: stream closed after {} bytes ({:?} expected)",
                self.progress.current, self.progress.total
            );
            self.fail(UpdateError::LengthMismatch, flash);
            return Err(UpdateError::LengthMismatch);
        }

        info!("OTA: end of stream after {} bytes", self.progress.current);
        self.state = UpdateState::Flashing;
        Ok(())
    }

    /// Finalize the image. Only valid in [`UpdateState::Flashing`].
    pub fn commit(&mut self, flash: &mut impl FlashPort) -> Result<(), UpdateError> {
        if self.state != UpdateState::Flashing {
            return Err(UpdateError::NotDownloading);
        }
        if let Err(e) = flash.commit() {
            warn!("OTA: commit failed: {}", e);
            self.fail(UpdateError::VerifyFailed, flash);
            return Err(UpdateError::VerifyFailed);
        }
        self.progress = UpdateProgress::ZERO;
        self.state = UpdateState::Completed;
        info!("OTA: image committed");
        Ok(())
    }

    /// The "received" acknowledgement went out.
    pub fn acknowledge(&mut self) {
        if self.state == UpdateState::Completed {
            self.state = UpdateState::Acknowledged;
        }
    }

    /// Abandon the current attempt (transport loss, caller request).
    pub fn abort(&mut self, reason: UpdateError, flash: &mut impl FlashPort) {
        if self.is_busy() {
            self.fail(reason, flash);
        }
    }

    fn fail(&mut self, reason: UpdateError, flash: &mut impl FlashPort) {
        flash.abort();
        self.progress = UpdateProgress::ZERO;
        self.state = UpdateState::Aborted(reason);
        warn!("OTA: aborted ({})", reason);
    }
}
