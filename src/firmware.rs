use crate::base::BaseController;
use crate::error::{Error, FirmwareError};
use crate::frame::{self, FirmwareStatus, Header, DUMMY};
use crate::hal::BaseBus;
use crate::module::ModuleRegistry;
use core::fmt;
use core::ops::Range;
use embedded_hal::delay::DelayNs;
use log::*;

/// Bytes per firmware chunk.
pub const CHUNK_SIZE: u32 = 1000;
/// The base controller reboots into the new image after a good update.
const REBOOT_MS: u32 = 3000;

/// Progress of one firmware image through the chunked update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareTransfer {
    total_length: u32,
    chunk_size: u32,
    offset: u32,
}

impl FirmwareTransfer {
    pub fn new(total_length: u32) -> Self {
        Self {
            total_length,
            chunk_size: CHUNK_SIZE,
            offset: 0,
        }
    }

    pub fn total_length(&self) -> u32 {
        self.total_length
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Full chunks plus one short chunk for the remainder.
    pub fn chunk_count(&self) -> u32 {
        self.total_length / self.chunk_size + (self.total_length % self.chunk_size != 0) as u32
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= self.total_length
    }

    /// Percent of the image sent so far.
    pub fn progress(&self) -> u8 {
        if self.total_length == 0 {
            return 100;
        }
        (self.offset as u64 * 100 / self.total_length as u64) as u8
    }
}

impl Iterator for FirmwareTransfer {
    type Item = Range<usize>;

    /// Range of the image covered by the next chunk.
    fn next(&mut self) -> Option<Self::Item> {
        if self.is_complete() {
            return None;
        }
        let start = self.offset;
        let end = start + self.chunk_size.min(self.total_length - start);
        self.offset = end;
        Some(start as usize..end as usize)
    }
}

/// Firmware version of the base controller, printed as `major.minor.patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirmwareVersion(pub u32);

impl FirmwareVersion {
    pub fn major(&self) -> u32 {
        self.0 >> 12
    }

    pub fn minor(&self) -> u32 {
        (self.0 >> 8) & 0xF
    }

    pub fn patch(&self) -> u32 {
        self.0 & 0xFF
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

impl<B, D, R> BaseController<B, D, R>
where
    B: BaseBus,
    D: DelayNs,
    R: ModuleRegistry,
{
    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, Error<B::Error>> {
        match self.link.send_header(Header::Version, &self.config) {
            Ok(()) => {}
            Err(Error::Timeout) => {
                self.link.delay_ms(100);
                return Err(Error::Timeout);
            }
            Err(err) => return Err(err),
        }
        let version = self.link.read_u32()?;
        self.link.data_sync(self.config.sync_timeout_us)?;
        Ok(FirmwareVersion(version))
    }

    /// Streams a new firmware image to the base controller, one chunk at a time.
    ///
    /// The base controller checks the image once it has all of it; on success it reboots and
    /// the new version is returned. `Ok(None)` means the image was taken but the base controller
    /// did not answer the version query after rebooting.
    pub fn update_firmware(
        &mut self,
        image: &[u8],
    ) -> Result<Option<FirmwareVersion>, Error<B::Error>> {
        let total_length =
            u32::try_from(image.len()).map_err(|_| FirmwareError::ImageTooLarge(image.len()))?;
        let mut transfer = FirmwareTransfer::new(total_length);

        info!("establishing communication");
        let mut announce = frame::firmware_announce(total_length, transfer.chunk_size());
        self.link.transfer(&mut announce)?;
        if let Err(err) = self.link.await_ready(self.config.data_timeout_us, None) {
            self.link.delay_ms(100);
            return Err(err);
        }
        let echo = self.link.exchange_byte(DUMMY)?;
        if echo != u8::from(Header::FirmwareUpdate) {
            error!("firmware update not acknowledged: {:#04x}", echo);
            self.link.delay_ms(100);
            return Err(FirmwareError::NotAcknowledged(echo).into());
        }
        self.link.delay_ms(10);

        info!(
            "firmware transfer started, {} bytes in {} chunks",
            total_length,
            transfer.chunk_count()
        );
        let mut chunk = [0u8; CHUNK_SIZE as usize];
        while let Some(range) = transfer.next() {
            let len = range.len();
            chunk[..len].copy_from_slice(&image[range]);
            self.link
                .await_ready(self.config.firmware_ready_timeout_us, None)?;
            self.link.transfer(&mut chunk[..len])?;
            debug!("{}%", transfer.progress());
        }

        self.link
            .await_ready(self.config.firmware_ready_timeout_us, None)?;
        let status = FirmwareStatus::from(self.link.exchange_byte(DUMMY)?);
        if status != FirmwareStatus::Success {
            error!("firmware update failed: {:?}", status);
            return Err(FirmwareError::Integrity(status).into());
        }

        self.link.delay_ms(REBOOT_MS);
        match self.firmware_version() {
            Ok(version) => {
                info!("update complete, now at {}", version);
                Ok(Some(version))
            }
            Err(err) => {
                warn!("update complete, version query failed: {:?}", err);
                Ok(None)
            }
        }
    }
}
