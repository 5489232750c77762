//! Request frames understood by the base controller.
//!
//! Every frame starts with a one byte [`Header`]. Multi-byte values are little-endian except
//! the length/offset fields of block requests and the PWM payload, which are big-endian.

use heapless::Vec;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

/// Filler byte clocked out while reading.
pub const DUMMY: u8 = 0xFF;
/// Identifier the base controller reports for an empty physical slot.
pub const EMPTY_SLOT_ID: u32 = 0xFFFF_FFFE;
/// Size of each shared data region of the base controller.
pub const BLOCK_IMAGE_SIZE: u16 = 1200;
pub const BLOCK_HEADER_SIZE: usize = 6;
/// Bytes per slot of the geometry record pushed during sign-on.
pub const GEOMETRY_RECORD_SIZE: usize = 7;
pub const MAX_CONFIG_BYTES: usize = 64;

pub type BlockWriteFrame = Vec<u8, { BLOCK_HEADER_SIZE + BLOCK_IMAGE_SIZE as usize }>;
pub type ConfigFrame = Vec<u8, { 2 + MAX_CONFIG_BYTES }>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Header {
    ModuleCount = 0x02,
    Version = 0x03,
    Active = 0x04,
    Dropout = 0x05,
    WriteConfig = 0x10,
    ReadConfig = 0x11,
    PetWatchdog = 0x30,
    StartWatchdog = 0x31,
    StopWatchdog = 0x32,
    ConfigureWatchdog = 0x33,
    ReadStatus = 0x40,
    ReadDiscrete = 0x50,
    ReadAnalog = 0x51,
    ReadBlock = 0x52,
    WriteDiscrete = 0x60,
    WriteAnalog = 0x61,
    WriteBlock = 0x62,
    FirmwareUpdate = 0xAA,
}

/// Shared data regions of the base controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BlockKind {
    DiscreteIn = 0,
    AnalogIn = 1,
    DiscreteOut = 2,
    AnalogOut = 3,
    Status = 4,
}

/// Result byte of a firmware update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FirmwareStatus {
    Success = 1,
    BadChecksum = 4,
    BadHash = 5,
    BadChecksumAndHash = 9,
    #[num_enum(default)]
    Unknown = 0xFF,
}

/// Region, offset and length of a raw block access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAddress {
    pub kind: BlockKind,
    pub offset: u16,
    pub length: u16,
}

impl BlockAddress {
    pub fn new(kind: BlockKind, offset: u16, length: u16) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }

    /// Truncates the length so the access stays inside the region.
    /// `None` if the offset itself is outside.
    pub fn clamped(self) -> Option<Self> {
        if self.offset >= BLOCK_IMAGE_SIZE {
            return None;
        }
        let length = self.length.min(BLOCK_IMAGE_SIZE - self.offset);
        Some(Self { length, ..self })
    }

    pub(crate) fn encode(&self, header: Header) -> [u8; BLOCK_HEADER_SIZE] {
        let len = self.length.to_be_bytes();
        let offset = self.offset.to_be_bytes();
        [
            header.into(),
            self.kind.into(),
            len[0],
            len[1],
            offset[0],
            offset[1],
        ]
    }
}

pub(crate) fn read_block(address: &BlockAddress) -> [u8; BLOCK_HEADER_SIZE] {
    address.encode(Header::ReadBlock)
}

/// `data` must already be truncated to `address.length`.
pub(crate) fn write_block(address: &BlockAddress, data: &[u8]) -> BlockWriteFrame {
    let mut frame = BlockWriteFrame::new();
    let _ = frame.extend_from_slice(&address.encode(Header::WriteBlock));
    let _ = frame.extend_from_slice(&data[..address.length as usize]);
    frame
}

pub(crate) fn read_discrete(slot: u8) -> [u8; 2] {
    [Header::ReadDiscrete.into(), slot]
}

/// Channel 0 carries `width` bytes of `data`, a single channel carries its bit.
pub(crate) fn write_discrete(slot: u8, channel: u8, data: u32, width: u8) -> Vec<u8, 7> {
    let mut frame = Vec::new();
    let _ = frame.extend_from_slice(&[Header::WriteDiscrete.into(), slot, channel]);
    if channel == 0 {
        let bytes = data.to_le_bytes();
        let _ = frame.extend_from_slice(&bytes[..(width as usize).min(4)]);
    } else {
        let _ = frame.push((data & 1) as u8);
    }
    frame
}

pub(crate) fn read_analog(slot: u8, channel: u8) -> [u8; 3] {
    [Header::ReadAnalog.into(), slot, channel]
}

pub(crate) fn write_analog(slot: u8, channel: u8, data: u32) -> [u8; 7] {
    let d = data.to_le_bytes();
    [
        Header::WriteAnalog.into(),
        slot,
        channel,
        d[0],
        d[1],
        d[2],
        d[3],
    ]
}

pub(crate) fn read_status(slot: u8, len: u8, offset: u8) -> [u8; 4] {
    [Header::ReadStatus.into(), slot, len, offset]
}

pub(crate) fn write_config(slot: u8, config: &[u8]) -> ConfigFrame {
    let mut frame = ConfigFrame::new();
    let _ = frame.extend_from_slice(&[Header::WriteConfig.into(), slot]);
    let len = config.len().min(MAX_CONFIG_BYTES);
    let _ = frame.extend_from_slice(&config[..len]);
    frame
}

pub(crate) fn read_config(slot: u8) -> [u8; 2] {
    [Header::ReadConfig.into(), slot]
}

pub(crate) fn configure_watchdog(timeout_ms: u16, retry_ms: u16, toggle: bool) -> [u8; 6] {
    let t = timeout_ms.to_le_bytes();
    let r = retry_ms.to_le_bytes();
    [
        Header::ConfigureWatchdog.into(),
        t[0],
        t[1],
        r[0],
        r[1],
        toggle as u8,
    ]
}

pub(crate) fn firmware_announce(total_length: u32, chunk_size: u32) -> [u8; 9] {
    let t = total_length.to_le_bytes();
    let c = chunk_size.to_le_bytes();
    [
        Header::FirmwareUpdate.into(),
        t[0],
        t[1],
        t[2],
        t[3],
        c[0],
        c[1],
        c[2],
        c[3],
    ]
}

/// Duty in percent with two decimals, then frequency, both big-endian.
pub(crate) fn pwm_payload(duty_hundredths: u32, freq: u32) -> [u8; 8] {
    let d = duty_hundredths.to_be_bytes();
    let f = freq.to_be_bytes();
    [d[0], d[1], d[2], d[3], f[0], f[1], f[2], f[3]]
}

/// One little-endian identifier per slot, in slot order.
pub(crate) fn decode_module_ids(raw: &[u8]) -> impl Iterator<Item = u32> + '_ {
    raw.chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}
