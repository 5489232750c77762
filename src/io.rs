use crate::base::{reject, BaseController};
use crate::error::{Error, Feature, ValidationError};
use crate::frame::{self, BlockAddress, DUMMY, MAX_CONFIG_BYTES};
use crate::hal::BaseBus;
use crate::module::ModuleRegistry;
use crate::slot::ChannelLabel;
use bit_field::BitField;
use embedded_hal::delay::DelayNs;
use log::*;

/// Byte of the status region carrying each diagnostic.
const MISSING_24V_STATUS: u8 = 3;
const BURNOUT_STATUS: u8 = 5;
const UNDER_RANGE_STATUS: u8 = 7;
const OVER_RANGE_STATUS: u8 = 11;
const MISSING_24V_BIT: usize = 1;

/// Wait for a configuration to be written by the module.
const CONFIG_WRITE_MS: u32 = 100;

impl<B, D, R> BaseController<B, D, R>
where
    B: BaseBus,
    D: DelayNs,
    R: ModuleRegistry,
{
    /// Channel 0 reads every channel, channel 1 in the least significant bit. Only the first
    /// 32 channels of a wider module can be read this way.
    pub fn read_discrete(&mut self, label: impl Into<ChannelLabel>) -> Result<u32, Error<B::Error>> {
        let ChannelLabel { slot, channel } = label.into();
        let binding = self.binding_for(slot, Feature::DiscreteIn)?;
        let mut reply = [0u8; 4];
        let len = (binding.descriptor().width(Feature::DiscreteIn) as usize).min(reply.len());
        check_channel(slot, channel, len as u16 * 8)?;

        let mut request = frame::read_discrete(slot);
        self.read(&mut request, &mut reply[..len])?;

        let data = u32::from_le_bytes(reply);
        if channel == 0 {
            Ok(data)
        } else {
            Ok(data.get_bit(channel as usize - 1) as u32)
        }
    }

    /// Channel 0 writes every channel, otherwise only bit 0 of `data` is used.
    pub fn write_discrete(
        &mut self,
        label: impl Into<ChannelLabel>,
        data: u32,
    ) -> Result<(), Error<B::Error>> {
        let ChannelLabel { slot, channel } = label.into();
        let binding = self.binding_for(slot, Feature::DiscreteOut)?;
        let width = binding.descriptor().width(Feature::DiscreteOut);
        check_channel(slot, channel, width as u16 * 8)?;

        let mut frame = frame::write_discrete(slot, channel, data, width);
        self.link.command(&mut frame, &self.config)
    }

    /// Raw counts of one channel; the resolution is the module's.
    pub fn read_analog(&mut self, label: impl Into<ChannelLabel>) -> Result<u32, Error<B::Error>> {
        let ChannelLabel { slot, channel } = label.into();
        let binding = self.binding_for(slot, Feature::AnalogIn)?;
        check_analog_channel(slot, channel, binding.descriptor().width(Feature::AnalogIn))?;

        let mut request = frame::read_analog(slot, channel);
        let mut reply = [DUMMY, 0, 0, 0];
        self.read(&mut request, &mut reply)?;
        Ok(u32::from_le_bytes(reply))
    }

    /// Temperature modules report engineering units as an IEEE-754 value in the analog word.
    pub fn read_temperature(&mut self, label: impl Into<ChannelLabel>) -> Result<f32, Error<B::Error>> {
        self.read_analog(label).map(f32::from_bits)
    }

    pub fn write_analog(
        &mut self,
        label: impl Into<ChannelLabel>,
        data: u32,
    ) -> Result<(), Error<B::Error>> {
        let ChannelLabel { slot, channel } = label.into();
        let binding = self.binding_for(slot, Feature::AnalogOut)?;
        check_analog_channel(slot, channel, binding.descriptor().width(Feature::AnalogOut))?;

        let mut frame = frame::write_analog(slot, channel, data);
        self.link.command(&mut frame, &self.config)
    }

    /// One byte of the status region of `slot`, `byte` counted from 0.
    pub fn read_status_byte(&mut self, slot: u8, byte: u8) -> Result<u8, Error<B::Error>> {
        let binding = self.binding_for(slot, Feature::Status)?;
        if byte >= binding.descriptor().width(Feature::Status) {
            return Err(reject(ValidationError::StatusByteOutOfRange { slot, byte }));
        }

        let mut request = frame::read_status(slot, 1, byte);
        let mut reply = [0u8];
        self.read(&mut request, &mut reply)?;
        Ok(reply[0])
    }

    /// Reads the whole status region of `slot` into `buf`. Returns the number of bytes read.
    pub fn read_status(&mut self, slot: u8, buf: &mut [u8]) -> Result<usize, Error<B::Error>> {
        let binding = self.binding_for(slot, Feature::Status)?;
        let len = binding.descriptor().width(Feature::Status);
        check_buffer(len as usize, buf.len())?;

        let mut request = frame::read_status(slot, len, 0);
        self.read(&mut request, &mut buf[..len as usize])?;
        Ok(len as usize)
    }

    /// Under range flags; channel 0 returns the flags of every channel.
    pub fn check_under_range(&mut self, label: impl Into<ChannelLabel>) -> Result<u8, Error<B::Error>> {
        self.check_status(label.into(), UNDER_RANGE_STATUS)
    }

    pub fn check_over_range(&mut self, label: impl Into<ChannelLabel>) -> Result<u8, Error<B::Error>> {
        self.check_status(label.into(), OVER_RANGE_STATUS)
    }

    pub fn check_burnout(&mut self, label: impl Into<ChannelLabel>) -> Result<u8, Error<B::Error>> {
        self.check_status(label.into(), BURNOUT_STATUS)
    }

    /// `true` if the module lost its external 24V supply.
    pub fn check_24v(&mut self, slot: u8) -> Result<bool, Error<B::Error>> {
        let status = self.read_status_byte(slot, MISSING_24V_STATUS)?;
        Ok(status.get_bit(MISSING_24V_BIT))
    }

    fn check_status(&mut self, label: ChannelLabel, byte: u8) -> Result<u8, Error<B::Error>> {
        let ChannelLabel { slot, channel } = label;
        check_channel(slot, channel, 8)?;
        let status = self.read_status_byte(slot, byte)?;
        if channel == 0 {
            Ok(status)
        } else {
            Ok(status.get_bit(channel as usize - 1) as u8)
        }
    }

    /// Reads raw bytes of one region of the base controller. A request running past the end
    /// of the region is truncated. Returns the number of bytes read.
    pub fn read_block(
        &mut self,
        address: BlockAddress,
        buf: &mut [u8],
    ) -> Result<usize, Error<B::Error>> {
        let address = clamp(address)?;
        let len = address.length as usize;
        check_buffer(len, buf.len())?;

        let mut request = frame::read_block(&address);
        self.read(&mut request, &mut buf[..len])?;
        Ok(len)
    }

    /// Writes raw bytes into one region of the base controller. A request running past the
    /// end of the region is truncated. Returns the number of bytes written.
    pub fn write_block(&mut self, address: BlockAddress, data: &[u8]) -> Result<usize, Error<B::Error>> {
        let address = clamp(address)?;
        let len = address.length as usize;
        check_buffer(len, data.len())?;

        let mut frame = frame::write_block(&address, data);
        self.link.command(&mut frame, &self.config)?;
        Ok(len)
    }

    /// Sends the first `config_bytes` bytes of `config` to the module in `slot`.
    pub fn configure_module(&mut self, slot: u8, config: &[u8]) -> Result<(), Error<B::Error>> {
        let binding = self.binding_for(slot, Feature::Config)?;
        let len = binding.descriptor().width(Feature::Config) as usize;
        if len > MAX_CONFIG_BYTES {
            return Err(reject(ValidationError::ConfigTooLarge { slot, length: len }));
        }
        check_buffer(len, config.len())?;

        let mut frame = frame::write_config(slot, &config[..len]);
        self.link.delay_ms(1);
        self.link.transfer(&mut frame)?;
        self.link.delay_ms(CONFIG_WRITE_MS);
        self.link.data_sync(self.config.sync_timeout_us)?;
        self.link.data_sync(self.config.sync_timeout_us)?;
        debug!("slot {}: configured", slot);
        Ok(())
    }

    /// Reads the configuration of `slot` into `buf`. Returns the number of bytes read.
    pub fn read_module_config(&mut self, slot: u8, buf: &mut [u8]) -> Result<usize, Error<B::Error>> {
        let binding = self.binding_for(slot, Feature::Config)?;
        let len = binding.descriptor().width(Feature::Config) as usize;
        check_buffer(len, buf.len())?;

        let mut request = frame::read_config(slot);
        self.read(&mut request, &mut buf[..len])?;
        Ok(len)
    }
}

fn check_channel(slot: u8, channel: u8, channels: u16) -> Result<(), ValidationError> {
    if channel as u16 > channels {
        warn!("slot {}: channel {} is not valid", slot, channel);
        return Err(ValidationError::ChannelOutOfRange { slot, channel });
    }
    Ok(())
}

/// Analog channels are 1-based, four bytes each.
fn check_analog_channel(slot: u8, channel: u8, width: u8) -> Result<(), ValidationError> {
    if channel == 0 {
        warn!("slot {}: channel {} is not valid", slot, channel);
        return Err(ValidationError::ChannelOutOfRange { slot, channel });
    }
    check_channel(slot, channel, width as u16 / 4)
}

fn check_buffer(required: usize, actual: usize) -> Result<(), ValidationError> {
    if actual < required {
        warn!("buffer of {} bytes, {} required", actual, required);
        return Err(ValidationError::BufferTooSmall { required, actual });
    }
    Ok(())
}

fn clamp(address: BlockAddress) -> Result<BlockAddress, ValidationError> {
    let clamped = address
        .clamped()
        .ok_or(ValidationError::BlockOffsetOutOfRange(address.offset))?;
    if clamped.length != address.length {
        debug!(
            "block access truncated from {} to {} bytes",
            address.length, clamped.length
        );
    }
    Ok(clamped)
}
