use crate::base::BaseController;
use crate::error::{Error, Feature, ValidationError};
use crate::frame::{self, BlockAddress, BlockKind};
use crate::hal::BaseBus;
use crate::module::ModuleRegistry;
use crate::slot::ChannelLabel;
use embedded_hal::delay::DelayNs;
use log::*;

/// Analog output bytes of one PWM channel: duty then frequency.
const PWM_CHANNEL_BYTES: u8 = 8;

impl<B, D, R> BaseController<B, D, R>
where
    B: BaseBus,
    D: DelayNs,
    R: ModuleRegistry,
{
    /// Sets duty (percent, two decimals kept) and frequency in one block write so both land
    /// in the same scan of the base controller.
    pub fn write_pwm(
        &mut self,
        label: impl Into<ChannelLabel>,
        duty: f32,
        freq: u32,
    ) -> Result<(), Error<B::Error>> {
        let ChannelLabel { slot, channel } = self.pwm_channel(label.into())?;
        let offset = self.slots.analog_out_offset(slot)
            + (channel as u16 - 1) * PWM_CHANNEL_BYTES as u16;
        let payload = frame::pwm_payload(duty_hundredths(duty), freq);

        let address = BlockAddress::new(BlockKind::AnalogOut, offset, payload.len() as u16);
        self.write_block(address, &payload)?;
        self.link.data_sync(self.config.sync_timeout_us)
    }

    pub fn write_pwm_duty(
        &mut self,
        label: impl Into<ChannelLabel>,
        duty: f32,
    ) -> Result<(), Error<B::Error>> {
        let ChannelLabel { slot, channel } = self.pwm_channel(label.into())?;
        self.write_analog((slot, 1 + (channel - 1) * 2), duty_hundredths(duty))?;
        self.link.data_sync(self.config.sync_timeout_us)
    }

    pub fn write_pwm_freq(
        &mut self,
        label: impl Into<ChannelLabel>,
        freq: u32,
    ) -> Result<(), Error<B::Error>> {
        let ChannelLabel { slot, channel } = self.pwm_channel(label.into())?;
        self.write_analog((slot, 2 + (channel - 1) * 2), freq)?;
        self.link.data_sync(self.config.sync_timeout_us)
    }

    /// Direction output of a channel configured for direction mode.
    pub fn write_pwm_dir(
        &mut self,
        label: impl Into<ChannelLabel>,
        on: bool,
    ) -> Result<(), Error<B::Error>> {
        let ChannelLabel { slot, channel } = self.pwm_channel(label.into())?;
        self.write_analog((slot, 1 + (channel - 1) * 2), on as u32)?;
        self.link.data_sync(self.config.sync_timeout_us)
    }

    fn pwm_channel(&self, label: ChannelLabel) -> Result<ChannelLabel, ValidationError> {
        let binding = self.binding_for(label.slot, Feature::Pwm)?;
        let channels = binding.descriptor().width(Feature::Pwm) / PWM_CHANNEL_BYTES;
        if label.channel == 0 || label.channel > channels {
            warn!("slot {}: channel {} is not valid", label.slot, label.channel);
            return Err(ValidationError::ChannelOutOfRange {
                slot: label.slot,
                channel: label.channel,
            });
        }
        Ok(label)
    }
}

/// Truncated, not rounded.
fn duty_hundredths(duty: f32) -> u32 {
    (duty * 100.0) as u32
}
