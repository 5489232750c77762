use crate::config::Config;
use crate::error::Error;
use crate::frame::{Header, DUMMY};
use crate::hal::BaseBus;
use embedded_hal::delay::DelayNs;
use log::*;

/// Lets the base controller load its reply after raising the ack line.
const SETTLE_US: u32 = 50;

/// Owns the bus and paces every exchange on the ack line.
#[derive(Debug)]
pub(crate) struct Link<B, D> {
    bus: B,
    delay: D,
}

impl<B, D> Link<B, D>
where
    B: BaseBus,
    D: DelayNs,
{
    pub fn new(bus: B, delay: D) -> Self {
        Self { bus, delay }
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    pub fn set_enable(&mut self, enabled: bool) -> Result<(), Error<B::Error>> {
        self.bus.set_enable(enabled).map_err(Error::Bus)
    }

    pub fn transfer(&mut self, buf: &mut [u8]) -> Result<(), Error<B::Error>> {
        self.bus.transfer(buf).map_err(Error::Bus)
    }

    pub fn exchange_byte(&mut self, byte: u8) -> Result<u8, Error<B::Error>> {
        let mut buf = [byte];
        self.transfer(&mut buf)?;
        Ok(buf[0])
    }

    /// Clocks in one little-endian word.
    pub fn read_u32(&mut self) -> Result<u32, Error<B::Error>> {
        let mut buf = [DUMMY, 0, 0, 0];
        self.transfer(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn poll_ready(&mut self) -> nb::Result<(), Error<B::Error>> {
        if self.bus.is_ack_high().map_err(Error::Bus)? {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Polls the ack line once per microsecond for up to `budget_us`.
    /// With `resend = Some((byte, interval))` the byte is sent again every `interval` µs
    /// while the line stays low.
    pub fn await_ready(
        &mut self,
        budget_us: u32,
        resend: Option<(u8, u16)>,
    ) -> Result<(), Error<B::Error>> {
        let mut remaining = budget_us;
        let mut since_resend: u16 = 0;
        let ready = loop {
            match self.poll_ready() {
                Ok(()) => break true,
                Err(nb::Error::Other(err)) => return Err(err),
                Err(nb::Error::WouldBlock) => {}
            }
            if remaining == 0 {
                break false;
            }
            self.delay.delay_us(1);
            remaining -= 1;

            if let Some((byte, interval)) = resend {
                since_resend += 1;
                if interval != 0 && since_resend >= interval {
                    trace!("resend {:#04x}", byte);
                    self.exchange_byte(byte)?;
                    since_resend = 0;
                }
            }
        };
        self.delay.delay_us(SETTLE_US);

        if ready {
            Ok(())
        } else {
            debug!("ack timeout after {} us", budget_us);
            Err(Error::Timeout)
        }
    }

    /// Follows the base controller through its buffer swap: ack high, low, then high again.
    /// A missed edge is logged and otherwise ignored.
    pub fn data_sync(&mut self, edge_budget_us: u32) -> Result<(), Error<B::Error>> {
        for level in [true, false, true] {
            if !self.wait_level(level, edge_budget_us)? {
                warn!("base sync timeout");
            }
            self.delay.delay_us(1);
        }
        Ok(())
    }

    fn wait_level(&mut self, level: bool, budget_us: u32) -> Result<bool, Error<B::Error>> {
        let mut remaining = budget_us;
        while self.bus.is_ack_high().map_err(Error::Bus)? != level {
            if remaining == 0 {
                return Ok(false);
            }
            self.delay.delay_us(1);
            remaining -= 1;
        }
        Ok(true)
    }

    /// Sends `header` once the base controller is out of its scan and waits for it to be
    /// taken, re-sending it periodically.
    pub fn send_header(&mut self, header: Header, config: &Config) -> Result<(), Error<B::Error>> {
        if !self.wait_level(true, config.header_timeout_us)? {
            warn!("base controller never left its scan before {:?}", header);
            return Err(Error::Timeout);
        }
        let byte: u8 = header.into();
        self.exchange_byte(byte)?;
        self.await_ready(
            config.header_timeout_us,
            Some((byte, config.header_resend_interval_us)),
        )
    }

    /// Sends `request`, waits for the reply, clocks it into `reply` and syncs.
    pub fn request(
        &mut self,
        request: &mut [u8],
        reply: &mut [u8],
        config: &Config,
    ) -> Result<(), Error<B::Error>> {
        self.transfer(request)?;
        self.await_ready(config.data_timeout_us, None)?;
        self.transfer(reply)?;
        self.data_sync(config.sync_timeout_us)
    }

    /// Sends a frame that has no reply and syncs.
    pub fn command(&mut self, frame: &mut [u8], config: &Config) -> Result<(), Error<B::Error>> {
        self.transfer(frame)?;
        self.data_sync(config.sync_timeout_us)
    }
}
