use crate::base::BaseController;
use crate::error::Error;
use crate::frame::{self, Header, DUMMY};
use crate::hal::BaseBus;
use crate::module::ModuleRegistry;
use embedded_hal::delay::DelayNs;
use log::*;

/// Remote watchdog of the base controller. When it expires the base controller toggles the
/// host's reset line, or holds it if `toggle` is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    pub timeout_ms: u16,
    pub toggle: bool,
}

impl WatchdogConfig {
    /// Length of the reset pulse.
    pub const RETRY_INTERVAL_MS: u16 = 100;

    pub fn new(timeout_ms: u16, toggle: bool) -> Self {
        Self { timeout_ms, toggle }
    }
}

impl Default for WatchdogConfig {
    /// What the base controller runs with until configured.
    fn default() -> Self {
        Self {
            timeout_ms: u16::MAX,
            toggle: false,
        }
    }
}

impl<B, D, R> BaseController<B, D, R>
where
    B: BaseBus,
    D: DelayNs,
    R: ModuleRegistry,
{
    pub fn configure_watchdog(&mut self, config: WatchdogConfig) -> Result<(), Error<B::Error>> {
        let mut frame = frame::configure_watchdog(
            config.timeout_ms,
            WatchdogConfig::RETRY_INTERVAL_MS,
            config.toggle,
        );
        self.link.command(&mut frame, &self.config)
    }

    pub fn start_watchdog(&mut self) -> Result<(), Error<B::Error>> {
        self.watchdog_command(Header::StartWatchdog)
    }

    pub fn stop_watchdog(&mut self) -> Result<(), Error<B::Error>> {
        self.watchdog_command(Header::StopWatchdog)
    }

    /// Resets the watchdog timer. Any other transaction does the same.
    pub fn pet_watchdog(&mut self) -> Result<(), Error<B::Error>> {
        self.watchdog_command(Header::PetWatchdog)
    }

    /// An unanswered command is only logged, the watchdog keeps running on its own.
    fn watchdog_command(&mut self, header: Header) -> Result<(), Error<B::Error>> {
        self.link.exchange_byte(header.into())?;
        match self.link.await_ready(self.config.data_timeout_us, None) {
            Ok(()) => {
                self.link.exchange_byte(DUMMY)?;
                self.link.data_sync(self.config.sync_timeout_us)
            }
            Err(Error::Timeout) => {
                warn!("watchdog {:?} not acknowledged", header);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
