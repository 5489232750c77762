use crate::slot::MAX_SLOTS;

/// Timing and retry policy of the engine. All durations are microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Slots the host accepts; anything above aborts sign-on. Capped at 15.
    pub max_slots: u8,
    /// Wait for the first ack activity after enabling the base controller.
    pub probe_timeout_us: u32,
    /// Wait for a reply to a data request.
    pub data_timeout_us: u32,
    /// Budget of each edge of the post-transaction sync.
    pub sync_timeout_us: u32,
    /// Wait for a header to be acknowledged.
    pub header_timeout_us: u32,
    /// The header is re-sent at this interval while unacknowledged.
    pub header_resend_interval_us: u16,
    pub sign_on_attempts: u8,
    /// Failed slot count attempts tolerated before the enable line is power cycled.
    pub power_cycle_after: u8,
    /// Attempts to push a default configuration during sign-on.
    pub config_attempts: u8,
    /// Push registry default configurations during sign-on.
    pub auto_configure: bool,
    /// Wait for the base controller to accept each firmware chunk.
    pub firmware_ready_timeout_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_slots: MAX_SLOTS as u8,
            probe_timeout_us: 5_000_000,
            data_timeout_us: 200_000,
            sync_timeout_us: 200_000,
            header_timeout_us: 10_000_000,
            header_resend_interval_us: 2_000,
            sign_on_attempts: 5,
            power_cycle_after: 3,
            config_attempts: 10,
            auto_configure: true,
            firmware_ready_timeout_us: 30_000_000,
        }
    }
}

impl Config {
    pub(crate) fn max_slots(&self) -> u8 {
        self.max_slots.min(MAX_SLOTS as u8)
    }
}
