use crate::frame::FirmwareStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum Error<E> {
    /// The underlying bus reported a failure.
    Bus(E),
    /// The acknowledgment line never asserted within the budget.
    Timeout,
    Validation(ValidationError),
    SignOn(SignOnError),
    Firmware(FirmwareError),
}

impl<E> From<ValidationError> for Error<E> {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl<E> From<SignOnError> for Error<E> {
    fn from(err: SignOnError) -> Self {
        Self::SignOn(err)
    }
}

impl<E> From<FirmwareError> for Error<E> {
    fn from(err: FirmwareError) -> Self {
        Self::Firmware(err)
    }
}

/// Data kinds a module may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    DiscreteIn,
    DiscreteOut,
    AnalogIn,
    AnalogOut,
    Status,
    Config,
    Pwm,
    Counter,
}

/// Rejected before any bus activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    SlotOutOfRange(u8),
    /// Nothing is bound to the slot, or the binding was disabled.
    EmptySlot(u8),
    Unsupported { slot: u8, feature: Feature },
    ChannelOutOfRange { slot: u8, channel: u8 },
    StatusByteOutOfRange { slot: u8, byte: u8 },
    /// The caller's buffer or configuration blob is shorter than the module declares.
    BufferTooSmall { required: usize, actual: usize },
    BlockOffsetOutOfRange(u16),
    /// The module declares a configuration longer than a frame can carry.
    ConfigTooLarge { slot: u8, length: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOnError {
    /// The base controller never raised the ack line after being enabled.
    NoActivity,
    /// The reported slot count stayed at 0 (or above 15) for every attempt.
    ZeroModules,
    /// More modules than the host is configured to handle.
    TooManyModules(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareError {
    /// The base controller did not echo the update header.
    NotAcknowledged(u8),
    ImageTooLarge(usize),
    Integrity(FirmwareStatus),
}
