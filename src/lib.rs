#![cfg_attr(not(test), no_std)]
//! Host side of the base controller bus: sign-on, addressed module I/O, the remote
//! watchdog and base controller firmware updates.

mod base;
pub mod catalog;
mod config;
mod error;
mod firmware;
pub mod frame;
pub mod hal;
mod handshake;
mod io;
pub mod module;
mod pwm;
mod sign_on;
pub mod slot;
mod watchdog;

pub use base::BaseController;
pub use config::Config;
pub use error::{Error, Feature, FirmwareError, SignOnError, ValidationError};
pub use firmware::{FirmwareTransfer, FirmwareVersion, CHUNK_SIZE};
pub use frame::{BlockAddress, BlockKind, FirmwareStatus, Header, BLOCK_IMAGE_SIZE};
pub use hal::BaseBus;
pub use module::{Capabilities, DataSizeCode, ModuleDescriptor, ModuleRegistry, StaticRegistry};
pub use sign_on::SignOnState;
pub use slot::{ChannelLabel, SlotBinding, MAX_SLOTS};
pub use watchdog::WatchdogConfig;
