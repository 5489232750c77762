use crate::config::Config;
use crate::error::{Error, Feature, ValidationError};
use crate::frame::{Header, DUMMY};
use crate::hal::BaseBus;
use crate::handshake::Link;
use crate::module::{ModuleDescriptor, ModuleRegistry};
use crate::sign_on::SignOnState;
use crate::slot::{SlotBinding, SlotTable, MAX_SLOTS};
use embedded_hal::delay::DelayNs;
use log::*;

/// Pause after a read that the base controller never answered.
const SLOW_READ_MS: u32 = 100;

/// Host side of one base controller and the modules plugged into it.
///
/// All operations block until the base controller answered or a timeout elapsed. The bindings
/// are rebuilt by [`BaseController::init`].
#[derive(Debug)]
pub struct BaseController<B, D, R> {
    pub(crate) link: Link<B, D>,
    pub(crate) registry: R,
    pub(crate) config: Config,
    pub(crate) slots: SlotTable,
    pub(crate) state: SignOnState,
    pub(crate) unconfigured: u16,
}

impl<B, D, R> BaseController<B, D, R>
where
    B: BaseBus,
    D: DelayNs,
    R: ModuleRegistry,
{
    pub fn new(bus: B, delay: D, registry: R, config: Config) -> Self {
        Self {
            link: Link::new(bus, delay),
            registry,
            config,
            slots: SlotTable::default(),
            state: SignOnState::default(),
            unconfigured: 0,
        }
    }

    pub fn release(self) -> (B, D) {
        self.link.release()
    }

    pub fn bus(&self) -> &B {
        self.link.bus()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn sign_on_state(&self) -> SignOnState {
        self.state
    }

    /// Slots the base controller reported at the last sign-on.
    pub fn module_count(&self) -> u8 {
        self.slots.len() as u8
    }

    /// Slots whose default configuration was never taken during sign-on. Bit 0 is slot 1.
    pub fn unconfigured(&self) -> u16 {
        self.unconfigured
    }

    pub fn enable_base_controller(&mut self, enabled: bool) -> Result<(), Error<B::Error>> {
        self.link.set_enable(enabled)
    }

    /// Compares the bound module names with `expected`, slot 1 first. Every mismatching slot is
    /// disabled and flagged in the returned mask (bit 0 is slot 1).
    pub fn roll_call(&mut self, expected: &[&str]) -> u16 {
        let mut mismatch = 0u16;
        for (i, name) in expected.iter().enumerate().take(MAX_SLOTS) {
            let slot = i as u8 + 1;
            let found = self.slot_props(slot).name;
            if found != *name {
                warn!("slot {}: module mismatch, expected {} found {}", slot, name, found);
                mismatch |= 1 << i;
                self.slots.disable(slot);
            }
        }
        if mismatch == 0 {
            info!("all modules good");
        }
        mismatch
    }

    /// Descriptor bound to `slot`, [`ModuleDescriptor::EMPTY`] if there is none.
    pub fn slot_props(&self, slot: u8) -> ModuleDescriptor {
        match self.slots.get(slot) {
            Some(binding) => *binding.descriptor(),
            None => {
                if slot == 0 || slot as usize > MAX_SLOTS {
                    warn!("slots must be between 1 and {}", MAX_SLOTS);
                }
                ModuleDescriptor::EMPTY
            }
        }
    }

    /// Logs every bound slot. Returns the number of slots bound to a known module.
    pub fn log_modules(&self) -> u8 {
        for binding in self.slots.iter() {
            if binding.is_resolved() {
                info!("slot {}: {}", binding.slot(), binding.descriptor().name);
            } else {
                info!(
                    "slot {}: sign on error ({:#010x})",
                    binding.slot(),
                    binding.module_id()
                );
            }
        }
        self.slots.resolved_count()
    }

    pub fn is_base_active(&mut self) -> Result<bool, Error<B::Error>> {
        let mut request: [u8; 1] = [Header::Active.into()];
        let mut reply = [DUMMY];
        self.query(&mut request, &mut reply)?;
        Ok(reply[0] != 0)
    }

    /// First slot among the `expected` ones that dropped out since sign-on, `None` if all
    /// are still there. Without `expected` the slots bound from slot 1 up to the first
    /// empty one are checked.
    pub fn check_connection(&mut self, expected: Option<u8>) -> Result<Option<u8>, Error<B::Error>> {
        let expected = match expected {
            Some(0) | None => self.slots.contiguous_count(),
            Some(count) => count.min(MAX_SLOTS as u8),
        };
        let mut request: [u8; 1] = [Header::Dropout.into()];
        let mut reply = [DUMMY; 2];
        self.query(&mut request, &mut reply)?;
        let active = u16::from_le_bytes(reply);

        let dropped = (0..expected).find(|&i| active & (1 << i) == 0).map(|i| i + 1);
        if let Some(slot) = dropped {
            warn!("slot {} dropped out", slot);
        }
        Ok(dropped)
    }

    /// Binding of `slot` if it is bound to a known module that provides `feature`.
    pub(crate) fn binding_for(
        &self,
        slot: u8,
        feature: Feature,
    ) -> Result<SlotBinding, ValidationError> {
        let result = match self.slots.get(slot) {
            None => Err(ValidationError::SlotOutOfRange(slot)),
            Some(binding) if !binding.is_resolved() => Err(ValidationError::EmptySlot(slot)),
            Some(binding) if !binding.capabilities().supports(feature) => {
                Err(ValidationError::Unsupported { slot, feature })
            }
            Some(binding) => Ok(*binding),
        };
        if let Err(err) = &result {
            warn!("rejected: {:?}", err);
        }
        result
    }

    /// Like [`Link::request`], still following the buffer swap when the reply never came.
    fn query(&mut self, request: &mut [u8], reply: &mut [u8]) -> Result<(), Error<B::Error>> {
        match self.link.request(request, reply, &self.config) {
            Err(Error::Timeout) => {
                self.link.data_sync(self.config.sync_timeout_us)?;
                Err(Error::Timeout)
            }
            result => result,
        }
    }

    /// Like [`Link::request`], pausing after an unanswered request.
    pub(crate) fn read(&mut self, request: &mut [u8], reply: &mut [u8]) -> Result<(), Error<B::Error>> {
        match self.link.request(request, reply, &self.config) {
            Err(Error::Timeout) => {
                warn!("slow read");
                self.link.delay_ms(SLOW_READ_MS);
                Err(Error::Timeout)
            }
            result => result,
        }
    }
}

pub(crate) fn reject<E>(err: ValidationError) -> Error<E> {
    warn!("rejected: {:?}", err);
    Error::Validation(err)
}
