use crate::base::BaseController;
use crate::error::{Error, SignOnError};
use crate::frame::{self, Header, DUMMY, GEOMETRY_RECORD_SIZE, MAX_CONFIG_BYTES};
use crate::hal::BaseBus;
use crate::module::ModuleRegistry;
use crate::slot::{SlotBinding, MAX_SLOTS};
use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::*;

/// Steps of the discovery handshake run by [`BaseController::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOnState {
    Idle,
    ActivityProbe,
    SlotCountNegotiation,
    HarvestIdentifiers,
    ResolveDescriptors,
    PushGeometry,
    AutoConfigure,
    Ready,
    Failed,
}

impl Default for SignOnState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Carried between steps of one sign-on.
#[derive(Debug, Default)]
struct Discovery {
    slot_count: u8,
    module_ids: Vec<u32, MAX_SLOTS>,
}

impl<B, D, R> BaseController<B, D, R>
where
    B: BaseBus,
    D: DelayNs,
    R: ModuleRegistry,
{
    /// Enables the base controller and binds every slot it reports.
    ///
    /// Returns the number of slots bound to a known module. Unknown modules stay bound to
    /// [`ModuleDescriptor::NOT_FOUND`](crate::ModuleDescriptor::NOT_FOUND) and do not abort
    /// the sign-on. On failure no slot is bound.
    pub fn init(&mut self) -> Result<u8, Error<B::Error>> {
        self.slots.clear();
        self.unconfigured = 0;
        self.state = SignOnState::ActivityProbe;

        let mut discovery = Discovery::default();
        while self.state != SignOnState::Ready {
            debug!("sign-on: {:?}", self.state);
            match self.sign_on_step(&mut discovery) {
                Ok(next) => self.state = next,
                Err(err) => {
                    error!("sign-on failed in {:?}: {:?}", self.state, err);
                    self.state = SignOnState::Failed;
                    self.slots.clear();
                    return Err(err);
                }
            }
        }

        let good = self.log_modules();
        info!("{} of {} modules signed on", good, self.slots.len());
        Ok(good)
    }

    fn sign_on_step(&mut self, discovery: &mut Discovery) -> Result<SignOnState, Error<B::Error>> {
        match self.state {
            SignOnState::Idle | SignOnState::ActivityProbe => {
                self.link.set_enable(true)?;
                self.link.delay_ms(100);
                match self.link.await_ready(self.config.probe_timeout_us, None) {
                    Ok(()) => Ok(SignOnState::SlotCountNegotiation),
                    Err(Error::Timeout) => {
                        error!("no base controller activity, check the external supply");
                        Err(SignOnError::NoActivity.into())
                    }
                    Err(err) => Err(err),
                }
            }
            SignOnState::SlotCountNegotiation => {
                discovery.slot_count = self.negotiate_slot_count()?;
                if discovery.slot_count > self.config.max_slots() {
                    error!(
                        "too many modules in base, {} supported",
                        self.config.max_slots()
                    );
                    return Err(SignOnError::TooManyModules(discovery.slot_count).into());
                }
                Ok(SignOnState::HarvestIdentifiers)
            }
            SignOnState::HarvestIdentifiers => {
                self.tolerate_timeout(self.config.data_timeout_us)?;
                let len = discovery.slot_count as usize * 4;
                let mut raw = [0u8; MAX_SLOTS * 4];
                self.link.transfer(&mut raw[..len])?;
                discovery.module_ids.clear();
                discovery
                    .module_ids
                    .extend(frame::decode_module_ids(&raw[..len]));
                Ok(SignOnState::ResolveDescriptors)
            }
            SignOnState::ResolveDescriptors => {
                for (i, &id) in discovery.module_ids.iter().enumerate() {
                    let slot = i as u8 + 1;
                    let descriptor = self.registry.lookup(id);
                    if descriptor.is_resolved() {
                        debug!("slot {}: {}", slot, descriptor.name);
                    } else {
                        warn!("slot {}: module {:#010x} is not in the registry", slot, id);
                    }
                    self.slots
                        .push(SlotBinding::new(slot, id, descriptor))
                        .map_err(|_| SignOnError::TooManyModules(discovery.slot_count))?;
                }
                Ok(SignOnState::PushGeometry)
            }
            SignOnState::PushGeometry => {
                let mut geometry = [0u8; MAX_SLOTS * GEOMETRY_RECORD_SIZE];
                for (record, binding) in geometry
                    .chunks_exact_mut(GEOMETRY_RECORD_SIZE)
                    .zip(self.slots.iter())
                {
                    record.copy_from_slice(&binding.descriptor().geometry());
                }
                let len = self.slots.len() * GEOMETRY_RECORD_SIZE;

                self.tolerate_timeout(self.config.data_timeout_us)?;
                self.link.delay_ms(1);
                self.link.transfer(&mut geometry[..len])?;
                self.link.delay_ms(10);
                Ok(SignOnState::AutoConfigure)
            }
            SignOnState::AutoConfigure => {
                if self.config.auto_configure {
                    self.auto_configure()?;
                }
                self.link.delay_ms(50);
                Ok(SignOnState::Ready)
            }
            SignOnState::Ready => Ok(SignOnState::Ready),
            SignOnState::Failed => Err(SignOnError::NoActivity.into()),
        }
    }

    /// Asks for the slot count until the base controller reports between 1 and 15 slots.
    fn negotiate_slot_count(&mut self) -> Result<u8, Error<B::Error>> {
        for attempt in 0..self.config.sign_on_attempts {
            match self.link.send_header(Header::ModuleCount, &self.config) {
                Ok(()) => {
                    self.link.delay_ms(5);
                    let count = self.link.exchange_byte(DUMMY)?;
                    if (1..=MAX_SLOTS as u8).contains(&count) {
                        debug!("{} slots", count);
                        return Ok(count);
                    }
                    warn!("base reported {} slots", count);
                }
                Err(Error::Timeout) => warn!("module count request not taken"),
                Err(err) => return Err(err),
            }

            if attempt >= self.config.power_cycle_after {
                debug!("power cycling base controller");
                self.link.set_enable(false)?;
                self.link.delay_ms(10);
                self.link.set_enable(true)?;
                self.link.delay_ms(10);
            }
        }
        error!("zero modules in the base");
        Err(SignOnError::ZeroModules.into())
    }

    /// Pushes the registry default to every configurable module, a bounded number of times.
    fn auto_configure(&mut self) -> Result<(), Error<B::Error>> {
        for slot in 1..=self.slots.len() as u8 {
            let binding = match self.slots.get(slot) {
                Some(binding) if binding.is_resolved() => *binding,
                _ => continue,
            };
            if binding.descriptor().config_bytes == 0 {
                continue;
            }
            let mut config: Vec<u8, MAX_CONFIG_BYTES> = Vec::new();
            let default = self.registry.default_config(binding.module_id());
            let _ = config.extend_from_slice(&default[..default.len().min(MAX_CONFIG_BYTES)]);

            let mut configured = false;
            for _ in 0..self.config.config_attempts {
                match self.configure_module(slot, &config) {
                    Ok(()) => {
                        configured = true;
                        break;
                    }
                    Err(Error::Validation(_)) => break,
                    Err(err) => debug!("slot {}: configuration not taken: {:?}", slot, err),
                }
            }
            if !configured {
                warn!("slot {}: default configuration failed", slot);
                self.unconfigured |= 1 << (slot - 1);
            }
        }
        Ok(())
    }

    fn tolerate_timeout(&mut self, budget_us: u32) -> Result<(), Error<B::Error>> {
        match self.link.await_ready(budget_us, None) {
            Err(Error::Timeout) => {
                warn!("base controller slow during sign-on");
                Ok(())
            }
            result => result,
        }
    }
}
