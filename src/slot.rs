use crate::module::{Capabilities, ModuleDescriptor};
use heapless::Vec;

/// Physical slots a base can hold.
pub const MAX_SLOTS: usize = 15;

/// One physical slot after sign-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotBinding {
    slot: u8,
    module_id: u32,
    descriptor: ModuleDescriptor,
    capabilities: Capabilities,
}

impl SlotBinding {
    pub fn new(slot: u8, module_id: u32, descriptor: ModuleDescriptor) -> Self {
        Self {
            slot,
            module_id,
            capabilities: Capabilities::of(&descriptor),
            descriptor,
        }
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Identifier the module reported at sign-on.
    pub fn module_id(&self) -> u32 {
        self.module_id
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_resolved(&self) -> bool {
        self.descriptor.is_resolved()
    }
}

/// Bindings in slot order; index 0 is slot 1.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: Vec<SlotBinding, MAX_SLOTS>,
}

impl SlotTable {
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }

    pub(crate) fn push(&mut self, binding: SlotBinding) -> Result<(), SlotBinding> {
        self.slots.push(binding)
    }

    /// Replaces the binding of `slot` with the empty descriptor.
    pub(crate) fn disable(&mut self, slot: u8) {
        if let Some(binding) = self.get_mut(slot) {
            *binding = SlotBinding::new(slot, binding.module_id, ModuleDescriptor::EMPTY);
        }
    }

    /// Number of slots the base reported.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 1-based.
    pub fn get(&self, slot: u8) -> Option<&SlotBinding> {
        let index = (slot as usize).checked_sub(1)?;
        self.slots.get(index)
    }

    fn get_mut(&mut self, slot: u8) -> Option<&mut SlotBinding> {
        let index = (slot as usize).checked_sub(1)?;
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotBinding> {
        self.slots.iter()
    }

    pub fn resolved_count(&self) -> u8 {
        self.slots.iter().filter(|b| b.is_resolved()).count() as u8
    }

    /// Slots from slot 1 up to the first empty binding.
    pub fn contiguous_count(&self) -> u8 {
        self.slots
            .iter()
            .take_while(|b| !b.descriptor().is_empty())
            .count() as u8
    }

    /// Analog output bytes occupied by the slots before `slot`.
    pub(crate) fn analog_out_offset(&self, slot: u8) -> u16 {
        self.slots
            .iter()
            .take((slot as usize).saturating_sub(1))
            .map(|b| b.descriptor().ao_bytes as u16)
            .sum()
    }
}

/// Names a single point of a module; `channel` 0 means every channel where supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLabel {
    pub slot: u8,
    pub channel: u8,
}

impl ChannelLabel {
    pub const fn new(slot: u8, channel: u8) -> Self {
        Self { slot, channel }
    }
}

impl From<(u8, u8)> for ChannelLabel {
    fn from((slot, channel): (u8, u8)) -> Self {
        Self { slot, channel }
    }
}
