use crate::error::Feature;
use bitfield::*;

bitfield! {
    /// Resolution or specialty code of a module. The high nibble marks special families.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct DataSizeCode(u8);
    impl Debug;
    pub u8, family, _: 7, 4;
    pub u8, raw, _: 7, 0;
}

impl DataSizeCode {
    const PWM_FAMILY: u8 = 0xA;
    const COUNTER_FAMILY: u8 = 0xC;

    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    pub fn is_pwm(&self) -> bool {
        self.family() == Self::PWM_FAMILY
    }

    pub fn is_counter(&self) -> bool {
        self.family() == Self::COUNTER_FAMILY
    }
}

bitfield! {
    /// What a bound module can do, derived once when the slot is bound.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities(u8);
    impl Debug;
    pub discrete_in, set_discrete_in: 0;
    pub discrete_out, set_discrete_out: 1;
    pub analog_in, set_analog_in: 2;
    pub analog_out, set_analog_out: 3;
    pub status, set_status: 4;
    pub configurable, set_configurable: 5;
    pub pwm, set_pwm: 6;
    pub counter, set_counter: 7;
}

impl Capabilities {
    pub fn of(descriptor: &ModuleDescriptor) -> Self {
        let mut caps = Self(0);
        caps.set_discrete_in(descriptor.di_bytes > 0);
        caps.set_discrete_out(descriptor.do_bytes > 0);
        caps.set_analog_in(descriptor.ai_bytes > 0);
        caps.set_analog_out(descriptor.ao_bytes > 0);
        caps.set_status(descriptor.status_bytes > 0);
        caps.set_configurable(descriptor.config_bytes > 0);
        caps.set_pwm(descriptor.data_size.is_pwm());
        caps.set_counter(descriptor.data_size.is_counter());
        caps
    }

    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::DiscreteIn => self.discrete_in(),
            Feature::DiscreteOut => self.discrete_out(),
            Feature::AnalogIn => self.analog_in(),
            Feature::AnalogOut => self.analog_out(),
            Feature::Status => self.status(),
            Feature::Config => self.configurable(),
            Feature::Pwm => self.pwm(),
            Feature::Counter => self.counter(),
        }
    }
}

/// Static shape of a module: how many bytes of each data kind it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub id: u32,
    pub di_bytes: u8,
    pub do_bytes: u8,
    pub ai_bytes: u8,
    pub ao_bytes: u8,
    pub status_bytes: u8,
    pub config_bytes: u8,
    pub data_size: DataSizeCode,
    pub name: &'static str,
}

impl ModuleDescriptor {
    /// Absent or disabled slot.
    pub const EMPTY: Self = Self::new(0x0000_0000, [0; 7], "Empty");
    /// Identifier unknown to the registry.
    pub const NOT_FOUND: Self = Self::new(0xFFFF_FFFF, [0; 7], "BAD SLOT");

    /// `shape` is `[di, do, ai, ao, status, config, data size]`.
    pub const fn new(id: u32, shape: [u8; 7], name: &'static str) -> Self {
        Self {
            id,
            di_bytes: shape[0],
            do_bytes: shape[1],
            ai_bytes: shape[2],
            ao_bytes: shape[3],
            status_bytes: shape[4],
            config_bytes: shape[5],
            data_size: DataSizeCode::new(shape[6]),
            name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == Self::EMPTY.id
    }

    pub fn is_not_found(&self) -> bool {
        self.id == Self::NOT_FOUND.id
    }

    /// Bound to a real module.
    pub fn is_resolved(&self) -> bool {
        !self.is_empty() && !self.is_not_found()
    }

    /// Record pushed to the base controller during sign-on.
    pub fn geometry(&self) -> [u8; 7] {
        [
            self.di_bytes,
            self.do_bytes,
            self.ai_bytes,
            self.ao_bytes,
            self.status_bytes,
            self.config_bytes,
            self.data_size.raw(),
        ]
    }

    /// Bytes the module occupies in the region backing `feature`. Counters report through
    /// the analog inputs.
    pub fn width(&self, feature: Feature) -> u8 {
        match feature {
            Feature::DiscreteIn => self.di_bytes,
            Feature::DiscreteOut => self.do_bytes,
            Feature::AnalogIn | Feature::Counter => self.ai_bytes,
            Feature::AnalogOut | Feature::Pwm => self.ao_bytes,
            Feature::Status => self.status_bytes,
            Feature::Config => self.config_bytes,
        }
    }
}

/// Catalog of module shapes, keyed by the identifier a module reports at sign-on.
pub trait ModuleRegistry {
    /// [`ModuleDescriptor::NOT_FOUND`] if the identifier is unknown.
    fn lookup(&self, module_id: u32) -> ModuleDescriptor;

    /// Default configuration pushed at sign-on. Unmapped identifiers get a fallback blob.
    fn default_config(&self, module_id: u32) -> &[u8];
}

impl<R: ModuleRegistry + ?Sized> ModuleRegistry for &R {
    fn lookup(&self, module_id: u32) -> ModuleDescriptor {
        (**self).lookup(module_id)
    }

    fn default_config(&self, module_id: u32) -> &[u8] {
        (**self).default_config(module_id)
    }
}

/// Registry over static tables, scanned linearly.
#[derive(Debug, Clone, Copy)]
pub struct StaticRegistry {
    modules: &'static [ModuleDescriptor],
    configs: &'static [(u32, &'static [u8])],
    fallback_config: &'static [u8],
}

impl StaticRegistry {
    pub const fn new(
        modules: &'static [ModuleDescriptor],
        configs: &'static [(u32, &'static [u8])],
        fallback_config: &'static [u8],
    ) -> Self {
        Self {
            modules,
            configs,
            fallback_config,
        }
    }

    pub fn modules(&self) -> &'static [ModuleDescriptor] {
        self.modules
    }
}

impl ModuleRegistry for StaticRegistry {
    fn lookup(&self, module_id: u32) -> ModuleDescriptor {
        self.modules
            .iter()
            .find(|m| m.id == module_id && m.is_resolved())
            .copied()
            .unwrap_or(ModuleDescriptor::NOT_FOUND)
    }

    fn default_config(&self, module_id: u32) -> &[u8] {
        self.configs
            .iter()
            .find(|(id, _)| *id == module_id)
            .map(|(_, config)| *config)
            .unwrap_or(self.fallback_config)
    }
}
