//! Built-in catalog of the P1000 module family.

use crate::module::{ModuleDescriptor, StaticRegistry};

// [di, do, ai, ao, status, config, data size]
static MODULES: [ModuleDescriptor; 37] = [
    ModuleDescriptor::new(0x04A0_0042, [1, 0, 0, 0, 0, 0, 1], "P1-08ND-TTL"),
    ModuleDescriptor::new(0x04A0_0081, [1, 0, 0, 0, 0, 0, 1], "P1-08ND3"),
    ModuleDescriptor::new(0x04A0_0085, [1, 0, 0, 0, 0, 0, 1], "P1-08NA"),
    ModuleDescriptor::new(0x04A0_0087, [1, 0, 0, 0, 0, 0, 1], "P1-08SIM"),
    ModuleDescriptor::new(0x04A0_0088, [1, 0, 0, 0, 0, 0, 1], "P1-08NE3"),
    ModuleDescriptor::new(0x0520_0082, [2, 0, 0, 0, 0, 0, 1], "P1-16ND3"),
    ModuleDescriptor::new(0x0520_0089, [2, 0, 0, 0, 0, 0, 1], "P1-16NE3"),
    ModuleDescriptor::new(0x1403_0050, [0, 1, 0, 0, 0, 0, 1], "P1-04TRS"),
    ModuleDescriptor::new(0x1403_F481, [0, 0, 0, 32, 4, 4, 0xA0], "P1-04PWM"),
    ModuleDescriptor::new(0x1404_008D, [0, 1, 0, 0, 0, 0, 1], "P1-08TA"),
    ModuleDescriptor::new(0x1404_008F, [0, 1, 0, 0, 0, 0, 1], "P1-08TRS"),
    ModuleDescriptor::new(0x1404_0091, [0, 2, 0, 0, 0, 0, 1], "P1-16TR"),
    ModuleDescriptor::new(0x1405_0046, [0, 1, 0, 0, 0, 0, 1], "P1-08TD-TTL"),
    ModuleDescriptor::new(0x1405_0081, [0, 1, 0, 0, 0, 0, 1], "P1-08TD1"),
    ModuleDescriptor::new(0x1405_0082, [0, 1, 0, 0, 0, 0, 1], "P1-08TD2"),
    ModuleDescriptor::new(0x1408_0085, [0, 2, 0, 0, 0, 0, 1], "P1-15TD1"),
    ModuleDescriptor::new(0x1408_0086, [0, 2, 0, 0, 0, 0, 1], "P1-15TD2"),
    ModuleDescriptor::new(0x24A5_0081, [1, 1, 0, 0, 0, 0, 1], "P1-16CDR"),
    ModuleDescriptor::new(0x24A5_0082, [1, 1, 0, 0, 0, 0, 1], "P1-15CDD1"),
    ModuleDescriptor::new(0x24A5_0083, [1, 1, 0, 0, 0, 0, 1], "P1-15CDD2"),
    ModuleDescriptor::new(0x3460_5581, [0, 0, 16, 0, 12, 18, 16], "P1-04AD"),
    ModuleDescriptor::new(0x3460_5582, [0, 0, 16, 0, 12, 2, 16], "P1-04AD-1"),
    ModuleDescriptor::new(0x3460_5583, [0, 0, 16, 0, 12, 2, 16], "P1-04AD-2"),
    ModuleDescriptor::new(0x3460_5588, [0, 0, 16, 0, 12, 8, 16], "P1-04RTD"),
    ModuleDescriptor::new(0x3460_558F, [0, 0, 16, 0, 12, 2, 12], "P1-04ADL-1"),
    ModuleDescriptor::new(0x3460_5590, [0, 0, 16, 0, 12, 2, 12], "P1-04ADL-2"),
    ModuleDescriptor::new(0x3460_8C81, [0, 0, 16, 0, 12, 20, 32], "P1-04THM"),
    ModuleDescriptor::new(0x3460_8C8E, [0, 0, 16, 0, 12, 8, 32], "P1-04NTC"),
    ModuleDescriptor::new(0x34A0_558A, [0, 0, 32, 0, 12, 2, 12], "P1-08ADL-1"),
    ModuleDescriptor::new(0x34A0_558B, [0, 0, 32, 0, 12, 2, 12], "P1-08ADL-2"),
    ModuleDescriptor::new(0x34A5_A481, [2, 0, 36, 36, 4, 12, 0xC0], "P1-02HSC"),
    ModuleDescriptor::new(0x4403_5583, [0, 0, 0, 16, 4, 0, 12], "P1-04DAL-1"),
    ModuleDescriptor::new(0x4403_5584, [0, 0, 0, 16, 4, 0, 12], "P1-04DAL-2"),
    ModuleDescriptor::new(0x4405_5588, [0, 0, 0, 32, 4, 0, 12], "P1-08DAL-1"),
    ModuleDescriptor::new(0x4405_5589, [0, 0, 0, 32, 4, 0, 12], "P1-08DAL-2"),
    ModuleDescriptor::new(0x5461_A783, [0, 0, 16, 8, 12, 2, 12], "P1-4ADL2DAL-1"),
    ModuleDescriptor::new(0x5461_A784, [0, 0, 16, 8, 12, 2, 12], "P1-4ADL2DAL-2"),
];

/// Two-byte blob most analog modules start from: enable channels 1 to 4.
const FOUR_CHANNELS: &[u8] = &[0x40, 0x03];
const EIGHT_CHANNELS: &[u8] = &[0x40, 0x07];

const P1_04AD: &[u8] = &[
    0x40, 0x03, 0x00, 0x00, 0x20, 0x03, 0x00, 0x00, 0x21, 0x03, 0x00, 0x00, 0x22, 0x03, 0x00,
    0x00, 0x23, 0x03,
];
const P1_04RTD: &[u8] = &[0x40, 0x03, 0x60, 0x05, 0x20, 0x01, 0x80, 0x00];
const P1_04THM: &[u8] = &[
    0x40, 0x03, 0x60, 0x05, 0x21, 0x00, 0x22, 0x00, 0x23, 0x00, 0x24, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];
const P1_04NTC: &[u8] = &[0x40, 0x03, 0x60, 0x05, 0x20, 0x00, 0x80, 0x02];
const P1_04PWM: &[u8] = &[0x02, 0x02, 0x02, 0x02];
const P1_02HSC: &[u8] = &[
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
];

static CONFIGS: [(u32, &[u8]); 14] = [
    (0x3460_5581, P1_04AD),
    (0x3460_5582, FOUR_CHANNELS),
    (0x3460_5583, FOUR_CHANNELS),
    (0x3460_5588, P1_04RTD),
    (0x3460_558F, FOUR_CHANNELS),
    (0x3460_5590, FOUR_CHANNELS),
    (0x3460_8C81, P1_04THM),
    (0x3460_8C8E, P1_04NTC),
    (0x34A0_558A, EIGHT_CHANNELS),
    (0x34A0_558B, EIGHT_CHANNELS),
    (0x34A5_A481, P1_02HSC),
    (0x1403_F481, P1_04PWM),
    (0x5461_A783, FOUR_CHANNELS),
    (0x5461_A784, FOUR_CHANNELS),
];

/// Every module the base controller firmware knows about.
pub static CATALOG: StaticRegistry = StaticRegistry::new(&MODULES, &CONFIGS, FOUR_CHANNELS);
