#![allow(dead_code)]

use embedded_hal::delay::DelayNs;
use slotbus::{BaseBus, BaseController, Config, ModuleDescriptor, StaticRegistry};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

pub const IMAGE_SIZE: usize = 1200;

pub const ID_A: u32 = 0x0000_00A1;
pub const ID_B: u32 = 0x0000_00B1;
pub const ID_X: u32 = 0x0000_00C1;
pub const ID_PWM: u32 = 0x0000_00D1;
pub const ID_TEMP: u32 = 0x0000_00E1;
pub const ID_WIDE: u32 = 0x0000_00F1;
pub const ID_UNKNOWN: u32 = 0x0BAD_0BAD;

static MODULES: [ModuleDescriptor; 6] = [
    ModuleDescriptor::new(ID_A, [1, 1, 0, 0, 0, 0, 1], "A"),
    ModuleDescriptor::new(ID_B, [0, 0, 16, 0, 12, 2, 16], "B"),
    ModuleDescriptor::new(ID_X, [0, 0, 0, 16, 4, 0, 12], "X"),
    ModuleDescriptor::new(ID_PWM, [0, 0, 0, 32, 4, 4, 0xA0], "PWM"),
    ModuleDescriptor::new(ID_TEMP, [0, 0, 16, 0, 12, 8, 32], "TEMP"),
    ModuleDescriptor::new(ID_WIDE, [8, 0, 0, 0, 0, 65, 1], "WIDE"),
];
static CONFIGS: [(u32, &[u8]); 2] = [(ID_PWM, &[2, 2, 2, 2]), (ID_TEMP, &[1, 2, 3, 4, 5, 6, 7, 8])];

/// Synthetic modules: "A" discrete in/out, "B" analog in, "X" analog out, "PWM", "TEMP", and
/// "WIDE" with 64 discrete inputs and an oversized configuration.
pub static REGISTRY: StaticRegistry = StaticRegistry::new(&MODULES, &CONFIGS, &[0x40, 0x03]);

#[derive(Debug, Clone, PartialEq)]
pub struct SimError;

#[derive(Debug)]
enum Expect {
    Reply(Vec<u8>),
    ModuleIds,
    Geometry,
    FirmwareChunks(usize),
    FirmwareStatus(u8),
}

/// What the simulated base controller saw and holds.
#[derive(Debug)]
pub struct BaseState {
    pub module_ids: Vec<u32>,
    /// Replies to the module count request; the real count once drained.
    pub slot_counts: VecDeque<u8>,
    /// Ack line stuck low, nothing is processed.
    pub dead: bool,
    /// Route discrete outputs of a slot back to its inputs.
    pub loopback: bool,
    pub fail_config_writes: bool,
    pub enable_history: Vec<bool>,
    pub frames: Vec<Vec<u8>>,
    pub geometry: Vec<[u8; 7]>,
    pub images: [Vec<u8>; 5],
    pub configs: HashMap<u8, Vec<u8>>,
    pub active: bool,
    pub active_slots: u16,
    pub version: u32,
    pub watchdog_config: Option<(u16, u16, u8)>,
    pub watchdog_running: bool,
    pub pets: usize,
    pub firmware_echo: u8,
    pub firmware_status: u8,
    pub firmware_image: Vec<u8>,
    pub firmware_chunks: Vec<usize>,
    /// Version reported after a successful update.
    pub updated_version: u32,
    /// Stop answering once the firmware status byte went out.
    pub silent_reboot: bool,
    /// Hold the ack line low for this many polls after a module count header.
    pub mute_module_count: Option<u32>,
    /// Reads of the ack line so far.
    pub ack_reads: usize,
    silence: u32,
    ack: bool,
    expect: VecDeque<Expect>,
}

impl BaseState {
    /// Byte offset of `slot` in the region of `kind`, from the pushed geometry.
    pub fn slot_offset(&self, kind: usize, slot: u8) -> usize {
        let field = GEOMETRY_FIELD[kind];
        self.geometry
            .iter()
            .take(slot as usize - 1)
            .map(|g| g[field] as usize)
            .sum()
    }

    fn width(&self, kind: usize, slot: u8) -> usize {
        self.geometry
            .get(slot as usize - 1)
            .map(|g| g[GEOMETRY_FIELD[kind]] as usize)
            .unwrap_or(0)
    }

    fn region(&self, kind: usize, slot: u8, offset: usize, len: usize) -> Vec<u8> {
        let start = self.slot_offset(kind, slot) + offset;
        self.images[kind][start..start + len].to_vec()
    }

    fn handle_request(&mut self, frame: &[u8]) -> Result<(), SimError> {
        match frame[0] {
            0x02 if self.mute_module_count.is_some() => {
                self.silence = self.mute_module_count.unwrap_or(0);
            }
            0x02 => {
                let count = self
                    .slot_counts
                    .pop_front()
                    .unwrap_or(self.module_ids.len() as u8);
                self.expect.push_back(Expect::Reply(vec![count]));
                if (1..=15).contains(&count) {
                    self.expect.push_back(Expect::ModuleIds);
                    self.expect.push_back(Expect::Geometry);
                }
            }
            0x03 => self
                .expect
                .push_back(Expect::Reply(self.version.to_le_bytes().to_vec())),
            0x04 => self.expect.push_back(Expect::Reply(vec![self.active as u8])),
            0x05 => self
                .expect
                .push_back(Expect::Reply(self.active_slots.to_le_bytes().to_vec())),
            0x10 => {
                if self.fail_config_writes {
                    return Err(SimError);
                }
                self.configs.insert(frame[1], frame[2..].to_vec());
            }
            0x11 => {
                let config = self.configs.get(&frame[1]).cloned().unwrap_or_default();
                self.expect.push_back(Expect::Reply(config));
            }
            0x30 => {
                self.pets += 1;
                self.expect.push_back(Expect::Reply(vec![0]));
            }
            0x31 => {
                self.watchdog_running = true;
                self.expect.push_back(Expect::Reply(vec![0]));
            }
            0x32 => {
                self.watchdog_running = false;
                self.expect.push_back(Expect::Reply(vec![0]));
            }
            0x33 => {
                let timeout = u16::from_le_bytes([frame[1], frame[2]]);
                let retry = u16::from_le_bytes([frame[3], frame[4]]);
                self.watchdog_config = Some((timeout, retry, frame[5]));
            }
            0x40 => {
                let status = self.region(4, frame[1], frame[3] as usize, frame[2] as usize);
                self.expect.push_back(Expect::Reply(status));
            }
            0x50 => {
                let width = self.width(0, frame[1]);
                let data = self.region(0, frame[1], 0, width);
                self.expect.push_back(Expect::Reply(data));
            }
            0x51 => {
                let data = self.region(1, frame[1], (frame[2] as usize - 1) * 4, 4);
                self.expect.push_back(Expect::Reply(data));
            }
            0x52 => {
                let (kind, len, offset) = block_params(frame);
                let data = self.images[kind][offset..offset + len].to_vec();
                self.expect.push_back(Expect::Reply(data));
            }
            0x60 => self.write_discrete(frame[1], frame[2], &frame[3..]),
            0x61 => {
                let start = self.slot_offset(3, frame[1]) + (frame[2] as usize - 1) * 4;
                self.images[3][start..start + 4].copy_from_slice(&frame[3..7]);
            }
            0x62 => {
                let (kind, len, offset) = block_params(frame);
                self.images[kind][offset..offset + len].copy_from_slice(&frame[6..6 + len]);
            }
            0xAA => {
                let total = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
                self.firmware_image.clear();
                self.firmware_chunks.clear();
                self.expect.push_back(Expect::Reply(vec![self.firmware_echo]));
                self.expect
                    .push_back(Expect::FirmwareChunks(total as usize));
            }
            _ => {}
        }
        Ok(())
    }

    fn write_discrete(&mut self, slot: u8, channel: u8, data: &[u8]) {
        let start = self.slot_offset(2, slot);
        let width = self.width(2, slot);
        if channel == 0 {
            self.images[2][start..start + data.len()].copy_from_slice(data);
        } else {
            let bit = channel as usize - 1;
            let byte = &mut self.images[2][start + bit / 8];
            if data[0] & 1 == 1 {
                *byte |= 1 << (bit % 8);
            } else {
                *byte &= !(1 << (bit % 8));
            }
        }
        if self.loopback {
            let outputs = self.images[2][start..start + width].to_vec();
            let input = self.slot_offset(0, slot);
            let len = width.min(self.width(0, slot));
            self.images[0][input..input + len].copy_from_slice(&outputs[..len]);
        }
    }

    fn handle(&mut self, buf: &mut [u8]) -> Result<(), SimError> {
        match self.expect.pop_front() {
            Some(Expect::Reply(reply)) => {
                buf.fill(0);
                let len = reply.len().min(buf.len());
                buf[..len].copy_from_slice(&reply[..len]);
            }
            Some(Expect::ModuleIds) => {
                for (chunk, id) in buf.chunks_exact_mut(4).zip(self.module_ids.iter()) {
                    chunk.copy_from_slice(&id.to_le_bytes());
                }
            }
            Some(Expect::Geometry) => {
                self.geometry = buf
                    .chunks_exact(7)
                    .map(|c| [c[0], c[1], c[2], c[3], c[4], c[5], c[6]])
                    .collect();
            }
            Some(Expect::FirmwareChunks(remaining)) => {
                self.firmware_image.extend_from_slice(buf);
                self.firmware_chunks.push(buf.len());
                let remaining = remaining.saturating_sub(buf.len());
                if remaining == 0 {
                    self.expect
                        .push_back(Expect::FirmwareStatus(self.firmware_status));
                    if self.firmware_status == 1 {
                        self.version = self.updated_version;
                    }
                } else {
                    self.expect.push_front(Expect::FirmwareChunks(remaining));
                }
            }
            Some(Expect::FirmwareStatus(status)) => {
                buf.fill(0);
                buf[0] = status;
                if self.silent_reboot {
                    self.dead = true;
                }
            }
            None => self.handle_request(buf)?,
        }
        Ok(())
    }
}

/// Index into the geometry record of the width of each block kind.
const GEOMETRY_FIELD: [usize; 5] = [0, 2, 1, 3, 4];

fn block_params(frame: &[u8]) -> (usize, usize, usize) {
    let kind = frame[1] as usize;
    let len = u16::from_be_bytes([frame[2], frame[3]]) as usize;
    let offset = u16::from_be_bytes([frame[4], frame[5]]) as usize;
    (kind, len, offset)
}

/// Protocol-level stand-in for the base controller. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SimulatedBase(Rc<RefCell<BaseState>>);

impl SimulatedBase {
    pub fn new(module_ids: &[u32]) -> Self {
        let state = BaseState {
            module_ids: module_ids.to_vec(),
            slot_counts: VecDeque::new(),
            dead: false,
            loopback: false,
            fail_config_writes: false,
            enable_history: Vec::new(),
            frames: Vec::new(),
            geometry: Vec::new(),
            images: Default::default(),
            configs: HashMap::new(),
            active: true,
            active_slots: (1u32 << module_ids.len()).wrapping_sub(1) as u16,
            version: 0x1205,
            watchdog_config: None,
            watchdog_running: false,
            pets: 0,
            firmware_echo: 0xAA,
            firmware_status: 1,
            firmware_image: Vec::new(),
            firmware_chunks: Vec::new(),
            updated_version: 0x1306,
            silent_reboot: false,
            mute_module_count: None,
            ack_reads: 0,
            silence: 0,
            ack: false,
            expect: VecDeque::new(),
        };
        let sim = Self(Rc::new(RefCell::new(state)));
        for image in sim.state_mut().images.iter_mut() {
            image.resize(IMAGE_SIZE, 0);
        }
        sim
    }

    pub fn state(&self) -> Ref<'_, BaseState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, BaseState> {
        self.0.borrow_mut()
    }

    /// Number of transfers so far.
    pub fn transactions(&self) -> usize {
        self.state().frames.len()
    }

    pub fn frames_since(&self, start: usize) -> Vec<Vec<u8>> {
        self.state().frames[start..].to_vec()
    }
}

impl BaseBus for SimulatedBase {
    type Error = SimError;

    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), SimError> {
        let mut state = self.state_mut();
        state.frames.push(buf.to_vec());
        if state.dead {
            return Ok(());
        }
        state.handle(buf)
    }

    fn is_ack_high(&mut self) -> Result<bool, SimError> {
        let mut state = self.state_mut();
        state.ack_reads += 1;
        if state.dead {
            return Ok(false);
        }
        if state.silence > 0 {
            state.silence -= 1;
            return Ok(false);
        }
        state.ack = !state.ack;
        Ok(state.ack)
    }

    fn set_enable(&mut self, enabled: bool) -> Result<(), SimError> {
        self.state_mut().enable_history.push(enabled);
        Ok(())
    }
}

/// Counts the time the engine spent waiting.
#[derive(Debug, Default)]
pub struct Clock {
    pub elapsed_ns: u64,
}

impl DelayNs for Clock {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}

pub type Controller = BaseController<SimulatedBase, Clock, &'static StaticRegistry>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Short timeouts so dead-line tests finish quickly.
pub fn fast_config() -> Config {
    Config {
        probe_timeout_us: 1_000,
        data_timeout_us: 500,
        sync_timeout_us: 200,
        header_timeout_us: 1_000,
        firmware_ready_timeout_us: 1_000,
        ..Config::default()
    }
}

pub fn controller(sim: &SimulatedBase) -> Controller {
    init_logger();
    BaseController::new(sim.clone(), Clock::default(), &REGISTRY, fast_config())
}

/// A controller that already signed on to `module_ids`.
pub fn signed_on(module_ids: &[u32]) -> (SimulatedBase, Controller) {
    let sim = SimulatedBase::new(module_ids);
    let mut base = controller(&sim);
    base.init().expect("sign-on");
    (sim, base)
}
