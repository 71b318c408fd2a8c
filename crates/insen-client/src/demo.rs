//! Demo Mode - Simulated INSEN firmware
//!
//! An in-process device that speaks the INSEN line protocol, for trying the
//! client without hardware. Connected controllers drift their sticks slowly
//! and occasionally press a random button.

use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::controller::{Buttons, ControllerState, Dpad, Stick, MAX_CONTROLLERS};
use crate::protocol::Transport;

/// Simulated firmware version
pub const DEMO_FIRMWARE_VERSION: &str = "1.2.3";

const DEMO_HEAP_BYTES: u32 = 204_800;

/// Simulated INSEN device implementing [`Transport`]
pub struct DemoDevice {
    /// Controller type per slot; `None` means empty
    slots: [Option<String>; MAX_CONTROLLERS as usize],
    /// Bytes of the command line being received
    line: Vec<u8>,
    /// Reply bytes waiting to be read
    pending: VecDeque<u8>,
    started: Instant,
    total_inputs: u32,
    api_commands: u32,
    rng: StdRng,
}

impl Default for DemoDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoDevice {
    /// Device with an Xbox One pad in slot 0 and a PS4 pad in slot 2
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic device for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut device = Self {
            slots: Default::default(),
            line: Vec::new(),
            pending: VecDeque::new(),
            started: Instant::now(),
            total_inputs: 0,
            api_commands: 0,
            rng,
        };
        device.plug(0, "XBOX_ONE");
        device.plug(2, "PS4");
        device
    }

    /// Attach a controller of `controller_type` to `slot`
    pub fn plug(&mut self, slot: u8, controller_type: &str) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            *entry = Some(controller_type.to_string());
        }
    }

    /// Remove the controller in `slot`
    pub fn unplug(&mut self, slot: u8) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            *entry = None;
        }
    }

    fn active_controllers(&self) -> u32 {
        self.slots.iter().filter(|s| s.is_some()).count() as u32
    }

    fn respond(&mut self, command: &str) -> String {
        self.api_commands = self.api_commands.wrapping_add(1);
        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("INFO"), None) => format!(
                "INSEN_FW_V{}|BUILD_2024_01_15|CONTROLLERS_{}|MAKCU_COMPATIBLE|STATUS_OK",
                DEMO_FIRMWARE_VERSION,
                self.active_controllers()
            ),
            (Some("STATUS"), None) => format!(
                "ACTIVE_{}|TOTAL_INPUTS_{}|API_COMMANDS_{}|FREE_HEAP_{}",
                self.active_controllers(),
                self.total_inputs,
                self.api_commands,
                DEMO_HEAP_BYTES
            ),
            (Some("LIST"), None) => {
                let mut reply = String::from("CONTROLLERS");
                for (id, slot) in self.slots.iter().enumerate() {
                    if let Some(controller_type) = slot {
                        reply.push_str(&format!("|{}_{}", id, controller_type));
                    }
                }
                reply
            }
            (Some("GET"), Some(arg)) => match arg.parse::<u8>() {
                Ok(id) if id < MAX_CONTROLLERS => {
                    if self.slots[id as usize].is_some() {
                        self.total_inputs = self.total_inputs.wrapping_add(1);
                        self.sample(id).to_wire()
                    } else {
                        format!("INPUT|{}|DISCONNECTED", id)
                    }
                }
                _ => "ERROR|INVALID_ID".to_string(),
            },
            _ => "ERROR|UNKNOWN_COMMAND".to_string(),
        }
    }

    fn sample(&mut self, id: u8) -> ControllerState {
        let elapsed = self.started.elapsed();
        let t = elapsed.as_secs_f64() + f64::from(id);

        let wobble = |phase: f64, rng: &mut StdRng| -> i16 {
            let base = 8000.0 * (t * 0.7 + phase).sin();
            (base + rng.gen_range(-300.0..300.0)) as i16
        };

        let mut buttons = Buttons::NONE;
        if self.rng.gen_bool(0.05) {
            buttons = Buttons(1u16 << self.rng.gen_range(0u16..13));
        }

        ControllerState {
            id,
            left_stick: Stick::new(wobble(0.0, &mut self.rng), wobble(1.5, &mut self.rng)),
            right_stick: Stick::new(wobble(3.0, &mut self.rng), wobble(4.5, &mut self.rng)),
            left_trigger: self.rng.gen_range(0..=20),
            right_trigger: self.rng.gen_range(0..=20),
            buttons,
            dpad: Dpad::from_raw(self.rng.gen_range(0..=8)),
            battery: 100u8.saturating_sub((elapsed.as_secs() / 60).min(100) as u8),
            timestamp: elapsed.as_millis() as u32,
        }
    }
}

impl Transport for DemoDevice {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        for &byte in data {
            match byte {
                b'\n' => {
                    let command = String::from_utf8_lossy(&self.line).trim().to_string();
                    self.line.clear();
                    if !command.is_empty() {
                        let reply = self.respond(&command);
                        self.pending.extend(reply.bytes());
                        self.pending.extend(b"\r\n");
                    }
                }
                _ => self.line.push(byte),
            }
        }
        Ok(data.len())
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        if self.pending.is_empty() {
            std::thread::sleep(timeout);
            return Ok(false);
        }
        Ok(true)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.line.clear();
        self.pending.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "demo"
    }
}
