//! Controller and device records
//!
//! Plain value types produced by the response parser. None of them hold
//! references to the connection; each poll produces fresh records.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of controller slots exposed by the firmware
pub const MAX_CONTROLLERS: u8 = 4;

/// Stick deflection below which input is considered noise
pub const DEFAULT_DEADZONE: i16 = 5000;

/// Button state as reported by the firmware (16-bit mask, 13 named buttons).
///
/// ```
/// use insen_client::Buttons;
///
/// let buttons = Buttons::A | Buttons::SELECT;
/// assert!(buttons.contains(Buttons::A));
/// assert!(!buttons.contains(Buttons::B));
/// assert_eq!(buttons.names(), vec!["A", "SELECT"]);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buttons(pub u16);

impl Buttons {
    /// Face button A
    pub const A: Self = Self(1 << 0);
    /// Face button B
    pub const B: Self = Self(1 << 1);
    /// Face button X
    pub const X: Self = Self(1 << 2);
    /// Face button Y
    pub const Y: Self = Self(1 << 3);
    /// Left bumper
    pub const LB: Self = Self(1 << 4);
    /// Right bumper
    pub const RB: Self = Self(1 << 5);
    /// Select / back / share
    pub const SELECT: Self = Self(1 << 6);
    /// Start / menu / options
    pub const START: Self = Self(1 << 7);
    /// Guide or PS button
    pub const HOME: Self = Self(1 << 8);
    /// Left stick press
    pub const LSB: Self = Self(1 << 9);
    /// Right stick press
    pub const RSB: Self = Self(1 << 10);
    /// Touchpad click
    pub const TOUCHPAD: Self = Self(1 << 11);
    /// Microphone mute
    pub const MUTE: Self = Self(1 << 12);

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    const NAMED: [(Buttons, &'static str); 13] = [
        (Self::A, "A"),
        (Self::B, "B"),
        (Self::X, "X"),
        (Self::Y, "Y"),
        (Self::LB, "LB"),
        (Self::RB, "RB"),
        (Self::SELECT, "SELECT"),
        (Self::START, "START"),
        (Self::HOME, "HOME"),
        (Self::LSB, "LSB"),
        (Self::RSB, "RSB"),
        (Self::TOUCHPAD, "TOUCHPAD"),
        (Self::MUTE, "MUTE"),
    ];

    /// Check if all of the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Raw 16-bit mask as sent on the wire
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// True when no bit is set
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the pressed buttons, in bit order. Unnamed bits are skipped.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// D-pad direction, wire values 0 (neutral) through 8 clockwise from up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Dpad {
    #[default]
    Neutral,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    /// Any value the firmware sends outside 0..=8, kept as received
    Unknown(u8),
}

impl Dpad {
    /// Decode a wire value
    pub fn from_raw(value: u8) -> Self {
        match value {
            0 => Dpad::Neutral,
            1 => Dpad::Up,
            2 => Dpad::UpRight,
            3 => Dpad::Right,
            4 => Dpad::DownRight,
            5 => Dpad::Down,
            6 => Dpad::DownLeft,
            7 => Dpad::Left,
            8 => Dpad::UpLeft,
            other => Dpad::Unknown(other),
        }
    }

    /// Wire value
    pub fn raw(self) -> u8 {
        match self {
            Dpad::Neutral => 0,
            Dpad::Up => 1,
            Dpad::UpRight => 2,
            Dpad::Right => 3,
            Dpad::DownRight => 4,
            Dpad::Down => 5,
            Dpad::DownLeft => 6,
            Dpad::Left => 7,
            Dpad::UpLeft => 8,
            Dpad::Unknown(raw) => raw,
        }
    }

    /// Display label, e.g. "Up-Right"
    pub fn name(self) -> &'static str {
        match self {
            Dpad::Neutral => "Neutral",
            Dpad::Up => "Up",
            Dpad::UpRight => "Up-Right",
            Dpad::Right => "Right",
            Dpad::DownRight => "Down-Right",
            Dpad::Down => "Down",
            Dpad::DownLeft => "Down-Left",
            Dpad::Left => "Left",
            Dpad::UpLeft => "Up-Left",
            Dpad::Unknown(_) => "Unknown",
        }
    }
}

/// Analog stick position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stick {
    /// Horizontal axis, negative is left
    pub x: i16,
    /// Vertical axis as reported by the firmware
    pub y: i16,
}

impl Stick {
    /// Stick at the given position
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// True if either axis deflects beyond `deadzone`
    pub fn exceeds(&self, deadzone: i16) -> bool {
        self.x.unsigned_abs() > deadzone.unsigned_abs()
            || self.y.unsigned_abs() > deadzone.unsigned_abs()
    }
}

/// One snapshot of a controller's input, as returned by `GET <id>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Controller slot (0..MAX_CONTROLLERS)
    pub id: u8,
    /// Left analog stick
    pub left_stick: Stick,
    /// Right analog stick
    pub right_stick: Stick,
    /// Left trigger, 0-255
    pub left_trigger: u8,
    /// Right trigger, 0-255
    pub right_trigger: u8,
    /// Pressed buttons
    pub buttons: Buttons,
    /// D-pad direction
    pub dpad: Dpad,
    /// Battery level in percent
    pub battery: u8,
    /// Firmware timestamp
    pub timestamp: u32,
}

impl ControllerState {
    /// Empty state for the given slot
    pub fn new(id: u8) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Any stick beyond `deadzone`, or any button pressed
    pub fn has_significant_input(&self, deadzone: i16) -> bool {
        self.left_stick.exceeds(deadzone)
            || self.right_stick.exceeds(deadzone)
            || !self.buttons.is_empty()
    }

    /// Serialize back into the firmware's `INPUT` reply line (without terminator)
    pub fn to_wire(&self) -> String {
        format!(
            "INPUT|{}|{},{}|{},{}|{},{}|0x{:04X}|{}|{}|{}",
            self.id,
            self.left_stick.x,
            self.left_stick.y,
            self.right_stick.x,
            self.right_stick.y,
            self.left_trigger,
            self.right_trigger,
            self.buttons.raw(),
            self.dpad.raw(),
            self.battery,
            self.timestamp
        )
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Controller {}: L:({:6},{:6}) R:({:6},{:6}) T:({:3},{:3}) Buttons: [{}] D-Pad: {} Battery: {}%",
            self.id,
            self.left_stick.x,
            self.left_stick.y,
            self.right_stick.x,
            self.right_stick.y,
            self.left_trigger,
            self.right_trigger,
            self.buttons.names().join(" "),
            self.dpad.name(),
            self.battery
        )
    }
}

/// Entry from the `LIST` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInfo {
    /// Controller slot
    pub id: u8,
    /// Controller type label, e.g. "XBOX_ONE" or "PS4"
    pub controller_type: String,
    /// Always true for entries the firmware lists
    pub connected: bool,
}

/// Firmware identification from the `INFO` reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    /// Version string after `INSEN_FW_V`
    pub version: String,
    /// Build date with underscores replaced by spaces
    pub build_date: String,
    /// Firmware advertises MAKCU compatibility
    pub makcu_compatible: bool,
    /// Firmware reported `STATUS_OK`
    pub status_ok: bool,
}

impl FirmwareInfo {
    /// Interpret `build_date` as a calendar date.
    ///
    /// Firmware builds have been seen with both `2024 01 15` and
    /// `Jan 15 2024` layouts.
    pub fn build_naive_date(&self) -> Option<NaiveDate> {
        ["%Y %m %d", "%b %d %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&self.build_date, fmt).ok())
    }
}

impl fmt::Display for FirmwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "INSEN Firmware Information:")?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Build Date: {}", self.build_date)?;
        writeln!(
            f,
            "  MAKCU Compatible: {}",
            if self.makcu_compatible { "Yes" } else { "No" }
        )?;
        write!(f, "  Status: {}", if self.status_ok { "OK" } else { "Error" })
    }
}

/// Device counters from the `STATUS` reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Controllers currently plugged in
    pub active_controllers: u32,
    /// Input reports received since boot
    pub total_inputs: u32,
    /// Host commands handled since boot
    pub api_commands: u32,
    /// Free heap on the device, in bytes
    pub free_heap: u32,
}
