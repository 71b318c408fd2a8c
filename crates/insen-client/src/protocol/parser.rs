//! Response parsing
//!
//! Decodes the four `|`-delimited reply grammars into typed records.
//!
//! Parsing is lenient: a field whose token is missing stays at its zero
//! default, and a token that is present but malformed is logged and also
//! left at zero. Only a wrong tag token (or the explicit `DISCONNECTED`
//! marker) fails a parse.

use std::str::FromStr;

use tracing::warn;

use super::InsenError;
use crate::controller::{
    Buttons, ControllerInfo, ControllerState, Dpad, FirmwareInfo, Stick, SystemStatus,
    MAX_CONTROLLERS,
};

/// Tag token of a `GET` reply
pub const INPUT_TAG: &str = "INPUT";
/// Tag token of a `LIST` reply
pub const CONTROLLERS_TAG: &str = "CONTROLLERS";
/// Marker in place of the left stick when the slot is empty
pub const DISCONNECTED_MARKER: &str = "DISCONNECTED";

const FW_VERSION_PREFIX: &str = "INSEN_FW_V";
const BUILD_PREFIX: &str = "BUILD_";
const MAKCU_FLAG: &str = "MAKCU_COMPATIBLE";
const STATUS_OK_FLAG: &str = "STATUS_OK";

const ACTIVE_PREFIX: &str = "ACTIVE_";
const TOTAL_INPUTS_PREFIX: &str = "TOTAL_INPUTS_";
const API_COMMANDS_PREFIX: &str = "API_COMMANDS_";
const FREE_HEAP_PREFIX: &str = "FREE_HEAP_";

/// Split a reply into its tokens. A trailing `|` does not produce a token.
fn tokenize(response: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = response.split('|').collect();
    if tokens.len() > 1 && tokens.last() == Some(&"") {
        tokens.pop();
    }
    tokens
}

/// Parse a numeric token, falling back to the default when malformed
fn number<T>(field: &str, token: &str) -> T
where
    T: FromStr + Default,
{
    let token = token.trim();
    if token.is_empty() {
        return T::default();
    }
    match token.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(field, token, "malformed numeric field, using 0");
            T::default()
        }
    }
}

/// Parse an `A,B` token
fn pair<T>(field: &str, token: &str) -> (T, T)
where
    T: FromStr + Default,
{
    match token.split_once(',') {
        Some((a, b)) => (number(field, a), number(field, b)),
        None => {
            if !token.trim().is_empty() {
                warn!(field, token, "expected comma-separated pair");
            }
            (number(field, token), T::default())
        }
    }
}

/// Parse a hexadecimal button mask with optional `0x` prefix
fn hex_u16(field: &str, token: &str) -> u16 {
    let token = token.trim();
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() {
        return 0;
    }
    u16::from_str_radix(digits, 16).unwrap_or_else(|_| {
        warn!(field, token, "malformed hex field, using 0");
        0
    })
}

/// Parse an `INFO` reply. Tokens may appear in any order; unknown tokens
/// are ignored, so this never fails.
pub fn parse_firmware_info(response: &str) -> FirmwareInfo {
    let mut info = FirmwareInfo::default();

    for token in tokenize(response) {
        if let Some(version) = token.strip_prefix(FW_VERSION_PREFIX) {
            info.version = version.to_string();
        } else if let Some(date) = token.strip_prefix(BUILD_PREFIX) {
            info.build_date = date.replace('_', " ");
        } else if token == MAKCU_FLAG {
            info.makcu_compatible = true;
        } else if token == STATUS_OK_FLAG {
            info.status_ok = true;
        }
    }

    info
}

/// Parse a `STATUS` reply
pub fn parse_status(response: &str) -> SystemStatus {
    let mut status = SystemStatus::default();

    for token in tokenize(response) {
        if let Some(n) = token.strip_prefix(ACTIVE_PREFIX) {
            status.active_controllers = number("active_controllers", n);
        } else if let Some(n) = token.strip_prefix(TOTAL_INPUTS_PREFIX) {
            status.total_inputs = number("total_inputs", n);
        } else if let Some(n) = token.strip_prefix(API_COMMANDS_PREFIX) {
            status.api_commands = number("api_commands", n);
        } else if let Some(n) = token.strip_prefix(FREE_HEAP_PREFIX) {
            status.free_heap = number("free_heap", n);
        }
    }

    status
}

/// Parse a `LIST` reply: `CONTROLLERS|<id>_<type>|...`
///
/// At most [`MAX_CONTROLLERS`] entries are returned; extras are dropped.
pub fn parse_controller_list(response: &str) -> Result<Vec<ControllerInfo>, InsenError> {
    let tokens = tokenize(response);
    if tokens.first() != Some(&CONTROLLERS_TAG) {
        return Err(InsenError::InvalidResponse(format!(
            "expected {} reply, got {:?}",
            CONTROLLERS_TAG, response
        )));
    }

    let controllers = tokens[1..]
        .iter()
        .filter_map(|token| match token.split_once('_') {
            Some((id, controller_type)) => Some(ControllerInfo {
                id: number("controller_id", id),
                controller_type: controller_type.to_string(),
                connected: true,
            }),
            None => {
                warn!(token, "skipping controller entry without type");
                None
            }
        })
        .take(MAX_CONTROLLERS as usize)
        .collect();

    Ok(controllers)
}

/// Parse a `GET <id>` reply:
/// `INPUT|<id>|<lx>,<ly>|<rx>,<ry>|<lt>,<rt>|0x<buttons>|<dpad>|<battery>|<timestamp>`
///
/// Returns [`InsenError::ControllerDisconnected`] for `INPUT|<id>|DISCONNECTED`.
pub fn parse_controller_input(response: &str) -> Result<ControllerState, InsenError> {
    let tokens = tokenize(response);
    if tokens.len() < 2 || tokens[0] != INPUT_TAG {
        return Err(InsenError::InvalidResponse(format!(
            "expected {} reply, got {:?}",
            INPUT_TAG, response
        )));
    }

    let id: u8 = number("controller_id", tokens[1]);

    if tokens.get(2) == Some(&DISCONNECTED_MARKER) {
        return Err(InsenError::ControllerDisconnected(id));
    }

    let mut state = ControllerState::new(id);

    if let Some(token) = tokens.get(2) {
        let (x, y) = pair("left_stick", token);
        state.left_stick = Stick::new(x, y);
    }
    if let Some(token) = tokens.get(3) {
        let (x, y) = pair("right_stick", token);
        state.right_stick = Stick::new(x, y);
    }
    if let Some(token) = tokens.get(4) {
        (state.left_trigger, state.right_trigger) = pair("triggers", token);
    }
    if let Some(token) = tokens.get(5) {
        state.buttons = Buttons(hex_u16("buttons", token));
    }
    if let Some(token) = tokens.get(6) {
        state.dpad = Dpad::from_raw(number("dpad", token));
    }
    if let Some(token) = tokens.get(7) {
        state.battery = number("battery", token);
    }
    if let Some(token) = tokens.get(8) {
        state.timestamp = number("timestamp", token);
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL_INPUT: &str = "INPUT|0|-1000,2000|500,-500|10,20|0x0041|3|75|123456";

    #[test]
    fn test_parse_full_input() {
        let state = parse_controller_input(FULL_INPUT).unwrap();
        assert_eq!(state.id, 0);
        assert_eq!(state.left_stick, Stick::new(-1000, 2000));
        assert_eq!(state.right_stick, Stick::new(500, -500));
        assert_eq!((state.left_trigger, state.right_trigger), (10, 20));
        assert!(state.buttons.contains(Buttons::A));
        assert!(state.buttons.contains(Buttons::SELECT));
        assert_eq!(state.buttons.raw(), 0x41);
        assert_eq!(state.dpad, Dpad::Right);
        assert_eq!(state.battery, 75);
        assert_eq!(state.timestamp, 123456);
    }

    #[test]
    fn test_parse_disconnected() {
        match parse_controller_input("INPUT|1|DISCONNECTED") {
            Err(InsenError::ControllerDisconnected(id)) => assert_eq!(id, 1),
            other => panic!("expected ControllerDisconnected, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_input_bad_tag() {
        assert!(matches!(
            parse_controller_input("OUTPUT|0|1,2"),
            Err(InsenError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_controller_input("INPUT"),
            Err(InsenError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_controller_input(""),
            Err(InsenError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_truncated_inputs() {
        let tokens: Vec<&str> = FULL_INPUT.split('|').collect();
        let full = parse_controller_input(FULL_INPUT).unwrap();

        for count in 2..=9 {
            let reply = tokens[..count].join("|");
            let state = parse_controller_input(&reply).unwrap();

            let mut expected = ControllerState::new(0);
            if count > 2 {
                expected.left_stick = full.left_stick;
            }
            if count > 3 {
                expected.right_stick = full.right_stick;
            }
            if count > 4 {
                expected.left_trigger = full.left_trigger;
                expected.right_trigger = full.right_trigger;
            }
            if count > 5 {
                expected.buttons = full.buttons;
            }
            if count > 6 {
                expected.dpad = full.dpad;
            }
            if count > 7 {
                expected.battery = full.battery;
            }
            if count > 8 {
                expected.timestamp = full.timestamp;
            }
            assert_eq!(state, expected, "token count {}", count);
        }
    }

    #[test]
    fn test_parse_malformed_fields_default_to_zero() {
        let state =
            parse_controller_input("INPUT|2|abc,2000|500|300,20|0xZZ|x|75|-1").unwrap();
        assert_eq!(state.id, 2);
        assert_eq!(state.left_stick, Stick::new(0, 2000));
        assert_eq!(state.right_stick, Stick::new(500, 0));
        assert_eq!((state.left_trigger, state.right_trigger), (0, 20));
        assert_eq!(state.buttons, Buttons::NONE);
        assert_eq!(state.dpad, Dpad::Neutral);
        assert_eq!(state.battery, 75);
        assert_eq!(state.timestamp, 0);
    }

    #[test]
    fn test_parse_buttons_without_prefix() {
        let state = parse_controller_input("INPUT|0|0,0|0,0|0,0|1FFF").unwrap();
        assert_eq!(state.buttons.raw(), 0x1FFF);
        let state = parse_controller_input("INPUT|0|0,0|0,0|0,0|0X0080").unwrap();
        assert!(state.buttons.contains(Buttons::START));
    }

    #[test]
    fn test_parse_unknown_dpad() {
        let reply = "INPUT|0|0,0|0,0|0,0|0x0000|12|0|0";
        let state = parse_controller_input(reply).unwrap();
        assert_eq!(state.dpad, Dpad::Unknown(12));
        assert_eq!(state.to_wire(), reply);
    }

    #[test]
    fn test_wire_round_trip() {
        let state = parse_controller_input(FULL_INPUT).unwrap();
        assert_eq!(state.to_wire(), FULL_INPUT);
        assert_eq!(parse_controller_input(&state.to_wire()).unwrap(), state);
    }

    #[test]
    fn test_parse_firmware_info() {
        let info =
            parse_firmware_info("INSEN_FW_V1.2.3|BUILD_2024_01_15|MAKCU_COMPATIBLE|STATUS_OK");
        assert_eq!(
            info,
            FirmwareInfo {
                version: "1.2.3".to_string(),
                build_date: "2024 01 15".to_string(),
                makcu_compatible: true,
                status_ok: true,
            }
        );
    }

    #[test]
    fn test_parse_firmware_info_any_order() {
        let info = parse_firmware_info("STATUS_OK|CONTROLLERS_2|INSEN_FW_V2.0|BUILD_Jan_15_2024");
        assert_eq!(info.version, "2.0");
        assert_eq!(info.build_date, "Jan 15 2024");
        assert!(info.status_ok);
        assert!(!info.makcu_compatible);
    }

    #[test]
    fn test_parse_firmware_info_empty() {
        assert_eq!(parse_firmware_info(""), FirmwareInfo::default());
        assert_eq!(parse_firmware_info("GARBAGE"), FirmwareInfo::default());
    }

    #[test]
    fn test_parse_status() {
        let status = parse_status("ACTIVE_2|TOTAL_INPUTS_15234|API_COMMANDS_87|FREE_HEAP_204800");
        assert_eq!(
            status,
            SystemStatus {
                active_controllers: 2,
                total_inputs: 15234,
                api_commands: 87,
                free_heap: 204800,
            }
        );
    }

    #[test]
    fn test_parse_status_non_numeric() {
        let status = parse_status("ACTIVE_two|FREE_HEAP_1024");
        assert_eq!(status.active_controllers, 0);
        assert_eq!(status.free_heap, 1024);
        assert_eq!(status.total_inputs, 0);
    }

    #[test]
    fn test_parse_controller_list() {
        let list = parse_controller_list("CONTROLLERS|0_XBOX_ONE|2_PS4").unwrap();
        assert_eq!(
            list,
            vec![
                ControllerInfo {
                    id: 0,
                    controller_type: "XBOX_ONE".to_string(),
                    connected: true,
                },
                ControllerInfo {
                    id: 2,
                    controller_type: "PS4".to_string(),
                    connected: true,
                },
            ]
        );
    }

    #[test]
    fn test_parse_controller_list_empty() {
        assert!(parse_controller_list("CONTROLLERS").unwrap().is_empty());
        assert!(parse_controller_list("CONTROLLERS|").unwrap().is_empty());
    }

    #[test]
    fn test_parse_controller_list_caps_entries() {
        let list =
            parse_controller_list("CONTROLLERS|0_A|1_B|2_C|3_D|4_E|5_F").unwrap();
        assert_eq!(list.len(), MAX_CONTROLLERS as usize);
        assert_eq!(list[3].controller_type, "D");
    }

    #[test]
    fn test_parse_controller_list_skips_untyped_entries() {
        let list = parse_controller_list("CONTROLLERS|garbage|0_A|1_B|2_C|3_D").unwrap();
        let ids: Vec<u8> = list.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(list[0].controller_type, "A");

        let list = parse_controller_list("CONTROLLERS||1_PS4").unwrap();
        assert_eq!(
            list,
            vec![ControllerInfo {
                id: 1,
                controller_type: "PS4".to_string(),
                connected: true,
            }]
        );
    }

    #[test]
    fn test_parse_controller_list_bad_tag() {
        assert!(matches!(
            parse_controller_list("INPUT|0|DISCONNECTED"),
            Err(InsenError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_controller_list("CONTROLLERS_2|0_PS4"),
            Err(InsenError::InvalidResponse(_))
        ));
    }
}
