use insen_client::controller::{Buttons, Dpad, Stick};
use insen_client::{
    ClientConfig, ConnectionState, ControllerInfo, FirmwareInfo, InsenClient, InsenError,
    SystemStatus, Transport,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Everything the client wrote, shared with the test after the transport
/// has been moved into the client
type WriteLog = Arc<Mutex<Vec<u8>>>;

/// Mock serial transport answering with scripted replies
struct MockSerial {
    sent: WriteLog,
    replies: VecDeque<Vec<u8>>,
    fail_on_send: bool,
}

impl MockSerial {
    fn with_replies(replies: &[&str]) -> (Self, WriteLog) {
        let sent = WriteLog::default();
        let mock = Self {
            sent: Arc::clone(&sent),
            replies: replies
                .iter()
                .map(|r| format!("{}\r\n", r).into_bytes())
                .collect(),
            fail_on_send: false,
        };
        (mock, sent)
    }
}

impl Transport for MockSerial {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        self.sent.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        if self.replies.is_empty() {
            std::thread::sleep(timeout);
            return Ok(false);
        }
        Ok(true)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reply = self.replies.pop_front().unwrap_or_default();
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }

    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn test_config() -> ClientConfig {
    ClientConfig::new("mock")
        .with_settle_delay(Duration::ZERO)
        .with_command_timeout(Duration::from_millis(50))
}

fn connected(replies: &[&str]) -> (InsenClient, WriteLog) {
    let (mock, sent) = MockSerial::with_replies(replies);
    let mut client = InsenClient::new(test_config());
    client.connect_with(Box::new(mock)).unwrap();
    (client, sent)
}

fn sent_text(log: &WriteLog) -> String {
    String::from_utf8(log.lock().unwrap().clone()).unwrap()
}

#[test]
fn test_get_controller_input() {
    let (mut client, sent) =
        connected(&["INPUT|0|-1000,2000|500,-500|10,20|0x0041|3|75|123456"]);

    let state = client.get_controller_input(0).unwrap();
    assert_eq!(sent_text(&sent), "GET 0\r\n");
    assert_eq!(state.id, 0);
    assert_eq!(state.left_stick, Stick::new(-1000, 2000));
    assert_eq!(state.right_stick, Stick::new(500, -500));
    assert_eq!((state.left_trigger, state.right_trigger), (10, 20));
    assert_eq!(state.buttons, Buttons::A | Buttons::SELECT);
    assert_eq!(state.dpad, Dpad::Right);
    assert_eq!(state.battery, 75);
    assert_eq!(state.timestamp, 123456);
}

#[test]
fn test_get_disconnected_controller() {
    let (mut client, _) = connected(&["INPUT|1|DISCONNECTED"]);
    match client.get_controller_input(1) {
        Err(InsenError::ControllerDisconnected(id)) => assert_eq!(id, 1),
        other => panic!("expected ControllerDisconnected, got {:?}", other),
    }
    // Not a link failure: the client stays usable
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[test]
fn test_get_with_prompt_prefix() {
    let (mut client, _) = connected(&[">>> INPUT|3|1,2|3,4|5,6|0x0800|0|90|7"]);
    let state = client.get_controller_input(3).unwrap();
    assert!(state.buttons.contains(Buttons::TOUCHPAD));
    assert_eq!(state.battery, 90);
}

#[test]
fn test_get_echoed_id_mismatch_uses_requested_id() {
    let (mut client, _) = connected(&["INPUT|3|1,2|3,4|5,6|0x0|0|90|7"]);
    let state = client.get_controller_input(2).unwrap();
    assert_eq!(state.id, 2);
}

#[test]
fn test_get_invalid_id_does_not_send() {
    let (mut client, sent) = connected(&[]);
    assert!(matches!(
        client.get_controller_input(4),
        Err(InsenError::InvalidParam(_))
    ));
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn test_get_unexpected_tag() {
    let (mut client, _) = connected(&["ERROR|UNKNOWN_COMMAND"]);
    assert!(matches!(
        client.get_controller_input(0),
        Err(InsenError::InvalidResponse(_))
    ));
}

#[test]
fn test_list_controllers() {
    let (mut client, sent) = connected(&["CONTROLLERS|0_XBOX_ONE|2_PS4"]);
    let list = client.list_controllers().unwrap();
    assert_eq!(sent_text(&sent), "LIST\r\n");
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
fn test_firmware_info() {
    let (mut client, sent) =
        connected(&["INSEN_FW_V1.2.3|BUILD_2024_01_15|MAKCU_COMPATIBLE|STATUS_OK"]);
    let info = client.get_firmware_info().unwrap();
    assert_eq!(sent_text(&sent), "INFO\r\n");
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
fn test_status() {
    let (mut client, sent) =
        connected(&["ACTIVE_1|TOTAL_INPUTS_42|API_COMMANDS_7|FREE_HEAP_180000"]);
    let status = client.get_status().unwrap();
    assert_eq!(sent_text(&sent), "STATUS\r\n");
    assert_eq!(
        status,
        SystemStatus {
            active_controllers: 1,
            total_inputs: 42,
            api_commands: 7,
            free_heap: 180000,
        }
    );
}

#[test]
fn test_sequential_commands_and_stats() {
    let (mut client, sent) = connected(&[
        "INSEN_FW_V2.0|STATUS_OK",
        "CONTROLLERS|1_PS5",
        "INPUT|1|0,0|0,0|0,0|0x0|0|100|1",
    ]);
    client.get_firmware_info().unwrap();
    client.list_controllers().unwrap();
    client.get_controller_input(1).unwrap();
    assert_eq!(sent_text(&sent), "INFO\r\nLIST\r\nGET 1\r\n");

    let stats = client.stats().unwrap();
    assert_eq!(stats.commands, 3);
    assert_eq!(stats.tx_bytes, 19);
    assert_eq!(stats.timeouts, 0);
}

#[test]
fn test_commands_after_disconnect_do_not_touch_transport() {
    let (mut client, sent) = connected(&["STATUS_OK"]);
    client.disconnect();
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    assert!(matches!(
        client.get_firmware_info(),
        Err(InsenError::InvalidParam(_))
    ));
    assert!(matches!(
        client.get_controller_input(0),
        Err(InsenError::InvalidParam(_))
    ));
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn test_connect_twice_rejected() {
    let (mut client, _) = connected(&[]);
    let (second, _) = MockSerial::with_replies(&[]);
    assert!(matches!(
        client.connect_with(Box::new(second)),
        Err(InsenError::InvalidParam(_))
    ));
    assert!(client.is_connected());
}

#[test]
fn test_reconnect_after_disconnect() {
    let (mut client, _) = connected(&[]);
    client.disconnect();
    let (mock, _) = MockSerial::with_replies(&["ACTIVE_0"]);
    client.connect_with(Box::new(mock)).unwrap();
    assert_eq!(client.get_status().unwrap().active_controllers, 0);
}

#[test]
fn test_timeout_is_bounded() {
    let (mut client, _) = connected(&[]);
    let start = Instant::now();
    assert!(matches!(client.get_status(), Err(InsenError::Timeout)));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(client.stats().unwrap().timeouts, 1);
}

#[test]
fn test_write_failure() {
    let (mut mock, _) = MockSerial::with_replies(&["STATUS_OK"]);
    mock.fail_on_send = true;
    let mut client = InsenClient::new(test_config());
    client.connect_with(Box::new(mock)).unwrap();

    let err = client.get_firmware_info().unwrap_err();
    assert!(matches!(err, InsenError::Write(_)));
    assert!(err.is_connection_error());
    assert_eq!(err.code(), -3);
}

#[test]
fn test_open_missing_port() {
    let mut client = InsenClient::new(ClientConfig::new("/dev/does-not-exist-insen"));
    assert!(matches!(
        client.connect(),
        Err(InsenError::PortOpen { .. })
    ));
    assert!(!client.is_connected());
}
