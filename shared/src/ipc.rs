use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Control commands accepted by the voxshock daemon over its Unix socket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Command {
    /// Open the capture streams and start the processing pipeline.
    Start,
    /// Stop the pipeline and release the capture streams.
    Stop,
    /// Query the current session status.
    Status,
    /// Fire a fixed 10% test command through the dispatch gate.
    Test,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Error(String),
    Status(StatusInfo),
}

/// Thread-safe snapshot of the running session, readable without touching
/// pipeline-owned state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusInfo {
    pub is_running: bool,
    pub is_listening: bool,
    /// Rolling microphone loudness in [0.0, 1.0].
    pub audio_level: f32,
    /// Arbiter state: "armed", "disarmed" or "cooldown".
    pub arbiter: String,
    pub wake_word: String,
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection refused: is voxshockd running?")]
    ConnectionRefused,

    #[error("Connection timeout")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization_start() {
        let cmd = Command::Start;
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#""Start""#);
    }

    #[test]
    fn test_command_round_trip_all_variants() {
        let commands = vec![Command::Start, Command::Stop, Command::Status, Command::Test];
        for cmd in commands {
            let json = serde_json::to_string(&cmd).unwrap();
            let deserialized: Command = serde_json::from_str(&json).unwrap();
            assert_eq!(cmd, deserialized);
        }
    }

    #[test]
    fn test_response_serialization_ok() {
        let resp = Response::Ok;
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#""Ok""#);
    }

    #[test]
    fn test_response_serialization_error() {
        let resp = Response::Error("test error".to_string());
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"Error":"test error"}"#);
    }

    #[test]
    fn test_response_round_trip_all_variants() {
        let responses = vec![
            Response::Ok,
            Response::Error("error".to_string()),
            Response::Status(StatusInfo {
                is_running: true,
                is_listening: false,
                audio_level: 0.25,
                arbiter: "armed".to_string(),
                wake_word: "lightning bolt".to_string(),
            }),
        ];
        for resp in responses {
            let json = serde_json::to_string(&resp).unwrap();
            let deserialized: Response = serde_json::from_str(&json).unwrap();
            assert_eq!(resp, deserialized);
        }
    }

    #[test]
    fn test_status_info_serialization() {
        let info = StatusInfo {
            is_running: true,
            is_listening: true,
            audio_level: 0.5,
            arbiter: "disarmed".to_string(),
            wake_word: "lightning bolt".to_string(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("is_running"));
        assert!(json.contains("is_listening"));
        assert!(json.contains("audio_level"));
        assert!(json.contains("arbiter"));
        assert!(json.contains("wake_word"));
    }

    #[test]
    fn test_status_info_round_trip() {
        let combinations = vec![
            (true, true, "armed"),
            (true, false, "disarmed"),
            (false, false, "cooldown"),
        ];
        for (running, listening, arbiter) in combinations {
            let info = StatusInfo {
                is_running: running,
                is_listening: listening,
                audio_level: 0.0,
                arbiter: arbiter.to_string(),
                wake_word: "go".to_string(),
            };
            let json = serde_json::to_string(&info).unwrap();
            let deserialized: StatusInfo = serde_json::from_str(&json).unwrap();
            assert_eq!(info, deserialized);
        }
    }

    #[test]
    fn test_ipc_error_display_io() {
        let err = IpcError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        assert!(err.to_string().contains("IO error"));
        assert!(err.to_string().contains("test"));
    }

    #[test]
    fn test_ipc_error_display_connection_refused() {
        let err = IpcError::ConnectionRefused;
        assert!(err.to_string().contains("Connection refused"));
    }

    #[test]
    fn test_ipc_error_display_timeout() {
        let err = IpcError::Timeout;
        assert!(err.to_string().contains("Connection timeout"));
    }
}
