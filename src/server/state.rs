//! Handshake state.

use crate::protocol::ClientInfo;
use serde::Serialize;

/// Where the client is in the MCP handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeState {
    Uninitialized,
    /// Entered after an `initialize` answer; never left.
    Ready,
}

/// Per-process session bookkeeping.
#[derive(Debug)]
pub struct SessionState {
    handshake: HandshakeState,
    client_info: Option<ClientInfo>,
    notified: bool,
    request_count: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            handshake: HandshakeState::Uninitialized,
            client_info: None,
            notified: false,
            request_count: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handshake(&self) -> HandshakeState {
        self.handshake
    }

    pub fn is_ready(&self) -> bool {
        self.handshake == HandshakeState::Ready
    }

    /// Records the client; a repeated `initialize` replaces the client info.
    pub fn set_ready(&mut self, client_info: ClientInfo) {
        self.client_info = Some(client_info);
        self.handshake = HandshakeState::Ready;
    }

    pub fn client_info(&self) -> Option<&ClientInfo> {
        self.client_info.as_ref()
    }

    pub fn mark_notified(&mut self) {
        self.notified = true;
    }

    /// Whether the client sent the `initialized` notification.
    pub fn notified(&self) -> bool {
        self.notified
    }

    /// Counts a tool call and returns its sequence number.
    pub fn next_request_id(&mut self) -> u64 {
        let id = self.request_count;
        self.request_count += 1;
        id
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(name: &str) -> ClientInfo {
        ClientInfo {
            name: name.into(),
            version: "1.0".into(),
        }
    }

    #[test]
    fn test_ready_is_terminal() {
        let mut state = SessionState::new();
        assert_eq!(state.handshake(), HandshakeState::Uninitialized);
        assert!(state.client_info().is_none());

        state.set_ready(client("first"));
        state.set_ready(client("second"));
        assert!(state.is_ready());
        assert_eq!(state.client_info().map(|c| c.name.as_str()), Some("second"));
    }

    #[test]
    fn test_request_counter() {
        let mut state = SessionState::new();
        assert_eq!(state.next_request_id(), 0);
        assert_eq!(state.next_request_id(), 1);
        assert_eq!(state.request_count(), 2);
    }
}
