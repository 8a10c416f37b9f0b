//! Additional information accompanying a failed operation.

/// Human-readable detail about the last failure.
///
/// Algorithms write into it; drivers clear it before starting a new
/// operation so stale content never leaks across unrelated operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    client_message: String,
    server_message: String,
}

impl Diagnostics {
    /// Create empty diagnostics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Message generated by the client library.
    pub fn client_message(&self) -> &str {
        &self.client_message
    }

    /// Message sent by the server in an ERR packet.
    ///
    /// May contain user input (e.g. parts of a rejected query).
    pub fn server_message(&self) -> &str {
        &self.server_message
    }

    /// Returns true if neither message is set.
    pub fn is_empty(&self) -> bool {
        self.client_message.is_empty() && self.server_message.is_empty()
    }

    /// Clear both messages.
    pub fn clear(&mut self) {
        self.client_message.clear();
        self.server_message.clear();
    }

    pub(crate) fn set_client_message(&mut self, msg: impl Into<String>) {
        self.client_message = msg.into();
    }

    pub(crate) fn set_server_message(&mut self, msg: impl Into<String>) {
        self.server_message = msg.into();
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.client_message.is_empty(), self.server_message.is_empty()) {
            (true, true) => Ok(()),
            (false, true) => write!(f, "{}", self.client_message),
            (true, false) => write!(f, "{}", self.server_message),
            (false, false) => {
                write!(f, "{} (server: {})", self.client_message, self.server_message)
            }
        }
    }
}
