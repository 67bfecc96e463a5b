use dioxus_logger::tracing;

/// Whether the storefront backend answered the last request.
#[derive(Clone, PartialEq, Debug, Default, strum::EnumIs)]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Disconnected(String),
}

#[derive(Clone, Debug, Default)]
pub struct ConnectionChecker {
    status: ConnectionStatus,
}

impl ConnectionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspects a Result from a backend call.
    /// - If `Ok`: marks the backend connected again and returns the value.
    /// - If `Err`: logs it, records a disconnect if it looks like a transport
    ///   failure, and returns `None`.
    pub fn check<T, E: std::fmt::Display>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(val) => {
                self.mark_connected();
                Some(val)
            }
            Err(e) => {
                let error_msg = e.to_string();
                tracing::warn!("backend error: {}", error_msg);
                if is_connection_error(&error_msg) {
                    self.status = ConnectionStatus::Disconnected(error_msg);
                }
                None
            }
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    fn mark_connected(&mut self) {
        if self.status.is_disconnected() {
            tracing::info!("backend reachable again");
            self.status = ConnectionStatus::Connected;
        }
    }
}

/// Heuristic: does this error text describe a transport failure rather than
/// a well-formed error answer?
pub fn is_connection_error(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("connection refused")
        || msg.contains("broken pipe")
        || msg.contains("network unreachable")
        || msg.contains("connection reset")
        || msg.contains("failed to connect")
        || msg.contains("error sending request")
        || msg.contains("dns error")
        || msg.contains("service unavailable")
        || msg.contains("connection closed")
}
