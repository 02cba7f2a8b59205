//! TCP port and ping-style reachability checks

use std::io;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::address::socket_host;
use super::{Check, ProbeResult};
use crate::target::Target;

/// Fixed connect timeout for socket checks
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum ConnectError {
    Timeout(Duration),
    Io(io::Error),
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectError::Timeout(after) => {
                write!(f, "connection timed out after {}s", after.as_secs())
            }
            ConnectError::Io(e) => write!(f, "{e}"),
        }
    }
}

/// Open (and immediately drop) a TCP connection, returning the connect time in ms
pub async fn connect(host: &str, port: u16, limit: Duration) -> Result<u64, ConnectError> {
    let start = Instant::now();

    timeout(limit, TcpStream::connect((host, port)))
        .await
        .map_err(|_| ConnectError::Timeout(limit))?
        .map_err(ConnectError::Io)?;

    Ok(start.elapsed().as_millis() as u64)
}

/// Raw TCP connect to the configured port
pub struct TcpCheck {
    timeout: Duration,
}

impl Default for TcpCheck {
    fn default() -> Self {
        Self {
            timeout: CONNECT_TIMEOUT,
        }
    }
}

#[async_trait]
impl Check for TcpCheck {
    async fn run(&self, target: &Target) -> ProbeResult {
        let Some(port) = target.check.port() else {
            return ProbeResult::down("no port configured for TCP check");
        };

        let (host, _) = socket_host(&target.address);

        match connect(&host, port, self.timeout).await {
            Ok(latency_ms) => ProbeResult::up(latency_ms, format!("port {port} open")),
            Err(e) => ProbeResult::down(e.to_string()),
        }
    }
}

/// Reachability approximated by a TCP connect to 443 (secure schemes) or 80
///
/// ICMP needs raw sockets, which the monitor does not assume it can open.
pub struct PingCheck {
    timeout: Duration,
}

impl Default for PingCheck {
    fn default() -> Self {
        Self {
            timeout: CONNECT_TIMEOUT,
        }
    }
}

impl PingCheck {
    /// Port the reachability check connects to
    pub fn port_for(secure: bool) -> u16 {
        if secure { 443 } else { 80 }
    }

    async fn reach(&self, host: &str, port: u16) -> ProbeResult {
        match connect(host, port, self.timeout).await {
            Ok(latency_ms) => ProbeResult::up(latency_ms, "host reachable"),
            Err(e) => ProbeResult::down(format!("host unreachable: {e}")),
        }
    }
}

#[async_trait]
impl Check for PingCheck {
    async fn run(&self, target: &Target) -> ProbeResult {
        let (host, secure) = socket_host(&target.address);
        self.reach(&host, Self::port_for(secure)).await
    }
}
