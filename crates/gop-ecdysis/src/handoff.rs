//! The listener handoff token passed from one process generation to the next.
//!
//! The old process exports three environment variables into its successor:
//!
//! - `GOP_LISTEN_FD`: inherited descriptor number of the listening socket
//! - `GOP_LISTEN_PID`: pid of the old process, which the successor terminates
//! - `GOP_LISTEN_ADDR`: `<network>:<address>`, e.g. `tcp:0.0.0.0:8080`
//!
//! All three must be present and well-formed for the successor to adopt the
//! socket. Anything less is treated exactly like a cold start.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::unix::io::RawFd;
use std::str::FromStr;

use tracing::{debug, warn};

pub const ENV_FD: &str = "GOP_LISTEN_FD";
pub const ENV_PID: &str = "GOP_LISTEN_PID";
pub const ENV_ADDR: &str = "GOP_LISTEN_ADDR";

/// Source of environment variables, so startup can be tested without
/// touching the (process-wide) real environment.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Network family of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Any address family.
    Tcp,
    /// IPv4 only.
    Tcp4,
    /// IPv6 only.
    Tcp6,
}

impl Network {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            other => Err(format!("unsupported network {other:?}")),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => write!(f, "tcp"),
            Network::Tcp4 => write!(f, "tcp4"),
            Network::Tcp6 => write!(f, "tcp6"),
        }
    }
}

/// Network family plus address, e.g. `tcp:127.0.0.1:8080`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddr {
    pub network: Network,
    pub address: String,
}

impl ListenAddr {
    pub fn new(network: Network, address: impl Into<String>) -> Self {
        Self {
            network,
            address: address.into(),
        }
    }

    /// Resolve to the first socket address matching the network family.
    pub fn resolve(&self) -> io::Result<SocketAddr> {
        self.address
            .to_socket_addrs()?
            .find(|addr| self.network.accepts(addr))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no {} address for {}", self.network, self.address),
                )
            })
    }
}

impl FromStr for ListenAddr {
    type Err = String;

    /// Parse `<network>:<address>`. The address itself may contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, address) = s
            .split_once(':')
            .ok_or_else(|| format!("missing network prefix in {s:?}"))?;
        if address.is_empty() {
            return Err(format!("missing address in {s:?}"));
        }
        Ok(Self::new(network.parse()?, address))
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.network, self.address)
    }
}

/// Everything a successor needs to take over the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffToken {
    pub fd: RawFd,
    pub parent_pid: u32,
    pub addr: ListenAddr,
}

impl HandoffToken {
    /// Read the token from `env`.
    ///
    /// Returns `None` unless all three variables are present and valid. A
    /// partial or malformed token is logged and ignored.
    pub fn from_env<E: EnvSource + ?Sized>(env: &E) -> Option<Self> {
        let fd = env.var(ENV_FD);
        let pid = env.var(ENV_PID);
        let addr = env.var(ENV_ADDR);

        let (fd, pid, addr) = match (fd, pid, addr) {
            (None, None, None) => {
                debug!("No handoff token in environment");
                return None;
            }
            (Some(fd), Some(pid), Some(addr)) => (fd, pid, addr),
            (fd, pid, addr) => {
                warn!(
                    fd = ?fd,
                    pid = ?pid,
                    addr = ?addr,
                    "Incomplete handoff token in environment, ignoring"
                );
                return None;
            }
        };

        match Self::parse(&fd, &pid, &addr) {
            Ok(token) => Some(token),
            Err(reason) => {
                warn!(
                    %fd,
                    %pid,
                    %addr,
                    %reason,
                    "Malformed handoff token in environment, ignoring"
                );
                None
            }
        }
    }

    fn parse(fd: &str, pid: &str, addr: &str) -> Result<Self, String> {
        let fd: RawFd = fd.parse().map_err(|e| format!("bad fd: {e}"))?;
        if fd < 0 {
            return Err(format!("negative fd {fd}"));
        }
        let parent_pid: u32 = pid.parse().map_err(|e| format!("bad pid: {e}"))?;
        if parent_pid == 0 {
            return Err("pid 0".to_string());
        }
        Ok(Self {
            fd,
            parent_pid,
            addr: addr.parse()?,
        })
    }

    /// The variables to export into the successor's environment.
    pub fn env_vars(&self) -> [(&'static str, String); 3] {
        [
            (ENV_FD, self.fd.to_string()),
            (ENV_PID, self.parent_pid.to_string()),
            (ENV_ADDR, self.addr.to_string()),
        ]
    }
}
