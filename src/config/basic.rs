use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// `[basic]` table: where the panel listens, where it stores data, how loud it logs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// SQLite URL; the file is created on first start.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

impl BasicConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            database_url: default_database_url(),
            loglevel: default_loglevel(),
        }
    }
}

fn default_listen_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_listen_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite://aquapanel.db".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}
