use std::net::{
    IpAddr,
    Ipv4Addr,
    SocketAddr,
};
use std::path::PathBuf;

pub const DEFAULT_SERVE_PORT: u16 = 8787;
pub const DEFAULT_SERVE_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Settings for the certificate distribution endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    /// Certificate file served on every request, re-read each time
    pub cert_path: PathBuf,
    /// Address the listener binds to
    pub host: IpAddr,
    /// Port the listener binds to
    pub port: u16,
}

impl ServeConfig {
    pub fn builder() -> ServeConfigBuilder {
        ServeConfigBuilder::new()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Default)]
pub struct ServeConfigBuilder {
    cert_path: Option<PathBuf>,
    host: Option<IpAddr>,
    port: Option<u16>,
}

impl ServeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cert_path(mut self, cert_path: impl Into<PathBuf>) -> Self {
        self.cert_path = Some(cert_path.into());
        self
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn build(self) -> Result<ServeConfig, String> {
        let cert_path = self
            .cert_path
            .ok_or_else(|| "cert_path is required".to_string())?;

        Ok(ServeConfig {
            cert_path,
            host: self.host.unwrap_or(DEFAULT_SERVE_HOST),
            port: self.port.unwrap_or(DEFAULT_SERVE_PORT),
        })
    }
}
