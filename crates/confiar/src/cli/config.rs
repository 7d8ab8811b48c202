use std::path::PathBuf;

use confiar_core::CertSource;
use confiar_core::distribute::DEFAULT_SERVE_PORT;
use confiar_core::issuer::CERT_FILE_NAME;
use log::warn;

pub const CERT_ENV: &str = "CONFIAR_CERT";
pub const SERVE_PORT_ENV: &str = "CONFIAR_SERVE_PORT";

/// Flag values fall back to the environment, then to built-in defaults.
pub struct EnvDefaults;

impl EnvDefaults {
    pub fn cert_source(flag: Option<String>) -> String {
        Self::cert_source_from(flag, std::env::var(CERT_ENV).ok())
    }

    /// Like [`Self::cert_source`], but a URL in the environment is skipped.
    pub fn serve_path(flag: Option<PathBuf>) -> PathBuf {
        Self::serve_path_from(flag, std::env::var(CERT_ENV).ok())
    }

    pub fn serve_port(flag: Option<u16>) -> Result<u16, String> {
        Self::serve_port_from(flag, std::env::var(SERVE_PORT_ENV).ok())
    }

    fn cert_source_from(flag: Option<String>, env: Option<String>) -> String {
        flag.or(env.filter(|value| !value.is_empty()))
            .unwrap_or_else(|| default_cert_path().display().to_string())
    }

    fn serve_path_from(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
        if let Some(path) = flag {
            return path;
        }

        match env.filter(|value| !value.is_empty()).map(|value| value.parse::<CertSource>()) {
            Some(Ok(CertSource::Local(path))) => path,
            Some(Ok(CertSource::Remote(url))) => {
                warn!("Ignoring {CERT_ENV}={url} for serve, it is not a local file");
                default_cert_path()
            }
            Some(Err(_)) | None => default_cert_path(),
        }
    }

    fn serve_port_from(flag: Option<u16>, env: Option<String>) -> Result<u16, String> {
        if let Some(port) = flag {
            return Ok(port);
        }

        match env.filter(|value| !value.is_empty()) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| format!("{SERVE_PORT_ENV} is not a valid port: {value}")),
            None => Ok(DEFAULT_SERVE_PORT),
        }
    }
}

pub fn default_cert_path() -> PathBuf {
    PathBuf::from(".").join(CERT_FILE_NAME)
}
