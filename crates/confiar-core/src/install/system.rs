use std::path::{
    Path,
    PathBuf,
};

use async_trait::async_trait;
use log::{
    info,
    warn,
};
use tokio::fs;
use tokio::process::Command;

use super::{
    Installer,
    parse_certificate,
};
use crate::error::{
    Error,
    Result,
};

pub const SYSTEM_CERT_FILE: &str = "confiar-ca.crt";

const ANCHOR_DIRS: [&str; 4] = [
    "/usr/local/share/ca-certificates",
    "/etc/pki/ca-trust/source/anchors",
    "/usr/share/ca-certificates",
    "/etc/ssl/certs",
];

const UPDATE_COMMANDS: [(&str, &str); 2] = [
    ("/usr/sbin/update-ca-certificates", "update-ca-certificates"),
    ("/usr/bin/update-ca-trust", "update-ca-trust"),
];

fn default_anchor_dir() -> PathBuf {
    ANCHOR_DIRS
        .iter()
        .map(Path::new)
        .find(|dir| dir.exists())
        .unwrap_or_else(|| Path::new(ANCHOR_DIRS[0]))
        .to_path_buf()
}

fn default_update_command() -> Option<String> {
    UPDATE_COMMANDS
        .iter()
        .find(|(path, _)| Path::new(path).exists())
        .map(|(_, cmd)| cmd.to_string())
}

/// Drops the CA into the host's trust anchor directory and refreshes the
/// system bundle.
pub struct SystemTarget {
    cert_path: PathBuf,
    anchor_dir: PathBuf,
    update_command: Option<String>,
}

impl SystemTarget {
    pub fn new(cert_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            anchor_dir: default_anchor_dir(),
            update_command: default_update_command(),
        }
    }

    pub fn with_anchor_dir(
        cert_path: impl Into<PathBuf>, anchor_dir: impl Into<PathBuf>,
        update_command: Option<String>,
    ) -> Self {
        Self {
            cert_path: cert_path.into(),
            anchor_dir: anchor_dir.into(),
            update_command,
        }
    }

    pub fn installed_path(&self) -> PathBuf {
        self.anchor_dir.join(SYSTEM_CERT_FILE)
    }

    async fn refresh_trust_store(&self) -> Result<()> {
        let Some(update_cmd) = self.update_command.as_deref() else {
            warn!(
                "Could not find CA update command. You may need to update the certificate store manually"
            );
            return Ok(());
        };

        let output = Command::new(update_cmd)
            .output()
            .await
            .map_err(|e| Error::io("failed to execute", update_cmd, e))?;

        if output.status.success() {
            info!("Updated system CA certificate store");
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Failed to update CA certificate store: {}", stderr.trim());
            warn!("You may need to run 'sudo {}' manually", update_cmd);
        }

        Ok(())
    }
}

#[async_trait]
impl Installer for SystemTarget {
    async fn install(&self) -> Result<()> {
        let cert_bytes = fs::read(&self.cert_path)
            .await
            .map_err(|e| Error::io("failed to read certificate", &self.cert_path, e))?;

        parse_certificate(&cert_bytes)?;

        fs::create_dir_all(&self.anchor_dir)
            .await
            .map_err(|e| Error::io("failed to create directory", &self.anchor_dir, e))?;

        let dst = self.installed_path();
        fs::write(&dst, &cert_bytes)
            .await
            .map_err(|e| Error::io("failed to write certificate", &dst, e))?;

        info!("Wrote CA certificate to {}", dst.display());

        self.refresh_trust_store().await
    }
}
