use std::path::{
    Path,
    PathBuf,
};

use async_trait::async_trait;
use log::{
    debug,
    info,
};
use tokio::fs;

use super::{
    Installer,
    parse_certificate,
};
use crate::error::{
    Error,
    Result,
};

pub const DOCKER_CERT_DIR: &str = "/etc/docker/certs.d";
pub const DOCKER_CERT_FILE: &str = "ca.crt";

/// Installs the CA into the Docker daemon's per-registry trust directory,
/// `<root>/<host>/ca.crt`, once for every name the certificate declares plus
/// any extra hosts.
pub struct DockerTarget {
    cert_path: PathBuf,
    extra_hosts: Vec<String>,
    root: PathBuf,
}

impl DockerTarget {
    pub fn new(cert_path: impl Into<PathBuf>, extra_hosts: Vec<String>) -> Self {
        Self::with_root(cert_path, extra_hosts, DOCKER_CERT_DIR)
    }

    pub fn with_root(
        cert_path: impl Into<PathBuf>, extra_hosts: Vec<String>, root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cert_path: cert_path.into(),
            extra_hosts,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Certificate DNS names, then extra hosts, then certificate IPs, with
    /// duplicates removed.
    fn hosts_for(&self, cert_bytes: &[u8]) -> Result<Vec<String>> {
        let declared = parse_certificate(cert_bytes)?;

        let mut hosts: Vec<String> = Vec::new();
        let candidates = declared
            .dns_names
            .into_iter()
            .chain(self.extra_hosts.iter().cloned())
            .chain(declared.ip_addresses.iter().map(|ip| ip.to_string()));

        for host in candidates {
            if !is_safe_dir_name(&host) {
                return Err(Error::InvalidHostname(host));
            }
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }

        Ok(hosts)
    }

    async fn install_host(&self, host: &str, cert_bytes: &[u8]) -> Result<()> {
        let host_dir = self.root.join(host);
        debug!("Creating directory {}", host_dir.display());
        fs::create_dir_all(&host_dir)
            .await
            .map_err(|e| Error::io("failed to create directory", &host_dir, e))?;

        let dst = host_dir.join(DOCKER_CERT_FILE);
        debug!("Writing certificate {}", dst.display());
        fs::write(&dst, cert_bytes)
            .await
            .map_err(|e| Error::io("failed to write certificate", &dst, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(&dst, std::fs::Permissions::from_mode(0o644))
                .await
                .map_err(|e| Error::io("failed to set permissions on", &dst, e))?;
        }

        info!("Certificate installed for {} at {}", host, dst.display());
        Ok(())
    }
}

#[async_trait]
impl Installer for DockerTarget {
    async fn install(&self) -> Result<()> {
        let cert_bytes = fs::read(&self.cert_path)
            .await
            .map_err(|e| Error::io("failed to read certificate", &self.cert_path, e))?;

        let hosts = self.hosts_for(&cert_bytes)?;
        if hosts.is_empty() {
            info!(
                "Certificate {} declares no names and no extra hosts were given",
                self.cert_path.display()
            );
        }

        for host in &hosts {
            self.install_host(host, &cert_bytes).await?;
        }

        Ok(())
    }
}

fn is_safe_dir_name(host: &str) -> bool {
    !host.is_empty()
        && host != "."
        && host != ".."
        && !host.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::install::test_support::issue_into;

    fn installed_hosts(root: &Path) -> BTreeSet<String> {
        match std::fs::read_dir(root) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_installs_declared_and_extra_hosts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cert_path = issue_into(
            temp_dir.path(),
            &["a.example.com", "b.example.com"],
            &["10.0.0.5"],
        )
        .await;
        let root = temp_dir.path().join("certs.d");

        let target = DockerTarget::with_root(&cert_path, vec!["c.example.com".to_string()], &root);
        target.install().await.unwrap();

        let expected: BTreeSet<String> = ["a.example.com", "b.example.com", "c.example.com", "10.0.0.5"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(installed_hosts(&root), expected);

        let original = std::fs::read(&cert_path).unwrap();
        for host in &expected {
            let copy = std::fs::read(root.join(host).join(DOCKER_CERT_FILE)).unwrap();
            assert_eq!(copy, original, "copy for {host} differs");
        }
    }

    #[tokio::test]
    async fn test_extra_host_already_declared_is_installed_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cert_path = issue_into(temp_dir.path(), &["a.example.com"], &[]).await;
        let root = temp_dir.path().join("certs.d");

        let target = DockerTarget::with_root(
            &cert_path,
            vec!["a.example.com".to_string(), "10.1.1.1".to_string()],
            &root,
        );
        let hosts = target.hosts_for(&std::fs::read(&cert_path).unwrap()).unwrap();
        assert_eq!(hosts, vec!["a.example.com", "10.1.1.1"]);
    }

    #[tokio::test]
    async fn test_malformed_pem_creates_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cert_path = temp_dir.path().join("cert.pem");
        std::fs::write(&cert_path, "garbage that is not PEM").unwrap();
        let root = temp_dir.path().join("certs.d");

        let target = DockerTarget::with_root(&cert_path, vec!["c.example.com".to_string()], &root);
        let err = target.install().await.unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_path_like_extra_host_is_rejected_before_writing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cert_path = issue_into(temp_dir.path(), &["a.example.com"], &[]).await;
        let root = temp_dir.path().join("certs.d");

        let target = DockerTarget::with_root(&cert_path, vec!["../escape".to_string()], &root);
        let err = target.install().await.unwrap_err();

        assert!(matches!(err, Error::InvalidHostname(ref h) if h == "../escape"));
        assert!(!root.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_keeps_earlier_hosts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cert_path = issue_into(temp_dir.path(), &["a.example.com"], &[]).await;
        let root = temp_dir.path().join("certs.d");
        std::fs::create_dir_all(&root).unwrap();
        // a regular file where the second host directory should go
        std::fs::write(root.join("b.example.com"), "blocker").unwrap();

        let target = DockerTarget::with_root(
            &cert_path,
            vec!["b.example.com".to_string(), "c.example.com".to_string()],
            &root,
        );
        let err = target.install().await.unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(root.join("a.example.com").join(DOCKER_CERT_FILE).exists());
        assert!(!root.join("c.example.com").exists());
    }
}
