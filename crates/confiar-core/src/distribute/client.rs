use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::{
    info,
    warn,
};
use tokio::io::AsyncWriteExt;
use url::{
    Host,
    Url,
};

use crate::error::{
    Error,
    Result,
};
use crate::install::{
    InstallTarget,
    Installer,
    TargetKind,
};

const TEMP_PREFIX: &str = "confiar-cert-";

/// Where the certificate to install comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertSource {
    Local(PathBuf),
    Remote(Url),
}

impl CertSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, CertSource::Remote(_))
    }
}

impl FromStr for CertSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidSource("empty certificate source".to_string()));
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s).map_err(|e| Error::InvalidSource(format!("{s}: {e}")))?;
            return Ok(CertSource::Remote(url));
        }

        Ok(CertSource::Local(PathBuf::from(s)))
    }
}

impl fmt::Display for CertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertSource::Local(path) => write!(f, "{}", path.display()),
            CertSource::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Downloads `url` into a fresh temporary file that outlives this call. The
/// file stays behind if the body transfer fails part way.
pub async fn fetch_to_temp(url: &Url) -> Result<PathBuf> {
    info!("Downloading {} to local path", url);

    let client = client_for(url).map_err(|e| Error::network(url, e))?;
    let mut response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::network(url, e))?;

    let temp_dir = std::env::temp_dir();
    let (file, temp_path) = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile()
        .map_err(|e| Error::io("unable to create local copy of certificate in", &temp_dir, e))?
        .keep()
        .map_err(|e| Error::io("unable to keep local copy of certificate in", &temp_dir, e.error))?;

    let mut file = tokio::fs::File::from_std(file);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::network(url, e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io("unable to write certificate to", &temp_path, e))?;
    }
    file.flush()
        .await
        .map_err(|e| Error::io("unable to write certificate to", &temp_path, e))?;

    Ok(temp_path)
}

// loopback sources never go through an environment proxy
fn client_for(url: &Url) -> reqwest::Result<reqwest::Client> {
    let loopback = match url.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        Some(Host::Domain(domain)) => domain == "localhost",
        None => false,
    };

    let builder = reqwest::Client::builder();
    if loopback {
        builder.no_proxy().build()
    } else {
        builder.build()
    }
}

/// Resolves `source` to a local file, builds the target for it and installs.
/// A downloaded copy is removed only after a successful install.
pub async fn install_with<T, F>(source: &CertSource, build: F) -> Result<()>
where
    T: Installer,
    F: FnOnce(PathBuf) -> T,
{
    let (cert_path, downloaded) = match source {
        CertSource::Local(path) => (path.clone(), false),
        CertSource::Remote(url) => (fetch_to_temp(url).await?, true),
    };

    info!("Installing certificate {}", cert_path.display());
    let target = build(cert_path.clone());

    if let Err(e) = target.install().await {
        if downloaded {
            warn!(
                "Leaving downloaded certificate at {} for inspection",
                cert_path.display()
            );
        }
        return Err(e);
    }

    if downloaded {
        info!("Removing certificate from local path {}", cert_path.display());
        if let Err(e) = tokio::fs::remove_file(&cert_path).await {
            warn!("Failed to remove {}: {}", cert_path.display(), e);
        }
    }

    Ok(())
}

pub async fn install_certificate(
    source: &CertSource, kind: TargetKind, extra_hosts: Vec<String>,
) -> Result<()> {
    install_with(source, |cert_path| {
        InstallTarget::new(kind, cert_path, extra_hosts)
    })
    .await
}
