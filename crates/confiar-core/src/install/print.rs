use std::path::{
    Path,
    PathBuf,
};

use async_trait::async_trait;
use log::debug;
use tokio::fs;
use tokio::io::{
    AsyncWrite,
    AsyncWriteExt,
    Stdout,
};
use tokio::sync::Mutex;

use super::Installer;
use crate::error::{
    Error,
    Result,
};

/// Copies the certificate bytes, unparsed, to a writer (stdout by default).
pub struct PrintTarget<W = Stdout> {
    cert_path: PathBuf,
    out: Mutex<W>,
}

impl PrintTarget<Stdout> {
    pub fn new(cert_path: impl Into<PathBuf>) -> Self {
        Self::with_writer(cert_path, tokio::io::stdout())
    }
}

impl<W> PrintTarget<W> {
    pub fn with_writer(cert_path: impl Into<PathBuf>, out: W) -> Self {
        Self {
            cert_path: cert_path.into(),
            out: Mutex::new(out),
        }
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    pub fn into_writer(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> Installer for PrintTarget<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn install(&self) -> Result<()> {
        let cert_bytes = fs::read(&self.cert_path)
            .await
            .map_err(|e| Error::io("failed to read certificate", &self.cert_path, e))?;

        debug!(
            "Printing {} bytes from {}",
            cert_bytes.len(),
            self.cert_path.display()
        );

        let mut out = self.out.lock().await;
        out.write_all(&cert_bytes)
            .await
            .map_err(|e| Error::io("failed to print certificate", &self.cert_path, e))?;
        out.flush()
            .await
            .map_err(|e| Error::io("failed to print certificate", &self.cert_path, e))?;

        Ok(())
    }
}
