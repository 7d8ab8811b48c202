use std::net::IpAddr;
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    Context,
    Result,
};
use confiar_core::validate::{
    validate_ips,
    validate_names,
};
use confiar_core::{
    CertSource,
    CertificateRequest,
    ServeConfig,
    TargetKind,
    install_certificate,
    issue_self_signed_ca,
    serve_certificate,
};
use log::{
    info,
    warn,
};

use crate::cli::args::{
    Cli,
    Command,
};
use crate::cli::config::EnvDefaults;

pub struct CliHandler {
    cli: Cli,
}

impl CliHandler {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(self) -> Result<()> {
        match self.cli.command {
            Command::Generate { fqdn, ip, out_dir } => Self::generate(&fqdn, &ip, &out_dir).await,
            Command::Install {
                target,
                from,
                fqdn,
                ip,
            } => Self::install(target, from, fqdn, ip).await,
            Command::Serve { from, port, host } => Self::serve(from, port, host).await,
            Command::Version => {
                println!("{}", version_info());
                Ok(())
            }
        }
    }

    async fn generate(fqdn: &[String], ip: &[String], out_dir: &Path) -> Result<()> {
        let request = CertificateRequest::validated(fqdn, ip)
            .context("refusing to generate a certificate")?;

        let issued = issue_self_signed_ca(&request, out_dir)
            .await
            .with_context(|| format!("failed to generate certificate in {}", out_dir.display()))?;

        info!("Certificate fingerprint (SHA-256): {}", issued.fingerprint());
        println!("{}", issued.cert_path.display());
        println!("{}", issued.key_path.display());

        Ok(())
    }

    async fn install(
        target: TargetKind, from: Option<String>, fqdn: Vec<String>, ip: Vec<String>,
    ) -> Result<()> {
        validate_names(&fqdn).context("invalid --fqdn")?;
        validate_ips(&ip).context("invalid --ip")?;

        let source: CertSource = EnvDefaults::cert_source(from)
            .parse()
            .context("invalid certificate source")?;

        if target != TargetKind::Docker && !(fqdn.is_empty() && ip.is_empty()) {
            warn!("--fqdn and --ip only apply to the docker target, ignoring them");
        }

        let extra_hosts = fqdn.into_iter().chain(ip).collect();

        install_certificate(&source, target, extra_hosts)
            .await
            .with_context(|| format!("failed to install {source} into {target}"))?;

        info!("Installed {} into {}", source, target);
        Ok(())
    }

    async fn serve(from: Option<PathBuf>, port: Option<u16>, host: IpAddr) -> Result<()> {
        let cert_path = EnvDefaults::serve_path(from);
        let port = EnvDefaults::serve_port(port).map_err(anyhow::Error::msg)?;

        if !cert_path.exists() {
            warn!(
                "{} does not exist yet, requests will fail until it does",
                cert_path.display()
            );
        }

        let config = ServeConfig::builder()
            .cert_path(cert_path)
            .host(host)
            .port(port)
            .build()
            .map_err(anyhow::Error::msg)?;

        tokio::select! {
            result = serve_certificate(&config) => {
                result.context("certificate server stopped")
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for shutdown signal")?;
                info!("Shutting down");
                Ok(())
            }
        }
    }
}

pub fn version_info() -> String {
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };

    format!(
        "{} {}\nplatform: {}-{}\nprofile: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS,
        profile
    )
}
