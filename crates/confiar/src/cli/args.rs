use std::net::IpAddr;
use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use confiar_core::TargetKind;

#[derive(Parser, Debug)]
#[command(name = "confiar")]
#[command(about = "Self-signed TLS certificates made easy")]
#[command(
    long_about = "confiar lets you generate a self-signed certificate authority and \
                  distribute trust in it to other hosts.\n\n\
                  You should consider using a real certificate before anything else."
)]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Set the global log level (error, warn, info, debug, trace, off)",
        value_name = "LEVEL"
    )]
    pub log_level: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Append logs to this file instead of stderr",
        value_name = "PATH"
    )]
    pub logs_to_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a new self-signed CA certificate and key (cert.pem, key.pem)
    #[command(
        long_about = "Create a new CA certificate and private key. Existing cert.pem and \
                      key.pem in the output directory are overwritten.\n\n\
                      The certificate is its own authority, is valid from one hour ago \
                      for 365 days and uses ECDSA P-384."
    )]
    Generate {
        #[arg(
            long,
            value_delimiter = ',',
            help = "Domain name(s) for the certificate (comma separated)",
            value_name = "FQDN"
        )]
        fqdn: Vec<String>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "IP address(es) for the certificate (comma separated)",
            value_name = "IP"
        )]
        ip: Vec<String>,

        #[arg(
            short = 'o',
            long,
            default_value = ".",
            help = "Directory to write cert.pem and key.pem into",
            value_name = "DIR"
        )]
        out_dir: PathBuf,
    },

    /// Install a certificate into the chosen trust target
    #[command(
        long_about = "Let this machine trust a certificate. Targets that map certificates \
                      to hostnames read the names from the certificate; pass --fqdn or --ip \
                      for hostnames the certificate does not declare."
    )]
    Install {
        #[arg(
            short = 't',
            long,
            default_value = "stdout",
            value_parser = parse_target,
            help = "Installation target (stdout, docker, system)"
        )]
        target: TargetKind,

        #[arg(
            short = 'f',
            long,
            help = "Certificate path or http(s) URL [env: CONFIAR_CERT, default: ./cert.pem]",
            value_name = "SOURCE"
        )]
        from: Option<String>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Additional domain name(s) (comma separated)",
            value_name = "FQDN"
        )]
        fqdn: Vec<String>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Additional IP address(es) (comma separated)",
            value_name = "IP"
        )]
        ip: Vec<String>,
    },

    /// Serve the generated certificate over plain HTTP
    #[command(
        long_about = "Share the certificate with other hosts. Clients run install with the \
                      current host as source, e.g. --from http://10.11.12.13:8787"
    )]
    Serve {
        #[arg(
            short = 'f',
            long,
            help = "Certificate to serve [env: CONFIAR_CERT, default: ./cert.pem]",
            value_name = "PATH"
        )]
        from: Option<PathBuf>,

        #[arg(
            short = 'p',
            long,
            help = "Port to listen on [env: CONFIAR_SERVE_PORT, default: 8787]"
        )]
        port: Option<u16>,

        #[arg(short = 'H', long, default_value = "0.0.0.0", help = "Address to bind to")]
        host: IpAddr,
    },

    /// Print build information
    #[command(alias = "buildinfo")]
    Version,
}

fn parse_target(value: &str) -> Result<TargetKind, String> {
    value.parse::<TargetKind>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_splits_comma_lists() {
        let cli = Cli::parse_from([
            "confiar",
            "generate",
            "--fqdn",
            "a.example.com,b.example.com",
            "--ip",
            "10.0.0.5",
        ]);

        match cli.command {
            Command::Generate { fqdn, ip, out_dir } => {
                assert_eq!(fqdn, vec!["a.example.com", "b.example.com"]);
                assert_eq!(ip, vec!["10.0.0.5"]);
                assert_eq!(out_dir, PathBuf::from("."));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_install_defaults_to_stdout() {
        let cli = Cli::parse_from(["confiar", "install"]);

        match cli.command {
            Command::Install {
                target,
                from,
                fqdn,
                ip,
            } => {
                assert_eq!(target, TargetKind::Stdout);
                assert!(from.is_none());
                assert!(fqdn.is_empty());
                assert!(ip.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let result = Cli::try_parse_from(["confiar", "install", "--target", "podman"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_log_level_after_subcommand() {
        let cli = Cli::parse_from(["confiar", "serve", "--log-level", "debug", "-p", "9000"]);

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Serve { port: Some(9000), .. }));
    }
}
