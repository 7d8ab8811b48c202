use std::fmt;
use std::net::Ipv4Addr;
use std::path::{
    Path,
    PathBuf,
};

use log::{
    debug,
    info,
};
use rand::TryRngCore;
use rand::rngs::OsRng;
use rcgen::{
    BasicConstraints,
    CertificateParams,
    DistinguishedName,
    DnType,
    ExtendedKeyUsagePurpose,
    IsCa,
    KeyPair,
    KeyUsagePurpose,
    PKCS_ECDSA_P384_SHA384,
    SanType,
    SerialNumber,
};
use sha2::{
    Digest,
    Sha256,
};
use time::{
    Duration,
    OffsetDateTime,
};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{
    Error,
    Result,
};
use crate::validate::{
    validate_ips,
    validate_names,
};

pub const CERT_FILE_NAME: &str = "cert.pem";
pub const KEY_FILE_NAME: &str = "key.pem";

/// Subtracted from the issuance time so hosts with a lagging clock still
/// accept the certificate.
pub const CLOCK_SKEW_MARGIN: Duration = Duration::hours(1);
pub const VALIDITY_PERIOD: Duration = Duration::days(365);

const SERIAL_LEN: usize = 16;
const KEY_FILE_MODE: u32 = 0o600;

/// Subject alternative names for one issuance. Duplicates are dropped, first
/// occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateRequest {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<Ipv4Addr>,
}

impl CertificateRequest {
    /// Builds a request without checking the names. IP literals still have to
    /// parse, since they are embedded in binary form.
    pub fn new<N, I>(names: &[N], ips: &[I]) -> Result<Self>
    where
        N: AsRef<str>,
        I: AsRef<str>,
    {
        let mut request = Self::default();

        for name in names {
            let name = name.as_ref().to_string();
            if !request.dns_names.contains(&name) {
                request.dns_names.push(name);
            }
        }

        for ip in ips {
            let addr: Ipv4Addr = ip
                .as_ref()
                .parse()
                .map_err(|_| Error::InvalidIpAddress(ip.as_ref().to_string()))?;
            if !request.ip_addresses.contains(&addr) {
                request.ip_addresses.push(addr);
            }
        }

        Ok(request)
    }

    /// Runs the hostname and IP validators first; an empty request is refused.
    pub fn validated<N, I>(names: &[N], ips: &[I]) -> Result<Self>
    where
        N: AsRef<str>,
        I: AsRef<str>,
    {
        if names.is_empty() && ips.is_empty() {
            return Err(Error::EmptyRequest);
        }

        validate_names(names)?;
        validate_ips(ips)?;

        Self::new(names, ips)
    }

    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ip_addresses.is_empty()
    }

    fn subject_alt_names(&self) -> Result<Vec<SanType>> {
        let mut sans = Vec::with_capacity(self.dns_names.len() + self.ip_addresses.len());

        for name in &self.dns_names {
            sans.push(SanType::DnsName(
                name.as_str()
                    .try_into()
                    .map_err(|_| Error::InvalidHostname(name.clone()))?,
            ));
        }

        sans.extend(
            self.ip_addresses
                .iter()
                .map(|ip| SanType::IpAddress((*ip).into())),
        );

        Ok(sans)
    }
}

/// File names used for the artifact pair inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub certificate: String,
    pub private_key: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            certificate: CERT_FILE_NAME.to_string(),
            private_key: KEY_FILE_NAME.to_string(),
        }
    }
}

pub struct IssuedCa {
    pub cert_der: Vec<u8>,
    pub cert_pem: String,
    pub key_der: Vec<u8>,
    pub serial: Vec<u8>,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl IssuedCa {
    /// SHA-256 over the certificate DER, as colon separated uppercase hex.
    pub fn fingerprint(&self) -> String {
        Sha256::digest(&self.cert_der)
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl fmt::Debug for IssuedCa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCa")
            .field("serial", &self.serial)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .field("key_der", &"<redacted>")
            .finish()
    }
}

pub async fn issue_self_signed_ca(request: &CertificateRequest, out_dir: &Path) -> Result<IssuedCa> {
    issue_self_signed_ca_in(request, out_dir, &ArtifactNames::default()).await
}

pub async fn issue_self_signed_ca_in(
    request: &CertificateRequest, out_dir: &Path, names: &ArtifactNames,
) -> Result<IssuedCa> {
    info!(
        "Issuing self-signed CA (names: {:?}, ips: {:?}, out_dir: {})",
        request.dns_names,
        request.ip_addresses,
        out_dir.display()
    );

    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384)
        .map_err(|e| Error::crypto("failed to generate private key", e))?;

    let serial = random_serial()?;

    // X.509 time has second precision
    let now = OffsetDateTime::now_utc();
    let now = now - Duration::nanoseconds(i64::from(now.nanosecond()));
    let not_before = now - CLOCK_SKEW_MARGIN;
    let not_after = now + VALIDITY_PERIOD;
    info!("Certificate valid from {} until {}", not_before, not_after);

    let mut params = CertificateParams::default();
    params.serial_number = Some(SerialNumber::from_slice(&serial));
    params.not_before = not_before;
    params.not_after = not_after;
    params.distinguished_name = ca_distinguished_name();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.subject_alt_names = request.subject_alt_names()?;

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| Error::crypto("failed to generate certificate", e))?;

    let cert_pem = cert.pem();
    let key_pem = key_pair.serialize_pem();

    let cert_path = out_dir.join(&names.certificate);
    let key_path = out_dir.join(&names.private_key);

    write_artifacts(&cert_path, cert_pem.clone(), &key_path, key_pem).await?;

    for path in [&cert_path, &key_path] {
        ensure_artifact(path).await?;
    }

    Ok(IssuedCa {
        cert_der: cert.der().to_vec(),
        cert_pem,
        key_der: key_pair.serialize_der(),
        serial: serial.to_vec(),
        not_before,
        not_after,
        cert_path,
        key_path,
    })
}

fn ca_distinguished_name() -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "Confiar Self-Signed CA");
    dn.push(DnType::OrganizationName, "Confiar Organization");
    dn.push(DnType::OrganizationalUnitName, "Confiar Organizational Unit");
    dn.push(DnType::LocalityName, "Confiar Locality");
    dn.push(DnType::StateOrProvinceName, "Confiar Province");
    dn
}

fn random_serial() -> Result<[u8; SERIAL_LEN]> {
    let mut serial = [0u8; SERIAL_LEN];
    OsRng
        .try_fill_bytes(&mut serial)
        .map_err(|e| Error::Entropy(format!("failed to generate serial number: {e}")))?;
    Ok(serial)
}

/// Writes both artifacts as independent tasks and waits for both. A failure in
/// one does not undo the other.
async fn write_artifacts(
    cert_path: &Path, cert_pem: String, key_path: &Path, key_pem: String,
) -> Result<()> {
    let cert_task = tokio::spawn(write_cert_file(cert_path.to_path_buf(), cert_pem));
    let key_task = tokio::spawn(write_key_file(key_path.to_path_buf(), key_pem));

    let (cert_result, key_result) = tokio::join!(cert_task, key_task);

    let cert_result = cert_result
        .map_err(|e| Error::io("write task failed for", cert_path, std::io::Error::other(e)))
        .and_then(|r| r);
    let key_result = key_result
        .map_err(|e| Error::io("write task failed for", key_path, std::io::Error::other(e)))
        .and_then(|r| r);

    cert_result?;
    key_result?;

    Ok(())
}

async fn write_cert_file(path: PathBuf, pem: String) -> Result<()> {
    fs::write(&path, pem)
        .await
        .map_err(|e| Error::io("failed to write file", &path, e))?;

    info!("Wrote certificate to {}", path.display());
    Ok(())
}

async fn write_key_file(path: PathBuf, pem: String) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(KEY_FILE_MODE);

    let mut file = options
        .open(&path)
        .await
        .map_err(|e| Error::io("failed to create file", &path, e))?;

    file.write_all(pem.as_bytes())
        .await
        .map_err(|e| Error::io("failed to write file", &path, e))?;
    file.sync_all()
        .await
        .map_err(|e| Error::io("failed to close file", &path, e))?;

    // mode() only applies on creation; tighten files left by an earlier run too
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&path, std::fs::Permissions::from_mode(KEY_FILE_MODE))
            .await
            .map_err(|e| Error::io("failed to restrict permissions on", &path, e))?;
    }

    info!("Wrote private key to {}", path.display());
    Ok(())
}

async fn ensure_artifact(path: &Path) -> Result<()> {
    let meta = match fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ArtifactMissing(path.to_path_buf()));
        }
        Err(e) => return Err(Error::io("failed to stat", path, e)),
    };

    if !meta.is_file() || meta.len() == 0 {
        return Err(Error::ArtifactMissing(path.to_path_buf()));
    }

    fs::File::open(path)
        .await
        .map_err(|e| Error::io("failed to open", path, e))?;

    debug!("Verified artifact {} ({} bytes)", path.display(), meta.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::net::IpAddr;

    use x509_parser::extensions::GeneralName;
    use x509_parser::prelude::*;

    use super::*;

    fn parse_sans(der: &[u8]) -> (BTreeSet<String>, BTreeSet<IpAddr>) {
        let (_, cert) = parse_x509_certificate(der).unwrap();
        let san = cert.subject_alternative_name().unwrap().unwrap();

        let mut dns = BTreeSet::new();
        let mut ips = BTreeSet::new();
        for name in &san.value.general_names {
            match name {
                GeneralName::DNSName(value) => {
                    dns.insert(value.to_string());
                }
                GeneralName::IPAddress(bytes) => {
                    let octets: [u8; 4] = (*bytes).try_into().unwrap();
                    ips.insert(IpAddr::from(octets));
                }
                other => panic!("unexpected SAN entry: {other:?}"),
            }
        }
        (dns, ips)
    }

    #[test]
    fn test_request_dedupes_preserving_order() {
        let request = CertificateRequest::new(
            &["b.example.com", "a.example.com", "b.example.com"],
            &["10.0.0.5", "10.0.0.5", "192.168.1.1"],
        )
        .unwrap();

        assert_eq!(request.dns_names, vec!["b.example.com", "a.example.com"]);
        assert_eq!(
            request.ip_addresses,
            vec![Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(192, 168, 1, 1)]
        );
    }

    #[test]
    fn test_validated_request_rejects_bad_input() {
        let err = CertificateRequest::validated::<&str, &str>(&[], &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyRequest));

        let err = CertificateRequest::validated(&["not a host"], &["10.0.0.5"]).unwrap_err();
        assert!(matches!(err, Error::InvalidHostname(_)));

        let err = CertificateRequest::validated(&["ok.example.com"], &["10.0.0.256"]).unwrap_err();
        assert!(matches!(err, Error::InvalidIpAddress(_)));
    }

    #[tokio::test]
    async fn test_issue_embeds_requested_sans() {
        let temp_dir = tempfile::tempdir().unwrap();
        let request = CertificateRequest::validated(
            &["registry.example.com", "example.com"],
            &["10.0.0.5", "127.0.0.1"],
        )
        .unwrap();

        let issued = issue_self_signed_ca(&request, temp_dir.path()).await.unwrap();

        let (dns, ips) = parse_sans(&issued.cert_der);
        assert_eq!(
            dns,
            BTreeSet::from(["registry.example.com".to_string(), "example.com".to_string()])
        );
        assert_eq!(
            ips,
            BTreeSet::from([
                IpAddr::from([10, 0, 0, 5]),
                IpAddr::from([127, 0, 0, 1])
            ])
        );
    }

    #[tokio::test]
    async fn test_issued_certificate_is_a_ca() {
        let temp_dir = tempfile::tempdir().unwrap();
        let request = CertificateRequest::new(&["ca.example.com"], &[] as &[&str]).unwrap();

        let issued = issue_self_signed_ca(&request, temp_dir.path()).await.unwrap();
        let (_, cert) = parse_x509_certificate(&issued.cert_der).unwrap();

        assert_eq!(cert.subject().as_raw(), cert.issuer().as_raw());

        let constraints = cert.basic_constraints().unwrap().unwrap();
        assert!(constraints.value.ca);

        let key_usage = cert.key_usage().unwrap().unwrap();
        assert!(key_usage.value.digital_signature());
        assert!(key_usage.value.key_cert_sign());

        let ext_key_usage = cert.extended_key_usage().unwrap().unwrap();
        assert!(ext_key_usage.value.server_auth);

        let strip = |bytes: &[u8]| bytes.iter().copied().skip_while(|b| *b == 0).collect::<Vec<_>>();
        assert_eq!(strip(cert.tbs_certificate.raw_serial()), strip(&issued.serial));
    }

    #[tokio::test]
    async fn test_validity_window() {
        let temp_dir = tempfile::tempdir().unwrap();
        let request = CertificateRequest::new(&["time.example.com"], &[] as &[&str]).unwrap();

        let before_issue = OffsetDateTime::now_utc();
        let issued = issue_self_signed_ca(&request, temp_dir.path()).await.unwrap();
        let (_, cert) = parse_x509_certificate(&issued.cert_der).unwrap();

        let not_before = cert.validity().not_before.to_datetime();
        let not_after = cert.validity().not_after.to_datetime();

        assert!(not_before < before_issue);
        assert_eq!(not_after - not_before, VALIDITY_PERIOD + CLOCK_SKEW_MARGIN);
    }

    #[tokio::test]
    async fn test_key_file_is_owner_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let request = CertificateRequest::new(&["perm.example.com"], &[] as &[&str]).unwrap();

        let issued = issue_self_signed_ca(&request, temp_dir.path()).await.unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = std::fs::metadata(&issued.key_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
        assert!(std::fs::metadata(&issued.cert_path).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn test_missing_output_dir_fails_without_panic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        let request = CertificateRequest::new(&["x.example.com"], &[] as &[&str]).unwrap();

        let err = issue_self_signed_ca(&request, &missing).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.category(), crate::error::ErrorCategory::Filesystem);
    }

    #[tokio::test]
    async fn test_custom_artifact_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let request = CertificateRequest::new(&["named.example.com"], &[] as &[&str]).unwrap();
        let names = ArtifactNames {
            certificate: "ca.crt".to_string(),
            private_key: "ca.key".to_string(),
        };

        let issued = issue_self_signed_ca_in(&request, temp_dir.path(), &names)
            .await
            .unwrap();

        assert_eq!(issued.cert_path, temp_dir.path().join("ca.crt"));
        assert_eq!(issued.key_path, temp_dir.path().join("ca.key"));
        assert!(issued.cert_path.exists());
        assert!(issued.key_path.exists());
    }

    #[tokio::test]
    async fn test_ensure_artifact_checks_presence_size_and_access() {
        let temp_dir = tempfile::tempdir().unwrap();

        let absent = temp_dir.path().join("absent.pem");
        assert!(matches!(
            ensure_artifact(&absent).await,
            Err(Error::ArtifactMissing(ref p)) if p == &absent
        ));

        let empty = temp_dir.path().join("empty.pem");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            ensure_artifact(&empty).await,
            Err(Error::ArtifactMissing(_))
        ));

        assert!(matches!(
            ensure_artifact(temp_dir.path()).await,
            Err(Error::ArtifactMissing(_))
        ));

        let present = temp_dir.path().join("cert.pem");
        std::fs::write(&present, b"pem").unwrap();
        ensure_artifact(&present).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ensure_artifact_rejects_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let locked = temp_dir.path().join("key.pem");
        std::fs::write(&locked, b"secret").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // privileged users read through mode bits
        if std::fs::File::open(&locked).is_ok() {
            return;
        }

        let err = ensure_artifact(&locked).await.unwrap_err();
        assert!(matches!(err, Error::Io { ref path, .. } if path == &locked));
    }

    #[test]
    fn test_fingerprint_format_and_debug_redaction() {
        let issued = IssuedCa {
            cert_der: vec![1, 2, 3],
            cert_pem: String::new(),
            key_der: vec![0xAA; 8],
            serial: vec![1],
            not_before: OffsetDateTime::UNIX_EPOCH,
            not_after: OffsetDateTime::UNIX_EPOCH,
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
        };

        let fingerprint = issued.fingerprint();
        assert_eq!(fingerprint.split(':').count(), 32);
        assert!(fingerprint.starts_with("03:90:58:C6"));

        let debug = format!("{issued:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("key_der: ["));
    }
}
