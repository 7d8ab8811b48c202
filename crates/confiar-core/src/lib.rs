//! Self-signed CA issuance and trust distribution.
//!
//! [`issuer`] creates a CA certificate and key pair on disk, [`install`]
//! teaches a trust store to accept it, and [`distribute`] moves the
//! certificate between hosts over plain HTTP.

pub mod distribute;
pub mod error;
pub mod install;
pub mod issuer;
pub mod validate;

pub use distribute::{
    CertSource,
    ServeConfig,
    install_certificate,
    serve_certificate,
};
pub use error::{
    Error,
    ErrorCategory,
    Result,
};
pub use install::{
    DockerTarget,
    InstallTarget,
    Installer,
    PrintTarget,
    SystemTarget,
    TargetKind,
};
pub use issuer::{
    ArtifactNames,
    CertificateRequest,
    IssuedCa,
    issue_self_signed_ca,
    issue_self_signed_ca_in,
};
pub use validate::{
    is_valid_hostname,
    is_valid_ipv4,
};
