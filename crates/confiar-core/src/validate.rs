use std::net::{
    IpAddr,
    Ipv4Addr,
};

use crate::error::{
    Error,
    Result,
};

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Returns true when `name` is a dotted-label DNS name usable as a subject
/// alternative name. IP literals are rejected; use [`is_valid_ipv4`] for those.
pub fn is_valid_hostname(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }

    if name.parse::<IpAddr>().is_ok() {
        return false;
    }

    let labels: Vec<&str> = name.split('.').collect();
    if !labels.iter().all(|label| is_valid_label(label)) {
        return false;
    }

    match labels.last() {
        Some(tld) => tld.len() >= 2 && tld.chars().any(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return false;
    }

    let bytes = label.as_bytes();
    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return false;
    }

    bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
}

/// Dotted-decimal IPv4 only: four octets, each `0..=255`, no leading zeros.
pub fn is_valid_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

pub fn validate_names<S: AsRef<str>>(names: &[S]) -> Result<()> {
    match names.iter().find(|name| !is_valid_hostname(name.as_ref())) {
        Some(name) => Err(Error::InvalidHostname(name.as_ref().to_string())),
        None => Ok(()),
    }
}

pub fn validate_ips<S: AsRef<str>>(ips: &[S]) -> Result<()> {
    match ips.iter().find(|ip| !is_valid_ipv4(ip.as_ref())) {
        Some(ip) => Err(Error::InvalidIpAddress(ip.as_ref().to_string())),
        None => Ok(()),
    }
}
