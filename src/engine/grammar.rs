use once_cell::sync::Lazy;
use regex::Regex;

/// Dot separated labels of 1-63 lowercase alphanumerics or hyphens, no label
/// starting or ending with a hyphen, at least two labels.
pub static DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$")
        .unwrap()
});

/// IPv4 dotted quad with an optional `/0`..`/32` suffix.
pub static IP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,3}\.){3}[0-9]{1,3}(/([0-9]|[1-2][0-9]|3[0-2]))?$").unwrap()
});

pub fn is_domain(candidate: &str) -> bool {
    DOMAIN_REGEX.is_match(candidate)
}

pub fn is_ip(candidate: &str) -> bool {
    IP_REGEX.is_match(candidate)
}

/// Lowercases and drops a single trailing dot (FQDN form).
pub fn clean_hostname(raw: &str) -> String {
    let mut host = raw.trim().to_lowercase();
    if host.ends_with('.') {
        host.pop();
    }
    host
}
