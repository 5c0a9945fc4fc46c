use super::grammar::{is_domain, is_ip};
use super::scope::{Rejection, ScopeSnapshot};
use super::types::{merge_unique, DomainRecord};

/// Result of normalizing one domain token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainAdmission {
    pub result: Result<DomainRecord, Rejection>,
    /// `*.<domain>` to add to the inscope list once the batch is done.
    pub scope_expansion: Option<String>,
}

/// Cleans raw domain tokens of the form `host[:ip,ip,...]` and decides
/// whether they are admissible for a program.
pub struct DomainNormalizer<'a> {
    scope: &'a ScopeSnapshot,
}

impl<'a> DomainNormalizer<'a> {
    pub fn new(scope: &'a ScopeSnapshot) -> Self {
        Self { scope }
    }

    pub fn normalize(&self, token: &str) -> DomainAdmission {
        let token = token.trim().to_lowercase();
        let (raw_domain, ips) = split_embedded_ips(&token);

        let blacklisted_ip = ips.iter().any(|ip| self.scope.is_blacklisted(ip));

        let mut domain = raw_domain.strip_suffix('.').unwrap_or(raw_domain);

        let mut scope_expansion = None;
        if let Some(bare) = domain.strip_prefix("*.") {
            domain = bare;
            if is_domain(bare) && !self.scope.is_outscope(bare) && self.scope.is_inscope(bare) {
                scope_expansion = Some(format!("*.{}", bare));
            }
        }

        let result = if blacklisted_ip || self.scope.is_blacklisted(domain) {
            Err(Rejection::Blacklisted)
        } else if !is_domain(domain) {
            Err(Rejection::Malformed)
        } else {
            self.scope.admit_host(domain).map(|_| DomainRecord {
                hostname: domain.to_string(),
                ips,
            })
        };

        DomainAdmission {
            result,
            scope_expansion,
        }
    }
}

/// Parses `host[:ip,...]` for an update, without any scope admission.
/// Invalid IPs are dropped; a host failing the grammar drops the token.
pub fn parse_domain_update(token: &str) -> Option<DomainRecord> {
    let token = token.trim().to_lowercase();
    let (raw_domain, ips) = split_embedded_ips(&token);
    let domain = raw_domain.strip_suffix('.').unwrap_or(raw_domain);
    if !is_domain(domain) {
        return None;
    }
    Some(DomainRecord {
        hostname: domain.to_string(),
        ips,
    })
}

fn split_embedded_ips(token: &str) -> (&str, Vec<String>) {
    match token.split_once(':') {
        Some((domain, list)) => {
            let mut ips = Vec::new();
            merge_unique(
                &mut ips,
                list.split(',')
                    .map(str::trim)
                    .filter(|ip| is_ip(ip))
                    .map(str::to_string),
            );
            (domain, ips)
        }
        None => (token, Vec::new()),
    }
}
