use super::grammar::{clean_hostname, is_domain, is_ip};
use super::scope::{Rejection, ScopeSnapshot};
use super::types::{merge_unique, IpRecord};

/// Cleans raw IP tokens of the form `ip[:domain,domain,...]`.
///
/// IPs are not matched against the in/out scope lists, only the blacklist
/// and the grammar apply.
pub struct IpNormalizer<'a> {
    scope: &'a ScopeSnapshot,
    blacklist_embedded_domains: bool,
}

impl<'a> IpNormalizer<'a> {
    pub fn new(scope: &'a ScopeSnapshot) -> Self {
        Self {
            scope,
            blacklist_embedded_domains: false,
        }
    }

    /// When set, an IP carrying a blacklisted domain is rejected, mirroring
    /// what the domain path does with blacklisted IPs.
    pub fn with_embedded_domain_blacklist(mut self, enabled: bool) -> Self {
        self.blacklist_embedded_domains = enabled;
        self
    }

    pub fn normalize(&self, token: &str) -> Result<IpRecord, Rejection> {
        let (address, domains) = split_embedded_domains(token.trim());

        if self.blacklist_embedded_domains && domains.iter().any(|d| self.scope.is_blacklisted(d))
        {
            return Err(Rejection::Blacklisted);
        }
        if self.scope.is_blacklisted(address) {
            return Err(Rejection::Blacklisted);
        }
        if !is_ip(address) {
            return Err(Rejection::Malformed);
        }

        Ok(IpRecord {
            address: address.to_string(),
            domains,
        })
    }
}

/// Parses `ip[:domain,...]` for an update, without admission checks.
pub fn parse_ip_update(token: &str) -> Option<IpRecord> {
    let (address, domains) = split_embedded_domains(token.trim());
    if !is_ip(address) {
        return None;
    }
    Some(IpRecord {
        address: address.to_string(),
        domains,
    })
}

fn split_embedded_domains(token: &str) -> (&str, Vec<String>) {
    match token.split_once(':') {
        Some((address, list)) => {
            let mut domains = Vec::new();
            merge_unique(
                &mut domains,
                list.split(',')
                    .map(clean_hostname)
                    .filter(|d| is_domain(d)),
            );
            (address, domains)
        }
        None => (token, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(blacklist: &[&str]) -> ScopeSnapshot {
        ScopeSnapshot::new(
            vec!["*.example.com".to_string()],
            vec![],
            blacklist.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_plain_ip() {
        let scope = snapshot(&[]);
        let record = IpNormalizer::new(&scope).normalize("10.0.0.1").unwrap();
        assert_eq!(record.address, "10.0.0.1");
        assert!(record.domains.is_empty());

        let record = IpNormalizer::new(&scope).normalize("10.0.0.0/24").unwrap();
        assert_eq!(record.address, "10.0.0.0/24");
    }

    #[test]
    fn test_ip_admission_ignores_scope_lists() {
        // 8.8.8.8 matches no inscope pattern but IPs only face blacklist and grammar
        let scope = snapshot(&[]);
        assert!(IpNormalizer::new(&scope).normalize("8.8.8.8").is_ok());
    }

    #[test]
    fn test_embedded_domains() {
        let scope = snapshot(&[]);
        let record = IpNormalizer::new(&scope)
            .normalize("1.2.3.4:WWW.example.com.,bad_host,api.example.com")
            .unwrap();
        assert_eq!(
            record.domains,
            vec!["www.example.com".to_string(), "api.example.com".to_string()]
        );
    }

    #[test]
    fn test_rejections() {
        let scope = snapshot(&["10.0.0.1"]);
        let normalizer = IpNormalizer::new(&scope);
        assert_eq!(normalizer.normalize("10.0.0.1"), Err(Rejection::Blacklisted));
        assert_eq!(normalizer.normalize("10.0.0"), Err(Rejection::Malformed));
        assert_eq!(normalizer.normalize("example.com"), Err(Rejection::Malformed));
        assert_eq!(normalizer.normalize(""), Err(Rejection::Malformed));
    }

    #[test]
    fn test_embedded_domain_blacklist_switch() {
        let scope = snapshot(&["evil.example.com"]);
        let token = "1.2.3.4:evil.example.com";

        assert!(IpNormalizer::new(&scope).normalize(token).is_ok());
        assert_eq!(
            IpNormalizer::new(&scope)
                .with_embedded_domain_blacklist(true)
                .normalize(token),
            Err(Rejection::Blacklisted)
        );
    }

    #[test]
    fn test_parse_ip_update() {
        let record = parse_ip_update("1.2.3.4:a.example.com.,%%").unwrap();
        assert_eq!(record.domains, vec!["a.example.com".to_string()]);
        assert_eq!(parse_ip_update("1.2.3.4").unwrap().domains.len(), 0);
        assert_eq!(parse_ip_update("host.example.com:1.2.3.4"), None);
    }
}
