use crate::error::CidrError;
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::{debug, warn};

/// Returns whether `ip` lies inside `cidr`.
pub fn in_range(ip: &str, cidr: &str) -> Result<bool, CidrError> {
    let network = IpNetwork::from_str(cidr.trim())
        .map_err(|_| CidrError::InvalidNetwork(cidr.to_string()))?;
    let addr =
        IpAddr::from_str(ip.trim()).map_err(|_| CidrError::InvalidAddress(ip.to_string()))?;
    Ok(network.contains(addr))
}

/// Static list of CDN-owned ranges; IPs inside any of them are dropped.
#[derive(Debug, Default, Clone)]
pub struct CdnFilter {
    networks: Vec<IpNetwork>,
}

impl CdnFilter {
    /// Parses one CIDR per line. Blank lines and `#` comments are ignored,
    /// malformed lines are skipped with a warning.
    pub fn from_lines(text: &str) -> Self {
        let networks = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| match IpNetwork::from_str(line) {
                Ok(network) => Some(network),
                Err(e) => {
                    warn!("Skipping invalid CIDR '{}' in CDN filter: {}", line, e);
                    None
                }
            })
            .collect();
        Self { networks }
    }

    pub fn range_count(&self) -> usize {
        self.networks.len()
    }

    pub fn is_cdn(&self, ip: &IpAddr) -> bool {
        self.networks.iter().any(|network| network.contains(*ip))
    }

    /// Keeps the IPs matched by no range. Entries that are not plain
    /// addresses (stored CIDR ranges) cannot be attributed and are kept.
    pub fn retain_non_cdn(&self, ips: Vec<String>) -> Vec<String> {
        ips.into_iter()
            .filter(|entry| match IpAddr::from_str(entry) {
                Ok(addr) => !self.is_cdn(&addr),
                Err(_) => {
                    debug!("Not filtering non-address entry '{}'", entry);
                    true
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range() {
        assert_eq!(in_range("10.0.0.5", "10.0.0.0/24"), Ok(true));
        assert_eq!(in_range("10.0.1.5", "10.0.0.0/24"), Ok(false));
        assert_eq!(in_range("10.0.0.5", "10.0.0.5"), Ok(true));
    }

    #[test]
    fn test_in_range_errors() {
        assert_eq!(
            in_range("10.0.0.5", "10.0.0.0/40"),
            Err(CidrError::InvalidNetwork("10.0.0.0/40".to_string()))
        );
        assert_eq!(
            in_range("not-an-ip", "10.0.0.0/24"),
            Err(CidrError::InvalidAddress("not-an-ip".to_string()))
        );
    }

    #[test]
    fn test_cdn_filter() {
        let filter = CdnFilter::from_lines(
            "# cloudflare\n104.16.0.0/13\n\nnonsense\n172.64.0.0/13\n",
        );
        assert_eq!(filter.range_count(), 2);

        let kept = filter.retain_non_cdn(vec![
            "104.16.1.1".to_string(),
            "8.8.8.8".to_string(),
            "172.65.0.1".to_string(),
            "10.0.0.0/8".to_string(),
        ]);
        assert_eq!(kept, vec!["8.8.8.8".to_string(), "10.0.0.0/8".to_string()]);
    }
}
