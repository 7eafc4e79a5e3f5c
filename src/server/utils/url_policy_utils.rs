use url::{Host, Url};

/// video hosts the relay is willing to talk to, a host matches when it is one of these or a
/// subdomain of one
pub const ALLOWED_DOMAINS: &[&str] = &[
    "whatbox.ca",
    "panda.whatbox.ca",
    "greip.whatbox.ca",
    "santol.whatbox.ca",
    "honeydew.whatbox.ca",
    "durian.whatbox.ca",
    "storage.googleapis.com",
    "cloudflare.com",
    "r2.cloudflarestorage.com",
    "b-cdn.net",
    "bunny.net",
    "dramaqueen.iseries.my.id",
];

/// why a target was refused, only ever logged
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("invalid URL format")]
    InvalidUrl,

    #[error("invalid protocol: {0}")]
    InvalidScheme(String),

    #[error("private address not allowed: {0}")]
    PrivateAddress(String),

    #[error("domain not whitelisted: {0}")]
    DomainNotAllowed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed(Url),
    Rejected(RejectReason),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Target validation for the video relay.
///
/// Checks run in a fixed order and the first failure wins: parse, scheme, private address,
/// allowlist. The private address check only looks at the literal hostname. Nothing is resolved,
/// so a public name pointing at an internal address (or rebinding to one after this check) still
/// gets through. IPv6 ranges other than `::1` are not filtered either.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    allowed_domains: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self::new(ALLOWED_DOMAINS.iter().copied())
    }
}

impl UrlPolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_domains: domains
                .into_iter()
                .map(|d| d.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn evaluate(&self, target: &str) -> PolicyDecision {
        match Url::parse(target) {
            Ok(url) => self.evaluate_url(url),
            Err(_) => PolicyDecision::Rejected(RejectReason::InvalidUrl),
        }
    }

    pub fn evaluate_url(&self, url: Url) -> PolicyDecision {
        if url.scheme() != "http" && url.scheme() != "https" {
            return PolicyDecision::Rejected(RejectReason::InvalidScheme(url.scheme().to_string()));
        }

        let Some(hostname) = hostname(&url) else {
            return PolicyDecision::Rejected(RejectReason::InvalidUrl);
        };

        if is_private_host(&hostname) {
            return PolicyDecision::Rejected(RejectReason::PrivateAddress(hostname));
        }

        if !self.is_allowed_domain(&hostname) {
            return PolicyDecision::Rejected(RejectReason::DomainNotAllowed(hostname));
        }

        PolicyDecision::Allowed(url)
    }

    /// exact match or a `.domain` suffix, no wildcards
    pub fn is_allowed_domain(&self, hostname: &str) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        self.allowed_domains.iter().any(|domain| {
            hostname == *domain
                || hostname
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// host without the brackets url puts around ipv6 literals
fn hostname(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_ascii_lowercase()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// literal hostname check against loopback, rfc1918, link-local, "this network" and the
/// 100.64.0.0/10 shared range
pub fn is_private_host(hostname: &str) -> bool {
    if matches!(hostname, "localhost" | "127.0.0.1" | "::1") {
        return true;
    }

    if ["10.", "192.168.", "169.254.", "0."]
        .iter()
        .any(|prefix| hostname.starts_with(prefix))
    {
        return true;
    }

    second_label_in(hostname, "172.", 16..=31) || second_label_in(hostname, "100.", 64..=127)
}

// "172.20.x" -> is 20 in range, the label has to be followed by another one
fn second_label_in(hostname: &str, prefix: &str, range: std::ops::RangeInclusive<u8>) -> bool {
    let Some(rest) = hostname.strip_prefix(prefix) else {
        return false;
    };

    match rest.split_once('.') {
        Some((label, _)) => {
            !label.is_empty()
                && label.bytes().all(|b| b.is_ascii_digit())
                && label.parse::<u8>().is_ok_and(|n| range.contains(&n))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_prefixes() {
        for host in [
            "localhost",
            "127.0.0.1",
            "::1",
            "10.1.2.3",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.1",
            "169.254.169.254",
            "0.0.0.0",
            "100.64.0.1",
            "100.127.255.254",
        ] {
            assert!(is_private_host(host), "{} should be private", host);
        }
    }

    #[test]
    fn public_neighbours_of_private_ranges() {
        for host in [
            "172.15.0.1",
            "172.32.0.1",
            "100.63.0.1",
            "100.128.0.1",
            "11.0.0.1",
            "192.169.0.1",
            "8.8.8.8",
            "storage.googleapis.com",
        ] {
            assert!(!is_private_host(host), "{} should be public", host);
        }
    }

    #[test]
    fn subdomain_needs_a_dot_boundary() {
        let policy = UrlPolicy::default();
        assert!(policy.is_allowed_domain("b-cdn.net"));
        assert!(policy.is_allowed_domain("vz-1234.b-cdn.net"));
        assert!(policy.is_allowed_domain("Storage.GoogleApis.com"));
        assert!(!policy.is_allowed_domain("evilb-cdn.net"));
        assert!(!policy.is_allowed_domain("b-cdn.net.evil.com"));
    }
}
