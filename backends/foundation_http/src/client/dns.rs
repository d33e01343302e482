use super::errors::DnsError;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Hostname resolution used by [`crate::client::StreamConnector`].
///
/// Pluggable so tests can pin hostnames to local listeners.
pub trait DnsResolver: Send + Sync + Clone {
    /// Resolves `host` and `port` to socket addresses.
    ///
    /// # Errors
    ///
    /// Returns `DnsError` if resolution fails or yields no addresses.
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, DnsError>;
}

/// Resolves every host to one fixed address.
#[derive(Debug, Clone)]
pub struct StaticSocketAddr(SocketAddr);

impl Default for StaticSocketAddr {
    /// Localhost, port 80.
    fn default() -> Self {
        Self(SocketAddr::from(([127, 0, 0, 1], 80)))
    }
}

impl StaticSocketAddr {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl DnsResolver for StaticSocketAddr {
    fn resolve(&self, _host: &str, _port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        Ok(vec![self.0])
    }
}

/// Resolver backed by `std::net::ToSocketAddrs`.
#[derive(Debug, Clone, Default)]
pub struct SystemDnsResolver;

impl SystemDnsResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DnsResolver for SystemDnsResolver {
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        if host.is_empty() {
            return Err(DnsError::InvalidHost(host.to_string()));
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(DnsError::NoAddressesFound(host.to_string()));
        }

        Ok(addrs)
    }
}

/// The resolver a [`crate::client::StreamConnector`] uses unless told otherwise.
pub type DefaultDnsResolver = CachingDnsResolver<SystemDnsResolver>;

#[derive(Debug, Clone)]
struct CachedEntry {
    addresses: Vec<SocketAddr>,
    /// `None` when the TTL is too large to represent; such entries never expire.
    expires_at: Option<Instant>,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Caches another resolver's answers for a fixed TTL.
#[derive(Debug, Clone)]
pub struct CachingDnsResolver<R: DnsResolver> {
    inner: R,
    cache: Arc<Mutex<HashMap<String, CachedEntry>>>,
    ttl: Duration,
}

impl<R: DnsResolver> CachingDnsResolver<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Five-minute TTL.
    pub fn with_default_ttl(inner: R) -> Self {
        Self::new(inner, Duration::from_secs(300))
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cache_size(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl<R: DnsResolver> DnsResolver for CachingDnsResolver<R> {
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        let cache_key = format!("{host}:{port}");

        if let Ok(cache) = self.cache.lock() {
            if let Some(entry) = cache.get(&cache_key) {
                if !entry.is_expired() {
                    return Ok(entry.addresses.clone());
                }
            }
        }

        let addresses = self.inner.resolve(host, port)?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                cache_key,
                CachedEntry {
                    addresses: addresses.clone(),
                    expires_at: Instant::now().checked_add(self.ttl),
                },
            );
        }

        Ok(addresses)
    }
}

/// Resolver with canned answers per hostname, for tests.
#[derive(Debug, Clone)]
pub struct MockDnsResolver {
    responses: Arc<Mutex<HashMap<String, Result<Vec<SocketAddr>, DnsError>>>>,
}

impl MockDnsResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn with_response(self, host: &str, addrs: Vec<SocketAddr>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(host.to_string(), Ok(addrs));
        }
        self
    }

    #[must_use]
    pub fn with_error(self, host: &str, error: DnsError) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(host.to_string(), Err(error));
        }
        self
    }
}

impl Default for MockDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsResolver for MockDnsResolver {
    fn resolve(&self, host: &str, _port: u16) -> Result<Vec<SocketAddr>, DnsError> {
        let responses = self
            .responses
            .lock()
            .map_err(|_| DnsError::ResolutionFailed("lock poisoned".to_string()))?;

        responses
            .get(host)
            .cloned()
            .unwrap_or_else(|| Err(DnsError::NoAddressesFound(host.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_resolver_short_circuits_ip_literals() {
        let addrs = SystemDnsResolver::new().resolve("127.0.0.1", 8080).unwrap();
        assert_eq!(addrs, vec![SocketAddr::from(([127, 0, 0, 1], 8080))]);

        let addrs = SystemDnsResolver::new().resolve("::1", 443).unwrap();
        assert_eq!(addrs[0].port(), 443);
        assert!(addrs[0].is_ipv6());
    }

    #[test]
    fn test_system_resolver_rejects_empty_host() {
        assert!(matches!(
            SystemDnsResolver::new().resolve("", 80),
            Err(DnsError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_static_resolver_ignores_host() {
        let addr = SocketAddr::from(([10, 0, 0, 1], 9000));
        let resolver = StaticSocketAddr::new(addr);
        assert_eq!(resolver.resolve("anything.test", 80).unwrap(), vec![addr]);
    }

    /// WHY: repeated requests to one host should not hit the resolver each time.
    /// WHAT: the caching resolver keeps answering after the mock's entry is
    /// gone from its own view, until the cache is cleared.
    #[test]
    fn test_caching_resolver_reuses_answers() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 80));
        let mock = MockDnsResolver::new().with_response("cached.test", vec![addr]);
        let caching = CachingDnsResolver::with_default_ttl(mock.clone());

        assert_eq!(caching.resolve("cached.test", 80).unwrap(), vec![addr]);
        assert_eq!(caching.cache_size(), 1);

        if let Ok(mut responses) = mock.responses.lock() {
            responses.clear();
        }
        assert_eq!(caching.resolve("cached.test", 80).unwrap(), vec![addr]);

        caching.clear_cache();
        assert!(caching.resolve("cached.test", 80).is_err());
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 80));
        let mock = MockDnsResolver::new().with_response("forever.test", vec![addr]);
        let caching = CachingDnsResolver::new(mock.clone(), Duration::MAX);

        assert_eq!(caching.resolve("forever.test", 80).unwrap(), vec![addr]);
        if let Ok(mut responses) = mock.responses.lock() {
            responses.clear();
        }
        assert_eq!(caching.resolve("forever.test", 80).unwrap(), vec![addr]);
    }

    #[test]
    fn test_mock_resolver_errors() {
        let mock = MockDnsResolver::new()
            .with_error("broken.test", DnsError::ResolutionFailed("broken.test".into()));
        assert!(matches!(
            mock.resolve("broken.test", 80),
            Err(DnsError::ResolutionFailed(_))
        ));
        assert!(matches!(
            mock.resolve("unknown.test", 80),
            Err(DnsError::NoAddressesFound(_))
        ));
    }
}
