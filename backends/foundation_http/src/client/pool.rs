//! Connection pooling for the stream connector.
//!
//! WHY: Reusing connections avoids TCP and TLS handshakes for consecutive
//! requests to the same server.
//!
//! WHAT: A thread-safe pool keyed by (transport, host, port) storing idle
//! buffered streams. Idle entries expire after `max_idle_time`, at most
//! `max_per_host` are kept per key, and entries whose peer has closed are
//! discarded on checkout.
//!
//! HOW: `Mutex<HashMap<PoolKey, VecDeque<..>>>` owned by the connector; no
//! process-wide state. [`ConnectionPool::close`] shuts every idle stream
//! down.

use crate::netcap::RawStream;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::BufReader;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A connection as the connector uses it: buffered for reading, with the
/// underlying stream reachable through `get_mut` for writing.
pub type PooledStream = BufReader<RawStream>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transport {
    Tcp,
    Tls,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Tls => write!(f, "tls"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
}

impl PoolKey {
    pub fn new(transport: Transport, host: impl Into<String>, port: u16) -> Self {
        Self {
            transport,
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.transport, self.host, self.port)
    }
}

type PooledEntry = (Instant, PooledStream);

const MAX_PER_HOST: usize = 10;
const MAX_IDLE_TIME: Duration = Duration::from_secs(300);

pub struct ConnectionPool {
    max_per_host: usize,
    max_idle_time: Duration,
    inner: Mutex<HashMap<PoolKey, VecDeque<PooledEntry>>>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ConnectionPool");
        debug
            .field("max_per_host", &self.max_per_host)
            .field("max_idle_time", &self.max_idle_time);

        let pools: Vec<(String, usize)> = self
            .lock()
            .iter()
            .map(|(key, queue)| (key.to_string(), queue.len()))
            .collect();
        debug.field("pools", &pools).finish()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(MAX_PER_HOST, MAX_IDLE_TIME)
    }
}

impl ConnectionPool {
    #[must_use]
    pub fn new(max_per_host: usize, max_idle_time: Duration) -> Self {
        Self {
            max_per_host,
            max_idle_time,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// A panic while the lock was held leaves the map itself intact, so a
    /// poisoned lock is recovered rather than disabling the pool.
    fn lock(&self) -> MutexGuard<'_, HashMap<PoolKey, VecDeque<PooledEntry>>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("connection pool lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Takes the most recently returned live connection for `key`.
    ///
    /// Expired entries, entries with unread buffered bytes and entries whose
    /// peer has hung up are dropped along the way.
    #[must_use]
    pub fn checkout(&self, key: &PoolKey) -> Option<PooledStream> {
        let now = Instant::now();
        let mut map = self.lock();
        let queue = map.get_mut(key)?;

        let mut found = None;
        while let Some((returned_at, mut stream)) = queue.pop_back() {
            if now.duration_since(returned_at) > self.max_idle_time {
                tracing::debug!("dropping expired pooled connection to {key}");
                stream.get_ref().shutdown();
                continue;
            }
            if !stream.buffer().is_empty() || stream.get_mut().is_stale() {
                tracing::debug!("dropping stale pooled connection to {key}");
                continue;
            }
            found = Some(stream);
            break;
        }

        if queue.is_empty() {
            map.remove(key);
        }
        found
    }

    /// Returns a connection to the pool, evicting the oldest entry for `key`
    /// when over `max_per_host`.
    pub fn checkin(&self, key: PoolKey, stream: PooledStream) {
        if self.max_per_host == 0 {
            return;
        }
        let mut map = self.lock();
        let queue = map.entry(key).or_default();
        queue.push_back((Instant::now(), stream));
        while queue.len() > self.max_per_host {
            if let Some((_, evicted)) = queue.pop_front() {
                evicted.get_ref().shutdown();
            }
        }
    }

    /// Number of idle connections held for `key`.
    #[must_use]
    pub fn idle_count(&self, key: &PoolKey) -> usize {
        self.lock().get(key).map_or(0, VecDeque::len)
    }

    /// Drops entries idle longer than `max_idle_time`.
    pub fn cleanup_stale(&self) {
        let now = Instant::now();
        let mut map = self.lock();

        for queue in map.values_mut() {
            queue.retain(|(returned_at, _)| now.duration_since(*returned_at) <= self.max_idle_time);
        }
        map.retain(|_, queue| !queue.is_empty());
    }

    /// Shuts down and drops every idle connection.
    pub fn close(&self) {
        for (_, stream) in self.lock().drain().flat_map(|(_, queue)| queue) {
            stream.get_ref().shutdown();
        }
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netcap::Timeouts;
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn connected_pair(listener: &TcpListener) -> (PooledStream, TcpStream) {
        let stream = RawStream::connect(&[listener.local_addr().unwrap()], Timeouts::default()).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        (BufReader::new(stream), server_side)
    }

    fn key() -> PoolKey {
        PoolKey::new(Transport::Tcp, "127.0.0.1", 80)
    }

    #[test]
    fn test_checkout_returns_checked_in_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let pool = ConnectionPool::default();
        let (stream, _server) = connected_pair(&listener);

        assert!(pool.checkout(&key()).is_none());
        pool.checkin(key(), stream);
        assert_eq!(pool.idle_count(&key()), 1);
        assert!(pool.checkout(&key()).is_some());
        assert_eq!(pool.idle_count(&key()), 0);
    }

    #[test]
    fn test_keys_are_isolated_by_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let pool = ConnectionPool::default();
        let (stream, _server) = connected_pair(&listener);

        pool.checkin(key(), stream);
        assert!(pool
            .checkout(&PoolKey::new(Transport::Tls, "127.0.0.1", 80))
            .is_none());
    }

    #[test]
    fn test_max_per_host_evicts_oldest() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let pool = ConnectionPool::new(1, MAX_IDLE_TIME);
        let (first, _s1) = connected_pair(&listener);
        let (second, _s2) = connected_pair(&listener);

        pool.checkin(key(), first);
        pool.checkin(key(), second);
        assert_eq!(pool.idle_count(&key()), 1);
    }

    /// WHY: a server may close an idle keep-alive connection at any time.
    /// WHAT: checkout skips connections whose peer has gone away.
    #[test]
    fn test_checkout_skips_closed_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let pool = ConnectionPool::default();
        let (stream, server) = connected_pair(&listener);

        pool.checkin(key(), stream);
        drop(server);
        std::thread::sleep(Duration::from_millis(50));
        assert!(pool.checkout(&key()).is_none());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let pool = ConnectionPool::new(4, Duration::ZERO);
        let (stream, _server) = connected_pair(&listener);

        pool.checkin(key(), stream);
        std::thread::sleep(Duration::from_millis(5));
        pool.cleanup_stale();
        assert_eq!(pool.idle_count(&key()), 0);
    }

    #[test]
    fn test_close_empties_pool() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let pool = ConnectionPool::default();
        let (stream, _server) = connected_pair(&listener);

        pool.checkin(key(), stream);
        pool.close();
        assert_eq!(pool.idle_count(&key()), 0);
    }

    /// WHY: a panic on another thread must not silently turn pooling off.
    /// WHAT: after the lock is poisoned, checkin and checkout still work and
    /// the recovery is logged.
    #[traced_test]
    #[test]
    fn test_poisoned_lock_is_recovered() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let pool = Arc::new(ConnectionPool::default());

        let poisoner = Arc::clone(&pool);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("panic while holding the pool lock");
        })
        .join();
        assert!(pool.inner.is_poisoned());

        let (stream, _server) = connected_pair(&listener);
        pool.checkin(key(), stream);
        assert_eq!(pool.idle_count(&key()), 1);
        assert!(pool.checkout(&key()).is_some());
        assert!(logs_contain("connection pool lock was poisoned"));
    }
}
