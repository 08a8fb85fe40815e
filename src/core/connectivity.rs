//! Connectivity monitor.
//!
//! The runtime signal is only a hint: a reachable TCP port does not mean the
//! API will accept a request. The monitor therefore only *triggers* sync
//! attempts; the dispatcher decides whether an action actually went through.

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn from_online(online: bool) -> Self {
        if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

/// Raw connectivity signal.
#[async_trait]
pub trait ConnectivitySource: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Reports online when a TCP connection to the API host succeeds in time.
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn from_base_url(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid api_base_url: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::Config(format!("api_base_url '{base_url}' has no host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port_or_known_default().ok_or_else(|| {
            AppError::Config(format!("api_base_url '{base_url}' has no known port"))
        })?;
        Ok(Self {
            host,
            port,
            timeout,
        })
    }
}

#[async_trait]
impl ConnectivitySource for TcpProbe {
    async fn probe(&self) -> bool {
        let attempt = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host = %self.host, port = self.port, error = %e, "probe failed");
                false
            }
            Err(_) => {
                debug!(host = %self.host, port = self.port, "probe timed out");
                false
            }
        }
    }
}

/// In-memory flag. Used for `--offline` and for tests.
pub struct ManualSource {
    online: AtomicBool,
}

impl ManualSource {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivitySource for ManualSource {
    async fn probe(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

type Listener = Arc<dyn Fn(NetworkStatus) + Send + Sync>;

struct MonitorInner {
    online: AtomicBool,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl MonitorInner {
    fn remove_listener(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(lid, _)| *lid != id);
        }
    }
}

/// Current online flag plus transition listeners.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
    pub fn new(initial_online: bool) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                online: AtomicBool::new(initial_online),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Seed the flag with one probe of `source`.
    pub async fn detect(source: &dyn ConnectivitySource) -> Self {
        Self::new(source.probe().await)
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> NetworkStatus {
        NetworkStatus::from_online(self.is_online())
    }

    /// Register `callback` for every committed transition.
    /// The listener stays registered until the returned handle is
    /// unsubscribed or dropped.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_status_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(NetworkStatus) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push((id, Arc::new(callback)));
        }
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
            active: true,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Commit an observed state. Listeners run only when the state actually
    /// changed; repeated reports of the same state are ignored.
    pub fn report(&self, online: bool) -> bool {
        let previous = self.inner.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }

        let status = NetworkStatus::from_online(online);
        match status {
            NetworkStatus::Online => info!("network: online"),
            NetworkStatus::Offline => warn!("network: offline"),
        }

        // Call listeners outside the lock so they may (un)subscribe.
        let listeners: Vec<Listener> = match self.inner.listeners.lock() {
            Ok(l) => l.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => Vec::new(),
        };
        for cb in listeners {
            cb(status);
        }
        true
    }

    /// Poll `source` every `interval` and commit changes that still hold
    /// after `debounce`. A dip shorter than `debounce` is never reported.
    pub fn spawn_watcher(
        &self,
        source: Arc<dyn ConnectivitySource>,
        interval: Duration,
        debounce: Duration,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let observed = source.probe().await;
                if observed == monitor.is_online() {
                    continue;
                }
                if !debounce.is_zero() {
                    tokio::time::sleep(debounce).await;
                    if source.probe().await != observed {
                        debug!(observed, "connectivity flap ignored");
                        continue;
                    }
                }
                monitor.report(observed);
            }
        })
    }
}

/// Handle returned by [`ConnectivityMonitor::on_status_change`].
pub struct Subscription {
    inner: Weak<MonitorInner>,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.inner.upgrade() {
            inner.remove_listener(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
