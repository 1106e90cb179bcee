//! Client and per-query options

use std::fmt;
use std::time::Duration;

use chwire_protocol::{ProfileEvent, ProfileInfo, Progress, ServerLog, Setting};
use tokio::time::Instant;

/// Default dial and handshake timeout
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default write-through threshold for buffered data packets (1 MiB)
pub const DEFAULT_BLOCK_BUFFER_SIZE: usize = 1024 * 1024;

/// Connection and pool settings
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Server address, `host:port`
    pub addr: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub quota_key: String,
    /// Bound on TCP connect + handshake, and on waiting for a pooled connection
    pub dial_timeout: Duration,
    /// Settings sent with every query
    pub settings: Vec<Setting>,
    /// Buffered data packets are written to the socket past this size
    pub block_buffer_size: usize,
    pub max_open_conns: usize,
    pub max_idle_conns: usize,
    /// Connections older than this are closed instead of reused
    pub conn_max_lifetime: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9000".into(),
            database: "default".into(),
            username: "default".into(),
            password: String::new(),
            quota_key: String::new(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            settings: Vec::new(),
            block_buffer_size: DEFAULT_BLOCK_BUFFER_SIZE,
            max_open_conns: 10,
            max_idle_conns: 5,
            conn_max_lifetime: Duration::from_secs(3600),
        }
    }
}

type ProgressFn = Box<dyn FnMut(&Progress) + Send>;
type ProfileInfoFn = Box<dyn FnMut(&ProfileInfo) + Send>;
type LogsFn = Box<dyn FnMut(&[ServerLog]) + Send>;
type ProfileEventsFn = Box<dyn FnMut(&[ProfileEvent]) + Send>;

/// Handlers for packets the server streams while a query runs
///
/// Packets without a handler are consumed and dropped.
#[derive(Default)]
pub struct OnProcess {
    progress: Option<ProgressFn>,
    profile_info: Option<ProfileInfoFn>,
    logs: Option<LogsFn>,
    profile_events: Option<ProfileEventsFn>,
}

impl fmt::Debug for OnProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnProcess")
            .field("progress", &self.progress.is_some())
            .field("profile_info", &self.profile_info.is_some())
            .field("logs", &self.logs.is_some())
            .field("profile_events", &self.profile_events.is_some())
            .finish()
    }
}

impl OnProcess {
    pub(crate) fn progress(&mut self, progress: &Progress) {
        if let Some(f) = &mut self.progress {
            f(progress);
        }
    }

    pub(crate) fn profile_info(&mut self, info: &ProfileInfo) {
        if let Some(f) = &mut self.profile_info {
            f(info);
        }
    }

    pub(crate) fn logs(&mut self, logs: &[ServerLog]) {
        if let Some(f) = &mut self.logs {
            f(logs);
        }
    }

    pub(crate) fn profile_events(&mut self, events: &[ProfileEvent]) {
        if let Some(f) = &mut self.profile_events {
            f(events);
        }
    }
}

/// Per-query options
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chwire_client::QueryOptions;
///
/// let options = QueryOptions::new()
///     .query_id("load-1")
///     .setting("insert_deduplicate", "0")
///     .with_timeout(Duration::from_secs(5))
///     .on_progress(|p| println!("wrote {} rows", p.wrote_rows));
/// ```
#[derive(Debug, Default)]
pub struct QueryOptions {
    pub(crate) query_id: String,
    pub(crate) settings: Vec<Setting>,
    pub(crate) deadline: Option<Instant>,
    pub(crate) on_process: OnProcess,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_id(mut self, id: impl Into<String>) -> Self {
        self.query_id = id.into();
        self
    }

    /// Add a query-level setting, overriding client settings of the same name
    pub fn setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.push(Setting::new(name, value));
        self
    }

    /// Bound the preparation of this query by an absolute deadline
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bound the preparation of this query by a timeout from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Progress) + Send + 'static,
    {
        self.on_process.progress = Some(Box::new(f));
        self
    }

    pub fn on_profile_info<F>(mut self, f: F) -> Self
    where
        F: FnMut(&ProfileInfo) + Send + 'static,
    {
        self.on_process.profile_info = Some(Box::new(f));
        self
    }

    pub fn on_logs<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[ServerLog]) + Send + 'static,
    {
        self.on_process.logs = Some(Box::new(f));
        self
    }

    pub fn on_profile_events<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[ProfileEvent]) + Send + 'static,
    {
        self.on_process.profile_events = Some(Box::new(f));
        self
    }

    /// Installed deadline, if any
    pub fn get_deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
