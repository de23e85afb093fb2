//! Periodic fetch-then-analyze loop.
//!
//! A [`RefreshTask`] pulls records from a [`DataSource`] on a fixed interval,
//! runs the traffic analyzer over them and publishes the result to a shared
//! [`DisplayState`]. Every cycle carries a ticket; when responses resolve out
//! of order the display keeps whichever was published last and counts the
//! stale overwrite. A failed fetch falls back to generated shipments so the
//! display never goes blank.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    cli::WatchArgs,
    config::AnalyzerConfig,
    data::QueryResponse,
    io_utils::{self, LoadOptions},
    mock,
    traffic::{TrafficAnalysis, TrafficAnalyzer},
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_FALLBACK_ROWS: usize = 120;
const FALLBACK_SEED: u64 = 7;

pub fn execute(args: &WatchArgs) -> Result<()> {
    let config = AnalyzerConfig::load_or_default(args.config.as_deref())?;
    let analyzer = TrafficAnalyzer::from_config(&config)?;
    let source: Box<dyn DataSource> = match (&args.url, &args.input) {
        (Some(url), _) => Box::new(HttpSource::new(url, Duration::from_secs(args.timeout))?),
        (None, Some(path)) => Box::new(FileSource::new(
            path.clone(),
            LoadOptions {
                delimiter: args.delimiter,
                encoding: args.input_encoding.clone(),
            },
        )),
        (None, None) => bail!("Either --input or --url must be provided"),
    };
    let mut task = RefreshTask::new(source, analyzer, Arc::new(SystemClock))
        .with_question(&args.question)
        .with_interval(Duration::from_secs(args.interval.max(1)))
        .with_fallback_rows(args.fallback_rows);

    let cycles = task.run(args.iterations, |snapshot| {
        let kpis = &snapshot.analysis.kpis;
        println!(
            "[#{}] {} {} record(s) from {} | lanes {} | on-time {:.1}% ({:?}) | alerts {}",
            snapshot.ticket,
            snapshot.fetched_at.format("%H:%M:%S"),
            kpis.total_records,
            snapshot.source_name,
            kpis.active_lanes,
            kpis.on_time_percentage,
            kpis.efficiency,
            snapshot.analysis.alerts.len()
        );
    })?;
    info!("Watch finished after {cycles} refresh cycle(s)");
    Ok(())
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// A clock that only moves when told to; `sleep` advances it instantly.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        let mut now = lock(&self.now);
        *now += step;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

pub trait DataSource {
    fn fetch(&self, question: &str) -> Result<QueryResponse>;
    fn name(&self) -> String;
}

/// Re-reads a JSON or delimited file on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    options: LoadOptions,
}

impl FileSource {
    pub fn new(path: PathBuf, options: LoadOptions) -> Self {
        Self { path, options }
    }
}

impl DataSource for FileSource {
    fn fetch(&self, _question: &str) -> Result<QueryResponse> {
        io_utils::load_payload(&self.path, &self.options)
            .with_context(|| format!("Reading records from {:?}", self.path))
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Posts the question to `{base_url}/query` and reads the JSON reply.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Building HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/query", self.base_url)
    }
}

impl DataSource for HttpSource {
    fn fetch(&self, question: &str) -> Result<QueryResponse> {
        let url = self.endpoint();
        debug!("POST {url}");
        let payload: Value = self
            .client
            .post(&url)
            .json(&json!({ "question": question }))
            .send()
            .with_context(|| format!("Sending query to {url}"))?
            .error_for_status()
            .with_context(|| format!("Query service at {url} returned an error"))?
            .json()
            .with_context(|| format!("Decoding response from {url}"))?;
        let response = QueryResponse::from_payload(payload)
            .with_context(|| format!("Interpreting response from {url}"))?;
        Ok(response)
    }

    fn name(&self) -> String {
        self.base_url.clone()
    }
}

/// Generated shipments stamped relative to the clock's current time.
pub struct MockSource {
    rows: usize,
    seed: u64,
    clock: Arc<dyn Clock>,
}

impl MockSource {
    pub fn new(rows: usize, seed: u64, clock: Arc<dyn Clock>) -> Self {
        Self { rows, seed, clock }
    }
}

impl DataSource for MockSource {
    fn fetch(&self, _question: &str) -> Result<QueryResponse> {
        let dataset = mock::generate(self.rows, self.seed, self.clock.now());
        Ok(QueryResponse::from_dataset(dataset))
    }

    fn name(&self) -> String {
        format!("mock(seed={})", self.seed)
    }
}

/// Shared flag that ends a running [`RefreshTask`] from anywhere.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotOrigin {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub ticket: u64,
    pub fetched_at: DateTime<Utc>,
    pub origin: SnapshotOrigin,
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analysis: TrafficAnalysis,
}

#[derive(Debug, Default)]
pub struct DisplayState {
    current: Option<Snapshot>,
    publishes: usize,
    stale_overwrites: usize,
}

impl DisplayState {
    /// Shows `snapshot` unconditionally. Returns `false` when it replaced a
    /// snapshot with a newer ticket.
    pub fn publish(&mut self, snapshot: Snapshot) -> bool {
        self.publishes += 1;
        let stale = self
            .current
            .as_ref()
            .is_some_and(|shown| shown.ticket > snapshot.ticket);
        if stale {
            self.stale_overwrites += 1;
            debug!("Ticket {} overwrote a newer snapshot", snapshot.ticket);
        }
        self.current = Some(snapshot);
        !stale
    }

    pub fn current_ticket(&self) -> Option<u64> {
        self.current.as_ref().map(|snapshot| snapshot.ticket)
    }

    pub fn publishes(&self) -> usize {
        self.publishes
    }

    pub fn stale_overwrites(&self) -> usize {
        self.stale_overwrites
    }
}

pub struct RefreshTask {
    source: Box<dyn DataSource>,
    analyzer: TrafficAnalyzer,
    clock: Arc<dyn Clock>,
    question: String,
    interval: Duration,
    fallback_rows: usize,
    stop: StopHandle,
    last_run: Option<DateTime<Utc>>,
    next_ticket: u64,
    display: Arc<Mutex<DisplayState>>,
}

impl RefreshTask {
    pub fn new(source: Box<dyn DataSource>, analyzer: TrafficAnalyzer, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            analyzer,
            clock,
            question: String::new(),
            interval: DEFAULT_INTERVAL,
            fallback_rows: DEFAULT_FALLBACK_ROWS,
            stop: StopHandle::default(),
            last_run: None,
            next_ticket: 0,
            display: Arc::new(Mutex::new(DisplayState::default())),
        }
    }

    pub fn with_question(mut self, question: &str) -> Self {
        self.question = question.to_string();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_fallback_rows(mut self, rows: usize) -> Self {
        self.fallback_rows = rows;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn display(&self) -> Arc<Mutex<DisplayState>> {
        Arc::clone(&self.display)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_running()
    }

    /// Arms the task; the next [`tick`](Self::tick) refreshes immediately.
    pub fn start(&mut self) -> Result<()> {
        if !self.stop.start() {
            bail!("Refresh task for {} is already running", self.source.name());
        }
        self.last_run = None;
        info!(
            "Refreshing from {} every {}s",
            self.source.name(),
            self.interval.as_secs()
        );
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.stop.is_running() {
            bail!("Refresh task for {} is not running", self.source.name());
        }
        self.stop.stop();
        Ok(())
    }

    /// Time left before the next cycle is due; zero when one is due now.
    pub fn time_until_due(&self) -> Duration {
        let Some(last_run) = self.last_run else {
            return Duration::ZERO;
        };
        let elapsed = (self.clock.now() - last_run).to_std().unwrap_or(Duration::ZERO);
        self.interval.saturating_sub(elapsed)
    }

    /// Runs one cycle when the task is running and the interval has elapsed.
    pub fn tick(&mut self) -> Option<Snapshot> {
        if !self.is_running() || !self.time_until_due().is_zero() {
            return None;
        }
        Some(self.refresh_now())
    }

    pub fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Fetches, analyzes and publishes in one step regardless of schedule.
    pub fn refresh_now(&mut self) -> Snapshot {
        let ticket = self.issue_ticket();
        self.last_run = Some(self.clock.now());
        let outcome = self.source.fetch(&self.question);
        self.resolve(ticket, outcome)
    }

    /// Turns a fetch outcome into a published snapshot.
    pub fn resolve(&self, ticket: u64, outcome: Result<QueryResponse>) -> Snapshot {
        let now = self.clock.now();
        let (origin, source_name, response, error) = match outcome {
            Ok(response) => (SnapshotOrigin::Live, self.source.name(), response, None),
            Err(err) => {
                warn!(
                    "Fetch #{ticket} from {} failed, using generated data: {err:#}",
                    self.source.name()
                );
                let dataset =
                    mock::generate(self.fallback_rows, FALLBACK_SEED.wrapping_add(ticket), now);
                (
                    SnapshotOrigin::Fallback,
                    "mock".to_string(),
                    QueryResponse::from_dataset(dataset),
                    Some(format!("{err:#}")),
                )
            }
        };
        let snapshot = Snapshot {
            ticket,
            fetched_at: now,
            origin,
            source_name,
            sql_query: response.sql_query,
            error,
            analysis: self.analyzer.analyze_at(&response.dataset, now),
        };
        lock(&self.display).publish(snapshot.clone());
        snapshot
    }

    /// Starts the task if needed and keeps refreshing until stopped or
    /// `iterations` cycles have run. Returns the number of cycles.
    pub fn run<F>(&mut self, iterations: Option<usize>, mut on_publish: F) -> Result<usize>
    where
        F: FnMut(&Snapshot),
    {
        if !self.is_running() {
            self.start()?;
        }
        let mut cycles = 0usize;
        while self.is_running() && !iterations.is_some_and(|limit| cycles >= limit) {
            if let Some(snapshot) = self.tick() {
                on_publish(&snapshot);
                cycles += 1;
                continue;
            }
            self.clock.sleep(self.time_until_due());
        }
        if self.is_running() {
            self.stop()?;
        }
        Ok(cycles)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
