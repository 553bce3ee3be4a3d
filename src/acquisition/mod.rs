//! Threaded acquisition pipeline.
//!
//! A producer thread polls the sensor and pushes samples into a bounded
//! [`SampleQueue`]; a consumer thread pops them and hands them to a
//! [`SampleSink`]. Both threads watch a shared run flag once per iteration and
//! sleep briefly when there is nothing to do, so [`Pipeline::stop`] returns
//! within roughly one idle interval plus any bus transfer already in flight.
//!
//! A full queue drops the newest sample and a failed bus transfer skips one
//! iteration. Both are counted in [`PipelineStats`] and neither stops the
//! pipeline.

mod sink;

#[cfg(feature = "linux")]
pub mod linux;

pub use sink::{LogSink, SampleSink};

use std::fmt;
use std::io;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::config::Config;
use crate::device::{Iis3dwb, SessionState};
use crate::error::Error;
use crate::interface::Iis3dwbInterface;
use crate::queue::{Consumer, Producer, QueueEmpty, QueueFull, SampleQueue};

/// Tunables for a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Queue slots; capped at [`MAX_CAPACITY`](crate::queue::MAX_CAPACITY).
    pub queue_capacity: usize,
    /// Producer sleep after a "no new data" poll.
    pub producer_idle: Duration,
    /// Consumer sleep after finding the queue empty.
    pub consumer_idle: Duration,
    /// Measurement settings applied by [`Pipeline::init`].
    pub sensor: Config,
}

impl PipelineConfig {
    /// Begins building a [`PipelineConfig`] using the builder pattern.
    pub fn new() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 512,
            producer_idle: Duration::from_micros(200),
            consumer_idle: Duration::from_micros(500),
            sensor: Config::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Sets the number of queue slots.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Sets the producer sleep after a "no new data" poll or a bus error.
    pub fn producer_idle(mut self, idle: Duration) -> Self {
        self.config.producer_idle = idle;
        self
    }

    /// Sets the consumer sleep after finding the queue empty.
    pub fn consumer_idle(mut self, idle: Duration) -> Self {
        self.config.consumer_idle = idle;
        self
    }

    /// Sets the measurement configuration applied at bring-up.
    pub fn sensor(mut self, sensor: Config) -> Self {
        self.config.sensor = sensor;
        self
    }

    /// Finalizes the builder and returns the [`PipelineConfig`].
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

/// Counters accumulated over the life of a pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Samples read from the sensor.
    pub produced: u64,
    /// Samples handed to the sink.
    pub delivered: u64,
    /// Samples lost because the queue was full.
    pub dropped: u64,
    /// Polls or reads that failed on the bus.
    pub bus_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    produced: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    bus_errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            produced: self.produced.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            bus_errors: self.bus_errors.load(Ordering::Relaxed),
        }
    }
}

/// Failure to build a [`Pipeline`]. No pipeline exists afterwards.
#[derive(Debug)]
pub enum InitError<E> {
    /// The queue capacity was zero.
    InvalidCapacity,
    /// The session handed in has not been configured (or is closed).
    NotConfigured(SessionState),
    /// Device bring-up failed.
    Device(Error<E>),
    /// The bus device could not be opened.
    #[cfg(feature = "linux")]
    Open(linux::OpenError),
}

impl<E> From<Error<E>> for InitError<E> {
    fn from(err: Error<E>) -> Self {
        Self::Device(err)
    }
}

impl<E: fmt::Debug> fmt::Display for InitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity => f.write_str("queue capacity must be at least 1"),
            Self::NotConfigured(state) => {
                write!(f, "session must be configured before acquisition (state: {state:?})")
            }
            Self::Device(err) => write!(f, "device bring-up failed: {err}"),
            #[cfg(feature = "linux")]
            Self::Open(err) => write!(f, "{err}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for InitError<E> {}

/// Failure to start a [`Pipeline`].
#[derive(Debug)]
pub enum StartError {
    /// The worker threads are already running.
    AlreadyRunning,
    /// The pipeline was stopped and its session released.
    Stopped,
    /// A worker thread could not be spawned; no worker is left running.
    Spawn(io::Error),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => f.write_str("pipeline is already running"),
            Self::Stopped => f.write_str("pipeline was stopped and cannot be restarted"),
            Self::Spawn(err) => write!(f, "failed to spawn worker thread: {err}"),
        }
    }
}

impl std::error::Error for StartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// A worker thread panicked. Resources were still released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopError {
    /// The producer thread panicked; its session was dropped without `close`.
    pub producer_panicked: bool,
    /// The consumer thread panicked; its sink was dropped during unwinding.
    pub consumer_panicked: bool,
}

impl fmt::Display for StopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.producer_panicked, self.consumer_panicked) {
            (true, true) => f.write_str("producer and consumer threads panicked"),
            (true, false) => f.write_str("producer thread panicked"),
            _ => f.write_str("consumer thread panicked"),
        }
    }
}

impl std::error::Error for StopError {}

enum Stage<IFACE, S> {
    Idle {
        device: Iis3dwb<IFACE>,
        queue: SampleQueue,
        sink: S,
    },
    Running {
        producer: JoinHandle<(Iis3dwb<IFACE>, Producer)>,
        consumer: JoinHandle<(S, Consumer)>,
    },
    Stopped,
}

/// Owns one device session, one queue and the two worker threads around them.
///
/// Lifecycle: built idle, [`start`](Self::start) once, [`stop`](Self::stop)
/// once. Stopping releases the queue and then the session, so a stopped
/// pipeline cannot be restarted. Dropping a running pipeline stops it.
pub struct Pipeline<IFACE, S> {
    config: PipelineConfig,
    run: Arc<AtomicBool>,
    counters: Arc<Counters>,
    stage: Stage<IFACE, S>,
}

impl<IFACE, S> Pipeline<IFACE, S>
where
    IFACE: Iis3dwbInterface + Send + 'static,
    IFACE::Error: fmt::Debug,
    S: SampleSink,
{
    /// Brings the device up and builds an idle pipeline around it.
    ///
    /// On failure the bus is released and nothing is returned.
    pub fn init(
        interface: IFACE,
        delay: &mut impl DelayNs,
        sink: S,
        config: PipelineConfig,
    ) -> Result<Self, InitError<IFACE::Error>> {
        if config.queue_capacity == 0 {
            return Err(InitError::InvalidCapacity);
        }

        let mut device = Iis3dwb::new(interface);
        if let Err(err) = device.init(delay, config.sensor) {
            error!("sensor bring-up failed: {:?}", err);
            release_device(device);
            return Err(err.into());
        }

        Self::new(device, sink, config)
    }

    /// Builds an idle pipeline around an already configured session.
    pub fn new(
        device: Iis3dwb<IFACE>,
        sink: S,
        config: PipelineConfig,
    ) -> Result<Self, InitError<IFACE::Error>> {
        let state = device.state();
        if !matches!(state, SessionState::Configured | SessionState::Ready) {
            return Err(InitError::NotConfigured(state));
        }

        let queue = SampleQueue::new(config.queue_capacity).map_err(|_| InitError::InvalidCapacity)?;
        debug!("acquisition queue holds {} samples", queue.capacity());

        Ok(Self {
            config,
            run: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            stage: Stage::Idle { device, queue, sink },
        })
    }

    /// Raises the run flag and launches the producer and consumer threads.
    pub fn start(&mut self) -> Result<(), StartError> {
        let (device, queue, sink) = match mem::replace(&mut self.stage, Stage::Stopped) {
            Stage::Idle { device, queue, sink } => (device, queue, sink),
            running @ Stage::Running { .. } => {
                self.stage = running;
                return Err(StartError::AlreadyRunning);
            }
            Stage::Stopped => return Err(StartError::Stopped),
        };

        let (producer_half, consumer_half) = queue.split();
        self.run.store(true, Ordering::Release);

        let producer = {
            let run = Arc::clone(&self.run);
            let counters = Arc::clone(&self.counters);
            let idle = self.config.producer_idle;
            thread::Builder::new()
                .name("iis3dwb-producer".into())
                .spawn(move || produce(device, producer_half, &run, &counters, idle))
        };
        let producer = match producer {
            Ok(handle) => handle,
            Err(err) => {
                self.run.store(false, Ordering::Release);
                error!("failed to spawn producer thread: {}", err);
                return Err(StartError::Spawn(err));
            }
        };

        let consumer = {
            let run = Arc::clone(&self.run);
            let counters = Arc::clone(&self.counters);
            let idle = self.config.consumer_idle;
            thread::Builder::new()
                .name("iis3dwb-consumer".into())
                .spawn(move || consume(sink, consumer_half, &run, &counters, idle))
        };
        let consumer = match consumer {
            Ok(handle) => handle,
            Err(err) => {
                self.run.store(false, Ordering::Release);
                error!("failed to spawn consumer thread: {}", err);
                if let Ok((device, _)) = producer.join() {
                    release_device(device);
                }
                return Err(StartError::Spawn(err));
            }
        };

        self.stage = Stage::Running { producer, consumer };
        info!(
            "acquisition started (queue {}, producer idle {:?}, consumer idle {:?})",
            self.config.queue_capacity.min(crate::queue::MAX_CAPACITY),
            self.config.producer_idle,
            self.config.consumer_idle
        );
        Ok(())
    }

    /// Clears the run flag, joins both threads, then releases the queue and
    /// the session in that order.
    ///
    /// Stopping an idle or already stopped pipeline only releases what is
    /// left. The returned counters are final.
    pub fn stop(&mut self) -> Result<PipelineStats, StopError> {
        self.run.store(false, Ordering::Release);

        let mut outcome = Ok(());
        match mem::replace(&mut self.stage, Stage::Stopped) {
            Stage::Idle { device, queue, sink } => {
                drop(queue);
                drop(sink);
                release_device(device);
            }
            Stage::Running { producer, consumer } => {
                let produced = producer.join().ok();
                let consumed = consumer.join().ok();

                if produced.is_none() || consumed.is_none() {
                    error!(
                        "worker thread panicked (producer: {}, consumer: {})",
                        produced.is_none(),
                        consumed.is_none()
                    );
                    outcome = Err(StopError {
                        producer_panicked: produced.is_none(),
                        consumer_panicked: consumed.is_none(),
                    });
                }

                let (device, producer_half) = produced.unzip();
                let (sink, consumer_half) = consumed.unzip();

                let unread = consumer_half.as_ref().map_or(0, Consumer::len);
                if unread > 0 {
                    debug!("discarding {} queued samples", unread);
                }
                drop(producer_half);
                drop(consumer_half);
                drop(sink);

                if let Some(device) = device {
                    release_device(device);
                }

                let stats = self.counters.snapshot();
                info!(
                    "acquisition stopped: produced {}, delivered {}, dropped {}, bus errors {}",
                    stats.produced, stats.delivered, stats.dropped, stats.bus_errors
                );
            }
            Stage::Stopped => {}
        }

        outcome.map(|()| self.counters.snapshot())
    }
}

impl<IFACE, S> Pipeline<IFACE, S> {
    /// Current counter values; safe to call while running.
    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Returns `true` between a successful `start` and `stop`.
    pub fn is_running(&self) -> bool {
        matches!(self.stage, Stage::Running { .. })
    }

    /// Tunables the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl<IFACE, S> Drop for Pipeline<IFACE, S> {
    fn drop(&mut self) {
        self.run.store(false, Ordering::Release);
        if let Stage::Running { producer, consumer } = mem::replace(&mut self.stage, Stage::Stopped) {
            let _ = producer.join();
            let _ = consumer.join();
        }
    }
}

fn release_device<IFACE>(mut device: Iis3dwb<IFACE>)
where
    IFACE: Iis3dwbInterface,
{
    if device.close().is_err() {
        debug!("session already closed");
    }
}

fn produce<IFACE>(
    mut device: Iis3dwb<IFACE>,
    mut queue: Producer,
    run: &AtomicBool,
    counters: &Counters,
    idle: Duration,
) -> (Iis3dwb<IFACE>, Producer)
where
    IFACE: Iis3dwbInterface,
    IFACE::Error: fmt::Debug,
{
    while run.load(Ordering::Acquire) {
        match device.is_data_ready() {
            Ok(true) => {}
            Ok(false) => {
                thread::sleep(idle);
                continue;
            }
            Err(err) => {
                Counters::bump(&counters.bus_errors);
                debug!("data-ready poll failed: {:?}", err);
                thread::sleep(idle);
                continue;
            }
        }

        match device.read_sample() {
            Ok(sample) => {
                Counters::bump(&counters.produced);
                if let Err(QueueFull(_)) = queue.push(sample) {
                    Counters::bump(&counters.dropped);
                    trace!("queue full, sample dropped");
                }
            }
            Err(err) => {
                Counters::bump(&counters.bus_errors);
                debug!("sample read failed: {:?}", err);
                thread::sleep(idle);
            }
        }
    }

    (device, queue)
}

fn consume<S: SampleSink>(
    mut sink: S,
    mut queue: Consumer,
    run: &AtomicBool,
    counters: &Counters,
    idle: Duration,
) -> (S, Consumer) {
    while run.load(Ordering::Acquire) {
        match queue.pop() {
            Ok(sample) => {
                sink.deliver(sample);
                Counters::bump(&counters.delivered);
            }
            Err(QueueEmpty) => thread::sleep(idle),
        }
    }

    (sink, queue)
}
