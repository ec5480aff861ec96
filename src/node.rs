//! The running node: hardware bring-up, the two ingestion tasks, shutdown.
//!
//! Signal handlers are installed before any hardware is touched, so an
//! interrupt at any point after that ends with servo torque released.
//!
//! Startup order matters. The radio is initialized first because a node
//! that cannot hear its distant sensors is not worth running, and a radio
//! failure stops the node before the rig moves. The rig is then parked at
//! the watch position, and only after that do the channels start listening.
//!
//! On SIGINT or SIGTERM the coordinator stops admitting alerts and the
//! cycle in flight gets a grace period to finish.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigError};
use crate::cooldown::CooldownGate;
use crate::coordinator::Coordinator;
use crate::hardware::{
    Clock, CommandCamera, DatagramSource, RadioConfig, RadioDriver, RadioError, Rig, SerialRadio,
    Servo, ServoError, SysfsServo, SystemClock, UdpListener,
};
use crate::ingest::network;
use crate::ingest::radio::{self, RadioTiming};
use crate::model::Angle;
use crate::sequencer::{self, Sequencer};
use crate::storage::{ImageStore, StorageError};

/// Failures that stop the node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("radio: {0}")]
    Radio(#[from] RadioError),

    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("servo: {0}")]
    Servo(#[from] ServoError),

    #[error("image directory: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] io::Error),

    #[error("interrupted before the rig settled; torque released")]
    Interrupted,

    #[error("ingestion task failed: {0}")]
    Task(#[from] JoinError),
}

type Tasks = JoinSet<Result<(), RadioError>>;

/// Bring-up and teardown timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    /// How long the rig holds the watch position at startup.
    pub startup_settle: Duration,

    /// How long a cycle in flight may run on after shutdown is requested.
    pub shutdown_grace: Duration,

    pub radio: RadioTiming,
}

impl Lifecycle {
    pub fn from_config(config: &Config) -> Self {
        Self {
            startup_settle: config.startup_settle(),
            shutdown_grace: config.shutdown_grace(),
            radio: config.radio_timing(),
        }
    }
}

/// Bring the node up and run until a shutdown signal or a fatal error.
pub async fn run(config: &Config) -> Result<(), NodeError> {
    let mut signals = ShutdownSignals::install().map_err(NodeError::Signal)?;

    let modem = config.radio.enabled.then(|| {
        (
            SerialRadio::new(&config.radio.device, config.radio_timing().poll),
            config.radio.profile.config(),
        )
    });

    let listener = UdpListener::bind(config.udp_port)
        .await
        .map_err(|source| NodeError::Bind {
            port: config.udp_port,
            source,
        })?;
    let addr = listener.local_addr().map_err(|source| NodeError::Bind {
        port: config.udp_port,
        source,
    })?;
    info!(%addr, "listening for local-network alerts");

    let store = ImageStore::new(config.image_dir()?)?;
    info!(dir = %store.root().display(), "photos go to the image directory");
    let rig = Rig::new(
        Box::new(SysfsServo::open(config.servo.clone())?),
        Box::new(CommandCamera::new(config.camera.clone())),
        store,
    );

    let coordinator = Arc::new(Coordinator::new(
        rig,
        CooldownGate::new(config.cooldown()),
        Sequencer::new(config.aim, config.sequence_timing(), config.torque_release),
        Arc::new(SystemClock),
    ));
    info!(cooldown_secs = config.cooldown_secs, "cooldown armed");

    serve(
        listener,
        modem,
        coordinator,
        Lifecycle::from_config(config),
        signals.recv(),
    )
    .await
}

/// Initialize the radio, center the rig, then service both channels until
/// `stop` resolves or the radio fails for good.
///
/// A radio that fails to initialize ends the node before the rig moves or
/// any channel listens. Torque is released on every exit after that.
pub async fn serve<S, R, F>(
    source: S,
    modem: Option<(R, RadioConfig)>,
    coordinator: Arc<Coordinator>,
    lifecycle: Lifecycle,
    stop: F,
) -> Result<(), NodeError>
where
    S: DatagramSource + 'static,
    R: RadioDriver + 'static,
    F: Future<Output = io::Result<()>>,
{
    let receiver = match modem {
        Some((mut driver, config)) => {
            driver.initialize(&config).await?;
            Some(driver)
        }
        None => {
            info!("radio disabled");
            None
        }
    };

    tokio::pin!(stop);

    let interrupted = tokio::select! {
        biased;
        signalled = &mut stop => Some(signalled),
        () = coordinator.center(lifecycle.startup_settle) => None,
    };
    if let Some(signalled) = interrupted {
        warn!("shutdown requested while centering");
        shutdown(&coordinator, Tasks::new(), lifecycle.shutdown_grace).await;
        return signalled.map_err(NodeError::Signal);
    }

    let mut tasks = Tasks::new();
    tasks.spawn({
        let coordinator = Arc::clone(&coordinator);
        async move {
            network::listen(source, &coordinator).await;
            Ok(())
        }
    });
    let radio_enabled = receiver.is_some();
    if let Some(driver) = receiver {
        let coordinator = Arc::clone(&coordinator);
        tasks.spawn(async move { radio::listen(driver, &coordinator, lifecycle.radio).await });
    }
    info!(radio = radio_enabled, "on watch");

    let result = tokio::select! {
        signalled = &mut stop => match signalled {
            Ok(()) => {
                info!("shutdown requested");
                Ok(())
            }
            Err(e) => Err(NodeError::Signal(e)),
        },
        Some(ended) = tasks.join_next() => match ended {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(error = %e, "radio channel stopped");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        },
    };

    shutdown(&coordinator, tasks, lifecycle.shutdown_grace).await;
    result
}

/// Park the rig at the watch position and release it. Maintenance only.
pub async fn center(config: &Config) -> Result<(), NodeError> {
    let mut signals = ShutdownSignals::install().map_err(NodeError::Signal)?;
    let mut servo = SysfsServo::open(config.servo.clone())?;
    park_or_release(
        &mut servo,
        config.aim.neutral,
        config.startup_settle(),
        &SystemClock,
        signals.recv(),
    )
    .await
}

/// Park `servo`, or release it at once if `stop` resolves first.
async fn park_or_release<F>(
    servo: &mut dyn Servo,
    neutral: Angle,
    settle: Duration,
    clock: &dyn Clock,
    stop: F,
) -> Result<(), NodeError>
where
    F: Future<Output = io::Result<()>>,
{
    let interrupted = tokio::select! {
        biased;
        signalled = stop => Some(signalled),
        () = sequencer::park(servo, neutral, settle, clock) => None,
    };
    let Some(signalled) = interrupted else {
        return Ok(());
    };

    warn!("interrupted while parking");
    if let Err(e) = servo.release() {
        warn!(error = %e, "servo release failed");
    }
    signalled.map_err(NodeError::Signal)?;
    Err(NodeError::Interrupted)
}

/// Stop admitting alerts, let the cycle in flight finish, release torque.
async fn shutdown(coordinator: &Coordinator, mut tasks: Tasks, grace: Duration) {
    coordinator.close();

    // Releasing waits for the rig, so finishing in time means any cycle
    // in flight completed.
    let finished = timeout(grace, coordinator.release_torque()).await.is_ok();
    tasks.shutdown().await;

    if !finished {
        warn!(
            grace_secs = grace.as_secs(),
            "sequence did not finish in time; abandoned"
        );
        coordinator.release_torque().await;
    }
    info!("stopped");
}

/// SIGINT and SIGTERM, registered from the moment this is created.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: signal::unix::Signal,
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> io::Result<Self> {
        use signal::unix::{SignalKind, signal as unix_signal};

        Ok(Self {
            interrupt: unix_signal(SignalKind::interrupt())?,
            terminate: unix_signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> io::Result<()> {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
        Ok(())
    }
}

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    async fn recv(&mut self) -> io::Result<()> {
        signal::ctrl_c().await
    }
}
