//! Peer controller
//!
//! One controller runs per peer process and owns that peer's half of the
//! mutual-watchdog protocol: bind to the counterpart (launching it if
//! absent), push the current record on every fresh connect, and treat loss
//! of the binding as the signal to resurrect the other side.
//!
//! Everything is handled serially on a single task. The two processes share
//! no memory; all coordination flows through the binding sockets, and any
//! message may be cut short by a mid-flight kill. The recovery path assumes
//! nothing about ordering: a wakeup may arrive before this peer's own bind
//! handshake finishes, and adoption is store-and-apply either way.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};

use crate::binding::{self, BindingError, PeerMessage, WAKEUP_TIMEOUT};
use crate::callbacks;
use crate::config::{self, KeepAliveConfig, SnapshotStore};
use crate::core::error::Result;
use crate::core::paths::RuntimePaths;
use crate::presenter::Presenter;

use super::{BindingState, CounterpartLauncher, PeerRole};

/// External control of a running controller.
#[derive(Debug)]
pub enum Command {
    /// Adopt a newer record and push it to the counterpart.
    Update(KeepAliveConfig),
    /// Tear down. The binding is released and recovery is not re-entered.
    Stop,
}

/// Rebind delay: immediate first attempt after a loss, then doubling up to
/// the cap while the counterpart stays unreachable.
struct Backoff {
    delay: Duration,
}

impl Backoff {
    const INITIAL: Duration = Duration::from_millis(200);
    const MAX: Duration = Duration::from_secs(5);

    fn new() -> Self {
        Self {
            delay: Self::INITIAL,
        }
    }

    fn next(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (self.delay * 2).min(Self::MAX);
        delay
    }

    fn reset(&mut self) {
        self.delay = Self::INITIAL;
    }
}

/// One peer's state machine: `Unbound → Binding → Bound`, back to `Unbound`
/// on disconnect, and immediately into `Binding` again unless stopping.
pub struct PeerController {
    role: PeerRole,
    paths: RuntimePaths,
    launcher: Box<dyn CounterpartLauncher>,
    presenter: Box<dyn Presenter>,
    storage: SnapshotStore,
    state: BindingState,
    /// Record this peer holds; `None` until one arrives via start payload,
    /// snapshot, or wakeup. A peer holding nothing propagates nothing.
    current: Option<KeepAliveConfig>,
    /// Write half of the live binding to the counterpart
    writer: Option<OwnedWriteHalf>,
    /// Increments per binding so a stale watch task cannot report a loss
    /// against a newer binding
    generation: u64,
    backoff: Backoff,
    stopping: bool,
    tasks: Vec<JoinHandle<()>>,
}

impl PeerController {
    pub fn new(
        role: PeerRole,
        paths: RuntimePaths,
        launcher: Box<dyn CounterpartLauncher>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let storage = SnapshotStore::new(&paths);
        Self {
            role,
            paths,
            launcher,
            presenter,
            storage,
            state: BindingState::Unbound,
            current: None,
            writer: None,
            generation: 0,
            backoff: Backoff::new(),
            stopping: false,
            tasks: Vec::new(),
        }
    }

    /// Seed the controller with the record received at start.
    pub fn with_start_payload(mut self, config: KeepAliveConfig) -> Self {
        self.current = Some(config);
        self
    }

    /// Current binding state.
    pub fn state(&self) -> BindingState {
        self.state
    }

    /// Role this controller serves.
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Run until stopped. Listens for inbound bindings from the counterpart,
    /// keeps an outbound binding alive toward it, and recovers from every
    /// disconnect by relaunching and rebinding.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<()> {
        let listener = binding::bind_listener(&self.paths, self.role)?;
        let (inbound_tx, mut inbound_rx) = mpsc::channel::<PeerMessage>(16);
        let (disconnect_tx, mut disconnect_rx) = mpsc::channel::<u64>(4);

        // The presentation must reflect whatever record the peer starts
        // with, before the first bind attempt completes.
        if let Some(seed) = self.current.clone() {
            config::replace(seed.clone());
            if let Err(e) = self.storage.save(&seed) {
                tracing::warn!(error = %e, "Failed to persist start payload");
            }
        }
        let startup = self.effective_config();
        self.presenter.present(&startup.notification);
        callbacks::notify_work();
        tracing::info!(role = %self.role, "Peer controller started");

        self.state = BindingState::Binding;
        let mut rebind_at = Instant::now();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => self.spawn_inbound(stream, inbound_tx.clone()),
                    Err(e) => tracing::warn!(role = %self.role, error = %e, "Accept failed"),
                },

                Some(message) = inbound_rx.recv() => {
                    if self.handle_message(message).await {
                        break;
                    }
                }

                Some(generation) = disconnect_rx.recv() => {
                    if generation == self.generation && self.writer.is_some() {
                        self.on_binding_lost();
                        rebind_at = Instant::now();
                    }
                }

                command = commands.recv() => match command {
                    Some(Command::Update(config)) => {
                        self.adopt(config);
                        if self.push_wakeup().await.is_err() {
                            self.on_binding_lost();
                            rebind_at = Instant::now();
                        }
                    }
                    Some(Command::Stop) | None => break,
                },

                _ = sleep_until(rebind_at), if self.needs_bind() => {
                    if !self.try_bind(&disconnect_tx).await {
                        rebind_at = Instant::now() + self.backoff.next();
                    }
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn needs_bind(&self) -> bool {
        !self.stopping && self.writer.is_none()
    }

    fn effective_config(&self) -> KeepAliveConfig {
        self.current.clone().unwrap_or_default()
    }

    /// Adopt a record: wholesale replacement, never a merge. The
    /// presentation refresh is applied unconditionally (it is idempotent);
    /// persistence and the host work tick fire only when the record
    /// actually changed, so repeated wakeups with the same record are
    /// observable no further than the first.
    fn adopt(&mut self, config: KeepAliveConfig) {
        let changed = self.current.as_ref() != Some(&config);
        self.current = Some(config.clone());
        config::replace(config.clone());
        self.presenter.present(&config.notification);

        if changed {
            if let Err(e) = self.storage.save(&config) {
                tracing::warn!(role = %self.role, error = %e, "Failed to persist adopted record");
            }
            callbacks::notify_work();
        }
    }

    /// Returns true when the controller should stop.
    async fn handle_message(&mut self, message: PeerMessage) -> bool {
        match message {
            PeerMessage::Wakeup { config } => {
                tracing::debug!(role = %self.role, "Wakeup received");
                self.adopt(config);
                false
            }
            PeerMessage::Shutdown => {
                tracing::info!(role = %self.role, "Shutdown requested");
                if !self.stopping {
                    self.stopping = true;
                    self.forward_shutdown().await;
                }
                true
            }
        }
    }

    /// Forward the teardown once so the counterpart stands down too. Goes
    /// over the live binding when there is one, otherwise over a fresh
    /// connection; a counterpart still mid-bind must not outlive the pair
    /// and resurrect a deliberately stopped peer. Best effort either way.
    async fn forward_shutdown(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = timeout(
                WAKEUP_TIMEOUT,
                binding::write_message(writer, &PeerMessage::Shutdown),
            )
            .await;
            return;
        }

        if let Ok(mut stream) =
            binding::connect_counterpart(&self.paths, self.role.counterpart()).await
        {
            let _ = timeout(
                WAKEUP_TIMEOUT,
                binding::write_message(&mut stream, &PeerMessage::Shutdown),
            )
            .await;
        }
    }

    /// One bind attempt. On success the current record is pushed before the
    /// binding is considered live; a failed push means the counterpart died
    /// between connect and call, which is treated exactly like never having
    /// connected.
    async fn try_bind(&mut self, disconnect_tx: &mpsc::Sender<u64>) -> bool {
        self.state = BindingState::Binding;
        let counterpart = self.role.counterpart();

        let stream = match binding::connect_counterpart(&self.paths, counterpart).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(role = %self.role, error = %e, "Counterpart unreachable");
                self.relaunch_counterpart();
                return false;
            }
        };

        let (read_half, mut write_half) = stream.into_split();

        if let Some(config) = self.current.clone() {
            let delivered = matches!(
                timeout(
                    WAKEUP_TIMEOUT,
                    binding::write_message(&mut write_half, &PeerMessage::Wakeup { config }),
                )
                .await,
                Ok(Ok(()))
            );
            if !delivered {
                tracing::debug!(role = %self.role, "Wakeup delivery failed; counterpart presumed dead");
                self.relaunch_counterpart();
                return false;
            }
        }

        self.generation += 1;
        self.spawn_watch(read_half, self.generation, disconnect_tx.clone());
        self.writer = Some(write_half);
        self.state = BindingState::Bound;
        self.backoff.reset();
        tracing::info!(role = %self.role, "Bound to counterpart");
        true
    }

    /// Push the current record over the live binding, if any. Not being
    /// bound is not a failure; the record travels with the next connect.
    async fn push_wakeup(&mut self) -> std::result::Result<(), BindingError> {
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Ok(()),
        };
        let config = match self.current.clone() {
            Some(config) => config,
            None => return Ok(()),
        };

        match timeout(
            WAKEUP_TIMEOUT,
            binding::write_message(writer, &PeerMessage::Wakeup { config }),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BindingError::Timeout),
        }
    }

    /// The resurrection trigger: release the dead binding and re-enter
    /// recovery, unless this peer is itself tearing down.
    fn on_binding_lost(&mut self) {
        self.writer = None;
        self.generation += 1;
        self.state = BindingState::Unbound;

        if self.stopping {
            return;
        }

        tracing::info!(role = %self.role, "Binding lost; resurrecting counterpart");
        self.state = BindingState::Binding;
        self.backoff.reset();
    }

    fn relaunch_counterpart(&mut self) {
        if self.stopping {
            return;
        }
        if let Err(e) = self.launcher.launch(self.role.counterpart(), &self.paths) {
            tracing::warn!(role = %self.role, error = %e, "Counterpart launch failed; will retry");
        }
    }

    /// Read the counterpart's inbound binding until it drops. Wakeups and
    /// shutdowns arrive here; the connection closing is handled by the
    /// counterpart's own recovery, not ours.
    fn spawn_inbound(&mut self, stream: UnixStream, tx: mpsc::Sender<PeerMessage>) {
        self.prune_tasks();
        let handle = tokio::spawn(async move {
            let mut reader = BufReader::new(stream);
            loop {
                match binding::read_message(&mut reader).await {
                    Ok(Some(message)) => {
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(error = %e, "Inbound binding read failed");
                        break;
                    }
                }
            }
        });
        self.tasks.push(handle);
    }

    /// Watch the outbound binding for EOF. The counterpart never speaks on
    /// this stream; it going quiet-then-closed is the disconnect callback.
    fn spawn_watch(&mut self, read_half: OwnedReadHalf, generation: u64, tx: mpsc::Sender<u64>) {
        self.prune_tasks();
        let handle = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            let _ = tx.send(generation).await;
        });
        self.tasks.push(handle);
    }

    fn prune_tasks(&mut self) {
        self.tasks.retain(|task| !task.is_finished());
    }

    fn shutdown(&mut self) {
        self.stopping = true;
        self.state = BindingState::Unbound;
        // Dropping the write half closes the binding
        self.writer = None;
        callbacks::notify_stop();
        let _ = std::fs::remove_file(binding::socket_path(&self.paths, self.role));
        for task in self.tasks.drain(..) {
            task.abort();
        }
        tracing::info!(role = %self.role, "Peer controller stopped");
    }
}

impl Drop for PeerController {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
