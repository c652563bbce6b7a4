//! Controller integration tests
//!
//! These drive two controllers in-process over real sockets in a temp
//! directory, with recording launcher/presenter seams standing in for
//! process spawning and the platform notification surface.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serial_test::serial;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::binding::{self, PeerMessage};
use crate::callbacks;
use crate::config::{BehaviorSpec, KeepAliveConfig, NotificationSpec};
use crate::core::paths::RuntimePaths;
use crate::peer::{BindingState, Command, CounterpartLauncher, LaunchError, PeerController, PeerRole};
use crate::presenter::Presenter;

struct RecordingLauncher {
    launches: Arc<Mutex<Vec<PeerRole>>>,
}

impl CounterpartLauncher for RecordingLauncher {
    fn launch(&mut self, role: PeerRole, _paths: &RuntimePaths) -> Result<(), LaunchError> {
        self.launches.lock().push(role);
        Ok(())
    }
}

struct RecordingPresenter {
    seen: Arc<Mutex<Vec<NotificationSpec>>>,
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, spec: &NotificationSpec) {
        self.seen.lock().push(spec.clone());
    }
}

struct TestPeer {
    handle: JoinHandle<()>,
    commands: mpsc::Sender<Command>,
    seen: Arc<Mutex<Vec<NotificationSpec>>>,
    launches: Arc<Mutex<Vec<PeerRole>>>,
}

impl TestPeer {
    fn last_title(&self) -> Option<String> {
        self.seen.lock().last().map(|spec| spec.title.clone())
    }

    async fn stop(self) {
        let _ = self.commands.send(Command::Stop).await;
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

fn spawn_peer(role: PeerRole, paths: &RuntimePaths, payload: Option<KeepAliveConfig>) -> TestPeer {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let launches = Arc::new(Mutex::new(Vec::new()));

    let mut controller = PeerController::new(
        role,
        paths.clone(),
        Box::new(RecordingLauncher {
            launches: launches.clone(),
        }),
        Box::new(RecordingPresenter { seen: seen.clone() }),
    );
    if let Some(config) = payload {
        controller = controller.with_start_payload(config);
    }

    let (commands, rx) = mpsc::channel(8);
    let handle = tokio::spawn(async move {
        let _ = controller.run(rx).await;
    });

    TestPeer {
        handle,
        commands,
        seen,
        launches,
    }
}

async fn wait_until<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn record(title: &str, content: &str, interval_ms: u64) -> KeepAliveConfig {
    KeepAliveConfig {
        notification: NotificationSpec {
            title: title.to_string(),
            content: content.to_string(),
            ..NotificationSpec::default()
        },
        behavior: BehaviorSpec {
            music_interval_ms: interval_ms,
            ..BehaviorSpec::default()
        },
    }
}

#[test]
fn controller_starts_unbound() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path());
    let launches = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let controller = PeerController::new(
        PeerRole::Local,
        paths,
        Box::new(RecordingLauncher { launches }),
        Box::new(RecordingPresenter { seen }),
    );

    assert_eq!(controller.state(), BindingState::Unbound);
    assert_eq!(controller.role(), PeerRole::Local);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn pair_converges_on_the_sown_record() {
    callbacks::clear();
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path());

    let remote = spawn_peer(PeerRole::Remote, &paths, None);
    let local = spawn_peer(PeerRole::Local, &paths, Some(record("T", "C", 5_000)));

    wait_until("remote to adopt the record", || {
        remote.last_title() == Some("T".to_string())
    })
    .await;

    // The remote presented defaults first, then the adopted record
    assert_eq!(remote.seen.lock().first().unwrap().title, "Vigil");
    assert_eq!(remote.seen.lock().last().unwrap().content, "C");

    local.stop().await;
    remote.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn killed_counterpart_is_relaunched_and_reconverges() {
    callbacks::clear();
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path());
    let config = record("T", "C", 5_000);

    let remote = spawn_peer(PeerRole::Remote, &paths, None);
    let local = spawn_peer(PeerRole::Local, &paths, Some(config.clone()));

    wait_until("remote to adopt the record", || {
        remote.last_title() == Some("T".to_string())
    })
    .await;

    // Kill the remote peer abruptly, as the scheduler would
    let launches_before = local.launches.lock().len();
    remote.handle.abort();

    wait_until("local to attempt resurrection", || {
        local.launches.lock().len() > launches_before
            && local.launches.lock().last() == Some(&PeerRole::Remote)
    })
    .await;

    // A fresh remote comes up with no payload, as after a real relaunch
    let resurrected = spawn_peer(PeerRole::Remote, &paths, None);

    wait_until("resurrected remote to adopt the record", || {
        resurrected.last_title() == Some("T".to_string())
    })
    .await;

    // The final record matches the original exactly
    assert_eq!(
        resurrected.seen.lock().last().unwrap(),
        &config.notification
    );

    local.stop().await;
    resurrected.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn repeated_wakeup_changes_nothing_beyond_the_first() {
    callbacks::clear();
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let sink = ticks.clone();
    callbacks::register_fn(move |times| sink.lock().push(times));

    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path());
    let config = record("T", "C", 5_000);

    let local = spawn_peer(PeerRole::Local, &paths, Some(config.clone()));
    wait_until("the start tick to fire", || !ticks.lock().is_empty()).await;
    let ticks_after_start = ticks.lock().len();

    // Deliver the same record twice, as a reconnecting counterpart would
    let send_paths = paths.clone();
    let send_config = config.clone();
    tokio::task::spawn_blocking(move || {
        for _ in 0..2 {
            binding::send_to_peer(
                &send_paths,
                PeerRole::Local,
                &PeerMessage::Wakeup {
                    config: send_config.clone(),
                },
            )
            .unwrap();
        }
    })
    .await
    .unwrap();

    wait_until("both wakeups to be presented", || local.seen.lock().len() >= 3).await;

    // Presentation refresh repeats harmlessly; the record never changed,
    // so no further work ticks fired
    assert!(local.seen.lock().iter().all(|spec| spec.title == "T"));
    assert_eq!(ticks.lock().len(), ticks_after_start);

    // A genuinely newer record does tick
    let newer = record("U", "C", 5_000);
    let send_paths = paths.clone();
    tokio::task::spawn_blocking(move || {
        binding::send_to_peer(
            &send_paths,
            PeerRole::Local,
            &PeerMessage::Wakeup { config: newer },
        )
        .unwrap();
    })
    .await
    .unwrap();

    wait_until("the newer record to be adopted", || {
        local.last_title() == Some("U".to_string())
    })
    .await;
    assert_eq!(ticks.lock().len(), ticks_after_start + 1);

    local.stop().await;
    callbacks::clear();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn shutdown_stops_both_peers_without_recovery() {
    callbacks::clear();
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path());

    let remote = spawn_peer(PeerRole::Remote, &paths, None);
    let local = spawn_peer(PeerRole::Local, &paths, Some(record("T", "C", 5_000)));

    wait_until("remote to adopt the record", || {
        remote.last_title() == Some("T".to_string())
    })
    .await;

    let local_launches = local.launches.lock().len();

    // Tear down through the local peer, as the orchestrator does
    let send_paths = paths.clone();
    tokio::task::spawn_blocking(move || {
        binding::send_to_peer(&send_paths, PeerRole::Local, &PeerMessage::Shutdown).unwrap();
    })
    .await
    .unwrap();

    // Both controllers exit instead of re-entering recovery
    tokio::time::timeout(Duration::from_secs(5), local.handle)
        .await
        .expect("local peer did not stop")
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), remote.handle)
        .await
        .expect("remote peer did not stop")
        .unwrap();

    // The local peer was bound, so its rebind path was quiescent; the
    // teardown must not have woken it up
    assert_eq!(local.launches.lock().len(), local_launches);

    // Both listener sockets were cleaned up
    assert!(!binding::socket_path(&paths, PeerRole::Local).exists());
    assert!(!binding::socket_path(&paths, PeerRole::Remote).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn update_command_reaches_the_counterpart() {
    callbacks::clear();
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path());

    let remote = spawn_peer(PeerRole::Remote, &paths, None);
    let local = spawn_peer(PeerRole::Local, &paths, Some(record("T", "C", 5_000)));

    wait_until("remote to adopt the record", || {
        remote.last_title() == Some("T".to_string())
    })
    .await;

    local
        .commands
        .send(Command::Update(record("T2", "C2", 7_000)))
        .await
        .unwrap();

    wait_until("remote to adopt the update", || {
        remote.last_title() == Some("T2".to_string())
    })
    .await;
    assert_eq!(remote.seen.lock().last().unwrap().content, "C2");

    local.stop().await;
    remote.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn virgin_peer_never_clobbers_a_seeded_record() {
    callbacks::clear();
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path());

    let local = spawn_peer(PeerRole::Local, &paths, Some(record("T", "C", 5_000)));
    let remote = spawn_peer(PeerRole::Remote, &paths, None);

    wait_until("remote to adopt the record", || {
        remote.last_title() == Some("T".to_string())
    })
    .await;

    // The remote held no record of its own, so nothing it did may have
    // replaced the local peer's presentation
    assert!(local.seen.lock().iter().all(|spec| spec.title == "T"));

    local.stop().await;
    remote.stop().await;
}
