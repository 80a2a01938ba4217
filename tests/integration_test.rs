use bin_limiter::{
    AppContext, BinGateway, GatewayError, MenuEvent, MonitorEvent, MonitoringState,
    PresenceState, StartError, POLL_INTERVAL,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

/// Records every gateway call in order
struct RecordingBin {
    sizes: Mutex<VecDeque<bin_limiter::Result<u64>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingBin {
    fn new(sizes: Vec<bin_limiter::Result<u64>>) -> Arc<Self> {
        Arc::new(Self {
            sizes: Mutex::new(sizes.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl BinGateway for RecordingBin {
    fn current_size_gb(&self) -> bin_limiter::Result<u64> {
        self.calls.lock().unwrap().push("size");
        self.sizes.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }

    fn purge(&self) -> bin_limiter::Result<()> {
        self.calls.lock().unwrap().push("purge");
        Ok(())
    }
}

fn app(bin: &Arc<RecordingBin>) -> AppContext {
    let gateway: Arc<dyn BinGateway> = bin.clone();
    AppContext::new(gateway, Handle::current(), PresenceState::Visible)
}

async fn cycles(events: &mut UnboundedReceiver<MonitorEvent>, count: usize) -> Vec<MonitorEvent> {
    let mut seen = Vec::new();
    let mut completed = 0;
    while completed < count {
        let event = events.recv().await.expect("monitor events closed");
        if matches!(event, MonitorEvent::CycleCompleted { .. }) {
            completed += 1;
        }
        seen.push(event);
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn test_purges_once_then_idles() {
    let bin = RecordingBin::new(vec![Ok(6), Ok(0)]);
    let mut ctx = app(&bin);
    let mut events = ctx.take_events().unwrap();

    ctx.controller.start("5").unwrap();
    let seen = cycles(&mut events, 2).await;

    assert_eq!(
        seen,
        vec![
            MonitorEvent::CycleCompleted {
                size_gb: 6,
                purged: true
            },
            MonitorEvent::CycleCompleted {
                size_gb: 0,
                purged: false
            },
        ]
    );
    assert_eq!(bin.calls(), vec!["size", "purge", "size"]);
    ctx.exit();
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_input_is_rejected() {
    let bin = RecordingBin::new(vec![]);
    let mut ctx = app(&bin);

    let err = ctx.controller.start("15").unwrap_err();
    assert!(matches!(err, StartError::Invalid(_)));
    assert_eq!(err.to_string(), "Size must be between 1 GB and 10 GB.");
    assert_eq!(ctx.controller.state(), MonitoringState::Idle);

    tokio::time::sleep(POLL_INTERVAL * 2).await;
    assert!(bin.calls().is_empty());

    // The panel may retry with a good value.
    ctx.controller.start("10").unwrap();
    assert!(ctx.controller.is_running());
    ctx.exit();
}

#[tokio::test(start_paused = true)]
async fn test_query_failure_is_reported_and_polling_continues() {
    let bin = RecordingBin::new(vec![
        Err(GatewayError::QueryFailed("shell unavailable".to_string())),
        Ok(1),
    ]);
    let mut ctx = app(&bin);
    let mut events = ctx.take_events().unwrap();

    ctx.controller.start("1").unwrap();
    let seen = cycles(&mut events, 2).await;

    assert!(matches!(&seen[0], MonitorEvent::QueryFailed { message } if message.contains("shell unavailable")));
    assert_eq!(
        seen[1],
        MonitorEvent::CycleCompleted {
            size_gb: 0,
            purged: false
        }
    );
    assert_eq!(
        seen[2],
        MonitorEvent::CycleCompleted {
            size_gb: 1,
            purged: true
        }
    );
    assert_eq!(bin.calls(), vec!["size", "size", "purge"]);
    ctx.exit();
}

#[tokio::test]
async fn test_hidden_window_keeps_polling_until_exit() {
    let bin = RecordingBin::new(vec![]);
    let mut ctx = app(&bin);
    let mut events = ctx.take_events().unwrap();
    let menu = ctx.install_presence().unwrap();

    ctx.controller.start("2").unwrap();
    ctx.window.hide();
    assert_eq!(ctx.window.state(), PresenceState::Hidden);
    cycles(&mut events, 1).await;

    let mut visibility = ctx.window.subscribe();
    menu.dispatch(MenuEvent::Show);
    visibility.changed().await.unwrap();
    assert_eq!(ctx.window.state(), PresenceState::Visible);

    menu.dispatch(MenuEvent::Exit);
    while let Some(event) = events.recv().await {
        if event == MonitorEvent::Stopped {
            break;
        }
    }
    assert!(ctx.shutdown.is_requested());
}

#[cfg(all(not(windows), not(target_os = "macos")))]
mod trash {
    use bin_limiter::platform::unix::TrashBin;
    use bin_limiter::BinGateway;
    use std::fs;
    use tempfile::TempDir;

    fn populated_trash() -> (TempDir, TrashBin) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("files/photos")).unwrap();
        fs::create_dir_all(root.join("info")).unwrap();
        fs::write(root.join("files/notes.txt"), b"Hello, World!").unwrap();
        fs::write(root.join("files/photos/a.jpg"), vec![0u8; 1024]).unwrap();
        fs::write(root.join("info/notes.txt.trashinfo"), b"[Trash Info]\n").unwrap();
        fs::write(root.join("info/photos.trashinfo"), b"[Trash Info]\n").unwrap();
        fs::write(root.join("directorysizes"), b"1024 0 photos\n").unwrap();

        let trash = TrashBin::new(root);
        (temp_dir, trash)
    }

    #[test]
    fn test_trash_size() {
        let (_temp_dir, trash) = populated_trash();
        assert_eq!(trash.size_bytes().unwrap(), 13 + 1024);
        assert_eq!(trash.current_size_gb().unwrap(), 0);
    }

    #[test]
    fn test_missing_trash_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let trash = TrashBin::new(temp_dir.path().join("Trash"));
        assert_eq!(trash.current_size_gb().unwrap(), 0);
        trash.purge().unwrap();
    }

    #[test]
    fn test_purge_empties_files_and_info() {
        let (_temp_dir, trash) = populated_trash();
        trash.purge().unwrap();

        let root = trash.root();
        assert_eq!(fs::read_dir(root.join("files")).unwrap().count(), 0);
        assert_eq!(fs::read_dir(root.join("info")).unwrap().count(), 0);
        assert!(!root.join("directorysizes").exists());
        assert_eq!(trash.size_bytes().unwrap(), 0);

        // Purging an empty trash is a no-op.
        trash.purge().unwrap();
    }
}
