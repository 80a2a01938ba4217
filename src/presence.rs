use crate::context::Shutdown;
use std::io;
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Tooltip shown on the status-area icon
pub const TOOLTIP: &str = "Recycle Bin Limiter";

/// Visibility of the main window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Visible,
    Hidden,
}

/// Thread-safe handle on the main window's visibility.
///
/// Any thread may flip it; the UI loop subscribes and redraws on change.
#[derive(Debug, Clone)]
pub struct WindowHandle {
    state: Arc<watch::Sender<PresenceState>>,
}

impl WindowHandle {
    pub fn new(initial: PresenceState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> PresenceState {
        *self.state.borrow()
    }

    pub fn show(&self) {
        self.set(PresenceState::Visible);
    }

    /// What the native close affordance does: hide, never exit
    pub fn hide(&self) {
        self.set(PresenceState::Hidden);
    }

    pub fn subscribe(&self) -> watch::Receiver<PresenceState> {
        self.state.subscribe()
    }

    fn set(&self, next: PresenceState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!("Window is now {:?}", next);
        }
    }
}

/// Entries of the status-area menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    Show,
    Exit,
}

impl MenuEvent {
    pub const ALL: [MenuEvent; 2] = [MenuEvent::Show, MenuEvent::Exit];

    pub fn label(&self) -> &'static str {
        match self {
            MenuEvent::Show => "Show",
            MenuEvent::Exit => "Exit",
        }
    }
}

/// Sends menu clicks to the status presence thread
#[derive(Debug, Clone)]
pub struct TrayMenu {
    tx: mpsc::UnboundedSender<MenuEvent>,
}

impl TrayMenu {
    pub fn dispatch(&self, event: MenuEvent) {
        if self.tx.send(event).is_err() {
            warn!("Status presence is gone, dropped {:?}", event);
        }
    }
}

/// The status-area icon and its {Show, Exit} menu.
///
/// Menu clicks are handled on a dedicated thread. It shares nothing with the
/// monitor: `Show` only flips window visibility and `Exit` only raises the
/// process-wide stop signal.
pub struct StatusPresence {
    menu: TrayMenu,
    thread: Option<thread::JoinHandle<()>>,
}

impl StatusPresence {
    pub fn spawn(window: WindowHandle, shutdown: Shutdown) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let thread = thread::Builder::new()
            .name("status-presence".to_string())
            .spawn(move || run_menu_loop(rx, window, shutdown))?;

        info!("Status presence '{}' created", TOOLTIP);
        Ok(Self {
            menu: TrayMenu { tx },
            thread: Some(thread),
        })
    }

    pub fn menu(&self) -> TrayMenu {
        self.menu.clone()
    }

    /// Wait for the menu loop to finish, which happens after `Exit`
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Status presence thread panicked");
            }
        }
    }
}

fn run_menu_loop(
    mut rx: mpsc::UnboundedReceiver<MenuEvent>,
    window: WindowHandle,
    shutdown: Shutdown,
) {
    while let Some(event) = rx.blocking_recv() {
        match event {
            MenuEvent::Show => {
                info!("Show requested from status area");
                window.show();
            }
            MenuEvent::Exit => {
                info!("Exit requested from status area");
                shutdown.request();
                break;
            }
        }
    }
    debug!("Status presence loop finished");
}
