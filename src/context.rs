use crate::monitor::{MonitorEvent, MonitoringController};
use crate::platform::BinGateway;
use crate::presence::{PresenceState, StatusPresence, TrayMenu, WindowHandle};
use std::io;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Process-wide stop signal.
///
/// Raised once by `Exit` (or Ctrl+C in headless mode); the poll loop and the
/// UI loop both watch it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that exists once per process, built at startup
pub struct AppContext {
    pub controller: MonitoringController,
    pub window: WindowHandle,
    pub shutdown: Shutdown,
    events: Option<mpsc::UnboundedReceiver<MonitorEvent>>,
    presence: Option<StatusPresence>,
}

impl AppContext {
    pub fn new(gateway: Arc<dyn BinGateway>, runtime: Handle, initial: PresenceState) -> Self {
        let shutdown = Shutdown::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller = MonitoringController::new(gateway, events_tx, shutdown.subscribe(), runtime);

        Self {
            controller,
            window: WindowHandle::new(initial),
            shutdown,
            events: Some(events_rx),
            presence: None,
        }
    }

    /// Create the status-area presence. Calling it again keeps the first one.
    pub fn install_presence(&mut self) -> io::Result<TrayMenu> {
        if let Some(presence) = &self.presence {
            debug!("Status presence already installed");
            return Ok(presence.menu());
        }

        let presence = StatusPresence::spawn(self.window.clone(), self.shutdown.clone())?;
        let menu = presence.menu();
        self.presence = Some(presence);
        Ok(menu)
    }

    pub fn has_presence(&self) -> bool {
        self.presence.is_some()
    }

    /// Hand the monitor event stream to its single consumer
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<MonitorEvent>> {
        self.events.take()
    }

    /// Stop everything without waiting for in-flight work
    pub fn exit(&self) {
        info!("Shutting down");
        self.shutdown.request();
    }
}
