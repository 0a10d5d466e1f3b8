use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::channel::Broadcast;
use crate::error::Result;
use crate::source::{NotifySource, SourceConnector};

/// Bridges the backend's notification channel into the in-process
/// [`Broadcast`].
///
/// The background task is launched lazily by the first admitted connection
/// and runs until process shutdown. `ensure_started` may be called from any
/// number of racing admissions; the guarded flag makes the launch happen
/// exactly once.
pub struct NotifyListener {
    bus: Arc<Broadcast>,
    connector: Arc<dyn SourceConnector>,
    channel: String,
    /// True once the background task has been spawned. Never reset: a dead
    /// listener means restarting the process, not relaunching.
    started: Mutex<bool>,
    cancel: CancellationToken,
}

impl NotifyListener {
    pub fn new(
        bus: Arc<Broadcast>,
        connector: Arc<dyn SourceConnector>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            connector,
            channel: channel.into(),
            started: Mutex::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Launch the background listen loop if it is not already running.
    ///
    /// Check-and-set happens inside the lock, so concurrent callers cannot
    /// both observe `false`; exactly one spawns the task.
    pub fn ensure_started(&self) {
        let mut started = self.started.lock().unwrap();
        if *started {
            return;
        }
        *started = true;

        let bus = Arc::clone(&self.bus);
        let connector = Arc::clone(&self.connector);
        let channel = self.channel.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            run(bus, connector, channel, cancel).await;
        });
    }

    /// Whether the background task has been launched.
    pub fn is_started(&self) -> bool {
        *self.started.lock().unwrap()
    }

    /// Signal the background task to stop. It unlistens before releasing
    /// its connection and then exits.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Background task body: connect, listen, pump, tear down.
async fn run(
    bus: Arc<Broadcast>,
    connector: Arc<dyn SourceConnector>,
    channel: String,
    cancel: CancellationToken,
) {
    let mut source = match connector.connect().await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "notification listener could not connect; log streaming is disabled");
            return;
        }
    };

    let result = match source.listen(&channel).await {
        Ok(()) => {
            info!(channel, "notification listener started");
            pump(source.as_mut(), &bus, &cancel).await
        }
        Err(e) => Err(e),
    };

    // Stop listening before the connection is released, whatever ended the
    // pump. A pooled connection that still holds the subscription would
    // leak notifications into whatever checks it out next.
    if let Err(e) = source.unlisten().await {
        warn!(error = %e, "UNLISTEN failed during listener teardown");
    }
    drop(source);

    match result {
        Ok(()) => info!(channel, "notification listener stopped"),
        Err(e) => {
            error!(
                error = %e,
                channel,
                "notification listener terminated; connected clients will receive no further log events until restart"
            );
        }
    }
}

/// Receive loop: every payload goes to the broadcast channel verbatim.
///
/// Returns `Ok(())` only on cancellation; any source error ends the loop and
/// propagates to the caller for the loud fatal report.
async fn pump(
    source: &mut dyn NotifySource,
    bus: &Broadcast,
    cancel: &CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            payload = source.recv() => {
                bus.publish(&payload?);
            }
        }
    }
}
