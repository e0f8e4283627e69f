use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::scheduler::TimerTicket;

use super::commands::{Command, Reply};
use super::focus::FocusService;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Window used by `snapshot` when the caller does not name one.
pub const DEFAULT_SNAPSHOT_HOURS: i64 = 4;

struct Request {
    command: Command,
    reply: Option<oneshot::Sender<Reply>>,
}

/// Cloneable sender side of the control loop.
#[derive(Clone)]
pub struct ServiceHandle {
    sender: mpsc::UnboundedSender<Request>,
}

impl ServiceHandle {
    /// Move `service` onto its own task. The task ends on `Shutdown`, when
    /// `shutdown` is cancelled, or once every handle is dropped, and hands the
    /// service back.
    pub fn spawn(
        service: FocusService,
        timers: mpsc::UnboundedReceiver<TimerTicket>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<FocusService>) {
        let (sender, requests) = mpsc::unbounded_channel();
        let task = tokio::spawn(service.run(requests, timers, shutdown));
        (Self { sender }, task)
    }

    /// Submit a command and wait for its reply.
    pub async fn send(&self, command: Command) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Request {
                command,
                reply: Some(reply_tx),
            })
            .map_err(|_| anyhow!("focus service is no longer running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("focus service stopped before replying"))
    }

    /// Submit a command without waiting.
    pub fn post(&self, command: Command) -> Result<()> {
        self.sender
            .send(Request {
                command,
                reply: None,
            })
            .map_err(|_| anyhow!("focus service is no longer running"))
    }
}

impl FocusService {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut timers: mpsc::UnboundedReceiver<TimerTicket>,
        shutdown: CancellationToken,
    ) -> FocusService {
        log_info!("Focus service started");

        loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else {
                        log_info!("All service handles dropped");
                        break;
                    };
                    let is_shutdown = matches!(request.command, Command::Shutdown);
                    log_debug!("command {}", request.command.name());

                    let reply = self.handle(request.command);
                    if let Some(reply_tx) = request.reply {
                        if reply_tx.send(reply).is_err() {
                            log_warn!("Command caller dropped before receiving reply");
                        }
                    }
                    if is_shutdown {
                        break;
                    }
                }
                Some(ticket) = timers.recv() => {
                    self.on_timer_fired(ticket);
                }
                _ = shutdown.cancelled() => {
                    log_info!("Focus service shutting down");
                    break;
                }
            }
        }

        self.stop_monitoring();
        self
    }
}
