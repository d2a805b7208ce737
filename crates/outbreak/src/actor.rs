//! Controller actor: a Tokio task that owns the [`Controller`].
//!
//! The host adapter talks to it through a cloneable [`ControllerHandle`].
//! Host events and the frame clock are multiplexed in one `select!` loop,
//! so every handler and every timer job still runs one at a time.

use outbreak_host::{Engine, Presentation};
use outbreak_protocol::{Codec, HostEvent};
use outbreak_timer::{FrameClock, FrameConfig};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{Controller, ControllerSnapshot, OutbreakError};

/// Capacity of the command channel.
pub const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Commands sent to the actor.
pub(crate) enum Command {
    /// Deliver one host event.
    Event(HostEvent),

    /// Request a snapshot of the controller state.
    Snapshot {
        reply: oneshot::Sender<ControllerSnapshot>,
    },

    /// Stop the actor and hand the controller back.
    Shutdown,
}

/// Handle to a running controller actor.
///
/// Cheap to clone; it's just an `mpsc::Sender` wrapper.
#[derive(Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<Command>,
}

impl ControllerHandle {
    /// Queues a host event.
    ///
    /// # Errors
    /// - [`OutbreakError::Protocol`] — the event failed validation
    /// - [`OutbreakError::Unavailable`] — the actor has stopped
    pub async fn send_event(&self, event: HostEvent) -> Result<(), OutbreakError> {
        event.validate()?;
        self.sender
            .send(Command::Event(event))
            .await
            .map_err(|_| OutbreakError::Unavailable)
    }

    /// Decodes a host event with `codec` and queues it.
    ///
    /// # Errors
    /// As [`send_event`](Self::send_event), plus
    /// [`OutbreakError::Protocol`] for undecodable bytes.
    pub async fn send_encoded<C: Codec>(&self, codec: &C, data: &[u8]) -> Result<(), OutbreakError> {
        let event: HostEvent = codec.decode(data)?;
        self.send_event(event).await
    }

    /// Requests a snapshot of the controller.
    pub async fn snapshot(&self) -> Result<ControllerSnapshot, OutbreakError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| OutbreakError::Unavailable)?;
        reply_rx.await.map_err(|_| OutbreakError::Unavailable)
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), OutbreakError> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| OutbreakError::Unavailable)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Spawns the actor on the current Tokio runtime.
///
/// The join handle resolves to the controller once the actor stops, so
/// callers can inspect the final state.
pub fn spawn_controller<E, P>(controller: Controller<E, P>) -> (ControllerHandle, JoinHandle<Controller<E, P>>)
where
    E: Engine,
    P: Presentation,
{
    let (sender, receiver) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
    let clock = FrameClock::new(FrameConfig::with_rate(controller.config().frame_rate_hz));
    let task = tokio::spawn(run(controller, receiver, clock));
    (ControllerHandle { sender }, task)
}

async fn run<E, P>(
    mut controller: Controller<E, P>,
    mut receiver: mpsc::Receiver<Command>,
    mut clock: FrameClock,
) -> Controller<E, P>
where
    E: Engine,
    P: Presentation,
{
    tracing::info!(
        frame_ms = clock.frame_duration().as_millis() as u64,
        "controller actor started"
    );

    loop {
        tokio::select! {
            cmd = receiver.recv() => match cmd {
                Some(Command::Event(event)) => {
                    let kind = event.kind();
                    if let Err(e) = controller.dispatch(event) {
                        tracing::warn!(kind, error = %e, "host event rejected");
                    }
                }
                Some(Command::Snapshot { reply }) => {
                    let _ = reply.send(controller.snapshot());
                }
                Some(Command::Shutdown) | None => break,
            },
            frame = clock.wait_for_frame() => {
                let ran = controller.advance(frame.elapsed);
                if ran > 0 {
                    tracing::trace!(frame = frame.frame, ran, "jobs run");
                }
            }
        }
    }

    tracing::info!(frames = clock.frame_count(), "controller actor stopped");
    controller
}
