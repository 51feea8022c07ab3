use log::{debug, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::messages::ServerMessage;

enum Step {
    Continue,
    SourceClosed,
    Stop,
}

async fn deliver(
    received: Result<ServerMessage, RecvError>,
    outbound: &mpsc::Sender<ServerMessage>,
) -> Step {
    match received {
        Ok(message) => match outbound.send(message).await {
            Ok(()) => Step::Continue,
            Err(_) => Step::Stop,
        },
        Err(RecvError::Lagged(skipped)) => {
            warn!("Connection lagged, skipped {} pushes", skipped);
            Step::Continue
        }
        Err(RecvError::Closed) => Step::SourceClosed,
    }
}

/// Drain a room and a personal channel into one connection's outbound queue
///
/// Ends when the connection's receiver is dropped or both sources close.
/// Lagged receivers skip ahead; the next `dealUpdated` carries full state.
pub fn spawn_forwarder(
    mut room: broadcast::Receiver<ServerMessage>,
    mut personal: broadcast::Receiver<ServerMessage>,
    outbound: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut room_open = true;
        let mut personal_open = true;
        while room_open || personal_open {
            tokio::select! {
                msg = room.recv(), if room_open => match deliver(msg, &outbound).await {
                    Step::Continue => {}
                    Step::SourceClosed => room_open = false,
                    Step::Stop => break,
                },
                msg = personal.recv(), if personal_open => match deliver(msg, &outbound).await {
                    Step::Continue => {}
                    Step::SourceClosed => personal_open = false,
                    Step::Stop => break,
                },
            }
        }
        debug!("Forwarder stopped");
    })
}
