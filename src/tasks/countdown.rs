use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::exam::state::Tick;
use crate::services::session::{FinalizeMode, SessionController};

/// Spawns the per-session countdown: one tick per second while the session is
/// active. The task stops on the controller's cancel signal (sent when the
/// phase leaves `active`) and stops itself after triggering the deadline
/// submission, so the timeout path cannot re-enter.
pub(crate) fn spawn(controller: Arc<SessionController>) -> tokio::task::JoinHandle<()> {
    let mut cancel = controller.cancel_signal();
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        // The first interval tick completes immediately; consume it so the
        // clock starts one full second after session start.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.changed() => break,
                _ = ticker.tick() => match controller.tick().await {
                    Tick::Running(_) => {}
                    Tick::Ignored => break,
                    Tick::Expired => {
                        if let Err(err) = controller.finalize(FinalizeMode::AutoDeadline).await {
                            tracing::error!(
                                session_id = %controller.id(),
                                error = %err,
                                "Deadline submission failed"
                            );
                        }
                        break;
                    }
                },
            }
        }
    })
}
