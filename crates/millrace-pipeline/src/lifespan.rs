//! Host lifecycle acknowledgements.

use millrace_core::{FrameReceiver, FrameSender, InboundEvent, OutboundFrame, TransportResult};
use tracing::{debug, info};

/// Acknowledge startup and shutdown events until the host shuts down.
///
/// Runs for the lifetime of the host process on its own scope, next to the
/// per-request exchanges. Returns after acknowledging shutdown, or when
/// the channel ends early.
pub(crate) async fn run(
    rx: &mut dyn FrameReceiver,
    tx: &mut dyn FrameSender,
) -> TransportResult<()> {
    loop {
        match rx.receive().await? {
            InboundEvent::Startup => {
                info!("host startup acknowledged");
                tx.send(OutboundFrame::StartupComplete).await?;
            }
            InboundEvent::Shutdown => {
                info!("host shutdown acknowledged");
                tx.send(OutboundFrame::ShutdownComplete).await?;
                return Ok(());
            }
            InboundEvent::Disconnect => return Ok(()),
            other => {
                debug!(event = ?other, "ignoring event on the lifecycle channel");
            }
        }
    }
}
