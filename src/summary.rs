// Periodic summary logging
//
// Ingest and query keep rolling counters that are reported and reset once per
// interval. Each counter set owns its atomics; the task below only calls
// `log_and_reset` on a timer and never touches the hot path.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A counter set that can report itself
pub trait Summarize: Send + Sync + 'static {
    /// Swap every counter to zero and log one line covering `interval`
    fn log_and_reset(&self, interval: Duration);
}

/// Spawn the summary timer for one counter set
///
/// The first report happens one full interval after spawning. Abort the
/// returned handle to stop reporting.
pub fn spawn_summary_task(source: Arc<dyn Summarize>, interval: Duration) -> JoinHandle<()> {
    let period = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            source.log_and_reset(period);
        }
    })
}
