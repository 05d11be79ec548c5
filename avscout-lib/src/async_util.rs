//! Driving an async task while draining its event channel.

use std::future::Future;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Duration, Instant};

/// How long to keep draining events after the task has finished. Bounds the wait
/// when a sender clone outlives the task.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `task` to completion, calling `on_event` for every event it sends.
///
/// Events still queued when the task finishes are delivered before returning.
pub async fn run_with_events<F, E, R>(
    task: F,
    mut events: UnboundedReceiver<E>,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
{
    tokio::pin!(task);
    let mut delivered: u64 = 0;

    let result = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = events.recv() => match event {
                Some(e) => {
                    delivered += 1;
                    on_event(e);
                }
                None => break None,
            }
        }
    };

    let Some(result) = result else {
        log::debug!("run_with_events: channel closed after {} events", delivered);
        return task.await;
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(e)) => {
                delivered += 1;
                on_event(e);
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "run_with_events: gave up draining after {}s ({} events delivered)",
                    DRAIN_TIMEOUT.as_secs(),
                    delivered
                );
                break;
            }
        }
    }

    result
}
