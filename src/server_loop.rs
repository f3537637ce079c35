use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::info;

use crate::types::{GenericBoxedStream, ShutdownSignal};

/// Await the next item from a stream or a shutdown signal.
///
/// - Returns `Ok(Some(item))` when the stream yields
/// - Returns `Ok(None)` when the stream ends
/// - Returns `Err(())` on shutdown
pub async fn select_stream_or_shutdown<T>(
    mut stream: Pin<&mut (dyn Stream<Item = T> + Send)>,
    shutdown: &mut ShutdownSignal,
) -> Result<Option<T>, ()> {
    tokio::select! {
        item = stream.next() => Ok(item),
        _ = shutdown.wait_for(|stopped| *stopped) => Err(()),
    }
}

/// Drive an accept stream until it ends or shutdown is requested, handing
/// every item to `handler`. The handler is expected to spawn its own task.
pub async fn serve_stream<T>(
    name: &'static str,
    mut stream: GenericBoxedStream<T>,
    mut shutdown: ShutdownSignal,
    handler: impl Fn(T) -> tokio::task::JoinHandle<()> + Send + Sync + 'static,
) {
    loop {
        match select_stream_or_shutdown(stream.as_mut(), &mut shutdown).await {
            Ok(Some(item)) => {
                handler(item);
            }
            Ok(None) => {
                info!("{} listener stream ended", name);
                break;
            }
            Err(()) => {
                info!("{} listener shutdown requested", name);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_serve_stream_handles_every_item_until_end() {
        let (_tx, rx) = watch::channel(false);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let stream: GenericBoxedStream<u32> = Box::pin(futures_util::stream::iter(vec![1, 2, 3]));
        serve_stream("test", stream, rx, move |_item| {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async {})
        })
        .await;

        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_serve_stream_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let stream: GenericBoxedStream<u32> = Box::pin(futures_util::stream::pending());
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            serve_stream("test", stream, rx, |_item| tokio::spawn(async {})),
        )
        .await
        .expect("loop should exit once shutdown is signalled");
    }
}
