use futures_util::Stream;
use std::pin::Pin;
use tokio::sync::watch;

pub type GenericBoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Flips to `true` once the owning registry asks every listener to stop.
/// A dropped sender counts as a shutdown too.
pub type ShutdownSignal = watch::Receiver<bool>;
