use crate::error::StreamResult;
use crate::pull_to_push::{
    sequence_to_observable, sequence_to_observable_with, sequence_to_publisher,
    sequence_to_publisher_with, SequenceObservable, SequencePublisher,
};
use crate::push_to_pull::{observable_to_sequence, observable_to_sequence_with, ObservableSequence};
use crate::reactive::Observable;
use crate::sequence::{LazySequence, RS2Stream};
use crate::stream_configuration::BridgeConfig;

/// Extension trait bridging lazy sequences to push sources
pub trait LazySequenceExt<T>: LazySequence<T> + Sized + 'static
where
    T: Send + 'static,
{
    /// Expose this sequence as a cold observable
    fn into_observable(self) -> SequenceObservable<Self> {
        sequence_to_observable(self)
    }

    /// Expose this sequence as a cold observable with custom configuration
    fn into_observable_with(self, config: BridgeConfig) -> SequenceObservable<Self> {
        sequence_to_observable_with(self, config)
    }

    /// Expose this sequence as a demand-driven publisher
    fn into_publisher(self) -> SequencePublisher<Self> {
        sequence_to_publisher(self)
    }

    /// Expose this sequence as a demand-driven publisher with custom configuration
    fn into_publisher_with(self, config: BridgeConfig) -> SequencePublisher<Self> {
        sequence_to_publisher_with(self, config)
    }
}

impl<T, S> LazySequenceExt<T> for S
where
    T: Send + 'static,
    S: LazySequence<T> + 'static,
{
}

/// Extension trait bridging push sources to lazy sequences
pub trait ObservableExt<T>: Observable<T> + Sized + 'static
where
    T: Send + 'static,
{
    /// View this source as a lazy sequence buffering up to `capacity` items
    fn into_sequence(self, capacity: usize) -> ObservableSequence<Self> {
        observable_to_sequence(self, capacity)
    }

    /// View this source as a lazy sequence with custom configuration
    fn into_sequence_with(self, config: BridgeConfig) -> ObservableSequence<Self> {
        observable_to_sequence_with(self, config)
    }

    /// Consume this source once as a stream
    fn into_stream(self, capacity: usize) -> RS2Stream<StreamResult<T>> {
        observable_to_sequence(self, capacity).open()
    }
}

impl<T, O> ObservableExt<T> for O
where
    T: Send + 'static,
    O: Observable<T> + 'static,
{
}
