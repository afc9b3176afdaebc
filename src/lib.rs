pub mod error;
pub mod registry;
pub mod terminal;
pub mod channel;

pub mod reactive;
pub mod sequence;

pub mod stream_configuration;
pub mod push_to_pull;
pub mod pull_to_push;
pub mod single;
pub mod bridge_ext;

// Re-export the bridge surface at the crate root
pub use bridge_ext::{LazySequenceExt, ObservableExt};
pub use error::{StreamError, StreamResult};
pub use pull_to_push::{
    sequence_to_observable, sequence_to_observable_with, sequence_to_publisher,
    sequence_to_publisher_with, BridgeSubscription, SequenceObservable, SequencePublisher,
};
pub use push_to_pull::{
    observable_to_sequence, observable_to_sequence_with, observable_to_stream, ObservableSequence,
};
pub use sequence::{LazySequence, RS2Stream};
pub use single::{deferred_to_maybe, deferred_to_single, task_to_single};
pub use stream_configuration::{BridgeConfig, DEFAULT_BUFFER_CAPACITY};
pub use terminal::{
    reset_undeliverable_handler, set_undeliverable_handler, BridgeState, UndeliverablePolicy,
};
