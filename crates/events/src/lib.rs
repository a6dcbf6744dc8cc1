//! Domain events: the `Event` contract, envelopes and the in-process bus.
//!
//! Every successful state-store mutation is recorded as one or more typed domain
//! events, wrapped in an [`EventEnvelope`] and fanned out on an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
