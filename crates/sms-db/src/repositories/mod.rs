//! Repository layer: durable `QueueService`/`LoggingService` implementations.

pub mod logging;
pub mod queue;

pub use logging::SeaOrmLoggingService;
pub use queue::SeaOrmQueueService;
