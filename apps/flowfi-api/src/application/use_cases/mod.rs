//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod create_stream;

pub use create_stream::{CreateStreamError, CreateStreamUseCase, CreatedStream};
