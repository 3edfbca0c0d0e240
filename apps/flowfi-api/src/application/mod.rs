//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application use cases and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (storage).
pub mod ports;

/// Use cases for stream intake.
pub mod use_cases;
