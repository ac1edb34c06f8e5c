//! Atomic operations extension
//!
//! A batch is handled in three passes:
//!
//! 1. [`OperationsReader`] checks the structure of every operation and converts it into an
//!    [`Operation`].
//! 2. [`LocalIdValidator`] replays the batch against a fresh [`LocalIdTracker`] with
//!    placeholder identities, rejecting every local-ID misuse before anything runs.
//! 3. [`OperationsProcessor`] runs the operations in order against an
//!    [`OperationHandler`], replacing consumed local IDs with the identities returned by
//!    earlier operations, and renders `atomic:results`.

pub mod local_ids;
pub mod operation;
pub mod processor;
pub mod reader;
pub mod validator;

pub use local_ids::LocalIdTracker;
pub use operation::{Operation, PrimaryLocation};
pub use processor::{OperationHandler, OperationsProcessor, ProcessError};
pub use reader::OperationsReader;
pub use validator::LocalIdValidator;
