//! Tower middleware layers for the execution stack.
//!
//! - [`timeout`]: Per-request timeout enforcement
//! - [`timer`]: Request-duration histogram, bounded to timeout plus grace
//! - [`stack`]: Composes the layers around a transport

pub mod stack;
pub mod timeout;
pub mod timer;

pub use stack::{build_execute_stack, ExecuteStack, TransportService};
pub use timeout::TimeoutLayer;
pub use timer::RequestTimerLayer;
