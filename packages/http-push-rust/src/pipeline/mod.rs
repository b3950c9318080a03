//! The dispatch pipeline: admission queue, transport stage and cooperative shutdown.
//!
//! - [`queue`]: bounded drop-new admission
//! - [`context`]: per-request correlation and the caller's pending result
//! - [`stage`]: signing, execution and interpretation with bounded parallelism
//! - [`kill_switch`]: the single cancellation control

pub mod context;
pub mod kill_switch;
pub mod queue;
pub mod stage;

pub use context::{DispatchContext, PendingSend, PublishResult, RequestSummary};
pub use kill_switch::{KillSwitch, PipelineState};
pub use queue::{DispatchQueue, OfferError, QueuedDispatch};
pub use stage::{StageExit, TransportStage};
