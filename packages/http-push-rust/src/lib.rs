//! Bridge HTTP Push: admission-controlled outbound HTTP delivery with response interpretation.

pub mod codec;
pub mod config;
pub mod error;
pub mod interpret;
pub mod outbound;
pub mod pipeline;
pub mod publisher;
pub mod signing;
pub mod supervision;
pub mod transport;

pub use codec::{HttpPublishTarget, PushEndpoint, WireRequest};
pub use config::{HttpPushConfig, PublisherConfig};
pub use error::{BodyError, CodecError, PublishError, SendFailure, TransportError};
pub use interpret::{CommandResponseValidator, ResponseInterpreter, SendResult};
pub use outbound::{AutoAckTarget, OutboundMessage};
pub use pipeline::{PendingSend, PipelineState};
pub use publisher::{HttpPublisher, PublisherBuilder};
pub use signing::{NoOpSigning, RequestSigning};
pub use supervision::{ConnectionFailure, FailureReporter};
pub use transport::{BodySource, HttpTransport, ReqwestTransport, WireResponse};
