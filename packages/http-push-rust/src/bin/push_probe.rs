//! Push probe - publishes a single message to an HTTP endpoint and prints the outcome.
//!
//! Usage:
//!   push-probe --endpoint http://localhost:8080 --target POST:/events --payload '{"a":1}'
//!   push-probe --endpoint http://localhost:8080 --thing-id org.example:lamp --subject toggle --ack-label live-response

use std::time::Duration;

use anyhow::{Context, Result};
use bridge_core::signal::type_tags;
use bridge_core::{
    AcknowledgementLabel, ExternalMessage, GenericSignal, Headers, Message, MessageCommand,
    MessageDirection, Signal, ThingId,
};
use bridge_http_push::{
    AutoAckTarget, HttpPublishTarget, OutboundMessage, PublisherBuilder, PublisherConfig,
    PushEndpoint, SendResult,
};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "push-probe")]
#[command(about = "Publish one message through the HTTP push pipeline")]
#[command(version)]
struct Args {
    /// Base URI of the HTTP endpoint
    #[arg(long, env = "PUSH_PROBE_ENDPOINT")]
    endpoint: String,

    /// Publish target as VERB:path[?query]
    #[arg(long, env = "PUSH_PROBE_TARGET", default_value = "POST:/")]
    target: String,

    /// Text payload to send
    #[arg(long, default_value = "")]
    payload: String,

    /// Content type of the payload; derived from the payload kind if omitted
    #[arg(long)]
    content_type: Option<String>,

    /// Send the payload as a live thing message to this thing (namespace:name)
    #[arg(long, requires = "subject")]
    thing_id: Option<String>,

    /// Subject of the live thing message
    #[arg(long)]
    subject: Option<String>,

    /// Acknowledgement label issued by the target, e.g. live-response
    #[arg(long)]
    ack_label: Option<String>,

    /// Connection id used in logs and metrics
    #[arg(long, env = "PUSH_PROBE_CONNECTION_ID", default_value = "push-probe")]
    connection_id: String,

    /// Request timeout in seconds
    #[arg(long, env = "PUSH_PROBE_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout_secs: u64,

    /// Capacity of the dispatch queue
    #[arg(long, env = "PUSH_PROBE_MAX_QUEUE_SIZE", default_value_t = 10)]
    max_queue_size: usize,

    /// Concurrent requests per client
    #[arg(long, env = "PUSH_PROBE_PARALLELISM", default_value_t = 1)]
    parallelism: usize,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let endpoint = PushEndpoint::parse(&args.endpoint).context("invalid --endpoint")?;
    let target = HttpPublishTarget::parse(&args.target).context("invalid --target")?;
    let outbound = outbound_message(&args, target)?;

    let mut config = PublisherConfig::new(args.connection_id.clone());
    config.http_push.request_timeout = Duration::from_secs(args.request_timeout_secs);
    config.http_push.max_queue_size = args.max_queue_size;
    config.http_push.parallelism = args.parallelism;

    let (publisher, _failures) = PublisherBuilder::new(config, endpoint).start();
    info!(publish_target = %args.target, "Publishing probe message");

    let outcome = tokio::select! {
        result = publisher.publish(outbound) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted before a response arrived");
            publisher.shutdown();
            return Ok(());
        }
    };
    publisher.shutdown();

    match outcome {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Publishing failed");
            if let Some(description) = e.description() {
                eprintln!("{description}");
            }
            Err(e.into())
        }
    }
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn outbound_message(args: &Args, target: HttpPublishTarget) -> Result<OutboundMessage> {
    let mut message = ExternalMessage::text(args.payload.clone());
    if let Some(content_type) = &args.content_type {
        message = message.with_header("content-type", content_type.clone());
    }

    let signal = match (&args.thing_id, &args.subject) {
        (Some(thing_id), Some(subject)) => {
            let thing_id = ThingId::parse(thing_id).context("invalid --thing-id")?;
            Signal::MessageCommand(MessageCommand {
                type_tag: type_tags::SEND_THING_MESSAGE.to_string(),
                thing_id,
                feature_id: None,
                message: Message::new(subject.clone(), MessageDirection::To),
                headers: Headers::new().with("correlation-id", uuid::Uuid::new_v4().to_string()),
            })
        }
        _ => Signal::Generic(GenericSignal {
            type_tag: "probe".to_string(),
            entity_id: None,
            headers: Headers::new().with("correlation-id", uuid::Uuid::new_v4().to_string()),
            value: None,
        }),
    };

    let mut outbound = OutboundMessage::new(signal, target.clone(), message);
    if let Some(label) = &args.ack_label {
        let label = AcknowledgementLabel::new(label).context("invalid --ack-label")?;
        outbound = outbound.with_auto_ack_target(AutoAckTarget::new(target.to_string(), Some(label)));
    }
    Ok(outbound)
}

fn print_result(result: &SendResult) {
    match &result.command_response {
        Some(response) => println!(
            "response: {} (status {})",
            response.type_tag(),
            response.status()
        ),
        None => println!("response: none"),
    }
    if let Some(failure) = &result.send_failure {
        println!("failure: {}", failure.message);
    }
    println!("headers: {}", result.merged_headers);
}
