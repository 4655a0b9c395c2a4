//! Forward an in-memory subscription to a local endpoint
//!
//! Starts an axum endpoint that accepts every envelope except those whose
//! payload is `fail`, publishes a few messages and forwards them.
//!
//! Run with: cargo run --example local_endpoint

use axum::{body::Bytes, http::StatusCode, routing::post, Router};
use pubsub_push::subscription::in_memory;
use pubsub_push::{envelope, DeliveryClient, ForwarderBuilder, HeaderSet, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

async fn handle_push(body: Bytes) -> StatusCode {
    match envelope::decode(&body) {
        Ok(message) if message.data.as_ref() == b"fail" => {
            println!("  endpoint: rejecting {}", message.id);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Ok(message) => {
            println!(
                "  endpoint: {} -> {:?} {:?}",
                message.id,
                String::from_utf8_lossy(&message.data),
                message.attributes
            );
            StatusCode::NO_CONTENT
        }
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("Local Push Endpoint Example");
    println!("===========================\n");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/push", post(handle_push));
    tokio::spawn(async move { axum::serve(listener, app).await });

    let (publisher, mut subscription) = in_memory("demo", 16);
    publisher
        .publish(Message::new("order-1", "hello").with_attribute("kind", "order"))
        .await?;
    publisher.publish(Message::new("order-2", "fail")).await?;
    publisher.publish(Message::new("order-3", "")).await?;
    drop(publisher);

    let headers = HeaderSet::new().with("X-Source=demo");
    let endpoint = Url::parse(&format!("http://{}/push", addr))?;
    let client = DeliveryClient::new(endpoint, &headers)?;
    let forwarder = ForwarderBuilder::new(client, CancellationToken::new())
        .max_outstanding(2)
        .build();

    let stats = forwarder.run(&mut subscription).await?;

    println!("\nacked {}, nacked {}", stats.acked, stats.nacked);
    for (id, decision) in subscription.log().entries() {
        println!("  {} {}", id, decision);
    }
    Ok(())
}
