//! Preview-aware request flow.
//!
//! This example walks three requests through both hook points:
//! 1. A plain collection request with a legacy filter
//! 2. The same request with a `Preview: true` header
//! 3. Single-resource gating of a draft and of an attachment
//!
//! Run with: `cargo run --example preview_flow`

use content_gate::query::RequestParams;
use content_gate::{
    ContentStatus, ContentType, GateConfig, QueryVars, RequestContext,
    RequestNormalizationMiddleware, ResourceItem,
};
use serde_json::json;

const URI: &str = "/wp-json/wp/v2/posts?filter[post__in][]=3&filter[post__in][]=0&filter[post_status]=draft&filter[s]=rust";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Preview Flow Example ===\n");

    let engine_vars: QueryVars = ["year", "monthnum"].into_iter().collect();
    let middleware = RequestNormalizationMiddleware::new(&GateConfig::default(), &engine_vars);

    // Scenario 1: Plain request
    println!("--- Scenario 1: Plain Collection Request ---");
    let ctx = RequestContext::from_uri("req-001", URI)?.build();
    let scope = middleware.begin(&ctx);

    let mut params = RequestParams::new();
    scope.before_dispatch(false).apply_to(&mut params);
    println!("Parameters: {}", serde_json::to_string(&params)?);
    println!("Client asked for drafts; status stays publish only\n");

    // Scenario 2: Preview header
    println!("--- Scenario 2: Preview Header ---");
    let mut builder = RequestContext::from_uri("req-002", URI)?;
    builder.add_header("Preview", "TRUE");
    let ctx = builder.build();
    let scope = middleware.begin(&ctx);

    let mut params = RequestParams::new();
    scope.before_dispatch(false).apply_to(&mut params);
    println!("Parameters: {}", serde_json::to_string(&params)?);
    println!();

    // Scenario 3: Single resources
    println!("--- Scenario 3: Single Resource Gate ---");
    let ctx = RequestContext::from_uri("req-003", "/wp-json/wp/v2/posts/12")?.build();
    let scope = middleware.begin(&ctx);

    let draft = ResourceItem::new(ContentType::new("post"), ContentStatus::Draft);
    match scope.after_prepare(json!({ "id": 12, "status": "draft" }), &draft) {
        Ok(body) => println!("Served: {}", body),
        Err(denied) => println!("Denied (expected): {}", serde_json::to_string(&denied)?),
    }

    let media = ResourceItem::new(ContentType::attachment(), ContentStatus::Inherited);
    match scope.after_prepare(json!({ "id": 40, "media_type": "image" }), &media) {
        Ok(body) => println!("Served attachment: {}", body),
        Err(denied) => println!("Unexpected denial: {}", denied),
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
