//! Startup schema relaxation.
//!
//! This example loads a gate configuration from JSON, relaxes a small set of
//! endpoint schemas and prints them before and after.
//!
//! Run with: `cargo run --example startup_relax`

use content_gate::{
    CollectionParameterRelaxer, CollectionSchemaEntry, EndpointSchemas, GateConfig,
    ParamConstraint,
};

const CONFIG: &str = r#"{
    "default_per_page": 20,
    "per_page_maximum": 500
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    println!("=== Startup Relax Example ===\n");

    let config = GateConfig::from_json(CONFIG)?;
    println!("Loaded config: default_per_page={}", config.default_per_page);

    let mut schemas = EndpointSchemas::new();
    schemas.insert(
        "/wp/v2/posts".to_string(),
        CollectionSchemaEntry::default()
            .with_arg("per_page", ParamConstraint::range(1, 100))
            .with_arg("orderby", ParamConstraint::one_of(["date", "id", "title"]))
            .with_arg("order", ParamConstraint::one_of(["asc", "desc"])),
    );
    schemas.insert(
        "/wp/v2/posts/(?P<id>[\\d]+)".to_string(),
        CollectionSchemaEntry::default()
            .with_arg("context", ParamConstraint::one_of(["view", "embed", "edit"])),
    );

    println!("--- Before ---");
    println!("{}", serde_json::to_string_pretty(&schemas)?);

    let relaxer = CollectionParameterRelaxer::new(&config);
    let changed = relaxer.apply(&mut schemas);

    println!("\n--- After ({} endpoint(s) relaxed) ---", changed);
    println!("{}", serde_json::to_string_pretty(&schemas)?);

    println!("\n=== Example Complete ===");
    Ok(())
}
