use browserpilot_tools::ActionRegistry;

pub fn run() -> anyhow::Result<()> {
    let registry = ActionRegistry::with_defaults();

    println!("Available actions:\n");
    for schema in registry.schemas() {
        let name = schema["name"].as_str().unwrap_or("");
        let description = schema["description"].as_str().unwrap_or("");
        let required = schema["input_schema"]["required"]
            .as_array()
            .map(|args| {
                args.iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        if required.is_empty() {
            println!("  {:<14} {}", name, description);
        } else {
            println!("  {:<14} {} (requires: {})", name, description, required);
        }
    }
    Ok(())
}
