use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use sc_engine::ControllerRegistry;
use sc_loader::LoadConfig;

pub fn run(module_folder: &Path) -> Result<(), String> {
    let catalog = super::discover(Some(module_folder), &LoadConfig::default())?;

    if catalog.is_empty() {
        println!("  No modules found.");
        return Ok(());
    }

    let registry = ControllerRegistry::with_builtins();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Controller", "Templates"]);

    for entry in catalog.entries() {
        let module = &entry.definition;
        let controller = match module.controller.as_deref() {
            Some(name) if registry.contains(name) => name.to_string(),
            Some(name) => format!("{name} (unbound)"),
            None => "-".to_string(),
        };
        table.add_row(vec![
            module.id.to_string(),
            module.name.clone(),
            controller,
            module.template_count().to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} modules", catalog.len());
    Ok(())
}
