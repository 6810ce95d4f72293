use crate::cli::SchemaArgs;
use crate::error::Result;
use kwforge::engine::catalog::Catalog;
use kwforge::schema::checks::Component;

/// One `name: rule` line per field, in name order.
pub fn render_schema(catalog: &Catalog, component: Component, type_name: &str) -> Result<Vec<String>> {
    let schema = catalog.schema_for(component, type_name)?;
    Ok(schema
        .iter()
        .map(|(name, rule)| format!("{}: {}", name, rule))
        .collect())
}

pub fn run(args: SchemaArgs, catalog: &Catalog) -> Result<()> {
    let lines = render_schema(catalog, args.kind.into(), &args.type_name)?;
    println!("{} ({})", args.type_name, Component::from(args.kind));
    if lines.is_empty() {
        println!("  (no configurable parameters)");
    }
    for line in lines {
        println!("  {}", line);
    }
    Ok(())
}
