use crate::cli::{ComponentKind, ListArgs};
use crate::error::Result;
use kwforge::engine::catalog::Catalog;
use kwforge::schema::checks::Component;

pub fn render_list(catalog: &Catalog, kind: Option<ComponentKind>) -> Vec<String> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ComponentKind::ALL.to_vec(),
    };
    let mut lines = Vec::new();
    for kind in kinds {
        let component = Component::from(kind);
        lines.push(format!("{}:", component));
        lines.extend(
            catalog
                .type_names(component)
                .into_iter()
                .map(|name| format!("  {}", name)),
        );
    }
    lines
}

pub fn run(args: ListArgs, catalog: &Catalog) -> Result<()> {
    for line in render_list(catalog, args.kind) {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_one_family() {
        let catalog = Catalog::standard().unwrap();
        assert_eq!(
            render_list(&catalog, Some(ComponentKind::Restraint)),
            ["restraint:", "  FlatBottom", "  Harmonic"]
        );
    }

    #[test]
    fn lists_every_family_by_default() {
        let catalog = Catalog::standard().unwrap();
        let lines = render_list(&catalog, None);
        assert_eq!(lines[0], "restraint:");
        assert!(lines.contains(&"MCMC move:".to_string()));
        assert!(lines.contains(&"  SequenceMove".to_string()));
        assert!(lines.contains(&"sampler:".to_string()));
        assert_eq!(lines.len(), 3 + 2 + 6 + 3);
    }
}
