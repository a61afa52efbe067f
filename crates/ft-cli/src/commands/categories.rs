//! Category management commands.

use std::io::Write;

use anyhow::Result;

use ft_core::{CategoriesResponse, Tracker};

/// Lists categories in display order with their members.
pub fn list<W: Write>(writer: &mut W, tracker: &Tracker, json: bool) -> Result<()> {
    let response = tracker.get_categories();
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&response)?)?;
    } else {
        write!(writer, "{}", format_categories(&response))?;
    }
    Ok(())
}

fn format_categories(response: &CategoriesResponse) -> String {
    let mut output = String::new();
    for name in &response.order {
        output.push_str(name);
        output.push('\n');
        let Some(items) = response.categories.get(name) else {
            continue;
        };
        for (label, members) in [("apps", &items.apps), ("sites", &items.sites)] {
            if !members.is_empty() {
                let joined = members.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
                output.push_str(&format!("  {label}: {joined}\n"));
            }
        }
    }
    output
}

pub fn create<W: Write>(writer: &mut W, tracker: &Tracker, name: &str) -> Result<()> {
    tracker.create_category(name)?;
    writeln!(writer, "Created category '{name}'.")?;
    Ok(())
}

pub fn set<W: Write>(
    writer: &mut W,
    tracker: &Tracker,
    identifier: &str,
    category: &str,
    is_app: bool,
) -> Result<()> {
    tracker.set_item_category(identifier, category, is_app)?;
    writeln!(writer, "Assigned {identifier} to '{category}'.")?;
    Ok(())
}

pub fn unset<W: Write>(writer: &mut W, tracker: &Tracker, identifier: &str) -> Result<()> {
    tracker.set_item_category(identifier, "", false)?;
    writeln!(writer, "Removed {identifier} from its category.")?;
    Ok(())
}

pub fn reorder<W: Write>(writer: &mut W, tracker: &Tracker, names: &[String]) -> Result<()> {
    tracker.reorder_categories(names)?;
    writeln!(writer, "Category order: {}", names.join(", "))?;
    Ok(())
}
