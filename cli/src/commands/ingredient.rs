use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pantry_core::PantryService;
use pantry_core::models::{IngredientFilters, IngredientPatch};

use super::helpers::{or_dash, or_exit_not_found, truncate};

pub(crate) fn cmd_ingredient_add(svc: &PantryService, name: &str, json: bool) -> Result<()> {
    let identity = svc.find_or_create_ingredient(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
    } else if identity.was_created {
        let (id, canonical) = (identity.id, &identity.canonical_name);
        println!("Created ingredient: {canonical} (id: {id})");
    } else {
        let (id, canonical) = (identity.id, &identity.canonical_name);
        println!("Already known: {canonical} (id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_ingredient_list(
    svc: &PantryService,
    search: Option<String>,
    category: Option<String>,
    page: u32,
    limit: u32,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Used in")]
        usage: i64,
    }

    let filters = IngredientFilters { search, category };
    let result = svc.list_ingredients(&filters, page, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.items.is_empty() {
        eprintln!("No ingredients found");
        return Ok(());
    }

    let rows: Vec<IngredientRow> = result
        .items
        .iter()
        .map(|i| IngredientRow {
            id: i.id,
            name: truncate(&i.normalized_name, 35),
            category: or_dash(i.category.as_deref()),
            usage: i.usage_count,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    let (shown, total, pages) = (page + 1, result.total, result.total_pages);
    println!("Page {shown} of {pages} ({total} ingredients)");

    Ok(())
}

pub(crate) fn cmd_ingredient_show(svc: &PantryService, id: i64, json: bool) -> Result<()> {
    let ingredient = or_exit_not_found(svc.get_ingredient(id), json)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ingredient)?);
    } else {
        let name = &ingredient.normalized_name;
        let category = or_dash(ingredient.category.as_deref());
        let usage = ingredient.usage_count;
        println!("{name} (id: {id})");
        println!("  Category: {category}");
        println!("  Used in:  {usage} recipe line(s)");
    }
    Ok(())
}

pub(crate) fn cmd_ingredient_update(
    svc: &PantryService,
    id: i64,
    name: Option<String>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let patch = IngredientPatch { name, category };
    or_exit_not_found(svc.update_ingredient(id, &patch), json)?;
    let updated = svc.get_ingredient(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        let name = &updated.normalized_name;
        let category = or_dash(updated.category.as_deref());
        println!("Updated ingredient {id}: {name} [{category}]");
    }
    Ok(())
}

pub(crate) fn cmd_ingredient_merge(
    svc: &PantryService,
    source: i64,
    target: i64,
    json: bool,
) -> Result<()> {
    let result = or_exit_not_found(svc.merge_ingredients(source, target), json)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "source_id": source,
                "target_id": target,
                "merged_count": result.merged_count,
            }))?
        );
    } else {
        let count = result.merged_count;
        println!("Merged ingredient {source} into {target} ({count} recipe line(s) moved)");
    }
    Ok(())
}
