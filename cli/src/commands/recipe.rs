use anyhow::{Context, Result};
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pantry_core::PantryService;
use pantry_core::RecipeExtractor;
use pantry_core::models::{ExtractedRecipe, NewIngredientLine};
use pantry_core::quantity::format_amount;

use super::helpers::{or_dash, or_exit_not_found, truncate};

/// Extracts recipes from Cooklang files on disk. The source is a file path.
pub(crate) struct CooklangExtractor;

impl RecipeExtractor for CooklangExtractor {
    fn extract(&self, source: &str) -> Result<ExtractedRecipe> {
        let path = Path::new(source);
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let stem = path.file_stem().and_then(|s| s.to_str());
        parse_cooklang(&input, stem)
    }
}

fn parse_cooklang(input: &str, fallback_title: Option<&str>) -> Result<ExtractedRecipe> {
    let (recipe, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let title = recipe
        .metadata
        .title()
        .map(String::from)
        .or_else(|| fallback_title.map(String::from))
        .context("Could not determine recipe title. Add `title` metadata to the file")?;

    let servings = recipe
        .metadata
        .servings()
        .and_then(|s| s.as_number().map(f64::from));

    let converter = cooklang::Converter::default();
    let ingredient_lines = recipe
        .group_ingredients(&converter)
        .iter()
        .flat_map(cooklang_ingredient_lines)
        .collect();

    Ok(ExtractedRecipe {
        title,
        servings,
        ingredient_lines,
        step_lines: step_lines(&recipe),
        ..ExtractedRecipe::default()
    })
}

/// One line per grouped quantity; an ingredient with no quantity still gets a line.
fn cooklang_ingredient_lines(
    gi: &cooklang::ingredient_list::GroupedIngredient<'_>,
) -> Vec<NewIngredientLine> {
    let name = gi.ingredient.display_name().to_string();
    let notes = gi.ingredient.note.clone();

    let lines: Vec<NewIngredientLine> = gi
        .quantity
        .iter()
        .map(|qty: &cooklang::Quantity| {
            let quantity_text = match qty.value() {
                cooklang::Value::Number(n) => format_amount(n.value()),
                cooklang::Value::Range { start, end } => format!(
                    "{}-{}",
                    format_amount(start.value()),
                    format_amount(end.value())
                ),
                cooklang::Value::Text(t) => t.clone(),
            };
            NewIngredientLine {
                name: name.clone(),
                quantity_text: Some(quantity_text),
                unit: qty.unit().map(String::from),
                notes: notes.clone(),
            }
        })
        .collect();

    if lines.is_empty() {
        vec![NewIngredientLine {
            name,
            quantity_text: None,
            unit: None,
            notes,
        }]
    } else {
        lines
    }
}

/// Flatten each step back into plain text.
fn step_lines(recipe: &cooklang::Recipe) -> Vec<String> {
    recipe
        .sections
        .iter()
        .flat_map(|section| section.content.iter())
        .filter_map(|content| match content {
            cooklang::Content::Step(step) => Some(step),
            cooklang::Content::Text(_) => None,
        })
        .map(|step| {
            let mut text = String::new();
            for item in &step.items {
                match item {
                    cooklang::Item::Text { value } => text.push_str(value),
                    cooklang::Item::Ingredient { index } => {
                        if let Some(ingredient) = recipe.ingredients.get(*index) {
                            text.push_str(&ingredient.display_name());
                        }
                    }
                    cooklang::Item::Cookware { index } => {
                        if let Some(cookware) = recipe.cookware.get(*index) {
                            text.push_str(&cookware.name);
                        }
                    }
                    cooklang::Item::Timer { index } => {
                        if let Some(quantity) =
                            recipe.timers.get(*index).and_then(|t| t.quantity.as_ref())
                        {
                            text.push_str(&quantity.to_string());
                        }
                    }
                    cooklang::Item::InlineQuantity { index } => {
                        if let Some(quantity) = recipe.inline_quantities.get(*index) {
                            text.push_str(&quantity.to_string());
                        }
                    }
                }
            }
            text.trim().to_string()
        })
        .filter(|text| !text.is_empty())
        .collect()
}

pub(crate) fn cmd_recipe_import(
    svc: &PantryService,
    file: &Path,
    url: Option<&str>,
    json: bool,
) -> Result<()> {
    let source = file.to_string_lossy();
    let saved = svc.import_recipe(&CooklangExtractor, &source, url)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
        return Ok(());
    }

    let (id, title) = (saved.recipe.id, &saved.recipe.title);
    if saved.was_created {
        let lines = svc.db().get_recipe_lines(id)?.len();
        println!("Imported recipe: {title} (id: {id}, {lines} ingredient lines)");
    } else {
        println!("Already imported: {title} (id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(svc: &PantryService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Servings")]
        servings: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    let recipes = svc.db().list_recipes()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        eprintln!("No recipes found");
        return Ok(());
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            title: truncate(&r.title, 35),
            servings: r.servings.map_or("-".into(), format_amount),
            source: truncate(&or_dash(r.canonical_url.as_deref()), 45),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &PantryService, id: i64, json: bool) -> Result<()> {
    let detail = or_exit_not_found(svc.get_recipe_detail(id), json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let title = &detail.recipe.title;
    println!("=== {title} ===");
    if let Some(url) = &detail.recipe.source_url {
        println!("  Source: {url}");
    }
    if let Some(servings) = detail.recipe.servings {
        let servings = format_amount(servings);
        println!("  Servings: {servings}");
    }

    println!("\n  INGREDIENTS:");
    for line in &detail.ingredients {
        let amount = [line.quantity_text.as_deref(), line.unit.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let name = &line.ingredient_name;
        let notes = line
            .notes
            .as_deref()
            .map(|n| format!(" ({n})"))
            .unwrap_or_default();
        if amount.is_empty() {
            println!("    {name}{notes}");
        } else {
            println!("    {amount} {name}{notes}");
        }
    }

    if !detail.steps.is_empty() {
        println!("\n  STEPS:");
        for (i, step) in detail.steps.iter().enumerate() {
            let n = i + 1;
            println!("    {n}. {step}");
        }
    }

    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &PantryService, id: i64, json: bool) -> Result<()> {
    or_exit_not_found(svc.db().delete_recipe(id), json)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted recipe {id}");
    }
    Ok(())
}
