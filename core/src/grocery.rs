//! Weekly grocery list aggregation.
//!
//! The list is derived on every request from the plan's entries and the
//! current recipe lines, so it never goes stale after an ingredient merge.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::Result;
use crate::models::MealPlanEntry;
use crate::quantity::{CombinedQuantity, QuantityItem, combine};

/// A recipe ingredient line joined with its ingredient identity.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientUsage {
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub category: Option<String>,
    pub quantity_text: Option<String>,
    pub unit: Option<String>,
}

/// Read access to recipe lines, implemented by the database.
pub trait GroceryCatalog {
    /// Every ingredient line of the given recipes, joined with its ingredient.
    fn ingredient_usages(&self, recipe_ids: &[i64]) -> Result<Vec<IngredientUsage>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroceryListItem {
    pub ingredient_id: i64,
    pub display_name: String,
    pub category: Option<String>,
    pub quantities: CombinedQuantity,
    /// Distinct recipes that use this ingredient.
    pub recipe_count: usize,
    pub source_recipe_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroceryList {
    pub items: Vec<GroceryListItem>,
    pub total_ingredients: usize,
    pub recipe_count: usize,
}

struct IngredientGroup {
    name: String,
    category: Option<String>,
    items: Vec<QuantityItem>,
    recipes: BTreeSet<i64>,
}

/// Aggregate a week's entries into one shopping list.
///
/// Each distinct recipe contributes its lines once, no matter how many slots
/// it fills.
pub fn compute<C: GroceryCatalog + ?Sized>(
    catalog: &C,
    entries: &[MealPlanEntry],
) -> Result<GroceryList> {
    let recipe_ids: BTreeSet<i64> = entries.iter().map(|e| e.recipe_id).collect();
    if recipe_ids.is_empty() {
        return Ok(GroceryList::default());
    }
    let ids: Vec<i64> = recipe_ids.iter().copied().collect();
    let usages = catalog.ingredient_usages(&ids)?;

    let mut groups: BTreeMap<i64, IngredientGroup> = BTreeMap::new();
    for usage in usages
        .into_iter()
        .filter(|u| recipe_ids.contains(&u.recipe_id))
    {
        let group = groups
            .entry(usage.ingredient_id)
            .or_insert_with(|| IngredientGroup {
                name: usage.ingredient_name.clone(),
                category: usage.category.clone(),
                items: Vec::new(),
                recipes: BTreeSet::new(),
            });
        group.items.push(QuantityItem::from_line(
            usage.quantity_text.as_deref(),
            usage.unit.as_deref(),
        ));
        group.recipes.insert(usage.recipe_id);
    }

    let mut items: Vec<GroceryListItem> = groups
        .into_iter()
        .map(|(ingredient_id, group)| GroceryListItem {
            ingredient_id,
            display_name: group.name,
            category: group.category,
            quantities: combine(&group.items),
            recipe_count: group.recipes.len(),
            source_recipe_ids: group.recipes.into_iter().collect(),
        })
        .collect();
    items.sort_by(compare_items);

    tracing::debug!(
        recipes = recipe_ids.len(),
        ingredients = items.len(),
        "computed grocery list"
    );

    Ok(GroceryList {
        total_ingredients: items.len(),
        recipe_count: recipe_ids.len(),
        items,
    })
}

/// Categorized items first, alphabetically by category (ASCII case folded, like
/// the category filter), then by name.
fn compare_items(a: &GroceryListItem, b: &GroceryListItem) -> Ordering {
    match (&a.category, &b.category) {
        (Some(x), Some(y)) => x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.display_name.cmp(&b.display_name))
    .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
}
