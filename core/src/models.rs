use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// --- Ingredient identities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub normalized_name: String,
    pub category: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientWithUsage {
    pub id: i64,
    pub normalized_name: String,
    pub category: Option<String>,
    pub created_at: String,
    /// Number of recipe lines referencing this ingredient, counted at read time.
    pub usage_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityResult {
    pub id: i64,
    pub canonical_name: String,
    pub was_created: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IngredientFilters {
    /// Substring match against the normalized name.
    pub search: Option<String>,
    /// Exact category match, ASCII case-insensitive.
    pub category: Option<String>,
}

/// Partial update for an ingredient. A blank `category` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientPatch {
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub merged_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

pub const MAX_PAGE_LIMIT: u32 = 100;

/// Lowercase and trim an ingredient name.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn validate_page_limit(limit: u32) -> Result<()> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(Error::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT} (got {limit})"
        )));
    }
    Ok(())
}

/// Ceiling division for page counts; zero items means zero pages.
#[must_use]
pub fn total_pages(total: i64, limit: u32) -> i64 {
    let limit = i64::from(limit);
    (total + limit - 1) / limit
}

// --- Recipes ---

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub canonical_url: Option<String>,
    pub servings: Option<f64>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub macros: Option<serde_json::Value>,
    pub created_at: String,
}

/// One ingredient usage within one recipe.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredientLine {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub quantity_text: Option<String>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub position: i64,
    /// Normalized name of the referenced ingredient.
    pub ingredient_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewIngredientLine {
    pub name: String,
    pub quantity_text: Option<String>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub servings: Option<f64>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub macros: Option<serde_json::Value>,
    pub ingredients: Vec<NewIngredientLine>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedRecipe {
    pub recipe: Recipe,
    pub was_created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub steps: Vec<String>,
}

/// What the extraction collaborator hands back for a video or article.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedRecipe {
    pub title: String,
    pub description: Option<String>,
    pub servings: Option<f64>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub macros: Option<serde_json::Value>,
    pub ingredient_lines: Vec<NewIngredientLine>,
    pub step_lines: Vec<String>,
}

impl ExtractedRecipe {
    #[must_use]
    pub fn into_new_recipe(self, source_url: Option<String>) -> NewRecipe {
        NewRecipe {
            title: self.title,
            description: self.description,
            source_url,
            servings: self.servings,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            macros: self.macros,
            ingredients: self.ingredient_lines,
            steps: self.step_lines,
        }
    }
}

pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<()> {
    if recipe.title.trim().is_empty() {
        return Err(Error::Validation("Recipe title must not be empty".into()));
    }
    if recipe.servings.is_some_and(|s| s <= 0.0) {
        return Err(Error::Validation("Servings must be greater than 0".into()));
    }
    if let Some(line) = recipe.ingredients.iter().find(|l| normalize_name(&l.name).is_empty()) {
        let raw = line.quantity_text.as_deref().unwrap_or_default();
        return Err(Error::Validation(format!(
            "Ingredient line '{raw}' has no ingredient name"
        )));
    }
    Ok(())
}

// --- Meal plans ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealType {
    pub const ALL: [Self; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snacks];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snacks => "snacks",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        // "snack" is accepted as shorthand.
        let lower = if lower == "snack" { "snacks".to_string() } else { lower };
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                Error::Validation(format!(
                    "Invalid meal type '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

impl ToSql for MealType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MealType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlan {
    pub id: i64,
    /// Monday of the planned week.
    pub week_start: NaiveDate,
    pub created_at: String,
}

/// A recipe assigned to one slot of a week's plan.
#[derive(Debug, Clone, Serialize)]
pub struct MealPlanEntry {
    pub id: i64,
    pub meal_plan_id: i64,
    pub recipe_id: i64,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u8,
    pub meal_type: MealType,
}

#[derive(Debug, Clone)]
pub struct NewMealPlanEntry {
    pub recipe_id: i64,
    pub day_of_week: u8,
    pub meal_type: MealType,
}

pub fn validate_day_of_week(day: u8) -> Result<()> {
    if day > 6 {
        return Err(Error::Validation(format!(
            "day_of_week must be between 0 (Monday) and 6 (Sunday), got {day}"
        )));
    }
    Ok(())
}

pub fn validate_week_start(date: NaiveDate) -> Result<()> {
    if date.weekday() != Weekday::Mon {
        return Err(Error::Validation(format!(
            "Week start {date} is a {}, expected a Monday",
            date.weekday()
        )));
    }
    Ok(())
}
