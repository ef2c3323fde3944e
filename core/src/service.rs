use std::path::Path;

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::grocery::GroceryList;
use crate::models::{
    ExtractedRecipe, IdentityResult, IngredientFilters, IngredientPatch, IngredientWithUsage,
    MealPlan, MealPlanEntry, MergeResult, NewMealPlanEntry, NewRecipe, Page, RecipeDetail,
    SavedRecipe,
};

/// Turns a recipe source (a video, an article, a recipe file) into structured
/// recipe data.
///
/// The CLI implements this over Cooklang files; a network front end would
/// implement it over its page/transcript scraper.
pub trait RecipeExtractor {
    fn extract(&self, source: &str) -> anyhow::Result<ExtractedRecipe>;
}

pub struct PantryService {
    db: Database,
}

impl PantryService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    // --- Identity resolution ---

    pub fn find_or_create_ingredient(&self, name: &str) -> Result<IdentityResult> {
        self.db.find_or_create_ingredient(name)
    }

    pub fn get_ingredient(&self, id: i64) -> Result<IngredientWithUsage> {
        self.db.get_ingredient(id)
    }

    pub fn list_ingredients(
        &self,
        filters: &IngredientFilters,
        page: u32,
        limit: u32,
    ) -> Result<Page<IngredientWithUsage>> {
        self.db.list_ingredients(filters, page, limit)
    }

    pub fn update_ingredient(&self, id: i64, patch: &IngredientPatch) -> Result<()> {
        self.db.update_ingredient(id, patch)
    }

    pub fn merge_ingredients(&self, source_id: i64, target_id: i64) -> Result<MergeResult> {
        self.db.merge_ingredients(source_id, target_id)
    }

    // --- Recipes ---

    pub fn save_recipe(&self, recipe: &NewRecipe) -> Result<SavedRecipe> {
        self.db.save_recipe(recipe)
    }

    pub fn get_recipe_detail(&self, id: i64) -> Result<RecipeDetail> {
        self.db.get_recipe_detail(id)
    }

    /// Import a recipe through `extractor`.
    ///
    /// When `url` is given and a recipe is already stored under its canonical
    /// key, that recipe is returned and the extractor is never called.
    pub fn import_recipe(
        &self,
        extractor: &dyn RecipeExtractor,
        source: &str,
        url: Option<&str>,
    ) -> Result<SavedRecipe> {
        if let Some(url) = url {
            if let Some(existing) = self.db.find_recipe_by_url(url)? {
                tracing::info!(id = existing.id, url, "recipe already imported");
                return Ok(SavedRecipe {
                    recipe: existing,
                    was_created: false,
                });
            }
        }

        let extracted = extractor.extract(source).map_err(Error::Extraction)?;
        tracing::debug!(
            source,
            title = %extracted.title,
            lines = extracted.ingredient_lines.len(),
            "extracted recipe"
        );
        self.db
            .save_recipe(&extracted.into_new_recipe(url.map(String::from)))
    }

    // --- Meal plans ---

    pub fn create_meal_plan(&self, week_start: NaiveDate) -> Result<MealPlan> {
        self.db.create_meal_plan(week_start)
    }

    pub fn add_meal_plan_entry(
        &self,
        meal_plan_id: i64,
        entry: &NewMealPlanEntry,
    ) -> Result<MealPlanEntry> {
        self.db.add_meal_plan_entry(meal_plan_id, entry)
    }

    pub fn get_grocery_list(&self, meal_plan_id: i64) -> Result<GroceryList> {
        self.db.get_grocery_list(meal_plan_id)
    }
}
