use std::path::Path;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{
    Connection, OptionalExtension, Transaction, TransactionBehavior, params, params_from_iter,
};

use crate::canonical_url::canonicalize;
use crate::error::{Error, Result};
use crate::grocery::{self, GroceryCatalog, GroceryList, IngredientUsage};
use crate::models::{
    IdentityResult, Ingredient, IngredientFilters, IngredientPatch, IngredientWithUsage,
    MealPlan, MealPlanEntry, MergeResult, NewIngredientLine, NewMealPlanEntry, NewRecipe, Page,
    Recipe, RecipeDetail, RecipeIngredientLine, SavedRecipe, normalize_name, total_pages,
    validate_day_of_week, validate_new_recipe, validate_page_limit, validate_week_start,
};

/// Attempts for a write transaction that hits a uniqueness race or a lock.
const MAX_TX_ATTEMPTS: u32 = 3;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    fn configure(&self) -> Result<()> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    normalized_name TEXT NOT NULL UNIQUE,
                    category TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT,
                    source_url TEXT,
                    canonical_url TEXT UNIQUE,
                    servings REAL,
                    prep_time TEXT,
                    cook_time TEXT,
                    macros TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_steps (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    body TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
                    quantity_text TEXT,
                    unit TEXT,
                    notes TEXT,
                    position INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plans (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    week_start TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plan_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_plan_id INTEGER NOT NULL REFERENCES meal_plans(id) ON DELETE CASCADE,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
                    meal_type TEXT NOT NULL
                        CHECK (meal_type IN ('breakfast', 'lunch', 'dinner', 'snacks'))
                );

                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_ingredient ON recipe_ingredients(ingredient_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_steps_recipe ON recipe_steps(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_meal_plan_entries_plan ON meal_plan_entries(meal_plan_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Transactions ---

    /// `BEGIN IMMEDIATE`: takes the write lock up front, so the lookup and the
    /// write that follows it are serialized against other writers.
    fn begin_write(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Run a write transaction, retrying when it loses a uniqueness race or
    /// finds the database locked.
    fn with_retry<T>(&self, op_name: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Err(Error::Database(e)) if Error::is_conflict(&e) => {
                    if attempt >= MAX_TX_ATTEMPTS {
                        return Err(Error::Conflict(format!(
                            "{op_name} gave up after {attempt} attempts: {e}"
                        )));
                    }
                    tracing::debug!(op = op_name, attempt, error = %e, "retrying transaction");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    // --- Row mapping helpers ---

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ingredient> {
        Ok(Ingredient {
            id: row.get(0)?,
            normalized_name: row.get(1)?,
            category: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    // Expects columns: 0: id, 1: normalized_name, 2: category, 3: created_at, 4: usage_count
    fn ingredient_with_usage_from_row(row: &rusqlite::Row) -> rusqlite::Result<IngredientWithUsage> {
        Ok(IngredientWithUsage {
            id: row.get(0)?,
            normalized_name: row.get(1)?,
            category: row.get(2)?,
            created_at: row.get(3)?,
            usage_count: row.get(4)?,
        })
    }

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let macros: Option<String> = row.get(8)?;
        let macros: Option<serde_json::Value> = macros
            .map(|m| serde_json::from_str(&m))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;
        Ok(Recipe {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            source_url: row.get(3)?,
            canonical_url: row.get(4)?,
            servings: row.get(5)?,
            prep_time: row.get(6)?,
            cook_time: row.get(7)?,
            macros,
            created_at: row.get(9)?,
        })
    }

    // Expects columns:
    // 0: ri.id, 1: ri.recipe_id, 2: ri.ingredient_id, 3: ri.quantity_text,
    // 4: ri.unit, 5: ri.notes, 6: ri.position, 7: i.normalized_name
    fn line_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeIngredientLine> {
        Ok(RecipeIngredientLine {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            ingredient_id: row.get(2)?,
            quantity_text: row.get(3)?,
            unit: row.get(4)?,
            notes: row.get(5)?,
            position: row.get(6)?,
            ingredient_name: row.get(7)?,
        })
    }

    fn meal_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealPlan> {
        let week_start: String = row.get(1)?;
        let week_start = NaiveDate::parse_from_str(&week_start, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        Ok(MealPlan {
            id: row.get(0)?,
            week_start,
            created_at: row.get(2)?,
        })
    }

    fn meal_plan_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealPlanEntry> {
        Ok(MealPlanEntry {
            id: row.get(0)?,
            meal_plan_id: row.get(1)?,
            recipe_id: row.get(2)?,
            day_of_week: row.get(3)?,
            meal_type: row.get(4)?,
        })
    }

    // --- Ingredients ---

    fn find_ingredient_by_name(
        conn: &Connection,
        normalized: &str,
    ) -> rusqlite::Result<Option<Ingredient>> {
        conn.query_row(
            "SELECT id, normalized_name, category, created_at FROM ingredients WHERE normalized_name = ?1",
            params![normalized],
            Self::ingredient_from_row,
        )
        .optional()
    }

    /// Lookup-or-insert on an already open write transaction.
    fn find_or_create_in(conn: &Connection, normalized: &str) -> Result<IdentityResult> {
        if let Some(existing) = Self::find_ingredient_by_name(conn, normalized)? {
            tracing::debug!(id = existing.id, name = normalized, "ingredient already exists");
            return Ok(IdentityResult {
                id: existing.id,
                canonical_name: existing.normalized_name,
                was_created: false,
            });
        }

        let now = Local::now().to_rfc3339();
        let inserted = conn.execute(
            "INSERT INTO ingredients (normalized_name, category, created_at) VALUES (?1, NULL, ?2)
             ON CONFLICT(normalized_name) DO NOTHING",
            params![normalized, now],
        )?;
        if inserted == 0 {
            // Another writer got there first; return the winner.
            let winner = Self::find_ingredient_by_name(conn, normalized)?
                .ok_or_else(|| Error::Conflict(format!("ingredient '{normalized}' vanished")))?;
            return Ok(IdentityResult {
                id: winner.id,
                canonical_name: winner.normalized_name,
                was_created: false,
            });
        }

        let id = conn.last_insert_rowid();
        tracing::info!(id, name = normalized, "created ingredient");
        Ok(IdentityResult {
            id,
            canonical_name: normalized.to_string(),
            was_created: true,
        })
    }

    /// Resolve a free-text ingredient name to its identity, creating it if new.
    /// At most one identity ever exists per normalized name.
    pub fn find_or_create_ingredient(&self, name: &str) -> Result<IdentityResult> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(Error::Validation("Ingredient name must not be empty".into()));
        }
        self.with_retry("find_or_create_ingredient", || {
            let tx = self.begin_write()?;
            let result = Self::find_or_create_in(&tx, &normalized)?;
            tx.commit()?;
            Ok(result)
        })
    }

    pub fn get_ingredient(&self, id: i64) -> Result<IngredientWithUsage> {
        self.conn
            .query_row(
                "SELECT i.id, i.normalized_name, i.category, i.created_at,
                        (SELECT COUNT(*) FROM recipe_ingredients ri WHERE ri.ingredient_id = i.id)
                 FROM ingredients i WHERE i.id = ?1",
                params![id],
                Self::ingredient_with_usage_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Ingredient", id))
    }

    fn ingredient_exists(conn: &Connection, id: i64) -> Result<bool> {
        Ok(conn
            .query_row("SELECT 1 FROM ingredients WHERE id = ?1", params![id], |_| {
                Ok(())
            })
            .optional()?
            .is_some())
    }

    /// Page through ingredients, newest first, with usage counts computed on read.
    /// `page` is zero-based; `limit` must be within `1..=100`.
    ///
    /// Recency is insertion order (`id`). `created_at` is offset-bearing local
    /// time text and does not sort chronologically across an offset change.
    pub fn list_ingredients(
        &self,
        filters: &IngredientFilters,
        page: u32,
        limit: u32,
    ) -> Result<Page<IngredientWithUsage>> {
        validate_page_limit(limit)?;

        let search = filters
            .search
            .as_deref()
            .map(normalize_name)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{escaped}%")
            });
        // SQLite's LOWER folds ASCII only; grocery sorting folds categories the same way.
        let category = filters
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let tx = self.conn.unchecked_transaction()?;
        let total: i64 = tx.query_row(
            "SELECT COUNT(*) FROM ingredients
             WHERE (?1 IS NULL OR normalized_name LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR LOWER(category) = LOWER(?2))",
            params![search, category],
            |row| row.get(0),
        )?;

        let offset = i64::from(page) * i64::from(limit);
        let items = {
            let mut stmt = tx.prepare(
                "SELECT i.id, i.normalized_name, i.category, i.created_at,
                        (SELECT COUNT(*) FROM recipe_ingredients ri WHERE ri.ingredient_id = i.id)
                 FROM ingredients i
                 WHERE (?1 IS NULL OR i.normalized_name LIKE ?1 ESCAPE '\\')
                   AND (?2 IS NULL OR LOWER(i.category) = LOWER(?2))
                 ORDER BY i.id DESC
                 LIMIT ?3 OFFSET ?4",
            )?;
            stmt.query_map(
                params![search, category, i64::from(limit), offset],
                Self::ingredient_with_usage_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?
        };
        tx.commit()?;

        Ok(Page {
            items,
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        })
    }

    /// Rename and/or recategorize an ingredient. Names are normalized before
    /// they are stored; renaming onto a name another ingredient already holds
    /// is rejected (merge the two instead).
    pub fn update_ingredient(&self, id: i64, patch: &IngredientPatch) -> Result<()> {
        if patch.name.is_none() && patch.category.is_none() {
            return Err(Error::Validation(
                "Nothing to update. Provide a name and/or a category".into(),
            ));
        }
        let name = patch.name.as_deref().map(normalize_name);
        if name.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Validation("Ingredient name must not be empty".into()));
        }
        let category = patch
            .category
            .as_deref()
            .map(|c| Some(c.trim().to_string()).filter(|c| !c.is_empty()));

        let tx = self.begin_write()?;
        if !Self::ingredient_exists(&tx, id)? {
            return Err(Error::not_found("Ingredient", id));
        }
        if let Some(ref name) = name {
            if let Some(other) = Self::find_ingredient_by_name(&tx, name)?.filter(|i| i.id != id) {
                return Err(Error::Validation(format!(
                    "Name '{name}' already belongs to ingredient {}; merge them instead",
                    other.id
                )));
            }
            tx.execute(
                "UPDATE ingredients SET normalized_name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        if let Some(ref category) = category {
            tx.execute(
                "UPDATE ingredients SET category = ?1 WHERE id = ?2",
                params![category, id],
            )?;
        }
        tx.commit()?;

        tracing::info!(id, name = ?name, category = ?category, "updated ingredient");
        Ok(())
    }

    /// Repoint every recipe line from `source_id` to `target_id`, then delete the
    /// source, as one unit of work.
    pub fn merge_ingredients(&self, source_id: i64, target_id: i64) -> Result<MergeResult> {
        if source_id == target_id {
            return Err(Error::Validation(format!(
                "Cannot merge ingredient {source_id} into itself"
            )));
        }

        let result = self.with_retry("merge_ingredients", || {
            let tx = self.begin_write()?;
            for id in [source_id, target_id] {
                if !Self::ingredient_exists(&tx, id)? {
                    return Err(Error::not_found("Ingredient", id));
                }
            }
            // Repoint before delete so no line ever references a missing identity.
            let merged_count = tx.execute(
                "UPDATE recipe_ingredients SET ingredient_id = ?1 WHERE ingredient_id = ?2",
                params![target_id, source_id],
            )?;
            tx.execute("DELETE FROM ingredients WHERE id = ?1", params![source_id])?;
            tx.commit()?;
            Ok(MergeResult { merged_count })
        })?;

        tracing::info!(
            source_id,
            target_id,
            merged_count = result.merged_count,
            "merged ingredients"
        );
        Ok(result)
    }

    // --- Recipes ---

    fn insert_recipe_line(
        conn: &Connection,
        recipe_id: i64,
        position: usize,
        line: &NewIngredientLine,
    ) -> Result<()> {
        let identity = Self::find_or_create_in(conn, &normalize_name(&line.name))?;
        let clean = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity_text, unit, notes, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                recipe_id,
                identity.id,
                clean(&line.quantity_text),
                clean(&line.unit),
                clean(&line.notes),
                position as i64,
            ],
        )?;
        Ok(())
    }

    /// Save a recipe with its ingredient lines and steps.
    ///
    /// When the source URL canonicalizes to a key that is already stored, the
    /// existing recipe is returned untouched.
    pub fn save_recipe(&self, recipe: &NewRecipe) -> Result<SavedRecipe> {
        validate_new_recipe(recipe)?;
        let canonical = recipe
            .source_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| canonicalize(u).into_string());

        let saved = self.with_retry("save_recipe", || {
            let tx = self.begin_write()?;
            if let Some(ref key) = canonical {
                if let Some(existing) = Self::find_recipe_by_key(&tx, key)? {
                    tx.commit()?;
                    return Ok(SavedRecipe {
                        recipe: existing,
                        was_created: false,
                    });
                }
            }

            let now = Local::now().to_rfc3339();
            tx.execute(
                "INSERT INTO recipes (title, description, source_url, canonical_url, servings,
                                      prep_time, cook_time, macros, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    recipe.title.trim(),
                    recipe.description,
                    recipe.source_url,
                    canonical,
                    recipe.servings,
                    recipe.prep_time,
                    recipe.cook_time,
                    recipe.macros.as_ref().map(ToString::to_string),
                    now,
                ],
            )?;
            let recipe_id = tx.last_insert_rowid();

            for (position, step) in recipe.steps.iter().enumerate() {
                tx.execute(
                    "INSERT INTO recipe_steps (recipe_id, position, body) VALUES (?1, ?2, ?3)",
                    params![recipe_id, position as i64, step],
                )?;
            }
            for (position, line) in recipe.ingredients.iter().enumerate() {
                Self::insert_recipe_line(&tx, recipe_id, position, line)?;
            }

            let created = Self::get_recipe_in(&tx, recipe_id)?;
            tx.commit()?;
            Ok(SavedRecipe {
                recipe: created,
                was_created: true,
            })
        })?;

        if saved.was_created {
            tracing::info!(
                id = saved.recipe.id,
                canonical_url = ?saved.recipe.canonical_url,
                lines = recipe.ingredients.len(),
                "saved recipe"
            );
        } else {
            tracing::info!(id = saved.recipe.id, "recipe already saved for this URL");
        }
        Ok(saved)
    }

    const RECIPE_COLUMNS: &'static str = "id, title, description, source_url, canonical_url, servings, prep_time, cook_time, macros, created_at";

    fn get_recipe_in(conn: &Connection, id: i64) -> Result<Recipe> {
        conn.query_row(
            &format!("SELECT {} FROM recipes WHERE id = ?1", Self::RECIPE_COLUMNS),
            params![id],
            Self::recipe_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("Recipe", id))
    }

    fn find_recipe_by_key(conn: &Connection, key: &str) -> Result<Option<Recipe>> {
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM recipes WHERE canonical_url = ?1",
                    Self::RECIPE_COLUMNS
                ),
                params![key],
                Self::recipe_from_row,
            )
            .optional()?)
    }

    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        Self::get_recipe_in(&self.conn, id)
    }

    /// Look up a recipe by any URL that canonicalizes to its stored key.
    pub fn find_recipe_by_url(&self, url: &str) -> Result<Option<Recipe>> {
        Self::find_recipe_by_key(&self.conn, canonicalize(url).as_str())
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM recipes ORDER BY id",
            Self::RECIPE_COLUMNS
        ))?;
        let recipes = stmt
            .query_map([], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn get_recipe_lines(&self, recipe_id: i64) -> Result<Vec<RecipeIngredientLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT ri.id, ri.recipe_id, ri.ingredient_id, ri.quantity_text, ri.unit, ri.notes,
                    ri.position, i.normalized_name
             FROM recipe_ingredients ri
             JOIN ingredients i ON ri.ingredient_id = i.id
             WHERE ri.recipe_id = ?1
             ORDER BY ri.position, ri.id",
        )?;
        let lines = stmt
            .query_map(params![recipe_id], Self::line_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    pub fn get_recipe_steps(&self, recipe_id: i64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM recipe_steps WHERE recipe_id = ?1 ORDER BY position")?;
        let steps = stmt
            .query_map(params![recipe_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(steps)
    }

    pub fn get_recipe_detail(&self, recipe_id: i64) -> Result<RecipeDetail> {
        let recipe = self.get_recipe(recipe_id)?;
        let ingredients = self.get_recipe_lines(recipe_id)?;
        let steps = self.get_recipe_steps(recipe_id)?;
        Ok(RecipeDetail {
            recipe,
            ingredients,
            steps,
        })
    }

    /// Delete a recipe; its lines, steps and plan entries go with it.
    pub fn delete_recipe(&self, recipe_id: i64) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![recipe_id])?;
        if rows == 0 {
            return Err(Error::not_found("Recipe", recipe_id));
        }
        tracing::info!(id = recipe_id, "deleted recipe");
        Ok(())
    }

    // --- Meal plans ---

    /// Create the plan for the week starting on `week_start` (a Monday), or
    /// return the one that already exists.
    pub fn create_meal_plan(&self, week_start: NaiveDate) -> Result<MealPlan> {
        validate_week_start(week_start)?;
        let week = week_start.format(DATE_FORMAT).to_string();
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO meal_plans (week_start, created_at) VALUES (?1, ?2)
             ON CONFLICT(week_start) DO NOTHING",
            params![week, now],
        )?;
        self.find_meal_plan_by_week(week_start)?
            .ok_or_else(|| Error::NotFound(format!("Meal plan for week {week}")))
    }

    pub fn get_meal_plan(&self, id: i64) -> Result<MealPlan> {
        self.conn
            .query_row(
                "SELECT id, week_start, created_at FROM meal_plans WHERE id = ?1",
                params![id],
                Self::meal_plan_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Meal plan", id))
    }

    pub fn find_meal_plan_by_week(&self, week_start: NaiveDate) -> Result<Option<MealPlan>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, week_start, created_at FROM meal_plans WHERE week_start = ?1",
                params![week_start.format(DATE_FORMAT).to_string()],
                Self::meal_plan_from_row,
            )
            .optional()?)
    }

    pub fn list_meal_plans(&self) -> Result<Vec<MealPlan>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, week_start, created_at FROM meal_plans ORDER BY week_start DESC")?;
        let plans = stmt
            .query_map([], Self::meal_plan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    pub fn add_meal_plan_entry(
        &self,
        meal_plan_id: i64,
        entry: &NewMealPlanEntry,
    ) -> Result<MealPlanEntry> {
        validate_day_of_week(entry.day_of_week)?;
        self.get_meal_plan(meal_plan_id)?;
        self.get_recipe(entry.recipe_id)?;
        self.conn.execute(
            "INSERT INTO meal_plan_entries (meal_plan_id, recipe_id, day_of_week, meal_type)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                meal_plan_id,
                entry.recipe_id,
                entry.day_of_week,
                entry.meal_type
            ],
        )?;
        Ok(MealPlanEntry {
            id: self.conn.last_insert_rowid(),
            meal_plan_id,
            recipe_id: entry.recipe_id,
            day_of_week: entry.day_of_week,
            meal_type: entry.meal_type,
        })
    }

    pub fn remove_meal_plan_entry(&self, entry_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM meal_plan_entries WHERE id = ?1",
            params![entry_id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_meal_plan_entries(&self, meal_plan_id: i64) -> Result<Vec<MealPlanEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, meal_plan_id, recipe_id, day_of_week, meal_type
             FROM meal_plan_entries
             WHERE meal_plan_id = ?1
             ORDER BY day_of_week, id",
        )?;
        let entries = stmt
            .query_map(params![meal_plan_id], Self::meal_plan_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Build the grocery list for a plan from one consistent snapshot.
    /// An unknown plan is `NotFound`; a plan with nothing scheduled is an empty list.
    pub fn get_grocery_list(&self, meal_plan_id: i64) -> Result<GroceryList> {
        let tx = self.conn.unchecked_transaction()?;
        self.get_meal_plan(meal_plan_id)?;
        let entries = self.get_meal_plan_entries(meal_plan_id)?;
        let list = grocery::compute(self, &entries)?;
        tx.commit()?;
        Ok(list)
    }
}

impl GroceryCatalog for Database {
    fn ingredient_usages(&self, recipe_ids: &[i64]) -> Result<Vec<IngredientUsage>> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; recipe_ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT ri.recipe_id, ri.ingredient_id, i.normalized_name, i.category,
                    ri.quantity_text, ri.unit
             FROM recipe_ingredients ri
             JOIN ingredients i ON ri.ingredient_id = i.id
             WHERE ri.recipe_id IN ({placeholders})
             ORDER BY ri.recipe_id, ri.position, ri.id"
        ))?;
        let usages = stmt
            .query_map(params_from_iter(recipe_ids.iter()), |row| {
                Ok(IngredientUsage {
                    recipe_id: row.get(0)?,
                    ingredient_id: row.get(1)?,
                    ingredient_name: row.get(2)?,
                    category: row.get(3)?,
                    quantity_text: row.get(4)?,
                    unit: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(usages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;
    use crate::quantity::QuantityEntry;

    fn line(name: &str, qty: Option<&str>, unit: Option<&str>) -> NewIngredientLine {
        NewIngredientLine {
            name: name.to_string(),
            quantity_text: qty.map(String::from),
            unit: unit.map(String::from),
            notes: None,
        }
    }

    fn sample_recipe(title: &str, url: Option<&str>, lines: Vec<NewIngredientLine>) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            source_url: url.map(String::from),
            ingredients: lines,
            steps: vec!["Mix".to_string(), "Cook".to_string()],
            ..NewRecipe::default()
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    fn slot(recipe_id: i64, day: u8, meal_type: MealType) -> NewMealPlanEntry {
        NewMealPlanEntry {
            recipe_id,
            day_of_week: day,
            meal_type,
        }
    }

    #[test]
    fn test_find_or_create_folds_names() {
        let db = Database::open_in_memory().unwrap();
        let first = db.find_or_create_ingredient("  Tomato ").unwrap();
        let second = db.find_or_create_ingredient("tomato").unwrap();

        assert!(first.was_created);
        assert!(!second.was_created);
        assert_eq!(first.id, second.id);
        assert_eq!(first.canonical_name, "tomato");
    }

    #[test]
    fn test_find_or_create_rejects_blank() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.find_or_create_ingredient("   "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_find_or_create_concurrent_single_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pantry.db");
        Database::open(&path).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let db = Database::open(&path).unwrap();
                    let name = if i % 2 == 0 { "Basil" } else { " basil  " };
                    db.find_or_create_ingredient(name).unwrap()
                })
            })
            .collect();
        let results: Vec<IdentityResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let first_id = results[0].id;
        assert!(results.iter().all(|r| r.id == first_id));
        assert_eq!(results.iter().filter(|r| r.was_created).count(), 1);

        let db = Database::open(&path).unwrap();
        let page = db
            .list_ingredients(&IngredientFilters::default(), 0, 10)
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_get_ingredient_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_ingredient(42), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_ingredients_paging_and_usage() {
        let db = Database::open_in_memory().unwrap();
        db.save_recipe(&sample_recipe(
            "Salsa",
            None,
            vec![
                line("Tomato", Some("3"), None),
                line("Onion", Some("1"), None),
                line("Lime", Some("1"), None),
            ],
        ))
        .unwrap();
        db.save_recipe(&sample_recipe(
            "Salad",
            None,
            vec![line("tomato", Some("2"), None)],
        ))
        .unwrap();

        let page = db
            .list_ingredients(&IngredientFilters::default(), 0, 2)
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        // newest first
        assert_eq!(page.items[0].normalized_name, "lime");
        assert_eq!(page.items[1].normalized_name, "onion");

        let page = db
            .list_ingredients(&IngredientFilters::default(), 1, 2)
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].normalized_name, "tomato");
        assert_eq!(page.items[0].usage_count, 2);

        let page = db
            .list_ingredients(&IngredientFilters::default(), 5, 2)
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_list_ingredients_filters() {
        let db = Database::open_in_memory().unwrap();
        let tomato = db.find_or_create_ingredient("Tomato").unwrap();
        db.find_or_create_ingredient("Cherry Tomato").unwrap();
        db.find_or_create_ingredient("Flour").unwrap();
        db.update_ingredient(
            tomato.id,
            &IngredientPatch {
                name: None,
                category: Some("Produce".into()),
            },
        )
        .unwrap();

        let search = IngredientFilters {
            search: Some("TOMATO".into()),
            category: None,
        };
        assert_eq!(db.list_ingredients(&search, 0, 10).unwrap().total, 2);

        let by_category = IngredientFilters {
            search: None,
            category: Some("produce".into()),
        };
        let page = db.list_ingredients(&by_category, 0, 10).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, tomato.id);

        let wildcard = IngredientFilters {
            search: Some("%".into()),
            category: None,
        };
        assert_eq!(db.list_ingredients(&wildcard, 0, 10).unwrap().total, 0);
    }

    #[test]
    fn test_list_ingredients_newest_first_across_offset_change() {
        let db = Database::open_in_memory().unwrap();
        let older = db.find_or_create_ingredient("older").unwrap().id;
        let newer = db.find_or_create_ingredient("newer").unwrap().id;
        // 01:10-05:00 is twenty minutes after 01:30-04:00 but sorts before it as text.
        for (id, stamp) in [
            (older, "2026-11-01T01:30:00-04:00"),
            (newer, "2026-11-01T01:10:00-05:00"),
        ] {
            db.conn
                .execute(
                    "UPDATE ingredients SET created_at = ?1 WHERE id = ?2",
                    params![stamp, id],
                )
                .unwrap();
        }

        let page = db
            .list_ingredients(&IngredientFilters::default(), 0, 10)
            .unwrap();
        let names: Vec<&str> = page
            .items
            .iter()
            .map(|i| i.normalized_name.as_str())
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[test]
    fn test_list_ingredients_category_folds_ascii_only() {
        let db = Database::open_in_memory().unwrap();
        let id = db.find_or_create_ingredient("saffron").unwrap().id;
        db.update_ingredient(
            id,
            &IngredientPatch {
                name: None,
                category: Some("Épices".into()),
            },
        )
        .unwrap();

        let count = |category: &str| {
            let filters = IngredientFilters {
                search: None,
                category: Some(category.into()),
            };
            db.list_ingredients(&filters, 0, 10).unwrap().total
        };
        assert_eq!(count("Épices"), 1);
        assert_eq!(count("ÉPICES"), 1);
        assert_eq!(count("épices"), 0);
    }

    #[test]
    fn test_write_gives_up_with_conflict_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pantry.db");
        let db = Database::open(&path).unwrap();
        db.conn.busy_timeout(Duration::from_millis(10)).unwrap();

        let blocker = Connection::open(&path).unwrap();
        blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

        assert!(matches!(
            db.find_or_create_ingredient("thyme"),
            Err(Error::Conflict(_))
        ));
        blocker.execute_batch("COMMIT").unwrap();
        let created = db.find_or_create_ingredient("thyme").unwrap();
        assert!(created.was_created);
        assert_eq!(db.get_ingredient(created.id).unwrap().normalized_name, "thyme");
    }

    #[test]
    fn test_merge_gives_up_with_conflict_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pantry.db");
        let db = Database::open(&path).unwrap();
        let a = db.find_or_create_ingredient("parsley").unwrap().id;
        let b = db.find_or_create_ingredient("flat-leaf parsley").unwrap().id;
        db.conn.busy_timeout(Duration::from_millis(10)).unwrap();

        let blocker = Connection::open(&path).unwrap();
        blocker.execute_batch("BEGIN IMMEDIATE").unwrap();
        assert!(matches!(
            db.merge_ingredients(a, b),
            Err(Error::Conflict(_))
        ));
        blocker.execute_batch("ROLLBACK").unwrap();

        // nothing was applied
        assert!(db.get_ingredient(a).is_ok());
        assert_eq!(db.merge_ingredients(a, b).unwrap().merged_count, 0);
    }

    #[test]
    fn test_list_ingredients_rejects_bad_limit() {
        let db = Database::open_in_memory().unwrap();
        let filters = IngredientFilters::default();
        assert!(matches!(
            db.list_ingredients(&filters, 0, 0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.list_ingredients(&filters, 0, 101),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_update_ingredient() {
        let db = Database::open_in_memory().unwrap();
        let id = db.find_or_create_ingredient("scallion").unwrap().id;
        db.update_ingredient(
            id,
            &IngredientPatch {
                name: Some("  Green Onion ".into()),
                category: Some("Produce".into()),
            },
        )
        .unwrap();

        let updated = db.get_ingredient(id).unwrap();
        assert_eq!(updated.normalized_name, "green onion");
        assert_eq!(updated.category.as_deref(), Some("Produce"));

        // blank category clears it
        db.update_ingredient(
            id,
            &IngredientPatch {
                name: None,
                category: Some(String::new()),
            },
        )
        .unwrap();
        assert_eq!(db.get_ingredient(id).unwrap().category, None);
    }

    #[test]
    fn test_update_ingredient_errors() {
        let db = Database::open_in_memory().unwrap();
        let a = db.find_or_create_ingredient("garlic").unwrap().id;
        let b = db.find_or_create_ingredient("shallot").unwrap().id;

        let rename = IngredientPatch {
            name: Some("Garlic".into()),
            category: None,
        };
        assert!(matches!(
            db.update_ingredient(999, &rename),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.update_ingredient(b, &rename),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.update_ingredient(a, &IngredientPatch::default()),
            Err(Error::Validation(_))
        ));
        // renaming to its own name is a no-op, not a collision
        assert!(db.update_ingredient(a, &rename).is_ok());
    }

    #[test]
    fn test_merge_ingredients_repoints_lines() {
        let db = Database::open_in_memory().unwrap();
        let r1 = db
            .save_recipe(&sample_recipe(
                "Pesto",
                None,
                vec![line("Garlic clove", Some("2"), None), line("Basil", Some("2"), Some("cups"))],
            ))
            .unwrap()
            .recipe;
        let r2 = db
            .save_recipe(&sample_recipe(
                "Aioli",
                None,
                vec![line("garlic clove", Some("1"), None)],
            ))
            .unwrap()
            .recipe;
        let source = db.find_or_create_ingredient("garlic clove").unwrap().id;
        let target = db.find_or_create_ingredient("garlic").unwrap().id;

        let result = db.merge_ingredients(source, target).unwrap();
        assert_eq!(result.merged_count, 2);

        for recipe_id in [r1.id, r2.id] {
            let lines = db.get_recipe_lines(recipe_id).unwrap();
            assert!(lines.iter().all(|l| l.ingredient_id != source));
            assert!(lines.iter().any(|l| l.ingredient_id == target));
        }
        assert!(matches!(db.get_ingredient(source), Err(Error::NotFound(_))));
        assert_eq!(db.get_ingredient(target).unwrap().usage_count, 2);

        // the old name is free again and resolves to a brand-new identity
        let recreated = db.find_or_create_ingredient("Garlic Clove").unwrap();
        assert!(recreated.was_created);
        assert_ne!(recreated.id, source);
        assert_ne!(recreated.id, target);
    }

    #[test]
    fn test_merge_ingredients_errors() {
        let db = Database::open_in_memory().unwrap();
        let a = db.find_or_create_ingredient("a").unwrap().id;
        assert!(matches!(
            db.merge_ingredients(a, a),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.merge_ingredients(a, 999),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.merge_ingredients(999, a),
            Err(Error::NotFound(_))
        ));
        // failed merge leaves the source alone
        assert!(db.get_ingredient(a).is_ok());
    }

    #[test]
    fn test_merge_unused_source() {
        let db = Database::open_in_memory().unwrap();
        let a = db.find_or_create_ingredient("cilantro").unwrap().id;
        let b = db.find_or_create_ingredient("coriander").unwrap().id;
        assert_eq!(db.merge_ingredients(a, b).unwrap().merged_count, 0);
        assert!(db.get_ingredient(a).is_err());
    }

    #[test]
    fn test_save_recipe_dedups_by_canonical_url() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .save_recipe(&sample_recipe(
                "Chili",
                Some("https://www.example.com/chili/?utm_source=fb"),
                vec![line("Beans", Some("1"), Some("can"))],
            ))
            .unwrap();
        assert!(first.was_created);
        assert_eq!(
            first.recipe.canonical_url.as_deref(),
            Some("https://example.com/chili")
        );

        let second = db
            .save_recipe(&sample_recipe(
                "Chili again",
                Some("http://example.com/chili#comments"),
                vec![line("Beans", Some("2"), Some("can"))],
            ))
            .unwrap();
        assert!(!second.was_created);
        assert_eq!(second.recipe.id, first.recipe.id);
        assert_eq!(db.list_recipes().unwrap().len(), 1);

        let found = db.find_recipe_by_url("https://m.example.com/chili").unwrap();
        assert_eq!(found.map(|r| r.id), Some(first.recipe.id));
    }

    #[test]
    fn test_save_recipe_detail_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut recipe = sample_recipe(
            "Pancakes",
            None,
            vec![
                line("Flour", Some("1 1/2"), Some("cups")),
                NewIngredientLine {
                    name: "Egg".into(),
                    quantity_text: Some("2".into()),
                    unit: Some("  ".into()),
                    notes: Some("beaten".into()),
                },
            ],
        );
        recipe.macros = Some(serde_json::json!({ "calories": 350 }));
        let saved = db.save_recipe(&recipe).unwrap().recipe;

        let detail = db.get_recipe_detail(saved.id).unwrap();
        assert_eq!(detail.recipe.title, "Pancakes");
        assert_eq!(detail.steps, vec!["Mix", "Cook"]);
        assert_eq!(detail.ingredients.len(), 2);
        assert_eq!(detail.ingredients[0].ingredient_name, "flour");
        assert_eq!(detail.ingredients[0].quantity_text.as_deref(), Some("1 1/2"));
        assert_eq!(detail.ingredients[1].unit, None);
        assert_eq!(detail.ingredients[1].notes.as_deref(), Some("beaten"));
        assert_eq!(detail.recipe.macros.unwrap()["calories"], 350);
    }

    #[test]
    fn test_save_recipe_validation_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let bad = sample_recipe("Bad", None, vec![line("", Some("1"), None)]);
        assert!(matches!(db.save_recipe(&bad), Err(Error::Validation(_))));
        assert!(db.list_recipes().unwrap().is_empty());
    }

    #[test]
    fn test_delete_recipe_cascades() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db
            .save_recipe(&sample_recipe("Toast", None, vec![line("Bread", Some("2"), Some("slices"))]))
            .unwrap()
            .recipe;
        let plan = db.create_meal_plan(monday()).unwrap();
        db.add_meal_plan_entry(plan.id, &slot(recipe.id, 0, MealType::Breakfast))
            .unwrap();

        db.delete_recipe(recipe.id).unwrap();
        assert!(db.get_recipe_lines(recipe.id).unwrap().is_empty());
        assert!(db.get_meal_plan_entries(plan.id).unwrap().is_empty());
        let bread = db.find_or_create_ingredient("bread").unwrap();
        assert!(!bread.was_created);
        assert_eq!(db.get_ingredient(bread.id).unwrap().usage_count, 0);

        assert!(matches!(db.delete_recipe(recipe.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_create_meal_plan() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan(monday()).unwrap();
        assert_eq!(plan.week_start, monday());
        let again = db.create_meal_plan(monday()).unwrap();
        assert_eq!(again.id, plan.id);
        assert_eq!(db.list_meal_plans().unwrap().len(), 1);

        let tuesday = monday().succ_opt().unwrap();
        assert!(matches!(
            db.create_meal_plan(tuesday),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_add_meal_plan_entry_errors() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan(monday()).unwrap();
        let recipe = db
            .save_recipe(&sample_recipe("Soup", None, vec![]))
            .unwrap()
            .recipe;

        assert!(matches!(
            db.add_meal_plan_entry(999, &slot(recipe.id, 0, MealType::Lunch)),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.add_meal_plan_entry(plan.id, &slot(999, 0, MealType::Lunch)),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.add_meal_plan_entry(plan.id, &slot(recipe.id, 7, MealType::Lunch)),
            Err(Error::Validation(_))
        ));

        let entry = db
            .add_meal_plan_entry(plan.id, &slot(recipe.id, 2, MealType::Snacks))
            .unwrap();
        let entries = db.get_meal_plan_entries(plan.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].meal_type, MealType::Snacks);
        assert!(db.remove_meal_plan_entry(entry.id).unwrap());
        assert!(!db.remove_meal_plan_entry(entry.id).unwrap());
    }

    #[test]
    fn test_grocery_list_unknown_plan_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_grocery_list(42), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_grocery_list_empty_plan() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan(monday()).unwrap();
        let list = db.get_grocery_list(plan.id).unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.total_ingredients, 0);
        assert_eq!(list.recipe_count, 0);
    }

    #[test]
    fn test_grocery_list_same_recipe_twice_not_doubled() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan(monday()).unwrap();
        let rice = db
            .save_recipe(&sample_recipe(
                "Rice bowl",
                None,
                vec![line("Rice", Some("1"), Some("cup")), line("Rice", Some("1/2"), Some("cup"))],
            ))
            .unwrap()
            .recipe;
        db.add_meal_plan_entry(plan.id, &slot(rice.id, 0, MealType::Lunch))
            .unwrap();
        db.add_meal_plan_entry(plan.id, &slot(rice.id, 4, MealType::Dinner))
            .unwrap();

        let list = db.get_grocery_list(plan.id).unwrap();
        assert_eq!(list.recipe_count, 1);
        assert_eq!(list.total_ingredients, 1);
        assert_eq!(
            list.items[0].quantities.entries(),
            &[QuantityEntry::Sum {
                value: 1.5,
                unit: "cup".into(),
                lines: 2
            }]
        );
    }

    #[test]
    fn test_grocery_list_reflects_merge() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan(monday()).unwrap();
        let a = db
            .save_recipe(&sample_recipe("A", None, vec![line("Scallion", Some("2"), Some("stalks"))]))
            .unwrap()
            .recipe;
        let b = db
            .save_recipe(&sample_recipe(
                "B",
                None,
                vec![line("Green onion", Some("3"), Some("stalks"))],
            ))
            .unwrap()
            .recipe;
        db.add_meal_plan_entry(plan.id, &slot(a.id, 0, MealType::Dinner))
            .unwrap();
        db.add_meal_plan_entry(plan.id, &slot(b.id, 1, MealType::Dinner))
            .unwrap();
        assert_eq!(db.get_grocery_list(plan.id).unwrap().total_ingredients, 2);

        let source = db.find_or_create_ingredient("scallion").unwrap().id;
        let target = db.find_or_create_ingredient("green onion").unwrap().id;
        db.merge_ingredients(source, target).unwrap();

        let list = db.get_grocery_list(plan.id).unwrap();
        assert_eq!(list.total_ingredients, 1);
        assert_eq!(list.recipe_count, 2);
        let item = &list.items[0];
        assert_eq!(item.display_name, "green onion");
        assert_eq!(item.recipe_count, 2);
        assert_eq!(item.source_recipe_ids, vec![a.id, b.id]);
        assert_eq!(item.quantities.to_string(), "5 stalks");
    }

    #[test]
    fn test_grocery_list_category_attached() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan(monday()).unwrap();
        let recipe = db
            .save_recipe(&sample_recipe(
                "Caprese",
                None,
                vec![
                    line("Tomato", Some("2"), None),
                    line("Mozzarella", Some("8"), Some("oz")),
                    line("Salt", Some("to taste"), None),
                ],
            ))
            .unwrap()
            .recipe;
        let tomato = db.find_or_create_ingredient("tomato").unwrap().id;
        let mozzarella = db.find_or_create_ingredient("mozzarella").unwrap().id;
        for (id, category) in [(tomato, "Produce"), (mozzarella, "Dairy")] {
            db.update_ingredient(
                id,
                &IngredientPatch {
                    name: None,
                    category: Some(category.into()),
                },
            )
            .unwrap();
        }
        db.add_meal_plan_entry(plan.id, &slot(recipe.id, 5, MealType::Lunch))
            .unwrap();

        let list = db.get_grocery_list(plan.id).unwrap();
        let names: Vec<(&str, Option<&str>)> = list
            .items
            .iter()
            .map(|i| (i.display_name.as_str(), i.category.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("mozzarella", Some("Dairy")),
                ("tomato", Some("Produce")),
                ("salt", None),
            ]
        );
        assert_eq!(list.items[2].quantities.to_string(), "to taste");
    }
}
