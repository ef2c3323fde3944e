mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_ingredient_add, cmd_ingredient_list, cmd_ingredient_merge, cmd_ingredient_show,
    cmd_ingredient_update, cmd_plan_add, cmd_plan_create, cmd_plan_groceries, cmd_plan_list,
    cmd_plan_remove, cmd_plan_show, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_show, cmd_url_canonicalize,
};
use crate::config::Config;
use pantry_core::PantryService;

#[derive(Parser)]
#[command(
    name = "pantry",
    version,
    about = "Recipes, weekly meal plans and the grocery lists they add up to"
)]
struct Cli {
    /// Path to the database file (default: per-user data directory)
    #[arg(long, global = true, env = "PANTRY_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with recipe source URLs
    Url {
        #[command(subcommand)]
        command: UrlCommands,
    },
    /// Manage ingredient identities
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Import and browse recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Plan a week of meals and build its grocery list
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
enum UrlCommands {
    /// Print the dedup key a URL is stored under
    Canonicalize {
        url: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// Resolve a name to an ingredient, creating it if new
    Add {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List ingredients, newest first
    List {
        /// Only names containing this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
        /// Zero-based page number
        #[arg(long, default_value = "0")]
        page: u32,
        /// Page size (1-100)
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one ingredient with its usage count
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename or recategorize an ingredient
    Update {
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New category (empty string clears it)
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fold one ingredient into another, repointing every recipe line
    Merge {
        /// Ingredient to remove
        source: i64,
        /// Ingredient that absorbs the source
        target: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Source URL the recipe came from (used to skip duplicates)
        #[arg(long)]
        url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its ingredients and steps
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe and its plan entries
    Delete {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Create the plan for a week (Monday date, or this/next)
    Create {
        week_start: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all plans
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Schedule a recipe into a plan slot
    Add {
        plan: i64,
        recipe: i64,
        /// Day: 0-6 (Monday = 0) or a weekday name
        #[arg(short, long)]
        day: String,
        /// Meal type: breakfast, lunch, dinner, snacks
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a scheduled entry
    Remove {
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a plan's schedule
    Show {
        plan: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build the grocery list for a plan
    Groceries {
        plan: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn open_service(db_override: Option<PathBuf>) -> Result<PantryService> {
    let config = Config::load(db_override)?;
    let svc = PantryService::new(&config.db_path)?;
    tracing::debug!(db = %config.db_path.display(), "opened database");
    Ok(svc)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Url { command } => match command {
            UrlCommands::Canonicalize { url, json } => cmd_url_canonicalize(&url, json)?,
        },
        Commands::Ingredient { command } => {
            let svc = open_service(cli.db)?;
            match command {
                IngredientCommands::Add { name, json } => cmd_ingredient_add(&svc, &name, json)?,
                IngredientCommands::List {
                    search,
                    category,
                    page,
                    limit,
                    json,
                } => cmd_ingredient_list(&svc, search, category, page, limit, json)?,
                IngredientCommands::Show { id, json } => cmd_ingredient_show(&svc, id, json)?,
                IngredientCommands::Update {
                    id,
                    name,
                    category,
                    json,
                } => cmd_ingredient_update(&svc, id, name, category, json)?,
                IngredientCommands::Merge {
                    source,
                    target,
                    json,
                } => cmd_ingredient_merge(&svc, source, target, json)?,
            }
        }
        Commands::Recipe { command } => {
            let svc = open_service(cli.db)?;
            match command {
                RecipeCommands::Import { file, url, json } => {
                    cmd_recipe_import(&svc, &file, url.as_deref(), json)?;
                }
                RecipeCommands::List { json } => cmd_recipe_list(&svc, json)?,
                RecipeCommands::Show { id, json } => cmd_recipe_show(&svc, id, json)?,
                RecipeCommands::Delete { id, json } => cmd_recipe_delete(&svc, id, json)?,
            }
        }
        Commands::Plan { command } => {
            let svc = open_service(cli.db)?;
            match command {
                PlanCommands::Create { week_start, json } => {
                    cmd_plan_create(&svc, &week_start, json)?;
                }
                PlanCommands::List { json } => cmd_plan_list(&svc, json)?,
                PlanCommands::Add {
                    plan,
                    recipe,
                    day,
                    meal,
                    json,
                } => cmd_plan_add(&svc, plan, recipe, &day, &meal, json)?,
                PlanCommands::Remove { entry_id, json } => cmd_plan_remove(&svc, entry_id, json)?,
                PlanCommands::Show { plan, json } => cmd_plan_show(&svc, plan, json)?,
                PlanCommands::Groceries { plan, json } => cmd_plan_groceries(&svc, plan, json)?,
            }
        }
    }

    Ok(())
}
