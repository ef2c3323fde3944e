use anyhow::Result;
use chrono::Local;
use std::collections::HashMap;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pantry_core::PantryService;
use pantry_core::models::{MealType, NewMealPlanEntry};

use super::helpers::{
    day_name, json_error, or_dash, or_exit_not_found, parse_day, parse_week_start, truncate,
};

pub(crate) fn cmd_plan_create(svc: &PantryService, week_start: &str, json: bool) -> Result<()> {
    let week_start = parse_week_start(week_start, Local::now().date_naive())?;
    let plan = svc.create_meal_plan(week_start)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        let id = plan.id;
        println!("Meal plan for week of {week_start} (id: {id})");
        println!("Schedule recipes with: pantry plan add {id} <recipe-id> --day mon --meal dinner");
    }
    Ok(())
}

pub(crate) fn cmd_plan_list(svc: &PantryService, json: bool) -> Result<()> {
    let plans = svc.db().list_meal_plans()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }
    if plans.is_empty() {
        eprintln!("No meal plans found");
        return Ok(());
    }
    for plan in &plans {
        let (id, week) = (plan.id, plan.week_start);
        let entries = svc.db().get_meal_plan_entries(id)?.len();
        println!("{id:>4}  week of {week}  ({entries} meals)");
    }
    Ok(())
}

pub(crate) fn cmd_plan_add(
    svc: &PantryService,
    plan_id: i64,
    recipe_id: i64,
    day: &str,
    meal: &str,
    json: bool,
) -> Result<()> {
    let day_of_week = parse_day(day)?;
    let meal_type: MealType = meal.parse()?;
    let entry = or_exit_not_found(
        svc.add_meal_plan_entry(
            plan_id,
            &NewMealPlanEntry {
                recipe_id,
                day_of_week,
                meal_type,
            },
        ),
        json,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let title = svc.db().get_recipe(recipe_id)?.title;
        let (id, day) = (entry.id, day_name(day_of_week));
        println!("Scheduled {title} for {day} {meal_type} (entry id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove(svc: &PantryService, entry_id: i64, json: bool) -> Result<()> {
    if svc.db().remove_meal_plan_entry(entry_id)? {
        if json {
            println!("{}", serde_json::json!({ "removed": entry_id }));
        } else {
            println!("Removed entry {entry_id}");
        }
    } else {
        if json {
            println!(
                "{}",
                json_error(&format!("Meal plan entry {entry_id} not found"))
            );
        } else {
            eprintln!("Meal plan entry {entry_id} not found");
        }
        std::process::exit(2);
    }
    Ok(())
}

pub(crate) fn cmd_plan_show(svc: &PantryService, plan_id: i64, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Day")]
        day: &'static str,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
    }

    let plan = or_exit_not_found(svc.db().get_meal_plan(plan_id), json)?;
    let entries = svc.db().get_meal_plan_entries(plan_id)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "plan": plan,
                "entries": entries,
            }))?
        );
        return Ok(());
    }

    let week = plan.week_start;
    println!("=== Week of {week} ===");
    if entries.is_empty() {
        println!("  Nothing scheduled");
        return Ok(());
    }

    let mut titles: HashMap<i64, String> = HashMap::new();
    let mut rows: Vec<EntryRow> = Vec::with_capacity(entries.len());
    for entry in &entries {
        if !titles.contains_key(&entry.recipe_id) {
            let title = svc.db().get_recipe(entry.recipe_id)?.title;
            titles.insert(entry.recipe_id, title);
        }
        rows.push(EntryRow {
            id: entry.id,
            day: day_name(entry.day_of_week),
            meal: entry.meal_type.to_string(),
            recipe: truncate(titles.get(&entry.recipe_id).map_or("?", String::as_str), 40),
        });
    }

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_plan_groceries(svc: &PantryService, plan_id: i64, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct GroceryRow {
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Recipes")]
        recipes: usize,
    }

    let list = or_exit_not_found(svc.get_grocery_list(plan_id), json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if list.items.is_empty() {
        eprintln!("Nothing to buy: no recipes scheduled for this plan");
        return Ok(());
    }

    let rows: Vec<GroceryRow> = list
        .items
        .iter()
        .map(|item| GroceryRow {
            name: truncate(&item.display_name, 30),
            amount: or_dash(Some(&item.quantities.to_string())),
            category: or_dash(item.category.as_deref()),
            recipes: item.recipe_count,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    let (items, recipes) = (list.total_ingredients, list.recipe_count);
    println!("{items} ingredients across {recipes} recipes");
    Ok(())
}
