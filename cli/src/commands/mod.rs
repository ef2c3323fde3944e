mod helpers;
mod ingredient;
mod plan;
mod recipe;
mod url;

pub(crate) use ingredient::{
    cmd_ingredient_add, cmd_ingredient_list, cmd_ingredient_merge, cmd_ingredient_show,
    cmd_ingredient_update,
};
pub(crate) use plan::{
    cmd_plan_add, cmd_plan_create, cmd_plan_groceries, cmd_plan_list, cmd_plan_remove,
    cmd_plan_show,
};
pub(crate) use recipe::{cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list, cmd_recipe_show};
pub(crate) use url::cmd_url_canonicalize;
