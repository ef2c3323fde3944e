use anyhow::Result;

use pantry_core::canonical_url::canonicalize;

pub(crate) fn cmd_url_canonicalize(url: &str, json: bool) -> Result<()> {
    let key = canonicalize(url);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "url": url, "canonical": key }))?
        );
    } else {
        println!("{key}");
    }
    Ok(())
}
