use anyhow::Result;

use wikiofbabel::article::search::search_articles;
use wikiofbabel::article::types::truncate_chars;
use wikiofbabel::config::WikiConfig;

/// Run a ranked search from the terminal.
pub fn search(config: &WikiConfig, query: &str, limit: usize) -> Result<()> {
    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("No database yet at {}", db_path.display());
        println!("(created on first `wikiofbabel serve`)");
        return Ok(());
    }
    let conn = wikiofbabel::db::open_database(&db_path)?;

    let hits = search_articles(&conn, query, limit)?;
    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!("  {}. {} (score: {:.4})", i + 1, hit.title.display(), hit.score);
        println!("     {}", truncate_chars(&hit.excerpt.replace('\n', " "), 120));
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_is_not_created() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("articles.db");
        let mut config = WikiConfig::default();
        config.storage.db_path = db_path.to_string_lossy().into_owned();

        search(&config, "paris", 5).unwrap();

        assert!(!db_path.exists());
        assert!(!tmp.path().join("nested").exists());
    }

    #[test]
    fn existing_database_is_searched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("articles.db");
        wikiofbabel::db::open_database(&db_path).unwrap();
        let mut config = WikiConfig::default();
        config.storage.db_path = db_path.to_string_lossy().into_owned();

        search(&config, "paris", 5).unwrap();
    }
}
