//! CLI `doctor` command: database diagnostics and credential check.

use anyhow::{Context, Result};

use wikiofbabel::config::WikiConfig;
use wikiofbabel::db;

pub fn doctor(config: &WikiConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("Infinite Library Health Report");
    println!("==============================");
    println!();

    if !db_path.exists() {
        println!("Database:          not found at {}", db_path.display());
        println!("                   (created on first `wikiofbabel serve`)");
    } else {
        let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
        let conn = db::open_database(&db_path)
            .context("failed to open database (may be corrupt)")?;
        let report = db::check_database_health(&conn).context("failed to run health check")?;

        println!("Database:          {}", db_path.display());
        println!("File size:         {}", format_bytes(file_size));
        println!("Schema version:    {}", report.schema_version);
        println!("Articles:          {}", report.article_count);
        println!("  with summary:    {}", report.summarized_count);
        println!(
            "Last model used:   {}",
            report.generation_model.as_deref().unwrap_or("(not set)")
        );
        if report.integrity_ok {
            println!("Integrity check:   PASSED");
        } else {
            println!("Integrity check:   FAILED ({})", report.integrity_details);
        }
    }

    println!();
    println!("Generation API:    {}", config.generation.api_base);
    println!("Model:             {}", config.generation.model);
    match config.generation.resolve_api_key() {
        Some(_) => println!("API key:           found"),
        None => println!(
            "API key:           MISSING (write it to {} or set OPENAI_API_KEY)",
            config.generation.api_key_file
        ),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
