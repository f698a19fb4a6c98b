//! Subcommand implementations. Results go to stdout, logs to stderr.

use anyhow::{bail, Result};
use serde_json::json;

use mangaroute_core::{
    BatoClient, MirrorChange, MirrorError, MirrorManager, MutationOutcome, SearchHit,
};

pub async fn search(client: &BatoClient, query: &str, pages: Option<u32>, json: bool) -> Result<()> {
    let hits = client.search(query, pages).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No results for \"{}\"", query.trim());
    } else {
        for line in format_hits(&hits) {
            println!("{}", line);
        }
    }
    Ok(())
}

pub async fn series(client: &BatoClient, url: &str, json: bool) -> Result<()> {
    let info = client.get_series_info(url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", info.title);
    println!("{}", info.canonical_url);
    for (label, value) in &info.attributes {
        println!("{}: {}", label, value.values().join(", "));
    }
    if !info.description.is_empty() {
        println!();
        println!("{}", info.description);
    }
    println!();
    println!("{} chapters", info.chapters.len());
    for (i, chapter) in info.chapters.iter().enumerate() {
        println!("{:>4}  {}  {}", i + 1, chapter.label, chapter.url);
    }
    Ok(())
}

pub async fn chapter(client: &BatoClient, url: &str, json: bool) -> Result<()> {
    let chapter = client.get_chapter(url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chapter)?);
        return Ok(());
    }

    println!("{} / {}", chapter.title, chapter.chapter);
    for image in &chapter.image_urls {
        println!("{}", image);
    }
    Ok(())
}

pub fn list_mirrors(mirrors: &MirrorManager, json: bool) -> Result<()> {
    if json {
        let value = json!({
            "current_index": mirrors.current_index(),
            "mirrors": mirrors.mirrors(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for index in 0..mirrors.len() {
        println!("{:>2} {}", index, mirrors.format_mirror_display(index));
    }
    Ok(())
}

/// Print the outcome of a mirror mutation; a rejected one fails the command.
pub fn report(result: Result<MirrorChange, MirrorError>) -> Result<()> {
    let outcome = MutationOutcome::from(result);
    if !outcome.success {
        bail!("{}", outcome.message);
    }
    println!("{}", outcome.message);
    Ok(())
}

fn format_hits(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            if hit.subtitle.is_empty() {
                format!("{:>3}. {}\n     {}", i + 1, hit.title, hit.url)
            } else {
                format!("{:>3}. {} ({})\n     {}", i + 1, hit.title, hit.subtitle, hit.url)
            }
        })
        .collect()
}
