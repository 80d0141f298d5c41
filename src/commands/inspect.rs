//! List and verify commands - read existing archives.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use pharc::archive::PharReader;

#[derive(Serialize)]
struct Listing<'a> {
    alias: &'a str,
    signature: &'a str,
    digest: String,
    entries: Vec<ListedEntry<'a>>,
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    path: &'a str,
    size: usize,
    mtime: u32,
}

fn open(phar: &Path) -> Result<PharReader> {
    PharReader::open(phar).with_context(|| format!("Failed to read {}", phar.display()))
}

pub fn cmd_list(phar: &Path, json: bool) -> Result<()> {
    let reader = open(phar)?;

    if json {
        let listing = Listing {
            alias: reader.alias(),
            signature: reader.algorithm().name(),
            digest: reader.signature_hex(),
            entries: reader
                .entries()
                .iter()
                .map(|e| ListedEntry {
                    path: &e.path,
                    size: e.size(),
                    mtime: e.mtime,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for entry in reader.entries() {
        println!("{:>10}  {}", entry.size(), entry.path);
    }
    println!();
    println!("{} entries, alias {}", reader.entries().len(), reader.alias());
    Ok(())
}

pub fn cmd_verify(phar: &Path) -> Result<()> {
    let reader = open(phar)?;
    println!(
        "OK: {} ({} entries, {} bytes)",
        phar.display(),
        reader.entries().len(),
        reader.size()
    );
    println!("  {} {}", reader.algorithm().name(), reader.signature_hex());
    Ok(())
}
