//! Prefab record decoding from a raw sector file.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use tsmap_lib::{token_to_string, PrefabItem, SectorDecoder, TemplateCatalog};

use super::load_catalog;

/// Arguments for the decode command.
#[derive(Debug, Clone)]
pub struct DecodeArgs {
    pub sector: PathBuf,
    pub offset: usize,
    pub format_version: u32,
    pub count: usize,
    pub templates: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DecodedItem {
    uid: u64,
    token: String,
    raw_token: u64,
    x: f32,
    y: f32,
    z: f32,
    nodes: Vec<u64>,
    origin: u8,
    block_size: usize,
    valid: bool,
    hidden: bool,
    dlc_guard: u8,
    is_secret: bool,
    ferry_uid: u64,
    issues: Vec<String>,
}

impl From<&PrefabItem> for DecodedItem {
    fn from(item: &PrefabItem) -> Self {
        Self {
            uid: item.base.uid,
            token: token_to_string(item.template),
            raw_token: item.template,
            x: item.base.x,
            y: item.base.y,
            z: item.base.z,
            nodes: item.base.nodes.clone(),
            origin: item.origin,
            block_size: item.base.block_size,
            valid: item.base.valid,
            hidden: item.base.hidden,
            dlc_guard: item.base.dlc_guard,
            is_secret: item.is_secret,
            ferry_uid: item.ferry_uid,
            issues: item.base.issues.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Handle the decode subcommand.
///
/// Without a template file every token is unresolved, so every item is
/// reported invalid; the record layout is still decoded.
pub fn handle_decode(args: &DecodeArgs) -> Result<()> {
    let catalog = match &args.templates {
        Some(path) => load_catalog(path)?,
        None => TemplateCatalog::new(),
    };
    let buffer = fs::read(&args.sector)
        .with_context(|| format!("failed to read sector {}", args.sector.display()))?;

    let decoder = SectorDecoder::new(&catalog, args.sector.display().to_string());
    let items = decoder
        .decode_prefab_run(&buffer, args.offset, args.count, args.format_version)
        .with_context(|| {
            format!(
                "failed to decode prefab records from {}",
                args.sector.display()
            )
        })?;

    let decoded: Vec<DecodedItem> = items.iter().map(DecodedItem::from).collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    for item in &decoded {
        let status = if item.valid {
            "ok".to_string()
        } else {
            format!("invalid: {}", item.issues.join("; "))
        };
        println!(
            "{:#018x} {:<12} nodes={} origin={} size={} {}",
            item.uid,
            item.token,
            item.nodes.len(),
            item.origin,
            item.block_size,
            status
        );
    }
    let invalid = decoded.iter().filter(|item| !item.valid).count();
    println!(
        "decoded {} prefab record(s), {} invalid",
        decoded.len(),
        invalid
    );
    Ok(())
}
