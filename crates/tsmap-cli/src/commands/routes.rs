//! Routing table listing for prefab templates.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use tsmap_lib::{string_to_token, token_to_string, PrefabTemplate};

use super::load_catalog;

/// Arguments for the routes command.
#[derive(Debug, Clone)]
pub struct RoutesArgs {
    pub templates: PathBuf,
    /// Token name (`"road_two"`) or hex value (`"0x1a2b"`).
    pub token: Option<String>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct RouteOutput {
    start: usize,
    end: usize,
    curve_ids: Vec<usize>,
    distance: f64,
}

#[derive(Debug, Serialize)]
struct TemplateRoutes {
    token: u64,
    name: String,
    nodes: usize,
    curves: usize,
    routes: Vec<RouteOutput>,
}

impl From<&PrefabTemplate> for TemplateRoutes {
    fn from(template: &PrefabTemplate) -> Self {
        Self {
            token: template.token,
            name: token_to_string(template.token),
            nodes: template.prefab_nodes.len(),
            curves: template.prefab_curves.len(),
            routes: template
                .navigation_routes
                .iter()
                .map(|(key, route)| RouteOutput {
                    start: key.start,
                    end: key.end,
                    curve_ids: route.curve_ids.clone(),
                    distance: route.distance,
                })
                .collect(),
        }
    }
}

fn parse_token(text: &str) -> Result<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map_err(|e| anyhow!("invalid hex token '{}': {}", text, e));
    }
    string_to_token(text).ok_or_else(|| anyhow!("invalid token name '{}'", text))
}

/// Handle the routes subcommand.
pub fn handle_routes(args: &RoutesArgs) -> Result<()> {
    let catalog = load_catalog(&args.templates)?;

    let selected: Vec<TemplateRoutes> = match &args.token {
        Some(text) => {
            let token = parse_token(text)?;
            match catalog.get(token) {
                Some(template) => vec![TemplateRoutes::from(template)],
                None => bail!("prefab template '{}' not found", token_to_string(token)),
            }
        }
        None => catalog.iter().map(TemplateRoutes::from).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    for template in &selected {
        println!(
            "{} ({:#x}): {} node(s), {} curve(s), {} route(s)",
            template.name,
            template.token,
            template.nodes,
            template.curves,
            template.routes.len()
        );
        for route in &template.routes {
            let curves: Vec<String> = route.curve_ids.iter().map(ToString::to_string).collect();
            println!(
                "  {}/{}  curves=[{}]  distance={:.3}",
                route.start,
                route.end,
                curves.join(","),
                route.distance
            );
        }
    }
    Ok(())
}
