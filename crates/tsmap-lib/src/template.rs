//! Prefab templates and the catalog that shares them between instances.
//!
//! A template describes a prefab in its own local coordinate frame. Many
//! placed prefab items refer to the same template through its token; the
//! catalog is the arena that owns the templates and resolves those tokens.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::routes::{build_route_table, RouteTable};
use crate::token::{token_to_string, TokenResolver};

/// Largest absolute template-local coordinate accepted by the catalog.
pub const MAX_LOCAL_EXTENT: f32 = 100_000.0;

fn in_extent(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite() && v.abs() <= MAX_LOCAL_EXTENT)
}

/// Connection point of a template, in template-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabNode {
    /// Local id; always equal to the node's index in the template.
    pub id: usize,
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub rot_x: f32,
    #[serde(default)]
    pub rot_y: f32,
    #[serde(default)]
    pub rot_z: f32,
    /// Curves that start at this node (traffic entering the prefab).
    #[serde(default)]
    pub input_points: Vec<usize>,
    /// Curves that end at this node (traffic leaving the prefab).
    #[serde(default)]
    pub output_points: Vec<usize>,
}

impl PrefabNode {
    pub fn new(id: usize, x: f32, z: f32) -> Self {
        Self {
            id,
            x,
            y: 0.0,
            z,
            rot_x: 0.0,
            rot_y: 0.0,
            rot_z: 1.0,
            input_points: Vec::new(),
            output_points: Vec::new(),
        }
    }

    /// Set the node's heading as an (x, z) direction vector.
    pub fn with_rotation(mut self, rot_x: f32, rot_z: f32) -> Self {
        self.rot_x = rot_x;
        self.rot_z = rot_z;
        self
    }

    pub fn with_inputs(mut self, curves: impl IntoIterator<Item = usize>) -> Self {
        self.input_points = curves.into_iter().collect();
        self
    }

    pub fn with_outputs(mut self, curves: impl IntoIterator<Item = usize>) -> Self {
        self.output_points = curves.into_iter().collect();
        self
    }
}

/// A point in template-local space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalPoint {
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
}

impl LocalPoint {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }
}

/// Unit heading in the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tangent {
    pub x: f32,
    pub z: f32,
}

impl Tangent {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

/// Directed navigation curve inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabCurve {
    /// Curve id; always equal to the curve's index in the template.
    pub id: usize,
    pub start: LocalPoint,
    pub end: LocalPoint,
    /// Heading at the start point; scaled by the chord length for sampling.
    pub start_tangent: Tangent,
    /// Heading at the end point; scaled by the chord length for sampling.
    pub end_tangent: Tangent,
    /// Curves that continue this one.
    #[serde(default)]
    pub next_curves: Vec<usize>,
    /// Curves that lead into this one.
    #[serde(default)]
    pub prev_curves: Vec<usize>,
}

impl PrefabCurve {
    /// Build a curve whose tangents both follow the chord direction.
    pub fn straight(id: usize, start: LocalPoint, end: LocalPoint) -> Self {
        let dx = end.x - start.x;
        let dz = end.z - start.z;
        let len = (dx * dx + dz * dz).sqrt();
        let heading = if len > 0.0 {
            Tangent::new(dx / len, dz / len)
        } else {
            Tangent::new(1.0, 0.0)
        };
        Self {
            id,
            start,
            end,
            start_tangent: heading,
            end_tangent: heading,
            next_curves: Vec::new(),
            prev_curves: Vec::new(),
        }
    }

    pub fn with_tangents(mut self, start: Tangent, end: Tangent) -> Self {
        self.start_tangent = start;
        self.end_tangent = end;
        self
    }

    pub fn with_next(mut self, curves: impl IntoIterator<Item = usize>) -> Self {
        self.next_curves = curves.into_iter().collect();
        self
    }
}

/// Kinds of spawn points a template can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPointKind {
    None,
    TrailerPos,
    UnloadEasyPos,
    GasPos,
    ServicePos,
    TruckStopPos,
    WeightStationPos,
    TruckDealerPos,
    Hotel,
    Custom,
    Parking,
    Task,
    MeetPos,
    CompanyPos,
    GaragePos,
    BuyPos,
    RecruitmentPos,
    CameraPoint,
    BusStation,
    UnloadMediumPos,
    UnloadHardPos,
    UnloadRigidPos,
    WeightCatPos,
    CompanyUnloadPos,
    TrailerSpawn,
    LongTrailerPos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
    pub kind: SpawnPointKind,
}

/// Vertex of the template's map-rendering outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub neighbours: Vec<usize>,
    #[serde(default)]
    pub is_polygon: bool,
    #[serde(default)]
    pub lanes_left: u8,
    #[serde(default)]
    pub lanes_right: u8,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPoint {
    pub trigger_id: u32,
    pub action_token: u64,
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
}

/// Ordered chain of curves forming one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabLane {
    pub id: usize,
    pub curve_ids: Vec<usize>,
}

/// Reusable prefab geometry in local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabTemplate {
    #[serde(default)]
    pub file_path: String,
    pub token: u64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub valid_road: bool,
    pub prefab_nodes: Vec<PrefabNode>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPoint>,
    #[serde(default)]
    pub map_points: Vec<MapPoint>,
    #[serde(default)]
    pub trigger_points: Vec<TriggerPoint>,
    #[serde(default)]
    pub prefab_curves: Vec<PrefabCurve>,
    #[serde(default)]
    pub lanes: Vec<PrefabLane>,
    /// Precomputed node-to-node routes; filled in by [`TemplateCatalog`].
    #[serde(skip)]
    pub navigation_routes: RouteTable,
}

impl PrefabTemplate {
    pub fn new(token: u64, prefab_nodes: Vec<PrefabNode>, prefab_curves: Vec<PrefabCurve>) -> Self {
        Self {
            file_path: String::new(),
            token,
            category: String::new(),
            valid_road: true,
            prefab_nodes,
            spawn_points: Vec::new(),
            map_points: Vec::new(),
            trigger_points: Vec::new(),
            prefab_curves,
            lanes: Vec::new(),
            navigation_routes: RouteTable::default(),
        }
    }

    pub fn node(&self, id: usize) -> Option<&PrefabNode> {
        self.prefab_nodes.get(id)
    }

    pub fn curve(&self, id: usize) -> Option<&PrefabCurve> {
        self.prefab_curves.get(id)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| Error::InvalidTemplate {
            token: token_to_string(self.token),
            message,
        };

        if self.prefab_nodes.is_empty() {
            return Err(invalid("template has no nodes".to_string()));
        }
        for (index, node) in self.prefab_nodes.iter().enumerate() {
            if node.id != index {
                return Err(invalid(format!("node at index {index} has id {}", node.id)));
            }
            if !in_extent(&[node.x, node.y, node.z, node.rot_x, node.rot_y, node.rot_z]) {
                return Err(invalid(format!("node {index} has out-of-range coordinates")));
            }
            let points = node.input_points.iter().chain(&node.output_points);
            if let Some(curve) = points.copied().find(|&c| c >= self.prefab_curves.len()) {
                return Err(invalid(format!("node {index} references missing curve {curve}")));
            }
        }
        for (index, curve) in self.prefab_curves.iter().enumerate() {
            if curve.id != index {
                return Err(invalid(format!("curve at index {index} has id {}", curve.id)));
            }
            let (start, end) = (&curve.start, &curve.end);
            let (t0, t1) = (&curve.start_tangent, &curve.end_tangent);
            if !in_extent(&[start.x, start.y, start.z, end.x, end.y, end.z])
                || !in_extent(&[t0.x, t0.z, t1.x, t1.z])
            {
                return Err(invalid(format!("curve {index} has out-of-range coordinates")));
            }
            let links = curve.next_curves.iter().chain(&curve.prev_curves);
            if let Some(link) = links.copied().find(|&c| c >= self.prefab_curves.len()) {
                return Err(invalid(format!("curve {index} links to missing curve {link}")));
            }
        }
        Ok(())
    }
}

/// Arena of templates keyed by token.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<u64, PrefabTemplate>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a template, precompute its routing table and store it.
    ///
    /// A template already registered under the same token is replaced.
    pub fn insert(&mut self, mut template: PrefabTemplate) -> Result<()> {
        template.validate()?;
        template.navigation_routes = build_route_table(&template);
        debug!(
            token = %token_to_string(template.token),
            nodes = template.prefab_nodes.len(),
            curves = template.prefab_curves.len(),
            routes = template.navigation_routes.len(),
            "registered prefab template"
        );
        self.templates.insert(template.token, template);
        Ok(())
    }

    pub fn from_templates(templates: impl IntoIterator<Item = PrefabTemplate>) -> Result<Self> {
        let mut catalog = Self::new();
        for template in templates {
            catalog.insert(template)?;
        }
        Ok(catalog)
    }

    /// Load a JSON array of templates.
    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        let templates: Vec<PrefabTemplate> = serde_json::from_reader(reader)?;
        let catalog = Self::from_templates(templates)?;
        info!(templates = catalog.len(), "loaded prefab templates");
        Ok(catalog)
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn get(&self, token: u64) -> Option<&PrefabTemplate> {
        self.templates.get(&token)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates ordered by token.
    pub fn iter(&self) -> impl Iterator<Item = &PrefabTemplate> {
        self.templates.values()
    }
}

impl TokenResolver for TemplateCatalog {
    fn lookup_prefab(&self, token: u64) -> Option<&PrefabTemplate> {
        self.get(token)
    }
}
