//! Map sector decoding and navigation library.
//!
//! This crate decodes prefab item records from raw map sectors, places prefab
//! templates in world space, precomputes template-local routes and builds the
//! item-level navigation graph used for reachability queries. Higher-level
//! consumers (the CLI) should only depend on the items exported here instead
//! of reimplementing behavior.
//!
//! A typical pass: load a [`TemplateCatalog`], decode every sector with a
//! [`SectorDecoder`], add items and nodes to a [`MapWorld`], then call
//! [`build_navigation`] once all sectors are in.

pub mod alignment;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod export;
pub mod graph;
pub mod item;
pub mod node;
pub mod overlay;
pub mod path;
pub mod routes;
pub mod spatial;
pub mod template;
pub mod token;
pub mod world;

pub use alignment::{align, place_prefab, NodeFilter, PlacedPrefab, Transform, NODE_MATCH_RADIUS};
pub use cursor::ByteCursor;
pub use decoder::{
    decode_prefab_item, decode_prefab_run, FormatEpoch, SectorDecoder, MIN_FORMAT_VERSION,
};
pub use error::{Error, ItemIssue, Result};
pub use export::ExportBundle;
pub use graph::{build_navigation, LinkKind, NavigationEntry, NavigationGraph, NavigationReport};
pub use item::{
    FerryConnection, FerryItem, Item, ItemBase, ItemType, ItemUid, MapItem, PrefabItem,
    PrefabLook, RoadItem,
};
pub use node::{Node, NodeGraph, NodeSlot, NodeUid};
pub use overlay::{PoiKind, PointOfInterest};
pub use path::{find_points_of_interest, find_reachable, ReachConstraints, Reachable, ReachablePoi};
pub use routes::{
    build_route_table, PrefabRoute, RouteKey, RouteTable, MAX_QUALITY, MIN_QUALITY, PREFAB_QUALITY,
};
pub use spatial::NodeIndex;
pub use template::{PrefabTemplate, TemplateCatalog};
pub use token::{string_to_token, token_to_string, TokenResolver};
pub use world::MapWorld;
