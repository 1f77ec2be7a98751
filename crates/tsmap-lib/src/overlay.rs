//! Points of interest placed from prefab spawn and trigger points.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::alignment::PlacedPrefab;
use crate::item::ItemUid;
use crate::template::SpawnPointKind;
use crate::token::string_to_token;

/// Action token of the trigger that marks a parking area.
pub static PARKING_TRIGGER: Lazy<u64> = Lazy::new(|| string_to_token("hud_parking").unwrap_or(0));

/// Kinds of overlays drawn on top of prefabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    Fuel,
    Service,
    WeightStation,
    TruckDealer,
    Garage,
    Recruitment,
    Parking,
}

impl PoiKind {
    /// Overlay icon name used by the map renderer.
    pub fn overlay_name(self) -> &'static str {
        match self {
            PoiKind::Fuel => "gas_ico",
            PoiKind::Service => "service_ico",
            PoiKind::WeightStation => "weigh_station_ico",
            PoiKind::TruckDealer => "dealer_ico",
            PoiKind::Garage => "garage_large_ico",
            PoiKind::Recruitment => "recruitment_ico",
            PoiKind::Parking => "parking_ico",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PoiKind::Fuel => "Fuel",
            PoiKind::Service => "Service",
            PoiKind::WeightStation => "Weigh station",
            PoiKind::TruckDealer => "Truck dealer",
            PoiKind::Garage => "Garage",
            PoiKind::Recruitment => "Recruitment",
            PoiKind::Parking => "Parking",
        }
    }

    pub fn from_spawn_kind(kind: SpawnPointKind) -> Option<Self> {
        match kind {
            SpawnPointKind::GasPos => Some(PoiKind::Fuel),
            SpawnPointKind::ServicePos => Some(PoiKind::Service),
            SpawnPointKind::WeightStationPos => Some(PoiKind::WeightStation),
            SpawnPointKind::TruckDealerPos => Some(PoiKind::TruckDealer),
            SpawnPointKind::BuyPos => Some(PoiKind::Garage),
            SpawnPointKind::RecruitmentPos => Some(PoiKind::Recruitment),
            _ => None,
        }
    }
}

/// Overlay placed in world space on behalf of a prefab item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointOfInterest {
    pub item_uid: ItemUid,
    pub kind: PoiKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dlc_guard: u8,
    pub is_secret: bool,
}

/// Points of interest of one placed prefab.
///
/// A parking trigger is skipped when the trigger point before it, of any
/// action, has the same id; one parking area spans several consecutive
/// trigger points.
pub fn prefab_points_of_interest(placed: &PlacedPrefab<'_>) -> Vec<PointOfInterest> {
    let item = placed.item;
    let make = |kind: PoiKind, x: f32, y: f32, z: f32| {
        let (wx, wy, wz) = placed.transform.apply_point(x, y, z);
        PointOfInterest {
            item_uid: item.base.uid,
            kind,
            x: wx,
            y: wy,
            z: wz,
            dlc_guard: item.base.dlc_guard,
            is_secret: item.is_secret,
        }
    };

    let mut points: Vec<PointOfInterest> = placed
        .template
        .spawn_points
        .iter()
        .filter_map(|spawn| {
            PoiKind::from_spawn_kind(spawn.kind).map(|kind| make(kind, spawn.x, spawn.y, spawn.z))
        })
        .collect();

    let mut last_trigger = None;
    for trigger in &placed.template.trigger_points {
        let repeated = last_trigger == Some(trigger.trigger_id);
        last_trigger = Some(trigger.trigger_id);
        if repeated || trigger.action_token != *PARKING_TRIGGER {
            continue;
        }
        points.push(make(PoiKind::Parking, trigger.x, trigger.y, trigger.z));
    }
    points
}
