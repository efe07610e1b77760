use crate::content::HazardId;
use crate::geometry::Vec2;

/// Read-only view of the level geometry under the mobs.
pub trait AreaGeometry {
    fn floor_z_at(&self, pos: Vec2) -> f32;

    /// Hazards of the sector containing `pos`.
    fn hazards_at(&self, pos: Vec2) -> Vec<HazardId>;
}

/// Infinite floor at a fixed height, optionally with hazard pools.
#[derive(Debug, Clone, Default)]
pub struct FlatArea {
    pub floor_z: f32,
    pub hazard_zones: Vec<HazardZone>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardZone {
    pub center: Vec2,
    pub radius: f32,
    pub hazard: HazardId,
}

impl AreaGeometry for FlatArea {
    fn floor_z_at(&self, _pos: Vec2) -> f32 {
        self.floor_z
    }

    fn hazards_at(&self, pos: Vec2) -> Vec<HazardId> {
        self.hazard_zones
            .iter()
            .filter(|zone| zone.center.distance(pos) <= zone.radius)
            .map(|zone| zone.hazard)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hazard_zone_covers_its_radius() {
        let area = FlatArea {
            floor_z: 0.0,
            hazard_zones: vec![HazardZone {
                center: Vec2::new(10.0, 0.0),
                radius: 5.0,
                hazard: HazardId(2),
            }],
        };
        assert_eq!(area.hazards_at(Vec2::new(12.0, 0.0)), vec![HazardId(2)]);
        assert!(area.hazards_at(Vec2::ZERO).is_empty());
    }
}
