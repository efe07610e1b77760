use std::f32::consts::PI;

use crate::content::Team;
use crate::geometry::{circle_rect_overlap, circles_overlap, height_bands_touch, rects_overlap};
use crate::geometry::{OrientedRect, Overlap, Vec2};

use super::config::SimConfig;

/// The parts of a mob the push resolver looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushBody {
    /// Position in the storage order; breaks symmetric ties.
    pub order: usize,
    pub pos: Vec2,
    pub z: f32,
    pub height: f32,
    pub radius: f32,
    pub rect: Option<OrientedRect>,
    pub team: Team,
    pub intangible: bool,
    pub pushable: bool,
    pub unpushable: bool,
    pub pushes: bool,
    pub pushes_softly: bool,
    pub pushes_with_hitboxes: bool,
    pub idle: bool,
    pub time_alive: f32,
    pub carried_and_moving: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushHitbox {
    pub pos: Vec2,
    pub radius: f32,
}

/// Push to apply to a mob: speed in units per second, and direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Push {
    pub amount: f32,
    pub angle: f32,
}

fn both_idle_same_faction(pushed: &PushBody, pusher: &PushBody) -> bool {
    pushed.idle && pusher.idle && pushed.team == pusher.team && pushed.team != Team::None
}

/// How hard `pusher` shoves `pushed` this frame, if at all.
pub fn resolve_push(
    config: &SimConfig,
    pushed: &PushBody,
    pusher: &PushBody,
    pusher_hitboxes: &[PushHitbox],
    delta_t: f32,
) -> Option<Push> {
    if delta_t <= 0.0 {
        return None;
    }
    if pushed.intangible || pusher.intangible || !pushed.pushable || pushed.unpushable {
        return None;
    }
    let both_idle = both_idle_same_faction(pushed, pusher);
    if !pusher.pushes && !both_idle {
        return None;
    }
    if !height_bands_touch(pushed.z, pushed.height, pusher.z, pusher.height) {
        return None;
    }
    // Two carried objects moving into each other: only the later one yields.
    if pushed.carried_and_moving && pusher.carried_and_moving && pushed.order < pusher.order {
        return None;
    }

    let overlap = if pusher.pushes_with_hitboxes {
        deepest_hitbox_overlap(pushed, pusher_hitboxes)
    } else {
        body_overlap(pushed, pusher)
    }?;

    let mut amount = overlap.depth;
    let mut angle = overlap.angle;
    if pusher.pushes_softly && !pusher.pushes_with_hitboxes {
        amount = amount.min(config.push_softly_amount * delta_t);
    }

    if both_idle {
        amount = config.idle_push_amount;
        if pushed.pos.distance(pusher.pos) <= f32::EPSILON {
            angle = if pushed.order > pusher.order { 0.0 } else { PI };
        }
        if pushed.order > pusher.order {
            angle += config.idle_push_jitter;
        }
    } else {
        let youngest = pushed.time_alive.min(pusher.time_alive);
        if youngest < config.push_throttle_timeout {
            amount *= youngest / config.push_throttle_timeout * config.push_throttle_factor;
        }
    }

    let rate = amount / delta_t;
    if !rate.is_finite() || !angle.is_finite() {
        return None;
    }
    Some(Push {
        amount: rate,
        angle,
    })
}

fn deepest_hitbox_overlap(pushed: &PushBody, hitboxes: &[PushHitbox]) -> Option<Overlap> {
    let mut best: Option<Overlap> = None;
    for hitbox in hitboxes {
        let distance = pushed.pos.distance(hitbox.pos);
        if distance >= pushed.radius + hitbox.radius {
            continue;
        }
        let depth = (distance - pushed.radius - hitbox.radius).abs();
        if best.map_or(true, |current| depth > current.depth) {
            best = Some(Overlap {
                depth,
                angle: hitbox.pos.angle_to(pushed.pos),
            });
        }
    }
    best
}

fn body_overlap(pushed: &PushBody, pusher: &PushBody) -> Option<Overlap> {
    match (pushed.rect, pusher.rect) {
        (Some(pushed_rect), Some(pusher_rect)) => rects_overlap(&pushed_rect, &pusher_rect),
        (Some(pushed_rect), None) => {
            circle_rect_overlap(pusher.pos, pusher.radius, &pushed_rect).map(|overlap| Overlap {
                depth: overlap.depth,
                angle: overlap.angle + PI,
            })
        }
        (None, Some(pusher_rect)) => circle_rect_overlap(pushed.pos, pushed.radius, &pusher_rect),
        (None, None) => circles_overlap(pushed.pos, pushed.radius, pusher.pos, pusher.radius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::normalize_angle;

    const DT: f32 = 1.0 / 30.0;

    fn body(order: usize, x: f32) -> PushBody {
        PushBody {
            order,
            pos: Vec2::new(x, 0.0),
            z: 0.0,
            height: 0.0,
            radius: 10.0,
            rect: None,
            team: Team::None,
            intangible: false,
            pushable: true,
            unpushable: false,
            pushes: true,
            pushes_softly: false,
            pushes_with_hitboxes: false,
            idle: false,
            time_alive: 5.0,
            carried_and_moving: false,
        }
    }

    #[test]
    fn penetration_of_five_pushes_five_per_frame_away_from_pusher() {
        let config = SimConfig::default();
        let pushed = body(0, 0.0);
        let pusher = body(1, 15.0);
        let push = resolve_push(&config, &pushed, &pusher, &[], DT).expect("push");
        assert!((push.amount - 5.0 / DT).abs() < 1e-2);
        assert!((normalize_angle(push.angle) - PI).abs() < 1e-5);
    }

    #[test]
    fn push_direction_is_mirrored_for_the_other_side() {
        let config = SimConfig::default();
        let left = body(0, 0.0);
        let right = PushBody {
            pushes_softly: true,
            ..body(1, 15.0)
        };
        let on_left = resolve_push(&config, &left, &right, &[], DT).expect("left pushed");
        let on_right = resolve_push(&config, &right, &left, &[], DT).expect("right pushed");
        let diff = normalize_angle(on_left.angle - on_right.angle);
        assert!((diff - PI).abs() < 1e-5);
        assert!(on_left.amount <= config.push_softly_amount + 1e-3);
        assert!(on_right.amount > config.push_softly_amount);
    }

    #[test]
    fn no_push_when_pusher_does_not_push_or_pushed_is_unpushable() {
        let config = SimConfig::default();
        let passive = PushBody {
            pushes: false,
            ..body(1, 15.0)
        };
        assert!(resolve_push(&config, &body(0, 0.0), &passive, &[], DT).is_none());

        let anchored = PushBody {
            unpushable: true,
            ..body(0, 0.0)
        };
        assert!(resolve_push(&config, &anchored, &body(1, 15.0), &[], DT).is_none());
    }

    #[test]
    fn separate_height_bands_do_not_push() {
        let config = SimConfig::default();
        let low = PushBody {
            height: 10.0,
            ..body(0, 0.0)
        };
        let high = PushBody {
            z: 50.0,
            height: 10.0,
            ..body(1, 15.0)
        };
        assert!(resolve_push(&config, &low, &high, &[], DT).is_none());
    }

    #[test]
    fn newly_spawned_push_is_throttled_by_lifetime() {
        let config = SimConfig::default();
        let newborn = PushBody {
            time_alive: 0.5,
            ..body(1, 15.0)
        };
        let push = resolve_push(&config, &body(0, 0.0), &newborn, &[], DT).expect("push");
        let expected = 5.0 * 0.5 / config.push_throttle_timeout * config.push_throttle_factor / DT;
        assert!((push.amount - expected).abs() < 1e-3);
    }

    #[test]
    fn soft_cap_limits_depth_before_throttling() {
        let config = SimConfig::default();
        let soft_newborn = PushBody {
            pushes_softly: true,
            time_alive: 0.5,
            ..body(1, 15.0)
        };
        let push = resolve_push(&config, &body(0, 0.0), &soft_newborn, &[], DT).expect("push");
        let capped_depth = config.push_softly_amount * DT;
        let expected = capped_depth * 0.5 / config.push_throttle_timeout
            * config.push_throttle_factor
            / DT;
        assert!((push.amount - expected).abs() < 1e-3);
    }

    #[test]
    fn soft_cap_ignores_hitbox_pushes() {
        let config = SimConfig::default();
        let pusher = PushBody {
            pushes_softly: true,
            pushes_with_hitboxes: true,
            ..body(1, 100.0)
        };
        let hitboxes = [PushHitbox {
            pos: Vec2::new(12.0, 0.0),
            radius: 5.0,
        }];
        let push = resolve_push(&config, &body(0, 0.0), &pusher, &hitboxes, DT).expect("push");
        assert!((push.amount - 3.0 / DT).abs() < 1e-2);
        assert!(push.amount > config.push_softly_amount);
    }

    #[test]
    fn coincident_idle_teammates_get_distinct_finite_nonzero_angles() {
        let config = SimConfig::default();
        let first = PushBody {
            idle: true,
            team: Team::Player1,
            pushes: false,
            ..body(0, 0.0)
        };
        let second = PushBody { order: 1, ..first };

        let on_first = resolve_push(&config, &first, &second, &[], DT).expect("first pushed");
        let on_second = resolve_push(&config, &second, &first, &[], DT).expect("second pushed");
        for push in [on_first, on_second] {
            assert!(push.angle.is_finite());
            assert!(push.angle != 0.0);
            assert!((push.amount - config.idle_push_amount / DT).abs() < 1e-3);
        }
        assert!(on_first.angle != on_second.angle);
    }

    #[test]
    fn hitbox_pushing_keeps_the_deepest_hitbox() {
        let config = SimConfig::default();
        let pusher = PushBody {
            pushes_with_hitboxes: true,
            ..body(1, 100.0)
        };
        let hitboxes = [
            PushHitbox {
                pos: Vec2::new(0.0, 18.0),
                radius: 10.0,
            },
            PushHitbox {
                pos: Vec2::new(12.0, 0.0),
                radius: 5.0,
            },
        ];
        let push = resolve_push(&config, &body(0, 0.0), &pusher, &hitboxes, DT).expect("push");
        assert!((push.amount - 3.0 / DT).abs() < 1e-2);
        assert!((normalize_angle(push.angle) - PI).abs() < 1e-5);
    }

    #[test]
    fn circle_against_rectangle_pusher_leaves_through_side() {
        let config = SimConfig::default();
        let wall = PushBody {
            rect: Some(OrientedRect {
                center: Vec2::new(20.0, 0.0),
                dims: Vec2::new(20.0, 40.0),
                angle: 0.0,
            }),
            ..body(1, 20.0)
        };
        let push = resolve_push(&config, &body(0, 2.0), &wall, &[], DT).expect("push");
        assert!((push.amount - 2.0 / DT).abs() < 1e-2);
        assert!((normalize_angle(push.angle) - PI).abs() < 1e-5);
    }
}
