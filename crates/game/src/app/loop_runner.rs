use std::process::ExitCode;

use engine::{FrameReport, SimContext, Statistics};
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        mut sim,
        area_name,
        ticks,
        delta_t,
        snapshot_every,
    } = app;
    info!(area = %area_name, ticks, delta_t, mobs = sim.arena.len(), "sim_started");

    let totals = run_ticks(&mut sim, ticks, delta_t, snapshot_every);
    log_statistics(&sim.stats);
    info!(
        frames = ticks,
        handlers_run = totals.handlers_run,
        deferred_dispatched = totals.deferred_dispatched,
        deferred_skipped = totals.deferred_skipped,
        mobs_left = sim.arena.len(),
        "sim_finished"
    );

    match serde_json::to_string(&sim.snapshot()) {
        Ok(json) => {
            info!(snapshot = %json, "final_snapshot");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "snapshot_encode_failed");
            ExitCode::FAILURE
        }
    }
}

/// Steps `ticks` frames and sums the per-frame counters.
pub(crate) fn run_ticks(
    sim: &mut SimContext,
    ticks: u32,
    delta_t: f32,
    snapshot_every: u32,
) -> FrameReport {
    let mut totals = FrameReport::default();
    for _ in 0..ticks {
        let report = sim.step(delta_t);
        debug!(
            frame = report.frame,
            mobs_ticked = report.mobs_ticked,
            pairs_scanned = report.pairs_scanned,
            pairs_gated = report.pairs_gated,
            immediate_events = report.immediate_events,
            deferred_dispatched = report.deferred_dispatched,
            deferred_skipped = report.deferred_skipped,
            "frame_report"
        );
        accumulate(&mut totals, &report);

        if snapshot_every > 0 && report.frame % u64::from(snapshot_every) == 0 {
            for mob in sim.snapshot() {
                info!(
                    frame = report.frame,
                    mob = mob.id.index,
                    mob_type = %mob.mob_type,
                    state = %mob.state,
                    x = mob.x,
                    y = mob.y,
                    health = mob.health,
                    "mob_snapshot"
                );
            }
        }
    }
    totals.frame = sim.frame();
    totals
}

fn accumulate(totals: &mut FrameReport, report: &FrameReport) {
    totals.mobs_ticked += report.mobs_ticked;
    totals.pairs_scanned += report.pairs_scanned;
    totals.pairs_gated += report.pairs_gated;
    totals.touch_checks += report.touch_checks;
    totals.hitbox_contacts += report.hitbox_contacts;
    totals.immediate_events += report.immediate_events;
    totals.deferred_queued += report.deferred_queued;
    totals.deferred_dispatched += report.deferred_dispatched;
    totals.deferred_skipped += report.deferred_skipped;
    totals.handlers_run += report.handlers_run;
    totals.mobs_deleted += report.mobs_deleted;
    totals.mobs_spawned += report.mobs_spawned;
}

fn log_statistics(stats: &Statistics) {
    info!(
        mobs_spawned = stats.mobs_spawned,
        mobs_deleted = stats.mobs_deleted,
        pikmin_born = stats.pikmin_born,
        pikmin_deaths = stats.pikmin_deaths,
        enemy_deaths = stats.enemy_deaths,
        hits_landed = stats.hits_landed,
        messages_sent = stats.messages_sent,
        "sim_statistics"
    );
}
