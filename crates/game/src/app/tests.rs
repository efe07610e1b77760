    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use engine::{compile_content, compile_content_from_str, AppPaths, ContentRequest, SimConfig};
    use tempfile::TempDir;

    use super::area::{self, AreaLoadError};
    use super::bootstrap::{self, BootstrapError};
    use super::loop_runner;

    const CONTENT: &str = r#"<Defs>
        <StatusDef name="burning"><duration>1</duration><healthPerSecond>-10</healthPerSecond></StatusDef>
        <HazardDef name="fire"><status>burning</status></HazardDef>
        <MobType name="walker" category="pikmin"><radius>5</radius><maxHealth>10</maxHealth></MobType>
        <MobType name="chief" category="leader"><radius>10</radius></MobType>
    </Defs>"#;

    fn area_path() -> PathBuf {
        PathBuf::from("areas/test.json")
    }

    fn repo_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    #[test]
    fn area_file_defaults_fill_missing_fields() {
        let area = area::parse_area_file(
            &area_path(),
            r#"{ "placements": [ { "mob_type": "walker", "pos": { "x": 1.0, "y": 2.0 } } ] }"#,
        )
        .expect("area");
        assert_eq!(area.placements.len(), 1);
        assert_eq!(area.placements[0].angle, 0.0);
        assert_eq!(area.ticks, 600);
        assert!(area.delta_t > 0.0);
        assert_eq!(area.active_leader, None);
    }

    #[test]
    fn area_parse_error_reports_json_path() {
        let err = area::parse_area_file(
            &area_path(),
            r#"{ "placements": [ { "mob_type": "walker", "pos": { "x": "far", "y": 0.0 } } ] }"#,
        )
        .expect_err("bad x");
        match err {
            AreaLoadError::Parse { json_path, .. } => assert_eq!(json_path, "placements[0].pos.x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn area_rejects_unknown_fields_and_bad_delta() {
        let unknown = area::parse_area_file(&area_path(), r#"{ "tickz": 3 }"#).expect_err("unknown");
        assert!(matches!(unknown, AreaLoadError::Parse { .. }));

        let zero = area::parse_area_file(&area_path(), r#"{ "delta_t": 0.0 }"#).expect_err("zero");
        assert!(matches!(zero, AreaLoadError::InvalidDeltaTime(_)));
    }

    #[test]
    fn unknown_hazard_zone_is_rejected() {
        let compiled = compile_content_from_str(CONTENT).expect("content");
        let area = area::parse_area_file(
            &area_path(),
            r#"{ "hazard_zones": [ { "hazard": "lava", "center": { "x": 0.0, "y": 0.0 }, "radius": 5.0 } ] }"#,
        )
        .expect("area");
        let err = area::build_geometry(&area, &compiled.database).expect_err("lava");
        assert!(matches!(err, AreaLoadError::UnknownHazard(name) if name == "lava"));
    }

    #[test]
    fn populate_places_mobs_and_sets_leader() {
        let compiled = compile_content_from_str(CONTENT).expect("content");
        let area = area::parse_area_file(
            &area_path(),
            r#"{
                "placements": [
                    { "mob_type": "walker", "pos": { "x": 0.0, "y": 0.0 } },
                    { "mob_type": "chief", "pos": { "x": 50.0, "y": 0.0 } }
                ],
                "active_leader": 1
            }"#,
        )
        .expect("area");
        let sim = bootstrap::build_sim(Arc::new(compiled.database), SimConfig::default(), &area)
            .expect("sim");
        assert_eq!(sim.arena.len(), 2);
        assert_eq!(sim.stats.mobs_spawned, 2);
        let leader = sim.active_leader.expect("leader");
        assert_eq!(sim.mob(leader).expect("chief").pos.x, 50.0);
    }

    #[test]
    fn populate_rejects_bad_leader_and_unknown_type() {
        let compiled = compile_content_from_str(CONTENT).expect("content");
        let content = Arc::new(compiled.database);

        let leader = area::parse_area_file(&area_path(), r#"{ "active_leader": 0 }"#).expect("area");
        let Err(err) = bootstrap::build_sim(Arc::clone(&content), SimConfig::default(), &leader)
        else {
            panic!("leader index should be rejected");
        };
        assert!(matches!(err, AreaLoadError::LeaderOutOfRange { index: 0, count: 0 }));

        let unknown = area::parse_area_file(
            &area_path(),
            r#"{ "placements": [ { "mob_type": "ghost", "pos": { "x": 0.0, "y": 0.0 } } ] }"#,
        )
        .expect("area");
        let Err(err) = bootstrap::build_sim(content, SimConfig::default(), &unknown) else {
            panic!("unknown mob type should be rejected");
        };
        assert!(matches!(err, AreaLoadError::Spawn(_)));
    }

    #[test]
    fn hazard_zone_burns_placed_mob() {
        let compiled = compile_content_from_str(CONTENT).expect("content");
        let area = area::parse_area_file(
            &area_path(),
            r#"{
                "hazard_zones": [ { "hazard": "fire", "center": { "x": 0.0, "y": 0.0 }, "radius": 20.0 } ],
                "placements": [ { "mob_type": "walker", "pos": { "x": 0.0, "y": 0.0 } } ],
                "ticks": 5,
                "delta_t": 0.1
            }"#,
        )
        .expect("area");
        let mut sim = bootstrap::build_sim(Arc::new(compiled.database), SimConfig::default(), &area)
            .expect("sim");

        let totals = loop_runner::run_ticks(&mut sim, area.ticks, area.delta_t, 0);
        assert_eq!(totals.frame, 5);
        assert_eq!(totals.mobs_ticked, 5);
        let walker = sim.snapshot().into_iter().next().expect("walker");
        assert!(walker.health < 10.0);
    }

    #[test]
    fn sim_config_defaults_without_file() {
        let temp = TempDir::new().expect("temp");
        let config = bootstrap::load_sim_config(temp.path()).expect("config");
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn sim_config_file_errors_surface() {
        let temp = TempDir::new().expect("temp");
        fs::write(temp.path().join("sim.json"), r#"{ "max_event_depth": "deep" }"#).expect("write");
        let err = bootstrap::load_sim_config(temp.path()).expect_err("bad config");
        assert!(matches!(err, BootstrapError::Config(_)));

        fs::write(temp.path().join("sim.json"), r#"{ "max_event_depth": 4 }"#).expect("write");
        let config = bootstrap::load_sim_config(temp.path()).expect("config");
        assert_eq!(config.max_event_depth, 4);
    }

    #[test]
    fn shipped_content_and_demo_area_run() {
        let paths = AppPaths::from_root(repo_root());
        let compiled = compile_content(&paths, &ContentRequest::default()).expect("content");
        assert!(
            compiled.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            compiled.diagnostics.entries()
        );
        let config = bootstrap::load_sim_config(&paths.config_dir).expect("config");
        let area = area::load_area_file(&area::area_file_path(&paths.areas_dir, "demo"))
            .expect("demo area");
        let mut sim = bootstrap::build_sim(Arc::new(compiled.database), config, &area).expect("sim");

        let totals = loop_runner::run_ticks(&mut sim, 120, area.delta_t, 0);
        assert_eq!(totals.frame, 120);
        assert!(totals.pairs_scanned > 0);
    }
