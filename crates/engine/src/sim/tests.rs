    use std::sync::Arc;

    use super::*;
    use crate::content::compile_content_from_str;
    use crate::geometry::Vec2;
    use crate::script::{run_event, EventPayload, MobEventKind};

    const DT: f32 = 0.1;

    fn sim_from(xml: &str) -> SimContext {
        let compiled = compile_content_from_str(xml).expect("content");
        assert!(
            compiled.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            compiled.diagnostics.entries()
        );
        SimContext::new(
            Arc::new(compiled.database),
            SimConfig {
                rng_seed: Some(1),
                ..SimConfig::default()
            },
        )
    }

    fn spawn_at(sim: &mut SimContext, type_name: &str, x: f32, y: f32) -> MobId {
        sim.spawn_mob(type_name, Vec2::new(x, y), 0.0)
            .expect("spawn")
    }

    fn var(sim: &SimContext, id: MobId, name: &str) -> String {
        sim.mob(id).expect("mob").var(name).to_string()
    }

    const ROCK: &str = r#"<MobType name="rock" category="custom"><radius>10</radius></MobType>"#;

    #[test]
    fn touching_another_mob_switches_state_and_records_history() {
        let mut sim = sim_from(&format!(
            r#"<Defs>{ROCK}
            <MobType name="walker" category="pikmin">
                <radius>10</radius>
                <script>
                    <state name="idle">
                        <event kind="on_touch_object"><action>set_state touched</action></event>
                    </state>
                    <state name="touched"/>
                </script>
            </MobType></Defs>"#
        ));
        let walker = spawn_at(&mut sim, "walker", 0.0, 0.0);
        spawn_at(&mut sim, "rock", 15.0, 0.0);
        sim.apply_pending();

        let report = sim.step(DT);
        assert_eq!(sim.state_name_of(walker), Some("touched"));
        let walker_mob = sim.mob(walker).expect("walker");
        assert_eq!(walker_mob.fsm.prev_state_names[0], "idle");
        assert_eq!(report.touch_checks, 2);
        assert_eq!(report.immediate_events, 2);
    }

    #[test]
    fn distant_pairs_stop_at_the_coarse_gate() {
        let mut sim = sim_from(&format!("<Defs>{ROCK}</Defs>"));
        spawn_at(&mut sim, "rock", 0.0, 0.0);
        spawn_at(&mut sim, "rock", 100.0, 0.0);
        sim.apply_pending();

        let report = sim.step(DT);
        assert_eq!(report.pairs_scanned, 2);
        assert_eq!(report.pairs_gated, 2);
        assert_eq!(report.touch_checks, 0);
        assert_eq!(report.handlers_run, 0);
    }

    #[test]
    fn reach_at_its_edge_passes_the_coarse_gate() {
        let mut sim = sim_from(&format!(
            r#"<Defs>{RANKED_TARGET}
            <MobType name="hunter" category="enemy">
                <radius>10</radius>
                <reach name="sight" radius1="50" angle1="360"/>
                <nearReach>sight</nearReach>
                <script><state name="idle">
                    <event kind="on_object_in_reach">
                        <action>focus trigger</action>
                        <action>send_message_to_focus 1</action>
                    </event>
                </state></script>
            </MobType></Defs>"#
        ));
        spawn_at(&mut sim, "hunter", 0.0, 0.0);
        let target = spawn_at(&mut sim, "target", 62.0, 0.0);
        sim.apply_pending();

        let report = sim.step(DT);
        // The target's own pass is still gated.
        assert_eq!(report.pairs_gated, 1);
        assert_eq!(report.deferred_queued, 1);
        assert_eq!(var(&sim, target, "rank"), "1");
    }

    #[test]
    fn carriable_within_task_range_is_noticed_without_a_reach() {
        let mut sim = sim_from(
            r#"<Defs>
            <MobType name="pellet" category="pellet"><radius>10</radius><carrySpots>1</carrySpots></MobType>
            <MobType name="worker" category="pikmin">
                <radius>10</radius>
                <script><state name="idle">
                    <event kind="on_near_carriable_object"><action>set_var saw yes</action></event>
                </state></script>
            </MobType></Defs>"#,
        );
        let worker = spawn_at(&mut sim, "worker", 0.0, 0.0);
        spawn_at(&mut sim, "pellet", 25.0, 0.0);
        sim.apply_pending();

        sim.step(DT);
        assert_eq!(var(&sim, worker, "saw"), "yes");
    }

    #[test]
    fn missing_handler_is_a_no_op() {
        let mut sim = sim_from(&format!("<Defs>{ROCK}</Defs>"));
        let rock = spawn_at(&mut sim, "rock", 0.0, 0.0);
        sim.apply_pending();

        assert!(!run_event(&mut sim, rock, MobEventKind::Timer, &EventPayload::None));
        assert_eq!(sim.report.handlers_run, 0);
        assert_eq!(sim.state_name_of(rock), Some("idle"));
    }

    #[test]
    fn add_health_clamps_to_the_floor() {
        let mut sim = sim_from(
            r#"<Defs><MobType name="blob" category="custom">
                <radius>5</radius><maxHealth>10</maxHealth>
                <script><state name="idle">
                    <event kind="on_enter"><action>add_health -999999</action></event>
                    <event kind="on_timer"><action>add_health 999999</action></event>
                </state></script>
            </MobType></Defs>"#,
        );
        let blob = spawn_at(&mut sim, "blob", 0.0, 0.0);
        sim.apply_pending();
        assert_eq!(sim.mob(blob).expect("blob").health, 0.0);

        run_event(&mut sim, blob, MobEventKind::Timer, &EventPayload::None);
        assert_eq!(sim.mob(blob).expect("blob").health, 10.0);
    }

    const RANKED_TARGET: &str = r#"<MobType name="target" category="custom">
        <radius>5</radius><maxHealth>10</maxHealth>
        <script><state name="idle">
            <event kind="on_receive_message"><action>get_info rank message</action></event>
        </state></script>
    </MobType>"#;

    fn reach_sim(on_reach: &str) -> SimContext {
        sim_from(&format!(
            r#"<Defs>{RANKED_TARGET}
            <MobType name="hunter" category="enemy">
                <radius>10</radius>
                <reach name="sight" radius1="200" angle1="360"/>
                <nearReach>sight</nearReach>
                <script>
                    <state name="idle">
                        <event kind="on_object_in_reach">{on_reach}</event>
                    </state>
                    <state name="chasing"/>
                </script>
            </MobType></Defs>"#
        ))
    }

    #[test]
    fn deferred_events_run_closest_surface_first() {
        let mut sim = reach_sim(
            "<action>focus trigger</action>\
             <action>calculate n $n + 1</action>\
             <action>send_message_to_focus $n</action>",
        );
        spawn_at(&mut sim, "hunter", 0.0, 0.0);
        let middle = spawn_at(&mut sim, "target", 100.0, 0.0);
        let near = spawn_at(&mut sim, "target", 50.0, 0.0);
        let far = spawn_at(&mut sim, "target", 150.0, 0.0);
        sim.apply_pending();

        let report = sim.step(DT);
        assert_eq!(var(&sim, near, "rank"), "1");
        assert_eq!(var(&sim, middle, "rank"), "2");
        assert_eq!(var(&sim, far, "rank"), "3");
        assert_eq!(report.deferred_queued, 3);
        assert_eq!(report.deferred_dispatched, 3);
        assert_eq!(report.deferred_skipped, 0);
        assert_eq!(sim.stats.messages_sent, 3);
    }

    #[test]
    fn state_change_skips_the_remaining_deferred_events() {
        let mut sim = reach_sim(
            "<action>focus trigger</action>\
             <action>set_state chasing</action>",
        );
        let hunter = spawn_at(&mut sim, "hunter", 0.0, 0.0);
        spawn_at(&mut sim, "target", 100.0, 0.0);
        let near = spawn_at(&mut sim, "target", 50.0, 0.0);
        spawn_at(&mut sim, "target", 150.0, 0.0);
        sim.apply_pending();

        let report = sim.step(DT);
        assert_eq!(report.deferred_dispatched, 1);
        assert_eq!(report.deferred_skipped, 2);
        assert_eq!(sim.state_name_of(hunter), Some("chasing"));
        assert_eq!(sim.mob(hunter).expect("hunter").focus, Some(near));
    }

    #[test]
    fn attack_hitbox_hits_once_per_timeout() {
        let mut sim = sim_from(
            r#"<Defs>
            <MobType name="biter" category="enemy">
                <radius>10</radius>
                <team>enemy_1</team>
                <hurtableTargets>player</hurtableTargets>
                <bodyParts>jaw</bodyParts>
                <animation name="bite">
                    <frame duration="10"><hitbox bodyPart="jaw" radius="20" type="attack" value="3"/></frame>
                </animation>
            </MobType>
            <MobType name="sprout" category="pikmin">
                <radius>10</radius>
                <maxHealth>100</maxHealth>
                <team>player_1</team>
                <targetType>player</targetType>
                <bodyParts>body</bodyParts>
                <animation name="stand">
                    <frame duration="10"><hitbox bodyPart="body" radius="10"/></frame>
                </animation>
            </MobType></Defs>"#,
        );
        let sprout = spawn_at(&mut sim, "sprout", 0.0, 0.0);
        let biter = spawn_at(&mut sim, "biter", 15.0, 0.0);
        sim.apply_pending();

        for _ in 0..4 {
            sim.step(DT);
        }
        assert_eq!(sim.mob(sprout).expect("sprout").health, 97.0);
        assert_eq!(sim.stats.hits_landed, 1);
        assert!(sim.mob(biter).expect("biter").recently_hit(sprout));

        for _ in 0..4 {
            sim.step(DT);
        }
        assert_eq!(sim.mob(sprout).expect("sprout").health, 94.0);
        assert_eq!(sim.stats.hits_landed, 2);
    }

    const HAZARD_DEFS: &str = r#"
        <StatusDef name="burning"><duration>5</duration><healthPerSecond>-1</healthPerSecond></StatusDef>
        <StatusDef name="dazed"><duration>100</duration><disablesAttack>true</disablesAttack></StatusDef>
        <HazardDef name="fire"><status>burning</status></HazardDef>"#;

    fn scorcher(name: &str, on_enter: &str) -> String {
        format!(
            r#"<MobType name="{name}" category="enemy">
                <radius>10</radius>
                <team>enemy_1</team>
                <hurtableTargets>player</hurtableTargets>
                <bodyParts>jaw</bodyParts>
                <animation name="bite">
                    <frame duration="10"><hitbox bodyPart="jaw" radius="20" type="attack" value="1" hazards="fire"/></frame>
                </animation>
                <script><state name="idle">
                    <event kind="on_enter">{on_enter}</event>
                </state></script>
            </MobType>"#
        )
    }

    #[test]
    fn disabled_attack_does_not_spread_hitbox_hazards() {
        let mut sim = sim_from(&format!(
            r#"<Defs>{HAZARD_DEFS}
            {}
            {}
            <MobType name="sprout" category="pikmin">
                <radius>10</radius>
                <maxHealth>100</maxHealth>
                <team>player_1</team>
                <targetType>player</targetType>
                <bodyParts>body</bodyParts>
                <animation name="stand">
                    <frame duration="10"><hitbox bodyPart="body" radius="10"/></frame>
                </animation>
            </MobType></Defs>"#,
            scorcher("scorcher", ""),
            scorcher("dazed_scorcher", "<action>receive_status dazed</action>"),
        ));
        let burning = sim.content.status_id_by_name("burning").expect("burning");
        let scorched = spawn_at(&mut sim, "sprout", 0.0, 0.0);
        spawn_at(&mut sim, "scorcher", 15.0, 0.0);
        let spared = spawn_at(&mut sim, "sprout", 500.0, 0.0);
        spawn_at(&mut sim, "dazed_scorcher", 515.0, 0.0);
        sim.apply_pending();

        sim.step(DT);
        assert!(sim.mob(scorched).expect("scorched").has_status(burning));
        let spared = sim.mob(spared).expect("spared");
        assert!(!spared.has_status(burning));
        assert_eq!(spared.health, 100.0);
    }

    #[test]
    fn overlapping_attack_hitboxes_report_once_per_frame() {
        let mut sim = sim_from(
            r#"<Defs>
            <MobType name="pincer" category="enemy">
                <radius>10</radius>
                <bodyParts>left right</bodyParts>
                <animation name="snap">
                    <frame duration="10">
                        <hitbox bodyPart="left" x="-5" y="3" radius="5" type="attack"/>
                        <hitbox bodyPart="right" x="-5" y="-3" radius="5" type="attack"/>
                    </frame>
                </animation>
                <script><state name="idle">
                    <event kind="on_hitbox_touch_a_n"><action>calculate n $n + 1</action></event>
                </state></script>
            </MobType>
            <MobType name="stump" category="custom">
                <radius>10</radius>
                <bodyParts>trunk</bodyParts>
                <animation name="stand">
                    <frame duration="10"><hitbox bodyPart="trunk" radius="10"/></frame>
                </animation>
            </MobType></Defs>"#,
        );
        spawn_at(&mut sim, "stump", 0.0, 0.0);
        let pincer = spawn_at(&mut sim, "pincer", 15.0, 0.0);
        sim.apply_pending();

        sim.step(DT);
        assert_eq!(var(&sim, pincer, "n"), "1");
        sim.step(DT);
        assert_eq!(var(&sim, pincer, "n"), "2");
    }

    #[test]
    fn eaten_state_skips_the_later_hitbox_events() {
        let mut sim = sim_from(&format!(
            r#"<Defs>{HAZARD_DEFS}
            {}
            <MobType name="morsel" category="pikmin">
                <radius>10</radius>
                <team>player_1</team>
                <targetType>player</targetType>
                <bodyParts>body</bodyParts>
                <statesIgnoringHazard>eaten</statesIgnoringHazard>
                <animation name="stand">
                    <frame duration="10"><hitbox bodyPart="body" radius="10"/></frame>
                </animation>
                <script>
                    <state name="idle">
                        <event kind="on_hitbox_touch_eat"><action>set_state eaten</action></event>
                        <event kind="on_hitbox_touch_n_a"><action>set_var hit yes</action></event>
                    </state>
                    <state name="eaten"/>
                </script>
            </MobType></Defs>"#,
            scorcher("chomper", "<action>start_chomping 1 jaw</action>"),
        ));
        let burning = sim.content.status_id_by_name("burning").expect("burning");
        let morsel = spawn_at(&mut sim, "morsel", 0.0, 0.0);
        spawn_at(&mut sim, "chomper", 15.0, 0.0);
        sim.apply_pending();

        sim.step(DT);
        assert_eq!(sim.state_name_of(morsel), Some("eaten"));
        assert_eq!(var(&sim, morsel, "hit"), "");
        assert!(!sim.mob(morsel).expect("morsel").has_status(burning));
    }

    #[test]
    fn goto_loop_runs_until_condition_fails() {
        let mut sim = sim_from(
            r#"<Defs><MobType name="counter" category="custom">
                <radius>5</radius>
                <script><state name="idle">
                    <event kind="on_enter">
                        <action>set_var i 0</action>
                        <action>label top</action>
                        <action>calculate i $i + 1</action>
                        <action>if $i lt 5</action>
                        <action>goto top</action>
                        <action>else</action>
                        <action>set_var done yes</action>
                        <action>end_if</action>
                    </event>
                </state></script>
            </MobType></Defs>"#,
        );
        let counter = spawn_at(&mut sim, "counter", 0.0, 0.0);
        sim.apply_pending();
        assert_eq!(var(&sim, counter, "i"), "5");
        assert_eq!(var(&sim, counter, "done"), "yes");
    }

    #[test]
    fn runaway_goto_is_capped() {
        let mut sim = sim_from(
            r#"<Defs><MobType name="spinner" category="custom">
                <radius>5</radius>
                <script><state name="idle">
                    <event kind="on_enter">
                        <action>label top</action>
                        <action>calculate n $n + 1</action>
                        <action>goto top</action>
                    </event>
                </state></script>
            </MobType></Defs>"#,
        );
        let spinner = spawn_at(&mut sim, "spinner", 0.0, 0.0);
        sim.apply_pending();
        let count = var(&sim, spinner, "n").parse::<u32>().expect("count");
        assert!(count > 0 && count < 4096);
    }

    #[test]
    fn spawned_mobs_join_at_the_end_of_the_frame() {
        let mut sim = sim_from(
            r#"<Defs>
            <MobType name="baby" category="pikmin"><radius>3</radius></MobType>
            <MobType name="mother" category="enemy">
                <radius>10</radius>
                <spawn name="child" mobType="baby" x="20"/>
                <script><state name="idle">
                    <event kind="on_tick">
                        <action>if $spawned ne yes</action>
                        <action>spawn child</action>
                        <action>set_var spawned yes</action>
                        <action>end_if</action>
                    </event>
                </state></script>
            </MobType></Defs>"#,
        );
        spawn_at(&mut sim, "mother", 0.0, 0.0);
        sim.apply_pending();

        let first = sim.step(DT);
        assert_eq!(first.mobs_ticked, 1);
        assert_eq!(first.mobs_spawned, 1);
        assert_eq!(sim.arena.len(), 2);
        assert_eq!(sim.stats.pikmin_born, 1);

        let baby = sim
            .arena
            .iter()
            .find(|mob| mob.category() == crate::content::MobCategory::Pikmin)
            .expect("baby");
        assert!((baby.pos.x - 20.0).abs() < 1e-4);

        let second = sim.step(DT);
        assert_eq!(second.mobs_ticked, 2);
        assert_eq!(sim.stats.mobs_spawned, 2);
    }

    #[test]
    fn deleted_mobs_are_skipped_and_swept() {
        let mut sim = sim_from(&format!(
            r#"<Defs>{ROCK}
            <MobType name="ghost" category="custom">
                <radius>10</radius>
                <script><state name="idle">
                    <event kind="on_tick"><action>delete</action></event>
                </state></script>
            </MobType></Defs>"#
        ));
        let ghost = spawn_at(&mut sim, "ghost", 0.0, 0.0);
        spawn_at(&mut sim, "rock", 5.0, 0.0);
        sim.apply_pending();

        let report = sim.step(DT);
        assert_eq!(report.pairs_scanned, 0);
        assert_eq!(report.mobs_deleted, 1);
        assert!(sim.mob(ghost).is_none());
        assert_eq!(sim.arena.len(), 1);
        assert_eq!(sim.stats.mobs_deleted, 1);
    }

    #[test]
    fn zero_health_enters_the_death_state() {
        let mut sim = sim_from(
            r#"<Defs><MobType name="grub" category="enemy">
                <radius>5</radius><maxHealth>10</maxHealth>
                <script deathState="dying">
                    <state name="idle">
                        <event kind="on_timer"><action>set_health 0</action></event>
                    </state>
                    <state name="dying">
                        <event kind="on_enter"><action>start_dying</action></event>
                    </state>
                </script>
            </MobType></Defs>"#,
        );
        let grub = spawn_at(&mut sim, "grub", 0.0, 0.0);
        sim.apply_pending();
        run_event(&mut sim, grub, MobEventKind::Timer, &EventPayload::None);

        sim.step(DT);
        assert_eq!(sim.state_name_of(grub), Some("dying"));
        assert!(sim.mob(grub).expect("grub").dying);
        assert_eq!(sim.stats.enemy_deaths, 1);

        sim.step(DT);
        assert_eq!(sim.stats.enemy_deaths, 1);
    }

    #[test]
    fn message_ping_pong_stops_at_the_depth_limit() {
        let mut sim = sim_from(
            r#"<Defs><MobType name="echo" category="custom">
                <radius>5</radius>
                <script><state name="idle">
                    <event kind="on_receive_message"><action>send_message_to_focus ping</action></event>
                </state></script>
            </MobType></Defs>"#,
        );
        let a = spawn_at(&mut sim, "echo", 0.0, 0.0);
        let b = spawn_at(&mut sim, "echo", 100.0, 0.0);
        sim.apply_pending();
        sim.mob_mut(a).expect("a").focus = Some(b);
        sim.mob_mut(b).expect("b").focus = Some(a);

        sim.send_message(b, a, "ping");
        let depth = u64::from(sim.config.max_event_depth);
        assert_eq!(sim.report.handlers_run, depth);
        assert_eq!(sim.stats.messages_sent, depth + 1);
        assert_eq!(sim.event_depth, 0);
    }

    #[test]
    fn pusher_moves_overlapping_mob_away() {
        let mut sim = sim_from(&format!(
            r#"<Defs>{ROCK}
            <MobType name="bully" category="enemy">
                <radius>10</radius><pushes>true</pushes><pushable>false</pushable>
            </MobType></Defs>"#
        ));
        let rock = spawn_at(&mut sim, "rock", 0.0, 0.0);
        let bully = spawn_at(&mut sim, "bully", 15.0, 0.0);
        sim.apply_pending();

        for _ in 0..3 {
            sim.step(DT);
        }
        assert!(sim.mob(rock).expect("rock").pos.x < 0.0);
        assert_eq!(sim.mob(bully).expect("bully").pos, Vec2::new(15.0, 0.0));
    }

    #[test]
    fn area_hazard_applies_status_until_it_expires() {
        let compiled = compile_content_from_str(
            r#"<Defs>
            <StatusDef name="burning"><duration>0.35</duration><healthPerSecond>-10</healthPerSecond></StatusDef>
            <HazardDef name="fire"><status>burning</status></HazardDef>
            <MobType name="sprout" category="pikmin"><radius>5</radius><maxHealth>100</maxHealth></MobType>
            </Defs>"#,
        )
        .expect("content");
        let fire = compiled.database.hazard_id_by_name("fire").expect("fire");
        let burning = compiled.database.status_id_by_name("burning").expect("burning");
        let area = FlatArea {
            floor_z: 0.0,
            hazard_zones: vec![HazardZone {
                center: Vec2::ZERO,
                radius: 50.0,
                hazard: fire,
            }],
        };
        let mut sim = SimContext::new(Arc::new(compiled.database), SimConfig::default())
            .with_area(area);
        let sprout = spawn_at(&mut sim, "sprout", 0.0, 0.0);
        sim.apply_pending();

        sim.step(DT);
        assert!(sim.mob(sprout).expect("sprout").has_status(burning));
        assert_eq!(sim.mob(sprout).expect("sprout").hazards_touching, vec![fire]);

        sim.mob_mut(sprout).expect("sprout").pos = Vec2::new(200.0, 0.0);
        sim.step(DT);
        let mob = sim.mob(sprout).expect("sprout");
        assert!(mob.hazards_touching.is_empty());
        assert!(mob.health < 100.0);

        for _ in 0..5 {
            sim.step(DT);
        }
        assert!(!sim.mob(sprout).expect("sprout").has_status(burning));
    }

    #[test]
    fn snapshot_reports_names() {
        let mut sim = sim_from(&format!("<Defs>{ROCK}</Defs>"));
        spawn_at(&mut sim, "rock", 3.0, 4.0);
        sim.apply_pending();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].mob_type, "rock");
        assert_eq!(snapshot[0].category, "custom");
        assert_eq!(snapshot[0].state, "idle");
        assert_eq!(snapshot[0].x, 3.0);
        let json = serde_json::to_value(&snapshot[0]).expect("json");
        assert_eq!(json["state"], "idle");
    }
