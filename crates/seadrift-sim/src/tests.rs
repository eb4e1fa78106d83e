#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use seadrift_coast::{ConstantDepth, ShorelineMap};
    use seadrift_core::config::{
        AnchoringConfig, FieldConfig, LeewayParams, ObjectTypeConfig, RunConfig, ScenarioConfig,
    };
    use seadrift_core::constants::INFINITE_PENALTY;
    use seadrift_core::enums::*;
    use seadrift_core::error::DriftError;
    use seadrift_core::ids::ParticleIndexes;
    use seadrift_core::types::{LatLng, RefSecs, SimSecs};

    use crate::archive::{MemoryArchive, ParticleArchive};
    use crate::clock::RunClock;
    use crate::context::DriftContext;
    use crate::environment::{EmptyField, EnvironmentProvider, FieldSample, UniformField};
    use crate::itinerary::WaypointItinerary;
    use crate::leeway::{LeewayResponse, ObjectCatalog};
    use crate::particle::{Particle, ParticleInit};
    use crate::seeding::particle_stream;
    use crate::tracker::{Tracker, World};
    use crate::workers::WorkerPool;

    const HOUR: SimSecs = 3600;

    fn object(name: &str, sticky: bool) -> ObjectTypeConfig {
        ObjectTypeConfig {
            name: name.into(),
            leeway: LeewayParams::default(),
            sticky,
            anchoring: None,
            survival_hours: None,
        }
    }

    fn square(lat0: f64, lng0: f64, lat1: f64, lng1: f64) -> Vec<LatLng> {
        vec![
            LatLng::new(lat0, lng0),
            LatLng::new(lat0, lng1),
            LatLng::new(lat1, lng1),
            LatLng::new(lat1, lng0),
        ]
    }

    /// Collaborators for single-particle physics tests.
    struct Fixture {
        currents: UniformField,
        winds: EmptyField,
        land: ShorelineMap,
        objects: ObjectCatalog,
        bathymetry: ConstantDepth,
    }

    impl Fixture {
        fn new(u: f64, v: f64, land: ShorelineMap, object: ObjectTypeConfig) -> Self {
            Self {
                currents: UniformField::calm(u, v),
                winds: EmptyField,
                land,
                objects: ObjectCatalog::new(vec![object]),
                bathymetry: ConstantDepth(10.0),
            }
        }

        fn ctx(&self, direction: RunDirection) -> DriftContext<'_> {
            DriftContext {
                currents: &self.currents,
                winds: &self.winds,
                land: &self.land,
                objects: &self.objects,
                bathymetry: &self.bathymetry,
                itinerary: None,
                clock: RunClock::new(1_000_000, direction),
                interpolation: InterpolationMode::Linear,
                river_heading: None,
            }
        }
    }

    fn particle(start: LatLng, distress: SimSecs, seed: u64) -> Particle {
        let index = ParticleIndexes::new(1, 1, 1).core(0, 0).unwrap();
        Particle::random(
            ParticleInit {
                index,
                object_type: 0,
                start,
                birth: 0,
                distress,
                expiration: None,
                init_prior: 1.0,
            },
            particle_stream(seed),
            LeewayResponse::mean(LeewayParams::default()),
        )
    }

    /// Island whose west shore is 2 nmi east of the origin.
    fn island() -> ShorelineMap {
        ShorelineMap::new(vec![square(-0.5, 2.0 / 60.0, 0.5, 1.0)])
    }

    // ---- Drift physics ----

    #[test]
    fn test_clear_run_five_nmi() {
        let fx = Fixture::new(5.0, 0.0, ShorelineMap::default(), object("piw", false));
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 1);
        p.settle(&ctx);

        let tail = *p.time_update(HOUR, &ctx);
        assert_eq!(tail.time, HOUR);
        assert!((tail.position.lng - 5.0 / 60.0).abs() < 1e-9, "got {:?}", tail.position);
        assert!(tail.position.lat.abs() < 1e-12);
        assert_eq!(tail.drift_state(), DriftState::AdriftMoving);
        assert_eq!(p.runtime().penalty().full, 0);
    }

    #[test]
    fn test_sticky_object_stops_at_shore() {
        let fx = Fixture::new(5.0, 0.0, island(), object("raft", true));
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 2);
        p.settle(&ctx);

        let tail = *p.time_update(HOUR, &ctx);
        assert!(tail.stuck_on_land);
        assert_eq!(tail.svt, StateVectorType::Landed);
        assert!((tail.position.lng - 2.0 / 60.0).abs() < 1e-9, "got {:?}", tail.position);
        assert_eq!(p.runtime().penalty().full, 2);
        assert_eq!(p.runtime().penalty().remaining, INFINITE_PENALTY);
        assert_eq!(p.runtime().landing(), Some(HOUR));

        // Absorbing: later steps repeat the sample.
        let later = *p.time_update(5 * HOUR, &ctx);
        assert_eq!(later.time, 5 * HOUR);
        assert_eq!(later.position, tail.position);
        assert!(later.stuck_on_land);
        assert_eq!(p.runtime().landing(), Some(HOUR));
    }

    #[test]
    fn test_reverse_anchored_particle_stays_put() {
        let mut obj = object("skiff", false);
        obj.anchoring = Some(AnchoringConfig {
            probability: 1.0,
            max_depth_m: 50.0,
        });
        let fx = Fixture::new(3.0, 3.0, ShorelineMap::default(), obj);
        let ctx = fx.ctx(RunDirection::Reverse);
        let start = LatLng::new(10.0, 10.0);
        let mut p = particle(start, 0, 3);
        p.settle(&ctx);
        assert!(p.root().anchored);
        assert_eq!(p.runtime().anchoring(), Some(0));

        for step in 1..=4 {
            let tail = *p.time_update(step * HOUR, &ctx);
            assert_eq!(tail.position, start);
            assert_eq!(tail.drift_state(), DriftState::Anchored);
        }
        assert_eq!(p.chain().len(), 5);
    }

    #[test]
    fn test_reverse_run_drifts_backwards() {
        let fx = Fixture::new(5.0, 0.0, ShorelineMap::default(), object("piw", false));
        let ctx = fx.ctx(RunDirection::Reverse);
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 4);
        let tail = *p.time_update(HOUR, &ctx);
        assert!((tail.position.lng + 5.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_anchoring_fails_in_deep_water() {
        let mut obj = object("skiff", false);
        obj.anchoring = Some(AnchoringConfig {
            probability: 1.0,
            max_depth_m: 5.0,
        });
        let fx = Fixture::new(1.0, 0.0, ShorelineMap::default(), obj);
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 5);
        p.settle(&ctx);
        assert!(!p.root().anchored);
        assert!(p.runtime().anchoring().is_none());
    }

    #[test]
    fn test_distress_on_land_is_stuck() {
        let fx = Fixture::new(1.0, 0.0, island(), object("piw", false));
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.5), 0, 6);
        p.settle(&ctx);
        assert_eq!(p.root().drift_state(), DriftState::StuckOnLand);
        assert_eq!(p.runtime().landing(), Some(0));

        let tail = *p.time_update(HOUR, &ctx);
        assert_eq!(tail.position, LatLng::new(0.0, 0.5));
    }

    /// Small lake on a large island: every long run from inside fails.
    fn lake() -> ShorelineMap {
        ShorelineMap::new(vec![
            square(-1.0, -1.0, 1.0, 1.0),
            square(-0.01, -0.01, 0.01, 0.01),
        ])
    }

    #[test]
    fn test_slippery_hold_freezes_then_grows() {
        let fx = Fixture::new(0.0, 50.0, lake(), object("piw", false));
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 7);

        let grounded = *p.time_update(HOUR, &ctx);
        assert_eq!(grounded.drift_state(), DriftState::StuckOnLand);
        assert_eq!(grounded.svt, StateVectorType::Landed);
        assert_eq!(p.runtime().penalty().full, 2);
        assert_eq!(p.runtime().penalty().remaining, 2);
        assert_eq!(p.runtime().landing(), Some(HOUR));
        assert_eq!(p.runtime.take_unreported_landing(), Some(HOUR));
        assert_eq!(p.runtime.take_unreported_landing(), None);

        let held = *p.time_update(2 * HOUR, &ctx);
        assert_eq!(held.position, grounded.position);
        assert!(held.stuck_on_land);
        assert_eq!(p.runtime().penalty().remaining, 1);

        // Released, tries again and grounds again.
        let again = *p.time_update(3 * HOUR, &ctx);
        assert!(again.stuck_on_land);
        assert_eq!(p.runtime().penalty().full, 5);
        assert_eq!(p.runtime().penalty().remaining, 5);
        assert_eq!(p.runtime().landing(), Some(3 * HOUR));
        assert_eq!(p.runtime.take_unreported_landing(), Some(3 * HOUR));
    }

    /// Current that stops at a reference time.
    struct SlackingField {
        sample: FieldSample,
        until: RefSecs,
    }

    impl EnvironmentProvider for SlackingField {
        fn get_vector(&self, time: RefSecs, _: LatLng, _: InterpolationMode) -> Option<FieldSample> {
            if time < self.until {
                Some(self.sample)
            } else {
                Some(FieldSample::default())
            }
        }

        fn half_life_seconds(&self) -> f64 {
            0.0
        }

        fn is_empty(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_released_hold_clears_grounding() {
        let fx = Fixture::new(0.0, 0.0, lake(), object("piw", false));
        let currents = SlackingField {
            sample: FieldSample {
                v: 50.0,
                ..Default::default()
            },
            until: 1_000_000 + HOUR,
        };
        let ctx = DriftContext {
            currents: &currents,
            ..fx.ctx(RunDirection::Forward)
        };
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 17);

        let grounded = *p.time_update(HOUR, &ctx);
        assert_eq!(grounded.drift_state(), DriftState::StuckOnLand);
        assert_eq!(*p.time_update(2 * HOUR, &ctx), grounded.frozen_at(2 * HOUR));

        // Hold over and the water is calm: afloat again where it grounded.
        let afloat = *p.time_update(3 * HOUR, &ctx);
        assert_eq!(afloat.drift_state(), DriftState::AdriftMoving);
        assert_eq!(afloat.svt, StateVectorType::Distress);
        assert_eq!(afloat.position, grounded.position);
        assert!(!p.runtime().penalty().is_held());
        assert_eq!(p.runtime().landing(), Some(HOUR));
    }

    #[test]
    fn test_catch_up_is_idempotent() {
        let fx = Fixture::new(1.0, 1.0, ShorelineMap::default(), object("piw", false));
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 8);

        let first = *p.time_update(HOUR, &ctx);
        let len = p.chain().len();
        assert_eq!(*p.time_update(HOUR, &ctx), first);
        assert_eq!(*p.time_update(HOUR / 2, &ctx), first);
        assert_eq!(p.chain().len(), len);
    }

    #[test]
    fn test_step_crossing_distress_appends_two_nodes() {
        let fx = Fixture::new(5.0, 0.0, ShorelineMap::default(), object("piw", false));
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.0), HOUR / 2, 9);
        assert_eq!(p.root().drift_state(), DriftState::Underway);

        p.time_update(HOUR, &ctx);
        let times: Vec<_> = p.chain().iter().map(|n| n.time).collect();
        assert_eq!(times, vec![0, HOUR / 2, HOUR]);
        assert_eq!(p.chain()[1].svt, StateVectorType::Distress);
        assert_eq!(p.chain()[1].position, LatLng::new(0.0, 0.0));
        assert!((p.tail().position.lng - 2.5 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_underway_follows_itinerary() {
        let fx = Fixture::new(0.0, 0.0, ShorelineMap::default(), object("piw", false));
        let route = WaypointItinerary::new(LatLng::new(0.0, 0.0), &[LatLng::new(1.0, 0.0)], 6.0);
        let ctx = DriftContext {
            itinerary: Some(&route),
            ..fx.ctx(RunDirection::Forward)
        };
        let mut p = particle(LatLng::new(0.0, 0.0), 3 * HOUR, 10);

        let tail = *p.time_update(HOUR, &ctx);
        assert_eq!(tail.drift_state(), DriftState::Underway);
        assert!((tail.position.lat - 0.1).abs() < 1e-9);

        // Distress after 2 more hours: 18 nmi along the route, then calm drift.
        let tail = *p.time_update(4 * HOUR, &ctx);
        assert_eq!(p.chain()[2].time, 3 * HOUR);
        assert!((p.chain()[2].position.lat - 0.3).abs() < 1e-9);
        assert!((tail.position.lat - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_river_current_is_rotated() {
        let fx = Fixture::new(2.0, 0.0, ShorelineMap::default(), object("piw", false));
        let ctx = DriftContext {
            river_heading: Some(std::f64::consts::PI),
            ..fx.ctx(RunDirection::Forward)
        };
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 11);
        let tail = *p.time_update(HOUR, &ctx);
        // Along-stream on a south-flowing river moves south.
        assert!((tail.position.lat + 2.0 / 60.0).abs() < 1e-9);
        assert!(tail.position.lng.abs() < 1e-9);
    }

    #[test]
    fn test_mean_particle_draws_nothing() {
        let fx = Fixture {
            currents: UniformField::new(
                FieldSample {
                    u: 5.0,
                    v: 0.0,
                    du: 3.0,
                    dv: 3.0,
                },
                3600.0,
            ),
            ..Fixture::new(0.0, 0.0, ShorelineMap::default(), object("piw", false))
        };
        let ctx = fx.ctx(RunDirection::Forward);
        let index = ParticleIndexes::new(1, 1, 1).mean(0, 0).unwrap();
        let mut p = Particle::mean(
            ParticleInit {
                index,
                object_type: 0,
                start: LatLng::new(0.0, 0.0),
                birth: 0,
                distress: 0,
                expiration: None,
                init_prior: 0.0,
            },
            LeewayResponse::mean(LeewayParams::default()),
        );
        assert!(!p.is_random());
        let tail = *p.time_update(HOUR, &ctx);
        assert!((tail.position.lng - 5.0 / 60.0).abs() < 1e-9);
        assert_eq!(p.state_type_at(&tail), StateVectorType::EnvironmentalMean);
    }

    #[test]
    fn test_noise_is_recorded_for_random_particles() {
        let fx = Fixture {
            currents: UniformField::new(
                FieldSample {
                    u: 1.0,
                    v: 0.0,
                    du: 0.5,
                    dv: 0.5,
                },
                7200.0,
            ),
            ..Fixture::new(0.0, 0.0, ShorelineMap::default(), object("piw", false))
        };
        let ctx = fx.ctx(RunDirection::Forward);
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 12);
        let tail = *p.time_update(HOUR, &ctx);
        let noise = tail.noise().unwrap();
        assert!(noise.sea_east.is_some() && noise.wind_north.is_some());
    }

    // ---- Runtime ----

    #[test]
    fn test_penalty_growth_sequence() {
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 13);
        let mut seen = vec![p.runtime().penalty().full];
        for _ in 0..4 {
            p.runtime.apply_penalty();
            seen.push(p.runtime().penalty().full);
        }
        assert_eq!(seen, vec![0, 2, 5, 9, 15]);

        p.runtime.clear_penalty();
        assert_eq!(p.runtime().penalty().full, 0);
        assert!(!p.runtime().penalty().is_held());
    }

    #[test]
    fn test_penalty_release() {
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 14);
        p.runtime.apply_penalty();
        assert!(!p.runtime.tick_penalty());
        assert!(p.runtime.tick_penalty());
        assert!(!p.runtime.tick_penalty());

        p.runtime.hold_penalty();
        assert!(!p.runtime.tick_penalty());
        assert_eq!(p.runtime().penalty().remaining, INFINITE_PENALTY);
    }

    #[test]
    fn test_expired_reporting() {
        let index = ParticleIndexes::new(1, 1, 1).core(0, 0).unwrap();
        let p = Particle::random(
            ParticleInit {
                index,
                object_type: 0,
                start: LatLng::new(0.0, 0.0),
                birth: 0,
                distress: 0,
                expiration: Some(HOUR),
                init_prior: 1.0,
            },
            particle_stream(15),
            LeewayResponse::mean(LeewayParams::default()),
        );
        let mut node = *p.root();
        assert_eq!(p.state_type_at(&node), StateVectorType::Distress);
        node.time = HOUR;
        assert_eq!(p.state_type_at(&node), StateVectorType::Expired);
    }

    #[test]
    fn test_pod_cache() {
        let mut p = particle(LatLng::new(0.0, 0.0), 0, 16);
        assert_eq!(p.pod(0, 0), None);
        p.record_pod(1, 2, 0.4);
        p.record_pod(1, 2, 0.6);
        assert_eq!(p.pod(1, 2), Some(0.6));
        p.clear_pods();
        assert_eq!(p.pod(1, 2), None);
    }

    // ---- Tracker ----

    fn scenario(name: &str, types: &[&str]) -> ScenarioConfig {
        ScenarioConfig {
            name: name.into(),
            weight: 2.0,
            start: LatLng::new(41.0, -70.0),
            start_radius_nmi: 0.5,
            distress_start_secs: 0,
            distress_end_secs: 2 * HOUR,
            birth_offset_secs: 0,
            itinerary: None,
            river_heading_deg: None,
            requires_currents: true,
            requires_winds: true,
            object_types: types.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn run_config() -> RunConfig {
        let mut piw = object("piw", false);
        piw.survival_hours = Some(2.0);
        piw.leeway = LeewayParams {
            downwind_slope: 0.02,
            downwind_intercept: 0.05,
            downwind_sd: 0.03,
            crosswind_slope: 0.01,
            crosswind_intercept: 0.0,
            crosswind_sd: 0.02,
        };
        RunConfig {
            seed: 99,
            start_time: 1_000_000,
            step_secs: HOUR,
            steps: 6,
            particles_per_scenario: 20,
            min_particles_per_slice: 4,
            object_types: vec![piw, object("raft", true), object("unused", false)],
            scenarios: vec![scenario("lkp", &["piw", "raft"]), scenario("second", &["raft"])],
            currents: FieldConfig::Uniform {
                u: 0.5,
                v: 0.2,
                du: 0.1,
                dv: 0.1,
                half_life_hours: 3.0,
            },
            winds: FieldConfig::Uniform {
                u: 0.0,
                v: 12.0,
                du: 2.0,
                dv: 2.0,
                half_life_hours: 6.0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_population_layout() {
        let config = run_config();
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(0).unwrap();
        let tracker = Tracker::new(config.clone(), &archive, &pool).unwrap();

        let sets = tracker.sets();
        assert_eq!(sets.len(), 2);
        let lkp = &sets[0];
        assert_eq!(lkp.len(), 20);
        assert_eq!(lkp.particles()[0].object_type(), 0);
        assert_eq!(lkp.particles()[1].object_type(), 1);
        assert_eq!(lkp.particles()[2].object_type(), 0);
        assert!(lkp.means()[0].is_some());
        assert!(lkp.means()[1].is_some());
        assert!(lkp.means()[2].is_none());
        assert!(sets[1].means()[0].is_none());

        let clock = tracker.clock();
        for p in lkp.particles() {
            assert!((p.init_prior() - 0.1).abs() < 1e-12);
            let d = archive.distress_time(p.index()).unwrap();
            assert!((clock.to_reference(0)..=clock.to_reference(2 * HOUR)).contains(&d));
            assert_eq!(clock.to_reference(p.runtime().distress()), d);
            // Only the piw type has a survival model.
            assert_eq!(archive.expiration_time(p.index()).is_some(), p.object_type() == 0);
        }
    }

    #[test]
    fn test_run_publishes_tracks() {
        let config = run_config();
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(2).unwrap();
        let mut tracker = Tracker::new(config.clone(), &archive, &pool).unwrap();
        let summary = tracker.run().unwrap();

        assert_eq!(summary.steps_completed, config.steps + 1);
        assert!(!summary.cancelled);
        assert_eq!(summary.scenarios.len(), 2);
        assert_eq!(summary.scenarios[0].particles, 20);
        assert!(summary.scenarios[0].mean_positions[0].is_some());
        assert!(summary.scenarios[0].mean_positions[2].is_none());
        // Survival mean is two hours; after six hours most piw have expired.
        assert!(summary.scenarios[0].expired > 0);

        let indexes = ParticleIndexes::new(2, 20, 3);
        let last: RefSecs = *archive.times().last().unwrap();
        for index in indexes.all() {
            let used = index.particle().is_some()
                || matches!(
                    (index.scenario(), index.slot()),
                    (0, seadrift_core::ids::ParticleSlot::Mean(0 | 1))
                        | (1, seadrift_core::ids::ParticleSlot::Mean(1))
                );
            assert_eq!(archive.position(index, last).is_some(), used, "{index}");
        }
        // Particles are released at the end of the run.
        assert!(tracker.sets().iter().all(|s| s.is_empty()));
    }

    #[test]
    fn test_cancel_before_run() {
        let config = run_config();
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(0).unwrap();
        let mut tracker = Tracker::new(config, &archive, &pool).unwrap();
        tracker
            .cancel_handle()
            .store(true, Ordering::Relaxed);
        let summary = tracker.run().unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.steps_completed, 0);
    }

    #[test]
    fn test_missing_winds_rejected() {
        let mut config = run_config();
        config.winds = FieldConfig::None;
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(0).unwrap();
        let err = Tracker::new(config, &archive, &pool).err().unwrap();
        assert!(matches!(err, DriftError::MissingWinds { .. }));
    }

    #[test]
    fn test_empty_provider_rejected() {
        let config = run_config();
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(0).unwrap();
        let mut world = World::from_config(&config).unwrap();
        world.currents = Box::new(EmptyField);
        let err = Tracker::with_world(config, world, &archive, &pool).err().unwrap();
        assert!(matches!(err, DriftError::MissingCurrents { .. }));
    }

    #[test]
    fn test_mean_particle_landing_is_published() {
        let mut config = run_config();
        config.steps = 1;
        config.particles_per_scenario = 4;
        config.scenarios = vec![ScenarioConfig {
            start: LatLng::new(0.0, 0.0),
            start_radius_nmi: 0.0,
            distress_end_secs: 0,
            ..scenario("lkp", &["raft"])
        }];
        config.currents = FieldConfig::Uniform {
            u: 5.0,
            v: 0.0,
            du: 0.0,
            dv: 0.0,
            half_life_hours: 0.0,
        };
        config.shoreline = vec![square(-0.5, 2.0 / 60.0, 0.5, 1.0)];
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(1).unwrap();
        let mut tracker = Tracker::new(config.clone(), &archive, &pool).unwrap();
        let summary = tracker.run().unwrap();

        let indexes = ParticleIndexes::new(1, 4, 3);
        let mean = indexes.mean(0, 1).unwrap();
        assert_eq!(archive.landing_time(mean), Some(config.start_time + HOUR));
        assert_eq!(archive.state_type(mean, config.start_time + HOUR), Some(StateVectorType::EnvironmentalMean));
        // Summary counts core particles only.
        assert_eq!(summary.scenarios[0].landed, 4);
    }

    /// Current field that panics once simulated time passes a threshold.
    struct FaultyField {
        fail_after: RefSecs,
    }

    impl EnvironmentProvider for FaultyField {
        fn get_vector(&self, time: RefSecs, _: LatLng, _: InterpolationMode) -> Option<FieldSample> {
            assert!(time < self.fail_after, "current data corrupt");
            Some(FieldSample::default())
        }

        fn half_life_seconds(&self) -> f64 {
            0.0
        }

        fn is_empty(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_slice_failure_aborts_run() {
        let config = run_config();
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(2).unwrap();
        let mut world = World::from_config(&config).unwrap();
        world.currents = Box::new(FaultyField {
            fail_after: config.start_time + 2 * HOUR,
        });
        let mut tracker = Tracker::with_world(config, world, &archive, &pool).unwrap();
        let err = tracker.run().err().unwrap();
        match err {
            DriftError::SliceFailed { scenario, message, .. } => {
                assert_eq!(scenario, 0);
                assert!(message.contains("current data corrupt"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        // Leases went back to the pool.
        assert_eq!(pool.idle(), 2);
    }

    /// Batching provider that counts prepare calls.
    struct CountingField {
        inner: UniformField,
        prepared: Arc<AtomicUsize>,
        batches: Arc<AtomicUsize>,
    }

    impl EnvironmentProvider for CountingField {
        fn get_vector(&self, time: RefSecs, p: LatLng, mode: InterpolationMode) -> Option<FieldSample> {
            self.inner.get_vector(time, p, mode)
        }

        fn half_life_seconds(&self) -> f64 {
            self.inner.half_life_seconds()
        }

        fn is_empty(&self) -> bool {
            false
        }

        fn has_auxiliary_processing(&self) -> bool {
            true
        }

        fn incremental_prepare(&self, _: RefSecs, _: LatLng, _: f64) {
            self.prepared.fetch_add(1, Ordering::SeqCst);
        }

        fn finish_prepare(&self) {
            self.batches.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_prefetch_pass_runs_every_step() {
        let mut config = run_config();
        config.scenarios.truncate(1);
        config.scenarios[0].start_radius_nmi = 0.0;
        config.scenarios[0].distress_end_secs = 0;
        let archive = MemoryArchive::for_run(&config);
        let pool = WorkerPool::new(0).unwrap();

        let prepared = Arc::new(AtomicUsize::new(0));
        let batches = Arc::new(AtomicUsize::new(0));
        let mut world = World::from_config(&config).unwrap();
        world.currents = Box::new(CountingField {
            inner: UniformField::calm(0.0, 0.0),
            prepared: Arc::clone(&prepared),
            batches: Arc::clone(&batches),
        });

        let mut tracker = Tracker::with_world(config.clone(), world, &archive, &pool).unwrap();
        tracker.run().unwrap();

        assert_eq!(batches.load(Ordering::SeqCst), config.steps + 1);
        // At least one point per step, however many particles share it.
        assert!(prepared.load(Ordering::SeqCst) >= config.steps + 1);
    }
}
