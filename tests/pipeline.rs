use undula::{
    Animator, AnimatorConfig, Eldritch, EldritchParams, FocusDirector, FocusParams,
    InfluenceField, LoopSpec, Motion, Point, Psychedelic, PsychedelicParams, SolverParams,
    TimeDomain, Vegetal, VegetalParams, decode_anchors, parse,
};

const LEAF: &str = "M0,0 C30,50 70,50 100,0 C130,-50 170,-50 200,0 L200,60 C150,90 50,90 0,60 Z";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn leaf_animator(motion: Motion, config: AnimatorConfig, anchors_json: &str) -> Animator {
    init_tracing();
    let path = parse(LEAF, (0.0, 0.0)).unwrap();
    let shapes = decode_anchors(anchors_json).unwrap();
    let influence = InfluenceField::compute(path.points(), &shapes, 40.0).unwrap();
    Animator::new(path, influence, motion, config).unwrap()
}

fn every_motion(seed: u64, domain: TimeDomain) -> Vec<(&'static str, Motion)> {
    let path = parse(LEAF, (0.0, 0.0)).unwrap();
    let influence = InfluenceField::free(path.len());
    vec![
        (
            "psychedelic",
            Motion::Psychedelic(Psychedelic::new(seed, domain, PsychedelicParams::default())),
        ),
        (
            "eldritch",
            Motion::Eldritch(Eldritch::new(seed, domain, EldritchParams::default())),
        ),
        (
            "vegetal",
            Motion::Vegetal(Vegetal::new(seed, domain, VegetalParams::default())),
        ),
        (
            "focus",
            Motion::Focus(FocusDirector::generate(
                seed,
                FocusParams::default(),
                &path,
                &influence,
                Some(8.0),
            )),
        ),
    ]
}

#[test]
fn pinned_points_stay_fixed_across_every_style_and_time() {
    let anchors = r#"[
        {"kind":"line","groupId":1,"x":0,"y":60,"position":"start"},
        {"kind":"line","groupId":1,"x":0,"y":0,"position":"end"}
    ]"#;
    for (name, motion) in every_motion(3, TimeDomain::Linear) {
        let mut animator = leaf_animator(motion, AnimatorConfig::default(), anchors);
        let path = parse(LEAF, (0.0, 0.0)).unwrap();
        let shapes = decode_anchors(anchors).unwrap();
        let influence = InfluenceField::compute(path.points(), &shapes, 40.0).unwrap();
        for t in [0.0, 0.5, 3.25, 42.0] {
            let out = animator.render_at_time(t).to_vec();
            for (i, (&got, &base)) in out.iter().zip(path.points()).enumerate() {
                if influence.get(i) == 0.0 {
                    assert_eq!(got, base, "style {name}: pinned point {i} moved at t={t}");
                }
            }
        }
    }
}

#[test]
fn loop_boundary_is_seamless_for_every_style() {
    let period = 6.0;
    let domain = TimeDomain::Looped(LoopSpec::new(period).unwrap());
    for (name, motion) in every_motion(17, domain) {
        let config = AnimatorConfig {
            loop_period: Some(period),
            ..AnimatorConfig::default()
        };
        let mut animator = leaf_animator(motion, config, "[]");
        let at_zero: Vec<Point> = animator.render_at_time(0.0).to_vec();
        let at_period: Vec<Point> = animator.render_at_time(period).to_vec();
        assert_eq!(at_zero, at_period, "style {name} is not loop-seamless");
    }
}

#[test]
fn export_frames_are_reproducible() {
    let config = AnimatorConfig {
        loop_period: Some(4.0),
        solver: Some(SolverParams::default()),
        ..AnimatorConfig::default()
    };
    let path = parse(LEAF, (0.0, 0.0)).unwrap();
    let influence = InfluenceField::free(path.len());
    let motion = Motion::Psychedelic(Psychedelic::new(
        23,
        TimeDomain::Looped(LoopSpec::new(4.0).unwrap()),
        PsychedelicParams::default(),
    ));
    let mut animator = Animator::new(path, influence, motion, config).unwrap();

    // Capture 16 evenly-spaced frames twice, as an exporter would.
    let frames = |a: &mut Animator| -> Vec<Vec<Point>> {
        (0..16)
            .map(|i| a.render_at_time(i as f64 * 4.0 / 16.0).to_vec())
            .collect()
    };
    let first = frames(&mut animator);
    let second = frames(&mut animator);
    assert_eq!(first, second);
}

#[test]
fn output_buffer_is_index_aligned_with_the_parse() {
    let mut animator = leaf_animator(
        every_motion(9, TimeDomain::Linear).remove(0).1,
        AnimatorConfig::default(),
        "[]",
    );
    let path = parse(LEAF, (0.0, 0.0)).unwrap();
    let out = animator.render_at_time(1.0);
    assert_eq!(out.len(), path.len());
    let consumed: usize = path.commands().iter().map(|c| c.arity()).sum();
    assert_eq!(consumed, out.len());
}

#[test]
fn live_ticks_and_deterministic_renders_share_the_contract() {
    let mut animator = leaf_animator(
        every_motion(31, TimeDomain::Linear).remove(2).1,
        AnimatorConfig::default(),
        "[]",
    );
    animator.start();
    animator.tick(0.0);
    let live = animator.tick(1.0 / 60.0).to_vec();
    let t = animator.time();
    let explicit = animator.render_at_time(t).to_vec();
    assert_eq!(live, explicit);
}

#[test]
fn global_intensity_scales_displacement() {
    let path = parse(LEAF, (0.0, 0.0)).unwrap();
    let base = path.points().to_vec();
    let quiet = AnimatorConfig {
        global_intensity: 0.0,
        ..AnimatorConfig::default()
    };
    let mut animator = leaf_animator(
        every_motion(5, TimeDomain::Linear).remove(0).1,
        quiet,
        "[]",
    );
    let out = animator.render_at_time(2.0);
    assert_eq!(out, &base[..]);
}
