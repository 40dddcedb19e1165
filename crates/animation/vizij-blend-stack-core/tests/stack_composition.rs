use std::sync::Arc;

use approx::assert_abs_diff_eq;
use vizij_blend_stack_core::{
    BlendOption, BlendProfile, BlendProfileMode, BlendRequest, BlendStack, BlendStackConfig,
    BoneTransform, Clip, EvalContext, InsertOutcome, PoseContext, SequenceAsset, Skeleton,
};

fn biped() -> Arc<Skeleton> {
    Arc::new(vizij_test_fixtures::skeletons::load("biped").expect("biped skeleton"))
}

fn clip(name: &str) -> Arc<Clip> {
    Arc::new(vizij_test_fixtures::clips::load(name).expect("clip fixture"))
}

/// Clip holding the pelvis at `x` along X.
fn pelvis_at(name: &str, x: f32) -> Arc<Clip> {
    Arc::new(Clip::constant(
        name,
        1.0,
        &[("pelvis", BoneTransform::from_translation([x, 0.0, 0.0]))],
    ))
}

fn pelvis_x(out: &PoseContext) -> f32 {
    out.pose.bones[0].translation[0]
}

#[test]
fn empty_stack_yields_reference_pose() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let mut stack = BlendStack::default();
    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    assert_eq!(out.pose.len(), skel.num_bones());
    assert_eq!(out.pose.bones[0], skel.ref_pose(0));
}

#[test]
fn first_insert_plays_asset_directly() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let walk = clip("walk");
    let mut stack = BlendStack::new(BlendStackConfig {
        max_active_blends: 4,
        ..BlendStackConfig::default()
    });
    let req = BlendRequest::new(walk.clone()).with_blend_time(0.2);
    assert_eq!(stack.insert(&req, &skel), InsertOutcome::Pushed);
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.sample(0).unwrap().blend_in_percentage(), 1.0);

    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    let mut expected = PoseContext::new();
    walk.sample(0.0, &ctx, &mut expected);
    assert_eq!(out, expected);
}

#[test]
fn second_insert_blends_over_first() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let mut stack = BlendStack::default();
    stack.insert(&BlendRequest::new(pelvis_at("a", 0.0)).with_blend_time(0.5), &skel);
    stack.update(0.25);

    let outcome = stack.insert(&BlendRequest::new(pelvis_at("b", 2.0)).with_blend_time(0.5), &skel);
    assert_eq!(outcome, InsertOutcome::Pushed);
    assert_eq!(stack.len(), 2);

    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    assert_abs_diff_eq!(pelvis_x(&out), 0.0);

    stack.update(0.25);
    stack.evaluate(&ctx, &mut out);
    assert_abs_diff_eq!(pelvis_x(&out), 1.0, epsilon = 1e-6);
    assert_eq!(stack.current_asset().unwrap().name(), "b");
}

#[test]
fn weights_are_a_convex_combination() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let mut stack = BlendStack::default();
    stack.insert(&BlendRequest::new(pelvis_at("a", 0.0)), &skel);
    stack.update(0.3);
    stack.insert(&BlendRequest::new(pelvis_at("b", 1.0)).with_blend_time(1.0), &skel);
    stack.update(0.3);
    stack.insert(&BlendRequest::new(pelvis_at("c", 4.0)).with_blend_time(1.0), &skel);
    stack.update(0.3);
    assert_eq!(stack.len(), 3);

    let weights = stack.sample_weights();
    assert_abs_diff_eq!(weights.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(weights[0], 0.3, epsilon = 1e-6);
    assert_abs_diff_eq!(weights[1], 0.42, epsilon = 1e-6);
    assert_abs_diff_eq!(weights[2], 0.28, epsilon = 1e-6);

    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    let expected: f32 = weights.iter().zip([4.0, 1.0, 0.0]).map(|(w, x)| w * x).sum();
    assert_abs_diff_eq!(pelvis_x(&out), expected, epsilon = 1e-5);
    assert!((0.0..=4.0).contains(&pelvis_x(&out)));
}

#[test]
fn delayed_top_sample_is_excluded() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let mut stack = BlendStack::default();
    stack.insert(&BlendRequest::new(pelvis_at("a", 0.0)), &skel);
    stack.insert(
        &BlendRequest::new(pelvis_at("b", 2.0)).with_activation_delay(0.5),
        &skel,
    );
    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    assert_abs_diff_eq!(pelvis_x(&out), 0.0);
    assert_eq!(stack.sample_weights()[0], 0.0);

    stack.update(0.6);
    stack.evaluate(&ctx, &mut out);
    assert_abs_diff_eq!(pelvis_x(&out), 2.0);
}

#[test]
fn delayed_sole_sample_falls_back_to_reference() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let mut stack = BlendStack::default();
    stack.insert(
        &BlendRequest::new(pelvis_at("a", 3.0)).with_activation_delay(0.2),
        &skel,
    );
    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    assert_eq!(out.pose.bones[0], skel.ref_pose(0));

    stack.update(0.25);
    stack.evaluate(&ctx, &mut out);
    assert_abs_diff_eq!(pelvis_x(&out), 3.0);
}

#[test]
fn per_bone_profile_blends_bones_at_different_rates() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let profile = Arc::new(BlendProfile::from_names(
        "lower_first",
        BlendProfileMode::TimeFactor,
        &skel,
        &[("pelvis", 0.25), ("spine", 1.0)],
    ));
    let spine = skel.bone_index("spine").unwrap();
    let foot_l = skel.bone_index("foot_l").unwrap();
    let from = Arc::new(Clip::constant(
        "from",
        1.0,
        &[
            ("spine", BoneTransform::from_translation([0.0, 0.0, 0.0])),
            ("foot_l", BoneTransform::from_translation([0.0, 0.0, 0.0])),
        ],
    ));
    let to = Arc::new(Clip::constant(
        "to",
        1.0,
        &[
            ("spine", BoneTransform::from_translation([1.0, 0.0, 0.0])),
            ("foot_l", BoneTransform::from_translation([1.0, 0.0, 0.0])),
        ],
    ));

    let mut stack = BlendStack::default();
    stack.insert(&BlendRequest::new(from), &skel);
    stack.insert(
        &BlendRequest::new(to)
            .with_blend_time(1.0)
            .with_profile(profile)
            .with_option(BlendOption::Linear),
        &skel,
    );
    stack.update(0.5);

    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    // foot_l inherits pelvis (0.25s, done); spine takes the full second.
    assert_abs_diff_eq!(out.pose.bones[foot_l].translation[0], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out.pose.bones[spine].translation[0], 0.5, epsilon = 1e-6);
}

#[test]
fn disabled_stack_plays_newest_only() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let mut stack = BlendStack::new(BlendStackConfig {
        enabled: false,
        ..BlendStackConfig::default()
    });
    stack.insert(&BlendRequest::new(pelvis_at("a", 0.0)), &skel);
    stack.insert(&BlendRequest::new(pelvis_at("b", 2.0)).with_blend_time(1.0), &skel);
    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    assert_abs_diff_eq!(pelvis_x(&out), 2.0);
}

#[test]
fn curves_blend_between_samples() {
    let skel = biped();
    let ctx = EvalContext::full(skel.clone());
    let mut stack = BlendStack::default();
    stack.insert(&BlendRequest::new(clip("walk")), &skel);
    stack.insert(&BlendRequest::new(clip("run")).with_blend_time(0.4), &skel);
    stack.update(0.1);
    let mut out = PoseContext::new();
    stack.evaluate(&ctx, &mut out);
    // speed: walk 1.5, run 4.0, run weight 0.25
    assert_abs_diff_eq!(out.curves.get("speed").unwrap(), 2.125, epsilon = 1e-5);
}
