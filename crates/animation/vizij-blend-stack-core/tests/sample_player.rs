use std::sync::Arc;

use approx::assert_abs_diff_eq;
use vizij_blend_stack_core::{
    AttributeValue, BlendOption, BlendProfile, BlendProfileMode, BlendRequest, BlendSample,
    BlendSpace2d, BoneContainer, BoneTransform, Clip, EvalContext, MirrorAxis, MirrorTable,
    PoseContext, SamplePlayer, Skeleton,
};

const EPS: f32 = 1e-4;

fn skeleton(name: &str) -> Arc<Skeleton> {
    Arc::new(vizij_test_fixtures::skeletons::load(name).expect("skeleton fixture"))
}

fn clip(name: &str) -> Arc<Clip> {
    Arc::new(vizij_test_fixtures::clips::load(name).expect("clip fixture"))
}

#[test]
fn blend_in_percentage_is_monotonic_and_saturates() {
    let skel = skeleton("biped");
    let mut s = SamplePlayer::new();
    let req = BlendRequest::new(clip("walk"))
        .with_blend_time(0.5)
        .with_option(BlendOption::ExpInOut);
    s.initialize(&req, 0.5, &skel, EPS).unwrap();

    let (mut prev_p, mut prev_w) = (0.0, 0.0);
    for _ in 0..40 {
        s.update_with_delta_time(1.0 / 60.0, 0, 1.0);
        let (p, w) = (s.blend_in_percentage(), s.blend_in_weight());
        assert!(p >= prev_p && w + 1e-6 >= prev_w);
        prev_p = p;
        prev_w = w;
    }
    assert_eq!(s.blend_in_percentage(), 1.0);
    assert_abs_diff_eq!(s.blend_in_weight(), 1.0, epsilon = 1e-6);
}

#[test]
fn activation_gate_credits_only_the_overshoot() {
    let skel = skeleton("biped");
    let mut s = SamplePlayer::new();
    let req = BlendRequest::new(clip("walk"))
        .with_blend_time(1.0)
        .with_activation_delay(0.5);
    s.initialize(&req, 1.0, &skel, EPS).unwrap();

    s.update_with_delta_time(0.3, 0, 1.0);
    assert!(!s.is_active());
    assert_eq!(s.blend_in_percentage(), 0.0);

    s.update_with_delta_time(0.3, 0, 1.0);
    assert!(s.is_active());
    assert_abs_diff_eq!(s.current_blend_in_time(), 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(s.accumulated_time(), 0.1, epsilon = 1e-6);
}

#[test]
fn zero_blend_time_waits_for_activation() {
    let skel = skeleton("biped");
    let mut s = SamplePlayer::new();
    let req = BlendRequest::new(clip("walk")).with_activation_delay(0.2);
    s.initialize(&req, 0.0, &skel, EPS).unwrap();
    assert_eq!(s.blend_in_percentage(), 0.0);
    s.update_with_delta_time(0.25, 0, 1.0);
    assert_eq!(s.blend_in_percentage(), 1.0);
}

#[test]
fn per_bone_weights_follow_profile() {
    let skel = skeleton("chain3");
    let profile = Arc::new(BlendProfile::from_names(
        "root_fast",
        BlendProfileMode::TimeFactor,
        &skel,
        &[("root", 0.1), ("mid", 1.0)],
    ));
    let req = BlendRequest::new(Arc::new(Clip::empty("c", 2.0)))
        .with_blend_time(1.0)
        .with_profile(profile)
        .with_option(BlendOption::CircularIn);
    let mut s = SamplePlayer::new();
    s.initialize(&req, 1.0, &skel, EPS).unwrap();
    s.update_with_delta_time(0.5, 0, 1.0);

    let expected = BlendOption::CircularIn.alpha(0.5);
    let mut weights = Vec::new();
    assert!(s.blend_in_weights_skeleton(&mut weights));
    assert_eq!(weights.len(), 3);
    assert_abs_diff_eq!(weights[0], 1.0);
    assert_abs_diff_eq!(weights[1], expected, epsilon = 1e-6);
    assert_abs_diff_eq!(weights[2], expected, epsilon = 1e-6);

    // Compact layout without the tip bone.
    let lod = BoneContainer::with_required_bones(&skel, &[1]);
    assert!(s.blend_in_weights_compact(&lod, &mut weights));
    assert_eq!(weights.len(), 2);
    assert_abs_diff_eq!(weights[0], 1.0);
    assert_abs_diff_eq!(weights[1], expected, epsilon = 1e-6);
}

#[test]
fn snapshot_round_trip_is_exact() {
    let skel = skeleton("biped");
    let ctx = EvalContext::full(skel.clone());
    let mut s = SamplePlayer::new();
    s.initialize(&BlendRequest::new(clip("walk")), 0.0, &skel, EPS)
        .unwrap();
    s.update_with_delta_time(0.37, 0, 1.0);

    let mut captured = PoseContext::new();
    s.evaluate(&ctx, &mut captured);
    captured
        .attributes
        .set("foot_phase", AttributeValue::Float(0.25));
    captured
        .attributes
        .set("state", AttributeValue::Text("walk".into()));

    s.store_pose_context(&ctx, &captured);
    assert!(s.has_stored_pose());
    assert!(!s.has_payload());

    let mut restored = PoseContext::new();
    s.evaluate(&ctx, &mut restored);
    assert_eq!(restored, captured);
}

#[test]
fn snapshot_remaps_when_lod_changes() {
    let skel = skeleton("biped");
    let hand_l = skel.bone_index("hand_l").unwrap();
    let lod = EvalContext::new(
        skel.clone(),
        Arc::new(BoneContainer::with_required_bones(&skel, &[hand_l])),
    );
    assert_eq!(lod.bones.num_bones(), 3);

    let mut captured = PoseContext::new();
    captured.reset_to_ref_pose(&lod);
    captured.pose.bones[2] = BoneTransform::from_translation([9.0, 9.0, 9.0]);
    let mut s = SamplePlayer::new();
    s.store_pose_context(&lod, &captured);

    let full = EvalContext::full(skel.clone());
    let mut out = PoseContext::new();
    s.restore_pose_context(&full, &mut out);
    assert_eq!(out.pose.len(), skel.num_bones());
    assert_eq!(out.pose.bones[hand_l].translation, [9.0, 9.0, 9.0]);
    let head = skel.bone_index("head").unwrap();
    assert_eq!(out.pose.bones[head], skel.ref_pose(head));
}

#[test]
fn empty_sample_restores_reference_pose() {
    let skel = skeleton("biped");
    let ctx = EvalContext::full(skel.clone());
    let s = SamplePlayer::new();
    let mut out = PoseContext::new();
    s.evaluate(&ctx, &mut out);
    assert_eq!(out.pose.bones[0].translation, [0.0, 1.0, 0.0]);
}

#[test]
fn mirrored_sample_swaps_sides() {
    let skel = skeleton("biped");
    let ctx = EvalContext::full(skel.clone());
    let table = Arc::new(
        MirrorTable::from_suffixes(&skel, "_l", "_r", MirrorAxis::X)
            .with_curve_pair("blink_l", "blink_r"),
    );
    let req = BlendRequest::new(clip("wave_left")).with_mirror(Some(table));
    let mut s = SamplePlayer::new();
    s.initialize(&req, 0.0, &skel, EPS).unwrap();

    let mut out = PoseContext::new();
    s.evaluate(&ctx, &mut out);
    let hand_l = skel.bone_index("hand_l").unwrap();
    let hand_r = skel.bone_index("hand_r").unwrap();
    assert_abs_diff_eq!(out.pose.bones[hand_r].translation[0], -0.6, epsilon = 1e-6);
    assert_abs_diff_eq!(out.pose.bones[hand_r].rotation[2], -0.3826834, epsilon = 1e-6);
    assert_abs_diff_eq!(out.pose.bones[hand_l].translation[0], 0.5, epsilon = 1e-6);
    assert_eq!(out.curves.get("blink_r"), Some(1.0));
    assert_eq!(out.curves.get("blink_l"), None);
}

#[test]
fn curve_overrides_win_over_asset_curves() {
    let skel = skeleton("biped");
    let ctx = EvalContext::full(skel.clone());
    let mut s = SamplePlayer::new();
    s.initialize(&BlendRequest::new(clip("walk")), 0.0, &skel, EPS)
        .unwrap();
    s.set_curve_override("speed", 9.0);
    s.set_curve_override("extra", 1.0);
    let mut out = PoseContext::new();
    s.evaluate(&ctx, &mut out);
    assert_eq!(out.curves.get("speed"), Some(9.0));
    assert_eq!(out.curves.get("extra"), Some(1.0));
}

#[test]
fn blend_space_time_is_normalised() {
    let skel = skeleton("biped");
    let space = Arc::new(BlendSpace2d::new(
        "locomotion",
        vec![
            BlendSample {
                position: [0.0, 0.0],
                clip: clip("walk"),
            },
            BlendSample {
                position: [1.0, 0.0],
                clip: clip("run"),
            },
        ],
    ));
    let req = BlendRequest::new(space)
        .with_start_time(1.5)
        .with_parameters([1.0, 0.0])
        .with_looping(true);
    let mut s = SamplePlayer::new();
    s.initialize(&req, 0.0, &skel, EPS).unwrap();
    assert!(s.is_blend_space());
    assert_eq!(s.accumulated_time(), 1.0);
    assert_eq!(s.blend_parameters(), [1.0, 0.0]);

    // Run is 0.6s long; 0.3s is half a cycle.
    s.update_with_delta_time(0.3, 0, 1.0);
    assert_abs_diff_eq!(s.accumulated_time(), 0.5, epsilon = 1e-5);
}

#[test]
fn unsupported_asset_degrades_to_reference_pose() {
    let skel = skeleton("biped");
    let ctx = EvalContext::full(skel.clone());
    let montage = Arc::new(Clip {
        montage: true,
        ..Clip::empty("attack", 1.0)
    });
    let mut s = SamplePlayer::new();
    assert!(s
        .initialize(&BlendRequest::new(montage), 0.0, &skel, EPS)
        .is_err());
    assert_eq!(s.asset().map(|a| a.name()), Some("attack"));
    let mut out = PoseContext::new();
    s.evaluate(&ctx, &mut out);
    assert_eq!(out.pose.bones[0], skel.ref_pose(0));
}
