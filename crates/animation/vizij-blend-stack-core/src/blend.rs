//! Pose blending: vector/quaternion helpers and full-pose blends.
//!
//! Rotations are accumulated along the shortest arc without renormalising each write;
//! every full-pose blend ends with one [`normalize_rotations`] pass.

use crate::pose::{AttributeSet, AttributeValue, BoneTransform, CurveSet, Pose, PoseContext};

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
    ]
}

#[inline]
pub fn dot4(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

/// Normalise a quaternion; degenerate input becomes identity.
#[inline]
pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let len2 = dot4(q, q);
    if len2 > 0.0 {
        let inv_len = len2.sqrt().recip();
        [q[0] * inv_len, q[1] * inv_len, q[2] * inv_len, q[3] * inv_len]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}

/// `a * (1 - t) + b * t` with `b` flipped onto `a`'s hemisphere. Not normalised.
#[inline]
pub fn accumulate_quat_shortest(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let sign = if dot4(a, b) < 0.0 { -1.0 } else { 1.0 };
    let wa = 1.0 - t;
    let wb = t * sign;
    [
        a[0] * wa + b[0] * wb,
        a[1] * wa + b[1] * wb,
        a[2] * wa + b[2] * wb,
        a[3] * wa + b[3] * wb,
    ]
}

/// Quaternion NLERP with shortest-arc correction. Returns a unit quaternion.
#[inline]
pub fn nlerp_quat(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    normalize_quat(accumulate_quat_shortest(a, b, t))
}

/// Blend `b` over `a` by `t`, leaving the rotation un-normalised.
#[inline]
pub fn blend_transform(a: &BoneTransform, b: &BoneTransform, t: f32) -> BoneTransform {
    BoneTransform {
        translation: lerp_vec3(a.translation, b.translation, t),
        rotation: accumulate_quat_shortest(a.rotation, b.rotation, t),
        scale: lerp_vec3(a.scale, b.scale, t),
    }
}

pub fn normalize_rotations(pose: &mut Pose) {
    for bone in &mut pose.bones {
        bone.rotation = normalize_quat(bone.rotation);
    }
}

/// Union lerp; a curve missing on one side counts as 0 there.
pub fn blend_curves(base: &mut CurveSet, top: &CurveSet, t: f32) {
    for (name, value) in base.iter_mut() {
        let other = top.get(name).unwrap_or(0.0);
        *value = lerp_f32(*value, other, t);
    }
    for (name, value) in top.iter() {
        if base.get(name).is_none() {
            base.set(name, value * t);
        }
    }
}

/// Floats lerp when both sides have them; everything else steps at `t >= 0.5`.
pub fn blend_attributes(base: &mut AttributeSet, top: &AttributeSet, t: f32) {
    let take_top = t >= 0.5;
    // Attributes only present in base vanish once the top side dominates.
    if take_top {
        base.retain(|name, _| top.get(name).is_some());
    }
    for (name, value) in top.iter() {
        if let Some(existing) = base.get_mut(name) {
            match (existing, value) {
                (AttributeValue::Float(a), AttributeValue::Float(b)) => {
                    *a = lerp_f32(*a, *b, t);
                }
                (existing, other) => {
                    if take_top {
                        *existing = other.clone();
                    }
                }
            }
        } else if take_top {
            base.set(name, value.clone());
        }
    }
}

/// Blend `top` over `base` with one scalar weight (`top` contributes `weight`).
pub fn blend_uniform(base: &mut PoseContext, top: &PoseContext, weight: f32) {
    if weight <= 0.0 {
        return;
    }
    if weight >= 1.0 {
        base.copy_from(top);
        return;
    }
    debug_assert_eq!(base.pose.len(), top.pose.len(), "pose bone counts differ");
    for (a, b) in base.pose.bones.iter_mut().zip(&top.pose.bones) {
        *a = blend_transform(a, b, weight);
    }
    normalize_rotations(&mut base.pose);
    blend_curves(&mut base.curves, &top.curves, weight);
    blend_attributes(&mut base.attributes, &top.attributes, weight);
}

/// Blend `top` over `base` with one weight per compact bone.
///
/// Full-weight bones take `top` outright, zero-weight bones keep `base`. Curves and
/// attributes are not bone-bound and blend by `curve_weight`.
pub fn blend_per_bone(
    base: &mut PoseContext,
    top: &PoseContext,
    bone_weights: &[f32],
    curve_weight: f32,
) {
    debug_assert_eq!(base.pose.len(), top.pose.len(), "pose bone counts differ");
    debug_assert_eq!(base.pose.len(), bone_weights.len(), "weight count differs");
    for ((a, b), &w) in base
        .pose
        .bones
        .iter_mut()
        .zip(&top.pose.bones)
        .zip(bone_weights)
    {
        if w >= 1.0 {
            *a = *b;
        } else if w > 0.0 {
            *a = blend_transform(a, b, w);
        }
    }
    normalize_rotations(&mut base.pose);
    if curve_weight >= 1.0 {
        base.curves.clone_from(&top.curves);
        base.attributes.clone_from(&top.attributes);
    } else if curve_weight > 0.0 {
        blend_curves(&mut base.curves, &top.curves, curve_weight);
        blend_attributes(&mut base.attributes, &top.attributes, curve_weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn nlerp_takes_shortest_arc() {
        let a = [0.0, 0.0, 0.0, 1.0];
        // Same rotation as identity, opposite hemisphere.
        let b = [0.0, 0.0, 0.0, -1.0];
        let q = nlerp_quat(a, b, 0.5);
        approx(q[3].abs(), 1.0, 1e-6);
    }

    #[test]
    fn uniform_blend_half() {
        let mut base = PoseContext::new();
        base.pose.bones = vec![BoneTransform::from_translation([0.0, 0.0, 0.0])];
        base.curves.set("c", 0.0);
        let mut top = PoseContext::new();
        top.pose.bones = vec![BoneTransform::from_translation([2.0, 0.0, 0.0])];
        top.curves.set("c", 1.0);
        blend_uniform(&mut base, &top, 0.5);
        approx(base.pose.bones[0].translation[0], 1.0, 1e-6);
        approx(base.curves.get("c").unwrap(), 0.5, 1e-6);
    }

    #[test]
    fn per_bone_respects_zero_and_full() {
        let mut base = PoseContext::new();
        base.pose.bones = vec![BoneTransform::IDENTITY; 3];
        let mut top = PoseContext::new();
        top.pose.bones = vec![BoneTransform::from_translation([4.0, 0.0, 0.0]); 3];
        blend_per_bone(&mut base, &top, &[0.0, 0.25, 1.0], 0.5);
        approx(base.pose.bones[0].translation[0], 0.0, 1e-6);
        approx(base.pose.bones[1].translation[0], 1.0, 1e-6);
        approx(base.pose.bones[2].translation[0], 4.0, 1e-6);
    }

    #[test]
    fn curves_missing_side_counts_as_zero() {
        let mut base = CurveSet::new();
        base.set("only_base", 1.0);
        let mut top = CurveSet::new();
        top.set("only_top", 1.0);
        blend_curves(&mut base, &top, 0.25);
        approx(base.get("only_base").unwrap(), 0.75, 1e-6);
        approx(base.get("only_top").unwrap(), 0.25, 1e-6);
    }

    #[test]
    fn attributes_step_and_lerp() {
        let mut base = AttributeSet::new();
        base.set("foot", AttributeValue::Float(0.0));
        base.set("state", AttributeValue::Text("idle".into()));
        let mut top = AttributeSet::new();
        top.set("foot", AttributeValue::Float(1.0));
        top.set("state", AttributeValue::Text("run".into()));
        blend_attributes(&mut base, &top, 0.25);
        assert_eq!(base.get("foot"), Some(&AttributeValue::Float(0.25)));
        assert_eq!(base.get("state"), Some(&AttributeValue::Text("idle".into())));
        blend_attributes(&mut base, &top, 0.75);
        assert_eq!(base.get("state"), Some(&AttributeValue::Text("run".into())));
    }
}
