//! Skeleton, LOD bone containers, and the evaluation context.
//!
//! Two indexing schemes are in play:
//! - skeleton index: position in the full authored [`Skeleton`]
//! - compact index: position in a [`BoneContainer`], i.e. only the bones required at
//!   the current LOD, in skeleton order
//!
//! Per-bone tables authored against the skeleton (blend profiles, mirror tables) must be
//! remapped through the container before they touch a [`Pose`](crate::pose::Pose).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::pose::BoneTransform;

static NEXT_CONTAINER_SERIAL: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkeletonBone {
    pub name: String,
    /// Parent skeleton index; parents always precede their children.
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub ref_pose: BoneTransform,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "SkeletonSerial", into = "SkeletonSerial")]
pub struct Skeleton {
    pub name: String,
    bones: Vec<SkeletonBone>,
    by_name: HashMap<String, usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SkeletonSerial {
    name: String,
    bones: Vec<SkeletonBone>,
}

impl From<SkeletonSerial> for Skeleton {
    fn from(value: SkeletonSerial) -> Self {
        Skeleton::new(&value.name, value.bones)
    }
}

impl From<Skeleton> for SkeletonSerial {
    fn from(value: Skeleton) -> Self {
        SkeletonSerial {
            name: value.name,
            bones: value.bones,
        }
    }
}

impl Skeleton {
    /// Bones must be ordered parents-first. A parent index that does not precede its
    /// bone (out of range, self or forward reference) is dropped and the bone becomes a
    /// root.
    pub fn new(name: &str, mut bones: Vec<SkeletonBone>) -> Self {
        for (i, bone) in bones.iter_mut().enumerate() {
            if let Some(parent) = bone.parent.filter(|&p| p >= i) {
                log::warn!(
                    "skeleton '{name}': bone '{}' ({i}) has invalid parent {parent}, treating it as a root",
                    bone.name
                );
                bone.parent = None;
            }
        }
        let by_name = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        Self {
            name: name.to_string(),
            bones,
            by_name,
        }
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn bone(&self, index: usize) -> &SkeletonBone {
        &self.bones[index]
    }

    #[inline]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.bones[index].parent
    }

    #[inline]
    pub fn ref_pose(&self, index: usize) -> BoneTransform {
        self.bones[index].ref_pose
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn bones(&self) -> &[SkeletonBone] {
        &self.bones
    }
}

/// The set of skeleton bones evaluated at the current LOD, in skeleton order.
///
/// Every container gets a fresh serial number; a stored pose can be bulk-copied back only
/// into a container with the same serial.
#[derive(Debug, PartialEq)]
pub struct BoneContainer {
    serial: u64,
    compact_to_skeleton: Vec<usize>,
    skeleton_to_compact: Vec<Option<usize>>,
}

impl BoneContainer {
    /// All skeleton bones.
    pub fn full(skeleton: &Skeleton) -> Self {
        let all: Vec<usize> = (0..skeleton.num_bones()).collect();
        Self::build(skeleton.num_bones(), all)
    }

    /// The given skeleton bones plus all of their ancestors.
    pub fn with_required_bones(skeleton: &Skeleton, required: &[usize]) -> Self {
        let mut keep = vec![false; skeleton.num_bones()];
        for &bone in required {
            let mut cursor = (bone < keep.len()).then_some(bone);
            while let Some(b) = cursor {
                if keep[b] {
                    break;
                }
                keep[b] = true;
                cursor = skeleton.parent(b);
            }
        }
        let compact = keep
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.then_some(i))
            .collect();
        Self::build(skeleton.num_bones(), compact)
    }

    fn build(skeleton_bones: usize, compact_to_skeleton: Vec<usize>) -> Self {
        let mut skeleton_to_compact = vec![None; skeleton_bones];
        for (compact, &skel) in compact_to_skeleton.iter().enumerate() {
            skeleton_to_compact[skel] = Some(compact);
        }
        Self {
            serial: NEXT_CONTAINER_SERIAL.fetch_add(1, Ordering::Relaxed),
            compact_to_skeleton,
            skeleton_to_compact,
        }
    }

    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.compact_to_skeleton.len()
    }

    #[inline]
    pub fn skeleton_index(&self, compact: usize) -> usize {
        self.compact_to_skeleton[compact]
    }

    #[inline]
    pub fn compact_index(&self, skeleton: usize) -> Option<usize> {
        self.skeleton_to_compact.get(skeleton).copied().flatten()
    }
}

/// Skeleton plus the bone container the current frame evaluates against.
#[derive(Clone, Debug)]
pub struct EvalContext {
    pub skeleton: Arc<Skeleton>,
    pub bones: Arc<BoneContainer>,
}

impl EvalContext {
    pub fn new(skeleton: Arc<Skeleton>, bones: Arc<BoneContainer>) -> Self {
        Self { skeleton, bones }
    }

    /// Context over every bone of `skeleton`.
    pub fn full(skeleton: Arc<Skeleton>) -> Self {
        let bones = Arc::new(BoneContainer::full(&skeleton));
        Self { skeleton, bones }
    }

    /// Reference transform of a compact bone.
    #[inline]
    pub fn ref_pose(&self, compact: usize) -> BoneTransform {
        self.skeleton.ref_pose(self.bones.skeleton_index(compact))
    }
}
