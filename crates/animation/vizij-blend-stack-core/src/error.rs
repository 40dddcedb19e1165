//! Error types for the blend stack.
//!
//! None of these cross the per-frame boundary as failures: the stack logs them and
//! degrades to a valid pose. They exist so internal steps can use `?` and so callers
//! can inspect why a request took the fallback path.

/// Configuration-class failures detected while setting up samples or plans.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlendStackError {
    /// Mirroring was requested without a mirror table.
    #[error("mirroring requested for '{asset}' but no mirror table was supplied")]
    MirrorTableMissing { asset: String },

    /// The evaluation skeleton has no bones.
    #[error("skeleton has zero bones")]
    EmptySkeleton,

    /// The asset kind cannot be played by a sample (e.g. a montage).
    #[error("unsupported asset type: {name}")]
    UnsupportedAsset { name: String },

    /// No asset was supplied.
    #[error("no asset supplied")]
    MissingAsset,

    /// Stitching needs at least one retained blend slot.
    #[error("stitching requires max_active_blends > 0")]
    StitchBudgetExhausted,

    /// Stitching was requested but no similarity search is installed.
    #[error("no stitch search provider installed")]
    SearchProviderMissing,

    /// A blend profile entry refers to a bone outside the skeleton.
    #[error("blend profile entry for bone {bone} exceeds skeleton bone count {bone_count}")]
    InvalidBlendProfile { bone: usize, bone_count: usize },
}

pub type Result<T> = std::result::Result<T, BlendStackError>;
