use super::TargetId;
use crate::capture::{DeliveryPolicy, IDENTITY_TRANSFORM};

/// Column-major texture transform that mirrors the image left to right.
pub const MIRROR_HORIZONTAL: [f32; 16] = [
    -1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    1.0, 0.0, 0.0, 1.0,
];

/// Per-target rendering options, kept alongside the registered surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetOptions {
    /// How this target consumes the frame stream.
    pub delivery: DeliveryPolicy,

    /// Column-major transform applied on top of each frame's texture
    /// transform (preview mirroring, encoder orientation).
    pub transform: [f32; 16],
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            delivery: DeliveryPolicy::LatestWins,
            transform: IDENTITY_TRANSFORM,
        }
    }
}

impl TargetOptions {
    /// Defaults by target name: `record` is lossless, everything else latest-wins.
    pub fn for_target(id: &TargetId) -> Self {
        let delivery = if id.as_str() == TargetId::RECORD {
            DeliveryPolicy::Lossless
        } else {
            DeliveryPolicy::LatestWins
        };
        Self {
            delivery,
            ..Self::default()
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryPolicy) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_transform(mut self, transform: [f32; 16]) -> Self {
        self.transform = transform;
        self
    }

    pub fn is_lossless(&self) -> bool {
        self.delivery == DeliveryPolicy::Lossless
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults_to_lossless() {
        assert!(TargetOptions::for_target(&TargetId::record()).is_lossless());
        assert!(!TargetOptions::for_target(&TargetId::preview()).is_lossless());
        assert!(!TargetOptions::for_target(&TargetId::new("thumbnail")).is_lossless());
    }

    #[test]
    fn builders_override_defaults() {
        let opts = TargetOptions::for_target(&TargetId::preview())
            .with_delivery(DeliveryPolicy::Lossless)
            .with_transform(MIRROR_HORIZONTAL);
        assert!(opts.is_lossless());
        assert_eq!(opts.transform, MIRROR_HORIZONTAL);
    }
}
