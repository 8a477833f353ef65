// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-clip edit operations.
//!
//! Every clip owns exactly one operation of each kind. The list is seeded
//! with Trim enabled over the clip's bounds and the other kinds disabled at
//! neutral values; edits toggle and re-parameterize, never add or remove.

use crate::clip::{Clip, ClipId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allowed playback rate range
pub const SPEED_RANGE: (f64, f64) = (0.1, 16.0);

/// Allowed volume range in percent
pub const VOLUME_RANGE: (f64, f64) = (0.0, 1000.0);

/// Allowed pitch range in percent
pub const PITCH_RANGE: (f64, f64) = (25.0, 400.0);

/// Operations of every clip, keyed by clip id
pub type OperationMap = IndexMap<ClipId, OperationList>;

/// Unique identifier for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    /// Create a new random operation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Operation kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Source-time trim points
    Trim,
    /// Playback rate
    Speed,
    /// Gain
    Volume,
    /// Pitch shift
    Pitch,
}

impl OperationKind {
    /// All kinds in list order
    pub const ALL: [OperationKind; 4] = [Self::Trim, Self::Speed, Self::Volume, Self::Pitch];

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trim => "Trim",
            Self::Speed => "Speed",
            Self::Volume => "Volume",
            Self::Pitch => "Pitch",
        }
    }

    /// Whether changing this operation can change a clip's visible length
    pub fn affects_placement(&self) -> bool {
        matches!(self, Self::Trim | Self::Speed)
    }
}

/// Typed payload of an operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OperationParams {
    /// Source-time trim points in seconds
    Trim {
        /// Trim in point
        start_time: f64,
        /// Trim out point
        end_time: f64,
    },
    /// Playback rate multiplier
    Speed {
        /// Rate in `SPEED_RANGE`
        rate: f64,
    },
    /// Gain in percent
    Volume {
        /// Percent in `VOLUME_RANGE`
        percent: f64,
    },
    /// Pitch in percent of the original
    Pitch {
        /// Percent in `PITCH_RANGE`
        percent: f64,
    },
}

impl OperationParams {
    /// Kind of this payload
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Trim { .. } => OperationKind::Trim,
            Self::Speed { .. } => OperationKind::Speed,
            Self::Volume { .. } => OperationKind::Volume,
            Self::Pitch { .. } => OperationKind::Pitch,
        }
    }

    /// Neutral payload for a kind
    pub fn neutral(kind: OperationKind, bound_start: f64, bound_end: f64) -> Self {
        match kind {
            OperationKind::Trim => Self::Trim {
                start_time: bound_start,
                end_time: bound_end,
            },
            OperationKind::Speed => Self::Speed { rate: 1.0 },
            OperationKind::Volume => Self::Volume { percent: 100.0 },
            OperationKind::Pitch => Self::Pitch { percent: 100.0 },
        }
    }

    /// Clamp the payload into its legal range
    pub fn clamped(self) -> Self {
        match self {
            Self::Trim { start_time, end_time } => {
                let start_time = start_time.max(0.0);
                Self::Trim {
                    start_time,
                    end_time: end_time.max(start_time),
                }
            }
            Self::Speed { rate } => Self::Speed {
                rate: clamp_finite(rate, SPEED_RANGE, 1.0),
            },
            Self::Volume { percent } => Self::Volume {
                percent: clamp_finite(percent, VOLUME_RANGE, 100.0),
            },
            Self::Pitch { percent } => Self::Pitch {
                percent: clamp_finite(percent, PITCH_RANGE, 100.0),
            },
        }
    }
}

fn clamp_finite(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// A toggleable edit applied to one clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation ID
    pub id: OperationId,
    /// Whether the operation takes effect
    pub enabled: bool,
    /// Typed parameters
    pub params: OperationParams,
}

impl Operation {
    /// Create a new operation
    pub fn new(params: OperationParams, enabled: bool) -> Self {
        Self {
            id: OperationId::new(),
            enabled,
            params: params.clamped(),
        }
    }

    /// Kind of this operation
    pub fn kind(&self) -> OperationKind {
        self.params.kind()
    }
}

/// The four operations of one clip, in `OperationKind::ALL` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationList {
    operations: Vec<Operation>,
}

impl OperationList {
    /// Seed the default list for a clip
    pub fn for_clip(clip: &Clip) -> Self {
        Self::with_bounds(clip.trim_bound_start, clip.trim_bound_end)
    }

    /// Seed the default list for a source range
    pub fn with_bounds(bound_start: f64, bound_end: f64) -> Self {
        let operations = OperationKind::ALL
            .iter()
            .map(|kind| {
                Operation::new(
                    OperationParams::neutral(*kind, bound_start, bound_end),
                    *kind == OperationKind::Trim,
                )
            })
            .collect();
        Self { operations }
    }

    /// Copy of this list with fresh operation ids
    pub fn reissued(&self) -> Self {
        Self {
            operations: self
                .operations
                .iter()
                .map(|op| Operation {
                    id: OperationId::new(),
                    ..*op
                })
                .collect(),
        }
    }

    /// Get an operation by kind
    pub fn get(&self, kind: OperationKind) -> Option<&Operation> {
        self.operations.iter().find(|op| op.kind() == kind)
    }

    /// Get a mutable operation by kind
    pub fn get_mut(&mut self, kind: OperationKind) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| op.kind() == kind)
    }

    /// Replace the payload of the operation with the same kind.
    ///
    /// Returns `true` when something changed.
    pub fn set_params(&mut self, params: OperationParams) -> bool {
        let params = params.clamped();
        match self.get_mut(params.kind()) {
            Some(op) if op.params != params => {
                op.params = params;
                true
            }
            _ => false,
        }
    }

    /// Enable or disable an operation. Returns `true` when something changed.
    pub fn set_enabled(&mut self, kind: OperationKind, enabled: bool) -> bool {
        match self.get_mut(kind) {
            Some(op) if op.enabled != enabled => {
                op.enabled = enabled;
                true
            }
            _ => false,
        }
    }

    /// Whether the operation of `kind` is enabled
    pub fn is_enabled(&self, kind: OperationKind) -> bool {
        self.get(kind).is_some_and(|op| op.enabled)
    }

    /// Enabled trim points, unclamped
    pub fn trim(&self) -> Option<(f64, f64)> {
        match self.get(OperationKind::Trim) {
            Some(Operation {
                enabled: true,
                params: OperationParams::Trim { start_time, end_time },
                ..
            }) => Some((*start_time, *end_time)),
            _ => None,
        }
    }

    /// Stored trim points regardless of the enabled flag
    pub fn trim_params(&self) -> Option<(f64, f64)> {
        match self.get(OperationKind::Trim).map(|op| op.params) {
            Some(OperationParams::Trim { start_time, end_time }) => Some((start_time, end_time)),
            _ => None,
        }
    }

    /// Effective playback rate (1.0 when disabled or degenerate)
    pub fn speed_rate(&self) -> f64 {
        match self.get(OperationKind::Speed) {
            Some(Operation {
                enabled: true,
                params: OperationParams::Speed { rate },
                ..
            }) if rate.is_finite() && *rate > 0.0 => *rate,
            _ => 1.0,
        }
    }

    /// Enabled volume percent
    pub fn volume_percent(&self) -> Option<f64> {
        match self.get(OperationKind::Volume) {
            Some(Operation {
                enabled: true,
                params: OperationParams::Volume { percent },
                ..
            }) => Some(*percent),
            _ => None,
        }
    }

    /// Enabled pitch percent
    pub fn pitch_percent(&self) -> Option<f64> {
        match self.get(OperationKind::Pitch) {
            Some(Operation {
                enabled: true,
                params: OperationParams::Pitch { percent },
                ..
            }) => Some(*percent),
            _ => None,
        }
    }

    /// Restore any missing kinds so the list holds exactly one of each
    pub fn ensure_complete(&mut self, bound_start: f64, bound_end: f64) {
        let mut complete = Vec::with_capacity(OperationKind::ALL.len());
        for kind in OperationKind::ALL {
            let op = self.get(kind).copied().unwrap_or_else(|| {
                Operation::new(
                    OperationParams::neutral(kind, bound_start, bound_end),
                    kind == OperationKind::Trim,
                )
            });
            complete.push(op);
        }
        self.operations = complete;
    }

    /// Iterate over the operations
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
