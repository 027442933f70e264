//! The hand landmark data model.
//!
//! A tracked hand is described by 21 keypoints in a fixed order, the topology used by MediaPipe's
//! hand landmark networks: the wrist, followed by 4 joints for each of the 5 fingers.

use std::ops::Index;

use anyhow::{ensure, Result};

/// Number of landmarks that make up a hand (1 wrist + 4 joints × 5 fingers).
pub const NUM_LANDMARKS: usize = 21;

type Position = [f32; 3];

/// The 21 landmark positions of one hand, in canonical order.
///
/// Positions are in image/tensor coordinates (Y pointing down). Once produced by a
/// [`LandmarkProvider`], landmarks are never mutated by this crate.
///
/// [`LandmarkProvider`]: crate::tracker::LandmarkProvider
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    positions: [Position; NUM_LANDMARKS],
}

impl Landmarks {
    /// Creates a landmark collection from exactly 21 positions in canonical order.
    pub fn from_positions(positions: [Position; NUM_LANDMARKS]) -> Self {
        Self { positions }
    }

    /// Creates a landmark collection from a raw position list, validating its shape.
    ///
    /// Returns an error unless `positions` contains exactly [`NUM_LANDMARKS`] entries, all of them
    /// finite. This is the validation applied at the landmark provider boundary: predictions that
    /// don't match the fixed shape are rejected rather than interpreted.
    pub fn from_slice(positions: &[Position]) -> Result<Self> {
        ensure!(
            positions.len() == NUM_LANDMARKS,
            "expected {} landmarks, got {}",
            NUM_LANDMARKS,
            positions.len(),
        );
        ensure!(
            positions.iter().flatten().all(|coord| coord.is_finite()),
            "landmark coordinates must be finite",
        );

        let mut out = [[0.0; 3]; NUM_LANDMARKS];
        out.copy_from_slice(positions);
        Ok(Self { positions: out })
    }

    #[inline]
    pub fn positions(&self) -> &[Position; NUM_LANDMARKS] {
        &self.positions
    }

    /// Returns an iterator over all landmark positions, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + Clone + '_ {
        self.positions.iter().copied()
    }

    /// Applies `f` to every landmark position, returning the transformed collection.
    pub fn map_positions(&self, mut f: impl FnMut(Position) -> Position) -> Self {
        Self {
            positions: self.positions.map(&mut f),
        }
    }

    /// Returns whether every coordinate of every landmark is finite.
    pub fn all_finite(&self) -> bool {
        self.positions.iter().flatten().all(|coord| coord.is_finite())
    }
}

impl Index<usize> for Landmarks {
    type Output = Position;

    fn index(&self, index: usize) -> &Self::Output {
        &self.positions[index]
    }
}

impl Index<LandmarkIdx> for Landmarks {
    type Output = Position;

    fn index(&self, index: LandmarkIdx) -> &Self::Output {
        &self.positions[index as usize]
    }
}

/// Names for the hand landmarks, usable as indices into [`Landmarks`].
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// One hand as reported by a landmark provider: 21 landmarks plus an overall detection confidence.
///
/// Each prediction is produced by (and owned by) a single inference call; nothing is carried over
/// between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct HandPrediction {
    landmarks: Landmarks,
    confidence: f32,
}

impl HandPrediction {
    pub fn new(landmarks: Landmarks, confidence: f32) -> Self {
        Self {
            landmarks,
            confidence,
        }
    }

    /// Builds a prediction from raw provider output, validating the landmark shape.
    ///
    /// See [`Landmarks::from_slice`] for the validation rules.
    pub fn from_slice(positions: &[Position], confidence: f32) -> Result<Self> {
        Ok(Self {
            landmarks: Landmarks::from_slice(positions)?,
            confidence,
        })
    }

    #[inline]
    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    /// Returns the confidence that the prediction depicts an actual hand.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}
