//! Per-finger curl and direction classification.
//!
//! This is the first half of the gesture matching pipeline: a pure function that reduces the 21
//! raw hand landmarks to one [`FingerDescriptor`] per finger. The second half lives in
//! [`crate::gesture`] and scores descriptors against gesture definitions.
//!
//! Classification only looks at angles between finger segments and at normalized direction
//! vectors, so it is invariant under uniform scaling of the landmark coordinates.

use itertools::Itertools;
use nalgebra::{Vector2, Vector3};

use crate::landmark::{LandmarkIdx, Landmarks};

/// Largest bend angle (degrees, between consecutive finger segments) still considered straight.
const STRAIGHT_MAX_BEND: f32 = 50.0;

/// Smallest bend angle (degrees) at which a finger counts as folded back toward the palm.
const FOLDED_MIN_BEND: f32 = 120.0;

/// Segments shorter than this (in landmark units) make a finger degenerate.
const MIN_SEGMENT_LEN: f32 = 1e-5;

/// One of the five fingers of a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// All fingers, in the order their descriptors are reported.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Returns the finger's joint chain, from the base joint to the fingertip.
    ///
    /// The thumb has no PIP/DIP joints; its chain runs CMC → MCP → IP → tip instead.
    pub fn chain(self) -> [LandmarkIdx; 4] {
        use LandmarkIdx::*;
        match self {
            Finger::Thumb => [ThumbCmc, ThumbMcp, ThumbIp, ThumbTip],
            Finger::Index => [IndexFingerMcp, IndexFingerPip, IndexFingerDip, IndexFingerTip],
            Finger::Middle => [
                MiddleFingerMcp,
                MiddleFingerPip,
                MiddleFingerDip,
                MiddleFingerTip,
            ],
            Finger::Ring => [RingFingerMcp, RingFingerPip, RingFingerDip, RingFingerTip],
            Finger::Pinky => [PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
        }
    }
}

/// How strongly a finger is bent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerCurl {
    NoCurl,
    HalfCurl,
    FullCurl,
}

/// The dominant pointing direction of a finger, in the image plane.
///
/// Classification picks the variant whose reference unit vector has the highest cosine similarity
/// with the finger's base→tip direction. Exact ties resolve to the earliest variant in declaration
/// order. Remember that image-space Y points down: `Up` is decreasing Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerDirection {
    Up,
    Down,
    Left,
    Right,
    DiagonalUpLeft,
    DiagonalUpRight,
    DiagonalDownLeft,
    DiagonalDownRight,
}

impl FingerDirection {
    /// All directions, in tie-break order.
    pub const ALL: [FingerDirection; 8] = [
        FingerDirection::Up,
        FingerDirection::Down,
        FingerDirection::Left,
        FingerDirection::Right,
        FingerDirection::DiagonalUpLeft,
        FingerDirection::DiagonalUpRight,
        FingerDirection::DiagonalDownLeft,
        FingerDirection::DiagonalDownRight,
    ];

    /// Returns the reference unit vector of this direction, in image coordinates.
    pub fn reference(self) -> Vector2<f32> {
        use std::f32::consts::FRAC_1_SQRT_2 as D;
        match self {
            FingerDirection::Up => Vector2::new(0.0, -1.0),
            FingerDirection::Down => Vector2::new(0.0, 1.0),
            FingerDirection::Left => Vector2::new(-1.0, 0.0),
            FingerDirection::Right => Vector2::new(1.0, 0.0),
            FingerDirection::DiagonalUpLeft => Vector2::new(-D, -D),
            FingerDirection::DiagonalUpRight => Vector2::new(D, -D),
            FingerDirection::DiagonalDownLeft => Vector2::new(-D, D),
            FingerDirection::DiagonalDownRight => Vector2::new(D, D),
        }
    }
}

/// Curl and direction of a single finger, derived from one frame's landmarks.
///
/// Descriptors are ephemeral: they are recomputed from scratch for every prediction and never
/// persisted across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerDescriptor {
    pub finger: Finger,
    pub curl: FingerCurl,
    pub direction: FingerDirection,
}

/// Classifies every finger of a hand, yielding exactly 5 descriptors.
///
/// This is a pure function: identical landmarks always produce identical descriptors. Returns
/// [`None`] when the landmarks are degenerate (non-finite coordinates or a finger collapsed to a
/// point), in which case no gesture should be reported for the frame.
pub fn classify(landmarks: &Landmarks) -> Option<[FingerDescriptor; 5]> {
    if !landmarks.all_finite() {
        return None;
    }

    let mut descriptors = [FingerDescriptor {
        finger: Finger::Thumb,
        curl: FingerCurl::NoCurl,
        direction: FingerDirection::Up,
    }; 5];

    for (slot, finger) in descriptors.iter_mut().zip(Finger::ALL) {
        let points = finger.chain().map(|idx| Vector3::from(landmarks[idx]));
        *slot = FingerDescriptor {
            finger,
            curl: curl_of(&points)?,
            direction: direction_of(&points)?,
        };
    }

    Some(descriptors)
}

/// Classifies the curl of one finger from its joint chain.
///
/// The bend angle at each interior joint is the angle between the incoming and outgoing segment;
/// the largest bend decides the classification.
fn curl_of(points: &[Vector3<f32>; 4]) -> Option<FingerCurl> {
    let segments = points
        .iter()
        .tuple_windows()
        .map(|(a, b)| b - a)
        .collect::<Vec<_>>();

    if segments.iter().any(|seg| seg.norm() < MIN_SEGMENT_LEN) {
        return None;
    }

    let max_bend = segments
        .iter()
        .tuple_windows()
        .map(|(a, b)| a.angle(b).to_degrees())
        .fold(0.0f32, f32::max);

    Some(if max_bend < STRAIGHT_MAX_BEND {
        FingerCurl::NoCurl
    } else if max_bend > FOLDED_MIN_BEND {
        FingerCurl::FullCurl
    } else {
        FingerCurl::HalfCurl
    })
}

/// Classifies the pointing direction of one finger from its base→tip vector.
fn direction_of(points: &[Vector3<f32>; 4]) -> Option<FingerDirection> {
    let tip = &points[3];
    let base = &points[0];
    let v = Vector2::new(tip.x - base.x, tip.y - base.y);
    if v.norm() < MIN_SEGMENT_LEN {
        return None;
    }
    let v = v.normalize();

    // Strict `>` keeps the first-declared direction on an exact tie.
    let mut best = FingerDirection::ALL[0];
    let mut best_cos = v.dot(&best.reference());
    for direction in &FingerDirection::ALL[1..] {
        let cos = v.dot(&direction.reference());
        if cos > best_cos {
            best = *direction;
            best_cos = cos;
        }
    }

    Some(best)
}
