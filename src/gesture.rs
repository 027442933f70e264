//! Gesture definitions and the matcher that scores observed fingers against them.
//!
//! A [`GestureDefinition`] lists, per finger, the accepted curls and directions together with a
//! weight for each. Matching is conjunctive per finger: a finger only contributes its weights when
//! its observed curl *and* direction are both accepted. An empty accepted set leaves that side of
//! the finger unconstrained (it matches anything and carries no weight).
//!
//! Definitions are built once at process start and shared read-only; scoring itself is pure and
//! keeps no memory of previous frames.

use crate::finger::{Finger, FingerCurl, FingerDescriptor, FingerDirection};
use crate::num::TotalF32;

/// Upper end of the confidence scale.
pub const MAX_CONFIDENCE: f32 = 10.0;

#[derive(Debug, Clone, Default)]
struct FingerRule {
    curls: Vec<(FingerCurl, f32)>,
    directions: Vec<(FingerDirection, f32)>,
}

impl FingerRule {
    /// Weight contributed by a perfectly matching observation.
    fn max_weight(&self) -> f32 {
        let curl = self.curls.iter().map(|&(_, w)| TotalF32(w)).max();
        let dir = self.directions.iter().map(|&(_, w)| TotalF32(w)).max();
        curl.map_or(0.0, |w| w.0) + dir.map_or(0.0, |w| w.0)
    }

    /// Weight awarded for `observed`, or 0.0 unless both the curl and the direction are accepted.
    fn score(&self, observed: &FingerDescriptor) -> f32 {
        let curl = if self.curls.is_empty() {
            Some(0.0)
        } else {
            self.curls
                .iter()
                .find(|&&(curl, _)| curl == observed.curl)
                .map(|&(_, weight)| weight)
        };
        let direction = if self.directions.is_empty() {
            Some(0.0)
        } else {
            self.directions
                .iter()
                .find(|&&(direction, _)| direction == observed.direction)
                .map(|&(_, weight)| weight)
        };

        match (curl, direction) {
            (Some(curl), Some(direction)) => curl + direction,
            _ => 0.0,
        }
    }
}

/// A named gesture, described by the accepted curls and directions of each finger.
///
/// Built via [`GestureDefinition::describe`]. The maximum achievable raw score is precomputed at
/// construction and used to normalize confidences into `[0, 10]`.
#[derive(Debug, Clone)]
pub struct GestureDefinition {
    name: String,
    rules: [FingerRule; 5],
    max_score: f32,
}

impl GestureDefinition {
    /// Starts describing a new gesture.
    pub fn describe<N: Into<String>>(name: N) -> GestureBuilder {
        GestureBuilder {
            name: name.into(),
            rules: Default::default(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scores an observed hand against this definition, returning a confidence in `[0, 10]`.
    pub fn confidence(&self, fingers: &[FingerDescriptor; 5]) -> f32 {
        let raw: f32 = fingers
            .iter()
            .map(|observed| self.rules[observed.finger as usize].score(observed))
            .sum();
        raw / self.max_score * MAX_CONFIDENCE
    }
}

/// Builder returned by [`GestureDefinition::describe`].
pub struct GestureBuilder {
    name: String,
    rules: [FingerRule; 5],
}

impl GestureBuilder {
    /// Accepts `curl` for `finger`, weighted by `weight`.
    ///
    /// # Panics
    ///
    /// Panics when `weight` is negative or not finite.
    pub fn curl(mut self, finger: Finger, curl: FingerCurl, weight: f32) -> Self {
        assert!(weight >= 0.0 && weight.is_finite());
        self.rules[finger as usize].curls.push((curl, weight));
        self
    }

    /// Accepts `direction` for `finger`, weighted by `weight`.
    ///
    /// # Panics
    ///
    /// Panics when `weight` is negative or not finite.
    pub fn direction(mut self, finger: Finger, direction: FingerDirection, weight: f32) -> Self {
        assert!(weight >= 0.0 && weight.is_finite());
        self.rules[finger as usize].directions.push((direction, weight));
        self
    }

    /// Finishes the description, precomputing the definition's maximum achievable score.
    ///
    /// # Panics
    ///
    /// Panics when the gesture accepts no weighted feature at all, since its confidence could not
    /// be normalized.
    pub fn finish(self) -> GestureDefinition {
        let max_score = self.rules.iter().map(FingerRule::max_weight).sum::<f32>();
        assert!(
            max_score > 0.0,
            "gesture `{}` accepts no weighted finger feature",
            self.name,
        );

        GestureDefinition {
            name: self.name,
            rules: self.rules,
            max_score,
        }
    }
}

/// Confidence of one gesture for one hand in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureScore {
    name: String,
    confidence: f32,
}

impl GestureScore {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The gesture's confidence on the `[0, 10]` scale.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// The externally visible outcome of one recognition cycle.
///
/// Either the single best [`GestureScore`] above the configured threshold, or none. A new result
/// replaces the previous one wholesale every cycle; nothing accumulates across frames.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecognitionResult {
    best: Option<GestureScore>,
}

impl RecognitionResult {
    /// The result reported when no configured gesture passes the threshold.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns the recognized gesture, if any.
    #[inline]
    pub fn recognized(&self) -> Option<&GestureScore> {
        self.best.as_ref()
    }

    #[inline]
    pub fn is_recognized(&self) -> bool {
        self.best.is_some()
    }
}

/// The immutable gesture library plus the recognition threshold.
///
/// Loaded once at process start and shared read-only across all scoring calls (it is never mutated
/// afterwards, so no synchronization is needed).
#[derive(Debug, Clone)]
pub struct GestureSet {
    definitions: Vec<GestureDefinition>,
    threshold: f32,
}

impl GestureSet {
    /// Default recognition threshold on the `[0, 10]` confidence scale.
    pub const DEFAULT_THRESHOLD: f32 = 7.5;

    /// Creates a gesture set using [`GestureSet::DEFAULT_THRESHOLD`].
    pub fn new(definitions: Vec<GestureDefinition>) -> Self {
        Self {
            definitions,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    /// Sets the recognition threshold. A gesture is only reported when its confidence is *strictly*
    /// greater than the threshold.
    ///
    /// # Panics
    ///
    /// Panics when `threshold` is outside `0.0..=10.0`.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        assert!((0.0..=MAX_CONFIDENCE).contains(&threshold));
        self.threshold = threshold;
        self
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[inline]
    pub fn definitions(&self) -> &[GestureDefinition] {
        &self.definitions
    }

    /// Scores the observed hand against every definition, in configuration order.
    pub fn scores(&self, fingers: &[FingerDescriptor; 5]) -> Vec<GestureScore> {
        self.definitions
            .iter()
            .map(|def| GestureScore {
                name: def.name.clone(),
                confidence: def.confidence(fingers),
            })
            .collect()
    }

    /// Picks the best-scoring gesture above the threshold, or none.
    ///
    /// Ties between equally confident gestures resolve to the first-declared definition; the
    /// strict `>` below keeps the earlier candidate.
    pub fn recognize(&self, fingers: &[FingerDescriptor; 5]) -> RecognitionResult {
        let mut best: Option<GestureScore> = None;
        for def in &self.definitions {
            let confidence = def.confidence(fingers);
            let better = match &best {
                Some(score) => TotalF32(confidence) > TotalF32(score.confidence),
                None => true,
            };
            if better {
                best = Some(GestureScore {
                    name: def.name.clone(),
                    confidence,
                });
            }
        }

        match best {
            Some(score) if score.confidence > self.threshold => RecognitionResult { best: Some(score) },
            _ => RecognitionResult::none(),
        }
    }
}

/// The classic thumbs-up: thumb straight and pointing up, every other finger curled in.
pub fn thumbs_up() -> GestureDefinition {
    let mut builder = GestureDefinition::describe("thumbs_up")
        .curl(Finger::Thumb, FingerCurl::NoCurl, 1.0)
        .direction(Finger::Thumb, FingerDirection::Up, 1.0)
        .direction(Finger::Thumb, FingerDirection::DiagonalUpLeft, 0.9)
        .direction(Finger::Thumb, FingerDirection::DiagonalUpRight, 0.9);
    for finger in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky] {
        builder = builder
            .curl(finger, FingerCurl::FullCurl, 1.0)
            .curl(finger, FingerCurl::HalfCurl, 0.9);
    }
    builder.finish()
}

/// The "V" sign: index and middle finger extended upwards, ring and pinky curled in.
pub fn victory() -> GestureDefinition {
    let mut builder = GestureDefinition::describe("victory")
        .curl(Finger::Thumb, FingerCurl::NoCurl, 1.0)
        .curl(Finger::Thumb, FingerCurl::HalfCurl, 0.5);
    for finger in [Finger::Index, Finger::Middle] {
        builder = builder
            .curl(finger, FingerCurl::NoCurl, 1.0)
            .direction(finger, FingerDirection::Up, 1.0)
            .direction(finger, FingerDirection::DiagonalUpLeft, 0.9)
            .direction(finger, FingerDirection::DiagonalUpRight, 0.9);
    }
    for finger in [Finger::Ring, Finger::Pinky] {
        builder = builder
            .curl(finger, FingerCurl::FullCurl, 1.0)
            .curl(finger, FingerCurl::HalfCurl, 0.9);
    }
    builder.finish()
}
