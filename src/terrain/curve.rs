//! Keyframe height curve used to remap noise heights before meshing.
//!
//! [`HeightCurve`] holds `(input, output)` keys sorted by input and samples
//! them with linear interpolation. Inputs outside the key range clamp to the
//! first or last key, so the curve is total over every `f32`.

use serde::{Deserialize, Serialize};

/// Piecewise-linear remap curve
#[derive(Clone, Debug, PartialEq)]
pub struct HeightCurve {
    keys: Vec<(f32, f32)>,
}

impl HeightCurve {
    /// Create a curve from unsorted keys. Keys are sorted by input and
    /// non-finite keys are dropped.
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.retain(|(t, v)| t.is_finite() && v.is_finite());
        keys.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Self { keys }
    }

    /// `f(t) = t` over `[0, 1]`
    pub fn linear() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 1.0)])
    }

    /// Curve that always returns `value`
    pub fn constant(value: f32) -> Self {
        Self { keys: vec![(0.0, value)] }
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }

    /// Sample the curve at `t`. An empty curve is the identity.
    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return t,
        };

        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }

        // First key strictly after t; guaranteed to exist and be > 0 here
        let upper = self.keys.iter().position(|k| k.0 > t).unwrap_or(self.keys.len() - 1);
        let (t_a, v_a) = self.keys[upper - 1];
        let (t_b, v_b) = self.keys[upper];
        let span = t_b - t_a;
        if span < 1e-6 {
            return v_a;
        }
        v_a + (v_b - v_a) * ((t - t_a) / span)
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl Serialize for HeightCurve {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.keys.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HeightCurve {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<(f32, f32)>::deserialize(deserializer)?;
        Ok(Self::new(keys))
    }
}
