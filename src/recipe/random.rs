use rand::Rng;

/// Uniform random source consumed by recipe resolution.
///
/// Resolution reads randomness only through this trait, so a seeded or scripted source makes it
/// reproducible.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        let i = (self.next_unit() * len as f64).floor() as usize;
        i.min(len.saturating_sub(1))
    }
}

impl RandomSource for rand::rngs::StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

impl RandomSource for rand::rngs::ThreadRng {
    fn next_unit(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

#[cfg(any(test, feature = "testing"))]
const LARGEST_BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

#[cfg(any(test, feature = "testing"))]
/// Replays a fixed list of draws, cycling when exhausted.
///
/// Draws are clamped into `[0, 1)`. An empty script always yields `0.0`.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

#[cfg(any(test, feature = "testing"))]
impl ScriptedSource {
    /// Source replaying `draws` in order.
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        Self {
            draws: draws.into(),
            cursor: 0,
        }
    }

    /// Number of draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

#[cfg(any(test, feature = "testing"))]
impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let v = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        if v.is_nan() {
            return 0.0;
        }
        v.clamp(0.0, LARGEST_BELOW_ONE)
    }
}
