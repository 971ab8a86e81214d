use crate::foundation::color::Rgb8;

/// Lightness added to the chosen color to obtain the canvas fill, in percentage points.
pub const FILL_LIGHTEN_PERCENT: f64 = 10.0;

/// Base color shown around the canvas before the user picks one.
pub const DEFAULT_BASE_COLOR: Rgb8 = Rgb8::new(0x3a, 0x3a, 0x3a);

/// Background color state.
///
/// The canvas fill exists only after an explicit choice; until then renders stay transparent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackgroundState {
    base: Rgb8,
    fill: Option<Rgb8>,
}

impl Default for BackgroundState {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_COLOR,
            fill: None,
        }
    }
}

impl BackgroundState {
    /// `true` once the user picked a color.
    pub fn has_color(&self) -> bool {
        self.fill.is_some()
    }

    /// Chosen (or default) base color.
    pub fn base(&self) -> Rgb8 {
        self.base
    }

    /// Canvas fill, derived from the base. `None` until a color was chosen.
    pub fn fill(&self) -> Option<Rgb8> {
        self.fill
    }

    /// Record an explicit choice. Returns `false` if nothing changed.
    pub fn choose(&mut self, base: Rgb8) -> bool {
        let next = Self {
            base,
            fill: Some(base.lighten(FILL_LIGHTEN_PERCENT)),
        };
        let changed = next != *self;
        *self = next;
        changed
    }
}
