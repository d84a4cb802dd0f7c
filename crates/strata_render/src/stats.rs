//! Per-frame renderer statistics.

/// Counters gathered while culling and drawing one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Sections handed to the visitor.
    pub sections_visited: u32,
    /// Sections that passed the distance and frustum tests.
    pub sections_visible: u32,
    /// Render lists in the frame's sorted sequence.
    pub render_lists: u32,
    /// Sections added to render lists.
    pub sections_listed: u32,
    /// Draw calls issued (a multi-draw counts once).
    pub draw_calls: u32,
    /// Batch entries submitted across all draws.
    pub draw_commands: u32,
    /// Regions skipped because they had nothing to draw.
    pub regions_skipped: u32,
}

impl RenderStats {
    /// Fraction of visited sections that were visible.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn visibility_ratio(&self) -> f32 {
        if self.sections_visited == 0 {
            0.0
        } else {
            self.sections_visible as f32 / self.sections_visited as f32
        }
    }

    /// Clears the draw counters and keeps the traversal counters.
    pub fn reset_draw_counters(&mut self) {
        self.draw_calls = 0;
        self.draw_commands = 0;
        self.regions_skipped = 0;
    }

    /// Accumulates draw counters from a single pass.
    pub fn add_draw_counters(&mut self, other: &Self) {
        self.draw_calls += other.draw_calls;
        self.draw_commands += other.draw_commands;
        self.regions_skipped += other.regions_skipped;
    }
}
