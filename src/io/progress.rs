//! Stage progress bars for indexing and rendering

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::LazyLock;

/// Coordinates one progress bar per pipeline stage
///
/// Stages are stacked in a shared [`MultiProgress`] so concurrent bars (one
/// per scale during multi-scale indexing) do not overwrite each other.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    stages: Vec<ProgressBar>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static STAGE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    let template =
        format!("[{{elapsed_precise}}] {{msg:>12}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}}");
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

impl ProgressManager {
    /// Draw progress to stderr
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            stages: Vec::new(),
        }
    }

    /// Track progress without drawing anything
    pub fn hidden() -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            stages: Vec::new(),
        }
    }

    /// Add a bar for a stage of `len` steps
    pub fn stage(&mut self, label: &str, len: usize) -> ProgressBar {
        let bar = ProgressBar::new(len as u64);
        bar.set_style(STAGE_STYLE.clone());
        bar.set_message(label.to_string());
        let bar = self.multi_progress.add(bar);
        self.stages.push(bar.clone());
        bar
    }

    /// Number of stages created so far
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Finish every stage and clear the display
    pub fn finish(&self) {
        for bar in &self.stages {
            if !bar.is_finished() {
                bar.finish();
            }
        }
        let _ = self.multi_progress.clear();
    }
}
