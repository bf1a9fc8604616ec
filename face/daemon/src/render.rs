//! Frames painted as log lines

use face_core::{FrameModel, RenderPass};

/// A [`RenderPass`] that writes each frame to the log
#[derive(Debug, Default)]
pub struct LogRenderPass {
    frames: u64,
    last: Option<String>,
}

impl LogRenderPass {
    /// Create a pass that has painted nothing yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames painted so far
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Text of the most recent frame
    #[must_use]
    pub fn last_line(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

/// One-line summary of a frame
fn describe(frame: &FrameModel) -> String {
    let mut line = format!(
        "{} {} {}",
        frame.time_text(),
        frame.day_of_week,
        frame.date
    );
    if let Some(temperature) = &frame.temperature {
        line.push_str("  ");
        line.push_str(temperature);
    }
    if let Some(icon) = &frame.icon {
        line.push_str(&format!("  [icon {}x{}]", icon.width(), icon.height()));
    }
    line
}

impl RenderPass for LogRenderPass {
    fn paint(&mut self, frame: &FrameModel) {
        self.frames += 1;
        let line = describe(frame);
        tracing::info!(
            frame = self.frames,
            revision = frame.revision,
            background = %frame.style.background,
            text_alpha = frame.style.text_alpha,
            "{line}"
        );
        self.last = Some(line);
    }
}
