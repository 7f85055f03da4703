use crate::config::FontConfig;
use crate::text_metrics::{self, LineMetrics};

/// One rendered row of a label block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelLine {
    pub text: String,
    /// Second and later lines of a multi-line tag. They sit closer to the
    /// line above so a tag reads as one unit.
    pub continuation: bool,
}

/// Measured footprint of a zone's tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelBlock {
    pub lines: Vec<LabelLine>,
    /// Widest line, in pixels.
    pub text_width: i32,
    /// Tallest above-baseline line height, in pixels.
    pub line_height: i32,
    /// Block width including the side margins.
    pub width: i32,
    /// Block height including inter-line gaps and baseline padding.
    pub height: i32,
}

impl LabelBlock {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Vertical distance between the tops of two consecutive rows.
    pub fn row_pitch(&self, margin: i32) -> i32 {
        self.line_height + margin * 2
    }
}

/// Flattens tags into rows, splitting each tag on embedded line breaks.
pub fn split_tags<S: AsRef<str>>(tags: &[S]) -> Vec<LabelLine> {
    tags.iter()
        .flat_map(|tag| {
            tag.as_ref()
                .split('\n')
                .enumerate()
                .map(|(idx, line)| LabelLine {
                    text: line.trim_end_matches('\r').to_string(),
                    continuation: idx > 0,
                })
        })
        .collect()
}

/// Measures the block a list of tags occupies when drawn.
///
/// Width is the widest line plus three margins (one each side of the text and
/// one for the pointer gap). Height stacks every line at a pitch of
/// `line_height + 2 * margin` and pads the last line with one extra line
/// height below its baseline.
pub fn measure_tags<S: AsRef<str>>(tags: &[S], font: &FontConfig, margin: i32) -> LabelBlock {
    let lines = split_tags(tags);
    if lines.is_empty() {
        return LabelBlock::default();
    }

    let mut text_width = 0;
    let mut line_height = 0;
    for line in &lines {
        let metrics = line_metrics(&line.text, font);
        text_width = text_width.max(metrics.width.ceil() as i32);
        line_height = line_height.max(metrics.height.ceil() as i32);
    }

    let gaps = lines.len() as i32 - 1;
    LabelBlock {
        width: text_width + margin * 3,
        height: (margin + line_height) * gaps + line_height * 2 + margin * gaps,
        lines,
        text_width,
        line_height,
    }
}

pub(crate) fn line_metrics(text: &str, font: &FontConfig) -> LineMetrics {
    if font.fast_metrics {
        return text_metrics::fallback_line_metrics(text, font.size);
    }
    text_metrics::measure_line(text, font.size, &font.family)
        .unwrap_or_else(|| text_metrics::fallback_line_metrics(text, font.size))
}
