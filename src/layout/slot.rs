// Canonical label slots around a zone, their footprints, and the single-zone
// heuristic that picks one of them.

use super::geometry::{CanvasSize, Rect};
use super::text::{LabelBlock, LabelLine};
use crate::config::PlacementConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    BottomRight,
    BottomLeft,
    Inside,
    Top,
}

impl Slot {
    /// Enumeration order of the joint search, best score first.
    pub const ALL: [Slot; 4] = [Slot::BottomRight, Slot::BottomLeft, Slot::Inside, Slot::Top];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::BottomRight => "bottom_right",
            Slot::BottomLeft => "bottom_left",
            Slot::Inside => "inside",
            Slot::Top => "top",
        }
    }

    /// Visibility score used by the joint search.
    pub fn score(self) -> u32 {
        match self {
            Slot::BottomRight => 4,
            Slot::BottomLeft => 3,
            Slot::Inside => 2,
            Slot::Top => 1,
        }
    }

    /// Parses a slot name, falling back to `BottomRight` with a warning for
    /// anything unrecognized.
    pub fn parse_lenient(name: &str) -> Slot {
        name.parse().unwrap_or_else(|err: ParseSlotError| {
            tracing::warn!(requested = %err.0, "{err}, using bottom_right");
            Slot::BottomRight
        })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tag position {0:?}, expected one of bottom_right, bottom_left, inside, top")]
pub struct ParseSlotError(pub String);

impl FromStr for Slot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bottom_right" => Ok(Slot::BottomRight),
            "bottom_left" => Ok(Slot::BottomLeft),
            "inside" => Ok(Slot::Inside),
            "top" => Ok(Slot::Top),
            _ => Err(ParseSlotError(s.to_string())),
        }
    }
}

/// Rectangle a label block covers at `slot` next to `zone`.
///
/// Corner slots hang off the zone's bottom edge outside the zone, `Inside`
/// starts at the zone's top-left corner, and `Top` sits above the top edge
/// with room for the pointer.
pub fn slot_rect(slot: Slot, zone: &Rect, block: &LabelBlock, margin: i32) -> Rect {
    let (w, h) = (block.width, block.height);
    match slot {
        Slot::BottomRight => Rect::new(zone.x2, zone.y2 - h - margin, zone.x2 + w, zone.y2 - margin * 2),
        Slot::BottomLeft => Rect::new(zone.x1 - w, zone.y2 - h - margin, zone.x1, zone.y2 - margin * 2),
        Slot::Inside => Rect::new(zone.x1, zone.y1, zone.x1 + w, zone.y1 + h + margin * 2),
        Slot::Top => Rect::new(zone.x1 + margin, zone.y1 - h - margin, zone.x1 + w, zone.y1),
    }
}

/// Outcome of the four fit tests for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotFits {
    pub top: bool,
    pub bottom_right: bool,
    pub bottom_left: bool,
    pub inside: bool,
}

impl SlotFits {
    pub fn evaluate(zone: &Rect, block: &LabelBlock, canvas: CanvasSize, margin: i32) -> Self {
        let horizontal_fit = block.width <= zone.width();
        let vertical_fit = slot_rect(Slot::BottomRight, zone, block, margin).y1 >= zone.y1;
        let top = slot_rect(Slot::Top, zone, block, margin);
        let inside = slot_rect(Slot::Inside, zone, block, margin);
        Self {
            top: top.y1 >= 0 && horizontal_fit,
            bottom_right: vertical_fit && zone.x2 + block.width <= canvas.width,
            bottom_left: vertical_fit && zone.x1 - block.width >= 0,
            inside: inside.y2 <= zone.y2 && inside.y2 <= canvas.height && horizontal_fit,
        }
    }

    pub fn fits(&self, slot: Slot) -> bool {
        match slot {
            Slot::BottomRight => self.bottom_right,
            Slot::BottomLeft => self.bottom_left,
            Slot::Inside => self.inside,
            Slot::Top => self.top,
        }
    }
}

/// Picks the first slot in priority order whose fit test passes, or the
/// first-priority slot when nothing fits.
pub fn choose_slot(
    zone: &Rect,
    block: &LabelBlock,
    canvas: CanvasSize,
    margin: i32,
    placement: &PlacementConfig,
) -> Slot {
    let priority = placement.priority_for(block.line_count());
    let fits = SlotFits::evaluate(zone, block, canvas, margin);
    priority
        .iter()
        .copied()
        .find(|slot| fits.fits(*slot))
        .unwrap_or(priority[0])
}

/// One background row of a placed label with the text drawn on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    pub background: Rect,
    pub text: String,
    /// Left end of the text baseline.
    pub origin: (i32, i32),
}

/// A label block resolved to concrete pixel geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPlacement {
    pub slot: Slot,
    /// Footprint reserved for the block, as computed by [`slot_rect`].
    pub area: Rect,
    pub rows: Vec<LabelRow>,
    /// Triangle joining the block to its zone; absent for `Inside`.
    pub pointer: Option<[(i32, i32); 3]>,
}

/// Lays out every row of `block` at `slot`. Rows stay within
/// [`slot_rect`] for the same inputs.
pub fn place_label(slot: Slot, zone: &Rect, block: &LabelBlock, margin: i32) -> LabelPlacement {
    let area = slot_rect(slot, zone, block, margin);
    let h = block.line_height;
    let top = match slot {
        Slot::BottomRight | Slot::BottomLeft => zone.y2 - block.height - margin,
        Slot::Top => zone.y1 - block.height - margin,
        Slot::Inside => zone.y1 + margin,
    };
    let (left, right, text_x) = match slot {
        Slot::BottomRight => (zone.x2 + margin, zone.x2 + block.width, zone.x2 + margin * 2),
        Slot::BottomLeft => (zone.x1 - block.width, zone.x1 - margin, zone.x1 - block.width + margin),
        Slot::Inside | Slot::Top => (zone.x1 + margin, zone.x1 + block.width, zone.x1 + margin * 2),
    };

    let pitch = block.row_pitch(margin);
    let rows = block
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let row_top = top + idx as i32 * pitch;
            let LabelLine { text, continuation } = line;
            let (lift, baseline_lift) = if *continuation { (margin, margin / 2) } else { (0, 0) };
            LabelRow {
                background: Rect::new(left, row_top - lift, right, row_top + h * 2 - margin),
                text: text.clone(),
                origin: (text_x, row_top + h + margin / 2 - baseline_lift),
            }
        })
        .collect();

    let pointer = match slot {
        Slot::BottomRight => {
            let x = zone.x2 + margin - 1;
            Some([(x, top), (x, top + h + margin), (zone.x2, top + h / 2 + margin)])
        }
        Slot::BottomLeft => {
            let x = zone.x1 - margin + 1;
            Some([(x, top), (x, top + h + margin), (zone.x1, top + h / 2 + margin)])
        }
        Slot::Top => {
            let y = zone.y1 - margin * 2 + 1;
            let x1 = zone.x1 + margin + block.text_width / 3;
            let x2 = x1 + block.text_width / 3 + margin * 2;
            Some([(x1, y), (x2, y), ((x1 + x2) / 2, zone.y1)])
        }
        Slot::Inside => None,
    };

    LabelPlacement {
        slot,
        area,
        rows,
        pointer,
    }
}
