// Joint label placement for several zones drawn together.
//
// Each labeled zone gets up to four candidate slots: those that stay on the
// canvas and do not cover another zone. A depth-first search then picks one
// candidate per zone so that no two labels collide, keeping the assignment
// with the highest total slot score. The search space is at most 4^n, which
// is fine for the handful of zones visible in one frame; a score bound prunes
// branches that cannot beat the best assignment found so far, and a node
// budget caps dense scenes.

use super::geometry::{CanvasSize, Rect};
use super::slot::{Slot, slot_rect};
use super::text::LabelBlock;

/// A candidate label position for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub slot: Slot,
    pub rect: Rect,
}

/// Result of the joint search, one entry per input zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// `None` for zones without tags and for conflict zones (no valid slot).
    pub slots: Vec<Option<Slot>>,
    pub score: u32,
    pub conflict_zones: Vec<usize>,
}

/// Search nodes [`solve`] visits before giving up.
pub const DEFAULT_NODE_BUDGET: usize = 1 << 18;

/// Slots of zone `index` that stay on the canvas and clear every other zone.
/// Empty when `index` has no zone or no block.
pub fn candidates(
    zones: &[Rect],
    blocks: &[LabelBlock],
    index: usize,
    canvas: CanvasSize,
    margin: i32,
) -> Vec<Candidate> {
    let (Some(zone), Some(block)) = (zones.get(index), blocks.get(index)) else {
        return Vec::new();
    };
    Slot::ALL
        .iter()
        .map(|&slot| Candidate {
            slot,
            rect: slot_rect(slot, zone, block, margin),
        })
        .filter(|candidate| canvas.contains(&candidate.rect))
        .filter(|candidate| {
            !zones
                .iter()
                .enumerate()
                .any(|(other, rect)| other != index && candidate.rect.collides(rect))
        })
        .collect()
}

/// Searches the best collision-free slot assignment.
///
/// `zones` and `blocks` are parallel; zones whose block is empty take part
/// only as obstacles. Returns `None` when no zone can be placed jointly, in
/// which case every zone should fall back to [`super::choose_slot`].
///
/// Among assignments sharing the top score the first one in enumeration order
/// wins: zones are visited by index and slots in [`Slot::ALL`] order, so a
/// lower-indexed zone keeps the better slot.
pub fn solve(
    zones: &[Rect],
    blocks: &[LabelBlock],
    canvas: CanvasSize,
    margin: i32,
) -> Option<Assignment> {
    solve_within(zones, blocks, canvas, margin, DEFAULT_NODE_BUDGET)
}

/// [`solve`] with an explicit cap on visited search nodes. Once the cap is
/// hit the best assignment found so far is returned, or `None` if there is
/// none yet.
pub fn solve_within(
    zones: &[Rect],
    blocks: &[LabelBlock],
    canvas: CanvasSize,
    margin: i32,
    node_budget: usize,
) -> Option<Assignment> {
    debug_assert_eq!(zones.len(), blocks.len(), "one label block per zone");
    let count = zones.len().min(blocks.len());

    let mut variables = Vec::new();
    let mut conflict_zones = Vec::new();
    for index in 0..count {
        if blocks[index].is_empty() {
            continue;
        }
        let options = candidates(&zones[..count], &blocks[..count], index, canvas, margin);
        if options.is_empty() {
            conflict_zones.push(index);
        } else {
            variables.push(Variable {
                zone: index,
                options,
            });
        }
    }

    if variables.is_empty() {
        tracing::debug!(conflicts = conflict_zones.len(), "no zone can be placed jointly");
        return None;
    }

    let mut search = Search {
        variables: &variables,
        current: Vec::with_capacity(variables.len()),
        best: None,
        explored: 0,
        budget: node_budget,
    };
    search.run(0, 0);
    let explored = search.explored;
    if explored >= node_budget {
        tracing::warn!(
            explored,
            zones = variables.len(),
            found = search.best.is_some(),
            "joint placement hit its node budget"
        );
    }
    let Some((score, choice)) = search.best else {
        tracing::debug!(explored, "joint placement unsatisfiable");
        return None;
    };
    tracing::debug!(
        score,
        explored,
        conflicts = conflict_zones.len(),
        "joint placement resolved"
    );

    let mut slots = vec![None; count];
    for (variable, option) in variables.iter().zip(choice) {
        slots[variable.zone] = Some(variable.options[option].slot);
    }
    Some(Assignment {
        slots,
        score,
        conflict_zones,
    })
}

struct Variable {
    zone: usize,
    options: Vec<Candidate>,
}

struct Search<'a> {
    variables: &'a [Variable],
    current: Vec<usize>,
    best: Option<(u32, Vec<usize>)>,
    explored: usize,
    budget: usize,
}

impl Search<'_> {
    const MAX_SLOT_SCORE: u32 = 4;

    fn run(&mut self, depth: usize, score: u32) {
        if self.explored >= self.budget {
            return;
        }
        self.explored += 1;
        if depth == self.variables.len() {
            if self.best.as_ref().is_none_or(|(best, _)| score > *best) {
                self.best = Some((score, self.current.clone()));
            }
            return;
        }

        let remaining = (self.variables.len() - depth) as u32;
        if let Some((best, _)) = &self.best
            && score + remaining * Self::MAX_SLOT_SCORE <= *best
        {
            return;
        }

        let variables = self.variables;
        for (option_idx, option) in variables[depth].options.iter().enumerate() {
            let clashes = self
                .current
                .iter()
                .enumerate()
                .any(|(placed, &chosen)| variables[placed].options[chosen].rect.collides(&option.rect));
            if clashes {
                continue;
            }
            self.current.push(option_idx);
            self.run(depth + 1, score + option.slot.score());
            self.current.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::text::LabelLine;

    const HD: CanvasSize = CanvasSize {
        width: 1280,
        height: 720,
    };

    fn block(width: i32, height: i32) -> LabelBlock {
        LabelBlock {
            lines: vec![LabelLine {
                text: "tag".to_string(),
                continuation: false,
            }],
            text_width: width - 15,
            line_height: height / 2,
            width,
            height,
        }
    }

    fn brute_force_best(zones: &[Rect], blocks: &[LabelBlock], canvas: CanvasSize) -> u32 {
        let options: Vec<Vec<Candidate>> = (0..zones.len())
            .map(|i| candidates(zones, blocks, i, canvas, 5))
            .collect();
        let mut best = 0;
        let total: usize = options.iter().map(|o| o.len().max(1)).product();
        for mut code in 0..total {
            let mut picked = Vec::new();
            for opts in &options {
                if opts.is_empty() {
                    continue;
                }
                picked.push(opts[code % opts.len()]);
                code /= opts.len();
            }
            let valid = picked
                .iter()
                .enumerate()
                .all(|(i, a)| picked[i + 1..].iter().all(|b| !a.rect.collides(&b.rect)));
            if valid {
                best = best.max(picked.iter().map(|c| c.slot.score()).sum());
            }
        }
        best
    }

    #[test]
    fn two_neighbours_reach_the_brute_force_optimum() {
        let zones = [Rect::new(100, 100, 200, 300), Rect::new(220, 100, 400, 300)];
        let blocks = [block(70, 80), block(70, 80)];
        let assignment = solve(&zones, &blocks, HD, 5).expect("solvable");
        assert_eq!(assignment.slots.len(), 2);
        assert!(assignment.slots.iter().all(Option::is_some));
        assert_eq!(assignment.score, brute_force_best(&zones, &blocks, HD));
        assert_eq!(
            assignment.slots,
            vec![Some(Slot::BottomLeft), Some(Slot::BottomRight)]
        );
    }

    #[test]
    fn chosen_labels_never_collide() {
        let zones = [
            Rect::new(100, 100, 200, 300),
            Rect::new(220, 100, 400, 300),
            Rect::new(420, 120, 600, 260),
            Rect::new(150, 400, 300, 600),
        ];
        let blocks = [block(70, 80), block(90, 40), block(60, 60), block(120, 50)];
        let assignment = solve(&zones, &blocks, HD, 5).expect("solvable");
        let rects: Vec<Rect> = assignment
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|s| slot_rect(s, &zones[i], &blocks[i], 5)))
            .collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.collides(b), "{a:?} collides with {b:?}");
            }
        }
        assert_eq!(assignment.score, brute_force_best(&zones, &blocks, HD));
    }

    #[test]
    fn zone_without_room_becomes_a_conflict_zone() {
        let canvas = CanvasSize::new(200, 200);
        let zones = [Rect::new(2, 2, 198, 198), Rect::new(10, 10, 20, 20)];
        let blocks = [block(300, 300), block(30, 20)];
        let assignment = solve(&zones, &blocks, canvas, 5);
        // The small zone sits inside the big one, so every candidate of the
        // small zone covers the big zone and vice versa.
        assert!(assignment.is_none());
        assert!(candidates(&zones, &blocks, 0, canvas, 5).is_empty());
    }

    #[test]
    fn conflict_zones_are_reported_and_skipped() {
        let canvas = CanvasSize::new(640, 480);
        let zones = [Rect::new(100, 100, 200, 300), Rect::new(2, 2, 638, 30)];
        let blocks = [block(70, 80), block(700, 40)];
        let assignment = solve(&zones, &blocks, canvas, 5).expect("first zone placeable");
        assert_eq!(assignment.conflict_zones, vec![1]);
        assert_eq!(assignment.slots[1], None);
        assert_eq!(assignment.slots[0], Some(Slot::BottomRight));
    }

    #[test]
    fn zones_without_tags_are_only_obstacles() {
        let zones = [Rect::new(100, 100, 200, 300), Rect::new(201, 100, 400, 300)];
        let blocks = [block(70, 80), LabelBlock::default()];
        let assignment = solve(&zones, &blocks, HD, 5).expect("solvable");
        assert_eq!(assignment.slots[1], None);
        // bottom_right would land on the untagged zone
        assert_eq!(assignment.slots[0], Some(Slot::BottomLeft));
    }

    #[test]
    fn out_of_range_index_has_no_candidates() {
        let zones = [Rect::new(100, 100, 200, 300)];
        assert!(candidates(&zones, &[block(70, 80)], 3, HD, 5).is_empty());
        assert!(candidates(&zones, &[], 0, HD, 5).is_empty());
    }

    #[test]
    fn exhausted_budget_falls_back() {
        let zones = [Rect::new(100, 100, 200, 300), Rect::new(220, 100, 400, 300)];
        let blocks = [block(70, 80), block(70, 80)];
        assert!(solve_within(&zones, &blocks, HD, 5, 1).is_none());
        assert!(solve_within(&zones, &blocks, HD, 5, 0).is_none());
        assert_eq!(
            solve_within(&zones, &blocks, HD, 5, DEFAULT_NODE_BUDGET),
            solve(&zones, &blocks, HD, 5)
        );
    }

    #[test]
    fn exhausted_budget_keeps_the_first_full_assignment() {
        let zones = [Rect::new(100, 100, 200, 300)];
        let blocks = [block(70, 80)];
        // Root plus the first leaf.
        let assignment = solve_within(&zones, &blocks, HD, 5, 2).expect("one leaf reached");
        assert_eq!(assignment.slots, vec![Some(Slot::BottomRight)]);
        assert_eq!(assignment.score, 4);
    }

    #[test]
    fn nothing_to_place_returns_none() {
        assert!(solve(&[], &[], HD, 5).is_none());
        let zones = [Rect::new(100, 100, 200, 300)];
        assert!(solve(&zones, &[LabelBlock::default()], HD, 5).is_none());
    }
}
