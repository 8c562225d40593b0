//! Biome grid transforms
//!
//! Each stage maps a grid to a new grid and reads nothing but its input, the
//! world seed and its own salt. Stages that look at neighbours shrink the
//! covered rectangle by one cell on every side; [`Stage::input_region`]
//! reports how much input a requested output needs.

use glam::IVec2;
use std::collections::BTreeSet;

use super::grid::ChunkBiome;
use super::hash::cell_hash;
use super::registry::{BiomeId, WeightedList};

/// Result of a replacement pick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    /// Leave the cell as it is
    Keep,
    Biome(BiomeId),
}

impl Choice {
    fn apply(self, current: BiomeId) -> BiomeId {
        match self {
            Self::Keep => current,
            Self::Biome(id) => id,
        }
    }
}

/// One pipeline step
#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    /// Double the resolution, filling new cells from their neighbours
    Expand,
    /// Swap biomes in `targets` for a weighted pick
    Replace {
        targets: BTreeSet<BiomeId>,
        choices: WeightedList<Choice>,
    },
    /// Adopt the value of agreeing opposite neighbours
    Smooth,
    /// Replace `targets` cells that touch a `from` cell
    Border {
        from: BTreeSet<BiomeId>,
        targets: BTreeSet<BiomeId>,
        choices: WeightedList<Choice>,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Replace { .. } => "replace",
            Self::Smooth => "smooth",
            Self::Border { .. } => "border",
        }
    }

    /// Input rectangle needed to produce the output rectangle `[min, max]`
    pub fn input_region(&self, min: IVec2, max: IVec2) -> (IVec2, IVec2) {
        match self {
            Self::Expand => (
                IVec2::new(min.x.div_euclid(2), min.y.div_euclid(2)),
                IVec2::new((max.x + 1).div_euclid(2), (max.y + 1).div_euclid(2)),
            ),
            Self::Replace { .. } => (min, max),
            Self::Smooth | Self::Border { .. } => (min - IVec2::ONE, max + IVec2::ONE),
        }
    }

    pub fn apply(&self, input: &ChunkBiome, seed: u32, salt: u32) -> ChunkBiome {
        match self {
            Self::Expand => expand(input, seed, salt),
            Self::Replace { targets, choices } => ChunkBiome::from_fn(
                input.origin(),
                input.width(),
                input.depth(),
                |x, z| {
                    let current = input.get_clamped(x, z);
                    if targets.contains(&current) {
                        choices.pick(cell_hash(seed, salt, x, z)).apply(current)
                    } else {
                        current
                    }
                },
            ),
            Self::Smooth => shrink(input, |x, z| smooth_cell(input, x, z)),
            Self::Border { from, targets, choices } => shrink(input, |x, z| {
                let current = input.get_clamped(x, z);
                if !targets.contains(&current) {
                    return current;
                }
                let touches_from = NEIGHBOURS_8
                    .iter()
                    .any(|(dx, dz)| from.contains(&input.get_clamped(x + dx, z + dz)));
                if touches_from {
                    choices.pick(cell_hash(seed, salt, x, z)).apply(current)
                } else {
                    current
                }
            }),
        }
    }
}

const NEIGHBOURS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Evaluate `f` over the input minus a one-cell rim
fn shrink(input: &ChunkBiome, f: impl FnMut(i32, i32) -> BiomeId) -> ChunkBiome {
    ChunkBiome::from_fn(
        input.origin() + IVec2::ONE,
        input.width().saturating_sub(2),
        input.depth().saturating_sub(2),
        f,
    )
}

fn smooth_cell(input: &ChunkBiome, x: i32, z: i32) -> BiomeId {
    let up = input.get_clamped(x, z - 1);
    let down = input.get_clamped(x, z + 1);
    if up == down {
        return up;
    }
    let left = input.get_clamped(x - 1, z);
    let right = input.get_clamped(x + 1, z);
    if left == right {
        return left;
    }
    input.get_clamped(x, z)
}

fn expand(input: &ChunkBiome, seed: u32, salt: u32) -> ChunkBiome {
    let origin = input.origin() * 2;
    let width = (input.width() * 2).saturating_sub(1);
    let depth = (input.depth() * 2).saturating_sub(1);

    ChunkBiome::from_fn(origin, width, depth, |x, z| {
        let (px, pz) = (x.div_euclid(2), z.div_euclid(2));
        let noise = cell_hash(seed, salt, x, z);
        match (x.rem_euclid(2), z.rem_euclid(2)) {
            (0, 0) => input.get_clamped(px, pz),
            (1, 0) => pick_of(&[input.get_clamped(px, pz), input.get_clamped(px + 1, pz)], noise),
            (0, _) => pick_of(&[input.get_clamped(px, pz), input.get_clamped(px, pz + 1)], noise),
            _ => {
                let corners = [
                    input.get_clamped(px, pz),
                    input.get_clamped(px + 1, pz),
                    input.get_clamped(px, pz + 1),
                    input.get_clamped(px + 1, pz + 1),
                ];
                majority(&corners).unwrap_or_else(|| pick_of(&corners, noise))
            }
        }
    })
}

fn pick_of(values: &[BiomeId], noise: f32) -> BiomeId {
    let index = ((noise * values.len() as f32) as usize).min(values.len() - 1);
    values[index]
}

/// Value held by more than half of `values`
fn majority(values: &[BiomeId]) -> Option<BiomeId> {
    values
        .iter()
        .find(|v| values.iter().filter(|w| w == v).count() * 2 > values.len())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: BiomeId = BiomeId(0);
    const B: BiomeId = BiomeId(1);
    const C: BiomeId = BiomeId(2);

    fn grid_from_rows(origin: IVec2, rows: &[&[u16]]) -> ChunkBiome {
        let width = rows[0].len() as u32;
        ChunkBiome::from_fn(origin, width, rows.len() as u32, |x, z| {
            BiomeId(rows[(z - origin.y) as usize][(x - origin.x) as usize])
        })
    }

    fn set(ids: &[BiomeId]) -> BTreeSet<BiomeId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_expand_preserves_even_positions() {
        let input = grid_from_rows(IVec2::new(-1, 2), &[&[0, 1, 2], &[2, 0, 1], &[1, 1, 0]]);
        let output = Stage::Expand.apply(&input, 42, 1);

        assert_eq!(output.origin(), IVec2::new(-2, 4));
        assert_eq!(output.width(), 5);
        assert_eq!(output.depth(), 5);
        for (x, z, id) in input.iter() {
            assert_eq!(output.get(2 * x, 2 * z), Some(id));
        }
    }

    #[test]
    fn test_expand_midpoints_come_from_neighbours() {
        let input = grid_from_rows(IVec2::ZERO, &[&[0, 1], &[2, 2]]);
        let output = Stage::Expand.apply(&input, 7, 3);

        assert!([A, B].contains(&output.get(1, 0).unwrap()));
        assert!([A, C].contains(&output.get(0, 1).unwrap()));
        assert!([B, C].contains(&output.get(2, 1).unwrap()));
        assert!([A, B, C].contains(&output.get(1, 1).unwrap()));
    }

    #[test]
    fn test_expand_corner_majority() {
        let input = grid_from_rows(IVec2::ZERO, &[&[1, 1], &[1, 0]]);
        for seed in 0..16 {
            let output = Stage::Expand.apply(&input, seed, 1);
            assert_eq!(output.get(1, 1), Some(B));
        }
    }

    #[test]
    fn test_expand_input_region_covers_output() {
        for (min, max) in [(IVec2::new(-3, 4), IVec2::new(5, 9)), (IVec2::new(0, 0), IVec2::new(0, 1))] {
            let (in_min, in_max) = Stage::Expand.input_region(min, max);
            let input = ChunkBiome::filled(in_min, (in_max.x - in_min.x + 1) as u32, (in_max.y - in_min.y + 1) as u32, A);
            let output = Stage::Expand.apply(&input, 0, 0);
            assert!(output.contains(min.x, min.y));
            assert!(output.contains(max.x, max.y));
        }
    }

    #[test]
    fn test_smooth_prefers_vertical_agreement() {
        // Vertical neighbours agree on B, horizontal on C
        let input = grid_from_rows(IVec2::ZERO, &[&[0, 1, 0], &[2, 0, 2], &[0, 1, 0]]);
        let output = Stage::Smooth.apply(&input, 0, 0);

        assert_eq!(output.origin(), IVec2::ONE);
        assert_eq!(output.len(), 1);
        assert_eq!(output.get(1, 1), Some(B));
    }

    #[test]
    fn test_smooth_horizontal_and_keep() {
        let horizontal = grid_from_rows(IVec2::ZERO, &[&[0, 1, 0], &[2, 0, 2], &[0, 0, 0]]);
        assert_eq!(Stage::Smooth.apply(&horizontal, 0, 0).get(1, 1), Some(C));

        let none = grid_from_rows(IVec2::ZERO, &[&[0, 1, 0], &[2, 0, 1], &[0, 2, 0]]);
        assert_eq!(Stage::Smooth.apply(&none, 0, 0).get(1, 1), Some(A));
    }

    #[test]
    fn test_replace_targets_only() {
        let input = grid_from_rows(IVec2::ZERO, &[&[0, 1], &[1, 0]]);
        let stage = Stage::Replace {
            targets: set(&[B]),
            choices: WeightedList::new(vec![(Choice::Biome(C), 1.0)]).unwrap(),
        };
        let output = stage.apply(&input, 1, 1);

        assert_eq!(output.get(0, 0), Some(A));
        assert_eq!(output.get(1, 0), Some(C));
        assert_eq!(output.get(0, 1), Some(C));
        assert_eq!(output.get(1, 1), Some(A));
    }

    #[test]
    fn test_replace_keep_is_noop() {
        let input = grid_from_rows(IVec2::ZERO, &[&[1, 1, 1], &[1, 1, 1]]);
        let stage = Stage::Replace {
            targets: set(&[B]),
            choices: WeightedList::new(vec![(Choice::Keep, 1.0)]).unwrap(),
        };
        assert_eq!(stage.apply(&input, 9, 2), input);
    }

    #[test]
    fn test_border_only_touches_adjacent_targets() {
        // A is water, B is land, C is beach
        let input = grid_from_rows(
            IVec2::ZERO,
            &[
                &[0, 1, 1, 1, 1],
                &[1, 1, 1, 1, 1],
                &[1, 1, 1, 1, 0],
                &[1, 1, 1, 1, 1],
                &[1, 1, 1, 1, 1],
            ],
        );
        let stage = Stage::Border {
            from: set(&[A]),
            targets: set(&[B]),
            choices: WeightedList::new(vec![(Choice::Biome(C), 1.0)]).unwrap(),
        };
        let output = stage.apply(&input, 5, 4);
        assert_eq!(output.origin(), IVec2::ONE);

        for (x, z, id) in output.iter() {
            let near_water = NEIGHBOURS_8
                .iter()
                .any(|(dx, dz)| input.get(x + dx, z + dz) == Some(A));
            if near_water {
                assert_eq!(id, C, "cell ({x}, {z}) should become beach");
            } else {
                assert_eq!(id, input.get(x, z).unwrap(), "cell ({x}, {z}) should be unchanged");
            }
        }
    }

    #[test]
    fn test_border_keep_choice_leaves_cell() {
        let input = grid_from_rows(IVec2::ZERO, &[&[0, 1, 1], &[1, 1, 1], &[1, 1, 1]]);
        let stage = Stage::Border {
            from: set(&[A]),
            targets: set(&[B]),
            choices: WeightedList::new(vec![(Choice::Keep, 1.0)]).unwrap(),
        };
        assert_eq!(stage.apply(&input, 5, 4).get(1, 1), Some(B));
    }
}
