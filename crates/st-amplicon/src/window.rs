// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Index bookkeeping for batch windows: plain consecutive slices of an epoch
//! permutation, group-stratified windows over cyclically tiled groups, and
//! the one-off train/validation partition.

use crate::config::WindowOptions;
use crate::{DataError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Partition of the sample universe into disjoint, non-empty groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grouping {
    groups: Vec<Vec<usize>>,
}

impl Grouping {
    pub fn new(groups: Vec<Vec<usize>>) -> Result<Self> {
        if groups.is_empty() {
            return Err(DataError::InvalidConfig(
                "grouping needs at least one group".into(),
            ));
        }
        let mut seen = HashSet::new();
        for (group, members) in groups.iter().enumerate() {
            if members.is_empty() {
                return Err(DataError::EmptyGroup { group });
            }
            for &member in members {
                if !seen.insert(member) {
                    return Err(DataError::InvalidConfig(format!(
                        "sample {member} belongs to more than one group"
                    )));
                }
            }
        }
        Ok(Self { groups })
    }

    /// Groups laid out back to back: the first `sizes[0]` indices form group
    /// 0, the next `sizes[1]` group 1 and so on.
    pub fn contiguous(sizes: &[usize]) -> Result<Self> {
        let mut start = 0;
        let mut groups = Vec::with_capacity(sizes.len());
        for &size in sizes {
            groups.push((start..start + size).collect());
            start += size;
        }
        Self::new(groups)
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn max_group_size(&self) -> usize {
        self.groups.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Largest member index + 1.
    pub fn universe_bound(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|members| members.iter().copied())
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// `floor(count * fraction)`, tolerant of the representation error of
/// `f32` fractions such as `0.2`.
fn scaled_count(count: usize, fraction: f64) -> usize {
    (count as f64 * fraction + 1e-6).floor() as usize
}

fn tile(members: &[usize], len: usize) -> Vec<usize> {
    members.iter().copied().cycle().take(len).collect()
}

#[derive(Clone, Debug)]
enum Layout {
    Plain {
        order: Vec<usize>,
    },
    Grouped {
        members: Vec<Vec<usize>>,
        tiled: Vec<Vec<usize>>,
        per_group: usize,
    },
}

/// Produces fixed-size index windows over an epoch permutation. Partial
/// trailing windows are dropped, never padded.
#[derive(Clone, Debug)]
pub struct BatchWindower {
    batch_size: usize,
    windows_per_epoch: usize,
    layout: Layout,
}

impl BatchWindower {
    /// Consecutive slices of a permutation of `0..universe_size`.
    pub fn plain(universe_size: usize, options: &WindowOptions) -> Result<Self> {
        options.validate()?;
        let visited = scaled_count(universe_size, f64::from(options.limit_fraction));
        Ok(Self {
            batch_size: options.batch_size,
            windows_per_epoch: visited / options.batch_size,
            layout: Layout::Plain {
                order: (0..universe_size).collect(),
            },
        })
    }

    /// Balanced windows: every window holds `batch_size / num_groups` entries
    /// from each group. A pass spans `floor(N * limit_fraction / batch_size)`
    /// windows, `N` being the total membership. Groups are tiled to the size
    /// of the largest one, so smaller groups are over-sampled.
    pub fn grouped(grouping: &Grouping, options: &WindowOptions) -> Result<Self> {
        options.validate()?;
        let num_groups = grouping.num_groups();
        if options.batch_size % num_groups != 0 {
            return Err(DataError::InvalidConfig(format!(
                "batch_size {} is not divisible by {num_groups} groups",
                options.batch_size
            )));
        }
        let per_group = options.batch_size / num_groups;
        let max_group = grouping.max_group_size();
        let total: usize = grouping.groups().iter().map(Vec::len).sum();
        let visited = scaled_count(total, f64::from(options.limit_fraction));
        let members = grouping.groups().to_vec();
        let tiled = members.iter().map(|m| tile(m, max_group)).collect();
        Ok(Self {
            batch_size: options.batch_size,
            windows_per_epoch: visited / options.batch_size,
            layout: Layout::Grouped {
                members,
                tiled,
                per_group,
            },
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn windows_per_epoch(&self) -> usize {
        self.windows_per_epoch
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self.layout, Layout::Grouped { .. })
    }

    /// Current plain permutation; `None` in grouped mode.
    pub fn order(&self) -> Option<&[usize]> {
        match &self.layout {
            Layout::Plain { order } => Some(order),
            Layout::Grouped { .. } => None,
        }
    }

    /// Window `index` of the current pass, or `None` once the pass is over.
    pub fn window(&self, index: usize) -> Option<Vec<usize>> {
        if index >= self.windows_per_epoch {
            return None;
        }
        match &self.layout {
            Layout::Plain { order } => {
                let start = index * self.batch_size;
                Some(order[start..start + self.batch_size].to_vec())
            }
            Layout::Grouped {
                tiled, per_group, ..
            } => {
                let start = index * per_group;
                let mut window = Vec::with_capacity(self.batch_size);
                for group in tiled {
                    window.extend_from_slice(&group[start..start + per_group]);
                }
                Some(window)
            }
        }
    }

    /// All windows of the current pass.
    pub fn windows(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        (0..self.windows_per_epoch).filter_map(move |index| self.window(index))
    }

    /// Reshuffles in place for the next pass. Grouped mode shuffles each
    /// group's members independently and re-tiles them.
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match &mut self.layout {
            Layout::Plain { order } => order.shuffle(rng),
            Layout::Grouped { members, tiled, .. } => {
                for (group, slot) in members.iter_mut().zip(tiled.iter_mut()) {
                    group.shuffle(rng);
                    let len = slot.len();
                    *slot = tile(group, len);
                }
            }
        }
    }
}

/// Partitions `0..universe_size` once with an independent permutation. The
/// first `floor(N * (1 - held_out_fraction))` shuffled indices train, the
/// rest validate.
pub fn split_indices<R: Rng + ?Sized>(
    universe_size: usize,
    held_out_fraction: f32,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(held_out_fraction > 0.0 && held_out_fraction < 1.0) {
        return Err(DataError::InvalidConfig(format!(
            "held_out_fraction must lie in (0, 1), got {held_out_fraction}"
        )));
    }
    let mut order: Vec<usize> = (0..universe_size).collect();
    order.shuffle(rng);
    let training = scaled_count(universe_size, 1.0 - f64::from(held_out_fraction));
    let validation = order.split_off(training);
    Ok((order, validation))
}
