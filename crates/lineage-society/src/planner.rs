//! Population planning
//!
//! Pure functions used to bootstrap a population generation by
//! generation: partition one generation into cosigning groups, predict how
//! many identities each generation can reach, and count combinations.

use lineage_core::{CapacityFault, LineageError, LineageResult};

use crate::GenerationLimit;

/// Partition `ids` into cosigning groups of `min_cosigners` members
///
/// Round-robin over `ids`: each id joins up to `max_children` groups and a
/// group is emitted as soon as it is full. The scan stops after a full
/// pass places nobody. An id never appears twice in one group, and a
/// trailing group that never fills is dropped.
pub fn assign_groups<T: Clone + PartialEq>(
    ids: &[T],
    max_children: usize,
    min_cosigners: usize,
) -> Vec<Vec<T>> {
    if ids.is_empty() || min_cosigners == 0 || max_children == 0 {
        return Vec::new();
    }

    let mut budget = vec![max_children; ids.len()];
    let mut groups = Vec::new();
    let mut open: Vec<T> = Vec::with_capacity(min_cosigners);

    loop {
        let mut placed = false;
        for (slot, id) in ids.iter().enumerate() {
            if budget[slot] == 0 || open.contains(id) {
                continue;
            }
            budget[slot] -= 1;
            placed = true;
            open.push(id.clone());
            if open.len() == min_cosigners {
                groups.push(std::mem::replace(
                    &mut open,
                    Vec::with_capacity(min_cosigners),
                ));
            }
        }
        if !placed {
            break;
        }
    }
    groups
}

/// Population each generation can reach
///
/// `seed[0]` is the generation-0 population; `seed[g]`, when present, is
/// the count desired for generation `g` and must not exceed
/// `prev * limits[g - 1].max_children_per_cosigner / limits[g].min_cosigners`.
/// Missing entries default to that bound. One count per generation limit.
pub fn predict_population(
    limits: &[GenerationLimit],
    seed: &[usize],
) -> LineageResult<Vec<usize>> {
    let Some(&first) = seed.first() else {
        return Err(LineageError::InvalidArgument(
            "generation 0 population missing".into(),
        ));
    };
    if limits.is_empty() {
        return Err(LineageError::InvalidArgument("no generation limits".into()));
    }

    let mut counts = Vec::with_capacity(limits.len());
    counts.push(first);
    for generation in 1..limits.len() {
        let min = limits[generation].min_cosigners;
        if min == 0 {
            return Err(LineageError::InvalidArgument(format!(
                "generation {} requires no cosigners",
                generation
            )));
        }
        let bound = counts[generation - 1]
            .saturating_mul(limits[generation - 1].max_children_per_cosigner)
            / min;

        match seed.get(generation) {
            Some(&requested) if requested > bound => {
                return Err(CapacityFault::BeyondTheoreticalLimit {
                    generation,
                    requested,
                    limit: bound,
                }
                .into())
            }
            Some(&requested) => counts.push(requested),
            None => counts.push(bound),
        }
    }
    Ok(counts)
}

/// m choose n
pub fn combinations(m: u64, n: u64) -> LineageResult<u64> {
    if m < 1 || n < 1 || m < n {
        return Err(LineageError::InvalidArgument(format!(
            "cannot choose {} of {}",
            n, m
        )));
    }

    let n = n.min(m - n);
    let mut result: u64 = 1;
    for i in 0..n {
        // result * (m - i) is always divisible by i + 1
        result = result
            .checked_mul(m - i)
            .map(|r| r / (i + 1))
            .ok_or_else(|| {
                LineageError::InvalidArgument(format!("{} choose {} overflows", m, n))
            })?;
    }
    Ok(result)
}
