//! NSGA-II selection machinery (Deb et al., 2002).

use std::cmp::Ordering;

use rand::Rng;
use rand::seq::index;

use super::candidate::Candidate;

/// Fast non-dominated sort.
///
/// Assigns 1-based ranks and the domination bookkeeping of every candidate and
/// returns the fronts as index lists, best first.
pub fn fast_non_dominated_sort(population: &mut [Candidate]) -> Vec<Vec<usize>> {
    let n = population.len();
    for candidate in population.iter_mut() {
        candidate.refresh();
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if population[i].dominates(&population[j]) {
                population[i].dominated_set.push(j);
                population[j].domination_count += 1;
            } else if population[j].dominates(&population[i]) {
                population[j].dominated_set.push(i);
                population[i].domination_count += 1;
            }
        }
    }

    let mut remaining: Vec<usize> = population.iter().map(|c| c.domination_count).collect();
    let mut current: Vec<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
    let mut fronts = Vec::new();
    let mut rank = 1;

    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            population[i].rank = rank;
            for &j in &population[i].dominated_set {
                remaining[j] -= 1;
                if remaining[j] == 0 {
                    next.push(j);
                }
            }
        }
        fronts.push(current);
        current = next;
        rank += 1;
    }

    fronts
}

/// Crowding distance over one front, normalized by each objective's `(min, max)` bounds.
pub fn assign_crowding_distance(
    population: &mut [Candidate],
    front: &[usize],
    bounds: &[(f64, f64)],
) {
    for &i in front {
        population[i].crowding_distance = 0.0;
    }
    if front.len() <= 2 {
        for &i in front {
            population[i].crowding_distance = f64::INFINITY;
        }
        return;
    }

    let mut sorted = front.to_vec();
    for (m, &(min, max)) in bounds.iter().enumerate() {
        sorted.sort_by(|&a, &b| {
            population[a].scores[m]
                .partial_cmp(&population[b].scores[m])
                .unwrap_or(Ordering::Equal)
        });

        let range = if (max - min).abs() > f64::EPSILON {
            max - min
        } else {
            1.0
        };

        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        population[first].crowding_distance = f64::INFINITY;
        population[last].crowding_distance = f64::INFINITY;

        for w in 1..(sorted.len() - 1) {
            let (prev, curr, next) = (sorted[w - 1], sorted[w], sorted[w + 1]);
            population[curr].crowding_distance +=
                (population[next].scores[m] - population[prev].scores[m]) / range;
        }
    }
}

/// Crowded comparison: lower rank first, then larger crowding distance.
pub fn crowded_comparison(a: &Candidate, b: &Candidate) -> Ordering {
    a.rank.cmp(&b.rank).then_with(|| {
        b.crowding_distance
            .partial_cmp(&a.crowding_distance)
            .unwrap_or(Ordering::Equal)
    })
}

/// k-ary tournament over distinct contestants; the earliest drawn wins ties.
pub fn tournament_select<R: Rng + ?Sized>(
    population: &[Candidate],
    size: usize,
    rng: &mut R,
) -> usize {
    let size = size.clamp(1, population.len().max(1));
    let mut best: Option<usize> = None;
    for idx in index::sample(rng, population.len(), size.min(population.len())) {
        match best {
            Some(b) if crowded_comparison(&population[idx], &population[b]) != Ordering::Less => {}
            _ => best = Some(idx),
        }
    }
    best.unwrap_or(0)
}

/// Sort, then keep the best `target` candidates: whole fronts while they fit,
/// and the boundary front truncated by crowded comparison.
pub fn select_survivors(
    mut population: Vec<Candidate>,
    target: usize,
    bounds: &[(f64, f64)],
) -> Vec<Candidate> {
    let fronts = fast_non_dominated_sort(&mut population);

    let mut keep: Vec<usize> = Vec::with_capacity(target);
    for front in &fronts {
        if keep.len() >= target {
            break;
        }
        assign_crowding_distance(&mut population, front, bounds);
        if keep.len() + front.len() <= target {
            keep.extend_from_slice(front);
        } else {
            let mut boundary = front.clone();
            boundary.sort_by(|&a, &b| crowded_comparison(&population[a], &population[b]));
            boundary.truncate(target - keep.len());
            keep.extend(boundary);
        }
    }

    keep.sort_unstable();
    let mut slots: Vec<Option<Candidate>> = population.into_iter().map(Some).collect();
    keep.into_iter().filter_map(|i| slots[i].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::chromosome::Chromosome;
    use crate::compute::graph::MasterGraph;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn population(scores: &[Vec<f64>]) -> Vec<Candidate> {
        let graph = Arc::new(MasterGraph::path(2, 1).unwrap());
        scores
            .iter()
            .enumerate()
            .map(|(id, s)| Candidate {
                id: id as u64,
                chromosome: Chromosome::new(Arc::clone(&graph), vec![1, 1]).unwrap(),
                scores: s.clone(),
                generation: 0,
                parents: Vec::new(),
                rank: 0,
                crowding_distance: 0.0,
                domination_count: 0,
                dominated_set: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_identical_candidates_share_first_front() {
        let mut pop = population(&[vec![3.0, 1.0], vec![3.0, 1.0]]);
        let fronts = fast_non_dominated_sort(&mut pop);
        assert_eq!(fronts, vec![vec![0, 1]]);
        assert!(pop.iter().all(|c| c.rank == 1));
    }

    #[test]
    fn test_sort_fronts() {
        let mut pop = population(&[
            vec![1.0, 1.0],
            vec![3.0, 3.0],
            vec![2.0, 2.0],
            vec![4.0, 0.0],
            vec![0.0, 0.0],
        ]);
        let fronts = fast_non_dominated_sort(&mut pop);
        assert_eq!(fronts, vec![vec![1, 3], vec![2], vec![0], vec![4]]);
        assert_eq!(pop[4].rank, 4);
        assert_eq!(pop[1].dominated_set.len(), 3);
        assert_eq!(pop[4].domination_count, 4);
    }

    #[test]
    fn test_crowding_distance() {
        let mut pop = population(&[vec![0.0], vec![1.0], vec![3.0], vec![4.0]]);
        assign_crowding_distance(&mut pop, &[0, 1, 2, 3], &[(0.0, 4.0)]);
        assert!(pop[0].crowding_distance.is_infinite());
        assert!(pop[3].crowding_distance.is_infinite());
        assert_eq!(pop[1].crowding_distance, 0.75);
        assert_eq!(pop[2].crowding_distance, 0.75);
    }

    #[test]
    fn test_crowding_distance_degenerate_bounds() {
        let mut pop = population(&[vec![0.0], vec![1.0], vec![3.0]]);
        assign_crowding_distance(&mut pop, &[0, 1, 2], &[(0.0, 0.0)]);
        assert_eq!(pop[1].crowding_distance, 3.0);
    }

    #[test]
    fn test_small_front_is_all_boundary() {
        let mut pop = population(&[vec![0.0], vec![1.0]]);
        assign_crowding_distance(&mut pop, &[0, 1], &[(0.0, 1.0)]);
        assert!(pop.iter().all(|c| c.crowding_distance.is_infinite()));
    }

    #[test]
    fn test_crowded_comparison() {
        let mut pop = population(&[vec![0.0], vec![0.0], vec![0.0]]);
        pop[0].rank = 1;
        pop[0].crowding_distance = 0.5;
        pop[1].rank = 1;
        pop[1].crowding_distance = f64::INFINITY;
        pop[2].rank = 2;
        pop[2].crowding_distance = f64::INFINITY;

        assert_eq!(crowded_comparison(&pop[1], &pop[0]), Ordering::Less);
        assert_eq!(crowded_comparison(&pop[0], &pop[2]), Ordering::Less);
        assert_eq!(crowded_comparison(&pop[0], &pop[0]), Ordering::Equal);
    }

    #[test]
    fn test_tournament_covering_population_picks_best() {
        let mut pop = population(&[vec![1.0], vec![3.0], vec![2.0]]);
        let fronts = fast_non_dominated_sort(&mut pop);
        for front in &fronts {
            assign_crowding_distance(&mut pop, front, &[(0.0, 3.0)]);
        }
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(tournament_select(&pop, 3, &mut rng), 1);
            assert_eq!(tournament_select(&pop, 10, &mut rng), 1);
        }
        let pick = tournament_select(&pop, 1, &mut rng);
        assert!(pick < 3);
    }

    #[test]
    fn test_select_survivors_truncates_boundary_front() {
        let pop = population(&[
            vec![0.0, 4.0],
            vec![1.0, 3.0],
            vec![2.0, 2.0],
            vec![3.0, 1.0],
            vec![4.0, 0.0],
            vec![0.0, 0.0],
        ]);
        let survivors = select_survivors(pop, 4, &[(0.0, 4.0), (0.0, 4.0)]);
        assert_eq!(survivors.len(), 4);
        assert!(survivors.iter().all(|c| c.rank == 1));
        let ids: Vec<u64> = survivors.iter().map(|c| c.id).collect();
        // Both extremes survive.
        assert!(ids.contains(&0));
        assert!(ids.contains(&4));
    }

    #[test]
    fn test_select_survivors_takes_whole_fronts() {
        let pop = population(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
        let survivors = select_survivors(pop, 2, &[(0.0, 4.0)]);
        let ids: Vec<u64> = survivors.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    proptest! {
        #[test]
        fn prop_sort_is_complete(
            scores in prop::collection::vec(prop::collection::vec(0i32..5, 2), 1..30)
        ) {
            let scores: Vec<Vec<f64>> = scores
                .into_iter()
                .map(|s| s.into_iter().map(f64::from).collect())
                .collect();
            let mut pop = population(&scores);
            let fronts = fast_non_dominated_sort(&mut pop);

            let mut seen: Vec<usize> = fronts.iter().flatten().copied().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..pop.len()).collect::<Vec<_>>());

            let undominated: Vec<usize> = (0..pop.len())
                .filter(|&i| pop[i].domination_count == 0)
                .collect();
            prop_assert_eq!(&fronts[0], &undominated);

            for (r, front) in fronts.iter().enumerate() {
                for &i in front {
                    prop_assert_eq!(pop[i].rank, r + 1);
                    // Nothing in a later front dominates anything in this one.
                    for later in &fronts[r..] {
                        for &j in later {
                            prop_assert!(!pop[j].dominates(&pop[i]));
                        }
                    }
                }
            }
        }
    }
}
