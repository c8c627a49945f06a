//! Cohort selection for the splitting step.
//!
//! Eliminates the `npart` smallest *distinct* level values, ties included:
//! a max-order-statistic elimination, not a fixed-count top-k. The number
//! of particles actually killed per iteration varies with how many ties
//! sit at the boundary.

/// Partition particle indices into a kill set and a survive set.
///
/// Returns `(kill, survive)`, both in ascending index order. The kill set
/// holds every index whose level equals one of the `npart` smallest
/// distinct values in `levels`; the survive set is the complement, used
/// exclusively as a pool of cloning donors.
///
/// When the requested elimination would remove every distinct value
/// (`npart >= ` number of distinct levels), the selection is degenerate:
/// there would be no survivor left to clone from, and both sets come back
/// empty. The controller treats that as ensemble extinction, not an error.
#[must_use]
pub fn selection_step(levels: &[f64], npart: usize) -> (Vec<usize>, Vec<usize>) {
    if npart == 0 {
        return (Vec::new(), (0..levels.len()).collect());
    }

    let mut distinct: Vec<f64> = levels.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    if distinct.len() <= npart {
        return (Vec::new(), Vec::new());
    }

    // Every level at or below the npart-th smallest distinct value dies.
    let cutoff = distinct[npart - 1];
    let (kill, survive) = (0..levels.len()).partition(|&i| levels[i] <= cutoff);
    (kill, survive)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LEVELS: [f64; 6] = [0.5, 1.1, 0.2, 0.6, 0.2, 0.5];

    #[test]
    fn test_single_minimum() {
        let (kill, survive) = selection_step(&LEVELS[..4], 1);
        assert_eq!(kill, vec![2]);
        assert_eq!(survive, vec![0, 1, 3]);
    }

    #[test]
    fn test_tied_minimum_kills_all_ties() {
        let (kill, survive) = selection_step(&LEVELS, 1);
        assert_eq!(kill, vec![2, 4]);
        assert_eq!(survive, vec![0, 1, 3, 5]);
    }

    #[test]
    fn test_two_distinct_values() {
        let (kill, _) = selection_step(&LEVELS[..4], 2);
        assert_eq!(kill, vec![0, 2]);

        let (kill, _) = selection_step(&LEVELS[..5], 2);
        assert_eq!(kill, vec![0, 2, 4]);

        let (kill, survive) = selection_step(&LEVELS, 2);
        assert_eq!(kill, vec![0, 2, 4, 5]);
        assert_eq!(survive, vec![1, 3]);
    }

    #[test]
    fn test_three_distinct_values() {
        let (kill, survive) = selection_step(&LEVELS, 3);
        assert_eq!(kill, vec![0, 2, 3, 4, 5]);
        assert_eq!(survive, vec![1]);
    }

    #[test]
    fn test_degenerate_when_all_values_eliminated() {
        // LEVELS holds 4 distinct values; asking for 4 or more would kill
        // the global maximum too, leaving no donors.
        let (kill, survive) = selection_step(&LEVELS, 4);
        assert!(kill.is_empty());
        assert!(survive.is_empty());

        let (kill, survive) = selection_step(&LEVELS, 5);
        assert!(kill.is_empty());
        assert!(survive.is_empty());
    }

    #[test]
    fn test_uniform_levels_are_degenerate() {
        let (kill, survive) = selection_step(&[0.7; 8], 1);
        assert!(kill.is_empty());
        assert!(survive.is_empty());
    }

    #[test]
    fn test_npart_zero_kills_nothing() {
        let (kill, survive) = selection_step(&LEVELS, 0);
        assert!(kill.is_empty());
        assert_eq!(survive, vec![0, 1, 2, 3, 4, 5]);
    }
}
