/// Min, max, median and mean over a set of per-transaction values. All
/// values are 0 when there are no values (e.g. a block with only a coinbase).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DistributionStats {
    pub min: i64,
    pub max: i64,
    pub median: i64,
    pub avg: i64,
}

impl DistributionStats {
    pub fn from_values(mut values: Vec<i64>) -> DistributionStats {
        if values.is_empty() {
            return DistributionStats::default();
        }
        // Don't rely on the order the values were collected in.
        values.sort_unstable();

        let count = values.len();
        let sum: i64 = values.iter().sum();
        DistributionStats {
            min: values[0],
            max: values[count - 1],
            median: truncated_median(&values),
            avg: sum.div_euclid(count as i64),
        }
    }
}

/// Median of already sorted values. For an even number of values, the
/// mean of the two middle values rounded down.
fn truncated_median(sorted: &[i64]) -> i64 {
    let size = sorted.len();
    if size == 0 {
        return 0;
    }
    if size % 2 == 0 {
        (sorted[size / 2 - 1] + sorted[size / 2]).div_euclid(2)
    } else {
        sorted[size / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::DistributionStats;
    use rand::seq::SliceRandom;

    #[test]
    fn test_empty() {
        assert_eq!(
            DistributionStats::from_values(vec![]),
            DistributionStats {
                min: 0,
                max: 0,
                median: 0,
                avg: 0
            }
        );
    }

    #[test]
    fn test_single_value() {
        let d = DistributionStats::from_values(vec![3760]);
        assert_eq!(d.min, 3760);
        assert_eq!(d.max, 3760);
        assert_eq!(d.median, 3760);
        assert_eq!(d.avg, 3760);
    }

    #[test]
    fn test_odd_count() {
        let d = DistributionStats::from_values(vec![3320, 49800, 3760]);
        assert_eq!(d.min, 3320);
        assert_eq!(d.max, 49800);
        assert_eq!(d.median, 3760);
        // 56880 / 3
        assert_eq!(d.avg, 18960);
    }

    #[test]
    fn test_even_count_median_rounds_down() {
        let d = DistributionStats::from_values(vec![4, 1, 2, 7]);
        // (2 + 4) / 2
        assert_eq!(d.median, 3);
        let d = DistributionStats::from_values(vec![1, 2, 3, 5]);
        // (2 + 3) / 2 = 2.5
        assert_eq!(d.median, 2);
        // 11 / 4 = 2.75
        assert_eq!(d.avg, 2);
    }

    #[test]
    fn test_negative_values_round_down() {
        let d = DistributionStats::from_values(vec![-3, 0]);
        assert_eq!(d.min, -3);
        assert_eq!(d.max, 0);
        assert_eq!(d.median, -2);
        assert_eq!(d.avg, -2);
    }

    #[test]
    fn test_order_independent() {
        let values: Vec<i64> = vec![192, 226, 225, 188, 247, 250, 1105, 631, 340, 223];
        let expected = DistributionStats::from_values(values.clone());
        assert_eq!(expected.min, 188);
        assert_eq!(expected.max, 1105);
        // (226 + 247) / 2
        assert_eq!(expected.median, 236);

        let mut rng = rand::rng();
        for _ in 0..20 {
            let mut shuffled = values.clone();
            shuffled.shuffle(&mut rng);
            assert_eq!(DistributionStats::from_values(shuffled), expected);
        }
    }
}
