//! Weighted random selection.
//!
//! The draw walks the candidates in the order given, so callers that need
//! reproducible results must pass a stable ordering (e.g. by primary key).

use rand::Rng;

pub trait Weighted {
    /// Relative weight. Zero (or a non-positive source value) means "never drawn".
    fn weight(&self) -> u64;
}

/// 按权重随机抽取一个元素，概率 = weight_i / Σ weight
///
/// 返回 `None` 表示没有可抽取的元素（列表为空或权重之和为 0）。
pub fn pick_weighted<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    let total: u64 = items.iter().map(Weighted::weight).sum();
    if total == 0 {
        return None;
    }

    let pick = rng.gen_range(0..total);
    let mut acc = 0u64;
    for item in items {
        acc += item.weight();
        if pick < acc {
            return Some(item);
        }
    }

    // acc == total > pick, so the loop always returns
    None
}

/// 展示用概率（百分比），与 `pick_weighted` 的实际概率一致
pub fn probability_percentages<T: Weighted>(items: &[T]) -> Vec<f64> {
    let total: u64 = items.iter().map(Weighted::weight).sum();
    items
        .iter()
        .map(|item| {
            if total == 0 {
                0.0
            } else {
                item.weight() as f64 / total as f64 * 100.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct W(u64);

    impl Weighted for W {
        fn weight(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_distribution_converges_to_weights() {
        let items = [W(1), W(3), W(6)];
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 100_000;
        let mut counts = [0usize; 3];
        for _ in 0..draws {
            let picked = pick_weighted(&items, &mut rng).unwrap();
            let idx = items.iter().position(|w| std::ptr::eq(w, picked)).unwrap();
            counts[idx] += 1;
        }
        let expected = [0.1, 0.3, 0.6];
        for (count, want) in counts.iter().zip(expected) {
            let got = *count as f64 / draws as f64;
            assert!((got - want).abs() < 0.01, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_zero_weight_is_never_picked() {
        let items = [W(0), W(5), W(0)];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let picked = pick_weighted(&items, &mut rng).unwrap();
            assert_eq!(picked.0, 5);
        }
    }

    #[test]
    fn test_empty_or_all_zero_returns_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty: [W; 0] = [];
        assert!(pick_weighted(&empty, &mut rng).is_none());
        assert!(pick_weighted(&[W(0), W(0)], &mut rng).is_none());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let items = [W(2), W(2), W(2), W(2)];
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let x = pick_weighted(&items, &mut a).unwrap() as *const W;
            let y = pick_weighted(&items, &mut b).unwrap() as *const W;
            assert_eq!(x, y);
        }
    }

    #[test]
    fn test_probability_percentages() {
        let pct = probability_percentages(&[W(1), W(9)]);
        assert!((pct[0] - 10.0).abs() < 1e-9);
        assert!((pct[1] - 90.0).abs() < 1e-9);
        assert_eq!(probability_percentages(&[W(0)]), vec![0.0]);
    }
}
