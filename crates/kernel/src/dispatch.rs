//! CPU rendition of a compute dispatch: one rayon task per work group, one
//! lane per agent, disjoint output slots.

use rayon::prelude::*;

/// Number of groups needed to cover `n` agents: `ceil(n / group_size)`.
pub fn group_count(n: usize, group_size: u32) -> u32 {
    n.div_ceil(group_size.max(1) as usize) as u32
}

/// Lanes in the final group that fall past the population and do nothing.
pub fn idle_lanes(n: usize, group_size: u32) -> u32 {
    let size = group_size.max(1);
    group_count(n, size) * size - n as u32
}

/// Evaluate `kernel(index)` for every index of `out`, grouped into chunks of
/// `group_size`. The kernel must not depend on evaluation order.
pub fn dispatch<T, F>(out: &mut [T], group_size: u32, kernel: F)
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let size = group_size.max(1) as usize;
    out.par_chunks_mut(size)
        .enumerate()
        .for_each(|(group, lanes)| {
            let base = group * size;
            // the last chunk is short, so lanes past the population never run
            for (lane, slot) in lanes.iter_mut().enumerate() {
                *slot = kernel(base + lane);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_count_rounds_up() {
        assert_eq!(group_count(8192, 64), 128);
        assert_eq!(group_count(8192, 32), 256);
        assert_eq!(group_count(100, 64), 2);
        assert_eq!(group_count(1, 64), 1);
        assert_eq!(group_count(0, 64), 0);
    }

    #[test]
    fn idle_lanes_in_partial_group() {
        assert_eq!(idle_lanes(8192, 64), 0);
        assert_eq!(idle_lanes(100, 64), 28);
        assert_eq!(idle_lanes(3, 32), 29);
    }

    #[test]
    fn every_index_written_once_with_partial_group() {
        let mut out = vec![usize::MAX; 100];
        dispatch(&mut out, 64, |i| i * 2);
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, i * 2);
        }
    }

    #[test]
    fn group_size_larger_than_population() {
        let mut out = vec![0u32; 3];
        dispatch(&mut out, 256, |i| i as u32 + 1);
        assert_eq!(out, vec![1, 2, 3]);
    }
}
