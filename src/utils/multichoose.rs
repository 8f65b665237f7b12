// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use itertools::Itertools;
use statrs::function::factorial::binomial;

/// Number of multisets of size `k` over `n` items, i.e. C(n + k - 1, k).
pub fn n_multisets(n: usize, k: usize) -> usize {
    if n == 0 {
        return if k == 0 { 1 } else { 0 };
    }
    binomial((n + k - 1) as u64, k as u64).round() as usize
}

/// Enumerate all multisets of size `k` drawn with repetition from `items`.
///
/// Multisets are given as sequences following the order of `items`, and are
/// emitted in lexicographic order of item positions. Hence, the output is
/// deterministic for identical input and free of duplicates (provided the items
/// are distinct).
pub fn multichoose<T: Clone>(k: usize, items: &[T]) -> Vec<Vec<T>> {
    let mut multisets = Vec::with_capacity(n_multisets(items.len(), k));
    multisets.extend(items.iter().cloned().combinations_with_replacement(k));
    multisets
}
