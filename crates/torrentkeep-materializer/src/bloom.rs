//! Scalable counting Bloom filter used by the `Bloom` GC variant.

use sha1::{Digest, Sha1};

/// One layer of the scalable counting Bloom filter.
///
/// Immutable in shape after construction: `m` (counter array length) and `k`
/// (probes per element) never change once a layer is allocated.
struct Layer {
    counters: Vec<u8>,
    m: usize,
    k: usize,
    element_count: usize,
}

impl Layer {
    #[allow(clippy::cast_precision_loss)]
    fn new(expected_elements: usize, error_rate: f64) -> Self {
        let n = expected_elements.max(1) as f64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let m = (-n * error_rate.ln() / (std::f64::consts::LN_2.powi(2))).ceil() as usize;
        let m = m.max(1);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil() as usize;
        let k = k.clamp(1, 32);

        Self {
            counters: vec![0_u8; m],
            m,
            k,
            element_count: 0,
        }
    }

    fn probes(&self, element: &str) -> Vec<usize> {
        let digest = Sha1::digest(element.as_bytes());
        let h1 = u64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]));
        let h2 = u64::from(u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]));
        #[allow(clippy::cast_possible_truncation)]
        (0..self.k)
            .map(|j| (h1.wrapping_add(j as u64 * h2) as usize) % self.m)
            .collect()
    }

    fn add(&mut self, element: &str) {
        for index in self.probes(element) {
            self.counters[index] = self.counters[index].saturating_add(1);
        }
        self.element_count += 1;
    }

    fn contains(&self, element: &str) -> bool {
        self.probes(element).into_iter().all(|index| self.counters[index] > 0)
    }

    /// Decrement every probed counter, returning `true` if the element
    /// appeared present (all counters were non-zero beforehand).
    fn remove(&mut self, element: &str) -> bool {
        let probes = self.probes(element);
        if !probes.iter().all(|&index| self.counters[index] > 0) {
            return false;
        }
        for index in probes {
            self.counters[index] = self.counters[index].saturating_sub(1);
        }
        self.element_count = self.element_count.saturating_sub(1);
        true
    }

    #[allow(clippy::cast_precision_loss)]
    fn load_factor(&self) -> f64 {
        let capacity = self.m as f64 / self.k as f64;
        self.element_count as f64 / capacity
    }
}

/// A scalable counting Bloom filter: an append-only sequence of layers, each
/// sized for a target error rate, growing as elements are added.
pub(crate) struct ScalableCountingBloom {
    layers: Vec<Layer>,
    base_error_rate: f64,
    base_capacity: usize,
}

impl ScalableCountingBloom {
    /// Construct a filter whose first layer targets `error_rate` over
    /// `initial_capacity` elements (the first layer is allocated with half
    /// that error budget, per the layering design).
    #[must_use]
    pub(crate) fn new(initial_capacity: usize, error_rate: f64) -> Self {
        let mut filter = Self {
            layers: Vec::new(),
            base_error_rate: error_rate,
            base_capacity: initial_capacity,
        };
        filter
            .layers
            .push(Layer::new(initial_capacity, error_rate / 2.0));
        filter
    }

    /// Number of layers currently allocated.
    #[must_use]
    pub(crate) fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Insert `element`, growing a new layer first if the latest layer's
    /// load factor exceeds 0.75.
    pub(crate) fn add(&mut self, element: &str) {
        if self
            .layers
            .last()
            .is_some_and(|layer| layer.load_factor() > 0.75)
        {
            self.grow();
        }
        if let Some(layer) = self.layers.last_mut() {
            layer.add(element);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn grow(&mut self) {
        let remaining_budget = self.base_error_rate / 2.0_f64.powi((self.layers.len() + 1) as i32);
        let doubled_capacity = self.base_capacity * 2_usize.pow(self.layers.len() as u32);
        self.layers.push(Layer::new(doubled_capacity, remaining_budget));
    }

    /// Returns true iff any layer shows all `k` probes present.
    #[must_use]
    pub(crate) fn contains(&self, element: &str) -> bool {
        self.layers.iter().any(|layer| layer.contains(element))
    }

    /// Decrement the newest layer in which `element` appears to be present.
    /// Returns `true` if a layer was decremented.
    pub(crate) fn remove(&mut self, element: &str) -> bool {
        for layer in self.layers.iter_mut().rev() {
            if layer.remove(element) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_true_for_every_added_element() {
        let mut filter = ScalableCountingBloom::new(64, 0.01);
        let elements: Vec<String> = (0..50).map(|i| format!("/strm/movie-{i}.strm")).collect();
        for element in &elements {
            filter.add(element);
        }
        for element in &elements {
            assert!(filter.contains(element));
        }
    }

    #[test]
    fn remove_restores_element_count_after_matching_adds() {
        let mut filter = ScalableCountingBloom::new(64, 0.01);
        let elements: Vec<String> = (0..10).map(|i| format!("/strm/show-{i}.strm")).collect();
        for element in &elements {
            filter.add(element);
        }
        let before: usize = filter.layers.iter().map(|l| l.element_count).sum();
        for element in &elements {
            assert!(filter.remove(element));
        }
        let after: usize = filter.layers.iter().map(|l| l.element_count).sum();
        assert_eq!(before - elements.len(), after);
    }

    #[test]
    fn grows_a_new_layer_once_load_factor_exceeds_threshold() {
        let mut filter = ScalableCountingBloom::new(4, 0.1);
        for i in 0..64 {
            filter.add(&format!("/strm/item-{i}.strm"));
        }
        assert!(filter.layer_count() > 1);
    }
}
