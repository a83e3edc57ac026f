//! Per-sample class weights.

/// Weight of every sample. With `balanced`, class `c` gets `n / (classes * count_c)`.
pub fn sample_weights(labels: &[u8], balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; labels.len()];
    }
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let negatives = labels.len() - positives;
    let classes = usize::from(positives > 0) + usize::from(negatives > 0);
    let weight_for = |count: usize| {
        if count == 0 {
            0.0
        } else {
            labels.len() as f64 / (classes * count) as f64
        }
    };
    let (positive_weight, negative_weight) = (weight_for(positives), weight_for(negatives));
    labels
        .iter()
        .map(|&label| if label == 1 { positive_weight } else { negative_weight })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_weights_equalise_class_mass() {
        let weights = sample_weights(&[1, 0, 0, 0], true);
        assert_eq!(weights, vec![2.0, 2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0]);
        let positive_mass: f64 = weights[..1].iter().sum();
        let negative_mass: f64 = weights[1..].iter().sum();
        assert!((positive_mass - negative_mass).abs() < 1e-12);
    }

    #[test]
    fn unbalanced_weights_are_unit() {
        assert_eq!(sample_weights(&[1, 0, 0], false), vec![1.0; 3]);
    }
}
