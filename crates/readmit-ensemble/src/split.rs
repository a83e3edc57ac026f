//! Stratified train/test splitting and k-fold partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use readmit_model::DataQualityError;

/// Row indices for one train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Fail unless both classes are present with at least `min_per_class` rows each.
pub fn require_both_classes(labels: &[u8], min_per_class: usize) -> readmit_model::Result<()> {
    if labels.is_empty() {
        return Err(DataQualityError::NoRecords);
    }
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 {
        return Err(DataQualityError::SingleClass(0));
    }
    if negatives == 0 {
        return Err(DataQualityError::SingleClass(1));
    }
    let smallest = positives.min(negatives);
    if smallest < min_per_class {
        return Err(DataQualityError::TooFewRecords {
            required: min_per_class,
            found: smallest,
        });
    }
    Ok(())
}

fn shuffled_classes(labels: &[u8], rng: &mut StdRng) -> [Vec<usize>; 2] {
    let mut classes = [Vec::new(), Vec::new()];
    for (index, &label) in labels.iter().enumerate() {
        classes[usize::from(label == 1)].push(index);
    }
    for class in &mut classes {
        class.shuffle(rng);
    }
    classes
}

/// Hold out `test_fraction` of each class. Both sides are returned sorted.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::new(),
        test: Vec::new(),
    };
    for class in shuffled_classes(labels, &mut rng) {
        let held_out = ((class.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
        let held_out = held_out.min(class.len().saturating_sub(1));
        split.test.extend_from_slice(&class[..held_out]);
        split.train.extend_from_slice(&class[held_out..]);
    }
    split.train.sort_unstable();
    split.test.sort_unstable();
    split
}

/// Partition rows into `k` folds, dealing each class round-robin so every
/// fold keeps the class ratio.
pub fn stratified_folds(labels: &[u8], k: usize, seed: u64) -> Vec<Split> {
    let k = k.max(2);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut next = 0;
    for class in shuffled_classes(labels, &mut rng) {
        for index in class {
            folds[next % k].push(index);
            next += 1;
        }
    }
    (0..k)
        .map(|fold| {
            let mut test = folds[fold].clone();
            test.sort_unstable();
            let mut train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != fold)
                .flat_map(|(_, rows)| rows.iter().copied())
                .collect();
            train.sort_unstable();
            Split { train, test }
        })
        .collect()
}
