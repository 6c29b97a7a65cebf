use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::error::{PrepError, Result};
use crate::types::{ManifestRow, SampleGroups, TEST_A_PREFIX, TEST_B_PREFIX, TRAIN_PREFIX};

/// Tolerance applied before rounding the validation count up, so that
/// products like `0.1 * 30` do not gain a sample from float noise.
const SIZE_EPSILON: f64 = 1e-9;

/// Split the manifest into train, validation, testA and testB groups.
///
/// `testA_` and `testB_` rows are taken as they are. `train_` rows are split
/// so that each grade gives up about `val_size` of its members to the
/// validation group. Rows with any other prefix are ignored.
///
/// Without a `seed` the split is drawn from OS entropy and differs from run
/// to run.
pub fn split_samples(
    rows: &[ManifestRow],
    val_size: f64,
    seed: Option<u64>,
) -> Result<SampleGroups> {
    if !(val_size > 0.0 && val_size < 1.0) {
        return Err(PrepError::InvalidFraction(val_size));
    }

    let mut pool = Vec::new();
    let mut groups = SampleGroups::default();
    for row in rows {
        if row.name.starts_with(TEST_A_PREFIX) {
            groups.test_a.push(row.name.clone());
        } else if row.name.starts_with(TEST_B_PREFIX) {
            groups.test_b.push(row.name.clone());
        } else if row.name.starts_with(TRAIN_PREFIX) {
            pool.push(row);
        } else {
            debug!("Ignoring manifest row `{}`", row.name);
        }
    }

    let (codes, classes) = factorize(pool.iter().map(|row| row.grade.as_str()));
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (train_idx, val_idx) = stratified_split(&codes, &classes, val_size, &mut rng)?;

    groups.train = train_idx.iter().map(|&i| pool[i].name.clone()).collect();
    groups.val = val_idx.iter().map(|&i| pool[i].name.clone()).collect();

    info!(
        "Split {} training candidates into {} train / {} val; testA {}, testB {}",
        pool.len(),
        groups.train.len(),
        groups.val.len(),
        groups.test_a.len(),
        groups.test_b.len()
    );
    for (code, grade) in classes.iter().enumerate() {
        let in_val = val_idx.iter().filter(|&&i| codes[i] == code).count();
        let total = codes.iter().filter(|&&c| c == code).count();
        info!("  grade `{}`: {}/{} held out", grade, in_val, total);
    }

    Ok(groups)
}

/// Encode labels as dense integers in order of first appearance.
///
/// Returns the code of every label and the distinct labels indexed by code.
pub fn factorize<'a, I>(labels: I) -> (Vec<usize>, Vec<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut lookup: HashMap<&'a str, usize> = HashMap::new();
    let mut classes = Vec::new();
    let codes = labels
        .into_iter()
        .map(|label| {
            *lookup.entry(label).or_insert_with(|| {
                classes.push(label.to_string());
                classes.len() - 1
            })
        })
        .collect();
    (codes, classes)
}

/// Stratified shuffle split of the samples labelled by `codes`.
///
/// The validation side receives `ceil(val_size * n)` samples. Per-class
/// quotas come from [`approximate_mode`], first for the train side and then
/// for the validation side out of what is left, so every sample lands in
/// exactly one side. Returns `(train, val)` as indices into `codes`, each in
/// random order.
pub fn stratified_split<R: Rng + ?Sized>(
    codes: &[usize],
    classes: &[String],
    val_size: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_samples = codes.len();
    if n_samples == 0 {
        return Err(PrepError::EmptyTrainPool);
    }

    let n_val = ((val_size * n_samples as f64) - SIZE_EPSILON).ceil().max(0.0) as usize;
    let n_train = n_samples - n_val.min(n_samples);

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
    for (i, &code) in codes.iter().enumerate() {
        members[code].push(i);
    }
    let counts: Vec<usize> = members.iter().map(Vec::len).collect();

    if let Some((code, &count)) = counts.iter().enumerate().min_by_key(|&(_, &c)| c) {
        if count < 2 {
            return Err(PrepError::ClassTooSmall {
                grade: classes[code].clone(),
                count,
            });
        }
    }
    if n_train < classes.len() {
        return Err(PrepError::SplitTooSmall {
            side: "train",
            size: n_train,
            classes: classes.len(),
        });
    }
    if n_val < classes.len() {
        return Err(PrepError::SplitTooSmall {
            side: "validation",
            size: n_val,
            classes: classes.len(),
        });
    }

    let train_quota = approximate_mode(&counts, n_train, rng);
    let remaining: Vec<usize> = counts
        .iter()
        .zip(&train_quota)
        .map(|(count, taken)| count - taken)
        .collect();
    let val_quota = approximate_mode(&remaining, n_val, rng);

    let mut train = Vec::with_capacity(n_train);
    let mut val = Vec::with_capacity(n_val);
    for ((mut idx, n_i), t_i) in members.into_iter().zip(train_quota).zip(val_quota) {
        idx.shuffle(rng);
        train.extend_from_slice(&idx[..n_i]);
        val.extend_from_slice(&idx[n_i..n_i + t_i]);
    }
    train.shuffle(rng);
    val.shuffle(rng);

    Ok((train, val))
}

/// Distribute `n_draws` over classes proportionally to `counts`.
///
/// Each class gets the floor of its exact share; the leftover draws go to
/// the classes with the largest remainders, with ties broken at random.
/// The result never exceeds `counts` and sums to `n_draws` when
/// `n_draws <= sum(counts)`.
pub fn approximate_mode<R: Rng + ?Sized>(counts: &[usize], n_draws: usize, rng: &mut R) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let mut quota: Vec<usize> = counts.iter().map(|c| c * n_draws / total).collect();
    let remainders: Vec<usize> = counts.iter().map(|c| c * n_draws % total).collect();
    let mut need = n_draws.saturating_sub(quota.iter().sum());

    let mut levels = remainders.clone();
    levels.sort_unstable_by(|a, b| b.cmp(a));
    levels.dedup();
    for level in levels {
        if need == 0 || level == 0 {
            break;
        }
        let tied: Vec<usize> = (0..counts.len())
            .filter(|&i| remainders[i] == level)
            .collect();
        let add_now = tied.len().min(need);
        for &i in tied.choose_multiple(rng, add_now) {
            quota[i] += 1;
        }
        need -= add_now;
    }
    quota
}
