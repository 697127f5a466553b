//! False-positive disparity metrics.
//!
//! All functions take decision vectors with entries in `[0, 1]`: either the
//! hard 0/1 output of one classifier or the averaged decisions of the mixture.
//! Rates over an empty set of rows are defined as 0.

use crate::dataset::Dataset;
use crate::oracle::{GroupPredicate, ThresholdOracle};
use ndarray::{ArrayView1, ArrayView2, Axis, Zip};

/// Mean decision over the rows selected by `mask`; 0 when nothing is selected.
fn masked_mean(decisions: ArrayView1<f64>, mask: impl Fn(usize) -> bool) -> f64 {
    let (sum, count) = decisions
        .iter()
        .enumerate()
        .filter(|(i, _)| mask(*i))
        .fold((0.0, 0usize), |(sum, count), (_, &d)| (sum + d, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Fraction of label-0 rows predicted as 1.
pub fn false_positive_rate(decisions: ArrayView1<f64>, labels: ArrayView1<f64>) -> f64 {
    masked_mean(decisions, |i| labels[i] == 0.0)
}

/// False-positive rate over label-0 rows inside the group described by `members`.
pub fn group_false_positive_rate(
    decisions: ArrayView1<f64>,
    labels: ArrayView1<f64>,
    members: ArrayView1<f64>,
) -> f64 {
    masked_mean(decisions, |i| labels[i] == 0.0 && members[i] == 1.0)
}

/// Mean absolute deviation of the decisions from the labels.
pub fn mixture_error(decisions: ArrayView1<f64>, labels: ArrayView1<f64>) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    Zip::from(&decisions)
        .and(&labels)
        .fold(0.0, |acc, &d, &y| acc + (d - y).abs())
        / labels.len() as f64
}

/// Absolute gap between a single classifier's overall FP rate and its FP rate on `group`.
pub fn disparity<C: ThresholdOracle>(classifier: &C, data: &Dataset, group: &GroupPredicate) -> f64 {
    let decisions = classifier.predict(data.features());
    let members = group.predict(data.sensitive());
    let labels = data.labels();

    let in_group_negatives = labels
        .iter()
        .zip(members.iter())
        .filter(|&(&y, &g)| y == 0.0 && g == 1.0)
        .count();
    if in_group_negatives == 0 {
        return 0.0;
    }

    let overall = false_positive_rate(decisions.view(), labels);
    let in_group = group_false_positive_rate(decisions.view(), labels, members.view());
    (overall - in_group).abs()
}

/// For each sensitive column, splits rows at the column mean and reports the
/// larger absolute FP disparity of the two halves against `fp`.
pub fn marginal_unfairness(
    decisions: ArrayView1<f64>,
    sensitive: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    fp: f64,
) -> Vec<f64> {
    let Some(means) = sensitive.mean_axis(Axis(0)) else {
        return vec![0.0; sensitive.ncols()];
    };

    sensitive
        .axis_iter(Axis(1))
        .zip(means.iter())
        .map(|(column, &mean)| {
            let above = masked_mean(decisions, |i| labels[i] == 0.0 && column[i] > mean);
            let below = masked_mean(decisions, |i| labels[i] == 0.0 && column[i] <= mean);
            (above - fp).abs().max((below - fp).abs())
        })
        .collect()
}

/// Error of the newest classifier plus the budget-scaled, prevalence-weighted
/// FP disparity summed over the groups discovered before it.
pub fn lagrangian_value(
    groups: &[GroupPredicate],
    decisions: ArrayView1<f64>,
    budget: f64,
    fp: f64,
    data: &Dataset,
) -> f64 {
    let error = mixture_error(decisions, data.labels());
    if groups.is_empty() {
        return error;
    }

    let n = data.len() as f64;
    let labels = data.labels();
    let penalty: f64 = groups
        .iter()
        .map(|group| {
            let members = group.predict(data.sensitive());
            let fp_group = group_false_positive_rate(decisions, labels, members.view());
            let mass_0 = labels
                .iter()
                .zip(members.iter())
                .filter(|&(&y, &g)| y == 0.0 && g == 1.0)
                .count() as f64
                / n;
            (fp_group - fp) * mass_0
        })
        .sum();

    error + budget / groups.len() as f64 * penalty
}
