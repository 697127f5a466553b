//! # Dual Player: Worst-Subgroup Search
//!
//! Restricted to label-0 rows, the auditor proposes a linear threshold group over
//! the sensitive features and measures how far the mixture's false-positive rate
//! inside that group sits from the population rate.
//!
//! The default [`AuditorKind::Random`] search draws one random hyperplane per call
//! instead of optimising over the class. It is a heuristic stand-in for a true
//! best response and is kept deliberately: the dynamics of the game depend on it.
//! [`AuditorKind::Regression`] replaces the draw with a fitted cost-sensitive
//! oracle in each direction and keeps whichever group is worse once weighted by
//! its prevalence.

use crate::config::AuditorKind;
use crate::dataset::Dataset;
use crate::oracle::{GroupPredicate, RandomThreshold, RegressionOracle, ThresholdOracle};
use crate::regression::RegressionError;
use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Everything the auditor learned about one candidate group.
#[derive(Debug, Clone)]
pub struct GroupAudit {
    pub predicate: GroupPredicate,
    /// `|fp_group - fp|`.
    pub disparity: f64,
    /// `fp_group - fp`.
    pub signed_disparity: f64,
    /// Mixture FP rate inside the group; 0 when the group has no label-0 rows.
    pub group_fp_rate: f64,
    /// Mean `|member - A|` over label-0 rows: how closely the group tracks the mixture.
    pub group_error: f64,
    /// Group membership of each label-0 row.
    pub negative_members: Array1<f64>,
}

impl GroupAudit {
    /// Sign of the disparity with `sign(0) = 0`.
    pub fn sign(&self) -> f64 {
        if self.signed_disparity > 0.0 {
            1.0
        } else if self.signed_disparity < 0.0 {
            -1.0
        } else {
            0.0
        }
    }

    /// Group members among label-0 rows.
    pub fn negative_member_count(&self) -> usize {
        self.negative_members.iter().filter(|&&g| g == 1.0).count()
    }

    /// Label-0 group members as a share of the whole population.
    pub fn group_mass_0(&self, population: usize) -> f64 {
        if population == 0 {
            return 0.0;
        }
        self.negative_member_count() as f64 / population as f64
    }

    /// Label-0 group members as a share of the label-0 rows.
    pub fn group_size(&self) -> f64 {
        if self.negative_members.is_empty() {
            return 0.0;
        }
        self.negative_member_count() as f64 / self.negative_members.len() as f64
    }
}

/// Scores `predicate` against the mixture decisions on label-0 rows.
pub fn evaluate_group(
    predicate: GroupPredicate,
    negative_decisions: ArrayView1<f64>,
    negative_sensitive: ArrayView2<f64>,
    fp: f64,
) -> GroupAudit {
    let members = predicate.predict(negative_sensitive);

    let (sum, count) = Zip::from(&negative_decisions).and(&members).fold(
        (0.0, 0usize),
        |(sum, count), &a, &g| {
            if g == 1.0 { (sum + a, count + 1) } else { (sum, count) }
        },
    );
    let group_fp_rate = if count == 0 { 0.0 } else { sum / count as f64 };

    let group_error = if members.is_empty() {
        0.0
    } else {
        Zip::from(&members)
            .and(&negative_decisions)
            .fold(0.0, |acc, &g, &a| acc + (g - a).abs())
            / members.len() as f64
    };

    let signed_disparity = group_fp_rate - fp;
    GroupAudit {
        predicate,
        disparity: signed_disparity.abs(),
        signed_disparity,
        group_fp_rate,
        group_error,
        negative_members: members,
    }
}

/// The auditor owns its random stream so that a run is reproducible from its seed.
#[derive(Debug, Clone)]
pub struct Auditor {
    kind: AuditorKind,
    rng: StdRng,
}

impl Auditor {
    pub fn new(kind: AuditorKind, seed: u64) -> Self {
        Self {
            kind,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn kind(&self) -> AuditorKind {
        self.kind
    }

    /// Finds the group with the worst FP disparity against the mixture decisions `decisions`.
    pub fn find_worst_group(
        &mut self,
        decisions: ArrayView1<f64>,
        data: &Dataset,
        negative_sensitive: ArrayView2<f64>,
        fp: f64,
    ) -> Result<GroupAudit, RegressionError> {
        let negative_decisions = data.restrict_to_negatives(decisions);

        // With no label-0 rows there is nothing to fit; a random candidate stands in.
        if self.kind == AuditorKind::Random || negative_decisions.is_empty() {
            let threshold = RandomThreshold::sample(negative_sensitive.ncols(), &mut self.rng);
            return Ok(evaluate_group(
                GroupPredicate::Random(threshold),
                negative_decisions.view(),
                negative_sensitive,
                fp,
            ));
        }

        let n = data.len() as f64;
        let zero_cost = Array1::<f64>::zeros(negative_decisions.len());
        let below_cost = negative_decisions.mapv(|a| (a - fp) / n);
        let above_cost = negative_decisions.mapv(|a| (fp - a) / n);

        let below = RegressionOracle::fit(negative_sensitive, zero_cost.view(), below_cost.view())?;
        let above = RegressionOracle::fit(negative_sensitive, zero_cost.view(), above_cost.view())?;

        let below = evaluate_group(
            GroupPredicate::Fitted(below),
            negative_decisions.view(),
            negative_sensitive,
            fp,
        );
        let above = evaluate_group(
            GroupPredicate::Fitted(above),
            negative_decisions.view(),
            negative_sensitive,
            fp,
        );

        let population = data.len();
        let weighted = |audit: &GroupAudit| audit.disparity * audit.group_mass_0(population);
        if weighted(&above) >= weighted(&below) {
            Ok(above)
        } else {
            Ok(below)
        }
    }
}
