//! # Fictitious Play Driver
//!
//! Orchestrates the two-player game between the cost-sensitive learner and the
//! subgroup auditor:
//!
//! 1. Blend the newest classifier into the running mixture decisions `A` and the
//!    running false-positive rate `FP`, both as `1/t`-weighted averages.
//! 2. Ask the auditor for the worst group against the current mixture.
//! 3. Turn the auditor's finding into the next cost vector.
//! 4. Best-respond to those costs with a fresh classifier and append it to the
//!    mixture.
//!
//! All run state lives in [`MixtureState`], owned exclusively by [`FictitiousPlay`].
//! The update rules are the free functions [`blend_decisions`] and [`blend_rate`],
//! so each can be tested apart from the loop.

use crate::auditor::{Auditor, GroupAudit};
use crate::config::{AuditConfig, ConfigError};
use crate::costs::{CostError, CostUpdate, initial_costs, update_costs};
use crate::dataset::Dataset;
use crate::learner::{LearnerError, best_response, fit_weighted};
use crate::metrics::{
    disparity, false_positive_rate, lagrangian_value, marginal_unfairness, mixture_error,
};
use crate::oracle::{Classifier, GroupPredicate, ThresholdOracle};
use crate::regression::RegressionError;
use ndarray::{Array1, Array2, ArrayView1, Zip};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(
        "Every label in the dataset is {0}; the learner needs both label values to fit its cost regressions."
    )]
    DegenerateLabels(f64),
    #[error("Primal best response failed: {0}")]
    Learner(#[from] LearnerError),
    #[error("Subgroup search failed: {0}")]
    Auditor(#[from] RegressionError),
    #[error("Cost update failed: {0}")]
    Costs(#[from] CostError),
}

/// `A_t = A_{t-1} * (t-1)/t + latest / t`.
pub fn blend_decisions(
    previous: ArrayView1<f64>,
    latest: ArrayView1<f64>,
    iteration: usize,
) -> Array1<f64> {
    let t = iteration as f64;
    Zip::from(&previous)
        .and(&latest)
        .map_collect(|&a, &p| a * ((t - 1.0) / t) + p * (1.0 / t))
}

/// `FP_t = FP_{t-1} * (t-1)/t + latest / t`.
pub fn blend_rate(previous: f64, latest: f64, iteration: usize) -> f64 {
    let t = iteration as f64;
    ((t - 1.0) / t) * previous + latest * (1.0 / t)
}

/// Mutable state of a run.
#[derive(Debug, Clone)]
pub struct MixtureState {
    /// Round that the next call to `step` will play.
    iteration: usize,
    /// Running mixture decisions `A`, one per row.
    decisions: Array1<f64>,
    /// Running mixture false-positive rate `FP`.
    false_positive_rate: f64,
    /// Cost of answering 1 for each label-0 row, `c_1`.
    costs: Array1<f64>,
    /// Mixture members `p[1..]`, in the order they were fitted.
    classifiers: Vec<Classifier>,
    /// One discovered group per played round.
    groups: Vec<GroupPredicate>,
    /// Rows that have belonged to at least one discovered group.
    group_membership: Array1<bool>,
}

impl MixtureState {
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn decisions(&self) -> ArrayView1<'_, f64> {
        self.decisions.view()
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    pub fn costs(&self) -> ArrayView1<'_, f64> {
        self.costs.view()
    }

    pub fn classifiers(&self) -> &[Classifier] {
        &self.classifiers
    }

    pub fn groups(&self) -> &[GroupPredicate] {
        &self.groups
    }

    /// Number of rows covered by at least one discovered group.
    pub fn cumulative_group_members(&self) -> usize {
        self.group_membership.iter().filter(|&&m| m).count()
    }
}

/// Diagnostics of one played round.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    /// Error of the mixture over the first `iteration` classifiers.
    pub error: f64,
    /// Mixture false-positive rate after this round.
    pub false_positive_rate: f64,
    /// `|fp_group - FP|` for the discovered group.
    pub disparity: f64,
    pub signed_disparity: f64,
    /// Group members among label-0 rows, as a share of label-0 rows.
    pub group_size: f64,
    /// Group members among label-0 rows, as a share of all rows.
    pub group_mass_0: f64,
    pub cumulative_group_members: usize,
    pub lagrangian: f64,
    /// FP disparity of the freshly fitted classifier on the previous round's group.
    pub refit_disparity: f64,
    pub marginal_unfairness: Vec<f64>,
    /// Whether the discovered group moved the costs.
    pub penalized: bool,
}

/// Everything a finished run hands back.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub classifiers: Vec<Classifier>,
    pub groups: Vec<GroupPredicate>,
    pub history: Vec<IterationReport>,
    pub final_decisions: Array1<f64>,
    pub final_false_positive_rate: f64,
}

/// The fictitious-play game over one dataset.
pub struct FictitiousPlay<'a> {
    data: &'a Dataset,
    config: AuditConfig,
    negative_sensitive: Array2<f64>,
    auditor: Auditor,
    state: MixtureState,
    history: Vec<IterationReport>,
    finished: bool,
}

impl<'a> FictitiousPlay<'a> {
    /// Validates the inputs and fits the opening classifier on baseline costs.
    pub fn new(data: &'a Dataset, config: AuditConfig) -> Result<Self, PlayError> {
        config.validate()?;
        if data.has_single_label() {
            return Err(PlayError::DegenerateLabels(data.labels()[0]));
        }

        let n = data.len();
        let costs = initial_costs(n, data.negative_count());
        let opening = best_response(costs.view(), data, 1.0)?;

        log::info!(
            "Starting fictitious play: {} rows ({} label-0), {} features, {} sensitive, B = {}, beta = {}, formulation = {}, auditor = {}, seed = {}",
            n,
            data.negative_count(),
            data.features().ncols(),
            data.sensitive().ncols(),
            config.budget,
            config.beta,
            config.fairness,
            config.auditor,
            config.seed
        );

        let state = MixtureState {
            iteration: 1,
            decisions: Array1::zeros(n),
            false_positive_rate: 0.0,
            costs,
            classifiers: vec![opening],
            groups: Vec::new(),
            group_membership: Array1::from_elem(n, false),
        };

        Ok(Self {
            data,
            negative_sensitive: data.negative_sensitive(),
            auditor: Auditor::new(config.auditor, config.seed),
            config,
            state,
            history: Vec::new(),
            finished: false,
        })
    }

    pub fn state(&self) -> &MixtureState {
        &self.state
    }

    pub fn history(&self) -> &[IterationReport] {
        &self.history
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// True once the iteration cap is reached or early stopping fired.
    pub fn is_finished(&self) -> bool {
        self.finished || self.state.iteration > self.config.max_iterations
    }

    /// Error and FP rate of the unconstrained error-minimising classifier.
    pub fn baseline(&self) -> Result<(f64, f64), PlayError> {
        let classifier = fit_weighted(Array1::ones(self.data.len()).view(), self.data)?;
        let decisions = classifier.predict(self.data.features());
        Ok((
            mixture_error(decisions.view(), self.data.labels()),
            false_positive_rate(decisions.view(), self.data.labels()),
        ))
    }

    /// Plays one round and returns its diagnostics.
    pub fn step(&mut self) -> Result<IterationReport, PlayError> {
        let data = self.data;
        let t = self.state.iteration;
        let eta = 1.0 / t as f64;

        // 1-2. Fold the newest classifier into the running averages.
        let latest = match self.state.classifiers.last() {
            Some(classifier) => classifier.predict(data.features()),
            None => Array1::zeros(data.len()),
        };
        self.state.decisions = blend_decisions(self.state.decisions.view(), latest.view(), t);
        let error = mixture_error(self.state.decisions.view(), data.labels());
        let latest_fp = false_positive_rate(latest.view(), data.labels());
        self.state.false_positive_rate = blend_rate(self.state.false_positive_rate, latest_fp, t);

        // 3. Auditor best-responds to the mixture so far.
        let audit = self.auditor.find_worst_group(
            self.state.decisions.view(),
            data,
            self.negative_sensitive.view(),
            self.state.false_positive_rate,
        )?;
        self.record_membership(&audit);
        let group_mass_0 = audit.group_mass_0(data.len());

        // 4. Penalise the discovered group.
        let update = CostUpdate {
            population: data.len(),
            budget: self.config.budget,
            iteration: t,
            beta: self.config.beta,
            fairness: self.config.fairness,
        };
        let cost_step = update_costs(self.state.costs.view(), &audit, &update)?;
        if !cost_step.penalized {
            log::debug!(
                "Iteration {}: group within tolerance, no penalty applied (barrier)",
                t
            );
        }
        self.state.costs = cost_step.costs;

        // 5. Learner best-responds to the penalised costs.
        let classifier = best_response(self.state.costs.view(), data, eta)?;
        let fitted = classifier.predict(data.features());
        let fitted_fp = false_positive_rate(fitted.view(), data.labels());
        let lagrangian = lagrangian_value(
            &self.state.groups,
            fitted.view(),
            self.config.budget,
            fitted_fp,
            data,
        );
        let refit_disparity = self
            .state
            .groups
            .last()
            .map_or(0.0, |previous| disparity(&classifier, data, previous));

        log::trace!("Coefficients of group {}: {}", t, audit.predicate.coefficients());
        log::trace!(
            "Coefficients of learner {}: {}",
            t,
            classifier.coefficient_gap()
        );

        self.state.classifiers.push(classifier);
        self.state.groups.push(audit.predicate.clone());

        // 6. Diagnostics.
        let marginal = marginal_unfairness(
            self.state.decisions.view(),
            data.sensitive(),
            data.labels(),
            self.state.false_positive_rate,
        );
        let report = IterationReport {
            iteration: t,
            error,
            false_positive_rate: self.state.false_positive_rate,
            disparity: audit.disparity,
            signed_disparity: audit.signed_disparity,
            group_size: audit.group_size(),
            group_mass_0,
            cumulative_group_members: self.state.cumulative_group_members(),
            lagrangian,
            refit_disparity,
            marginal_unfairness: marginal,
            penalized: cost_step.penalized,
        };
        log_report(&report);
        self.history.push(report.clone());

        // 7. Advance.
        self.state.iteration += 1;
        if self.config.early_stop
            && self
                .config
                .fairness
                .within_tolerance(audit.disparity, group_mass_0, self.config.beta)
        {
            log::info!(
                "Disparity within tolerance at iteration {}; stopping early.",
                t
            );
            self.finished = true;
        }

        Ok(report)
    }

    /// Plays rounds until the iteration cap (or early stop) and returns the mixture.
    pub fn run(mut self) -> Result<AuditOutcome, PlayError> {
        while !self.is_finished() {
            self.step()?;
        }
        Ok(self.into_outcome())
    }

    pub fn into_outcome(self) -> AuditOutcome {
        AuditOutcome {
            classifiers: self.state.classifiers,
            groups: self.state.groups,
            history: self.history,
            final_decisions: self.state.decisions,
            final_false_positive_rate: self.state.false_positive_rate,
        }
    }

    fn record_membership(&mut self, audit: &GroupAudit) {
        let members = audit.predicate.predict(self.data.sensitive());
        Zip::from(&mut self.state.group_membership)
            .and(&members)
            .for_each(|seen, &m| *seen = *seen || m == 1.0);
    }
}

fn log_report(report: &IterationReport) {
    log::info!(
        "Iteration {}: error {:.6}, FP disparity {:.6}, group size {:.6}, group mass {:.6}, lagrangian {:.6}, cumulative group members {}, weighted disparity {:.6}",
        report.iteration,
        report.error,
        report.disparity,
        report.group_size,
        report.group_mass_0,
        report.lagrangian,
        report.cumulative_group_members,
        report.group_mass_0 * report.disparity
    );
    log::debug!(
        "Iteration {}: refit disparity {:.6}, marginal unfairness {:?}",
        report.iteration,
        report.refit_disparity,
        report.marginal_unfairness
    );
}
