//! Distribution engine.
//!
//! Decides, without looking at stored data, whether a specification may be
//! served to a viewer. The specification's walk must be covered by the walk
//! of at least one registered rule: every step it takes must be a step the
//! rule takes, every condition it tests must follow a step or obligation of
//! the rule, and every obligation the rule places on a fact must be met by
//! an obligation in the specification.

use crate::error::DistributionResult;
use crate::rules::{DistributionRule, DistributionRules, UserConstraint};
use crate::walk::{walk_from_specification, Walk, WalkCondition, WalkStep};
use factweave_core::FactReference;
use factweave_spec::Specification;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DistributionAssessment {
    /// The specification may be distributed
    Permit,
    /// The specification may not be distributed
    Deny {
        /// Human-readable explanation
        reason: String,
        /// How far into the walk the failure was found
        depth: usize,
    },
}

impl DistributionAssessment {
    /// Create a denial
    #[must_use]
    pub fn deny(reason: impl Into<String>, depth: usize) -> Self {
        Self::Deny {
            reason: reason.into(),
            depth,
        }
    }

    /// Check whether this is a permit
    #[must_use]
    pub fn is_permit(&self) -> bool {
        matches!(self, Self::Permit)
    }
}

/// Decides whether a user satisfies a rule's user constraint
///
/// Resolving users requires the fact store, so it is supplied by the host.
pub trait UserVerifier: Send + Sync {
    /// Check whether `user` is among the users `constraint` selects from `start`
    fn verify(&self, constraint: &UserConstraint, start: &[FactReference], user: &FactReference) -> bool;
}

/// Assesses specifications against a rule set
#[derive(Clone)]
pub struct DistributionEngine {
    rules: DistributionRules,
    verifier: Option<Arc<dyn UserVerifier>>,
}

impl fmt::Debug for DistributionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionEngine")
            .field("rules", &self.rules.len())
            .field("verifier", &self.verifier.is_some())
            .finish()
    }
}

impl DistributionEngine {
    /// Create an engine over a rule set
    #[must_use]
    pub fn new(rules: DistributionRules) -> Self {
        Self {
            rules,
            verifier: None,
        }
    }

    /// Install the verifier for user-restricted rules
    #[must_use]
    pub fn with_user_verifier(mut self, verifier: Arc<dyn UserVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Registered rules
    #[must_use]
    pub fn rules(&self) -> &DistributionRules {
        &self.rules
    }

    /// Assess whether `spec`, started from `start`, may be sent to `user`
    ///
    /// An empty rule set permits everything. Otherwise the most specific
    /// denial is reported when no rule covers the specification.
    ///
    /// # Errors
    ///
    /// Returns error if the specification has no walk
    pub fn assess(
        &self,
        spec: &Specification,
        start: &[FactReference],
        user: Option<&FactReference>,
    ) -> DistributionResult<DistributionAssessment> {
        if self.rules.is_empty() {
            debug!("no distribution rules, permitting");
            return Ok(DistributionAssessment::Permit);
        }

        let target = walk_from_specification(spec)?;
        let subject = if user.is_some() {
            "The user"
        } else {
            "An unauthenticated user"
        };
        let assessment = summarize_assessments(
            self.rules
                .iter()
                .map(|rule| self.assess_rule(rule, &target, start, user, subject)),
        );
        debug!(?assessment, "distribution assessed");
        Ok(assessment)
    }

    fn assess_rule(
        &self,
        rule: &DistributionRule,
        target: &Walk,
        start: &[FactReference],
        user: Option<&FactReference>,
        subject: &str,
    ) -> DistributionAssessment {
        if let Some(constraint) = &rule.user {
            let verified = match (user, &self.verifier) {
                (Some(user), Some(verifier)) => verifier.verify(constraint, start, user),
                _ => false,
            };
            if !verified {
                trace!(rule = %rule.walk.fact_type, "user constraint not met");
                return DistributionAssessment::deny(
                    format!("{} is not among the users this rule permits.", subject),
                    0,
                );
            }
        }
        let assessment = assess_walk(target, &rule.walk, 0, subject);
        trace!(?assessment, "rule assessed");
        assessment
    }
}

/// Assess whether `candidate` covers `target`
#[must_use]
pub fn assess_walk(target: &Walk, candidate: &Walk, depth: usize, subject: &str) -> DistributionAssessment {
    if target.fact_type != candidate.fact_type {
        return DistributionAssessment::deny(
            format!(
                "{} cannot reach {} from a rule starting at {}.",
                subject, target.fact_type, candidate.fact_type
            ),
            depth,
        );
    }
    let steps = target.steps.iter().map(|step| {
        let reachable = matching_steps(candidate.steps.iter(), step);
        assess_step(target, step, reachable, depth, depth, subject)
    });
    // Condition steps are covered by rule steps or rule obligations.
    let conditions = target.conditions.iter().map(|condition| {
        let reachable = matching_steps(
            candidate
                .steps
                .iter()
                .chain(candidate.conditions.iter().map(|obligation| &obligation.step)),
            &condition.step,
        );
        assess_step(target, &condition.step, reachable, depth + 1, depth, subject)
    });

    let denials: Vec<_> = steps
        .chain(conditions)
        .filter(|assessment| !assessment.is_permit())
        .collect();
    if denials.is_empty() {
        DistributionAssessment::Permit
    } else {
        summarize_assessments(denials)
    }
}

fn matching_steps<'a>(
    candidates: impl Iterator<Item = &'a WalkStep>,
    target_step: &WalkStep,
) -> Vec<&'a WalkStep> {
    candidates
        .filter(|step| step.direction == target_step.direction && step.role == target_step.role)
        .collect()
}

/// Assess one target step against the candidate steps that follow the same role
///
/// `missing_depth` is the depth reported when no candidate step matches.
fn assess_step(
    target: &Walk,
    target_step: &WalkStep,
    matching: Vec<&WalkStep>,
    missing_depth: usize,
    depth: usize,
    subject: &str,
) -> DistributionAssessment {
    let cannot_follow = format!(
        "{} cannot follow {} of {} {}.{}",
        subject,
        target_step.direction,
        target.fact_type,
        target_step.declaring_type(&target.fact_type),
        target_step.role
    );

    if matching.is_empty() {
        return DistributionAssessment::deny(format!("{}.", cannot_follow), missing_depth);
    }

    let mut qualifying = Vec::new();
    let mut alternatives = Vec::new();
    for step in matching {
        let unmet = unmet_conditions(&target_step.next, &step.next);
        if unmet.is_empty() {
            qualifying.push(step);
        } else {
            alternatives.push(
                unmet
                    .iter()
                    .map(|condition| describe_condition(&step.next.fact_type, condition))
                    .collect::<Vec<_>>()
                    .join(" and "),
            );
        }
    }
    if qualifying.is_empty() {
        return DistributionAssessment::deny(
            format!("{} unless {}.", cannot_follow, alternatives.join(", or ")),
            depth + 1,
        );
    }

    summarize_assessments(
        qualifying
            .into_iter()
            .map(|step| assess_walk(&target_step.next, &step.next, depth + 1, subject)),
    )
}

/// Rule obligations on a fact that the target does not also impose
fn unmet_conditions<'a>(target: &Walk, rule: &'a Walk) -> Vec<&'a WalkCondition> {
    rule.conditions
        .iter()
        .filter(|required| {
            !target
                .conditions
                .iter()
                .any(|imposed| condition_covers(imposed, required))
        })
        .collect()
}

/// Whether the target obligation `imposed` implies the rule obligation `required`
///
/// Requiring a longer chain to exist implies the shorter one exists; forbidding
/// a shorter chain implies the longer one is absent.
fn condition_covers(imposed: &WalkCondition, required: &WalkCondition) -> bool {
    if imposed.exists != required.exists {
        return false;
    }
    if required.exists {
        step_covers(&imposed.step, &required.step)
    } else {
        step_covers(&required.step, &imposed.step)
    }
}

/// Whether `outer` takes the same step as `inner` and at least every step after it
fn step_covers(outer: &WalkStep, inner: &WalkStep) -> bool {
    outer.direction == inner.direction
        && outer.role == inner.role
        && outer.next.fact_type == inner.next.fact_type
        && inner.next.steps.iter().all(|inner_next| {
            outer
                .next
                .steps
                .iter()
                .any(|outer_next| step_covers(outer_next, inner_next))
        })
}

fn describe_condition(fact_type: &str, condition: &WalkCondition) -> String {
    let step = &condition.step;
    format!(
        "{} has {} {} {}.{}",
        fact_type,
        if condition.exists { "a" } else { "no" },
        step.direction,
        step.declaring_type(fact_type),
        step.role
    )
}

/// Combine assessments: any permit wins, otherwise the deepest denial
///
/// Among denials of equal depth the first is kept.
#[must_use]
pub fn summarize_assessments(
    assessments: impl IntoIterator<Item = DistributionAssessment>,
) -> DistributionAssessment {
    let mut deepest: Option<(String, usize)> = None;
    for assessment in assessments {
        match assessment {
            DistributionAssessment::Permit => return DistributionAssessment::Permit,
            DistributionAssessment::Deny { reason, depth } => {
                if deepest.as_ref().is_none_or(|(_, best)| depth > *best) {
                    deepest = Some((reason, depth));
                }
            }
        }
    }
    match deepest {
        Some((reason, depth)) => DistributionAssessment::Deny { reason, depth },
        None => DistributionAssessment::deny("No distribution rule applies.", 0),
    }
}
