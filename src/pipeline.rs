//! Record-at-a-time filter pipeline.
//!
//! Each record pulled from a [`RecordSource`] is unpacked, every condition
//! of the [`Query`] is resolved and compared against its threshold, and the
//! decision is handed to an [`Emitter`] before the next record is read.
//! Nothing is buffered beyond the current record, so output order is input
//! order.

use crate::bcf::{Header, Record, RecordSource};
use crate::compare::{Comparison, approx_cmp};
use crate::error::Result;
use crate::resolve::{FieldResolution, FieldResolver, FieldValues, SkipReason};
use std::fmt;

/// Which comparison results select a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Selector {
    /// Every record with a value, whatever the comparison
    Any,
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Selector {
    pub fn accepts(self, comparison: Comparison) -> bool {
        use Comparison::*;
        match self {
            Selector::Any => true,
            Selector::Lt => comparison == LessThan,
            Selector::Le => comparison != GreaterThan,
            Selector::Eq => comparison == Equal,
            Selector::Ne => comparison != Equal,
            Selector::Ge => comparison != LessThan,
            Selector::Gt => comparison == GreaterThan,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Selector::Any => "?",
            Selector::Lt => "<",
            Selector::Le => "<=",
            Selector::Eq => "==",
            Selector::Ne => "!=",
            Selector::Ge => ">=",
            Selector::Gt => ">",
        }
    }
}

/// How multi-valued annotations (e.g. one frequency per ALT) are judged.
///
/// Missing elements inside a value list are ignored by every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MultiValuePolicy {
    /// Compare the first value only
    #[default]
    First,
    /// Select when any value passes
    Any,
    /// Select when every value passes
    All,
}

/// One `TAG <op> threshold` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub tag: String,
    pub selector: Selector,
    pub threshold: f64,
}

impl Condition {
    pub fn new(tag: impl Into<String>, selector: Selector, threshold: f64) -> Self {
        Self {
            tag: tag.into(),
            selector,
            threshold,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.tag, self.selector.symbol(), self.threshold)
    }
}

/// A disjunction of conjunctions of conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    alternatives: Vec<Vec<Condition>>,
}

impl Query {
    /// A query with exactly one condition.
    pub fn single(condition: Condition) -> Self {
        Self {
            alternatives: vec![vec![condition]],
        }
    }

    /// Build from alternatives; empty alternatives are dropped.
    ///
    /// Returns `None` when no condition remains.
    pub fn any_of(alternatives: Vec<Vec<Condition>>) -> Option<Self> {
        let alternatives: Vec<_> = alternatives.into_iter().filter(|a| !a.is_empty()).collect();
        (!alternatives.is_empty()).then_some(Self { alternatives })
    }

    pub fn alternatives(&self) -> &[Vec<Condition>] {
        &self.alternatives
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.alternatives.iter().flatten()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, conj) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            for (j, condition) in conj.iter().enumerate() {
                if j > 0 {
                    f.write_str(" && ")?;
                }
                write!(f, "{condition}")?;
            }
        }
        Ok(())
    }
}

/// Result of one condition on a selected record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation<'q> {
    pub condition: &'q Condition,
    /// The value the decision was based on
    pub value: f32,
    pub comparison: Comparison,
    /// Number of values the record carries for the tag
    pub count: usize,
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<'q> {
    Selected(Vec<Evaluation<'q>>),
    /// Values were found but no alternative passed
    Rejected,
    /// No alternative could be evaluated; reason from the first failure
    Skipped { tag: &'q str, reason: SkipReason },
}

/// Receives pipeline decisions in input order.
pub trait Emitter {
    /// Called once before the first record.
    fn begin(&mut self, _header: &Header) -> Result<()> {
        Ok(())
    }

    /// A record passed the query.
    fn selected(
        &mut self,
        header: &Header,
        record: &Record,
        evaluations: &[Evaluation<'_>],
    ) -> Result<()>;

    /// A record could not be evaluated.
    fn skipped(
        &mut self,
        _header: &Header,
        _record: &Record,
        _tag: &str,
        _reason: SkipReason,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once after the last record.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counts from one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub records: usize,
    pub selected: usize,
    pub rejected: usize,
    pub not_declared: usize,
    pub type_mismatch: usize,
    pub absent: usize,
}

impl FilterSummary {
    pub fn skipped(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::NotDeclaredInHeader => self.not_declared,
            SkipReason::TypeMismatch => self.type_mismatch,
            SkipReason::AbsentInRecord => self.absent,
        }
    }

    fn count_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NotDeclaredInHeader => self.not_declared += 1,
            SkipReason::TypeMismatch => self.type_mismatch += 1,
            SkipReason::AbsentInRecord => self.absent += 1,
        }
    }

    /// One warning per skip reason that occurred.
    pub fn log_skips(&self) {
        for reason in SkipReason::ALL {
            let n = self.skipped(reason);
            if n > 0 {
                log::warn!("{n} record(s) skipped: {reason}");
            }
        }
    }
}

impl fmt::Display for FilterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} selected, {} rejected, {} skipped",
            self.records,
            self.selected,
            self.rejected,
            self.not_declared + self.type_mismatch + self.absent
        )
    }
}

/// A query bound to per-condition resolvers.
#[derive(Debug)]
pub struct FilterPipeline {
    query: Query,
    resolvers: Vec<Vec<FieldResolver>>,
    policy: MultiValuePolicy,
}

impl FilterPipeline {
    pub fn new(query: Query, policy: MultiValuePolicy) -> Self {
        let resolvers = query
            .alternatives
            .iter()
            .map(|conj| conj.iter().map(|c| FieldResolver::new(c.tag.clone())).collect())
            .collect();
        Self {
            query,
            resolvers,
            policy,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Pull every record from `source` and report decisions to `emitter`.
    ///
    /// Per-record skips never fail the run; decode and output errors do.
    pub fn run<S, E>(
        &mut self,
        source: &mut S,
        header: &Header,
        emitter: &mut E,
    ) -> Result<FilterSummary>
    where
        S: RecordSource + ?Sized,
        E: Emitter + ?Sized,
    {
        let mut summary = FilterSummary::default();
        let mut record = Record::new();

        emitter.begin(header)?;
        while source.read_record(&mut record)? {
            summary.records += 1;
            record.unpack()?;

            match self.evaluate(header, &record)? {
                Decision::Selected(evaluations) => {
                    summary.selected += 1;
                    for eval in &evaluations {
                        log::trace!(
                            "record {}: {} on {} of {} value(s): {}",
                            summary.records,
                            eval.condition,
                            eval.value,
                            eval.count,
                            eval.comparison
                        );
                    }
                    emitter.selected(header, &record, &evaluations)?;
                }
                Decision::Rejected => summary.rejected += 1,
                Decision::Skipped { tag, reason } => {
                    summary.count_skip(reason);
                    log::debug!(
                        "record {} (pos {}): INFO/{tag}: {reason}",
                        summary.records,
                        i64::from(record.pos()) + 1
                    );
                    emitter.skipped(header, &record, tag, reason)?;
                }
            }
        }

        emitter.finish()?;
        summary.log_skips();
        Ok(summary)
    }

    /// Decide one record.
    pub fn evaluate(&mut self, header: &Header, record: &Record) -> Result<Decision<'_>> {
        let Self {
            query,
            resolvers,
            policy,
        } = self;
        let query: &Query = query;
        let mut first_skip = None;
        let mut compared = false;

        for (conj, conj_resolvers) in query.alternatives.iter().zip(resolvers.iter_mut()) {
            let mut evaluations = Vec::with_capacity(conj.len());
            let mut passed = true;

            for (condition, resolver) in conj.iter().zip(conj_resolvers.iter_mut()) {
                match resolver.resolve(header, record)? {
                    FieldResolution::Values(values) => {
                        compared = true;
                        let (evaluation, ok) = judge(condition, values, *policy);
                        evaluations.push(evaluation);
                        if !ok {
                            passed = false;
                            break;
                        }
                    }
                    other => {
                        if first_skip.is_none() {
                            first_skip = other
                                .skip_reason()
                                .map(|reason| (condition.tag.as_str(), reason));
                        }
                        passed = false;
                        break;
                    }
                }
            }

            if passed {
                return Ok(Decision::Selected(evaluations));
            }
        }

        Ok(match first_skip {
            Some((tag, reason)) if !compared => Decision::Skipped { tag, reason },
            _ => Decision::Rejected,
        })
    }
}

/// Apply the multi-value policy to one resolved condition.
fn judge<'q>(
    condition: &'q Condition,
    values: FieldValues<'_>,
    policy: MultiValuePolicy,
) -> (Evaluation<'q>, bool) {
    let present: Vec<f32> = values.as_slice().iter().copied().filter(|v| !v.is_nan()).collect();
    let compare = |v: f32| approx_cmp(f64::from(v), condition.threshold);
    let evaluation = |value: f32| Evaluation {
        condition,
        value,
        comparison: compare(value),
        count: values.count(),
    };

    // The resolver guarantees at least one non-missing value.
    let first = present.first().copied().unwrap_or(values.first());

    match policy {
        MultiValuePolicy::First => {
            let eval = evaluation(first);
            (eval, condition.selector.accepts(eval.comparison))
        }
        MultiValuePolicy::Any => {
            match present
                .iter()
                .copied()
                .find(|&v| condition.selector.accepts(compare(v)))
            {
                Some(v) => (evaluation(v), true),
                None => (evaluation(first), false),
            }
        }
        MultiValuePolicy::All => {
            match present
                .iter()
                .copied()
                .find(|&v| !condition.selector.accepts(compare(v)))
            {
                Some(v) => (evaluation(v), false),
                None => (evaluation(first), true),
            }
        }
    }
}
