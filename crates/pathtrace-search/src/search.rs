use std::fmt;

use pathtrace_model::choice::{
    ChoiceFromList, ChoiceGenerator, ChoiceValue, CgKind, IntIntervalGenerator, ThreadInfo,
};
use pathtrace_model::config::Config;
use pathtrace_model::state::SystemState;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::listener::SearchListener;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("replay diverged at depth {depth}: recorded {recorded}, program requested {requested}")]
    ReplayDivergence {
        depth: usize,
        recorded: CgKind,
        requested: CgKind,
    },

    #[error("choice generator '{id}' offers no choices")]
    EmptyChoice { id: String },
}

/// Search options, bound from the `target`, `cg.*` and `search.*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Description of the system under test.
    pub target: String,
    /// Turn `random_*` calls into choice generators instead of drawing values.
    pub enumerate_random: bool,
    /// Keep searching after the first violation.
    pub multiple_errors: bool,
    /// Maximum number of generators on a path. None = unbounded.
    pub depth_limit: Option<usize>,
    /// Seed for non-enumerated random values.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            enumerate_random: false,
            multiple_errors: false,
            depth_limit: None,
            seed: 42,
        }
    }
}

impl SearchConfig {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        let depth_limit = config.get_int("search.depth_limit", -1);
        Self {
            target: config
                .get_string("target")
                .map(str::to_string)
                .unwrap_or(defaults.target),
            enumerate_random: config.get_bool("cg.enumerate_random", defaults.enumerate_random),
            multiple_errors: config.get_bool("search.multiple_errors", defaults.multiple_errors),
            depth_limit: (depth_limit > 0).then_some(depth_limit as usize),
            seed: config.get_u64("search.seed", defaults.seed),
        }
    }
}

/// A property violation raised by the program under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Name of the violated property, e.g. `NoUncaughtExceptionsProperty`.
    pub property: String,
    /// Details reported by the program.
    pub message: String,
}

impl Violation {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }

    /// An uncaught failure in the program itself.
    pub fn exception(message: impl Into<String>) -> Self {
        Self::new("NoUncaughtExceptionsProperty", message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.message)
    }
}

/// A violation found during the search, with the path that led to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Error id, `#1` for the first violation.
    pub id: String,
    /// The violation as raised by the program.
    pub violation: Violation,
    /// Number of generators on the violating path.
    pub depth: usize,
    /// Textual form of every generator on the path, root first.
    pub path: Vec<String>,
}

/// Outcome of a complete search.
#[derive(Debug, Clone, Default)]
pub struct SearchSummary {
    /// Violations in the order they were found.
    pub violations: Vec<ViolationRecord>,
    /// Completed runs of the program, one per path.
    pub paths_explored: u64,
    /// Paths cut short by the depth limit.
    pub truncated_paths: u64,
    /// Deepest choice stack seen on any path.
    pub max_depth: usize,
}

impl SearchSummary {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Read-only view of a search, handed to listeners.
pub trait SearchView {
    fn system_state(&self) -> &SystemState;

    fn sut_description(&self) -> &str;

    /// Number of generators on the current path.
    fn depth(&self) -> usize {
        self.system_state().len()
    }

    fn last_violation(&self) -> Option<&ViolationRecord>;
}

/// Stateless depth-first search over a nondeterministic program.
///
/// Every run re-executes the program from the start, replaying the choices
/// recorded in the system state and extending it with new generators. After
/// a run the newest generator with choices left is advanced; exhausted or
/// retired generators are popped.
pub struct Search {
    config: SearchConfig,
    state: SystemState,
    violations: Vec<ViolationRecord>,
    paths_explored: u64,
    truncated_paths: u64,
    max_depth: usize,
}

impl Search {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            state: SystemState::new(),
            violations: Vec::new(),
            paths_explored: 0,
            truncated_paths: 0,
            max_depth: 0,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Explore every path of `program`, notifying `listener` on the search
    /// thread. Stops at the first violation unless `multiple_errors` is set,
    /// leaving the violating path in the system state.
    pub fn run<P>(
        &mut self,
        mut program: P,
        listener: &mut dyn SearchListener,
    ) -> Result<SearchSummary, SearchError>
    where
        P: FnMut(&mut Execution<'_>) -> Result<(), Violation>,
    {
        self.state.clear();
        self.violations.clear();
        self.paths_explored = 0;
        self.truncated_paths = 0;
        self.max_depth = 0;

        listener.search_started(&*self);

        loop {
            let (result, fault, truncated) = {
                let mut exec = Execution::new(&mut self.state, &self.config);
                let result = program(&mut exec);
                (result, exec.fault.take(), exec.truncated)
            };

            if let Some(fault) = fault {
                return Err(fault);
            }

            self.paths_explored += 1;
            if truncated {
                self.truncated_paths += 1;
            }
            self.max_depth = self.max_depth.max(self.state.len());
            debug!(
                path = self.paths_explored,
                depth = self.state.len(),
                "path finished"
            );

            if let Err(violation) = result {
                let record = ViolationRecord {
                    id: format!("#{}", self.violations.len() + 1),
                    depth: self.state.len(),
                    path: self
                        .state
                        .choice_generators()
                        .iter()
                        .map(|cg| cg.to_string())
                        .collect(),
                    violation,
                };
                info!(id = %record.id, violation = %record.violation, "property violated");
                self.violations.push(record);
                listener.property_violated(&*self);

                if !self.config.multiple_errors {
                    break;
                }
            }

            if !self.backtrack() {
                break;
            }
        }

        listener.search_finished(&*self);

        Ok(SearchSummary {
            violations: self.violations.clone(),
            paths_explored: self.paths_explored,
            truncated_paths: self.truncated_paths,
            max_depth: self.max_depth,
        })
    }

    /// Advance the newest generator with choices left. False once the
    /// state space is exhausted.
    fn backtrack(&mut self) -> bool {
        while let Some(top) = self.state.top_mut() {
            if top.has_more_choices() {
                top.advance();
                return true;
            }
            self.state.pop();
        }
        false
    }
}

impl SearchView for Search {
    fn system_state(&self) -> &SystemState {
        &self.state
    }

    fn sut_description(&self) -> &str {
        &self.config.target
    }

    fn last_violation(&self) -> Option<&ViolationRecord> {
        self.violations.last()
    }
}

/// The program's handle on the search during one run.
pub struct Execution<'s> {
    state: &'s mut SystemState,
    rng: ChaCha8Rng,
    enumerate_random: bool,
    depth_limit: Option<usize>,
    cursor: usize,
    pending_location: Option<String>,
    truncated: bool,
    fault: Option<SearchError>,
}

impl<'s> Execution<'s> {
    fn new(state: &'s mut SystemState, config: &SearchConfig) -> Self {
        Self {
            state,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            enumerate_random: config.enumerate_random,
            depth_limit: config.depth_limit,
            cursor: 0,
            pending_location: None,
            truncated: false,
            fault: None,
        }
    }

    /// Tag the next choice point with a source location.
    pub fn at(&mut self, location: impl Into<String>) -> &mut Self {
        self.pending_location = Some(location.into());
        self
    }

    /// Retire the most recent choice point: its remaining choices are not
    /// explored.
    pub fn ignore_remaining_choices(&mut self) {
        if let Some(cg) = self
            .cursor
            .checked_sub(1)
            .and_then(|depth| self.state.get_mut(depth))
        {
            cg.set_done();
        }
    }

    /// Choice points passed so far in this run.
    pub fn depth(&self) -> usize {
        self.cursor
    }

    pub fn verify_bool(&mut self) -> bool {
        match self.choose(CgKind::BooleanChoiceGenerator, || {
            Box::new(ChoiceFromList::boolean("verifyGetBoolean"))
        }) {
            Some(ChoiceValue::Bool(b)) => b,
            _ => false,
        }
    }

    pub fn verify_int(&mut self, min: i64, max: i64) -> i64 {
        match self.choose(CgKind::IntIntervalGenerator, || {
            Box::new(IntIntervalGenerator::new("verifyGetInt(II)", min, max))
        }) {
            Some(ChoiceValue::Int(v)) => v,
            _ => min,
        }
    }

    pub fn verify_int_from_set(&mut self, values: &[i64]) -> i64 {
        match self.choose(CgKind::IntChoiceFromSet, || {
            Box::new(ChoiceFromList::ints("verifyGetIntSet([I)", values))
        }) {
            Some(ChoiceValue::Int(v)) => v,
            _ => values.first().copied().unwrap_or_default(),
        }
    }

    pub fn verify_double_list(&mut self, values: &[f64]) -> f64 {
        match self.choose(CgKind::DoubleChoiceFromList, || {
            Box::new(ChoiceFromList::doubles("verifyDoubleList([D)", values))
        }) {
            Some(ChoiceValue::Double(v)) => v,
            _ => values.first().copied().unwrap_or_default(),
        }
    }

    pub fn verify_float_list(&mut self, values: &[f32]) -> f32 {
        match self.choose(CgKind::FloatChoiceFromList, || {
            Box::new(ChoiceFromList::floats("verifyFloatList([F)", values))
        }) {
            Some(ChoiceValue::Float(v)) => v,
            _ => values.first().copied().unwrap_or_default(),
        }
    }

    pub fn verify_long_list(&mut self, values: &[i64]) -> i64 {
        match self.choose(CgKind::LongChoiceFromList, || {
            Box::new(ChoiceFromList::longs("verifyLongList([J)", values))
        }) {
            Some(ChoiceValue::Long(v)) => v,
            _ => values.first().copied().unwrap_or_default(),
        }
    }

    /// Scheduling point: pick which of `threads` runs next.
    pub fn schedule(&mut self, id: &str, threads: &[ThreadInfo]) -> u32 {
        match self.choose(CgKind::ThreadChoiceFromSet, || {
            Box::new(ChoiceFromList::threads(id, threads.to_vec()))
        }) {
            Some(ChoiceValue::Thread(t)) => t.id,
            _ => threads.first().map_or(0, |t| t.id),
        }
    }

    pub fn random_bool(&mut self) -> bool {
        if self.enumerate_random {
            self.verify_bool()
        } else {
            self.drop_location();
            self.rng.gen()
        }
    }

    /// Value in `0..bound`; 0 for a non-positive bound.
    pub fn random_int(&mut self, bound: i64) -> i64 {
        if bound <= 0 {
            self.drop_location();
            return 0;
        }
        if self.enumerate_random {
            self.verify_int(0, bound - 1)
        } else {
            self.drop_location();
            self.rng.gen_range(0..bound)
        }
    }

    /// Enumerated as the smallest positive value, zero and the largest value.
    pub fn random_double(&mut self) -> f64 {
        if self.enumerate_random {
            self.verify_double_list(&[f64::from_bits(1), 0.0, f64::MAX])
        } else {
            self.drop_location();
            self.rng.gen()
        }
    }

    pub fn random_float(&mut self) -> f32 {
        if self.enumerate_random {
            self.verify_float_list(&[f32::from_bits(1), 0.0, f32::MAX])
        } else {
            self.drop_location();
            self.rng.gen()
        }
    }

    pub fn random_long(&mut self) -> i64 {
        if self.enumerate_random {
            self.verify_long_list(&[i64::MIN, 0, i64::MAX])
        } else {
            self.drop_location();
            self.rng.gen()
        }
    }

    /// A value drawn without a choice point consumes the pending location.
    fn drop_location(&mut self) {
        self.pending_location = None;
    }

    fn choose<F>(&mut self, kind: CgKind, make: F) -> Option<ChoiceValue>
    where
        F: FnOnce() -> Box<dyn ChoiceGenerator>,
    {
        let location = self.pending_location.take();
        if self.fault.is_some() {
            return None;
        }

        if let Some(recorded) = self.state.get(self.cursor) {
            if recorded.kind() != kind {
                self.fault = Some(SearchError::ReplayDivergence {
                    depth: self.cursor,
                    recorded: recorded.kind(),
                    requested: kind,
                });
                return None;
            }
            self.cursor += 1;
            return recorded.next_choice();
        }

        let mut cg = make();
        if let Some(location) = location {
            cg.set_source_location(location);
        }
        cg.advance();

        let Some(value) = cg.next_choice() else {
            self.fault = Some(SearchError::EmptyChoice {
                id: cg.id().to_string(),
            });
            return None;
        };

        if self.depth_limit.is_some_and(|limit| self.state.len() >= limit) {
            // Past the depth limit the first choice is taken without branching.
            self.truncated = true;
            return Some(value);
        }

        self.state.push(cg);
        self.cursor += 1;
        Some(value)
    }
}
