use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace every choice generator's textual form starts with.
pub const CG_NAMESPACE: &str = "pathtrace::choice::";

/// Namespace of values owned by the virtual machine (threads, objects).
pub const VM_NAMESPACE: &str = "pathtrace::vm::";

/// Runtime identity of a choice generator.
///
/// Kinds form a hierarchy rooted at [`CgKind::ChoiceGenerator`]: the
/// abstract kinds (`IntChoiceGenerator`, `ThreadChoiceGenerator`, ...) group
/// the concrete generators that produce the same kind of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CgKind {
    ChoiceGenerator,
    BooleanChoiceGenerator,
    IntChoiceGenerator,
    IntIntervalGenerator,
    IntChoiceFromSet,
    DoubleChoiceGenerator,
    DoubleChoiceFromList,
    FloatChoiceGenerator,
    FloatChoiceFromList,
    LongChoiceGenerator,
    LongChoiceFromList,
    ThreadChoiceGenerator,
    ThreadChoiceFromSet,
}

impl CgKind {
    pub const ALL: [CgKind; 13] = [
        CgKind::ChoiceGenerator,
        CgKind::BooleanChoiceGenerator,
        CgKind::IntChoiceGenerator,
        CgKind::IntIntervalGenerator,
        CgKind::IntChoiceFromSet,
        CgKind::DoubleChoiceGenerator,
        CgKind::DoubleChoiceFromList,
        CgKind::FloatChoiceGenerator,
        CgKind::FloatChoiceFromList,
        CgKind::LongChoiceGenerator,
        CgKind::LongChoiceFromList,
        CgKind::ThreadChoiceGenerator,
        CgKind::ThreadChoiceFromSet,
    ];

    /// The kind this one specializes. `None` only for the root.
    pub fn parent(self) -> Option<CgKind> {
        match self {
            CgKind::ChoiceGenerator => None,
            CgKind::IntIntervalGenerator | CgKind::IntChoiceFromSet => {
                Some(CgKind::IntChoiceGenerator)
            }
            CgKind::DoubleChoiceFromList => Some(CgKind::DoubleChoiceGenerator),
            CgKind::FloatChoiceFromList => Some(CgKind::FloatChoiceGenerator),
            CgKind::LongChoiceFromList => Some(CgKind::LongChoiceGenerator),
            CgKind::ThreadChoiceFromSet => Some(CgKind::ThreadChoiceGenerator),
            CgKind::BooleanChoiceGenerator
            | CgKind::IntChoiceGenerator
            | CgKind::DoubleChoiceGenerator
            | CgKind::FloatChoiceGenerator
            | CgKind::LongChoiceGenerator
            | CgKind::ThreadChoiceGenerator => Some(CgKind::ChoiceGenerator),
        }
    }

    /// True if `self` equals `ancestor` or specializes it (transitively).
    pub fn is_a(self, ancestor: CgKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    pub fn name(self) -> &'static str {
        match self {
            CgKind::ChoiceGenerator => "ChoiceGenerator",
            CgKind::BooleanChoiceGenerator => "BooleanChoiceGenerator",
            CgKind::IntChoiceGenerator => "IntChoiceGenerator",
            CgKind::IntIntervalGenerator => "IntIntervalGenerator",
            CgKind::IntChoiceFromSet => "IntChoiceFromSet",
            CgKind::DoubleChoiceGenerator => "DoubleChoiceGenerator",
            CgKind::DoubleChoiceFromList => "DoubleChoiceFromList",
            CgKind::FloatChoiceGenerator => "FloatChoiceGenerator",
            CgKind::FloatChoiceFromList => "FloatChoiceFromList",
            CgKind::LongChoiceGenerator => "LongChoiceGenerator",
            CgKind::LongChoiceFromList => "LongChoiceFromList",
            CgKind::ThreadChoiceGenerator => "ThreadChoiceGenerator",
            CgKind::ThreadChoiceFromSet => "ThreadChoiceFromSet",
        }
    }

    pub fn qualified_name(self) -> String {
        format!("{CG_NAMESPACE}{}", self.name())
    }

    /// Resolve a short (`IntChoiceGenerator`) or qualified
    /// (`pathtrace::choice::IntChoiceGenerator`) kind name.
    pub fn from_name(name: &str) -> Option<CgKind> {
        let name = name.trim();
        let short = name.strip_prefix(CG_NAMESPACE).unwrap_or(name);
        CgKind::ALL.iter().copied().find(|kind| kind.name() == short)
    }
}

impl fmt::Display for CgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CG_NAMESPACE}{}", self.name())
    }
}

/// A thread as seen by a scheduling choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: u32,
    pub name: String,
}

impl ThreadInfo {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for ThreadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{VM_NAMESPACE}ThreadInfo[name={},id={}]", self.name, self.id)
    }
}

/// A concrete value picked at a choice point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChoiceValue {
    Bool(bool),
    Int(i64),
    Long(i64),
    Float(f32),
    Double(f64),
    Thread(ThreadInfo),
}

impl fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceValue::Bool(b) => write!(f, "{b}"),
            ChoiceValue::Int(i) | ChoiceValue::Long(i) => write!(f, "{i}"),
            // Debug keeps extreme magnitudes in exponent form (5e-324).
            ChoiceValue::Float(v) => write!(f, "{v:?}"),
            ChoiceValue::Double(v) => write!(f, "{v:?}"),
            ChoiceValue::Thread(t) => write!(f, "{t}"),
        }
    }
}

/// One nondeterministic branch point on the current execution path.
///
/// The `Display` form is the generator's textual representation, prefixed
/// with [`CG_NAMESPACE`].
pub trait ChoiceGenerator: fmt::Display + fmt::Debug {
    fn kind(&self) -> CgKind;

    fn id(&self) -> &str;

    /// The choice currently taken, or `None` before the first `advance`.
    fn next_choice(&self) -> Option<ChoiceValue>;

    fn has_more_choices(&self) -> bool;

    /// Move to the next choice. No-op once all choices are processed.
    fn advance(&mut self);

    fn total_choices(&self) -> usize;

    fn processed_choices(&self) -> usize;

    /// True once the generator was retired, i.e. its remaining choices
    /// must not be explored.
    fn is_done(&self) -> bool;

    fn set_done(&mut self);

    fn source_location(&self) -> Option<&str>;

    fn set_source_location(&mut self, location: String);

    fn is_cascaded(&self) -> bool {
        false
    }
}

/// Generator over an explicit list of values (booleans, sets, thread sets).
#[derive(Debug, Clone)]
pub struct ChoiceFromList {
    kind: CgKind,
    id: String,
    values: Vec<ChoiceValue>,
    cursor: Option<usize>,
    done: bool,
    location: Option<String>,
}

impl ChoiceFromList {
    fn new(kind: CgKind, id: impl Into<String>, values: Vec<ChoiceValue>) -> Self {
        Self {
            kind,
            id: id.into(),
            values,
            cursor: None,
            done: false,
            location: None,
        }
    }

    /// Two-way boolean branch, `false` explored first.
    pub fn boolean(id: impl Into<String>) -> Self {
        Self::new(
            CgKind::BooleanChoiceGenerator,
            id,
            vec![ChoiceValue::Bool(false), ChoiceValue::Bool(true)],
        )
    }

    pub fn ints(id: impl Into<String>, values: &[i64]) -> Self {
        let values = values.iter().map(|v| ChoiceValue::Int(*v)).collect();
        Self::new(CgKind::IntChoiceFromSet, id, values)
    }

    pub fn doubles(id: impl Into<String>, values: &[f64]) -> Self {
        let values = values.iter().map(|v| ChoiceValue::Double(*v)).collect();
        Self::new(CgKind::DoubleChoiceFromList, id, values)
    }

    pub fn floats(id: impl Into<String>, values: &[f32]) -> Self {
        let values = values.iter().map(|v| ChoiceValue::Float(*v)).collect();
        Self::new(CgKind::FloatChoiceFromList, id, values)
    }

    pub fn longs(id: impl Into<String>, values: &[i64]) -> Self {
        let values = values.iter().map(|v| ChoiceValue::Long(*v)).collect();
        Self::new(CgKind::LongChoiceFromList, id, values)
    }

    pub fn threads(id: impl Into<String>, threads: Vec<ThreadInfo>) -> Self {
        let values = threads.into_iter().map(ChoiceValue::Thread).collect();
        Self::new(CgKind::ThreadChoiceFromSet, id, values)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    fn write_values(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if self.cursor == Some(i) {
                f.write_str(">")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ChoiceFromList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(CG_NAMESPACE)?;
        f.write_str(self.kind.name())?;
        match self.kind {
            CgKind::BooleanChoiceGenerator => {
                write!(f, "[[id=\"{}\",isCascaded:{},{{", self.id, self.is_cascaded())?;
                self.write_values(f)?;
                f.write_str("}]")
            }
            CgKind::ThreadChoiceFromSet => {
                let position = self.cursor.map_or(0, |c| c + 1);
                write!(
                    f,
                    " {{id:\"{}\" ,{}/{},isCascaded:{}}}",
                    self.id,
                    position,
                    self.values.len(),
                    self.is_cascaded()
                )
            }
            _ => {
                write!(f, "[id=\"{}\",isCascaded:{},", self.id, self.is_cascaded())?;
                self.write_values(f)?;
                f.write_str("]")
            }
        }
    }
}

impl ChoiceGenerator for ChoiceFromList {
    fn kind(&self) -> CgKind {
        self.kind
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn next_choice(&self) -> Option<ChoiceValue> {
        self.cursor.and_then(|c| self.values.get(c).cloned())
    }

    fn has_more_choices(&self) -> bool {
        !self.done && self.processed_choices() < self.values.len()
    }

    fn advance(&mut self) {
        if self.has_more_choices() {
            self.cursor = Some(self.cursor.map_or(0, |c| c + 1));
        }
    }

    fn total_choices(&self) -> usize {
        self.values.len()
    }

    fn processed_choices(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn set_done(&mut self) {
        self.done = true;
    }

    fn source_location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn set_source_location(&mut self, location: String) {
        self.location = Some(location);
    }
}

/// Generator over an arithmetic interval `min..=max` in steps of `delta`.
#[derive(Debug, Clone)]
pub struct IntIntervalGenerator {
    id: String,
    min: i64,
    max: i64,
    delta: i64,
    /// None until the first `advance`.
    current: Option<i64>,
    done: bool,
    location: Option<String>,
}

impl IntIntervalGenerator {
    /// Interval walked upwards by one. An empty interval (`min > max`)
    /// yields no choices.
    pub fn new(id: impl Into<String>, min: i64, max: i64) -> Self {
        Self::with_delta(id, min, max, 1)
    }

    /// A negative `delta` walks the interval from `max` down to `min`.
    /// A zero `delta` is treated as `1`.
    pub fn with_delta(id: impl Into<String>, min: i64, max: i64, delta: i64) -> Self {
        Self {
            id: id.into(),
            min,
            max,
            delta: if delta == 0 { 1 } else { delta },
            current: None,
            done: false,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    fn start(&self) -> i64 {
        if self.delta > 0 {
            self.min
        } else {
            self.max
        }
    }

    /// The value after `current`, if it is still inside the interval.
    fn successor(&self, current: i64) -> Option<i64> {
        current
            .checked_add(self.delta)
            .filter(|next| (self.min..=self.max).contains(next))
    }
}

/// Counts can exceed `i64` (and `usize`) for the widest intervals.
fn saturating_count(count: i128) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

impl fmt::Display for IntIntervalGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CG_NAMESPACE}IntIntervalGenerator[id=\"{}\",isCascaded:{},{}..{},delta=",
            self.id,
            self.is_cascaded(),
            self.min,
            self.max
        )?;
        if self.delta > 0 {
            f.write_str("+")?;
        }
        // Before the first advance, cur sits one step before the start.
        let cur = self
            .current
            .map_or(i128::from(self.start()) - i128::from(self.delta), i128::from);
        write!(f, "{},cur={cur}]", self.delta)
    }
}

impl ChoiceGenerator for IntIntervalGenerator {
    fn kind(&self) -> CgKind {
        CgKind::IntIntervalGenerator
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn next_choice(&self) -> Option<ChoiceValue> {
        self.current.map(ChoiceValue::Int)
    }

    fn has_more_choices(&self) -> bool {
        if self.done || self.min > self.max {
            return false;
        }
        match self.current {
            None => true,
            Some(current) => self.successor(current).is_some(),
        }
    }

    fn advance(&mut self) {
        if !self.has_more_choices() {
            return;
        }
        self.current = match self.current {
            None => Some(self.start()),
            Some(current) => self.successor(current),
        };
    }

    fn total_choices(&self) -> usize {
        if self.min > self.max {
            return 0;
        }
        let span = i128::from(self.max) - i128::from(self.min);
        saturating_count(span / i128::from(self.delta).abs() + 1)
    }

    fn processed_choices(&self) -> usize {
        self.current.map_or(0, |current| {
            let walked = i128::from(current) - i128::from(self.start());
            saturating_count(walked / i128::from(self.delta) + 1)
        })
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn set_done(&mut self) {
        self.done = true;
    }

    fn source_location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn set_source_location(&mut self, location: String) {
        self.location = Some(location);
    }
}
