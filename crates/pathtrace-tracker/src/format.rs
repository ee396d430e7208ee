//! Rendering of choice stacks into trace lines.
//!
//! A line is a right-aligned four-digit index, `": "`, and the rendered
//! body. With locations enabled a second line ` \tat <location>` follows.
//! Indices count emitted lines only.

use std::fmt;
use std::io::{self, Write};
use std::slice;

use pathtrace_model::choice::{ChoiceGenerator, ChoiceValue, CG_NAMESPACE, VM_NAMESPACE};

use crate::config::{Format, TrackerConfig};
use crate::filter::{is_excluded, is_relevant};

/// Strip a known namespace from a qualified textual form.
pub fn short_name<'a>(text: &'a str, namespace: &str) -> &'a str {
    text.strip_prefix(namespace).unwrap_or(text)
}

/// The body of a trace line: the chosen value (`CHOICE`) or the generator
/// (`CG`), with its internal namespace removed.
pub fn render_body(format: Format, cg: &dyn ChoiceGenerator, value: &ChoiceValue) -> String {
    match format {
        Format::Choice => short_name(&value.to_string(), VM_NAMESPACE).to_string(),
        Format::Cg => short_name(&cg.to_string(), CG_NAMESPACE).to_string(),
    }
}

/// One emitted trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub index: usize,
    pub body: String,
    pub location: Option<String>,
}

impl fmt::Display for RenderedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}: {}", self.index, self.body)?;
        if let Some(location) = &self.location {
            write!(f, "\n \tat {location}")?;
        }
        Ok(())
    }
}

/// Lazily renders the reportable generators of a choice stack, oldest
/// first.
///
/// Skipped: retired generators, generators rejected by the kind filter,
/// generators without a current choice, and choices matching an exclusion
/// prefix.
pub struct ChoiceLines<'a> {
    config: &'a TrackerConfig,
    stack: slice::Iter<'a, Box<dyn ChoiceGenerator>>,
    next_index: usize,
}

impl<'a> ChoiceLines<'a> {
    pub fn new(config: &'a TrackerConfig, stack: &'a [Box<dyn ChoiceGenerator>]) -> Self {
        Self {
            config,
            stack: stack.iter(),
            next_index: 0,
        }
    }

    fn render(&self, cg: &dyn ChoiceGenerator) -> Option<RenderedLine> {
        if cg.is_done() || !is_relevant(&self.config.allowed, cg) {
            return None;
        }
        let value = cg.next_choice()?;
        if is_excluded(&self.config.excludes, &value.to_string()) {
            return None;
        }

        let location = if self.config.show_location {
            cg.source_location()
                .filter(|location| !location.is_empty())
                .map(str::to_string)
        } else {
            None
        };

        Some(RenderedLine {
            index: self.next_index,
            body: render_body(self.config.format, cg, &value),
            location,
        })
    }
}

impl Iterator for ChoiceLines<'_> {
    type Item = RenderedLine;

    fn next(&mut self) -> Option<RenderedLine> {
        while let Some(cg) = self.stack.next() {
            if let Some(line) = self.render(cg.as_ref()) {
                self.next_index += 1;
                return Some(line);
            }
        }
        None
    }
}

/// Stream the trace lines of `stack` into `out`. Returns the number of
/// lines written.
pub fn write_choices<W: Write + ?Sized>(
    out: &mut W,
    config: &TrackerConfig,
    stack: &[Box<dyn ChoiceGenerator>],
) -> io::Result<usize> {
    let mut written = 0;
    for line in ChoiceLines::new(config, stack) {
        writeln!(out, "{line}")?;
        written += 1;
    }
    Ok(written)
}
