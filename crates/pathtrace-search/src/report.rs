use std::io::{self, Write};

use crate::listener::SearchListener;
use crate::search::{SearchSummary, SearchView};

const TOPIC_RULE: &str = "======================================================";

/// The shared end-of-run report, as seen by publisher extensions.
pub trait Publisher {
    /// The report writer. Extensions borrow it for one callback and must not
    /// close it.
    fn out(&mut self) -> &mut dyn Write;

    /// Start a labeled report section.
    fn publish_topic_start(&mut self, topic: &str) -> io::Result<()>;

    /// Id of the violation currently being reported, e.g. `#1`.
    fn last_error_id(&self) -> &str;
}

/// Plain-text report written to a console-like stream.
pub struct ConsolePublisher<W: Write> {
    out: W,
    error_count: usize,
    last_error_id: String,
}

impl<W: Write> ConsolePublisher<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            error_count: 0,
            last_error_id: String::new(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn publish_start(&mut self, search: &dyn SearchView) -> io::Result<()> {
        self.error_count = 0;
        self.last_error_id.clear();
        self.publish_topic_start("system under test")?;
        writeln!(self.out, "{}", search.sut_description())?;
        self.publish_topic_start("search started")
    }

    /// Report the search's latest violation, then let every extension add
    /// its own section.
    pub fn publish_property_violation<'e, I>(
        &mut self,
        search: &dyn SearchView,
        extensions: I,
    ) -> io::Result<()>
    where
        I: IntoIterator<Item = &'e mut Box<dyn SearchListener>>,
    {
        self.error_count += 1;
        self.last_error_id = format!("#{}", self.error_count);

        let topic = format!("error {}", self.last_error_id);
        self.publish_topic_start(&topic)?;
        if let Some(record) = search.last_violation() {
            writeln!(self.out, "{}", record.violation.property)?;
            writeln!(self.out, "{}", record.violation.message)?;
        }

        for extension in extensions {
            extension.publish_property_violation(&mut *self, search);
        }
        self.out.flush()
    }

    pub fn publish_finished(&mut self, summary: &SearchSummary) -> io::Result<()> {
        self.publish_topic_start("results")?;
        if summary.violations.is_empty() {
            writeln!(self.out, "no errors detected")?;
        } else {
            for record in &summary.violations {
                writeln!(self.out, "error {}: {}", record.id, record.violation)?;
            }
        }

        self.publish_topic_start("statistics")?;
        writeln!(self.out, "paths explored:     {}", summary.paths_explored)?;
        writeln!(self.out, "truncated paths:    {}", summary.truncated_paths)?;
        writeln!(self.out, "max depth:          {}", summary.max_depth)?;

        self.publish_topic_start("search finished")?;
        self.out.flush()
    }
}

impl<W: Write> Publisher for ConsolePublisher<W> {
    fn out(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    fn publish_topic_start(&mut self, topic: &str) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{TOPIC_RULE} {topic}")
    }

    fn last_error_id(&self) -> &str {
        &self.last_error_id
    }
}
