use std::io::{self, Write};

use pathtrace_model::config::Config;
use pathtrace_search::listener::{Attach, Registrar, SearchListener};
use pathtrace_search::report::Publisher;
use pathtrace_search::search::SearchView;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::format::write_choices;
use crate::sink::{OwnedSink, SinkTarget, TraceSink};

const TRACE_START: &str = "//------------------------- choice trace";
const TRACE_END: &str = "//------------------------- end choice trace";

/// Records the choices that led to a property violation.
///
/// With `choice.trace` set, the tracker writes a self-contained trace to
/// that file on every violation. Without it, the tracker registers as a
/// publisher extension and adds a `choice trace #N` section to the report.
#[derive(Debug)]
pub struct ChoiceTracker {
    config: TrackerConfig,
    sink: TraceSink,
}

impl ChoiceTracker {
    /// Open the sink the configuration asks for.
    pub fn new(config: TrackerConfig) -> Self {
        let sink = match &config.trace {
            Some(path) => TraceSink::Owned(OwnedSink::open(path)),
            None => TraceSink::Report,
        };
        Self { config, sink }
    }

    pub fn with_sink(config: TrackerConfig, sink: TraceSink) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_report_extension(&self) -> bool {
        matches!(self.sink, TraceSink::Report)
    }

    /// Target of the owned sink, None in report-extension mode.
    pub fn sink_target(&self) -> Option<&SinkTarget> {
        match &self.sink {
            TraceSink::Owned(sink) => Some(sink.target()),
            TraceSink::Report => None,
        }
    }

    /// Replace the exclusion prefixes.
    pub fn set_excludes<I, S>(&mut self, excludes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = TrackerConfig {
            excludes: excludes.into_iter().map(Into::into).collect(),
            ..self.config.clone()
        };
    }

    /// Write the trace lines of the search's current path.
    pub fn print_choices<W: Write + ?Sized>(
        &self,
        out: &mut W,
        search: &dyn SearchView,
    ) -> io::Result<usize> {
        write_choices(out, &self.config, search.system_state().choice_generators())
    }
}

/// Header, markers and lines of a standalone trace.
fn write_trace(
    out: &mut OwnedSink,
    config: &TrackerConfig,
    search: &dyn SearchView,
) -> io::Result<usize> {
    writeln!(out, "// application: {}", search.sut_description())?;
    if config.allowed.is_empty() {
        writeln!(out, "// trace over all CG classes")?;
    } else {
        write!(out, "// trace over CG types: ")?;
        for kind in &config.allowed {
            write!(out, "{kind} ")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{TRACE_START}")?;
    let written = write_choices(out, config, search.system_state().choice_generators())?;
    writeln!(out, "{TRACE_END}")?;
    out.flush()?;
    Ok(written)
}

impl SearchListener for ChoiceTracker {
    fn property_violated(&mut self, search: &dyn SearchView) {
        let TraceSink::Owned(sink) = &mut self.sink else {
            return;
        };
        match write_trace(sink, &self.config, search) {
            Ok(lines) => debug!(lines, target = ?sink.target(), "choice trace written"),
            Err(err) => warn!(error = %err, "failed to write choice trace"),
        }
    }

    fn publish_property_violation(&mut self, publisher: &mut dyn Publisher, search: &dyn SearchView) {
        if !self.is_report_extension() {
            return;
        }
        let topic = format!("choice trace {}", publisher.last_error_id());
        let result = publisher
            .publish_topic_start(&topic)
            .and_then(|()| self.print_choices(publisher.out(), search));
        if let Err(err) = result {
            warn!(error = %err, "failed to publish choice trace");
        }
    }
}

impl Attach for ChoiceTracker {
    fn attach(config: &Config, registrar: &mut Registrar) -> Self {
        let tracker = Self::new(TrackerConfig::from_config(config));
        if tracker.is_report_extension() {
            registrar.add_publisher_extension();
        }
        debug!(
            report_extension = tracker.is_report_extension(),
            format = ?tracker.config.format,
            "choice tracker attached"
        );
        tracker
    }
}
