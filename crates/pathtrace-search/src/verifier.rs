use std::io::{self, Write};

use pathtrace_model::config::Config;
use tracing::debug;

use crate::listener::{Attach, Registrar, SearchListener};
use crate::report::ConsolePublisher;
use crate::search::{Execution, Search, SearchConfig, SearchError, SearchSummary, SearchView, Violation};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error("report output failed: {0}")]
    Report(#[from] io::Error),
}

struct AttachedListener {
    listener: Box<dyn SearchListener>,
    publisher_extension: bool,
}

/// Host of a verification run: owns the configuration, the search, the
/// report publisher and every attached listener.
pub struct Verifier<W: Write = io::Stdout> {
    config: Config,
    search: Search,
    publisher: ConsolePublisher<W>,
    listeners: Vec<AttachedListener>,
}

impl Verifier<io::Stdout> {
    pub fn new(config: Config) -> Self {
        Self::with_writer(config, io::stdout())
    }
}

impl<W: Write> Verifier<W> {
    /// Host whose report goes to `out`.
    pub fn with_writer(config: Config, out: W) -> Self {
        let search = Search::new(SearchConfig::from_config(&config));
        Self {
            config,
            search,
            publisher: ConsolePublisher::new(out),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Construct `L` from this host's configuration and attach it.
    pub fn attach<L: Attach>(&mut self) {
        let mut registrar = Registrar::new();
        let listener = L::attach(&self.config, &mut registrar);
        self.add_listener(Box::new(listener), registrar.is_publisher_extension());
    }

    pub fn add_listener(&mut self, listener: Box<dyn SearchListener>, publisher_extension: bool) {
        debug!(
            index = self.listeners.len(),
            publisher_extension, "listener attached"
        );
        self.listeners.push(AttachedListener {
            listener,
            publisher_extension,
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Search `program` and publish the report.
    pub fn run<P>(&mut self, program: P) -> Result<SearchSummary, VerifyError>
    where
        P: FnMut(&mut Execution<'_>) -> Result<(), Violation>,
    {
        let mut dispatch = Dispatch {
            listeners: &mut self.listeners,
            publisher: &mut self.publisher,
            report_error: None,
        };
        let summary = self.search.run(program, &mut dispatch)?;
        if let Some(err) = dispatch.report_error.take() {
            return Err(err.into());
        }
        self.publisher.publish_finished(&summary)?;
        Ok(summary)
    }

    pub fn search(&self) -> &Search {
        &self.search
    }

    pub fn publisher(&self) -> &ConsolePublisher<W> {
        &self.publisher
    }

    /// Consume the host and return the report writer.
    pub fn into_writer(self) -> W {
        self.publisher.into_inner()
    }
}

/// Fans search callbacks out to the attached listeners and the publisher.
struct Dispatch<'a, W: Write> {
    listeners: &'a mut [AttachedListener],
    publisher: &'a mut ConsolePublisher<W>,
    report_error: Option<io::Error>,
}

impl<W: Write> Dispatch<'_, W> {
    fn record(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            if self.report_error.is_none() {
                self.report_error = Some(err);
            }
        }
    }
}

impl<W: Write> SearchListener for Dispatch<'_, W> {
    fn search_started(&mut self, search: &dyn SearchView) {
        let result = self.publisher.publish_start(search);
        self.record(result);
        for attached in self.listeners.iter_mut() {
            attached.listener.search_started(search);
        }
    }

    fn property_violated(&mut self, search: &dyn SearchView) {
        for attached in self.listeners.iter_mut() {
            attached.listener.property_violated(search);
        }
        let extensions = self
            .listeners
            .iter_mut()
            .filter(|attached| attached.publisher_extension)
            .map(|attached| &mut attached.listener);
        let result = self.publisher.publish_property_violation(search, extensions);
        self.record(result);
    }

    fn search_finished(&mut self, search: &dyn SearchView) {
        for attached in self.listeners.iter_mut() {
            attached.listener.search_finished(search);
        }
    }
}
