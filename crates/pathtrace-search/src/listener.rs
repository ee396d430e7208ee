use pathtrace_model::config::Config;

use crate::report::Publisher;
use crate::search::SearchView;

/// Observer of a running search.
///
/// All callbacks run synchronously on the search thread. Listeners get a
/// read-only view of the search and must not block beyond buffered I/O.
pub trait SearchListener {
    fn search_started(&mut self, _search: &dyn SearchView) {}

    /// The program under test violated a property. The violating path is
    /// still on the search's choice stack.
    fn property_violated(&mut self, _search: &dyn SearchView) {}

    fn search_finished(&mut self, _search: &dyn SearchView) {}

    /// Contribution to the report section of the current violation. Only
    /// called on listeners registered as publisher extensions. The
    /// publisher's writer is borrowed for the duration of the call.
    fn publish_property_violation(
        &mut self,
        _publisher: &mut dyn Publisher,
        _search: &dyn SearchView,
    ) {
    }
}

/// Registration handle passed to a listener while it attaches.
#[derive(Debug, Default)]
pub struct Registrar {
    publisher_extension: bool,
}

impl Registrar {
    pub fn new() -> Self {
        Self {
            publisher_extension: false,
        }
    }

    /// Ask to be called back for every violation section of the report.
    pub fn add_publisher_extension(&mut self) {
        self.publisher_extension = true;
    }

    pub fn is_publisher_extension(&self) -> bool {
        self.publisher_extension
    }
}

/// A listener constructed from configuration at attach time.
pub trait Attach: SearchListener + Sized + 'static {
    fn attach(config: &Config, registrar: &mut Registrar) -> Self;
}
