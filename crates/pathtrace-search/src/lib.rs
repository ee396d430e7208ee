pub mod listener;
pub mod report;
pub mod search;
pub mod verifier;

pub use listener::{Attach, Registrar, SearchListener};
pub use report::{ConsolePublisher, Publisher};
pub use search::{Execution, Search, SearchConfig, SearchError, SearchSummary, SearchView, Violation};
pub use verifier::{Verifier, VerifyError};
