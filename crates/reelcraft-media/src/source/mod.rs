//! Source resolution for local files and remote video URLs.

pub mod catalog;
pub mod resolver;
pub mod selector;
pub mod ytdlp;

pub use catalog::{choose_streams, SelectionRules, StreamCatalog, StreamChoice, StreamKind, StreamVariant};
pub use resolver::{is_remote_ref, ResolverConfig, SourceResolver};
pub use selector::{SelectorConfig, StreamSelector};
pub use ytdlp::{StreamSource, YtDlp};
