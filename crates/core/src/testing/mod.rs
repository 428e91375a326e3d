//! Mock implementations of every external trait (`Provider`, `StorageAdapter`,
//! `Translator`), used by unit tests throughout the crate and by the server crate's
//! integration tests. Not compiled into release builds.

mod mock_provider;
mod mock_storage;
mod mock_translator;

pub use mock_provider::MockProvider;
pub use mock_storage::MockStorage;
pub use mock_translator::MockTranslator;

pub mod fixtures;
