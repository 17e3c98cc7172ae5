//! Video generation providers.

mod evolink;

pub use evolink::{EvolinkModel, EvolinkProvider, EvolinkProviderBuilder, DEFAULT_BASE_URL};
