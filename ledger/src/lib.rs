//! Ledger collaborator interfaces.
//!
//! The consensus core never owns storage. It reads the chain tip, weights and
//! containers through [`Ledger`], asks a [`BlockManager`] whether a block obeys
//! ledger rules, and applies containers through a [`ContainerProcessor`].
//! Implementations are shared as `Arc<dyn …>` and must serialize their own
//! writes.

pub mod error;
pub mod state;
pub mod traits;

pub use error::LedgerError;
pub use state::{ContainerAddState, ValidateOptions, ValidationState};
pub use traits::{BlockManager, ContainerProcessor, Ledger};
