// Application layer: the ledger engine every front end talks to.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
