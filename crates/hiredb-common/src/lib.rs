//! hiredb common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared pieces used by every hiredb workspace member:
//!
//! - **Types**: the star-schema records (departments, jobs, hired employees)
//! - **Error Handling**: [`HiredbError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by environment variables

pub mod error;
pub mod logging;
pub mod types;

pub use error::{HiredbError, Result};
