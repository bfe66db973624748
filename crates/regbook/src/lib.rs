//! `regbook` - Local-first registration ledger for the ShikshaSathi
//! tutoring network.
//!
//! This library accumulates registration form submissions (tutors,
//! partner schools, parents/students) into durable local collections,
//! encodes them through a fixed header/row codec, exports them as
//! spreadsheets, and can mirror a combined snapshot for polling by
//! other local consumers.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod form;
pub mod logging;
pub mod mirror;
pub mod storage;
pub mod store;

pub use config::Config;
pub use context::AppContext;
pub use error::{Error, Result};
pub use export::Exporter;
pub use form::{Collection, FieldValue, Row, Submission};
pub use logging::init_logging;
pub use mirror::{Mirror, Snapshot};
pub use storage::Storage;
pub use store::{RecordStore, StoreStats};
