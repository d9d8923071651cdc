//! NetSieve Filter List Compiler
//!
//! This crate turns ABP-style filter list text into compiled rules, manages
//! the registered lists, and provides the [`Engine`] facade that embedding
//! layers (CLI, wasm) drive.

pub mod defaults;
pub mod engine;
pub mod lists;
pub mod parser;

pub use defaults::{DEFAULT_LIST, DEFAULT_LIST_NAME};
pub use engine::Engine;
pub use lists::{FilterList, FilterListManager, ListError, ListInfo};
pub use parser::{parse, parse_list, ParseError, ParseReport, RejectedLine};
