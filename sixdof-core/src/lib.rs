#![warn(clippy::pedantic)]
#![allow(clippy::needless_pass_by_value, clippy::type_complexity)] // too many false positives from system params.
#![allow(clippy::collapsible_else_if)] // this is usually intentional
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

pub mod level;
pub mod load;
pub mod pid;
pub mod try_log;
