pub mod abi;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod plugin;
pub mod processor;
pub mod solver;
pub mod sql;
pub mod verifier;
pub mod writer;
