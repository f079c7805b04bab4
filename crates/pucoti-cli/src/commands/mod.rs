pub mod config;
pub mod history;
pub mod parse;
pub mod run;
pub mod stats;
