pub mod args;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod http;
pub mod resolver;
pub mod strvals;
pub mod tagfile;
pub mod update;
pub mod values;
