//! swish: a small command interpreter whose pipelines run every stage as a
//! concurrent child process connected by OS pipes.

pub mod builtins;
pub mod error;
pub mod executor;
pub mod invoker;
pub mod launcher;
pub mod parser;
pub mod pipe_set;
pub mod pipeline;
pub mod redirect;
pub mod status;
pub mod streams;
pub mod tokens;
