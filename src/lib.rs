//! formfill: answers the free-text questions of an HTML application form on
//! behalf of an authenticated user, one LLM completion per question.

pub mod auth;
pub mod config;
pub mod context;
pub mod deadline;
pub mod error;
pub mod extract;
pub mod llm;
pub mod logger;
pub mod pipeline;
pub mod profile;
pub mod prompt;
pub mod server;
