//! Prompt templates and assembly
//!
//! Templates are Handlebars sources: `*.pmt` files in an override directory, else the embedded
//! defaults.

mod assembler;
mod embedded;
mod loader;

pub use assembler::{PromptAssembler, PromptInputs};
pub use loader::PromptLoader;
