//! Concrete HTTP-backed implementations of the collaborator traits
//! (spec §6). The core only ever depends on the traits in
//! `crate::pipeline::*` and `crate::agent::graph`; these adapters are
//! swapped in once, at startup, by `main`.

pub mod openai;
pub mod vision;
