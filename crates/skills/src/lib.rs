//! Skill synchronization: provenance tracking, origin sources, and the
//! install/update engine.
//!
//! Skills are directories containing a `SKILL.md` file. Each installed
//! skill carries a `.metadata.json` provenance record tying it back to its
//! origin (a GitHub repo subtree at a branch, or a local path) and the
//! version last synced from it.

pub mod github;
pub mod local;
pub mod provenance;
pub mod registry;
pub mod source;
pub mod sync;
pub mod types;
