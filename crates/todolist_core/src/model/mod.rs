//! Domain model for tasks and the categories they are filed under.
//!
//! # Responsibility
//! - Define the canonical shapes used by repositories and presentation state.
//! - Own write-side validation rules.
//!
//! # Invariants
//! - Id `0` means "not yet persisted"; the store assigns the real id.
//! - A task owns its checklist; checklist items have no identity of their own.

pub mod category;
pub mod task;
