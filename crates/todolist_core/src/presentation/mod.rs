//! Presentation state: derived, observable view state plus command intake.
//!
//! # Responsibility
//! - Subscribe to repository streams and publish UI-ready projections.
//! - Turn user commands into repository writes.
//! - Deliver one-shot UI signals separately from replayed state.
//!
//! # Invariants
//! - Published state values are immutable snapshots.
//! - Only validation failures and storage failures during commands become
//!   user-visible messages.
//! - A decode failure (`RepoError::InvalidData`) in a live derivation is
//!   logged at error level and closes that state permanently. Observers see
//!   `changed`/`wait_for` return `None` and `is_closed()` turn true;
//!   `current()` keeps the last good value. Repairing the row does not
//!   reopen it; a new view model is needed.

pub mod add_edit;
pub mod list;
pub mod shared_state;
pub mod ui_event;

pub(crate) const REQUIRED_FIELDS_MESSAGE: &str = "Title and category are required.";
pub(crate) const STORAGE_ERROR_MESSAGE: &str = "Could not save changes. Please try again.";
