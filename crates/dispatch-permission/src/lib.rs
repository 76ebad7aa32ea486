//! Permission aggregate: controller, store seam, and event notification.
//!
//! A user's permissions are a set of tags. Updates replace the whole set
//! inside one transactional unit, with a `permissions.updated` event
//! recorded in the same unit, so readers and consumers never see a
//! partially applied set.

mod controller;
mod error;
mod notifier;
mod store;

pub use controller::PermissionController;
pub use error::{PermissionError, PermissionResult};
pub use notifier::PermissionNotifier;
pub use store::{PermissionStore, SqlitePermissionStore};
