//! API endpoint handlers.
//!
//! One module per resource. Handlers open a connection per request and
//! delegate to the repository / domain modules.

pub mod appointments;
pub mod clinics;
pub mod health;
pub mod patients;
pub mod providers;
pub mod sync;
pub mod visits;
