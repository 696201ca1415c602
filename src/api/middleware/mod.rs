//! API middleware.
//!
//! Execution order (outermost → innermost):
//! 1. CORS
//! 2. `Cache-Control: no-store` on every response
//! 3. Access logger

pub mod audit;
