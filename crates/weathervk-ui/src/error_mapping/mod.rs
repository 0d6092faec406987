//! Maps UI service errors to weathervk_core::AppError for consistent
//! user-facing messages. Store errors convert in weathervk-store.

mod weather;
