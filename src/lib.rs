// ABOUTME: Library root for fm-term-meta-migrator
// ABOUTME: Exposes the migration engine, platform seam, and MySQL backend

pub mod carriers;
pub mod commands;
pub mod platform;
pub mod preflight;
pub mod utils;
pub mod wordpress;
