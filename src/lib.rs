pub mod config;
pub mod setup;
pub mod supabase;
