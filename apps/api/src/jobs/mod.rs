pub mod adzuna;
pub mod cache;
pub mod handlers;
