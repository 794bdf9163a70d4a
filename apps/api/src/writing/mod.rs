pub mod assistant;
pub mod handlers;
pub mod prompts;
pub mod safety;
pub mod text;
