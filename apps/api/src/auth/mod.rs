pub mod handlers;
pub mod password;
pub mod referral;
pub mod reset;
pub mod tokens;
pub mod users;
pub mod validation;
