//! Database repositories.

mod account;
mod violation;

pub use account::AccountRepository;
pub use violation::ViolationRepository;
