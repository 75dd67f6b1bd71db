//! Database entities.

pub mod account;
pub mod violation;

pub use account::Entity as Account;
pub use violation::Entity as Violation;
