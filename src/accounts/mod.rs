//! Account management: registration, login, password reset, and settings.

pub mod password;
pub mod reset;
pub mod settings;
pub mod users;
pub mod validate;

pub use settings::UserSettings;
pub use users::User;
