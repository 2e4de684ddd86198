use thiserror::Error;

/// Errors that can occur while registering a system with the scheduler.
#[derive(Debug, Error, PartialEq)]
pub enum SystemRegistrationError {
    #[error("system name must not be empty")]
    EmptyName,

    #[error("init system '{name}' does not match any components")]
    EmptyAccess { name: String },
}
