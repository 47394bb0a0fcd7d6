//! Form validation done before anything is sent to the backend.

use std::fmt;

use bazaar_core::{Email, EmailError, PhoneNumber, PhoneNumberError};
use serde::Deserialize;
use thiserror::Error;

use crate::api::{LoginRequest, RegisterRequest};

/// Minimum password length accepted by the registration form.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A form value the backend should never see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid email address: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid phone number: {0}")]
    Phone(#[from] PhoneNumberError),

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("You must accept the terms of service")]
    TermsNotAccepted,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value.to_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

/// Login form submission.
#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Page to return to after signing in.
    #[serde(default)]
    pub next: Option<String>,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

impl LoginForm {
    /// Check required fields and build the login request.
    ///
    /// # Errors
    ///
    /// Returns an error if the username or password is blank.
    pub fn validate(&self) -> Result<LoginRequest, ValidationError> {
        let username = required(&self.username, "Username")?;
        if self.password.is_empty() {
            return Err(ValidationError::Required("Password"));
        }
        Ok(LoginRequest {
            username,
            password: self.password.clone(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Registration form submission.
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    /// Checkbox; present (usually `"on"`) only when ticked.
    #[serde(default)]
    pub terms: Option<String>,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    /// Check every field and build the registration request.
    ///
    /// Fields are checked in form order; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        let username = required(&self.username, "Username")?;
        let full_name = required(&self.full_name, "Full name")?;
        let email = Email::parse(&required(&self.email, "Email")?)?;
        let phone = PhoneNumber::parse(&required(&self.phone_number, "Phone number")?)?;

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        if self.password != self.password_confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.terms.is_none() {
            return Err(ValidationError::TermsNotAccepted);
        }

        Ok(RegisterRequest {
            username,
            password: self.password.clone(),
            password_confirm: self.password_confirm.clone(),
            full_name,
            email: email.into_inner(),
            phone_number: phone.as_str().to_owned(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cart & checkout
// ─────────────────────────────────────────────────────────────────────────────

/// Checkout form submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub shipping_address: String,
}

impl CheckoutForm {
    /// Trimmed shipping address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is blank.
    pub fn validate(&self) -> Result<String, ValidationError> {
        required(&self.shipping_address, "Shipping address")
    }
}

/// Quantity for adding a product to the cart.
///
/// # Errors
///
/// Returns an error for zero.
pub const fn validate_quantity(quantity: u32) -> Result<u32, ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::InvalidQuantity);
    }
    Ok(quantity)
}
