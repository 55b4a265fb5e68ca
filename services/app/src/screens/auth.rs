//! services/app/src/screens/auth.rs
//!
//! Login and sign-up forms.
//!
//! Submitting a form never navigates. A successful sign-in shows up as a session
//! event from the identity provider, and that event alone moves the app to Home.

use crate::context::{AppContext, NoticeLevel};
use regex::Regex;
use shortcut_core::ports::AuthError;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{info, warn};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    Email,
    Password,
    ConfirmPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Invalid,
    /// The provider accepted the request.
    Submitted,
    Rejected(AuthError),
}

pub type FieldErrors = BTreeMap<FormField, &'static str>;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"))
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.trim().is_empty() {
        errors.insert(FormField::Email, "Email is required");
    } else if !email_pattern().is_match(email) {
        errors.insert(FormField::Email, "Please enter a valid email");
    }
}

fn check_password(password: &str, errors: &mut FieldErrors) {
    if password.trim().is_empty() {
        errors.insert(FormField::Password, "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(FormField::Password, "Password must be at least 6 characters");
    }
}

//=========================================================================================
// Login
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    errors: FieldErrors,
    loading: bool,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates a field and clears its error.
    pub fn set(&mut self, field: FormField, value: &str) {
        match field {
            FormField::Email => self.email = value.to_string(),
            FormField::Password => self.password = value.to_string(),
            FormField::Name | FormField::ConfirmPassword => return,
        }
        self.errors.remove(&field);
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: FormField) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn validate(&mut self) -> bool {
        let mut errors = FieldErrors::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        self.errors = errors;
        self.errors.is_empty()
    }

    pub async fn submit(&mut self, ctx: &AppContext) -> SubmitOutcome {
        if !self.validate() {
            return SubmitOutcome::Invalid;
        }

        self.loading = true;
        let result = ctx.identity.sign_in(self.email.trim(), &self.password).await;
        self.loading = false;

        match result {
            Ok(session) => {
                info!(uid = %session.uid, "Login accepted.");
                SubmitOutcome::Submitted
            }
            Err(e) => {
                warn!("Login failed: {e}");
                ctx.notify(NoticeLevel::Error, "Login Failed", login_failure_message(&e));
                SubmitOutcome::Rejected(e)
            }
        }
    }
}

pub fn login_failure_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::UserNotFound
        | AuthError::WrongPassword
        | AuthError::InvalidCredentials
        | AuthError::InvalidEmail
        | AuthError::TooManyRequests
        | AuthError::Network(_) => err.user_message(),
        _ => "Login failed. Please try again.",
    }
}

//=========================================================================================
// Sign-up
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    errors: FieldErrors,
    loading: bool,
}

impl SignupForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: FormField, value: &str) {
        let slot = match field {
            FormField::Name => &mut self.name,
            FormField::Email => &mut self.email,
            FormField::Password => &mut self.password,
            FormField::ConfirmPassword => &mut self.confirm_password,
        };
        *slot = value.to_string();
        self.errors.remove(&field);
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: FormField) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn validate(&mut self) -> bool {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert(FormField::Name, "Name is required");
        } else if name.chars().count() < MIN_NAME_LEN {
            errors.insert(FormField::Name, "Name must be at least 2 characters");
        }

        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);

        if self.confirm_password.trim().is_empty() {
            errors.insert(FormField::ConfirmPassword, "Please confirm your password");
        } else if self.password != self.confirm_password {
            errors.insert(FormField::ConfirmPassword, "Passwords do not match");
        }

        self.errors = errors;
        self.errors.is_empty()
    }

    /// Creates the account, then the user's interaction record.
    pub async fn submit(&mut self, ctx: &AppContext) -> SubmitOutcome {
        if !self.validate() {
            return SubmitOutcome::Invalid;
        }

        self.loading = true;
        let name = self.name.trim().to_string();
        let result = ctx
            .identity
            .sign_up(self.email.trim(), &self.password, &name)
            .await;

        let outcome = match result {
            Ok(session) => {
                if let Err(e) = ctx.interactions.initialize_user(&session, &name).await {
                    // The account exists; the record is created lazily on first read.
                    warn!(uid = %session.uid, "Could not create user document: {e}");
                }
                ctx.notify(
                    NoticeLevel::Info,
                    "🎉 Account Created!",
                    format!(
                        "Welcome to AI ShortCut, {}! Your account has been created successfully.",
                        name
                    ),
                );
                SubmitOutcome::Submitted
            }
            Err(e) => {
                warn!("Signup failed: {e}");
                ctx.notify(NoticeLevel::Error, "Signup Failed", signup_failure_message(&e));
                SubmitOutcome::Rejected(e)
            }
        };
        self.loading = false;
        outcome
    }
}

pub fn signup_failure_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::EmailAlreadyInUse
        | AuthError::WeakPassword
        | AuthError::InvalidEmail
        | AuthError::Network(_) => err.user_message(),
        _ => "Account creation failed. Please try again.",
    }
}
