//! Authentication endpoints

use super::types::*;
use super::ApiClient;
use crate::error::{Error, Result};
use crate::validation;
use log::info;
use reqwest::Method;
use serde_json::json;
use shopfront_stores::Session;

/// Client for `/auth`. Calls that yield a session store it.
pub struct AuthApi<'a> {
    api: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(super) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    fn store(&self, response: &AuthResponse) -> Option<Session> {
        let session = response.session()?;
        info!("Signed in as {} ({})", session.user.email, session.role());
        self.api.session().login(session.clone());
        Some(session)
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        validation::validate_login(email, password)?;
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self
            .api
            .request(Method::POST, "/auth/login")
            .json(&request)?
            .execute::<AuthResponse>()
            .await?;
        self.store(&response).ok_or_else(|| {
            Error::unauthorized(
                response
                    .message
                    .as_deref()
                    .unwrap_or("Login did not return a session"),
            )
        })
    }

    /// Create an account. Until the emailed code is verified the response
    /// carries only a message.
    pub async fn register(
        &self,
        request: &RegisterRequest,
        confirm_password: &str,
    ) -> Result<AuthResponse> {
        validation::validate_registration(request, confirm_password)?;
        let response = self
            .api
            .request(Method::POST, "/auth/register")
            .json(request)?
            .execute::<AuthResponse>()
            .await?;
        self.store(&response);
        Ok(response)
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<Session> {
        validation::validate_otp(otp)?;
        let response = self
            .api
            .request(Method::POST, "/auth/verify-otp")
            .json(&json!({ "email": email.trim(), "otp": otp.trim() }))?
            .execute::<AuthResponse>()
            .await?;
        self.store(&response)
            .ok_or_else(|| Error::general("Verification did not return a session"))
    }

    pub async fn resend_otp(&self, email: &str) -> Result<MessageResponse> {
        self.api
            .request(Method::POST, "/auth/resend-otp")
            .json(&json!({ "email": email.trim() }))?
            .execute()
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse> {
        if !validation::is_valid_email(email) {
            return Err(Error::invalid("email", "Enter a valid email address"));
        }
        self.api
            .request(Method::POST, "/auth/forgot-password")
            .json(&json!({ "email": email.trim() }))?
            .execute()
            .await
    }

    /// Set a new password with the token from the reset email
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<MessageResponse> {
        validation::validate_new_password(password, confirm_password)?;
        self.api
            .request(Method::POST, "/auth/reset-password")
            .segments([token])
            .json(&json!({ "password": password }))?
            .execute()
            .await
    }
}
