//! Client-side form validation
//!
//! Forms are checked before anything is sent; failures are reported per
//! field so they can be rendered inline.

use crate::api::{DiscountKind, NewDiscount, ProductInput, RegisterRequest, ShippingAddress};
use crate::error::{Error, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const OTP_LEN: usize = 6;

/// Field name to message. One message per field: the first failure wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }

    fn require(&mut self, field: &str, value: &str, label: &str) {
        if value.trim().is_empty() {
            self.add(field, &format!("{} is required", label));
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}

/// Digits with an optional leading `+`, spaces and dashes allowed.
pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    let digits = phone
        .strip_prefix('+')
        .unwrap_or(phone)
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect::<String>();
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    errors.require("email", email, "Email");
    if !email.trim().is_empty() && !is_valid_email(email) {
        errors.add("email", "Enter a valid email address");
    }
}

fn check_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            field,
            &format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email);
    errors.require("password", password, "Password");
    errors.into_result()
}

pub fn validate_registration(form: &RegisterRequest, confirm_password: &str) -> Result<()> {
    let mut errors = ValidationErrors::new();
    errors.require("name", &form.name, "Name");
    check_email(&mut errors, &form.email);
    if let Some(phone) = &form.phone {
        if !is_valid_phone(phone) {
            errors.add("phone", "Enter a valid phone number");
        }
    }
    check_password(&mut errors, "password", &form.password);
    if form.password != confirm_password {
        errors.add("confirmPassword", "Passwords do not match");
    }
    errors.into_result()
}

pub fn validate_otp(otp: &str) -> Result<()> {
    let otp = otp.trim();
    if otp.len() == OTP_LEN && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::invalid(
            "otp",
            &format!("Enter the {}-digit code", OTP_LEN),
        ))
    }
}

pub fn validate_new_password(password: &str, confirm_password: &str) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_password(&mut errors, "password", password);
    if password != confirm_password {
        errors.add("confirmPassword", "Passwords do not match");
    }
    errors.into_result()
}

pub fn validate_shipping_address(address: &ShippingAddress) -> Result<()> {
    let mut errors = ValidationErrors::new();
    errors.require("fullName", &address.full_name, "Full name");
    errors.require("phone", &address.phone, "Phone");
    if !address.phone.trim().is_empty() && !is_valid_phone(&address.phone) {
        errors.add("phone", "Enter a valid phone number");
    }
    errors.require("street", &address.street, "Street address");
    errors.require("city", &address.city, "City");
    errors.require("postalCode", &address.postal_code, "Postal code");
    errors.require("country", &address.country, "Country");
    errors.into_result()
}

pub fn validate_product(product: &ProductInput) -> Result<()> {
    let mut errors = ValidationErrors::new();
    errors.require("name", &product.name, "Product name");
    if product.price <= Decimal::ZERO {
        errors.add("price", "Price must be greater than zero");
    }
    if let Some(original) = product.original_price {
        if original < product.price {
            errors.add("originalPrice", "Original price cannot be below the price");
        }
    }
    errors.require("category", &product.category, "Category");
    errors.into_result()
}

pub fn validate_discount(discount: &NewDiscount) -> Result<()> {
    let mut errors = ValidationErrors::new();
    errors.require("product", &discount.product, "Product");
    if discount.value <= Decimal::ZERO {
        errors.add("value", "Discount value must be greater than zero");
    } else if discount.discount_type == DiscountKind::Percentage
        && discount.value > Decimal::ONE_HUNDRED
    {
        errors.add("value", "Percentage discount cannot exceed 100");
    }
    if discount.end_date <= discount.start_date {
        errors.add("endDate", "End date must be after the start date");
    }
    errors.into_result()
}
