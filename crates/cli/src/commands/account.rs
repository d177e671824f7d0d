//! `vivias login|register|logout|whoami`

use vivias_client::{StorefrontContext, accepted};
use vivias_core::{Email, LoginCredentials, RegistrationData};

use super::CommandError;
use crate::output;

/// Raw registration input from the command line.
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub phone: Option<String>,
}

pub async fn login(
    context: &StorefrontContext,
    email: &str,
    password: String,
    remember: bool,
) -> Result<String, CommandError> {
    let credentials = LoginCredentials {
        email: Email::parse(email)?,
        password,
        remember,
    };
    let response = accepted(context.auth().login(&credentials).await?)?;

    Ok(response.data.map_or_else(
        || "Signed in".to_string(),
        |user| format!("Signed in as {}", output::user(&user)),
    ))
}

pub async fn register(
    context: &StorefrontContext,
    form: RegistrationForm,
) -> Result<String, CommandError> {
    let data = RegistrationData {
        name: form.name,
        email: Email::parse(&form.email)?,
        password: form.password,
        password_confirmation: form.password_confirmation,
        phone: form.phone.filter(|phone| !phone.trim().is_empty()),
    };
    let response = accepted(context.auth().register(&data).await?)?;

    Ok(response.data.map_or_else(
        || "Account created".to_string(),
        |user| format!("Account created for {}", output::user(&user)),
    ))
}

pub async fn logout(context: &StorefrontContext) -> String {
    context.auth().logout().await;
    "Signed out".to_string()
}

pub fn whoami(context: &StorefrontContext) -> String {
    context
        .auth()
        .user()
        .map_or_else(|| "Not signed in".to_string(), |user| output::user(&user))
}
