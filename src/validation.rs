use lettre::Address;

use crate::errors::AppError;

/// Subjects are compared case-insensitively.
pub fn normalize_mail(mail: &str) -> String {
    mail.trim().to_lowercase()
}

/// Syntactic check only; nothing is resolved or delivered.
pub fn validate_mail(mail: &str) -> Result<String, AppError> {
    let mail = normalize_mail(mail);

    if mail.is_empty() || !mail.is_ascii() {
        return Err(AppError::Validation(mail));
    }

    mail.parse::<Address>()
        .map_err(|_| AppError::Validation(mail.clone()))?;

    Ok(mail)
}
