use log::info;

use super::{auth::jwt, crypto};
use crate::{
    db::Store,
    dto::{LoginUserRequest, NewUserDto, SessionResponse, UserView},
    errors::AppError,
};

pub async fn create<S: Store>(store: &S, dto: NewUserDto) -> Result<UserView, AppError> {
    let new_user = dto.validate()?;
    if store.find_user_by_email(&new_user.email).await?.is_some() {
        return Err(AppError::UserExists);
    }
    let password_hash = crypto::password_digest(&new_user.password);
    let user = store
        .create_user(&new_user.name, &new_user.email, &password_hash)
        .await
        .map_err(|err| AppError::on_duplicate(err, AppError::UserExists))?;
    info!("user {} registered", user.id);
    Ok(user.into())
}

pub async fn login<S: Store>(
    store: &S,
    req: LoginUserRequest,
    secret: &str,
    expires_in: u64,
) -> Result<SessionResponse, AppError> {
    let (email, password) = match (req.email, req.password) {
        (Some(email), Some(password)) => (email.trim().to_lowercase(), password),
        _ => return Err(AppError::ValidationError),
    };
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::UserNotFound)?;
    if !crypto::verify_password(&password, &user.password_hash) {
        return Err(AppError::PasswordMismatch);
    }
    let token = jwt::create(user.id, secret, expires_in)?;
    info!("user {} opened a session", user.id);
    Ok(SessionResponse {
        user: user.into(),
        token,
    })
}
