//! One-shot banners carried across a redirect in the session.

use actix_session::Session;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const FLASH_KEY: &str = "flash";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

fn set(session: &Session, kind: FlashKind, message: &str) -> Result<(), AppError> {
    session.insert(
        FLASH_KEY,
        Flash {
            kind,
            message: message.to_owned(),
        },
    )?;
    Ok(())
}

pub fn success(session: &Session, message: &str) -> Result<(), AppError> {
    set(session, FlashKind::Success, message)
}

pub fn error(session: &Session, message: &str) -> Result<(), AppError> {
    set(session, FlashKind::Error, message)
}

pub fn take(session: &Session) -> Option<Flash> {
    session.remove_as::<Flash>(FLASH_KEY).and_then(Result::ok)
}
