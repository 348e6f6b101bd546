mod auth;
mod stream;

pub(crate) use auth::*;
pub(crate) use stream::*;
