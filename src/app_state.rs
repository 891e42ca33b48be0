//! The state shared by every route handler.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{Error, auth::DEFAULT_COOKIE_DURATION, db::initialize, timezone::get_local_offset};

/// The state of the web server.
///
/// Handlers take the parts they need through their own state structs, see the
/// [FromRef] implementations next to each handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key for encrypting the private auth cookie.
    pub cookie_key: Key,

    /// How long an auth cookie stays valid without activity.
    pub cookie_duration: Duration,

    /// The server's timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// Transaction dates are shown and filtered in this timezone.
    pub local_timezone: String,

    /// The single connection to the bank's database.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create the app state and make sure the database has every table.
    ///
    /// # Errors
    /// Returns an [Error::InvalidTimezoneError] if `local_timezone` is not a
    /// canonical timezone name, or an [Error::SqlError] if the tables could not
    /// be created.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

// Lets `PrivateCookieJar` find the key in the app state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive the cookie key from `secret`.
///
/// The same secret always gives the same key, so sessions survive a restart.
pub fn create_cookie_key(secret: &str) -> Key {
    Key::from(&Sha512::digest(secret))
}
