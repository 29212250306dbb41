//! Scoped connection guard.

use std::ops::{Deref, DerefMut};

use crate::scpi::{ScpiClient, ScpiError};

/// A connection that is released when the guard goes out of scope.
///
/// Created by [`ScpiClient::session`], which attempts to connect and always
/// returns a guard. Dropping the guard calls [`ScpiClient::disconnect`] on
/// every exit path: normal end of scope, early return through `?`, and
/// unwinding from a panic.
///
/// The guard derefs to the client, so `send_command` and `query` are called on
/// it directly.
pub struct ScpiSession<'a> {
    client: &'a mut ScpiClient,
    connect_error: Option<ScpiError>,
}

impl<'a> ScpiSession<'a> {
    pub(crate) fn open(client: &'a mut ScpiClient) -> Self {
        let connect_error = client.connect().err();
        Self {
            client,
            connect_error,
        }
    }

    /// Whether the client currently holds a connection.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Why the connect on entry failed, if it did.
    pub fn connect_error(&self) -> Option<&ScpiError> {
        self.connect_error.as_ref()
    }
}

impl Deref for ScpiSession<'_> {
    type Target = ScpiClient;

    fn deref(&self) -> &ScpiClient {
        &*self.client
    }
}

impl DerefMut for ScpiSession<'_> {
    fn deref_mut(&mut self) -> &mut ScpiClient {
        &mut *self.client
    }
}

impl Drop for ScpiSession<'_> {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}
