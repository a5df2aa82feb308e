// SPDX-License-Identifier: GPL-3.0-only

//! Share sheet through the XDG desktop portal
//!
//! The photo is attached to a new message via `org.freedesktop.portal.Email`,
//! with the share title as its subject. The portal answers asynchronously on
//! a per-call `org.freedesktop.portal.Request` object; the user may send,
//! discard or abandon the message.

use crate::errors::SaveError;
use futures::StreamExt;
use std::collections::HashMap;
use std::os::fd::AsFd;
use std::path::Path;
use tracing::{debug, info};
use zbus::zvariant::{Fd, OwnedObjectPath, OwnedValue, Value};

const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const EMAIL_INTERFACE: &str = "org.freedesktop.portal.Email";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

/// Portal response codes carried by `Request.Response`
pub const RESPONSE_SUCCESS: u32 = 0;
pub const RESPONSE_CANCELLED: u32 = 1;

/// Connection to the desktop portal's share-capable interface
pub struct SharePortal {
    connection: zbus::Connection,
}

impl SharePortal {
    /// Connect to the session bus; `None` when no portal offers sharing
    pub async fn connect() -> Option<Self> {
        let connection = match zbus::Connection::session().await {
            Ok(connection) => connection,
            Err(e) => {
                debug!(error = %e, "No session bus for the share portal");
                return None;
            }
        };

        let proxy = zbus::Proxy::new(&connection, PORTAL_DESTINATION, PORTAL_PATH, EMAIL_INTERFACE)
            .await
            .ok()?;
        match proxy.get_property::<u32>("version").await {
            Ok(version) => {
                debug!(version, "Share portal available");
                Some(Self { connection })
            }
            Err(e) => {
                debug!(error = %e, "Share portal not running");
                None
            }
        }
    }

    /// Offer `path` with `title`; resolves with the portal's response code
    /// once the user finishes with the share sheet
    pub async fn share(&self, path: &Path, title: &str) -> Result<u32, SaveError> {
        let file = std::fs::File::open(path)?;
        let sender = self
            .connection
            .unique_name()
            .map(|name| name.as_str().to_string())
            .ok_or_else(|| SaveError::Failed("session bus connection has no name".to_string()))?;
        let token = format!("gallery_camera_{}", uuid::Uuid::new_v4().simple());
        let expected = request_path(&sender, &token);

        // Subscribe before the call so a fast answer is not missed
        let request = self.request_proxy(&expected).await?;
        let mut responses = request.receive_signal("Response").await.map_err(portal_error)?;

        let mut options: HashMap<&str, Value> = HashMap::new();
        options.insert("handle_token", Value::new(token.as_str()));
        options.insert("subject", Value::new(title));
        options.insert("attachment_fds", Value::new(vec![Fd::from(file.as_fd())]));

        let email = zbus::Proxy::new(
            &self.connection,
            PORTAL_DESTINATION,
            PORTAL_PATH,
            EMAIL_INTERFACE,
        )
        .await
        .map_err(portal_error)?;
        let handle: OwnedObjectPath = email
            .call("ComposeEmail", &("", options))
            .await
            .map_err(portal_error)?;
        info!(title, path = %path.display(), "Opened share sheet");

        // Older portals pick their own request path
        if handle.as_str() != expected {
            debug!(handle = %handle.as_str(), "Portal returned a different request path");
            let request = self.request_proxy(handle.as_str()).await?;
            responses = request.receive_signal("Response").await.map_err(portal_error)?;
        }

        let message = responses
            .next()
            .await
            .ok_or_else(|| SaveError::Failed("share portal closed without answering".to_string()))?;
        let (code, _results): (u32, HashMap<String, OwnedValue>) =
            message.body().deserialize().map_err(portal_error)?;

        debug!(code, "Share portal answered");
        Ok(code)
    }

    async fn request_proxy(&self, path: &str) -> Result<zbus::Proxy<'static>, SaveError> {
        zbus::Proxy::new(
            &self.connection,
            PORTAL_DESTINATION,
            path.to_string(),
            REQUEST_INTERFACE,
        )
        .await
        .map_err(portal_error)
    }
}

fn portal_error(e: zbus::Error) -> SaveError {
    SaveError::Failed(format!("share portal: {}", e))
}

/// Object path the portal uses for a request made by `sender` with `token`
fn request_path(sender: &str, token: &str) -> String {
    let sender = sender.trim_start_matches(':').replace('.', "_");
    format!("{}/request/{}/{}", PORTAL_PATH, sender, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path_follows_portal_convention() {
        assert_eq!(
            request_path(":1.42", "gallery_camera_abc"),
            "/org/freedesktop/portal/desktop/request/1_42/gallery_camera_abc"
        );
    }

    #[test]
    fn test_request_path_is_a_valid_object_path() {
        let token = format!("gallery_camera_{}", uuid::Uuid::new_v4().simple());
        let path = request_path(":1.1077", &token);
        assert!(zbus::zvariant::ObjectPath::try_from(path.as_str()).is_ok());
    }
}
