//! Login and regional redirect handling
//!
//! The service load-balances accounts across regional hosts. Logging in at
//! the wrong host answers with `redirect: true` and the region code to use,
//! so login is a small loop: try the current host, follow the redirect,
//! try again. Each region may be visited once and the number of hops is
//! capped, so a misbehaving service cannot keep us looping.

use std::collections::HashSet;
use std::time::Duration;

use log::{info, warn};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::Credentials;
use crate::error::{GlucoseError, Result};
use crate::protocol::{ApiRequest, Envelope, LoginData};
use crate::regions;
use crate::transport::{decode, dispatch, Transport, REQUEST_TIMEOUT};

/// Redirects followed before giving up
pub const MAX_REDIRECTS: usize = 5;

/// An authenticated session, valid for one reading fetch
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    /// Hex SHA-256 of the service user id, sent as `account-id`
    pub account_hash: Option<String>,
    /// Host that granted the token; all later calls go here
    pub region_host: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("account_hash", &self.account_hash)
            .field("region_host", &self.region_host)
            .finish()
    }
}

/// Authenticates a credential pair, following regional redirects
pub struct SessionNegotiator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    start_host: String,
    /// Region of `start_host`, if it is a regional host
    start_region: Option<String>,
    client_version: String,
    max_redirects: usize,
    timeout: Duration,
}

impl<'a, T: Transport + ?Sized> SessionNegotiator<'a, T> {
    pub fn new(transport: &'a T, client_version: impl Into<String>) -> Self {
        Self {
            transport,
            start_host: regions::DEFAULT_HOST.to_string(),
            start_region: None,
            client_version: client_version.into(),
            max_redirects: MAX_REDIRECTS,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Log in at a region's host first instead of the global one.
    ///
    /// The region counts as visited, so a redirect back to it is a loop.
    pub fn start_region(mut self, code: &str) -> Result<Self> {
        let code = regions::normalize_code(code);
        let host = regions::host_for(&code)
            .ok_or_else(|| GlucoseError::Config(format!("unknown region '{}'", code)))?;
        self.start_host = host.to_string();
        self.start_region = Some(code);
        Ok(self)
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let mut host = self.start_host.clone();
        let mut visited: HashSet<String> = self.start_region.iter().cloned().collect();
        let mut hops = 0;

        loop {
            info!("Logging in at {}", host);
            let request = ApiRequest::login(&host, &self.client_version, credentials);
            let body = dispatch(self.transport, request, self.timeout).await?;
            let envelope: Envelope<Value> = decode(body)?;

            if !envelope.is_success() {
                warn!("Login rejected with status {}", envelope.status);
                let message = envelope.error_message().unwrap_or("Authentication failed");
                return Err(GlucoseError::Auth(message.to_string()));
            }

            let data: LoginData = match envelope.data {
                Some(data) => decode(data)?,
                None => LoginData::default(),
            };

            if data.redirect {
                let code = data
                    .region
                    .as_deref()
                    .map(regions::normalize_code)
                    .unwrap_or_default();
                let regional = regions::host_for(&code).ok_or_else(|| {
                    GlucoseError::Auth(format!("Redirect to unknown region '{}'", code))
                })?;

                hops += 1;
                if !visited.insert(code.clone()) || hops > self.max_redirects {
                    warn!("Redirect to {} after {} hops, giving up", code, hops);
                    return Err(GlucoseError::Auth("redirect loop".into()));
                }

                info!("Redirected to region {} ({})", code, regional);
                host = regional.to_string();
                continue;
            }

            let token = data
                .auth_ticket
                .and_then(|ticket| ticket.token)
                .filter(|token| !token.is_empty())
                .ok_or_else(|| GlucoseError::Auth("No auth token received".into()))?;

            let account_hash = data.user.and_then(|user| user.id).map(|id| account_hash(&id));
            if account_hash.is_none() {
                warn!("Login response carried no user id, omitting account-id header");
            }

            return Ok(Session {
                token,
                account_hash,
                region_host: host,
            });
        }
    }
}

/// Lower-case hex SHA-256 of the service user id
pub fn account_hash(user_id: &str) -> String {
    hex::encode(Sha256::digest(user_id.as_bytes()))
}
