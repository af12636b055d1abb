//! Browser-session authentication against the invoicing service.
//!
//! The service has no public API. A session is obtained the way a browser
//! obtains one: load the login page so the service seeds its cookies (the
//! `_js_csrf` cookie among them), post the login form, then read the merchant
//! and unit tokens from two dashboard resources. Every later request echoes
//! the CSRF cookie back as a header and carries the merchant token.
//!
//! Sessions are never refreshed. A [`Session`] lives for one reconciliation
//! cycle (or one on-demand request) and is then dropped.

use crate::error::{InvoicingError, Result};
use crate::types::{LoginRequest, NavigationResponse, RemoteStatus, SubunitsResponse};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cookie the service stores its CSRF token in.
pub const CSRF_COOKIE: &str = "_js_csrf";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/47.0.2526.111 Safari/537.36";
const ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// Login credentials for the merchant account.
#[derive(Clone)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub const fn new(email: String, password: String) -> Self {
        Self { email, password }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// URLs of every resource the client touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Value of the `Origin` header
    pub origin: String,
    /// Login page, fetched to seed cookies; also the `Referer`
    pub login_page: String,
    /// Login form target
    pub login: String,
    /// Navigation resource (merchant token)
    pub navigation: String,
    /// Subunits resource (unit token)
    pub subunits: String,
    /// Invoice list service
    pub invoice_list: String,
    /// Invoice create service
    pub invoice_create: String,
    /// Invoice cancel service
    pub invoice_cancel: String,
}

impl Endpoints {
    /// Production endpoints.
    #[must_use]
    pub fn squareup() -> Self {
        let service = "https://squareup.com/services/squareup.invoice.service.InvoiceService";
        Self {
            origin: "https://squareup.com".to_string(),
            login_page: "https://squareup.com/login".to_string(),
            login: "https://api.squareup.com/mp/login".to_string(),
            navigation: "https://squareup.com/dashboard/navigation".to_string(),
            subunits: "https://squareup.com/api/v1/multiunit/subunits".to_string(),
            invoice_list: format!("{service}/List"),
            invoice_create: format!("{service}/Create"),
            invoice_cancel: format!("{service}/Cancel"),
        }
    }

    /// Every endpoint rebased onto a single host, keeping the production paths.
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let service = format!("{base}/services/squareup.invoice.service.InvoiceService");
        Self {
            origin: base.to_string(),
            login_page: format!("{base}/login"),
            login: format!("{base}/mp/login"),
            navigation: format!("{base}/dashboard/navigation"),
            subunits: format!("{base}/api/v1/multiunit/subunits"),
            invoice_list: format!("{service}/List"),
            invoice_create: format!("{service}/Create"),
            invoice_cancel: format!("{service}/Cancel"),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::squareup()
    }
}

/// Tokens that scope signed requests to one merchant and unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Sent as `X-Merchant-Token`
    pub merchant_token: String,
    /// Default unit; empty when the merchant reports no units
    pub unit_token: String,
}

/// An authenticated cookie jar plus the client that owns it.
#[derive(Clone)]
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    endpoints: Endpoints,
}

impl Session {
    /// Log in with a fresh cookie jar.
    ///
    /// # Errors
    ///
    /// - [`InvoicingError::Transport`] / [`InvoicingError::Timeout`] if the
    ///   service cannot be reached
    /// - [`InvoicingError::Auth`] if the login is refused, either by status
    ///   or by an embedded error flag
    pub async fn authenticate(
        credentials: &Credentials,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(timeout)
            .build()
            .map_err(|e| InvoicingError::Transport(e.to_string()))?;

        let session = Self {
            client,
            jar,
            endpoints,
        };

        // Seeds `_js_csrf`.
        session
            .client
            .get(&session.endpoints.login_page)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| InvoicingError::from_reqwest(&session.endpoints.login_page, &e))?;

        let login = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };
        let login_url = session.endpoints.login.clone();
        let (body, status) = match session
            .signed_request(None, &login_url, Some(&login), Method::POST)
            .await
        {
            Ok(response) => response,
            Err(InvoicingError::Remote { title, message }) => {
                return Err(InvoicingError::Auth(format!("{title}: {message}")));
            }
            Err(e) => return Err(e),
        };

        if status != StatusCode::OK {
            return Err(InvoicingError::Auth(format!(
                "login returned {}: {body}",
                status.as_u16()
            )));
        }

        debug!(email = %credentials.email, "Logged in to invoicing service");
        Ok(session)
    }

    /// Endpoints this session talks to.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetch the merchant and default unit tokens.
    ///
    /// # Errors
    ///
    /// Returns [`InvoicingError::Bootstrap`] if either resource answers with
    /// a non-success status or an undecodable body; transport failures are
    /// passed through unchanged.
    pub async fn bootstrap(&self) -> Result<Identity> {
        let navigation_url = self.endpoints.navigation.clone();
        let (body, status) = self
            .signed_request::<()>(None, &navigation_url, None, Method::GET)
            .await?;
        if !status.is_success() {
            return Err(InvoicingError::Bootstrap {
                stage: "navigation",
                reason: format!("status {}: {body}", status.as_u16()),
            });
        }
        let navigation: NavigationResponse =
            serde_json::from_str(&body).map_err(|e| InvoicingError::Bootstrap {
                stage: "navigation",
                reason: e.to_string(),
            })?;

        let mut identity = Identity {
            merchant_token: navigation.token,
            unit_token: String::new(),
        };

        let subunits_url = self.endpoints.subunits.clone();
        let (body, status) = self
            .signed_request::<()>(Some(&identity), &subunits_url, None, Method::GET)
            .await?;
        if !status.is_success() {
            return Err(InvoicingError::Bootstrap {
                stage: "subunits",
                reason: format!("status {}: {body}", status.as_u16()),
            });
        }
        let subunits: SubunitsResponse =
            serde_json::from_str(&body).map_err(|e| InvoicingError::Bootstrap {
                stage: "subunits",
                reason: e.to_string(),
            })?;

        match subunits.entities.into_iter().next() {
            Some(unit) => identity.unit_token = unit.token,
            None => warn!("Merchant reports no units, invoice calls will use an empty unit token"),
        }

        Ok(identity)
    }

    /// Issue a request signed with the session's CSRF cookie and, when
    /// given, the merchant token.
    ///
    /// Write methods carry `payload` as a JSON body. Returns the raw body and
    /// status; status checking is left to the caller.
    ///
    /// # Errors
    ///
    /// - [`InvoicingError::Transport`] / [`InvoicingError::Timeout`] for
    ///   network failures
    /// - [`InvoicingError::Remote`] if the body carries `success: false`
    pub async fn signed_request<B: Serialize + ?Sized>(
        &self,
        identity: Option<&Identity>,
        endpoint: &str,
        payload: Option<&B>,
        method: Method,
    ) -> Result<(String, StatusCode)> {
        debug!(endpoint, method = %method, "Hitting invoicing endpoint");

        let url = Url::parse(endpoint)
            .map_err(|e| InvoicingError::Transport(format!("invalid url {endpoint}: {e}")))?;
        let csrf = self.csrf_token(&url).unwrap_or_default();
        let is_write = method != Method::GET;

        let mut request = self
            .client
            .request(method, url)
            .header("X-CSRF-Token", csrf)
            .header("Origin", &self.endpoints.origin)
            .header("Referer", &self.endpoints.login_page)
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT);

        if let Some(identity) = identity.filter(|i| !i.merchant_token.is_empty()) {
            request = request.header("X-Merchant-Token", &identity.merchant_token);
        }

        if is_write {
            let body = match payload {
                Some(payload) => serde_json::to_vec(payload)
                    .map_err(|e| InvoicingError::Parse(format!("failed to encode payload: {e}")))?,
                None => b"null".to_vec(),
            };
            request = request.header("Content-Type", "application/json").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| InvoicingError::from_reqwest(endpoint, &e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InvoicingError::from_reqwest(endpoint, &e))?;

        if let Ok(remote) = serde_json::from_str::<RemoteStatus>(&body) {
            if remote.success == Some(false) {
                return Err(InvoicingError::Remote {
                    title: remote.error_title,
                    message: remote.error_message,
                });
            }
        }

        Ok((body, status))
    }

    /// Current `_js_csrf` cookie value for `url`.
    #[must_use]
    pub fn csrf_token(&self, url: &Url) -> Option<String> {
        let header = self.jar.cookies(url)?;
        let cookies = header.to_str().ok()?;
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == CSRF_COOKIE)
            .map(|(_, value)| value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("ops@example.com".into(), "hunter2".into());
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("ops@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_endpoints_with_base_keeps_paths() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:9000/");
        assert_eq!(endpoints.login_page, "http://127.0.0.1:9000/login");
        assert_eq!(endpoints.login, "http://127.0.0.1:9000/mp/login");
        assert!(endpoints.invoice_cancel.ends_with("InvoiceService/Cancel"));
    }

    #[test]
    fn test_csrf_token_read_from_jar() {
        let jar = Arc::new(Jar::default());
        let url = Url::parse("https://squareup.com/login").unwrap();
        jar.add_cookie_str("_js_csrf=abc123; Path=/", &url);
        jar.add_cookie_str("other=zzz; Path=/", &url);
        let session = Session {
            client: Client::new(),
            jar,
            endpoints: Endpoints::squareup(),
        };

        let api = Url::parse("https://squareup.com/services/x").unwrap();
        assert_eq!(session.csrf_token(&api).as_deref(), Some("abc123"));
    }
}
