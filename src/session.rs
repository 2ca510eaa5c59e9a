//! Session bootstrap.
//!
//! A session moves from Disconnected to Connected through `establish()`
//! and only ever back to Disconnected through a failed reconnect: entity
//! operations never transition the session, the caller simply drops it.
//! Any failure during establishment discards the transport context before
//! the error propagates.

use crate::bypass::ChallengeSolver;
use crate::error::{ClientError, Result};
use crate::transport::Transport;
use scraper::Html;

const ACCOUNT_PATH: &str = "/account/";
const TOKEN_PATH: &str = "/help/terms/";

/// An established, authenticated session: the transport context plus the
/// anti-forgery token read at connect time. The token is captured for
/// completeness; this read-only client never re-validates it.
#[derive(Debug)]
pub struct Session {
    transport: Transport,
    csrf_token: String,
}

impl Session {
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Run the connect flow: serialize cookies, optionally solve the
    /// anti-automation challenge, verify the login marker on the account
    /// landing page, and capture the anti-forgery token.
    ///
    /// Authentication failures pass through untouched; every other
    /// failure is wrapped into an operation error with its cause kept.
    pub async fn establish(
        origin: &str,
        user_agent: &str,
        cookies: &[(&str, &str)],
        solver: Option<&dyn ChallengeSolver>,
    ) -> Result<Session> {
        match Self::establish_inner(origin, user_agent, cookies, solver).await {
            Ok(session) => Ok(session),
            Err(err @ ClientError::Authentication(_)) => Err(err),
            Err(err @ ClientError::Operation { .. }) => Err(err),
            Err(other) => Err(ClientError::operation(None, None, other)),
        }
    }

    async fn establish_inner(
        origin: &str,
        user_agent: &str,
        cookies: &[(&str, &str)],
        solver: Option<&dyn ChallengeSolver>,
    ) -> Result<Session> {
        let mut cookie_header = cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        let mut agent = user_agent.to_string();

        if let Some(solver) = solver {
            let outcome = solver
                .solve(user_agent)
                .await
                .map_err(|e| ClientError::operation(None, None, e))?;
            if !outcome.cookie.is_empty() {
                if cookie_header.is_empty() {
                    cookie_header = outcome.cookie;
                } else {
                    cookie_header = format!("{cookie_header}; {}", outcome.cookie);
                }
            }
            agent = outcome.user_agent;
        }

        let transport = Transport::new(origin, &agent, &cookie_header)?;

        let account = transport.get_page(ACCOUNT_PATH).await?;
        account.error_for_status()?;
        if !logged_in(&account.html()) {
            return Err(ClientError::Authentication(
                "login marker absent from account page".to_string(),
            ));
        }

        let terms = transport.get_page(TOKEN_PATH).await?;
        terms.error_for_status()?;
        let csrf_token = match root_attr(&terms.html(), "data-csrf") {
            Some(token) => token,
            None => {
                return Err(ClientError::Protocol(
                    "anti-forgery token missing from token page".to_string(),
                ))
            }
        };

        tracing::debug!("session established");
        Ok(Session {
            transport,
            csrf_token,
        })
    }
}

/// Whether the document root carries the logged-in marker.
fn logged_in(html: &str) -> bool {
    root_attr_is(html, "data-logged-in", "true")
}

fn root_attr(html: &str, name: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.root_element().value().attr(name).map(|v| v.to_string())
}

fn root_attr_is(html: &str, name: &str, expected: &str) -> bool {
    root_attr(html, name).as_deref() == Some(expected)
}
