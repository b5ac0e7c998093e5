//! MediaWiki document store.
//!
//! Talks to the action API (`api.php`):
//!
//! 1. `meta=tokens&type=login` then `action=login` with a bot password
//! 2. `prop=revisions` (formatversion 2) to read the latest page text
//! 3. `meta=tokens` for a CSRF token, then `action=edit` to save
//!
//! Session cookies are kept by the `reqwest` cookie store.

use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{NewscastError, Result};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct WikiStore {
    client: reqwest::Client,
    api: Url,
}

/// The API's own error report, if the response carries one.
fn api_error(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
    let info = error.get("info").and_then(Value::as_str).unwrap_or("");
    Some(format!("{code}: {info}"))
}

fn token(payload: &Value, kind: &str) -> Result<String> {
    payload
        .pointer(&format!("/query/tokens/{kind}token"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| NewscastError::Wiki(format!("no {kind} token in response")))
}

/// Latest revision text of the first page; a missing page is empty.
fn page_content(payload: &Value) -> Result<String> {
    let page = payload
        .pointer("/query/pages/0")
        .ok_or_else(|| NewscastError::Wiki("no page in response".to_string()))?;
    if page.get("missing").is_some_and(|m| m.as_bool().unwrap_or(true)) {
        return Ok(String::new());
    }
    page.pointer("/revisions/0/slots/main/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| NewscastError::Wiki("no revision content in response".to_string()))
}

fn expect_success(payload: &Value, action: &str) -> Result<()> {
    match payload.pointer(&format!("/{action}/result")).and_then(Value::as_str) {
        Some("Success") => Ok(()),
        Some(other) => {
            let reason = payload
                .pointer(&format!("/{action}/reason"))
                .and_then(Value::as_str)
                .unwrap_or("");
            Err(NewscastError::Wiki(format!("{action} returned {other} {reason}").trim_end().to_string()))
        }
        None => Err(NewscastError::Wiki(format!("{action} returned no result"))),
    }
}

impl WikiStore {
    pub fn new(api_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(WikiStore {
            client,
            api: Url::parse(api_url)?,
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(self.api.clone())
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await?;
        self.decode(response).await
    }

    async fn post(&self, params: &[(&str, &str)]) -> Result<Value> {
        let mut form: Vec<(&str, &str)> = vec![("format", "json"), ("formatversion", "2")];
        form.extend_from_slice(params);
        let response = self.client.post(self.api.clone()).form(&form).send().await?;
        self.decode(response).await
    }

    async fn decode(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(NewscastError::HttpStatus {
                status: status.as_u16(),
                url: self.api.to_string(),
            });
        }
        let payload = response.json::<Value>().await?;
        match api_error(&payload) {
            Some(message) => Err(NewscastError::Wiki(message)),
            None => Ok(payload),
        }
    }

    /// Log in with a bot password.
    #[instrument(level = "info", skip_all, fields(%username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let tokens = self.get(&[("action", "query"), ("meta", "tokens"), ("type", "login")]).await?;
        let login_token = token(&tokens, "login")?;
        let payload = self
            .post(&[
                ("action", "login"),
                ("lgname", username),
                ("lgpassword", password),
                ("lgtoken", login_token.as_str()),
            ])
            .await?;
        expect_success(&payload, "login")?;
        info!("Logged in to wiki");
        Ok(())
    }

    async fn csrf_token(&self) -> Result<String> {
        let tokens = self.get(&[("action", "query"), ("meta", "tokens")]).await?;
        token(&tokens, "csrf")
    }
}

impl DocumentStore for WikiStore {
    #[instrument(level = "info", skip_all, fields(%name))]
    async fn read_text(&self, name: &str) -> Result<String> {
        let payload = self
            .get(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("titles", name),
                ("rvprop", "content"),
                ("rvslots", "main"),
            ])
            .await?;
        let text = page_content(&payload)?;
        debug!(bytes = text.len(), "Read page");
        Ok(text)
    }

    #[instrument(level = "info", skip_all, fields(%name))]
    async fn write_text(&self, name: &str, text: &str, note: &str) -> Result<()> {
        let csrf = self.csrf_token().await?;
        let payload = self
            .post(&[
                ("action", "edit"),
                ("title", name),
                ("text", text),
                ("summary", note),
                ("bot", "1"),
                ("token", csrf.as_str()),
            ])
            .await?;
        expect_success(&payload, "edit")?;
        info!(bytes = text.len(), %note, "Saved page");
        Ok(())
    }
}
