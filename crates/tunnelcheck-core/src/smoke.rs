//! Smoke-test client for the collaborator HTTP API (accounts, tunnel
//! endpoints, device allocation, remote test runs). The collaborator is
//! a black box; only the request/response contracts matter here.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct SmokeStep {
    pub name: &'static str,
    pub ok: bool,
    pub status: Option<u16>,
    pub detail: String,
}

impl SmokeStep {
    fn ok(name: &'static str, status: u16, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            status: Some(status),
            detail: detail.into(),
        }
    }

    fn failed(name: &'static str, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

pub struct SmokeClient {
    base_url: String,
    http: reqwest::Client,
}

impl SmokeClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Runs the smoke sequence: health, register, login, list
    /// endpoints, allocate device, trigger a remote test. Later steps
    /// that need a token are skipped as failures when login fails.
    pub async fn run_suite(&self, email: &str, password: &str) -> Vec<SmokeStep> {
        let mut steps = Vec::new();

        steps.push(self.get_expecting("health", "/api/health", None, &[200]).await);

        let register = self
            .post_expecting(
                "register",
                "/api/auth/register",
                None,
                &json!({ "email": email, "password": password }),
                // 409 means the account already exists, which is fine
                // for a repeatable smoke run.
                &[200, 201, 409],
            )
            .await;
        steps.push(register);

        let token = match self.login(email, password).await {
            Ok((step, token)) => {
                steps.push(step);
                Some(token)
            }
            Err(step) => {
                steps.push(step);
                None
            }
        };

        let Some(token) = token else {
            for name in ["list-endpoints", "allocate-device", "trigger-test"] {
                steps.push(SmokeStep::failed(name, None, "skipped: no auth token"));
            }
            return steps;
        };

        steps.push(
            self.get_expecting("list-endpoints", "/api/endpoints", Some(&token), &[200])
                .await,
        );
        steps.push(
            self.post_expecting(
                "allocate-device",
                "/api/devices",
                Some(&token),
                &json!({ "name": "tunnelcheck-smoke" }),
                &[200, 201],
            )
            .await,
        );
        steps.push(
            self.post_expecting(
                "trigger-test",
                "/api/tests/run",
                Some(&token),
                &json!({}),
                &[200, 202],
            )
            .await,
        );

        let failed = steps.iter().filter(|s| !s.ok).count();
        info!(steps = steps.len(), failed, "smoke suite finished");
        steps
    }

    async fn login(&self, email: &str, password: &str) -> Result<(SmokeStep, String), SmokeStep> {
        let resp = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| SmokeStep::failed("login", None, e.to_string()))?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(SmokeStep::failed(
                "login",
                Some(status),
                format!("expected 200, got {}", status),
            ));
        }
        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| SmokeStep::failed("login", Some(status), format!("bad body: {}", e)))?;
        Ok((SmokeStep::ok("login", status, "token issued"), body.token))
    }

    async fn get_expecting(
        &self,
        name: &'static str,
        path: &str,
        token: Option<&str>,
        expect: &[u16],
    ) -> SmokeStep {
        let mut req = self.http.get(self.url(path));
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        Self::check(name, expect, req.send().await).await
    }

    async fn post_expecting(
        &self,
        name: &'static str,
        path: &str,
        token: Option<&str>,
        body: &serde_json::Value,
        expect: &[u16],
    ) -> SmokeStep {
        let mut req = self.http.post(self.url(path)).json(body);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        Self::check(name, expect, req.send().await).await
    }

    async fn check(
        name: &'static str,
        expect: &[u16],
        resp: Result<reqwest::Response, reqwest::Error>,
    ) -> SmokeStep {
        match resp {
            Ok(r) => {
                let status = r.status().as_u16();
                if expect.contains(&status) {
                    SmokeStep::ok(name, status, "ok")
                } else {
                    SmokeStep::failed(
                        name,
                        Some(status),
                        format!("expected one of {:?}, got {}", expect, status),
                    )
                }
            }
            Err(e) => SmokeStep::failed(name, None, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let client = SmokeClient::new("http://localhost:8080/").expect("client");
        assert_eq!(client.url("/api/health"), "http://localhost:8080/api/health");
    }

    #[tokio::test]
    async fn unreachable_collaborator_fails_every_step() {
        // TEST-NET-1 address; nothing listens there.
        let client = SmokeClient::new("http://192.0.2.1:1").expect("client");
        let steps = client.run_suite("smoke@example.com", "secret").await;
        assert_eq!(steps.len(), 6);
        assert!(steps.iter().all(|s| !s.ok));
    }
}
