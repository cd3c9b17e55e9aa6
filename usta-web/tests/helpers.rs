//! Shared setup for HTTP tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use usta_applications::UstaApplication;
use usta_core::{OtpMode, UstaConfig};
use usta_web::{create_app, AppState, WebConfig};

pub const DEV_CODE: &str = "123456";

pub struct TestApp {
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// In-memory application that accepts the fixed development code
    pub async fn spawn() -> Self {
        let mut config = UstaConfig::default();
        config.otp.mode = OtpMode::Fixed;
        let application = UstaApplication::in_memory(config).await.unwrap();
        let state = AppState::with_application(WebConfig::default(), Arc::new(application));
        Self {
            router: create_app(state),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Log in with the development code and return the bearer token
    pub async fn login(&self, phone: &str, role: &str) -> String {
        let response = self
            .post(
                "/api/auth/verify",
                None,
                json!({ "phone": phone, "code": DEV_CODE, "role": role }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// A master with a profession set; returns the token and profile id
    pub async fn onboarded_master(&self, phone: &str) -> (String, String) {
        let token = self.login(phone, "master").await;
        let response = self
            .send(
                Method::PUT,
                "/api/profile",
                Some(&token),
                Some(json!({ "name": "Bobur", "profession": "plumber", "city": "Tashkent" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);

        let me = self.get("/api/auth/me", Some(&token)).await;
        let profile_id = me.body["account"]["master_profile"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        (token, profile_id)
    }
}
