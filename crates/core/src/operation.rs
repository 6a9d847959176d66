// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operation and request specifications.
//!
//! An [`OperationSpec`] is the configured, named request type. It is
//! validated once before any worker starts and resolved against the
//! target base URL into a [`RequestSpec`] that collectors execute.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// HTTP method of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl HttpMethod {
    /// Canonical method token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named request type with a relative selection weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Unique operation name (e.g. `homepage`).
    pub name: String,
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Path relative to the base URL, starting with `/`.
    pub path: String,
    /// Relative selection weight, at least 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Extra request headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Accepted status codes. Any 2xx when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<Vec<u16>>,
}

fn default_weight() -> u32 {
    1
}

impl OperationSpec {
    /// GET operation with weight 1.
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Get, path)
    }

    /// Operation with the given method and weight 1.
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            weight: 1,
            headers: Vec::new(),
            body: None,
            expected_status: None,
        }
    }

    /// Set the selection weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Restrict accepted status codes.
    pub fn expecting(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.expected_status = Some(statuses.into_iter().collect());
        self
    }

    /// Check structural invariants: name, path and weight.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::invalid_operation(
                &self.name,
                "name must not be empty",
            ));
        }
        if !self.path.starts_with('/') {
            return Err(ConfigurationError::invalid_operation(
                &self.name,
                format!("path '{}' must start with '/'", self.path),
            ));
        }
        if self.weight == 0 {
            return Err(ConfigurationError::InvalidWeight(self.name.clone()));
        }
        if let Some(statuses) = &self.expected_status {
            if statuses.is_empty() {
                return Err(ConfigurationError::invalid_operation(
                    &self.name,
                    "expected_status must not be empty",
                ));
            }
            if let Some(bad) = statuses.iter().find(|s| !(100..=599).contains(*s)) {
                return Err(ConfigurationError::invalid_operation(
                    &self.name,
                    format!("{} is not an HTTP status code", bad),
                ));
            }
        }
        Ok(())
    }

    /// Resolve against a base URL.
    pub fn request(&self, base_url: &str) -> RequestSpec {
        RequestSpec {
            method: self.method,
            url: format!("{}{}", base_url.trim_end_matches('/'), self.path),
            headers: self.headers.clone(),
            body: self.body.clone(),
            expected_status: self.expected_status.clone(),
        }
    }
}

/// Validate a full operation list: non-empty, unique names, every spec valid.
pub fn validate_operations(operations: &[OperationSpec]) -> Result<(), ConfigurationError> {
    if operations.is_empty() {
        return Err(ConfigurationError::NoOperations);
    }
    let mut seen = HashSet::new();
    for op in operations {
        op.validate()?;
        if !seen.insert(op.name.as_str()) {
            return Err(ConfigurationError::DuplicateOperation(op.name.clone()));
        }
    }
    Ok(())
}

/// A fully resolved request, ready for a collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<String>,
    /// Accepted status codes. Any 2xx when absent.
    pub expected_status: Option<Vec<u16>>,
}

impl RequestSpec {
    /// Whether a response status counts as success.
    pub fn accepts(&self, status: u16) -> bool {
        match &self.expected_status {
            Some(accepted) => accepted.contains(&status),
            None => (200..300).contains(&status),
        }
    }
}
