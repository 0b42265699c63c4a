//! Per-invocation request context: transport parameters and caller information.
//!
//! An invocation is either a pure command-line run (argv present) or an HTTP request (query
//! string, forwarding headers, peer address, body). Each invocation owns its own context.

use std::collections::BTreeMap;
use std::net::IpAddr;

/// Transport-level input for one invocation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    query: BTreeMap<String, String>,
    argv: Option<Vec<String>>,
    forwarded_for: Option<String>,
    client_ip: Option<String>,
    remote_addr: Option<IpAddr>,
    body: Option<String>,
}

impl RequestContext {
    /// Command-line invocation. `argv` includes the program name as its first element.
    pub fn cli<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: Some(argv.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// HTTP invocation with the given query parameters.
    pub fn http<I, K, V>(query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            query: query
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Adds query parameters (kept alongside argv; argv tokens win on conflicts).
    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.forwarded_for = Some(value.into());
        self
    }

    pub fn with_client_ip(mut self, value: impl Into<String>) -> Self {
        self.client_ip = Some(value.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// True for a pure command-line invocation.
    pub fn is_cli(&self) -> bool {
        self.argv.is_some()
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn argv(&self) -> Option<&[String]> {
        self.argv.as_deref()
    }

    /// Raw `X-Forwarded-For` header value.
    pub fn forwarded_for(&self) -> Option<&str> {
        self.forwarded_for.as_deref()
    }

    /// Raw `Client-IP` header value.
    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}
