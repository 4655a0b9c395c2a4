//! Constants of the push wire format.

/// Header names set by the delivery client.
pub mod headers {
    use http::HeaderName;

    /// Content type of every push request.
    pub const CONTENT_TYPE: HeaderName = http::header::CONTENT_TYPE;
    /// Sent unless the user overrides it.
    pub const USER_AGENT: HeaderName = http::header::USER_AGENT;
}

/// Media types.
pub mod media_types {
    /// The envelope is always JSON.
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Default `User-Agent` of outbound requests.
pub const DEFAULT_USER_AGENT: &str = concat!("pubsub-push/", env!("CARGO_PKG_VERSION"));
