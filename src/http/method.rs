use strum::EnumString;

/// Request methods the server knows by name. Anything else parses into
/// `Other` and is answered with 501.
#[derive(EnumString, Debug, Clone, PartialEq, Eq)]
pub enum Method {
    #[strum(serialize = "GET")]
    GET,
    #[strum(serialize = "HEAD")]
    HEAD,
    #[strum(serialize = "POST")]
    POST,
    #[strum(serialize = "PUT")]
    PUT,
    #[strum(serialize = "DELETE")]
    DELETE,
    #[strum(serialize = "OPTIONS")]
    OPTIONS,
    #[strum(default)]
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::Other(name) => name,
        }
    }
}
