//! Endpoint descriptors: the catalogue handed to downstream tooling.

use serde::{Deserialize, Serialize};

/// HTTP methods recognized as route registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    All,
}

impl HttpMethod {
    /// Map a router method name (`get`, `post`, ...) to an HTTP method.
    pub fn from_router_method(name: &str) -> Option<Self> {
        match name {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            "all" => Some(HttpMethod::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::All => "ALL",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::from_router_method(&s.to_lowercase())
            .ok_or_else(|| format!("unknown HTTP method: {}", s))
    }
}

/// Inferred type of a request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Primary location of request data, chosen by priority body > query > params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDataType {
    Params,
    Query,
    Body,
    #[default]
    None,
}

/// One typed request field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamType {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
}

impl ParamType {
    pub fn new(name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            required,
        }
    }
}

/// A discovered HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<String>,
    pub request_data_type: RequestDataType,
    pub param_types: Vec<ParamType>,
    pub query_param_types: Vec<ParamType>,
    pub body_param_types: Vec<ParamType>,
}

impl EndpointDescriptor {
    /// Create a descriptor with URL parameters seeded from the pattern.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        let url = url.into();
        let mut endpoint = Self {
            method,
            url,
            headers: Vec::new(),
            request_data_type: RequestDataType::None,
            param_types: Vec::new(),
            query_param_types: Vec::new(),
            body_param_types: Vec::new(),
        };
        endpoint.seed_url_params();
        endpoint.refresh_data_type();
        endpoint
    }

    /// Add a required string parameter for every `:name` segment of the URL
    /// that is not already listed.
    pub fn seed_url_params(&mut self) {
        for name in url_params(&self.url) {
            if !self.param_types.iter().any(|p| p.name == name) {
                self.param_types
                    .push(ParamType::new(name, FieldType::String, true));
            }
        }
    }

    /// Recompute `request_data_type` from the recorded fields.
    pub fn refresh_data_type(&mut self) {
        self.request_data_type = if !self.body_param_types.is_empty() {
            RequestDataType::Body
        } else if !self.query_param_types.is_empty() {
            RequestDataType::Query
        } else if !self.param_types.is_empty() {
            RequestDataType::Params
        } else {
            RequestDataType::None
        };
    }

    /// Record a header name once.
    pub fn add_header(&mut self, name: &str) {
        if !self.headers.iter().any(|h| h == name) {
            self.headers.push(name.to_string());
        }
    }

    /// The `(method, url)` identity of this endpoint.
    pub fn key(&self) -> (HttpMethod, &str) {
        (self.method, self.url.as_str())
    }
}

/// Extract `:name` parameter names from a URL pattern, in order.
pub fn url_params(url: &str) -> Vec<String> {
    lazy_static::lazy_static! {
        static ref PARAM_RE: regex::Regex =
            regex::Regex::new(r":([a-zA-Z_$][a-zA-Z0-9_$]*)").unwrap();
    }

    let mut names: Vec<String> = Vec::new();
    for caps in PARAM_RE.captures_iter(url) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_params_seeded_as_required_strings() {
        let endpoint = EndpointDescriptor::new(HttpMethod::Get, "/orgs/:orgId/users/:id");
        assert_eq!(
            endpoint.param_types,
            vec![
                ParamType::new("orgId", FieldType::String, true),
                ParamType::new("id", FieldType::String, true),
            ]
        );
        assert_eq!(endpoint.request_data_type, RequestDataType::Params);
        assert!(endpoint.headers.is_empty());
    }

    #[test]
    fn test_no_params_means_none() {
        let endpoint = EndpointDescriptor::new(HttpMethod::Get, "/health");
        assert!(endpoint.param_types.is_empty());
        assert_eq!(endpoint.request_data_type, RequestDataType::None);
    }

    #[test]
    fn test_data_type_priority() {
        let mut endpoint = EndpointDescriptor::new(HttpMethod::Post, "/items/:id");
        endpoint
            .query_param_types
            .push(ParamType::new("page", FieldType::String, false));
        endpoint.refresh_data_type();
        assert_eq!(endpoint.request_data_type, RequestDataType::Query);

        endpoint
            .body_param_types
            .push(ParamType::new("name", FieldType::String, true));
        endpoint.refresh_data_type();
        assert_eq!(endpoint.request_data_type, RequestDataType::Body);
    }

    #[test]
    fn test_wire_shape() {
        let mut endpoint = EndpointDescriptor::new(HttpMethod::Delete, "/users/:id");
        endpoint.add_header("authorization");
        endpoint.add_header("authorization");

        let json = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(json["method"], "DELETE");
        assert_eq!(json["url"], "/users/:id");
        assert_eq!(json["headers"], serde_json::json!(["authorization"]));
        assert_eq!(json["requestDataType"], "params");
        assert_eq!(json["paramTypes"][0]["type"], "string");
        assert_eq!(json["paramTypes"][0]["required"], true);
        assert_eq!(json["bodyParamTypes"], serde_json::json!([]));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(HttpMethod::from_router_method("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_router_method("use"), None);
        assert_eq!("Options".parse::<HttpMethod>(), Ok(HttpMethod::Options));
        assert!("fetch".parse::<HttpMethod>().is_err());
    }
}
