use base64::{Engine as _, engine::general_purpose::STANDARD};
use url::Url;

/// outbound form of a relay target: the url without userinfo plus the basic auth header the
/// userinfo turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedTarget {
    pub url: Url,
    pub authorization: Option<String>,
}

impl SanitizedTarget {
    pub fn from_url(target: &Url) -> Self {
        let username = percent_decode(target.username());
        let password = target.password().map(percent_decode);

        let mut url = target.clone();
        // http(s) urls always have a host so these can't fail
        let _ = url.set_username("");
        let _ = url.set_password(None);

        let authorization = match password {
            Some(password) if !username.is_empty() && !password.is_empty() => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", username, password))
            )),
            _ => None,
        };

        Self { url, authorization }
    }
}

// url keeps userinfo percent-encoded, the header wants the real characters
fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
