use std::time::Duration;

use cookie::Cookie;
pub use cookie::SameSite;

/// Attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: Option<Duration>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: "__session".to_owned(),
            path: "/".to_owned(),
            domain: None,
            http_only: true,
            secure: false,
            same_site: SameSite::Lax,
            max_age: None,
        }
    }
}

impl CookieOptions {
    /// Render a `Set-Cookie` value carrying `value`.
    #[must_use]
    pub fn serialize(&self, value: &str) -> String {
        self.build(value).to_string()
    }

    /// Render a `Set-Cookie` value that removes the cookie.
    #[must_use]
    pub fn expire(&self) -> String {
        let mut cookie = self.build("");
        cookie.make_removal();
        cookie.to_string()
    }

    fn build(&self, value: &str) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), value.to_owned()))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.max_age {
            let secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
            builder = builder.max_age(cookie::time::Duration::seconds(secs));
        }
        builder.build()
    }
}

/// Find a cookie value in a raw `Cookie` header. First match wins;
/// malformed pairs are skipped.
#[must_use]
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_owned())
}
