//! Session cookie construction and extraction.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;

use sis_core::config::CookieConfig;

use crate::jwt::{IssuedToken, TokenKind};

/// Builds the access and refresh cookies from issued tokens.
#[derive(Debug, Clone)]
pub struct CookieFactory {
    config: CookieConfig,
}

impl CookieFactory {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    /// Cookie name for a token kind.
    pub fn name(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.config.access_name,
            TokenKind::Refresh => &self.config.refresh_name,
        }
    }

    /// Cookie carrying an access token.
    pub fn access_cookie(&self, issued: &IssuedToken) -> Cookie<'static> {
        self.token_cookie(TokenKind::Access, issued)
    }

    /// Cookie carrying a refresh token.
    pub fn refresh_cookie(&self, issued: &IssuedToken) -> Cookie<'static> {
        self.token_cookie(TokenKind::Refresh, issued)
    }

    /// Browser-session cookies carry no `Expires`; remember-me cookies
    /// expire with the token.
    fn token_cookie(&self, kind: TokenKind, issued: &IssuedToken) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name(kind).to_string(), issued.token.clone()))
            .path(self.config.path.clone())
            .same_site(SameSite::Strict)
            .secure(self.config.secure)
            .http_only(self.config.http_only);

        if issued.claims.remember_me {
            if let Ok(expires) = OffsetDateTime::from_unix_timestamp(issued.claims.exp) {
                builder = builder.expires(expires);
            }
        }

        builder.build()
    }

    /// Empty, already-expired cookie that makes the browser drop `kind`.
    pub fn removal(&self, kind: TokenKind) -> Cookie<'static> {
        Cookie::build((self.name(kind).to_string(), String::new()))
            .path(self.config.path.clone())
            .same_site(SameSite::Strict)
            .secure(self.config.secure)
            .http_only(self.config.http_only)
            .max_age(time::Duration::seconds(-1))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    /// Removal cookies for both token kinds.
    pub fn removals(&self) -> [Cookie<'static>; 2] {
        [self.removal(TokenKind::Access), self.removal(TokenKind::Refresh)]
    }

    /// Token value of `kind` from the request jar. Empty values count as absent.
    pub fn token_value<'a>(&self, jar: &'a CookieJar, kind: TokenKind) -> Option<&'a str> {
        jar.get(self.name(kind))
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenCodec;
    use crate::jwt::codec::tests::test_config;
    use sis_entity::user::UserRole;
    use uuid::Uuid;

    fn issue(remember_me: bool, kind: TokenKind) -> IssuedToken {
        TokenCodec::new(&test_config())
            .issue(Uuid::new_v4(), UserRole::Student, remember_me, kind)
            .unwrap()
    }

    #[test]
    fn test_session_cookie_has_no_expiry() {
        let factory = CookieFactory::new(CookieConfig::default());
        let cookie = factory.refresh_cookie(&issue(false, TokenKind::Refresh));

        assert_eq!(cookie.name(), "refresh_token");
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.expires_datetime().is_none());
    }

    #[test]
    fn test_remember_me_cookie_expires_with_token() {
        let factory = CookieFactory::new(CookieConfig::default());
        let issued = issue(true, TokenKind::Access);
        let cookie = factory.access_cookie(&issued);

        let expires = cookie.expires_datetime().unwrap();
        assert_eq!(expires.unix_timestamp(), issued.claims.exp);
    }

    #[test]
    fn test_http_only_follows_config() {
        let config = CookieConfig {
            http_only: false,
            ..CookieConfig::default()
        };
        let factory = CookieFactory::new(config);
        let cookie = factory.access_cookie(&issue(false, TokenKind::Access));
        assert_eq!(cookie.http_only(), Some(false));
    }

    #[test]
    fn test_removal_is_expired_and_empty() {
        let factory = CookieFactory::new(CookieConfig::default());
        let [access, refresh] = factory.removals();

        assert_eq!(access.name(), "access_token");
        assert_eq!(refresh.name(), "refresh_token");
        for cookie in [access, refresh] {
            assert!(cookie.value().is_empty());
            assert_eq!(cookie.max_age(), Some(time::Duration::seconds(-1)));
            assert!(cookie.expires_datetime().unwrap() < OffsetDateTime::now_utc());
        }
    }

    #[test]
    fn test_token_value_ignores_empty_cookie() {
        let factory = CookieFactory::new(CookieConfig::default());
        let jar = CookieJar::new()
            .add(Cookie::new("access_token", ""))
            .add(Cookie::new("refresh_token", "abc"));

        assert_eq!(factory.token_value(&jar, TokenKind::Access), None);
        assert_eq!(factory.token_value(&jar, TokenKind::Refresh), Some("abc"));
    }
}
