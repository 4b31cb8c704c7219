//! Route table and guard

use crate::session::SessionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Dashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Unknown paths resolve to `None`
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Route::Root),
            "/login" => Some(Route::Login),
            "/dashboard" => Some(Route::Dashboard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// Decides what a request for `path` shows.
///
/// The dashboard needs an identity; the login page is skipped once there is
/// one. Everything else lands on the dashboard.
pub fn resolve(path: &str, session: &SessionHandle) -> Navigation {
    let signed_in = session.is_authenticated();
    match Route::from_path(path) {
        Some(Route::Dashboard) if signed_in => Navigation::Render(Route::Dashboard),
        Some(Route::Dashboard) => Navigation::Redirect(Route::Login),
        Some(Route::Login) if signed_in => Navigation::Redirect(Route::Dashboard),
        Some(Route::Login) => Navigation::Render(Route::Login),
        Some(Route::Root) | None => Navigation::Redirect(Route::Dashboard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn signed_in() -> SessionHandle {
        SessionHandle::fixed(Some(Identity::new("u1", None)))
    }

    #[test]
    fn dashboard_requires_identity() {
        let anonymous = SessionHandle::fixed(None);
        assert_eq!(
            resolve("/dashboard", &anonymous),
            Navigation::Redirect(Route::Login)
        );
        assert_eq!(
            resolve("/dashboard", &signed_in()),
            Navigation::Render(Route::Dashboard)
        );
    }

    #[test]
    fn login_is_skipped_when_signed_in() {
        assert_eq!(
            resolve("/login", &signed_in()),
            Navigation::Redirect(Route::Dashboard)
        );
        assert_eq!(
            resolve("/login", &SessionHandle::fixed(None)),
            Navigation::Render(Route::Login)
        );
    }

    #[test]
    fn root_and_unknown_paths_go_to_dashboard() {
        let anonymous = SessionHandle::fixed(None);
        assert_eq!(resolve("/", &anonymous), Navigation::Redirect(Route::Dashboard));
        assert_eq!(
            resolve("/settings", &anonymous),
            Navigation::Redirect(Route::Dashboard)
        );
    }

    #[test]
    fn paths_round_trip() {
        for route in [Route::Root, Route::Login, Route::Dashboard] {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/dashboard/"), Some(Route::Dashboard));
    }
}
