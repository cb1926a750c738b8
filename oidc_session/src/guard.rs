use crate::session::SessionHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(String),
}

/// Gate for routes that need a valid session.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    redirect_route: String,
}

impl RouteGuard {
    pub fn new(redirect_route: impl Into<String>) -> Self {
        Self {
            redirect_route: redirect_route.into(),
        }
    }

    pub fn check(&self, session: &SessionHandle) -> RouteDecision {
        if session.is_authenticated() {
            RouteDecision::Allow
        } else {
            tracing::debug!("Not authenticated, redirecting to {}", self.redirect_route);
            RouteDecision::Redirect(self.redirect_route.clone())
        }
    }
}
