use std::sync::Arc;

use crate::{
    config::AppConfig,
    guard::{AccessGuard, NOT_AUTHORIZED_PATH, SIGN_IN_PATH},
    models::{GuardOutcome, Location, NavigationState, Session},
    redirector::{RoleRedirector, RoleSpaces},
    routes::{RouteConfigError, RouteSpec, RouteTable},
    title::TitleResolver,
};

/// Portal
///
/// The navigation rules of the portal bundled together: the route table, the Access
/// Guard, the Role Redirector and the title resolver. Immutable once built and shared
/// (`Arc`) by the HTTP server and the navigation controller.
#[derive(Debug)]
pub struct Portal {
    pub routes: RouteTable,
    pub guard: AccessGuard,
    pub redirector: RoleRedirector,
    pub titles: Arc<TitleResolver>,
}

/// The evaluation of one location against one session snapshot.
#[derive(Debug)]
pub struct PageResolution<'a> {
    pub navigation: NavigationState,
    /// Most specific matching route, if any.
    pub route: Option<&'a RouteSpec>,
    pub outcome: GuardOutcome,
}

impl Portal {
    pub fn new(routes: RouteTable, titles: TitleResolver) -> Self {
        Self {
            routes,
            guard: AccessGuard::new(SIGN_IN_PATH, NOT_AUTHORIZED_PATH),
            redirector: RoleRedirector::new(SIGN_IN_PATH, RoleSpaces::default()),
            titles: Arc::new(titles),
        }
    }

    /// Builds the portal routes with the title settings from the configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, RouteConfigError> {
        let routes = RouteTable::portal()?;
        let titles = TitleResolver::new(
            routes.title_table()?,
            config.default_title.clone(),
            config.app_name.clone(),
        )
        .with_suffix(config.title_suffix);
        Ok(Self::new(routes, titles))
    }

    /// Public and unknown routes render directly. Guarded routes go through the Access
    /// Guard and, once authorized, the Role Redirector.
    pub fn resolve(&self, session: &Session, location: &Location) -> PageResolution<'_> {
        let navigation = self.routes.navigation(&location.pathname);
        let route = self.routes.route(&navigation);

        let outcome = match route.and_then(RouteSpec::allowed_roles) {
            None => GuardOutcome::Render,
            Some(allowed) => match self.guard.decide(session, allowed, location) {
                GuardOutcome::Render => self
                    .redirector
                    .check(session, location)
                    .map_or(GuardOutcome::Render, GuardOutcome::Redirect),
                other => other,
            },
        };

        PageResolution {
            navigation,
            route,
            outcome,
        }
    }

    pub fn document_title(&self, navigation: &NavigationState) -> String {
        self.titles.document_title(navigation)
    }
}
