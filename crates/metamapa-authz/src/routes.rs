//! Client-side route surface and its access policies.
//!
//! # Purpose
//! Maps a navigation path to the policy guarding it. Patterns use `:param`
//! segments and are matched with casbin's `key_match2`.
//!
//! # Key invariants
//! - Literal patterns win over parameterised ones regardless of declaration
//!   order, so `/colecciones/nueva` is never captured by `/colecciones/:id`.
//! - Unknown paths resolve to `None` ("not found").
use crate::{AuthzError, AuthzResult, Role, RoutePolicy};
use casbin::function_map::key_match2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub pattern: String,
    pub policy: Option<RoutePolicy>,
}

impl RouteEntry {
    pub fn is_literal(&self) -> bool {
        !self.pattern.split('/').any(|segment| segment.starts_with(':'))
    }

    pub fn is_public(&self) -> bool {
        self.policy.is_none()
    }

    fn matches(&self, path: &str) -> bool {
        if self.is_literal() {
            return self.pattern == path;
        }
        key_match2(path, &self.pattern)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidRoutePattern`] when the pattern is not absolute
    ///   or contains an empty parameter name.
    pub fn add(&mut self, pattern: &str, policy: Option<RoutePolicy>) -> AuthzResult<()> {
        if !pattern.starts_with('/') || pattern.split('/').any(|segment| segment == ":") {
            return Err(AuthzError::InvalidRoutePattern(pattern.to_string()));
        }
        self.entries.push(RouteEntry {
            pattern: pattern.to_string(),
            policy,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Find the route guarding `path`; query strings and trailing slashes
    /// are ignored.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        let path = normalize(path);
        self.entries
            .iter()
            .filter(|entry| entry.is_literal())
            .find(|entry| entry.matches(path))
            .or_else(|| {
                self.entries
                    .iter()
                    .filter(|entry| !entry.is_literal())
                    .find(|entry| entry.matches(path))
            })
    }

    /// The MetaMapa navigation surface.
    pub fn metamapa() -> Self {
        let contributors = RoutePolicy::any_of([Role::CONTRIBUTOR, Role::ADMIN]);
        let admins = RoutePolicy::any_of([Role::ADMIN]);

        let public = [
            "/",
            "/hechos/:id",
            "/contacto",
            "/nosotros",
            "/colecciones",
            "/colecciones/:id",
            "/estadisticas",
            "/login",
            "/registro",
            "/callback",
        ];
        let contributor_routes = ["/crear-hecho", "/perfil-completo", "/solicitudes/nueva"];
        let admin_routes = [
            "/reportes-hechos",
            "/reportes-hechos/:id",
            "/solicitudes",
            "/solicitudes/:id",
            "/usuarios",
            "/usuarios/:id",
            "/colecciones/nueva",
            "/importar-dataset",
        ];

        let mut entries = Vec::new();
        entries.extend(public.iter().map(|pattern| (*pattern, None)));
        entries.push(("/perfil", Some(RoutePolicy::authenticated())));
        entries.extend(
            contributor_routes
                .iter()
                .map(|pattern| (*pattern, Some(contributors.clone()))),
        );
        entries.extend(
            admin_routes
                .iter()
                .map(|pattern| (*pattern, Some(admins.clone()))),
        );

        Self {
            entries: entries
                .into_iter()
                .map(|(pattern, policy)| RouteEntry {
                    pattern: pattern.to_string(),
                    policy,
                })
                .collect(),
        }
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnauthenticatedAction;

    fn required(table: &RouteTable, path: &str) -> Option<Vec<String>> {
        table
            .resolve(path)
            .expect("known route")
            .policy
            .as_ref()
            .map(|policy| policy.required.names())
    }

    #[test]
    fn literal_route_wins_over_parameterised_sibling() {
        let table = RouteTable::metamapa();
        assert_eq!(required(&table, "/colecciones/nueva"), Some(vec!["ADMIN".to_string()]));
        assert_eq!(required(&table, "/colecciones/42"), None);
        assert_eq!(
            required(&table, "/solicitudes/nueva"),
            Some(vec!["CONTRIBUTOR".to_string(), "ADMIN".to_string()])
        );
        assert_eq!(required(&table, "/solicitudes/7"), Some(vec!["ADMIN".to_string()]));
    }

    #[test]
    fn literal_precedence_ignores_declaration_order() {
        let mut table = RouteTable::new();
        table.add("/colecciones/:id", None).expect("param");
        table
            .add("/colecciones/nueva", Some(RoutePolicy::any_of(["ADMIN"])))
            .expect("literal");
        let entry = table.resolve("/colecciones/nueva").expect("route");
        assert_eq!(entry.pattern, "/colecciones/nueva");
    }

    #[test]
    fn unknown_paths_are_not_found() {
        let table = RouteTable::metamapa();
        assert!(table.resolve("/no-existe").is_none());
        assert!(table.resolve("/hechos/1/extra").is_none());
    }

    #[test]
    fn query_and_trailing_slash_are_ignored() {
        let table = RouteTable::metamapa();
        assert_eq!(table.resolve("/perfil/").expect("route").pattern, "/perfil");
        assert_eq!(table.resolve("/?modo=CURADA").expect("route").pattern, "/");
        assert!(table.resolve("/hechos/12?tab=media").expect("route").is_public());
    }

    #[test]
    fn protected_routes_use_login_redirect() {
        let table = RouteTable::metamapa();
        for entry in table.entries().iter().filter(|entry| !entry.is_public()) {
            let policy = entry.policy.as_ref().expect("policy");
            assert_eq!(policy.on_unauthenticated, UnauthenticatedAction::Login);
        }
        assert!(required(&table, "/perfil").expect("policy").is_empty());
    }

    #[test]
    fn rejects_relative_patterns() {
        let mut table = RouteTable::new();
        assert!(matches!(
            table.add("perfil", None),
            Err(AuthzError::InvalidRoutePattern(_))
        ));
        assert!(table.add("/usuarios/:", None).is_err());
    }
}
