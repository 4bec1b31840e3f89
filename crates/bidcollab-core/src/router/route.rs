use std::fmt;

/// Where `/` sends the user
pub const HOME_PATH: &str = "/projects";

/// Views reachable in the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    PublicExamLink { token: String },
    /// `/`, which immediately redirects to the project list
    Root,
    Projects,
    Project { id: i64 },
    DocumentEditor { id: i64 },
    Assets,
    Knowledge,
    DomainLexicons,
    KnowledgeGraph,
    Exams,
    Reviews,
    Exports { doc_id: i64 },
    NotFound { path: String },
}

impl Route {
    /// Match a normalized path against the route table.
    pub fn resolve(path: &str) -> Self {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match segments.as_slice() {
            [""] => Route::Root,
            ["login"] => Route::Login,
            ["exam-link", token] if !token.is_empty() => Route::PublicExamLink {
                token: token.to_string(),
            },
            ["projects"] => Route::Projects,
            ["projects", id] => parse_id(id)
                .map(|id| Route::Project { id })
                .unwrap_or_else(|| Route::not_found(path)),
            ["documents", id, "edit"] => parse_id(id)
                .map(|id| Route::DocumentEditor { id })
                .unwrap_or_else(|| Route::not_found(path)),
            ["assets"] => Route::Assets,
            ["knowledge"] => Route::Knowledge,
            ["domain-lexicons"] => Route::DomainLexicons,
            ["knowledge-graph"] => Route::KnowledgeGraph,
            ["exams"] => Route::Exams,
            ["reviews"] => Route::Reviews,
            ["exports", doc_id] => parse_id(doc_id)
                .map(|doc_id| Route::Exports { doc_id })
                .unwrap_or_else(|| Route::not_found(path)),
            _ => Route::not_found(path),
        }
    }

    fn not_found(path: &str) -> Self {
        Route::NotFound {
            path: path.to_string(),
        }
    }

    /// Target of a redirect-only route.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Route::Root => Some(HOME_PATH),
            _ => None,
        }
    }

    /// Canonical path for this route.
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::PublicExamLink { token } => format!("/exam-link/{}", token),
            Route::Root => "/".to_string(),
            Route::Projects => "/projects".to_string(),
            Route::Project { id } => format!("/projects/{}", id),
            Route::DocumentEditor { id } => format!("/documents/{}/edit", id),
            Route::Assets => "/assets".to_string(),
            Route::Knowledge => "/knowledge".to_string(),
            Route::DomainLexicons => "/domain-lexicons".to_string(),
            Route::KnowledgeGraph => "/knowledge-graph".to_string(),
            Route::Exams => "/exams".to_string(),
            Route::Reviews => "/reviews".to_string(),
            Route::Exports { doc_id } => format!("/exports/{}", doc_id),
            Route::NotFound { path } => path.clone(),
        }
    }

    /// Get the display title for this route.
    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::PublicExamLink { .. } => "Shared Exam",
            Route::Root => "Home",
            Route::Projects => "Projects",
            Route::Project { .. } => "Project",
            Route::DocumentEditor { .. } => "Document Editor",
            Route::Assets => "Asset Library",
            Route::Knowledge => "Knowledge Base",
            Route::DomainLexicons => "Domain Lexicons",
            Route::KnowledgeGraph => "Knowledge Graph",
            Route::Exams => "Exam Center",
            Route::Reviews => "Review Center",
            Route::Exports { .. } => "Export History",
            Route::NotFound { .. } => "Not Found",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title(), self.path())
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

/// Strip query string and fragment, make the path absolute, and drop a
/// trailing slash (except on `/` itself).
pub fn normalize(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = path[..end].trim();

    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_static_routes() {
        assert_eq!(Route::resolve("/"), Route::Root);
        assert_eq!(Route::resolve("/login"), Route::Login);
        assert_eq!(Route::resolve("/projects"), Route::Projects);
        assert_eq!(Route::resolve("/assets"), Route::Assets);
        assert_eq!(Route::resolve("/knowledge"), Route::Knowledge);
        assert_eq!(Route::resolve("/domain-lexicons"), Route::DomainLexicons);
        assert_eq!(Route::resolve("/knowledge-graph"), Route::KnowledgeGraph);
        assert_eq!(Route::resolve("/exams"), Route::Exams);
        assert_eq!(Route::resolve("/reviews"), Route::Reviews);
    }

    #[test]
    fn test_resolve_params() {
        assert_eq!(Route::resolve("/projects/42"), Route::Project { id: 42 });
        assert_eq!(Route::resolve("/documents/7/edit"), Route::DocumentEditor { id: 7 });
        assert_eq!(Route::resolve("/exports/9"), Route::Exports { doc_id: 9 });
        assert_eq!(
            Route::resolve("/exam-link/xyz789"),
            Route::PublicExamLink { token: "xyz789".to_string() }
        );
    }

    #[test]
    fn test_resolve_bad_params_not_found() {
        assert_eq!(
            Route::resolve("/projects/abc"),
            Route::NotFound { path: "/projects/abc".to_string() }
        );
        assert!(matches!(Route::resolve("/documents/7"), Route::NotFound { .. }));
        assert!(matches!(Route::resolve("/documents/x/edit"), Route::NotFound { .. }));
        assert!(matches!(Route::resolve("/exam-link/"), Route::NotFound { .. }));
        assert!(matches!(Route::resolve("/exam-link/a/b"), Route::NotFound { .. }));
        assert!(matches!(Route::resolve("/settings"), Route::NotFound { .. }));
    }

    #[test]
    fn test_root_redirects_home() {
        assert_eq!(Route::Root.redirect(), Some(HOME_PATH));
        assert_eq!(Route::Projects.redirect(), None);
        assert_eq!(Route::Login.redirect(), None);
    }

    #[test]
    fn test_path_matches_resolve() {
        let routes = [
            Route::Login,
            Route::PublicExamLink { token: "t0k".to_string() },
            Route::Root,
            Route::Project { id: 3 },
            Route::DocumentEditor { id: 11 },
            Route::Exports { doc_id: 5 },
            Route::KnowledgeGraph,
        ];
        for route in routes {
            assert_eq!(Route::resolve(&route.path()), route);
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/projects"), "/projects");
        assert_eq!(normalize("/projects/"), "/projects");
        assert_eq!(normalize("projects"), "/projects");
        assert_eq!(normalize("/projects?page=2"), "/projects");
        assert_eq!(normalize("/projects/3#files"), "/projects/3");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("///"), "/");
    }

    #[test]
    fn test_display() {
        assert_eq!(Route::Project { id: 4 }.to_string(), "Project (/projects/4)");
    }
}
