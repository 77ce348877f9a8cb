//! Route composition: apply mount prefixes and de-duplicate.
//!
//! Every route first appears in the form its own file declares. Each mount
//! whose router file is known then contributes a prefixed form of that
//! file's routes, transitively through nested routers. When the same source
//! route exists both bare and under a mount, the form with the longer mount
//! chain wins.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use super::walker::ProjectAnalysisState;
use crate::analysis::FileAnalysis;
use crate::endpoint::{EndpointDescriptor, HttpMethod};

/// `(file index, mount index)` in visit order.
type MountId = (usize, usize);

#[derive(Debug)]
struct RouteForm {
    endpoint: EndpointDescriptor,
    /// `(file index, route index)` of the declaring route.
    source: (usize, usize),
    /// Mounts applied, outermost first.
    chain: Vec<MountId>,
    /// False when another route already claimed the composed
    /// `(method, url)`. Such forms only supersede shorter forms.
    emitted: bool,
}

/// Join a mount prefix and a route path.
///
/// A trailing slash on the prefix is dropped and the path gets a leading
/// slash; a path of `/` yields the prefix itself and mounting at `/` leaves
/// the path unchanged.
pub fn join_url(prefix: &str, path: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        return path.to_string();
    }
    let prefix = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    if path == "/" || path.is_empty() {
        return prefix;
    }
    if path.starts_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    }
}

struct Composer<'a> {
    files: Vec<&'a FileAnalysis>,
    index: HashMap<&'a Path, usize>,
    forms: Vec<RouteForm>,
    seen: HashSet<(HttpMethod, String)>,
}

impl<'a> Composer<'a> {
    fn new(state: &'a ProjectAnalysisState) -> Self {
        let files: Vec<&FileAnalysis> = state.analyses().collect();
        let index = files
            .iter()
            .copied()
            .enumerate()
            .map(|(i, f)| (f.path(), i))
            .collect();
        Self {
            files,
            index,
            forms: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn direct_routes(&mut self) {
        for (fi, file) in self.files.iter().enumerate() {
            for (ri, route) in file.routes.iter().enumerate() {
                self.seen
                    .insert((route.endpoint.method, route.endpoint.url.clone()));
                self.forms.push(RouteForm {
                    endpoint: route.endpoint.clone(),
                    source: (fi, ri),
                    chain: Vec::new(),
                    emitted: true,
                });
            }
        }
    }

    fn mounted_routes(&mut self) {
        for fi in 0..self.files.len() {
            let file = self.files[fi];
            for (mi, mount) in file.route_mounts.iter().enumerate() {
                let Some(target) = self.target_of(fi, mi) else {
                    debug!(
                        binding = %mount.router_binding_name,
                        prefix = %mount.prefix,
                        "mount target not analyzed"
                    );
                    continue;
                };
                let prefix = mount.prefix.clone();
                self.expand(target, &prefix, vec![(fi, mi)], vec![fi, target]);
            }
        }
    }

    fn target_of(&self, fi: usize, mi: usize) -> Option<usize> {
        let path = self.files[fi].route_mounts[mi]
            .resolved_router_file_path
            .as_deref()?;
        self.index.get(path).copied()
    }

    /// Add `prefix`ed forms of file `fi`'s routes, then descend into its own
    /// mounts. `visiting` holds the files on the current mount path.
    fn expand(&mut self, fi: usize, prefix: &str, chain: Vec<MountId>, visiting: Vec<usize>) {
        let file = self.files[fi];
        for (ri, route) in file.routes.iter().enumerate() {
            let url = join_url(prefix, &route.endpoint.url);
            let emitted = self.seen.insert((route.endpoint.method, url.clone()));
            if emitted {
                debug!(prefix, route = %route.endpoint.url, url = %url, "applied mount prefix");
            } else {
                debug!(url = %url, "mounted route already declared");
            }
            let mut endpoint = route.endpoint.clone();
            endpoint.url = url;
            endpoint.seed_url_params();
            endpoint.refresh_data_type();
            self.forms.push(RouteForm {
                endpoint,
                source: (fi, ri),
                chain: chain.clone(),
                emitted,
            });
        }

        for mi in 0..file.route_mounts.len() {
            let Some(target) = self.target_of(fi, mi) else {
                continue;
            };
            if visiting.contains(&target) {
                continue;
            }
            let nested = join_url(prefix, &file.route_mounts[mi].prefix);
            let mut chain = chain.clone();
            chain.push((fi, mi));
            let mut visiting = visiting.clone();
            visiting.push(target);
            self.expand(target, &nested, chain, visiting);
        }
    }

    /// Drop forms superseded by a form of the same source route whose chain
    /// strictly extends theirs and whose URL differs, then keep the first
    /// emitted form of each `(method, url)`.
    fn finish(self) -> Vec<EndpointDescriptor> {
        let mut by_source: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (i, form) in self.forms.iter().enumerate() {
            by_source.entry(form.source).or_default().push(i);
        }

        let superseded = |i: usize| -> bool {
            let form = &self.forms[i];
            by_source[&form.source].iter().any(|&j| {
                let other = &self.forms[j];
                other.chain.len() > form.chain.len()
                    && other.chain.ends_with(&form.chain)
                    && other.endpoint.url != form.endpoint.url
            })
        };
        let keep: Vec<bool> = (0..self.forms.len()).map(|i| !superseded(i)).collect();

        let mut unique: HashSet<(HttpMethod, String)> = HashSet::new();
        self.forms
            .into_iter()
            .zip(keep)
            .filter(|(form, keep)| *keep && form.emitted)
            .map(|(form, _)| form.endpoint)
            .filter(|e| {
                let (method, url) = e.key();
                unique.insert((method, url.to_string()))
            })
            .collect()
    }
}

/// Produce the final route list from an analyzed project.
pub fn compose_routes(state: &ProjectAnalysisState) -> Vec<EndpointDescriptor> {
    let mut composer = Composer::new(state);
    composer.direct_routes();
    composer.mounted_routes();
    composer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{RouteMountDescriptor, RouteRecord, Span};
    use std::path::PathBuf;

    fn file(path: &str, routes: &[(HttpMethod, &str)], mounts: &[(&str, &str)]) -> FileAnalysis {
        let mut analysis = FileAnalysis::empty(path);
        for (method, url) in routes {
            analysis.routes.push(RouteRecord {
                endpoint: EndpointDescriptor::new(*method, *url),
                handler_args: Vec::new(),
                span: Span {
                    start_byte: 0,
                    end_byte: 0,
                    start_line: 1,
                },
            });
        }
        for (prefix, target) in mounts {
            analysis.route_mounts.push(RouteMountDescriptor {
                prefix: prefix.to_string(),
                router_binding_name: "router".to_string(),
                resolved_router_file_path: Some(PathBuf::from(target)),
            });
        }
        analysis
    }

    fn state(files: Vec<FileAnalysis>) -> ProjectAnalysisState {
        let mut state = ProjectAnalysisState::new("/p");
        for analysis in files {
            let path = analysis.file_path.clone();
            state.visit_order.push(path.clone());
            state.visited.insert(path.clone());
            state.file_cache.insert(path, analysis);
        }
        state
    }

    fn urls(endpoints: &[EndpointDescriptor]) -> Vec<String> {
        endpoints
            .iter()
            .map(|e| format!("{} {}", e.method, e.url))
            .collect()
    }

    #[test]
    fn test_mounted_form_replaces_bare_form() {
        let state = state(vec![
            file("/p/server.js", &[(HttpMethod::Get, "/health")], &[("/api/users", "/p/users.js")]),
            file("/p/users.js", &[(HttpMethod::Get, "/"), (HttpMethod::Get, "/:id")], &[]),
        ]);
        let endpoints = compose_routes(&state);
        assert_eq!(
            urls(&endpoints),
            vec!["GET /health", "GET /api/users", "GET /api/users/:id"]
        );
        let by_id = &endpoints[2];
        assert_eq!(by_id.param_types.len(), 1);
    }

    #[test]
    fn test_nested_mounts_compose() {
        let state = state(vec![
            file("/p/server.js", &[], &[("/api", "/p/api.js")]),
            file("/p/api.js", &[(HttpMethod::Get, "/status")], &[("/orgs/:orgId", "/p/orgs.js")]),
            file("/p/orgs.js", &[(HttpMethod::Post, "/members")], &[]),
        ]);
        let endpoints = compose_routes(&state);
        assert_eq!(
            urls(&endpoints),
            vec!["GET /api/status", "POST /api/orgs/:orgId/members"]
        );
        let members = &endpoints[1];
        assert_eq!(members.param_types[0].name, "orgId");
        assert_eq!(
            members.request_data_type,
            crate::endpoint::RequestDataType::Params
        );
    }

    #[test]
    fn test_mount_cycle_terminates() {
        let state = state(vec![
            file("/p/a.js", &[(HttpMethod::Get, "/a")], &[("/b", "/p/b.js")]),
            file("/p/b.js", &[(HttpMethod::Get, "/b")], &[("/a", "/p/a.js")]),
        ]);
        let endpoints = compose_routes(&state);
        assert!(endpoints.len() >= 2);
        let mut keys: Vec<String> = urls(&endpoints);
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), endpoints.len());
    }

    #[test]
    fn test_colliding_mounted_form_still_drops_bare_form() {
        let state = state(vec![
            file(
                "/p/server.js",
                &[(HttpMethod::Get, "/api/users/:id")],
                &[("/api/users", "/p/users.js")],
            ),
            file("/p/users.js", &[(HttpMethod::Get, "/:id"), (HttpMethod::Post, "/")], &[]),
        ]);
        assert_eq!(
            urls(&compose_routes(&state)),
            vec!["GET /api/users/:id", "POST /api/users"]
        );
    }

    #[test]
    fn test_root_mount_keeps_single_route() {
        let state = state(vec![
            file("/p/server.js", &[], &[("/", "/p/routes.js")]),
            file("/p/routes.js", &[(HttpMethod::Delete, "/items/:id")], &[]),
        ]);
        assert_eq!(urls(&compose_routes(&state)), vec!["DELETE /items/:id"]);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("/api/users", "/:id"), "/api/users/:id");
        assert_eq!(join_url("/api/users/", "/"), "/api/users");
        assert_eq!(join_url("/api", "items"), "/api/items");
        assert_eq!(join_url("api", "/items"), "/api/items");
        assert_eq!(join_url("/", "/health"), "/health");
        assert_eq!(join_url("", "/health"), "/health");
    }
}
