use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, error, info};

use crate::backend::Backend;
use crate::errors::ServerError;
use crate::health::HealthCheck;
use crate::http::{self, CONTROL_PATH};
use crate::server::ServerOptions;

use super::Running;

pub(crate) struct Bootstrapped {
    backend: Arc<Backend>,
}

impl Bootstrapped {
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    pub(crate) fn backend(&self) -> &Backend {
        &self.backend
    }

    pub(crate) async fn start(&self, options: &ServerOptions) -> Result<Running, ServerError> {
        check_paths(options)?;

        let health_check = options
            .health_check
            .enabled
            .then(|| HealthCheck::new(options.health_check.clone()));
        let router = http::router(self.backend.clone(), options, health_check.clone());

        let listen_address = SocketAddr::new(options.address, options.port);
        let tcp_listener = TcpListener::bind(listen_address)
            .await
            .map_err(ServerError::Bind)?;
        let address = tcp_listener.local_addr().map_err(ServerError::Bind)?;
        info!(%address, graphql_path = %options.graphql_path, "Starting testx server");

        let cancellation_token = CancellationToken::new();
        let ct = cancellation_token.child_token();
        let handle = tokio::spawn(
            async move {
                let result = axum::serve(tcp_listener, router)
                    .with_graceful_shutdown(async move {
                        ct.cancelled().await;
                        debug!("testx server cancelled");
                    })
                    .await;
                if let Err(e) = result {
                    error!(error = %e, "testx server shutdown with error");
                }
            }
            .instrument(tracing::info_span!("testx-server", bind_address = %address)),
        );

        Ok(Running::new(
            self.backend.clone(),
            address,
            cancellation_token,
            health_check,
            handle,
        ))
    }
}

/// Routes are registered by path, so they must be well formed and not overlap
fn check_paths(options: &ServerOptions) -> Result<(), ServerError> {
    let mut paths = Vec::with_capacity(3);
    if options.control {
        paths.push(CONTROL_PATH);
    }
    paths.push(options.graphql_path.as_str());
    if options.health_check.enabled {
        paths.push(options.health_check.path.as_str());
    }

    let mut routes: Vec<Vec<Segment>> = Vec::with_capacity(paths.len());
    for path in paths {
        let invalid = || ServerError::InvalidPath(path.to_string());
        let route = segments(path).ok_or_else(invalid)?;
        if routes.iter().any(|other| overlaps(other, &route)) {
            return Err(invalid());
        }
        routes.push(route);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Static(&'a str),
    Capture(&'a str),
    CatchAll(&'a str),
}

/// Split a route path into segments, or `None` if the router would refuse it
fn segments(path: &str) -> Option<Vec<Segment<'_>>> {
    let rest = path.strip_prefix('/')?;
    let parts: Vec<&str> = rest.split('/').collect();
    let last = parts.len().saturating_sub(1);

    parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            let capture = part
                .strip_prefix('{')
                .and_then(|inner| inner.strip_suffix('}'))
                .filter(|name| !name.contains(['{', '}', '/']));
            match capture {
                Some(name) => match name.strip_prefix('*') {
                    Some(name) if !name.is_empty() && index == last => {
                        Some(Segment::CatchAll(name))
                    }
                    Some(_) => None,
                    None if !name.is_empty() => Some(Segment::Capture(name)),
                    None => None,
                },
                None if part.contains(['{', '}']) || part.starts_with([':', '*']) => None,
                None => Some(Segment::Static(part)),
            }
        })
        .collect()
}

/// Whether two routes can't be registered on the same router
fn overlaps(left: &[Segment], right: &[Segment]) -> bool {
    for (l, r) in left.iter().zip(right) {
        match (l, r) {
            (Segment::Static(a), Segment::Static(b)) if a == b => continue,
            (Segment::Capture(a), Segment::Capture(b)) if a == b => continue,
            (Segment::Static(_), _) | (_, Segment::Static(_)) => return false,
            _ => return true,
        }
    }
    left.len() == right.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/", true)]
    #[case("/graphql", true)]
    #[case("/api/v1/graphql", true)]
    #[case("/graphql/{tenant}", true)]
    #[case("/files/{*rest}", true)]
    #[case("graphql", false)]
    #[case("", false)]
    #[case("/graphql/{", false)]
    #[case("/graphql/}", false)]
    #[case("/graphql/{}", false)]
    #[case("/graphql/{a}{b}", false)]
    #[case("/graphql/:id", false)]
    #[case("/graphql/*rest", false)]
    #[case("/files/{*rest}/more", false)]
    fn it_checks_route_syntax(#[case] path: &str, #[case] valid: bool) {
        assert_eq!(segments(path).is_some(), valid);
    }

    #[rstest]
    #[case("/graphql", "/graphql", true)]
    #[case("/testx/{name}", CONTROL_PATH, true)]
    #[case("/testx/{method}", CONTROL_PATH, true)]
    #[case("/testx/{*rest}", CONTROL_PATH, true)]
    #[case("/testx/{name}/more", CONTROL_PATH, true)]
    #[case("/graphql", CONTROL_PATH, false)]
    #[case("/testx", CONTROL_PATH, false)]
    #[case("/testx/{method}/more", CONTROL_PATH, false)]
    #[case("/graphql", "/health", false)]
    fn it_detects_overlapping_routes(
        #[case] left: &str,
        #[case] right: &str,
        #[case] overlapping: bool,
    ) {
        let left = segments(left).unwrap();
        let right = segments(right).unwrap();

        assert_eq!(overlaps(&left, &right), overlapping);
        assert_eq!(overlaps(&right, &left), overlapping);
    }
}
