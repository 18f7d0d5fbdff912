//! Route table hot reload.

use std::path::Path;
use std::sync::Arc;

use notify::RecommendedWatcher;

use crate::config::ConfigWatcher;
use crate::routing::{RouteTable, SharedRouteTable};

/// Watch `path` and swap every valid route table into `routes`.
///
/// The returned watcher must be kept alive for reloads to continue.
pub fn spawn_route_reloader(
    path: &Path,
    routes: Arc<SharedRouteTable>,
) -> Result<RecommendedWatcher, notify::Error> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let guard = watcher.run()?;

    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            match RouteTable::from_config(&config.routes) {
                Ok(table) => routes.replace(table),
                Err(e) => tracing::error!(error = %e, "Reloaded routes rejected, keeping current table"),
            }
        }
        tracing::debug!("Route reloader stopped");
    });

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteSource;
    use std::time::Duration;

    #[tokio::test]
    async fn valid_file_change_replaces_routes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "").unwrap();
        let routes = Arc::new(SharedRouteTable::new(RouteTable::default()));

        let _guard = spawn_route_reloader(file.path(), routes.clone()).unwrap();
        std::fs::write(
            file.path(),
            r#"
            [[routes]]
            id = "orders"
            path_prefixes = ["/orders"]
            [routes.target]
            base_url = "http://orders:8080"
            "#,
        )
        .unwrap();

        tokio::time::timeout(Duration::from_secs(10), async {
            while routes.current_routes().find_best_match("/orders/1").is_none() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("routes were not reloaded");
    }
}
