//! Screen path resolution on top of the screen model

use screentest_common::{ConfigError, HarnessError, HarnessResult, RenderRequest, ScreenDefinition};
use std::sync::Arc;
use tracing::debug;

use crate::boundary::ScreenModel;

/// Thin adapter over a [`ScreenModel`] that turns lookup misses into typed errors
#[derive(Clone)]
pub struct ScreenPathResolver {
    model: Arc<dyn ScreenModel>,
}

/// Trim one trailing separator and split into non-empty segments
pub fn split_base_path(path: &str) -> (String, Vec<String>) {
    let trimmed = path.strip_suffix('/').unwrap_or(path).to_string();
    let segments = trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (trimmed, segments)
}

impl ScreenPathResolver {
    pub fn new(model: Arc<dyn ScreenModel>) -> Self {
        Self { model }
    }

    pub fn resolve_root(&self, location: &str) -> Result<ScreenDefinition, ConfigError> {
        self.model
            .resolve(location)
            .ok_or_else(|| ConfigError::RootScreenNotFound(location.to_string()))
    }

    /// Walk `segments` from `root`, returning the screen the last one lands on
    pub fn resolve_base(
        &self,
        root: &ScreenDefinition,
        segments: &[String],
    ) -> Result<ScreenDefinition, ConfigError> {
        let mut current = root.clone();
        for segment in segments {
            let subscreen = self.model.subscreen(&current, segment).ok_or_else(|| {
                ConfigError::BaseScreenPathInvalid {
                    segment: segment.clone(),
                    detail: format!("no subscreen named {} under {}", segment, current.location),
                }
            })?;
            current = self.model.resolve(&subscreen.location).ok_or_else(|| {
                ConfigError::BaseScreenPathInvalid {
                    segment: segment.clone(),
                    detail: format!("could not load screen at {}", subscreen.location),
                }
            })?;
        }
        Ok(current)
    }

    /// Full segment list, from the root, for a render request
    pub fn resolve_request(
        &self,
        root: &ScreenDefinition,
        base: &ScreenDefinition,
        base_segments: &[String],
        request: &RenderRequest,
    ) -> HarnessResult<Vec<String>> {
        let segments = self
            .model
            .parse_path(root, base, base_segments, &request.screen_path, &request.parameters)
            .ok_or_else(|| HarnessError::Resolution {
                path: request.screen_path.clone(),
                base: base.location.clone(),
            })?;
        debug!("Resolved {} to {:?}", request.screen_path, segments);
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;

    const TREE: &str = r#"
screens:
  /apps:
    subscreens:
      tools: /apps/tools
      ghost: /apps/missing
  /apps/tools:
    subscreens:
      users: /apps/tools/users
  /apps/tools/users:
    template: users
"#;

    fn resolver() -> ScreenPathResolver {
        let fixture = Arc::new(Fixture::from_yaml(TREE).unwrap());
        ScreenPathResolver::new(fixture)
    }

    #[test]
    fn test_split_base_path() {
        assert_eq!(
            split_base_path("tools/users/"),
            (
                "tools/users".to_string(),
                vec!["tools".to_string(), "users".to_string()]
            )
        );
        assert_eq!(split_base_path(""), (String::new(), vec![]));
        assert_eq!(split_base_path("/"), (String::new(), vec![]));
    }

    #[test]
    fn test_resolve_base_walks_segments() {
        let resolver = resolver();
        let root = resolver.resolve_root("/apps").unwrap();
        let base = resolver
            .resolve_base(&root, &["tools".to_string(), "users".to_string()])
            .unwrap();
        assert_eq!(base.location, "/apps/tools/users");
    }

    #[test]
    fn test_resolve_base_names_bad_segment() {
        let resolver = resolver();
        let root = resolver.resolve_root("/apps").unwrap();

        let err = resolver
            .resolve_base(&root, &["tools".to_string(), "orders".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BaseScreenPathInvalid { ref segment, .. } if segment == "orders"
        ));

        let err = resolver.resolve_base(&root, &["ghost".to_string()]).unwrap_err();
        match err {
            ConfigError::BaseScreenPathInvalid { segment, detail } => {
                assert_eq!(segment, "ghost");
                assert!(detail.contains("/apps/missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_request_miss() {
        let resolver = resolver();
        let root = resolver.resolve_root("/apps").unwrap();
        let request = RenderRequest::new("tools/nope");

        let err = resolver.resolve_request(&root, &root, &[], &request).unwrap_err();
        assert!(matches!(err, HarnessError::Resolution { ref path, .. } if path == "tools/nope"));
    }
}
