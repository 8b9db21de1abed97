//! Path templating for template and output paths
//!
//! Template paths use the literal segments `programme`, `team`, `service`
//! and `environment` as placeholders. Only whole segments are rewritten;
//! file names such as `infra-kustomize.yaml` are never touched.

use crate::defaults::OUTPUT_ROOT;
use crate::error::Result;
use glob::Pattern;

/// Placeholder segment for the programme name
pub const PROGRAMME_SEGMENT: &str = "programme";
/// Placeholder segment for the team name
pub const TEAM_SEGMENT: &str = "team";
/// Placeholder segment for the service name
pub const SERVICE_SEGMENT: &str = "service";
/// Placeholder segment for the environment family and instance
pub const ENVIRONMENT_SEGMENT: &str = "environment";

/// Split an environment name into its three-letter family and the instance
/// remainder (`snd1` → `("snd", "1")`).
///
/// Names shorter than three characters are all family and no instance.
pub fn split_environment(name: &str) -> (&str, &str) {
    match name.char_indices().nth(3) {
        Some((index, _)) => name.split_at(index),
        None => (name, ""),
    }
}

/// Output directory for an environment: family, then the zero-prefixed
/// instance (`snd1` → `snd/01`, `dev12` → `dev/012`).
pub fn environment_path(name: &str) -> String {
    let (family, instance) = split_environment(name);
    format!("{}/0{}", family, instance)
}

/// Values bound to placeholder segments while rewriting one template path.
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'a> {
    pub programme: &'a str,
    pub team: &'a str,
    pub service: Option<&'a str>,
    pub environment: Option<&'a str>,
}

impl<'a> PathContext<'a> {
    pub fn team(programme: &'a str, team: &'a str) -> Self {
        Self {
            programme,
            team,
            service: None,
            environment: None,
        }
    }

    pub fn with_service(self, service: &'a str) -> Self {
        Self {
            service: Some(service),
            ..self
        }
    }

    pub fn with_environment(self, environment: &'a str) -> Self {
        Self {
            environment: Some(environment),
            ..self
        }
    }
}

/// Rewrite the placeholder segments of `template_path` and root the result
/// under the output directory.
///
/// Segments without a bound value (e.g. `service` in a team-scope template)
/// are kept literally.
pub fn output_path(template_path: &str, ctx: &PathContext<'_>) -> String {
    let rewritten: Vec<String> = template_path
        .split('/')
        .map(|segment| match segment {
            PROGRAMME_SEGMENT => ctx.programme.to_string(),
            TEAM_SEGMENT => ctx.team.to_string(),
            SERVICE_SEGMENT => ctx.service.unwrap_or(segment).to_string(),
            ENVIRONMENT_SEGMENT => ctx
                .environment
                .map(environment_path)
                .unwrap_or_else(|| segment.to_string()),
            other => other.to_string(),
        })
        .collect();
    format!("{}/{}", OUTPUT_ROOT, rewritten.join("/"))
}

/// True when `template_path` has `segment` as one of its directory or file
/// segments.
pub fn has_segment(template_path: &str, segment: &str) -> bool {
    template_path.split('/').any(|s| s == segment)
}

/// Strip `root` (and the separator after it) from a repository path.
pub fn relative_to<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    let root = root.trim_end_matches('/');
    path.strip_prefix(root)?.strip_prefix('/')
}

/// Match a path against a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern)?;
    Ok(pattern.matches(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_path() {
        assert_eq!(environment_path("snd1"), "snd/01");
        assert_eq!(environment_path("dev12"), "dev/012");
        assert_eq!(environment_path("prd1"), "prd/01");
    }

    #[test]
    fn test_environment_path_short_name() {
        assert_eq!(environment_path("sn"), "sn/0");
        assert_eq!(environment_path("snd"), "snd/0");
    }

    #[test]
    fn test_split_environment() {
        assert_eq!(split_environment("tst2"), ("tst", "2"));
        assert_eq!(split_environment("pre10"), ("pre", "10"));
    }

    #[test]
    fn test_output_path_team_scope() {
        let ctx = PathContext::team("ffc", "ffc-demo");
        assert_eq!(
            output_path("programme/team/base/kustomization.yaml", &ctx),
            "services/ffc/ffc-demo/base/kustomization.yaml"
        );
    }

    #[test]
    fn test_output_path_environment_scope() {
        let ctx = PathContext::team("ffc", "ffc-demo")
            .with_service("ffc-demo-web")
            .with_environment("snd1");
        assert_eq!(
            output_path("programme/team/service/deploy/environment/patch.yaml", &ctx),
            "services/ffc/ffc-demo/ffc-demo-web/deploy/snd/01/patch.yaml"
        );
    }

    #[test]
    fn test_output_path_only_rewrites_whole_segments() {
        let ctx = PathContext::team("ffc", "ffc-demo").with_service("web");
        assert_eq!(
            output_path("programme/team/service/team-service.yaml", &ctx),
            "services/ffc/ffc-demo/web/team-service.yaml"
        );
    }

    #[test]
    fn test_has_segment() {
        assert!(has_segment("programme/team/environment/kustomization.yaml", "environment"));
        assert!(!has_segment("programme/team/environments.yaml", "environment"));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to("flux/templates/programme/team/a.yaml", "flux/templates"),
            Some("programme/team/a.yaml")
        );
        assert_eq!(
            relative_to("flux/templates/a.yaml", "flux/templates/"),
            Some("a.yaml")
        );
        assert_eq!(relative_to("flux/services/team.yaml", "flux/templates"), None);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("programme/team/service/infra/**", "programme/team/service/infra/environment/patch.yaml").unwrap());
        assert!(!glob_match("programme/team/service/infra/**", "programme/team/service/infra-kustomize.yaml").unwrap());
    }
}
