//! Dependency resolution over the registry.

use std::collections::HashSet;
use tracing::{debug, warn};

use super::PipelineRegistry;
use crate::core::PipelineRef;
use crate::errors::{CircularDependencyError, DependencyViolation, Result};

/// Computes the execution order for `target`: every transitive dependency
/// first, depth-first and left to right, then `target` itself.
///
/// Each pipeline appears once, at its first position. Cycle detection is
/// scoped to the current recursion path, so diamond-shaped graphs resolve
/// normally. Well-formed references to unregistered pipelines are kept in
/// the order; executing them later reports them as not found.
///
/// # Errors
///
/// [`MedallionError::CircularDependency`](crate::errors::MedallionError::CircularDependency)
/// if a pipeline is reached again along its own path, and
/// [`MedallionError::InvalidReference`](crate::errors::MedallionError::InvalidReference)
/// for a dependency string that is not `layer.name`.
pub fn resolve(registry: &PipelineRegistry, target: &PipelineRef) -> Result<Vec<PipelineRef>> {
    let order = visit(registry, target, &[])?;

    let mut seen = HashSet::new();
    let unique: Vec<PipelineRef> = order
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect();

    debug!(
        target = %target,
        order = ?unique.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Resolved execution order"
    );
    Ok(unique)
}

fn visit(
    registry: &PipelineRegistry,
    pipeline: &PipelineRef,
    path: &[String],
) -> Result<Vec<PipelineRef>> {
    let full_name = pipeline.full_name();
    let mut path = path.to_vec();
    if path.contains(&full_name) {
        path.push(full_name.clone());
        return Err(CircularDependencyError::new(full_name, path).into());
    }
    path.push(full_name);

    let mut order = Vec::new();
    for dependency in registry.get_dependencies(pipeline.layer, &pipeline.name) {
        let dependency = PipelineRef::parse(&dependency)?;
        order.extend(visit(registry, &dependency, &path)?);
    }
    order.push(pipeline.clone());
    Ok(order)
}

/// Checks that every declared dependency of every registered pipeline
/// refers to a registered pipeline. Reports all violations.
#[must_use]
pub fn validate_dependencies(registry: &PipelineRegistry) -> Vec<DependencyViolation> {
    let declared: Vec<(String, Vec<String>)> = registry
        .list(None)
        .into_iter()
        .map(|d| (d.full_name(), d.dependencies))
        .collect();
    find_violations(&declared, |p| registry.contains(p))
}

/// Collects the dependencies in `declared` that `is_known` rejects.
///
/// Malformed references are always violations.
pub(crate) fn find_violations(
    declared: &[(String, Vec<String>)],
    is_known: impl Fn(&PipelineRef) -> bool,
) -> Vec<DependencyViolation> {
    let mut violations = Vec::new();
    for (pipeline, dependencies) in declared {
        for dependency in dependencies {
            let known = PipelineRef::parse(dependency).is_ok_and(|p| is_known(&p));
            if !known {
                let violation = DependencyViolation {
                    pipeline: pipeline.clone(),
                    dependency: dependency.clone(),
                };
                warn!(%violation, "Unresolved pipeline dependency");
                violations.push(violation);
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineLayer;
    use crate::errors::MedallionError;
    use crate::pipeline::PipelineMetadata;
    use crate::testing::MockRunnable;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn register(registry: &PipelineRegistry, reference: &str, deps: &[&str]) {
        let p = PipelineRef::parse(reference).unwrap();
        registry.register(
            p.layer,
            p.name.clone(),
            Arc::new(MockRunnable::new(p.name)),
            deps.iter().map(|d| (*d).to_string()).collect(),
            PipelineMetadata::new(),
        );
    }

    fn names(order: &[PipelineRef]) -> Vec<String> {
        order.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_dependency_precedes_dependent() {
        let registry = PipelineRegistry::new();
        register(&registry, "bronze.geo", &[]);
        register(&registry, "silver.geo", &["bronze.geo"]);

        let order = resolve(&registry, &PipelineRef::new(PipelineLayer::Silver, "geo")).unwrap();
        assert_eq!(names(&order), vec!["bronze.geo", "silver.geo"]);
    }

    #[test]
    fn test_diamond_is_deduplicated_not_cyclic() {
        let registry = PipelineRegistry::new();
        register(&registry, "bronze.a", &[]);
        register(&registry, "silver.b", &["bronze.a"]);
        register(&registry, "silver.c", &["bronze.a"]);
        register(&registry, "gold.d", &["silver.b", "silver.c"]);

        let order = resolve(&registry, &PipelineRef::new(PipelineLayer::Gold, "d")).unwrap();
        assert_eq!(names(&order), vec!["bronze.a", "silver.b", "silver.c", "gold.d"]);
    }

    #[test]
    fn test_cycle_is_detected_for_either_member() {
        let registry = PipelineRegistry::new();
        register(&registry, "silver.x", &["silver.y"]);
        register(&registry, "silver.y", &["silver.x"]);

        for name in ["x", "y"] {
            let err = resolve(&registry, &PipelineRef::new(PipelineLayer::Silver, name)).unwrap_err();
            let MedallionError::CircularDependency(cycle) = err else {
                panic!("expected a cycle error");
            };
            assert_eq!(cycle.pipeline, format!("silver.{name}"));
            assert_eq!(cycle.path.first(), cycle.path.last());
        }
    }

    #[test]
    fn test_unknown_dependency_is_kept() {
        let registry = PipelineRegistry::new();
        register(&registry, "silver.geo", &["bronze.missing"]);

        let order = resolve(&registry, &PipelineRef::new(PipelineLayer::Silver, "geo")).unwrap();
        assert_eq!(names(&order), vec!["bronze.missing", "silver.geo"]);
    }

    #[test]
    fn test_malformed_dependency_is_rejected() {
        let registry = PipelineRegistry::new();
        register(&registry, "silver.geo", &["geo"]);

        let err = resolve(&registry, &PipelineRef::new(PipelineLayer::Silver, "geo")).unwrap_err();
        assert!(matches!(err, MedallionError::InvalidReference(r) if r == "geo"));
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let registry = PipelineRegistry::new();
        register(&registry, "bronze.geo", &[]);
        register(&registry, "silver.geo", &["bronze.geo", "bronze.nope"]);
        register(&registry, "gold.kpi", &["silver.nope", "platinum.x"]);

        let violations = validate_dependencies(&registry);
        let deps: Vec<&str> = violations.iter().map(|v| v.dependency.as_str()).collect();
        assert_eq!(deps, vec!["bronze.nope", "silver.nope", "platinum.x"]);
        assert_eq!(violations[0].pipeline, "silver.geo");
    }
}
