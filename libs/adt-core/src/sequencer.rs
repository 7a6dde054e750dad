//! Dependency graph construction, cycle detection, topological ordering, and
//! enable/disable precedence resolution (C4).
//!
//! This is the heart of the core: it turns a developer module manifest plus
//! user preferences and CLI overrides into an ordered, deterministic plan.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde_json::Value;

use crate::config::{effective_config, CliOverrides, DevConfig, ModuleDeclaration, UserConfig};
use crate::contract::ReleaseStatus;
use crate::registry::ModuleRegistry;

/// Final enable/disable/failure state of a module after precedence resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Enabled,
    Disabled,
    Failed,
    Pending,
}

/// One module's outcome from sequencing.
#[derive(Debug, Clone)]
pub struct ModuleResolution {
    pub name: String,
    pub state: ModuleState,
    pub version: String,
    pub resolved_dependencies: Vec<String>,
    pub init_order: i64,
    pub effective_config: BTreeMap<String, Value>,
    pub error_message: Option<String>,
}

/// The full output of a sequencing pass: resolutions plus any errors that
/// prevented a complete, usable plan from being produced.
#[derive(Debug, Clone, Default)]
pub struct SequencingResult {
    pub resolutions: Vec<ModuleResolution>,
    pub errors: Vec<String>,
}

impl SequencingResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Names of modules in `Enabled` state, in initialization order.
    #[must_use]
    pub fn enabled_order(&self) -> Vec<String> {
        let mut enabled: Vec<&ModuleResolution> = self
            .resolutions
            .iter()
            .filter(|r| r.state == ModuleState::Enabled)
            .collect();
        enabled.sort_by_key(|r| r.init_order);
        enabled.into_iter().map(|r| r.name.clone()).collect()
    }
}

/// Converts a module's declared name (`PascalCase` or `kebab-case`) into the
/// `UPPER_SNAKE_CASE` form used by its preview-gating environment variable.
#[must_use]
pub fn to_upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.chars() {
        if ch == '-' || ch == '_' || ch == ' ' {
            out.push('_');
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower_or_digit {
            out.push('_');
        }
        out.extend(ch.to_uppercase());
        prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
    }
    out
}

/// Whether a `preview` module defaults to enabled given the process environment.
#[must_use]
pub fn preview_enabled_by_env(name: &str) -> bool {
    let var = format!("ADT_ENABLE_{}", to_upper_snake(name));
    std::env::var(&var)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

struct GraphNode {
    declaration: ModuleDeclaration,
    dependencies: BTreeSet<String>,
    version: String,
    release_status: ReleaseStatus,
}

/// Builds a dependency graph and resolution plan from a developer manifest.
pub struct Sequencer<'a> {
    registry: &'a ModuleRegistry,
    dev_config: &'a DevConfig,
}

impl<'a> Sequencer<'a> {
    #[must_use]
    pub fn new(registry: &'a ModuleRegistry, dev_config: &'a DevConfig) -> Self {
        Self {
            registry,
            dev_config,
        }
    }

    fn build_nodes(&self) -> BTreeMap<String, GraphNode> {
        let mut nodes = BTreeMap::new();
        for declaration in &self.dev_config.modules {
            let mut dependencies: BTreeSet<String> =
                declaration.additional_dependencies.iter().cloned().collect();
            let (version, release_status) = match self.registry.get(&declaration.name) {
                Some(module) => {
                    dependencies.extend(module.dependencies().iter().cloned());
                    (module.version().to_string(), module.release_status())
                }
                None => ("0.0.0".to_string(), ReleaseStatus::Ga),
            };
            nodes.insert(
                declaration.name.clone(),
                GraphNode {
                    declaration: declaration.clone(),
                    dependencies,
                    version,
                    release_status,
                },
            );
        }
        nodes
    }

    /// Run the full sequencing pipeline: validate dependencies, detect
    /// cycles, topologically sort (with a lexicographic tie-break for
    /// determinism), apply enable/disable precedence, and produce resolutions.
    #[must_use]
    pub fn resolve(&self, user_config: &UserConfig, cli_overrides: &CliOverrides) -> SequencingResult {
        let nodes = self.build_nodes();

        // 1. Validate every dependency resolves to a known node.
        let mut errors = Vec::new();
        for (name, node) in &nodes {
            for dep in &node.dependencies {
                if !nodes.contains_key(dep) {
                    errors.push(format!(
                        "module `{name}` depends on unknown module `{dep}`"
                    ));
                }
            }
        }
        if !errors.is_empty() {
            return SequencingResult {
                resolutions: Vec::new(),
                errors,
            };
        }

        // 2. Cycle detection via DFS three-color marking.
        if let Some(cycle) = detect_cycle(&nodes) {
            return SequencingResult {
                resolutions: Vec::new(),
                errors: vec![format!(
                    "circular dependency detected: {}",
                    cycle.join(" -> ")
                )],
            };
        }

        // 3. Kahn's algorithm with a lexicographically sorted frontier.
        let topo_order = topological_sort(&nodes);

        // 4. Enable/disable precedence, in topological order.
        let disabled_set: BTreeSet<&str> =
            user_config.disabled_modules.iter().map(String::as_str).collect();
        let enabled_set: BTreeSet<&str> =
            user_config.enabled_modules.iter().map(String::as_str).collect();

        let mut states: BTreeMap<String, ModuleState> = BTreeMap::new();
        for name in &topo_order {
            let node = &nodes[name];
            let state = resolve_state(
                name,
                node.declaration.required,
                node.release_status,
                cli_overrides,
                &enabled_set,
                &disabled_set,
            );
            states.insert(name.clone(), state);
        }

        // 5. Demote modules whose dependency closure is not fully enabled.
        for name in &topo_order {
            if states[name] != ModuleState::Enabled {
                continue;
            }
            let node = &nodes[name];
            for dep in &node.dependencies {
                if states.get(dep) != Some(&ModuleState::Enabled) {
                    states.insert(name.clone(), ModuleState::Failed);
                    break;
                }
            }
        }

        // 6. Assemble resolutions with init_order restricted to the enabled set.
        let mut next_order = 0i64;
        let mut resolutions = Vec::with_capacity(topo_order.len());
        for name in &topo_order {
            let node = &nodes[name];
            let state = states[name];
            let init_order = if state == ModuleState::Enabled {
                let order = next_order;
                next_order += 1;
                order
            } else {
                -1
            };
            let error_message = if state == ModuleState::Failed {
                let failed_dep = node
                    .dependencies
                    .iter()
                    .find(|dep| states.get(*dep) != Some(&ModuleState::Enabled))
                    .cloned()
                    .unwrap_or_default();
                Some(format!(
                    "module `{name}` demoted to FAILED because dependency `{failed_dep}` is DISABLED"
                ))
            } else {
                None
            };
            let module_override = user_config.module_overrides.get(name);
            resolutions.push(ModuleResolution {
                name: name.clone(),
                state,
                version: node.version.clone(),
                resolved_dependencies: node.dependencies.iter().cloned().collect(),
                init_order,
                effective_config: effective_config(
                    &self.dev_config.global_config,
                    &node.declaration.config,
                    module_override,
                ),
                error_message,
            });
        }

        SequencingResult {
            resolutions,
            errors,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_state(
    name: &str,
    required: bool,
    release_status: ReleaseStatus,
    cli_overrides: &CliOverrides,
    enabled_set: &BTreeSet<&str>,
    disabled_set: &BTreeSet<&str>,
) -> ModuleState {
    if let Some(&force) = cli_overrides.get(name) {
        if !force && required {
            tracing::warn!(module = name, "CLI force-disable of required module ignored");
            return ModuleState::Enabled;
        }
        return if force {
            ModuleState::Enabled
        } else {
            ModuleState::Disabled
        };
    }

    if required {
        if disabled_set.contains(name) {
            tracing::warn!(
                module = name,
                "user disable of required module ignored; module remains enabled"
            );
        }
        return ModuleState::Enabled;
    }

    if enabled_set.contains(name) {
        return ModuleState::Enabled;
    }

    if disabled_set.contains(name) {
        return ModuleState::Disabled;
    }

    if release_status == ReleaseStatus::Preview && !preview_enabled_by_env(name) {
        return ModuleState::Disabled;
    }

    ModuleState::Enabled
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// DFS with three-color marking; returns the cycle path in traversal order if found.
fn detect_cycle(nodes: &BTreeMap<String, GraphNode>) -> Option<Vec<String>> {
    let mut colors: BTreeMap<&str, Color> =
        nodes.keys().map(|name| (name.as_str(), Color::White)).collect();
    let mut stack: Vec<String> = Vec::new();

    for start in nodes.keys() {
        if colors[start.as_str()] == Color::White {
            if let Some(cycle) = visit(start, nodes, &mut colors, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'a>(
    name: &'a str,
    nodes: &'a BTreeMap<String, GraphNode>,
    colors: &mut BTreeMap<&'a str, Color>,
    stack: &mut Vec<String>,
) -> Option<Vec<String>> {
    colors.insert(name, Color::Gray);
    stack.push(name.to_string());

    // Edges run dependency -> dependent, so we walk forward to each node's
    // dependents by scanning for nodes that declare `name` as a dependency.
    let dependents: Vec<&str> = nodes
        .iter()
        .filter(|(_, node)| node.dependencies.contains(name))
        .map(|(n, _)| n.as_str())
        .collect();

    for dependent in dependents {
        match colors[dependent] {
            Color::White => {
                if let Some(cycle) = visit(dependent, nodes, colors, stack) {
                    return Some(cycle);
                }
            }
            Color::Gray => {
                let start = stack.iter().position(|n| n == dependent).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].to_vec();
                cycle.push(dependent.to_string());
                return Some(cycle);
            }
            Color::Black => {}
        }
    }

    stack.pop();
    colors.insert(name, Color::Black);
    None
}

/// Kahn's algorithm; ties among zero-in-degree nodes are broken lexicographically.
fn topological_sort(nodes: &BTreeMap<String, GraphNode>) -> Vec<String> {
    let mut in_degree: BTreeMap<&str, usize> =
        nodes.keys().map(|n| (n.as_str(), 0)).collect();
    for node in nodes.values() {
        for dep in &node.dependencies {
            if let Some(degree) = in_degree.get_mut(dep.as_str()) {
                *degree += 1;
            }
        }
    }

    let mut frontier: BTreeSet<&str> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&name, _)| name)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    let mut queue: VecDeque<&str> = VecDeque::new();
    while !frontier.is_empty() || !queue.is_empty() {
        if queue.is_empty() {
            // Pull the whole current frontier in lexicographic order.
            for name in std::mem::take(&mut frontier) {
                queue.push_back(name);
            }
        }
        let Some(name) = queue.pop_front() else {
            break;
        };
        order.push(name.to_string());

        for (candidate_name, candidate_node) in nodes {
            if candidate_node.dependencies.contains(name) {
                if let Some(degree) = in_degree.get_mut(candidate_name.as_str()) {
                    if *degree > 0 {
                        *degree -= 1;
                        if *degree == 0 {
                            frontier.insert(candidate_name.as_str());
                        }
                    }
                }
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleDeclaration;
    use crate::contract::{ExecutionContext, ExecutionResult, Module};
    use std::sync::Arc;

    struct StubModule {
        name: &'static str,
        deps: Vec<String>,
        release_status: ReleaseStatus,
    }

    impl Module for StubModule {
        fn name(&self) -> &str {
            self.name
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn dependencies(&self) -> &[String] {
            &self.deps
        }
        fn release_status(&self) -> ReleaseStatus {
            self.release_status
        }
        fn initialize(&self, _config: &BTreeMap<String, Value>) -> Result<(), String> {
            Ok(())
        }
        fn execute(&self, _context: &ExecutionContext) -> ExecutionResult {
            ExecutionResult::success("ok")
        }
    }

    fn declare(name: &str, required: bool) -> ModuleDeclaration {
        ModuleDeclaration {
            name: name.to_string(),
            required,
            additional_dependencies: Vec::new(),
            config: BTreeMap::new(),
        }
    }

    fn dev_config(modules: Vec<ModuleDeclaration>) -> DevConfig {
        DevConfig {
            version: "1".to_string(),
            modules,
            global_config: BTreeMap::new(),
        }
    }

    fn registry_with(modules: Vec<StubModule>) -> ModuleRegistry {
        let registry = ModuleRegistry::new();
        for module in modules {
            registry.register(Arc::new(module)).unwrap();
        }
        registry
    }

    #[test]
    fn linear_chain_is_sequenced_in_order() {
        let registry = registry_with(vec![
            StubModule {
                name: "A",
                deps: vec![],
                release_status: ReleaseStatus::Ga,
            },
            StubModule {
                name: "B",
                deps: vec!["A".to_string()],
                release_status: ReleaseStatus::Ga,
            },
            StubModule {
                name: "C",
                deps: vec!["B".to_string()],
                release_status: ReleaseStatus::Ga,
            },
        ]);
        let dev = dev_config(vec![
            declare("A", true),
            declare("B", true),
            declare("C", true),
        ]);
        let sequencer = Sequencer::new(&registry, &dev);
        let result = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());

        assert!(result.is_ok(), "errors: {:?}", result.errors);
        assert_eq!(result.enabled_order(), vec!["A", "B", "C"]);
    }

    #[test]
    fn cycle_is_reported_and_no_resolutions_emitted() {
        let registry = registry_with(vec![
            StubModule {
                name: "A",
                deps: vec!["B".to_string()],
                release_status: ReleaseStatus::Ga,
            },
            StubModule {
                name: "B",
                deps: vec!["A".to_string()],
                release_status: ReleaseStatus::Ga,
            },
        ]);
        let dev = dev_config(vec![declare("A", true), declare("B", true)]);
        let sequencer = Sequencer::new(&registry, &dev);
        let result = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());

        assert!(result.resolutions.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains('A') && result.errors[0].contains('B'));
    }

    #[test]
    fn required_dominates_user_disable() {
        let registry = registry_with(vec![StubModule {
            name: "A",
            deps: vec![],
            release_status: ReleaseStatus::Ga,
        }]);
        let dev = dev_config(vec![declare("A", true)]);
        let mut user = UserConfig::default();
        user.disabled_modules.push("A".to_string());

        let sequencer = Sequencer::new(&registry, &dev);
        let result = sequencer.resolve(&user, &CliOverrides::default());

        assert!(result.is_ok());
        assert_eq!(result.resolutions[0].state, ModuleState::Enabled);
    }

    #[test]
    fn missing_dependency_is_reported() {
        let registry = registry_with(vec![StubModule {
            name: "A",
            deps: vec!["Z".to_string()],
            release_status: ReleaseStatus::Ga,
        }]);
        let dev = dev_config(vec![declare("A", true)]);
        let sequencer = Sequencer::new(&registry, &dev);
        let result = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());

        assert!(result.resolutions.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains('A') && result.errors[0].contains('Z'));
    }

    #[test]
    fn cli_dominates_required_disable_of_non_required() {
        let registry = registry_with(vec![StubModule {
            name: "A",
            deps: vec![],
            release_status: ReleaseStatus::Ga,
        }]);
        let dev = dev_config(vec![declare("A", false)]);
        let mut cli = CliOverrides::default();
        cli.insert("A".to_string(), false);

        let sequencer = Sequencer::new(&registry, &dev);
        let result = sequencer.resolve(&UserConfig::default(), &cli);

        assert_eq!(result.resolutions[0].state, ModuleState::Disabled);
    }

    #[test]
    fn determinism_across_identical_inputs() {
        let registry = registry_with(vec![
            StubModule {
                name: "A",
                deps: vec![],
                release_status: ReleaseStatus::Ga,
            },
            StubModule {
                name: "B",
                deps: vec![],
                release_status: ReleaseStatus::Ga,
            },
            StubModule {
                name: "C",
                deps: vec!["A".to_string(), "B".to_string()],
                release_status: ReleaseStatus::Ga,
            },
        ]);
        let dev = dev_config(vec![
            declare("C", true),
            declare("A", true),
            declare("B", true),
        ]);
        let sequencer = Sequencer::new(&registry, &dev);
        let first = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());
        let second = sequencer.resolve(&UserConfig::default(), &CliOverrides::default());

        assert_eq!(first.enabled_order(), second.enabled_order());
        // A and B are both eligible first; lexicographic tie-break prefers A.
        assert_eq!(first.enabled_order(), vec!["A", "B", "C"]);
    }

    #[test]
    fn disabled_dependency_demotes_dependent_to_failed() {
        let registry = registry_with(vec![
            StubModule {
                name: "A",
                deps: vec![],
                release_status: ReleaseStatus::Ga,
            },
            StubModule {
                name: "B",
                deps: vec!["A".to_string()],
                release_status: ReleaseStatus::Ga,
            },
        ]);
        let dev = dev_config(vec![declare("A", false), declare("B", false)]);
        let mut user = UserConfig::default();
        user.disabled_modules.push("A".to_string());

        let sequencer = Sequencer::new(&registry, &dev);
        let result = sequencer.resolve(&user, &CliOverrides::default());

        let b = result.resolutions.iter().find(|r| r.name == "B").unwrap();
        assert_eq!(b.state, ModuleState::Failed);
        assert!(b.error_message.is_some());
    }

    #[test]
    fn upper_snake_conversion_matches_expected_forms() {
        assert_eq!(to_upper_snake("DirectoryConfig"), "DIRECTORY_CONFIG");
        assert_eq!(to_upper_snake("content-type"), "CONTENT_TYPE");
        assert_eq!(to_upper_snake("A"), "A");
    }
}
