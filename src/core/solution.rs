//! The workspace arena: projects, configurations, and solutions.
//!
//! Projects and configurations reference each other by index ([`ProjectId`],
//! [`ConfId`]) rather than by pointer, so dependency graphs are plain data.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::configuration::Configuration;
use crate::core::project::Project;
use crate::core::target::Target;

/// Index of a project in a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProjectId(pub usize);

/// Index of a configuration in a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConfId(pub usize);

impl fmt::Display for ConfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A solution: a set of projects generated into one master file.
#[derive(Debug, Clone)]
pub struct Solution {
    pub name: String,
    /// Master file path without extension
    pub master_bff: PathBuf,
    /// This solution's own entry file, without extension
    pub bff_path: PathBuf,
    pub projects: Vec<ProjectId>,
    /// Projects built by default
    pub build: BTreeSet<ProjectId>,
    pub all_configs_section: bool,
}

/// Every project, configuration and solution of one description file.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    /// Directory of the description file
    pub root: PathBuf,
    projects: Vec<Project>,
    configurations: Vec<Configuration>,
    solutions: Vec<Solution>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Workspace {
            root: root.into(),
            ..Workspace::default()
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn project(&self, id: ProjectId) -> &Project {
        &self.projects[id.0]
    }

    pub fn project_mut(&mut self, id: ProjectId) -> &mut Project {
        &mut self.projects[id.0]
    }

    pub fn conf(&self, id: ConfId) -> &Configuration {
        &self.configurations[id.0]
    }

    pub fn conf_mut(&mut self, id: ConfId) -> &mut Configuration {
        &mut self.configurations[id.0]
    }

    /// Project owning a configuration.
    pub fn project_of(&self, id: ConfId) -> &Project {
        self.project(self.conf(id).project)
    }

    pub fn find_project(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Add a project rooted at `root`.
    pub fn add_project(&mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> ProjectId {
        let id = ProjectId(self.projects.len());
        self.projects.push(Project::new(id, name, root));
        id
    }

    /// Add a configuration to `project` and return it for further setup.
    pub fn add_configuration(
        &mut self,
        project: ProjectId,
        name: impl Into<String>,
        target: Target,
    ) -> &mut Configuration {
        let id = ConfId(self.configurations.len());
        self.configurations
            .push(Configuration::new(id, project, name, target));
        self.projects[project.0].configurations.push(id);
        &mut self.configurations[id.0]
    }

    pub fn add_solution(&mut self, solution: Solution) {
        self.solutions.push(solution);
    }

    /// Human-readable identity of a configuration: `Project|Conf|platform`.
    pub fn conf_label(&self, id: ConfId) -> String {
        let conf = self.conf(id);
        format!(
            "{}|{}|{}",
            self.project(conf.project).name,
            conf.name,
            conf.target.platform
        )
    }

    /// Fill every configuration's resolved dependency set with the transitive
    /// closure of its direct dependencies. Cycles terminate; they are reported
    /// by the dependency orderer.
    pub fn resolve_dependencies(&mut self) {
        let closures: Vec<BTreeSet<ConfId>> = self
            .configurations
            .iter()
            .map(|conf| {
                let mut seen = BTreeSet::new();
                let mut stack: Vec<ConfId> = conf.dependencies.clone();
                while let Some(dep) = stack.pop() {
                    if seen.insert(dep) {
                        stack.extend(self.configurations[dep.0].dependencies.iter().copied());
                    }
                }
                seen
            })
            .collect();

        for (conf, closure) in self.configurations.iter_mut().zip(closures) {
            conf.resolved_dependencies = closure;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::Platform;

    #[test]
    fn test_add_and_label() {
        let mut ws = Workspace::new("/ws");
        let core = ws.add_project("Core", "/ws/core");
        let conf = ws.add_configuration(core, "Debug", Target::default()).id;

        assert_eq!(ws.project(core).configurations, vec![conf]);
        assert_eq!(ws.conf_label(conf), "Core|Debug|win64");
        assert_eq!(ws.project_of(conf).name, "Core");
        assert!(ws.find_project("Core").is_some());
        assert!(ws.find_project("Missing").is_none());
    }

    #[test]
    fn test_resolved_dependencies_are_transitive() {
        let mut ws = Workspace::new("/ws");
        let target = Target {
            platform: Platform::LINUX,
            ..Target::default()
        };
        let a = ws.add_project("A", "/ws/a");
        let b = ws.add_project("B", "/ws/b");
        let c = ws.add_project("C", "/ws/c");
        let ca = ws.add_configuration(a, "Debug", target).id;
        let cb = ws.add_configuration(b, "Debug", target).id;
        let cc = ws.add_configuration(c, "Debug", target).id;
        ws.conf_mut(ca).dependencies.push(cb);
        ws.conf_mut(cb).dependencies.push(cc);

        ws.resolve_dependencies();

        let resolved: Vec<_> = ws.conf(ca).resolved_dependencies.iter().copied().collect();
        assert_eq!(resolved, vec![cb, cc]);
        assert!(ws.conf(cc).resolved_dependencies.is_empty());
    }

    #[test]
    fn test_resolve_terminates_on_cycle() {
        let mut ws = Workspace::new("/ws");
        let x = ws.add_project("X", "/ws/x");
        let y = ws.add_project("Y", "/ws/y");
        let cx = ws.add_configuration(x, "Debug", Target::default()).id;
        let cy = ws.add_configuration(y, "Debug", Target::default()).id;
        ws.conf_mut(cx).dependencies.push(cy);
        ws.conf_mut(cy).dependencies.push(cx);

        ws.resolve_dependencies();
        assert!(ws.conf(cx).resolved_dependencies.contains(&cx));
    }
}
