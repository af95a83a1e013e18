//! Project Model: the typed node tree, build-path resolution, `$(VAR)`
//! lookup chain and target/configuration selection described in spec.md
//! §3 and §4.5.
//!
//! Back-edges (`parent`, `project`) are relations, not ownership: nodes
//! live in a single arena and are addressed by a stable `NodeId` index, per
//! the Design Notes in spec.md §9. Grounded on
//! `original_source/PBXProject/PBXProject.h`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::linter::{LinterSource, SourceTextFile, TargetType};
use crate::xcconfig::XcconfigFile;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId(pub usize);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ConfigId(pub usize);

/// The symbolic root name a node's `path` is relative to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SourceTree {
  Absolute,
  Group,
  Variable(String),
}

impl SourceTree {
  pub fn parse(s: &str) -> Self {
    match s {
      "<absolute>" => SourceTree::Absolute,
      "<group>" => SourceTree::Group,
      other => SourceTree::Variable(other.to_string()),
    }
  }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
  FileReference { name: Option<String> },
  Group { children: Vec<NodeId> },
  VariantGroup { children: Vec<NodeId> },
  VersionGroup { children: Vec<NodeId>, current_version: Option<NodeId> },
  Project,
}

#[derive(Clone, Debug)]
pub struct NodeData {
  pub path: Option<String>,
  pub source_tree: SourceTree,
  pub parent: Option<NodeId>,
  pub project: Option<NodeId>,
  pub kind: NodeKind,
}

impl NodeData {
  pub fn is_group_like(&self) -> bool {
    matches!(
      self.kind,
      NodeKind::Group { .. } | NodeKind::VariantGroup { .. } | NodeKind::VersionGroup { .. }
    )
  }

  pub fn is_leaf(&self) -> bool {
    matches!(self.kind, NodeKind::FileReference { .. })
  }
}

#[derive(Clone, Debug)]
pub enum SettingValue {
  Scalar(String),
  List(Vec<String>),
}

impl SettingValue {
  pub fn as_list(&self) -> Vec<String> {
    match self {
      SettingValue::Scalar(s) => vec![s.clone()],
      SettingValue::List(v) => v.clone(),
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct BuildConfiguration {
  pub name: String,
  pub build_settings: IndexMap<String, SettingValue>,
  pub base_configuration_reference: Option<NodeId>,
  pub base_configuration: XcconfigFile,
  pub parent: Option<ConfigId>,
}

#[derive(Clone, Debug)]
pub enum BuildPhase {
  Sources(Vec<NodeId>),
  Resources(Vec<NodeId>),
  Other,
}

#[derive(Clone, Debug)]
pub struct NativeTarget {
  pub name: String,
  pub build_phases: Vec<BuildPhase>,
  pub configurations: IndexMap<String, ConfigId>,
}

impl NativeTarget {
  pub fn configuration_names(&self) -> Vec<&str> {
    self.configurations.keys().map(String::as_str).collect()
  }

  pub fn resource_file_refs(&self) -> Vec<NodeId> {
    self
      .build_phases
      .iter()
      .filter_map(|p| match p {
        BuildPhase::Resources(files) => Some(files.clone()),
        _ => None,
      })
      .flatten()
      .collect()
  }

  pub fn source_file_refs(&self) -> Vec<NodeId> {
    self
      .build_phases
      .iter()
      .filter_map(|p| match p {
        BuildPhase::Sources(files) => Some(files.clone()),
        _ => None,
      })
      .flatten()
      .collect()
  }
}

/// The typed, immutable project tree plus everything needed to resolve
/// build paths and configuration values against a chosen target.
pub struct ProjectModel {
  pub nodes: Vec<NodeData>,
  pub configs: Vec<BuildConfiguration>,
  pub root: NodeId,
  pub main_group: NodeId,
  pub project_configurations: IndexMap<String, ConfigId>,
  pub targets: Vec<NativeTarget>,
  pub known_regions: Vec<String>,
  pub project_path: PathBuf,
  pub project_name: String,

  /// Warnings produced while unarchiving (unknown classes / unknown
  /// property keys); never fatal.
  pub unarchiver_warnings: Vec<String>,
  /// Config-file errors produced while resolving base configurations.
  pub config_errors: Vec<crate::error::ConfigError>,

  prepared: Option<Prepared>,
}

struct Prepared {
  environment: IndexMap<String, String>,
  target_index: usize,
  configuration_name: String,
}

impl ProjectModel {
  /// Constructs a model from the unarchiver's output; `prepared` starts
  /// unset until [`ProjectModel::prepare`] selects a target/configuration.
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    nodes: Vec<NodeData>,
    configs: Vec<BuildConfiguration>,
    root: NodeId,
    main_group: NodeId,
    project_configurations: IndexMap<String, ConfigId>,
    targets: Vec<NativeTarget>,
    known_regions: Vec<String>,
    project_path: PathBuf,
    project_name: String,
    unarchiver_warnings: Vec<String>,
    config_errors: Vec<crate::error::ConfigError>,
  ) -> Self {
    ProjectModel {
      nodes,
      configs,
      root,
      main_group,
      project_configurations,
      targets,
      known_regions,
      project_path,
      project_name,
      unarchiver_warnings,
      config_errors,
      prepared: None,
    }
  }

  pub fn node(&self, id: NodeId) -> &NodeData {
    &self.nodes[id.0]
  }

  pub fn config(&self, id: ConfigId) -> &BuildConfiguration {
    &self.configs[id.0]
  }

  pub fn source_root(&self) -> String {
    self
      .project_path
      .parent()
      .map(|p| p.to_string_lossy().into_owned())
      .unwrap_or_default()
  }

  pub fn project_path(&self) -> String {
    self.project_path.to_string_lossy().into_owned()
  }

  pub fn project_name(&self) -> &str {
    &self.project_name
  }

  pub fn native_targets(&self) -> &[NativeTarget] {
    &self.targets
  }

  pub fn native_target_named(&self, name: &str) -> Option<&NativeTarget> {
    self.targets.iter().find(|t| t.name == name)
  }

  pub fn configuration_names(&self) -> Vec<&str> {
    self.project_configurations.keys().map(String::as_str).collect()
  }

  pub fn configuration_named(&self, name: &str) -> Option<ConfigId> {
    self.project_configurations.get(name).copied()
  }

  /// Stores the environment dictionary and the selected target/configuration
  /// for subsequent `lookup`/`build_path`/`bundle_resources` calls.
  pub fn prepare(&mut self, environment: IndexMap<String, String>, target_name: &str, configuration_name: &str) -> bool {
    let target_index = match self.targets.iter().position(|t| t.name == target_name) {
      Some(i) => i,
      None => return false,
    };
    self.prepared = Some(Prepared {
      environment,
      target_index,
      configuration_name: configuration_name.to_string(),
    });
    true
  }

  fn prepared(&self) -> &Prepared {
    self.prepared.as_ref().expect("ProjectModel::prepare must be called first")
  }

  fn target_configuration(&self) -> Option<ConfigId> {
    let p = self.prepared();
    self.targets[p.target_index].configurations.get(&p.configuration_name).copied()
  }

  /// Resolves `$(VAR)` (and the one-argument `$VAR` form) chains with
  /// cycle detection: a cycle resolves to `""` for the offending name.
  /// Lookup order: configuration → base config → parent chain →
  /// environment → built-ins.
  pub fn lookup(&self, name: &str) -> (String, Vec<String>) {
    let mut warnings = Vec::new();
    let mut visited = HashSet::new();
    let value = self.lookup_inner(name, &mut visited, &mut warnings);
    (value, warnings)
  }

  fn lookup_inner(&self, name: &str, visited: &mut HashSet<String>, warnings: &mut Vec<String>) -> String {
    if !visited.insert(name.to_string()) {
      warnings.push(format!("cycle detected while resolving $({})", name));
      return String::new();
    }

    let raw = self.raw_lookup(name);
    let expanded = match raw {
      Some(raw) => self.expand(&raw, visited, warnings),
      None => {
        warnings.push(format!("unknown variable $({})", name));
        String::new()
      }
    };

    visited.remove(name);
    expanded
  }

  fn raw_lookup(&self, name: &str) -> Option<String> {
    if let Some(cfg_id) = self.target_configuration() {
      if let Some(v) = self.raw_lookup_in_chain(cfg_id, name) {
        return Some(v);
      }
    }

    let p = self.prepared();
    if let Some(v) = p.environment.get(name) {
      return Some(v.clone());
    }

    self.builtin(name)
  }

  fn raw_lookup_in_chain(&self, cfg_id: ConfigId, name: &str) -> Option<String> {
    let cfg = self.config(cfg_id);

    if let Some(v) = cfg.build_settings.get(name) {
      return Some(join_setting(v, cfg, name, self));
    }
    if let Some(raw) = cfg.base_configuration.get(name) {
      return Some(raw.text.clone());
    }
    if let Some(parent) = cfg.parent {
      return self.raw_lookup_in_chain(parent, name);
    }
    None
  }

  fn builtin(&self, name: &str) -> Option<String> {
    let p = self.prepared();
    match name {
      "SOURCE_ROOT" | "SRCROOT" => Some(self.source_root()),
      "PROJECT_DIR" => Some(self.source_root()),
      "PROJECT_NAME" => Some(self.project_name.clone()),
      "TARGET_NAME" => Some(self.targets[p.target_index].name.clone()),
      "CONFIGURATION" => Some(p.configuration_name.clone()),
      _ => None,
    }
  }

  fn expand(&self, raw: &str, visited: &mut HashSet<String>, warnings: &mut Vec<String>) -> String {
    let mut out = String::new();
    let bytes = raw.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
      if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'(') {
        if let Some(close) = raw[i + 2..].find(')') {
          let inner = &raw[i + 2..i + 2 + close];
          let name = inner.split(':').next().unwrap_or(inner);
          if name == "inherited" {
            out.push_str(&self.resolve_inherited(visited, warnings));
          } else {
            out.push_str(&self.lookup_inner(name, visited, warnings));
          }
          i = i + 2 + close + 1;
          continue;
        }
      } else if bytes[i] == b'$' && bytes.get(i + 1).map_or(false, |c| c.is_ascii_alphabetic() || *c == b'_') {
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
          end += 1;
        }
        out.push_str(&self.lookup_inner(&raw[start..end], visited, warnings));
        i = end;
        continue;
      }

      let ch = raw[i..].chars().next().unwrap();
      out.push(ch);
      i += ch.len_utf8();
    }

    out
  }

  /// `$(inherited)` splices the parent configuration's resolved value for
  /// whichever key is currently being expanded; resolved conservatively by
  /// re-running the parent's chain for the same name at the top of the
  /// visited set.
  fn resolve_inherited(&self, visited: &HashSet<String>, warnings: &mut Vec<String>) -> String {
    let name = match visited.iter().next() {
      Some(n) => n.clone(),
      None => return String::new(),
    };
    let cfg_id = match self.target_configuration() {
      Some(c) => c,
      None => return String::new(),
    };
    let parent = match self.config(cfg_id).parent {
      Some(p) => p,
      None => return String::new(),
    };
    let mut local_visited = HashSet::new();
    self
      .raw_lookup_in_chain(parent, &name)
      .map(|raw| self.expand(&raw, &mut local_visited, warnings))
      .unwrap_or_default()
  }

  pub fn path_for_source_tree(&self, tree: &SourceTree) -> String {
    match tree {
      SourceTree::Absolute => String::new(),
      SourceTree::Group => String::new(),
      SourceTree::Variable(name) => self.lookup(name).0,
    }
  }

  /// Resolves `node`'s on-disk path by walking up to the nearest ancestor
  /// with an absolute source tree, concatenating path segments.
  pub fn build_path(&self, id: NodeId) -> String {
    let node = self.node(id);
    match &node.source_tree {
      SourceTree::Absolute => node.path.clone().unwrap_or_default(),
      SourceTree::Group => {
        let parent_path = match node.parent {
          Some(p) => self.build_path(p),
          None => String::new(),
        };
        match &node.path {
          Some(p) => crate::strutil::relative_path(p, &parent_path),
          None => parent_path,
        }
      }
      SourceTree::Variable(name) => {
        let base = self.lookup(name).0;
        match &node.path {
          Some(p) => crate::strutil::relative_path(p, &base),
          None => base,
        }
      }
    }
  }

  /// Returns `true` when the on-disk target of `id` is a directory (a
  /// "folder reference").
  pub fn is_folder_reference(&self, id: NodeId) -> bool {
    std::fs::metadata(self.build_path(id)).map(|m| m.is_dir()).unwrap_or(false)
  }

  /// Walks every `PBXResourcesBuildPhase` file reference reachable from
  /// the prepared target, producing the `bundlePath -> buildPath` index
  /// described in spec.md §3/§4.5.
  pub fn bundle_resources(&self) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    let target = &self.targets[self.prepared().target_index];

    for file_ref in target.resource_file_refs() {
      self.collect_bundle_resources(file_ref, None, &mut out);
    }

    out
  }

  fn collect_bundle_resources(&self, id: NodeId, bundle_prefix: Option<&str>, out: &mut IndexMap<String, String>) {
    let node = self.node(id);

    match &node.kind {
      NodeKind::VariantGroup { children } => {
        let base_name = node.path.as_deref().unwrap_or("").to_string();
        for &child in children {
          let child_node = self.node(child);
          let region = child_node.path.clone().unwrap_or_default();
          let region = region_name(&child_node, &region);
          let bundle_path = with_prefix(bundle_prefix, &format!("{}.lproj/{}", region, base_name));
          out.insert(bundle_path, self.build_path(child));
        }
      }
      NodeKind::VersionGroup { current_version, .. } => {
        if let Some(cv) = current_version {
          let own_name = basename(node.path.as_deref().unwrap_or(""));
          let prefix = with_prefix(bundle_prefix, &own_name);
          self.collect_bundle_resources(*cv, Some(&prefix), out);
        }
      }
      NodeKind::FileReference { .. } => {
        if self.is_folder_reference(id) {
          let own_name = basename(node.path.as_deref().unwrap_or(""));
          let prefix = with_prefix(bundle_prefix, &own_name);
          self.collect_folder_contents(&self.build_path(id), &prefix, out);
        } else {
          let own_name = basename(node.path.as_deref().unwrap_or(""));
          let bundle_path = with_prefix(bundle_prefix, &own_name);
          out.insert(bundle_path, self.build_path(id));
        }
      }
      NodeKind::Group { .. } | NodeKind::Project => {}
    }
  }

  fn collect_folder_contents(&self, dir: &str, bundle_prefix: &str, out: &mut IndexMap<String, String>) {
    let entries = match std::fs::read_dir(dir) {
      Ok(e) => e,
      Err(_) => return,
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
      let name = path.file_name().unwrap().to_string_lossy().into_owned();
      let bundle_path = format!("{}/{}", bundle_prefix, name);
      if path.is_dir() {
        self.collect_folder_contents(&path.to_string_lossy(), &bundle_path, out);
      } else {
        out.insert(bundle_path, path.to_string_lossy().into_owned());
      }
    }
  }
}

impl ProjectModel {
  /// `ResourceLinterSourceTargetTypeIOS` when the prepared configuration's
  /// `SDKROOT` names an iphoneos SDK, `Unknown` otherwise.
  pub fn target_type(&self) -> TargetType {
    if self.lookup("SDKROOT").0.to_lowercase().contains("iphoneos") {
      TargetType::IOS
    } else {
      TargetType::Unknown
    }
  }

  pub fn deployment_target(&self) -> String {
    self.lookup("IPHONEOS_DEPLOYMENT_TARGET").0
  }

  /// Reads every file reachable from the prepared target's Sources build
  /// phase into a [`SourceTextFile`], plus `extra_config_path` (the CLI's
  /// `--config` override) as the default-config text file. Unreadable
  /// files are skipped with a warning rather than failing the whole load,
  /// matching the rest of the unarchiver's tolerance for a partial tree.
  pub fn build_linter_source(&self, extra_config_path: Option<&Path>) -> ModelLinterSource<'_> {
    let target = &self.targets[self.prepared().target_index];
    let mut source_text_files = Vec::new();

    for id in target.source_file_refs() {
      let build_path = self.build_path(id);
      match std::fs::read_to_string(&build_path) {
        Ok(content) => source_text_files.push(SourceTextFile { name: build_path, content }),
        Err(e) => tracing::warn!(path = %build_path, "could not read source file: {}", e),
      }
    }
    source_text_files.sort_by(|a, b| a.name.cmp(&b.name));

    let default_config_text_file = extra_config_path.and_then(|p| {
      let name = p.to_string_lossy().into_owned();
      match std::fs::read_to_string(p) {
        Ok(content) => Some(SourceTextFile { name, content }),
        Err(e) => {
          tracing::warn!(path = %name, "could not read --config override: {}", e);
          None
        }
      }
    });

    ModelLinterSource {
      model: self,
      source_text_files,
      resources: self.bundle_resources(),
      default_config_text_file,
      project_path: self.project_path(),
      source_root: self.source_root(),
      deployment_target: self.deployment_target(),
    }
  }
}

/// Owns the data a [`ProjectModel`] cannot hand out by reference alone (the
/// on-disk source text, the bundle index and a few derived strings are
/// computed, not stored), and implements [`LinterSource`] over it.
pub struct ModelLinterSource<'a> {
  model: &'a ProjectModel,
  source_text_files: Vec<SourceTextFile>,
  resources: IndexMap<String, String>,
  default_config_text_file: Option<SourceTextFile>,
  project_path: String,
  source_root: String,
  deployment_target: String,
}

impl<'a> LinterSource for ModelLinterSource<'a> {
  fn source_text_files(&self) -> &[SourceTextFile] {
    &self.source_text_files
  }

  fn resources(&self) -> &IndexMap<String, String> {
    &self.resources
  }

  fn lint_warnings(&self) -> &[String] {
    &self.model.unarchiver_warnings
  }

  fn lint_errors(&self) -> &[String] {
    &[]
  }

  fn project_name(&self) -> &str {
    self.model.project_name()
  }

  fn project_path(&self) -> &str {
    &self.project_path
  }

  fn source_root(&self) -> &str {
    &self.source_root
  }

  fn target_name(&self) -> &str {
    &self.model.targets[self.model.prepared().target_index].name
  }

  fn configuration_name(&self) -> &str {
    &self.model.prepared().configuration_name
  }

  fn known_regions(&self) -> &[String] {
    &self.model.known_regions
  }

  fn target_type(&self) -> TargetType {
    self.model.target_type()
  }

  fn deployment_target(&self) -> &str {
    &self.deployment_target
  }

  fn default_config_text_file(&self) -> Option<&SourceTextFile> {
    self.default_config_text_file.as_ref()
  }
}

fn region_name(node: &NodeData, path: &str) -> String {
  let _ = node;
  basename(path)
}

fn basename(path: &str) -> String {
  Path::new(path).file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string())
}

fn with_prefix(prefix: Option<&str>, name: &str) -> String {
  match prefix {
    Some(p) if !p.is_empty() => format!("{}/{}", p, name),
    _ => name.to_string(),
  }
}

fn join_setting(value: &SettingValue, cfg: &BuildConfiguration, name: &str, model: &ProjectModel) -> String {
  match value {
    SettingValue::Scalar(s) => s.clone(),
    SettingValue::List(items) => {
      let mut parts = Vec::new();
      for item in items {
        if item == "$(inherited)" {
          if let Some(parent) = cfg.parent {
            if let Some(v) = model.raw_lookup_in_chain(parent, name) {
              parts.push(v);
              continue;
            }
          }
        }
        parts.push(item.clone());
      }
      parts.join(" ")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_model() -> ProjectModel {
    ProjectModel {
      nodes: vec![NodeData {
        path: None,
        source_tree: SourceTree::Group,
        parent: None,
        project: None,
        kind: NodeKind::Project,
      }],
      configs: Vec::new(),
      root: NodeId(0),
      main_group: NodeId(0),
      project_configurations: IndexMap::new(),
      targets: Vec::new(),
      known_regions: Vec::new(),
      project_path: PathBuf::from("/tmp/Demo.xcodeproj"),
      project_name: "Demo".to_string(),
      unarchiver_warnings: Vec::new(),
      config_errors: Vec::new(),
      prepared: None,
    }
  }

  fn push_config(model: &mut ProjectModel, name: &str, settings: Vec<(&str, SettingValue)>, parent: Option<ConfigId>) -> ConfigId {
    let mut build_settings = IndexMap::new();
    for (k, v) in settings {
      build_settings.insert(k.to_string(), v);
    }
    model.configs.push(BuildConfiguration {
      name: name.to_string(),
      build_settings,
      base_configuration_reference: None,
      base_configuration: XcconfigFile::default(),
      parent,
    });
    ConfigId(model.configs.len() - 1)
  }

  #[test]
  fn expands_simple_variable() {
    let mut model = base_model();
    let cfg = push_config(
      &mut model,
      "Debug",
      vec![
        ("FOO", SettingValue::Scalar("a$(BAR)c".to_string())),
        ("BAR", SettingValue::Scalar("b".to_string())),
      ],
      None,
    );
    model.targets.push(NativeTarget {
      name: "App".to_string(),
      build_phases: Vec::new(),
      configurations: {
        let mut m = IndexMap::new();
        m.insert("Debug".to_string(), cfg);
        m
      },
    });
    model.prepare(IndexMap::new(), "App", "Debug");

    assert_eq!(model.lookup("FOO").0, "abc");
  }

  #[test]
  fn cycle_yields_empty_with_warning() {
    let mut model = base_model();
    let cfg = push_config(
      &mut model,
      "Debug",
      vec![
        ("FOO", SettingValue::Scalar("a$(BAR)c".to_string())),
        ("BAR", SettingValue::Scalar("$(FOO)".to_string())),
      ],
      None,
    );
    model.targets.push(NativeTarget {
      name: "App".to_string(),
      build_phases: Vec::new(),
      configurations: {
        let mut m = IndexMap::new();
        m.insert("Debug".to_string(), cfg);
        m
      },
    });
    model.prepare(IndexMap::new(), "App", "Debug");

    let (value, warnings) = model.lookup("FOO");
    assert_eq!(value, "ac");
    assert!(!warnings.is_empty());
  }

  #[test]
  fn group_rooted_path_bottoms_out_at_source_root() {
    let mut model = base_model();
    model.nodes[0].source_tree = SourceTree::Variable("SOURCE_ROOT".to_string());
    model.nodes[0].project = Some(NodeId(0));

    model.nodes.push(NodeData {
      path: Some("Resources".to_string()),
      source_tree: SourceTree::Group,
      parent: Some(NodeId(0)),
      project: Some(NodeId(0)),
      kind: NodeKind::Group { children: Vec::new() },
    });
    let group_id = NodeId(model.nodes.len() - 1);

    model.nodes.push(NodeData {
      path: Some("icon.png".to_string()),
      source_tree: SourceTree::Group,
      parent: Some(group_id),
      project: Some(NodeId(0)),
      kind: NodeKind::FileReference { name: None },
    });
    let file_id = NodeId(model.nodes.len() - 1);

    let cfg = push_config(&mut model, "Debug", vec![], None);
    model.targets.push(NativeTarget {
      name: "App".to_string(),
      build_phases: Vec::new(),
      configurations: {
        let mut m = IndexMap::new();
        m.insert("Debug".to_string(), cfg);
        m
      },
    });
    model.prepare(IndexMap::new(), "App", "Debug");

    assert_eq!(model.build_path(NodeId(0)), "/tmp");
    assert_eq!(model.build_path(group_id), "/tmp/Resources");
    assert_eq!(model.build_path(file_id), "/tmp/Resources/icon.png");
  }

  #[test]
  fn unknown_variable_expands_empty_with_warning() {
    let mut model = base_model();
    let cfg = push_config(&mut model, "Debug", vec![], None);
    model.targets.push(NativeTarget {
      name: "App".to_string(),
      build_phases: Vec::new(),
      configurations: {
        let mut m = IndexMap::new();
        m.insert("Debug".to_string(), cfg);
        m
      },
    });
    model.prepare(IndexMap::new(), "App", "Debug");

    let (value, warnings) = model.lookup("NOPE");
    assert_eq!(value, "");
    assert_eq!(warnings.len(), 1);
  }
}
