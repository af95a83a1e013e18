//! Two-pass unarchiver turning a decoded `project.pbxproj` [`plist::Value`]
//! into a [`ProjectModel`], per spec.md §4.4.
//!
//! Pass 1 (`instantiate`) walks the `objects` dictionary starting at
//! `rootObject`, reifying each object by its `isa` class against an
//! explicit per-class schema; unknown `isa` values produce a warning and a
//! skipped object rather than a fatal error. Pass 2 (`fixup`) walks the
//! reified tree from the project's `mainGroup`, assigning the `parent`/
//! `project` back-edges that pass 1 cannot set (a node is built before its
//! parent is known), links each target's per-configuration
//! `BuildConfiguration.parent` to the project-level configuration of the
//! same name, and resolves `baseConfigurationReference` files.
//!
//! Grounded on `original_source/PBXProject/PBXProject.h`'s `PBXUnarchiver`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{RespectResult, StructuralError};
use crate::model::{
  BuildConfiguration, BuildPhase, NativeTarget, NodeData, NodeId, NodeKind, ConfigId, ProjectModel, SettingValue,
  SourceTree,
};
use crate::plist::Value;

const KNOWN_GROUP_CLASSES: &[&str] = &["PBXGroup"];
const KNOWN_VARIANT_GROUP_CLASSES: &[&str] = &["PBXVariantGroup"];
const KNOWN_VERSION_GROUP_CLASSES: &[&str] = &["XCVersionGroup"];
const KNOWN_FILE_REFERENCE_CLASSES: &[&str] = &["PBXFileReference"];
const SOURCES_PHASE_CLASS: &str = "PBXSourcesBuildPhase";
const RESOURCES_PHASE_CLASS: &str = "PBXResourcesBuildPhase";

pub fn unarchive(root: &Value, project_path: &Path) -> RespectResult<ProjectModel> {
  let top = root.as_dict().ok_or(StructuralError::MissingRootObject)?;
  let objects = top
    .get("objects")
    .and_then(Value::as_dict)
    .ok_or(StructuralError::MissingRootObject)?;
  let root_oid = top
    .get("rootObject")
    .and_then(Value::as_str)
    .ok_or(StructuralError::MissingRootObject)?;

  let mut builder = Builder {
    objects,
    node_memo: HashMap::new(),
    nodes: Vec::new(),
    configs: Vec::new(),
    warnings: Vec::new(),
    config_errors: Vec::new(),
  };

  let root_obj = builder.object(root_oid)?;
  let isa = builder.isa(root_obj, root_oid)?;
  if isa != "PBXProject" {
    return Err(StructuralError::RootObjectNotAProject(root_oid.to_string()));
  }

  let main_group_oid = builder.require_str(root_obj, root_oid, "mainGroup")?;
  let main_group = builder.instantiate_node(main_group_oid)?;

  // The synthetic root resolves like a file rooted at `SOURCE_ROOT`, so that
  // every `<group>`-rooted node under it bottoms its `build_path` out at the
  // project's source root instead of an empty string. It has no parent of
  // its own but is its own `project`, per I3.
  let project_index = builder.nodes.len();
  builder.nodes.push(NodeData {
    path: None,
    source_tree: SourceTree::Variable("SOURCE_ROOT".to_string()),
    parent: None,
    project: None,
    kind: NodeKind::Project,
  });
  let root_id = NodeId(project_index);
  builder.nodes[project_index].project = Some(root_id);

  let project_configurations = builder.instantiate_config_list_field(root_obj, root_oid)?;

  let known_regions = root_obj
    .get("knownRegions")
    .and_then(Value::as_array)
    .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
    .unwrap_or_default();

  let project_name = project_path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "Project".to_string());

  let mut targets = Vec::new();
  if let Some(target_oids) = root_obj.get("targets").and_then(Value::as_array) {
    for oid_val in target_oids {
      if let Some(oid) = oid_val.as_str() {
        match builder.instantiate_native_target(oid) {
          Ok(Some(target)) => targets.push(target),
          Ok(None) => {}
          Err(e) => return Err(e),
        }
      }
    }
  }

  fixup_tree(&mut builder.nodes, main_group, root_id, Some(root_id));
  link_configuration_parents(&mut builder.configs, &targets, &project_configurations);

  let source_root = project_path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
  resolve_base_configurations(&mut builder.nodes, &mut builder.configs, &source_root, &mut builder.config_errors);

  Ok(ProjectModel {
    nodes: builder.nodes,
    configs: builder.configs,
    root: root_id,
    main_group,
    project_configurations,
    targets,
    known_regions,
    project_path: project_path.to_path_buf(),
    project_name,
    unarchiver_warnings: builder.warnings,
    config_errors: builder.config_errors,
  })
}

struct Builder<'a> {
  objects: &'a IndexMap<String, Value>,
  node_memo: HashMap<String, NodeId>,
  nodes: Vec<NodeData>,
  configs: Vec<BuildConfiguration>,
  warnings: Vec<String>,
  config_errors: Vec<crate::error::ConfigError>,
}

impl<'a> Builder<'a> {
  fn object(&self, oid: &str) -> RespectResult<&'a IndexMap<String, Value>> {
    self
      .objects
      .get(oid)
      .and_then(Value::as_dict)
      .ok_or_else(|| StructuralError::UnresolvedObjectId(oid.to_string()))
  }

  fn isa<'b>(&self, obj: &'b IndexMap<String, Value>, oid: &str) -> RespectResult<&'b str> {
    obj
      .get("isa")
      .and_then(Value::as_str)
      .ok_or_else(|| StructuralError::MissingField(oid.to_string(), "isa"))
  }

  fn require_str<'b>(&self, obj: &'b IndexMap<String, Value>, oid: &str, key: &'static str) -> RespectResult<&'b str> {
    obj
      .get(key)
      .and_then(Value::as_str)
      .ok_or_else(|| StructuralError::MissingField(oid.to_string(), key))
  }

  fn str_field(&self, obj: &IndexMap<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
  }

  fn oid_array(&self, obj: &IndexMap<String, Value>, key: &str) -> Vec<String> {
    obj
      .get(key)
      .and_then(Value::as_array)
      .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
      .unwrap_or_default()
  }

  fn instantiate_node(&mut self, oid: &str) -> RespectResult<NodeId> {
    if let Some(&id) = self.node_memo.get(oid) {
      return Ok(id);
    }

    let obj = self.object(oid)?;
    let isa = self.isa(obj, oid)?.to_string();
    let path = self.str_field(obj, "path");
    let source_tree = self.str_field(obj, "sourceTree").map(|s| SourceTree::parse(&s)).unwrap_or(SourceTree::Group);

    let kind = if KNOWN_FILE_REFERENCE_CLASSES.contains(&isa.as_str()) {
      let name = self.str_field(obj, "name");
      NodeKind::FileReference { name }
    } else if KNOWN_GROUP_CLASSES.contains(&isa.as_str()) {
      let child_oids = self.oid_array(obj, "children");
      let id = self.reserve(path.clone(), source_tree.clone(), NodeKind::Group { children: Vec::new() });
      self.node_memo.insert(oid.to_string(), id);
      let children = self.instantiate_children(&child_oids)?;
      self.nodes[id.0].kind = NodeKind::Group { children };
      return Ok(id);
    } else if KNOWN_VARIANT_GROUP_CLASSES.contains(&isa.as_str()) {
      let child_oids = self.oid_array(obj, "children");
      let id = self.reserve(path.clone(), source_tree.clone(), NodeKind::VariantGroup { children: Vec::new() });
      self.node_memo.insert(oid.to_string(), id);
      let children = self.instantiate_children(&child_oids)?;
      self.nodes[id.0].kind = NodeKind::VariantGroup { children };
      return Ok(id);
    } else if KNOWN_VERSION_GROUP_CLASSES.contains(&isa.as_str()) {
      let child_oids = self.oid_array(obj, "children");
      let current_version_oid = self.str_field(obj, "currentVersion");
      let id = self.reserve(
        path.clone(),
        source_tree.clone(),
        NodeKind::VersionGroup { children: Vec::new(), current_version: None },
      );
      self.node_memo.insert(oid.to_string(), id);
      let children = self.instantiate_children(&child_oids)?;
      let current_version = match current_version_oid {
        Some(cv_oid) => Some(self.instantiate_node(&cv_oid)?),
        None => None,
      };
      self.nodes[id.0].kind = NodeKind::VersionGroup { children, current_version };
      return Ok(id);
    } else {
      self.warnings.push(format!("unknown object class {:?} for {:?}; treated as an opaque file reference", isa, oid));
      NodeKind::FileReference { name: None }
    };

    let id = self.reserve(path, source_tree, kind);
    self.node_memo.insert(oid.to_string(), id);
    Ok(id)
  }

  fn reserve(&mut self, path: Option<String>, source_tree: SourceTree, kind: NodeKind) -> NodeId {
    self.nodes.push(NodeData { path, source_tree, parent: None, project: None, kind });
    NodeId(self.nodes.len() - 1)
  }

  fn instantiate_children(&mut self, oids: &[String]) -> RespectResult<Vec<NodeId>> {
    oids.iter().map(|oid| self.instantiate_node(oid)).collect()
  }

  fn instantiate_config(&mut self, oid: &str) -> RespectResult<ConfigId> {
    let obj = self.object(oid)?;
    let isa = self.isa(obj, oid)?;
    if isa != "XCBuildConfiguration" {
      return Err(StructuralError::MissingField(oid.to_string(), "isa:XCBuildConfiguration"));
    }

    let name = self.require_str(obj, oid, "name")?.to_string();
    let mut build_settings = IndexMap::new();
    if let Some(dict) = obj.get("buildSettings").and_then(Value::as_dict) {
      for (k, v) in dict {
        let setting = match v {
          Value::String(s) => SettingValue::Scalar(s.clone()),
          Value::Array(items) => SettingValue::List(items.iter().filter_map(Value::as_str).map(str::to_string).collect()),
          Value::Dict(_) => {
            self.warnings.push(format!("unsupported nested buildSettings value for key {:?}", k));
            continue;
          }
        };
        build_settings.insert(k.clone(), setting);
      }
    }

    let base_configuration_reference = match self.str_field(obj, "baseConfigurationReference") {
      Some(ref_oid) => Some(self.instantiate_node(&ref_oid)?),
      None => None,
    };

    self.configs.push(BuildConfiguration {
      name,
      build_settings,
      base_configuration_reference,
      base_configuration: crate::xcconfig::XcconfigFile::default(),
      parent: None,
    });
    Ok(ConfigId(self.configs.len() - 1))
  }

  fn instantiate_config_list(&mut self, oid: &str) -> RespectResult<IndexMap<String, ConfigId>> {
    let obj = self.object(oid)?;
    let isa = self.isa(obj, oid)?;
    if isa != "XCConfigurationList" {
      return Err(StructuralError::MissingField(oid.to_string(), "isa:XCConfigurationList"));
    }

    let config_oids = self.oid_array(obj, "buildConfigurations");
    let mut out = IndexMap::new();
    for cfg_oid in config_oids {
      let cfg_id = self.instantiate_config(&cfg_oid)?;
      let cfg_name = self.configs[cfg_id.0].name.clone();
      out.insert(cfg_name, cfg_id);
    }
    Ok(out)
  }

  fn instantiate_config_list_field(&mut self, obj: &IndexMap<String, Value>, owner_oid: &str) -> RespectResult<IndexMap<String, ConfigId>> {
    match self.str_field(obj, "buildConfigurationList") {
      Some(oid) => self.instantiate_config_list(&oid),
      None => {
        self.warnings.push(format!("{:?} has no buildConfigurationList", owner_oid));
        Ok(IndexMap::new())
      }
    }
  }

  fn instantiate_native_target(&mut self, oid: &str) -> RespectResult<Option<NativeTarget>> {
    let obj = self.object(oid)?;
    let isa = self.isa(obj, oid)?.to_string();
    if isa != "PBXNativeTarget" {
      return Ok(None);
    }

    let name = self.require_str(obj, oid, "name")?.to_string();
    let configurations = self.instantiate_config_list_field(obj, oid)?;

    let phase_oids = self.oid_array(obj, "buildPhases");
    let mut build_phases = Vec::new();
    for phase_oid in phase_oids {
      if let Some(phase) = self.instantiate_build_phase(&phase_oid)? {
        build_phases.push(phase);
      }
    }

    Ok(Some(NativeTarget { name, build_phases, configurations }))
  }

  fn instantiate_build_phase(&mut self, oid: &str) -> RespectResult<Option<BuildPhase>> {
    let obj = self.object(oid)?;
    let isa = self.isa(obj, oid)?.to_string();

    let files_key_oids = self.oid_array(obj, "files");
    let file_refs = |this: &mut Self| -> RespectResult<Vec<NodeId>> {
      let mut out = Vec::new();
      for build_file_oid in &files_key_oids {
        if let Some(node) = this.resolve_build_file(build_file_oid)? {
          out.push(node);
        }
      }
      Ok(out)
    };

    match isa.as_str() {
      SOURCES_PHASE_CLASS => Ok(Some(BuildPhase::Sources(file_refs(self)?))),
      RESOURCES_PHASE_CLASS => Ok(Some(BuildPhase::Resources(file_refs(self)?))),
      _ => Ok(None),
    }
  }

  fn resolve_build_file(&mut self, oid: &str) -> RespectResult<Option<NodeId>> {
    let obj = self.object(oid)?;
    let isa = self.isa(obj, oid)?;
    if isa != "PBXBuildFile" {
      self.warnings.push(format!("expected PBXBuildFile at {:?}, found {:?}", oid, isa));
      return Ok(None);
    }
    match self.str_field(obj, "fileRef") {
      Some(file_oid) => Ok(Some(self.instantiate_node(&file_oid)?)),
      None => {
        self.warnings.push(format!("PBXBuildFile {:?} has no fileRef", oid));
        Ok(None)
      }
    }
  }
}

fn fixup_tree(nodes: &mut [NodeData], id: NodeId, project: NodeId, parent: Option<NodeId>) {
  nodes[id.0].parent = parent;
  nodes[id.0].project = Some(project);

  let children = match &nodes[id.0].kind {
    NodeKind::Group { children } | NodeKind::VariantGroup { children } => children.clone(),
    NodeKind::VersionGroup { children, .. } => children.clone(),
    NodeKind::FileReference { .. } | NodeKind::Project => Vec::new(),
  };

  for child in children {
    fixup_tree(nodes, child, project, Some(id));
  }
}

fn link_configuration_parents(
  configs: &mut [BuildConfiguration],
  targets: &[NativeTarget],
  project_configurations: &IndexMap<String, ConfigId>,
) {
  for target in targets {
    for (name, &cfg_id) in &target.configurations {
      if let Some(&parent_id) = project_configurations.get(name) {
        configs[cfg_id.0].parent = Some(parent_id);
      }
    }
  }
}

/// Parses each configuration's `baseConfigurationReference`, when present,
/// resolving its on-disk path using only the parent-chain path segments and
/// `SOURCE_ROOT`/`PROJECT_DIR` (the only variables guaranteed resolvable
/// before a target/configuration pair has been selected). A missing file
/// is a warning, never fatal, per spec.md §4.10.
fn resolve_base_configurations(
  nodes: &mut [NodeData],
  configs: &mut Vec<BuildConfiguration>,
  source_root: &Path,
  config_errors: &mut Vec<crate::error::ConfigError>,
) {
  for i in 0..configs.len() {
    let reference = configs[i].base_configuration_reference;
    let path = match reference {
      Some(node_id) => static_build_path(nodes, node_id, source_root),
      None => continue,
    };

    let (file, errors) = crate::xcconfig::parse_file(Path::new(&path), None);
    if !errors.is_empty() {
      config_errors.extend(errors);
    }
    configs[i].base_configuration = file;
  }
}

fn static_build_path(nodes: &[NodeData], id: NodeId, source_root: &Path) -> String {
  let node = &nodes[id.0];
  match &node.source_tree {
    SourceTree::Absolute => node.path.clone().unwrap_or_default(),
    SourceTree::Group => {
      let parent_path = match node.parent {
        Some(p) => static_build_path(nodes, p, source_root),
        None => source_root.to_string_lossy().into_owned(),
      };
      match &node.path {
        Some(p) => crate::strutil::relative_path(p, &parent_path),
        None => parent_path,
      }
    }
    SourceTree::Variable(name) if name == "SOURCE_ROOT" || name == "SRCROOT" || name == "PROJECT_DIR" => {
      let base = source_root.to_string_lossy().into_owned();
      match &node.path {
        Some(p) => crate::strutil::relative_path(p, &base),
        None => base,
      }
    }
    SourceTree::Variable(_) => node.path.clone().unwrap_or_default(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pbxproj_text() -> &'static str {
    r#"{
      archiveVersion = 1;
      objects = {
        PROJ = {
          isa = PBXProject;
          mainGroup = MAINGROUP;
          buildConfigurationList = PROJCFGLIST;
          knownRegions = (en, base);
          targets = (TARGET1);
        };
        MAINGROUP = {
          isa = PBXGroup;
          children = (FILEREF1, GROUP1);
          sourceTree = "<group>";
        };
        GROUP1 = {
          isa = PBXGroup;
          path = Resources;
          sourceTree = "<group>";
          children = (FILEREF2);
        };
        FILEREF1 = {
          isa = PBXFileReference;
          path = "README.md";
          sourceTree = "<group>";
        };
        FILEREF2 = {
          isa = PBXFileReference;
          path = "icon.png";
          sourceTree = "<group>";
        };
        PROJCFGLIST = {
          isa = XCConfigurationList;
          buildConfigurations = (PROJDEBUG);
          defaultConfigurationName = Debug;
        };
        PROJDEBUG = {
          isa = XCBuildConfiguration;
          name = Debug;
          buildSettings = { PRODUCT_NAME = "$(TARGET_NAME)"; };
        };
        TARGET1 = {
          isa = PBXNativeTarget;
          name = App;
          buildConfigurationList = TARGETCFGLIST;
          buildPhases = (RESOURCES1);
        };
        TARGETCFGLIST = {
          isa = XCConfigurationList;
          buildConfigurations = (TARGETDEBUG);
          defaultConfigurationName = Debug;
        };
        TARGETDEBUG = {
          isa = XCBuildConfiguration;
          name = Debug;
          buildSettings = { INFOPLIST_FILE = "Info.plist"; };
        };
        RESOURCES1 = {
          isa = PBXResourcesBuildPhase;
          files = (BUILDFILE1);
        };
        BUILDFILE1 = {
          isa = PBXBuildFile;
          fileRef = FILEREF2;
        };
      };
      rootObject = PROJ;
    }"#
  }

  #[test]
  fn unarchives_project_tree() {
    let value = crate::plist::parse(pbxproj_text()).unwrap();
    let model = unarchive(&value, Path::new("/tmp/Demo.xcodeproj")).unwrap();

    assert_eq!(model.native_targets().len(), 1);
    assert_eq!(model.native_targets()[0].name, "App");
    assert_eq!(model.configuration_names(), vec!["Debug"]);
    assert!(model.unarchiver_warnings.is_empty());
  }

  #[test]
  fn main_group_parent_chain_reaches_the_project_root() {
    let value = crate::plist::parse(pbxproj_text()).unwrap();
    let model = unarchive(&value, Path::new("/tmp/Demo.xcodeproj")).unwrap();

    let main_group = model.node(model.main_group);
    assert_eq!(main_group.parent, Some(model.root));
    assert_eq!(main_group.project, Some(model.root));

    let root = model.node(model.root);
    assert_eq!(root.project, Some(model.root));
  }

  #[test]
  fn links_target_configuration_to_project_configuration_parent() {
    let value = crate::plist::parse(pbxproj_text()).unwrap();
    let model = unarchive(&value, Path::new("/tmp/Demo.xcodeproj")).unwrap();

    let target = model.native_target_named("App").unwrap();
    let cfg_id = *target.configurations.get("Debug").unwrap();
    assert!(model.config(cfg_id).parent.is_some());
  }

  #[test]
  fn resources_phase_resolves_through_build_file_to_file_reference() {
    let value = crate::plist::parse(pbxproj_text()).unwrap();
    let model = unarchive(&value, Path::new("/tmp/Demo.xcodeproj")).unwrap();

    let target = model.native_target_named("App").unwrap();
    let refs = target.resource_file_refs();
    assert_eq!(refs.len(), 1);
    assert!(matches!(model.node(refs[0]).kind, NodeKind::FileReference { .. }));
  }

  #[test]
  fn unresolved_object_id_is_a_structural_error() {
    let text = r#"{ objects = { PROJ = { isa = PBXProject; mainGroup = MISSING; }; }; rootObject = PROJ; }"#;
    let value = crate::plist::parse(text).unwrap();
    let err = unarchive(&value, Path::new("/tmp/Demo.xcodeproj")).unwrap_err();
    assert!(matches!(err, StructuralError::UnresolvedObjectId(_)));
  }

  #[test]
  fn unknown_root_class_is_rejected() {
    let text = r#"{ objects = { PROJ = { isa = PBXGroup; }; }; rootObject = PROJ; }"#;
    let value = crate::plist::parse(text).unwrap();
    let err = unarchive(&value, Path::new("/tmp/Demo.xcodeproj")).unwrap_err();
    assert!(matches!(err, StructuralError::RootObjectNotAProject(_)));
  }
}
