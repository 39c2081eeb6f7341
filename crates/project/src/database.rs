//! `ProjectData`: the project document plus an in-memory asset registry.
//!
//! Entries are owned by the id index; the name index only maps names to ids,
//! so renames never leave a dangling reference behind. Every entry points at
//! its defining element through a [`NodeId`] into the owned document.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::WindowConfig;
use crate::document::{NodeId, XmlDocument};
use crate::error::{ProjectError, ProjectResult};

const BANNER: &str = "Generated by the game studio editor";
const HAND_EDIT_WARNING: &str =
    "EDITING THIS FILE BY HAND CAN BREAK YOUR GAME. Proceed with caution.";
const INDENT: &str = " ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Object,
    Sound,
    Sprite,
    Tileset,
    Background,
    Room,
}

impl AssetKind {
    /// Order in which categories are registered on load.
    pub const LOAD_ORDER: [AssetKind; 6] = [
        AssetKind::Object,
        AssetKind::Sound,
        AssetKind::Sprite,
        AssetKind::Tileset,
        AssetKind::Background,
        AssetKind::Room,
    ];

    /// Order in which categories appear in a fresh project file.
    pub const SKELETON_ORDER: [AssetKind; 6] = [
        AssetKind::Background,
        AssetKind::Object,
        AssetKind::Sprite,
        AssetKind::Sound,
        AssetKind::Tileset,
        AssetKind::Room,
    ];

    /// Name of the element that groups assets of this kind.
    pub fn category(self) -> &'static str {
        match self {
            AssetKind::Object => "objects",
            AssetKind::Sound => "sounds",
            AssetKind::Sprite => "sprites",
            AssetKind::Tileset => "tilesets",
            AssetKind::Background => "backgrounds",
            AssetKind::Room => "rooms",
        }
    }

    /// Element name used for a single asset of this kind.
    pub fn element(self) -> &'static str {
        match self {
            AssetKind::Object => "object",
            AssetKind::Sound => "sound",
            AssetKind::Sprite => "sprite",
            AssetKind::Tileset => "tileset",
            AssetKind::Background => "background",
            AssetKind::Room => "room",
        }
    }

    /// Accepts singular or plural element names, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_ascii_lowercase();
        Self::LOAD_ORDER
            .into_iter()
            .find(|k| k.element() == s || k.category() == s)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetEntry {
    pub id: AssetId,
    pub name: String,
    pub kind: AssetKind,
    /// Defining element in the owning document.
    pub node: NodeId,
}

pub struct ProjectData {
    document: XmlDocument,
    entries: HashMap<AssetId, AssetEntry>,
    names: HashMap<String, AssetId>,
    config_node: Option<NodeId>,
    game_name: String,
    file_directory: PathBuf,
    file_name: String,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectData {
    /// Database holding a fresh project skeleton.
    pub fn new() -> Self {
        let mut project = Self {
            document: XmlDocument::new(),
            entries: HashMap::new(),
            names: HashMap::new(),
            config_node: None,
            game_name: String::new(),
            file_directory: PathBuf::new(),
            file_name: String::new(),
        };
        project.create_new_project();
        project
    }

    /// Replace the document with an empty project and default window settings.
    pub fn create_new_project(&mut self) {
        self.clear_database();
        self.game_name.clear();
        self.file_directory = PathBuf::new();
        self.file_name.clear();

        let mut doc = XmlDocument::new();
        let top = doc.root();
        doc.append_comment(top, BANNER);
        doc.append_comment(top, HAND_EDIT_WARNING);
        let root = doc.append_element(top, "project");
        for kind in AssetKind::SKELETON_ORDER {
            doc.append_element(root, kind.category());
        }
        let window = doc.append_element(root, "window");
        WindowConfig::default().write(&mut doc, window);

        self.document = doc;
        self.config_node = Some(window);
    }

    // ---- lookup ----

    pub fn asset_name_exists(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn asset_id_exists(&self, id: AssetId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get_asset(&self, id: AssetId) -> Option<&AssetEntry> {
        self.entries.get(&id)
    }

    pub fn asset_by_name(&self, name: &str) -> Option<&AssetEntry> {
        self.names.get(name).and_then(|id| self.entries.get(id))
    }

    /// All registered entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ---- mutation ----

    /// Rename an asset, keeping the name index, the entry and its XML element in sync.
    pub fn rename_asset(&mut self, old_name: &str, new_name: &str) -> ProjectResult<()> {
        let id = *self
            .names
            .get(old_name)
            .ok_or_else(|| ProjectError::AssetNotFound(old_name.to_owned()))?;
        if old_name == new_name {
            return Ok(());
        }
        if self.names.contains_key(new_name) {
            return Err(ProjectError::NameTaken(new_name.to_owned()));
        }

        self.names.remove(old_name);
        self.names.insert(new_name.to_owned(), id);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.name = new_name.to_owned();
            self.document.set_attribute(entry.node, "name", new_name);
        }
        log::debug!("Renamed asset {id} '{old_name}' -> '{new_name}'");
        Ok(())
    }

    /// Append a new asset element to its category and register it.
    pub fn add_asset(&mut self, kind: AssetKind, name: &str) -> ProjectResult<AssetId> {
        if self.asset_name_exists(name) {
            return Err(ProjectError::NameTaken(name.to_owned()));
        }
        let root = self
            .project_root()
            .ok_or(ProjectError::MissingElement("project"))?;
        let category = match self.document.child(root, kind.category()) {
            Some(node) => node,
            None => self.document.append_element(root, kind.category()),
        };
        let node = self.document.append_element(category, kind.element());
        self.document.set_attribute(node, "name", name);
        self.load_entry_into_db(node, kind)
    }

    /// Register one asset element under a freshly generated id.
    /// Elements without a `name` attribute register under the empty name.
    pub fn load_entry_into_db(&mut self, node: NodeId, kind: AssetKind) -> ProjectResult<AssetId> {
        let name = self
            .document
            .attribute(node, "name")
            .unwrap_or_default()
            .to_owned();
        if self.names.contains_key(&name) {
            return Err(ProjectError::DuplicateName(name));
        }
        let id = self.generate_new_unique_id();
        log::debug!("Registered {kind} '{name}' as {id}");
        self.names.insert(name.clone(), id);
        self.entries.insert(
            id,
            AssetEntry {
                id,
                name,
                kind,
                node,
            },
        );
        Ok(id)
    }

    fn load_entries_into_db(&mut self, root: NodeId, kind: AssetKind) -> ProjectResult<()> {
        let Some(category) = self.document.child(root, kind.category()) else {
            return Ok(());
        };
        let nodes: Vec<NodeId> = self.document.element_children(category).collect();
        for node in nodes {
            self.load_entry_into_db(node, kind)?;
        }
        Ok(())
    }

    fn load_all_entries(&mut self, root: NodeId) -> ProjectResult<()> {
        for kind in AssetKind::LOAD_ORDER {
            self.load_entries_into_db(root, kind)?;
        }
        Ok(())
    }

    /// Smallest id above the current entry count that is not taken.
    pub fn generate_new_unique_id(&self) -> AssetId {
        let mut id = self.entries.len() as u32;
        loop {
            id += 1;
            if !self.entries.contains_key(&AssetId(id)) {
                return AssetId(id);
            }
        }
    }

    /// Drop every entry and forget the window element.
    pub fn clear_database(&mut self) {
        self.entries.clear();
        self.names.clear();
        self.config_node = None;
    }

    // ---- file lifecycle ----

    /// Load a project file, replacing whatever was loaded before.
    ///
    /// An empty path is rejected without touching the current state. Any other
    /// failure leaves the database cleared and the document empty.
    pub fn load_project_file_into_database(&mut self, path: impl AsRef<Path>) -> ProjectResult<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ProjectError::EmptyPath);
        }

        self.clear_database();
        self.document = XmlDocument::new();

        let text = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.document = XmlDocument::parse(&text).inspect_err(|e| {
            log::error!("Failed to parse project {}: {e}", path.display());
        })?;
        log::info!("Parsed project {} without errors", path.display());

        match self.project_root() {
            Some(root) => {
                self.game_name = self
                    .document
                    .child(root, "name")
                    .map(|n| self.document.text(n))
                    .unwrap_or_default();
                if let Err(e) = self.load_all_entries(root) {
                    log::error!("Failed to load project {}: {e}", path.display());
                    self.clear_database();
                    self.document = XmlDocument::new();
                    self.game_name.clear();
                    return Err(e);
                }
                self.config_node = self.document.child(root, "window");
            }
            None => {
                log::warn!("{} has no <project> root element", path.display());
                self.game_name.clear();
            }
        }
        log::info!("Loaded database. Size: {}", self.entries.len());

        self.set_name_and_dir_from_path(path);
        Ok(())
    }

    /// Write the document to `path` and make it the current project file.
    ///
    /// Staged asset files are not copied alongside the project file.
    pub fn save_current_project_to_file(&mut self, path: impl AsRef<Path>) -> ProjectResult<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ProjectError::EmptyPath);
        }

        let xml = self.project_xml_as_string()?;
        std::fs::write(path, xml).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Saved project to {}", path.display());

        self.set_name_and_dir_from_path(path);
        Ok(())
    }

    fn set_name_and_dir_from_path(&mut self, path: &Path) {
        self.file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.file_directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
    }

    pub fn project_xml_as_string(&self) -> ProjectResult<String> {
        Ok(self.document.to_xml_string(INDENT)?)
    }

    // ---- accessors ----

    fn project_root(&self) -> Option<NodeId> {
        self.document.child(self.document.root(), "project")
    }

    pub fn config_node(&self) -> Option<NodeId> {
        self.config_node
    }

    pub fn window_config(&self) -> Option<WindowConfig> {
        self.config_node
            .map(|node| WindowConfig::read(&self.document, node))
    }

    pub fn set_window_config(&mut self, config: &WindowConfig) -> ProjectResult<()> {
        let node = self
            .config_node
            .ok_or(ProjectError::MissingElement("window"))?;
        config.write(&mut self.document, node);
        Ok(())
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    /// Set the display name, creating `<name>` under the project root if needed.
    pub fn set_game_name(&mut self, name: &str) -> ProjectResult<()> {
        let root = self
            .project_root()
            .ok_or(ProjectError::MissingElement("project"))?;
        let node = match self.document.child(root, "name") {
            Some(node) => node,
            None => self.document.append_element(root, "name"),
        };
        self.document.set_text(node, name);
        self.game_name = name.to_owned();
        Ok(())
    }

    pub fn current_project_file_directory(&self) -> &Path {
        &self.file_directory
    }

    pub fn current_project_file_name(&self) -> &str {
        &self.file_name
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const HERO_AND_JUMP: &str = r#"<?xml version="1.0"?>
<project>
 <name>Platformer</name>
 <sprites><sprite name="hero"/></sprites>
 <sounds><sound name="jump"/></sounds>
 <window width="640" height="480" scale="1" drawcolor="ff00ff" title="Jumpy" fps="30" defaultroom=""/>
</project>"#;

    fn write_project(dir: &tempfile::TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("game.project");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn names(project: &ProjectData) -> HashSet<String> {
        project.entries().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn new_project_has_default_window_config() {
        let project = ProjectData::new();
        let cfg = project.window_config().expect("window element");
        assert_eq!(cfg.width, 320);
        assert_eq!(cfg.height, 240);
        assert_eq!(cfg.scale, 2);
        assert_eq!(cfg.fps, 60);
        assert_eq!(cfg.draw_color, "000000");
        assert_eq!(cfg.default_room, "");
        assert!(project.is_empty());
    }

    #[test]
    fn new_project_has_all_categories() {
        let project = ProjectData::new();
        let doc = project.document();
        let root = doc.child(doc.root(), "project").unwrap();
        for kind in AssetKind::LOAD_ORDER {
            let category = doc.child(root, kind.category()).expect(kind.category());
            assert_eq!(doc.element_children(category).count(), 0);
        }
    }

    #[test]
    fn load_registers_every_asset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(&dir, HERO_AND_JUMP);

        let mut project = ProjectData::new();
        project.load_project_file_into_database(&path).unwrap();

        assert!(project.asset_name_exists("hero"));
        assert!(project.asset_name_exists("jump"));
        let hero = project.asset_by_name("hero").unwrap().id;
        let jump = project.asset_by_name("jump").unwrap().id;
        assert_ne!(hero, jump);
        assert!(project.asset_id_exists(hero));
        assert!(project.asset_id_exists(jump));
        assert_eq!(project.get_asset(hero).unwrap().kind, AssetKind::Sprite);
        assert_eq!(project.get_asset(jump).unwrap().kind, AssetKind::Sound);

        assert_eq!(project.game_name(), "Platformer");
        assert_eq!(project.window_config().unwrap().title, "Jumpy");
        assert_eq!(project.current_project_file_name(), "game.project");
        assert_eq!(project.current_project_file_directory(), dir.path());
    }

    #[test]
    fn entries_point_at_their_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(&dir, HERO_AND_JUMP);
        let mut project = ProjectData::new();
        project.load_project_file_into_database(&path).unwrap();

        let hero = project.asset_by_name("hero").unwrap();
        assert_eq!(project.document().name(hero.node), Some("sprite"));
        assert_eq!(project.document().attribute(hero.node, "name"), Some("hero"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut project = ProjectData::new();
        let mut seen = HashSet::new();
        for i in 0..50 {
            let kind = AssetKind::LOAD_ORDER[i % 6];
            let id = project.add_asset(kind, &format!("asset{i}")).unwrap();
            assert!(seen.insert(id), "id {id} handed out twice");
        }
        assert_eq!(project.len(), 50);
    }

    #[test]
    fn unique_id_skips_taken_ids() {
        let mut project = ProjectData::new();
        let a = project.add_asset(AssetKind::Room, "a").unwrap();
        assert_eq!(a, AssetId(1));
        // len == 1, so the next candidate is 2.
        let b = project.add_asset(AssetKind::Room, "b").unwrap();
        assert_eq!(b, AssetId(2));
        assert!(!project.asset_id_exists(project.generate_new_unique_id()));
    }

    #[test]
    fn rename_moves_the_name() {
        let mut project = ProjectData::new();
        let id = project.add_asset(AssetKind::Sprite, "hero").unwrap();
        project.rename_asset("hero", "villain").unwrap();

        assert!(project.asset_name_exists("villain"));
        assert!(!project.asset_name_exists("hero"));
        let entry = project.get_asset(id).unwrap();
        assert_eq!(entry.name, "villain");
        assert_eq!(project.document().attribute(entry.node, "name"), Some("villain"));
    }

    #[test]
    fn rename_missing_asset_is_not_found() {
        let mut project = ProjectData::new();
        let err = project.rename_asset("ghost", "spirit").unwrap_err();
        assert!(matches!(err, ProjectError::AssetNotFound(name) if name == "ghost"));
    }

    #[test]
    fn rename_onto_existing_name_is_rejected() {
        let mut project = ProjectData::new();
        project.add_asset(AssetKind::Sprite, "a").unwrap();
        project.add_asset(AssetKind::Sprite, "b").unwrap();
        let err = project.rename_asset("a", "b").unwrap_err();
        assert!(matches!(err, ProjectError::NameTaken(_)));
        assert!(project.asset_name_exists("a"));
    }

    #[test]
    fn add_asset_rejects_duplicate_names() {
        let mut project = ProjectData::new();
        project.add_asset(AssetKind::Object, "player").unwrap();
        let err = project.add_asset(AssetKind::Sprite, "player").unwrap_err();
        assert!(matches!(err, ProjectError::NameTaken(_)));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.project");

        let mut project = ProjectData::new();
        project.set_game_name("Round Trip").unwrap();
        project.add_asset(AssetKind::Sprite, "hero").unwrap();
        project.add_asset(AssetKind::Background, "sky").unwrap();
        project.add_asset(AssetKind::Room, "level1").unwrap();
        project.rename_asset("level1", "intro").unwrap();
        let cfg = WindowConfig {
            fps: 30,
            title: "Saved".into(),
            ..Default::default()
        };
        project.set_window_config(&cfg).unwrap();
        project.save_current_project_to_file(&path).unwrap();
        assert_eq!(project.current_project_file_name(), "saved.project");

        let mut loaded = ProjectData::new();
        loaded.load_project_file_into_database(&path).unwrap();
        assert_eq!(names(&loaded), names(&project));
        assert_eq!(loaded.window_config(), Some(cfg));
        assert_eq!(loaded.game_name(), "Round Trip");
        assert_eq!(loaded.asset_by_name("sky").unwrap().kind, AssetKind::Background);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(HAND_EDIT_WARNING));
    }

    #[test]
    fn empty_path_is_rejected_without_clearing() {
        let mut project = ProjectData::new();
        project.add_asset(AssetKind::Sprite, "hero").unwrap();

        let err = project.load_project_file_into_database("").unwrap_err();
        assert!(matches!(err, ProjectError::EmptyPath));
        assert!(project.asset_name_exists("hero"));
        assert!(project.window_config().is_some());

        assert!(matches!(
            project.save_current_project_to_file(""),
            Err(ProjectError::EmptyPath)
        ));
    }

    #[test]
    fn malformed_file_leaves_database_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(&dir, "<project><sprites></project>");

        let mut project = ProjectData::new();
        project.add_asset(AssetKind::Sprite, "hero").unwrap();
        let err = project.load_project_file_into_database(&path).unwrap_err();

        assert!(matches!(err, ProjectError::Xml(_)));
        assert!(project.is_empty());
        assert!(!project.asset_name_exists("hero"));
        assert!(project.window_config().is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = ProjectData::new();
        let err = project
            .load_project_file_into_database(dir.path().join("nope.project"))
            .unwrap_err();
        assert!(matches!(err, ProjectError::Io { .. }));
        assert!(project.is_empty());
    }

    #[test]
    fn duplicate_names_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(
            &dir,
            r#"<project><sprites><sprite name="hero"/><sprite name="hero"/></sprites></project>"#,
        );

        let mut project = ProjectData::new();
        let err = project.load_project_file_into_database(&path).unwrap_err();
        assert!(matches!(err, ProjectError::DuplicateName(ref name) if name == "hero"));
        assert!(project.is_empty());
        assert!(!project.asset_name_exists("hero"));
        assert!(project.window_config().is_none());
    }

    #[test]
    fn several_unnamed_assets_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(
            &dir,
            r#"<project><rooms><room/></rooms><objects><object/></objects></project>"#,
        );

        let mut project = ProjectData::new();
        let err = project.load_project_file_into_database(&path).unwrap_err();
        assert!(matches!(err, ProjectError::DuplicateName(ref name) if name.is_empty()));
        assert!(project.is_empty());
    }

    #[test]
    fn indices_stay_in_step_after_rename_and_add() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(
            &dir,
            r#"<project><sprites><sprite name="hero"/><sprite/></sprites></project>"#,
        );
        let mut project = ProjectData::new();
        project.load_project_file_into_database(&path).unwrap();
        assert_eq!(project.len(), 2);
        assert!(project.asset_name_exists(""));

        project.rename_asset("hero", "villain").unwrap();
        project.add_asset(AssetKind::Sprite, "hero").unwrap();

        let named_hero = project.entries().filter(|e| e.name == "hero").count();
        assert_eq!(named_hero, 1);
        assert_eq!(names(&project).len(), project.len());
        for entry in project.entries() {
            assert_eq!(project.asset_by_name(&entry.name).map(|e| e.id), Some(entry.id));
        }
    }

    #[test]
    fn file_without_project_root_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_project(&dir, r#"<game><sprites><sprite name="x"/></sprites></game>"#);

        let mut project = ProjectData::new();
        project.load_project_file_into_database(&path).unwrap();
        assert!(project.is_empty());
        assert!(project.window_config().is_none());
        assert_eq!(project.game_name(), "");
        assert_eq!(project.current_project_file_name(), "game.project");
    }

    #[test]
    fn save_into_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("saved.project");

        let mut project = ProjectData::new();
        let err = project.save_current_project_to_file(&path).unwrap_err();
        assert!(matches!(err, ProjectError::Io { .. }));
        assert_eq!(project.current_project_file_name(), "");
    }

    #[test]
    fn saved_skeleton_starts_with_declaration() {
        let project = ProjectData::new();
        let xml = project.project_xml_as_string().unwrap();
        assert!(xml.starts_with("<?xml"), "got: {xml}");
        assert!(xml.contains(BANNER));
        assert!(XmlDocument::parse(&xml).is_ok());
    }

    #[test]
    fn asset_kind_parses_both_forms() {
        assert_eq!(AssetKind::parse("Sprite"), Some(AssetKind::Sprite));
        assert_eq!(AssetKind::parse("tilesets"), Some(AssetKind::Tileset));
        assert_eq!(AssetKind::parse("shader"), None);
    }
}
