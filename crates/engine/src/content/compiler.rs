use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::geometry::Vec2;
use crate::script::{ActionRegistry, ScriptLoadTarget, StateId};
use crate::AppPaths;

use super::database::{
    Animation, AnimationFrame, ContentDatabase, HazardId, HazardType, HitboxDef, HitboxKind,
    MobCategory, MobType, MobTypeId, Reach, SpawnInfo, StatusId, StatusType, TargetMask, Team,
};
use super::discovery::discover_mod_sources;
use super::script_loader::{
    compile_script, RawAction, RawHandler, RawScript, RawState, ScriptOrigin,
};
use super::types::{
    ContentCompileError, ContentDiagnostics, ContentDiscoveryError, ContentErrorCode,
    ContentRequest, SourceLocation,
};

const INLINE_MOD_ID: &str = "inline";
const INLINE_FILE: &str = "<inline>";

/// Result of a successful content load.
#[derive(Debug, Clone)]
pub struct CompiledContent {
    pub database: ContentDatabase,
    /// Script problems that were dropped instead of failing the load.
    pub diagnostics: ContentDiagnostics,
}

#[derive(Debug, Clone)]
struct DefOrigin {
    mod_id: String,
    file_path: PathBuf,
    location: Option<SourceLocation>,
}

impl DefOrigin {
    fn error(&self, code: ContentErrorCode, message: String) -> ContentCompileError {
        self.error_at(code, message, self.location)
    }

    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        location: Option<SourceLocation>,
    ) -> ContentCompileError {
        ContentCompileError {
            code,
            message,
            mod_id: self.mod_id.clone(),
            file_path: self.file_path.clone(),
            location,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingStatus {
    name: String,
    duration: f32,
    health_per_second: f32,
    invisible: bool,
    disables_attack: bool,
}

#[derive(Debug, Clone)]
struct PendingHazard {
    name: String,
    status: Option<String>,
    origin: DefOrigin,
}

#[derive(Debug, Clone)]
struct PendingHitbox {
    body_part: String,
    pos: Vec2,
    z: f32,
    radius: f32,
    height: f32,
    kind: HitboxKind,
    value: f32,
    hazards: Vec<String>,
    location: SourceLocation,
}

#[derive(Debug, Clone)]
struct PendingFrame {
    duration: f32,
    signal: Option<u32>,
    hitboxes: Vec<PendingHitbox>,
}

#[derive(Debug, Clone)]
struct PendingAnimation {
    name: String,
    frames: Vec<PendingFrame>,
    loops: bool,
}

#[derive(Debug, Clone)]
struct PendingSpawn {
    name: String,
    mob_type: String,
    offset: Vec2,
    z: f32,
    relative: bool,
    angle: f32,
    link_object_to_spawn: bool,
    link_spawn_to_object: bool,
    as_child: bool,
    vars: Vec<(String, String)>,
    location: SourceLocation,
}

#[derive(Debug, Clone)]
struct PendingMobType {
    name: String,
    category: MobCategory,
    radius: f32,
    rectangle: Option<Vec2>,
    height: f32,
    max_health: f32,
    health_regen: f32,
    move_speed: f32,
    territory_radius: f32,
    team: Team,
    target_type: TargetMask,
    huntable_targets: TargetMask,
    hurtable_targets: TargetMask,
    pushable: bool,
    pushes: bool,
    pushes_softly: bool,
    pushes_with_hitboxes: bool,
    carry_spots: usize,
    group_task_spots: usize,
    resistances: Vec<String>,
    body_parts: Vec<String>,
    reaches: Vec<Reach>,
    near_reach: Option<String>,
    far_reach: Option<String>,
    animations: Vec<PendingAnimation>,
    spawns: Vec<PendingSpawn>,
    script: RawScript,
    idle_states: Vec<String>,
    states_ignoring_death: Vec<String>,
    states_ignoring_hazard: Vec<String>,
    origin: DefOrigin,
}

#[derive(Debug, Clone)]
enum PendingDef {
    Status(PendingStatus),
    Hazard(PendingHazard),
    MobType(Box<PendingMobType>),
}

impl PendingDef {
    fn kind_name(&self) -> &'static str {
        match self {
            PendingDef::Status(_) => "StatusDef",
            PendingDef::Hazard(_) => "HazardDef",
            PendingDef::MobType(_) => "MobType",
        }
    }

    fn name(&self) -> &str {
        match self {
            PendingDef::Status(def) => &def.name,
            PendingDef::Hazard(def) => &def.name,
            PendingDef::MobType(def) => &def.name,
        }
    }
}

#[derive(Debug, Default)]
struct MergedDefs {
    statuses: BTreeMap<String, PendingStatus>,
    hazards: BTreeMap<String, PendingHazard>,
    mob_types: BTreeMap<String, PendingMobType>,
}

impl MergedDefs {
    fn merge(
        &mut self,
        mod_id: &str,
        file_path: &Path,
        defs: Vec<PendingDef>,
        seen_in_mod: &mut HashSet<(&'static str, String)>,
    ) -> Result<(), ContentCompileError> {
        for def in defs {
            let kind = def.kind_name();
            if !seen_in_mod.insert((kind, def.name().to_string())) {
                return Err(ContentCompileError {
                    code: ContentErrorCode::DuplicateDefInMod,
                    message: format!(
                        "duplicate {} '{}' in mod '{}'; each mod may define a name only once",
                        kind,
                        def.name(),
                        mod_id
                    ),
                    mod_id: mod_id.to_string(),
                    file_path: file_path.to_path_buf(),
                    location: None,
                });
            }
            // Later mods override earlier ones by name.
            match def {
                PendingDef::Status(status) => {
                    self.statuses.insert(status.name.clone(), status);
                }
                PendingDef::Hazard(hazard) => {
                    self.hazards.insert(hazard.name.clone(), hazard);
                }
                PendingDef::MobType(mob_type) => {
                    self.mob_types.insert(mob_type.name.clone(), *mob_type);
                }
            }
        }
        Ok(())
    }
}

/// Loads base content and every requested mod into a content database.
pub fn compile_content(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<CompiledContent, ContentCompileError> {
    let sources = discover_mod_sources(app_paths, request)
        .map_err(|error| map_discovery_error(error, &app_paths.root))?;

    let mut merged = MergedDefs::default();
    let mut file_count = 0usize;
    for source in sources {
        let xml_files = collect_xml_files_sorted(&source.dir)
            .map_err(|error| read_error(&source.mod_id, error.path, error.source))?;
        let mut seen_in_mod = HashSet::new();

        for xml_file in xml_files {
            let raw = fs::read_to_string(&xml_file)
                .map_err(|source_err| read_error(&source.mod_id, xml_file.clone(), source_err))?;
            let defs = parse_defs_document(&source.mod_id, &xml_file, &raw)?;
            merged.merge(&source.mod_id, &xml_file, defs, &mut seen_in_mod)?;
            file_count += 1;
        }
    }

    let compiled = build_database(merged)?;
    info!(
        files = file_count,
        mob_types = compiled.database.mob_types().len(),
        diagnostics = compiled.diagnostics.len(),
        "content_loaded"
    );
    Ok(compiled)
}

/// Compiles a single `<Defs>` document held in memory.
pub fn compile_content_from_str(raw: &str) -> Result<CompiledContent, ContentCompileError> {
    let file_path = Path::new(INLINE_FILE);
    let defs = parse_defs_document(INLINE_MOD_ID, file_path, raw)?;
    let mut merged = MergedDefs::default();
    merged.merge(INLINE_MOD_ID, file_path, defs, &mut HashSet::new())?;
    build_database(merged)
}

fn build_database(merged: MergedDefs) -> Result<CompiledContent, ContentCompileError> {
    let registry = ActionRegistry::standard();
    let mut diagnostics = ContentDiagnostics::default();

    let statuses = merged
        .statuses
        .into_values()
        .enumerate()
        .map(|(index, status)| StatusType {
            id: StatusId(index as u32),
            name: status.name,
            duration: status.duration,
            health_per_second: status.health_per_second,
            invisible: status.invisible,
            disables_attack: status.disables_attack,
        })
        .collect::<Vec<_>>();
    let status_ids = statuses
        .iter()
        .map(|status| (status.name.clone(), status.id))
        .collect::<HashMap<_, _>>();

    let mut hazards = Vec::with_capacity(merged.hazards.len());
    for (index, hazard) in merged.hazards.into_values().enumerate() {
        let status = match &hazard.status {
            Some(name) => Some(*status_ids.get(name).ok_or_else(|| {
                hazard.origin.error(
                    ContentErrorCode::UnknownReference,
                    format!("hazard '{}' applies unknown status '{}'", hazard.name, name),
                )
            })?),
            None => None,
        };
        hazards.push(HazardType {
            id: HazardId(index as u32),
            name: hazard.name,
            status,
        });
    }
    let hazard_ids = hazards
        .iter()
        .map(|hazard| (hazard.name.clone(), hazard.id))
        .collect::<HashMap<_, _>>();

    let mob_type_ids = merged
        .mob_types
        .keys()
        .enumerate()
        .map(|(index, name)| (name.clone(), MobTypeId(index as u32)))
        .collect::<HashMap<_, _>>();
    let names = Names {
        mob_types: &mob_type_ids,
        hazards: &hazard_ids,
        statuses: &status_ids,
    };

    let mut mob_types = Vec::with_capacity(merged.mob_types.len());
    for (index, pending) in merged.mob_types.into_values().enumerate() {
        mob_types.push(build_mob_type(
            MobTypeId(index as u32),
            pending,
            &names,
            &registry,
            &mut diagnostics,
        )?);
    }

    Ok(CompiledContent {
        database: ContentDatabase::new(mob_types, hazards, statuses),
        diagnostics,
    })
}

struct Names<'a> {
    mob_types: &'a HashMap<String, MobTypeId>,
    hazards: &'a HashMap<String, HazardId>,
    statuses: &'a HashMap<String, StatusId>,
}

impl Names<'_> {
    fn hazard(
        &self,
        origin: &DefOrigin,
        name: &str,
        location: Option<SourceLocation>,
    ) -> Result<HazardId, ContentCompileError> {
        self.hazards.get(name).copied().ok_or_else(|| {
            origin.error_at(
                ContentErrorCode::UnknownReference,
                format!("unknown hazard '{name}'"),
                location,
            )
        })
    }
}

fn build_mob_type(
    id: MobTypeId,
    pending: PendingMobType,
    names: &Names<'_>,
    registry: &ActionRegistry,
    diagnostics: &mut ContentDiagnostics,
) -> Result<MobType, ContentCompileError> {
    let origin = &pending.origin;

    let resistances = pending
        .resistances
        .iter()
        .map(|name| names.hazard(origin, name, origin.location))
        .collect::<Result<Vec<_>, _>>()?;

    let mut animations = Vec::with_capacity(pending.animations.len());
    let mut anim_hitbox_span = 0.0f32;
    for animation in &pending.animations {
        let mut frames = Vec::with_capacity(animation.frames.len());
        for frame in &animation.frames {
            let mut hitboxes = Vec::with_capacity(frame.hitboxes.len());
            for hitbox in &frame.hitboxes {
                let Some(body_part) = pending
                    .body_parts
                    .iter()
                    .position(|part| *part == hitbox.body_part)
                else {
                    return Err(origin.error_at(
                        ContentErrorCode::UnknownReference,
                        format!(
                            "hitbox uses unknown body part '{}' in mob type '{}'",
                            hitbox.body_part, pending.name
                        ),
                        Some(hitbox.location),
                    ));
                };
                let hazards = hitbox
                    .hazards
                    .iter()
                    .map(|name| names.hazard(origin, name, Some(hitbox.location)))
                    .collect::<Result<Vec<_>, _>>()?;
                anim_hitbox_span = anim_hitbox_span.max(hitbox.pos.length() + hitbox.radius);
                hitboxes.push(HitboxDef {
                    body_part,
                    pos: hitbox.pos,
                    z: hitbox.z,
                    radius: hitbox.radius,
                    height: hitbox.height,
                    kind: hitbox.kind,
                    value: hitbox.value,
                    hazards,
                });
            }
            frames.push(AnimationFrame {
                duration: frame.duration,
                signal: frame.signal,
                hitboxes,
            });
        }
        animations.push(Animation {
            name: animation.name.clone(),
            frames,
            loops: animation.loops,
        });
    }

    let mut spawns = Vec::with_capacity(pending.spawns.len());
    for spawn in &pending.spawns {
        let Some(mob_type) = names.mob_types.get(&spawn.mob_type).copied() else {
            return Err(origin.error_at(
                ContentErrorCode::UnknownReference,
                format!(
                    "spawn '{}' refers to unknown mob type '{}'",
                    spawn.name, spawn.mob_type
                ),
                Some(spawn.location),
            ));
        };
        spawns.push(SpawnInfo {
            name: spawn.name.clone(),
            mob_type,
            offset: spawn.offset,
            z: spawn.z,
            relative: spawn.relative,
            angle: spawn.angle,
            link_object_to_spawn: spawn.link_object_to_spawn,
            link_spawn_to_object: spawn.link_spawn_to_object,
            as_child: spawn.as_child,
            vars: spawn.vars.clone(),
        });
    }

    let reach_index = |field: &str, name: &Option<String>| match name {
        Some(name) => pending
            .reaches
            .iter()
            .position(|reach| reach.name == *name)
            .map(Some)
            .ok_or_else(|| {
                origin.error(
                    ContentErrorCode::UnknownReference,
                    format!("<{field}> names unknown reach '{name}'"),
                )
            }),
        None => Ok(None),
    };
    let default_near_reach = reach_index("nearReach", &pending.near_reach)?;
    let default_far_reach = reach_index("farReach", &pending.far_reach)?;

    let target = ScriptLoadTarget {
        mob_type_name: &pending.name,
        animations: &animations,
        reaches: &pending.reaches,
        spawns: &spawns,
        body_parts: &pending.body_parts,
        hazards: names.hazards,
        statuses: names.statuses,
    };
    let script = compile_script(
        &pending.script,
        &target,
        registry,
        ScriptOrigin {
            mod_id: &origin.mod_id,
            file_path: &origin.file_path,
        },
        pending.max_health > 0.0,
        diagnostics,
    );

    let mut state_list = |field: &str, state_names: &[String]| -> Vec<StateId> {
        state_names
            .iter()
            .filter_map(|name| {
                let found = script.state_id_by_name(name);
                if found.is_none() {
                    diagnostics.push(origin.error(
                        ContentErrorCode::UnknownState,
                        format!(
                            "<{field}> of mob type '{}' names unknown state '{name}'",
                            pending.name
                        ),
                    ));
                }
                found
            })
            .collect()
    };
    let idle_states = state_list("idleStates", &pending.idle_states);
    let states_ignoring_death = state_list("statesIgnoringDeath", &pending.states_ignoring_death);
    let states_ignoring_hazard =
        state_list("statesIgnoringHazard", &pending.states_ignoring_hazard);

    Ok(MobType {
        id,
        name: pending.name,
        category: pending.category,
        radius: pending.radius,
        rectangle: pending.rectangle,
        height: pending.height,
        max_health: pending.max_health,
        health_regen: pending.health_regen,
        move_speed: pending.move_speed,
        territory_radius: pending.territory_radius,
        team: pending.team,
        target_type: pending.target_type,
        huntable_targets: pending.huntable_targets,
        hurtable_targets: pending.hurtable_targets,
        pushable: pending.pushable,
        pushes: pending.pushes,
        pushes_softly: pending.pushes_softly,
        pushes_with_hitboxes: pending.pushes_with_hitboxes,
        carry_spots: pending.carry_spots,
        group_task_spots: pending.group_task_spots,
        resistances,
        body_parts: pending.body_parts,
        reaches: pending.reaches,
        default_near_reach,
        default_far_reach,
        animations,
        spawns,
        script,
        idle_states,
        states_ignoring_death,
        states_ignoring_hazard,
        anim_hitbox_span,
    })
}

/// One parsed XML document plus where it came from.
struct XmlSource<'a, 'input> {
    mod_id: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl XmlSource<'_, '_> {
    fn location(&self, node: Node<'_, '_>) -> SourceLocation {
        let pos = self.doc.text_pos_at(node.range().start);
        SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }
    }

    fn origin(&self, node: Node<'_, '_>) -> DefOrigin {
        DefOrigin {
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(self.location(node)),
        }
    }

    fn error(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        error_at_node(code, message, self.mod_id, self.file_path, self.doc, node)
    }

    fn text(&self, node: Node<'_, '_>) -> Result<String, ContentCompileError> {
        required_text(self.mod_id, self.file_path, self.doc, node, node.tag_name().name())
    }

    fn optional_text(&self, node: Node<'_, '_>) -> String {
        node.text().map(str::trim).unwrap_or_default().to_string()
    }

    fn parse_number(
        &self,
        node: Node<'_, '_>,
        field: &str,
        raw: &str,
    ) -> Result<f32, ContentCompileError> {
        raw.trim()
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                self.error(
                    ContentErrorCode::InvalidValue,
                    format!("{field} '{raw}' is not a valid number"),
                    node,
                )
            })
    }

    fn number(&self, node: Node<'_, '_>) -> Result<f32, ContentCompileError> {
        let raw = self.text(node)?;
        self.parse_number(node, node.tag_name().name(), &raw)
    }

    fn non_negative(&self, node: Node<'_, '_>) -> Result<f32, ContentCompileError> {
        let value = self.number(node)?;
        if value < 0.0 {
            return Err(self.error(
                ContentErrorCode::InvalidValue,
                format!("{} must be >= 0", node.tag_name().name()),
                node,
            ));
        }
        Ok(value)
    }

    fn count(&self, node: Node<'_, '_>) -> Result<usize, ContentCompileError> {
        let raw = self.text(node)?;
        raw.parse::<usize>().map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("{} '{}' is not a valid count", node.tag_name().name(), raw),
                node,
            )
        })
    }

    fn flag(&self, node: Node<'_, '_>) -> Result<bool, ContentCompileError> {
        let raw = self.text(node)?;
        parse_flag(&raw).ok_or_else(|| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("{} '{}' is not true or false", node.tag_name().name(), raw),
                node,
            )
        })
    }

    fn names(&self, node: Node<'_, '_>) -> Vec<String> {
        split_names(&self.optional_text(node))
    }

    fn required_attr(
        &self,
        node: Node<'_, '_>,
        name: &str,
    ) -> Result<String, ContentCompileError> {
        match node.attribute(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(self.error(
                ContentErrorCode::MissingField,
                format!(
                    "missing required attribute '{}' on <{}>",
                    name,
                    node.tag_name().name()
                ),
                node,
            )),
        }
    }

    fn attr_number(
        &self,
        node: Node<'_, '_>,
        name: &str,
        default: f32,
    ) -> Result<f32, ContentCompileError> {
        match node.attribute(name) {
            Some(raw) => self.parse_number(node, name, raw),
            None => Ok(default),
        }
    }

    fn attr_flag(
        &self,
        node: Node<'_, '_>,
        name: &str,
        default: bool,
    ) -> Result<bool, ContentCompileError> {
        match node.attribute(name) {
            Some(raw) => parse_flag(raw).ok_or_else(|| {
                self.error(
                    ContentErrorCode::InvalidValue,
                    format!("attribute {name} '{raw}' is not true or false"),
                    node,
                )
            }),
            None => Ok(default),
        }
    }

    fn unknown_child(&self, parent: &str, child: Node<'_, '_>) -> ContentCompileError {
        self.error(
            ContentErrorCode::UnknownField,
            format!("unknown field <{}> in <{}>", child.tag_name().name(), parent),
            child,
        )
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_defs_document(
    mod_id: &str,
    file_path: &Path,
    raw: &str,
) -> Result<Vec<PendingDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        mod_id: mod_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let source = XmlSource {
        mod_id,
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(source.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::<PendingDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        let def = match child.tag_name().name() {
            "MobType" => PendingDef::MobType(Box::new(parse_mob_type(&source, child)?)),
            "HazardDef" => PendingDef::Hazard(parse_hazard(&source, child)?),
            "StatusDef" => PendingDef::Status(parse_status(&source, child)?),
            other => {
                return Err(source.error(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{other}>; expected <MobType>, <HazardDef> or <StatusDef>"
                    ),
                    child,
                ))
            }
        };
        defs.push(def);
    }

    Ok(defs)
}

/// Children of `node` whose tag may appear only once.
fn unique_fields<'a, 'input>(
    source: &XmlSource<'_, '_>,
    node: Node<'a, 'input>,
    repeatable: &[&str],
) -> Result<Vec<Node<'a, 'input>>, ContentCompileError> {
    let mut seen_fields = HashSet::<&str>::new();
    let mut fields = Vec::new();
    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name();
        if !repeatable.contains(&field_name) && !seen_fields.insert(field_name) {
            return Err(source.error(
                ContentErrorCode::DuplicateField,
                format!(
                    "duplicate field <{}> in <{}>",
                    field_name,
                    node.tag_name().name()
                ),
                field,
            ));
        }
        fields.push(field);
    }
    Ok(fields)
}

fn parse_status(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PendingStatus, ContentCompileError> {
    let mut status = PendingStatus {
        name: source.required_attr(node, "name")?,
        duration: 0.0,
        health_per_second: 0.0,
        invisible: false,
        disables_attack: false,
    };
    for field in unique_fields(source, node, &[])? {
        match field.tag_name().name() {
            "duration" => status.duration = source.non_negative(field)?,
            "healthPerSecond" => status.health_per_second = source.number(field)?,
            "invisible" => status.invisible = source.flag(field)?,
            "disablesAttack" => status.disables_attack = source.flag(field)?,
            _ => return Err(source.unknown_child("StatusDef", field)),
        }
    }
    Ok(status)
}

fn parse_hazard(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PendingHazard, ContentCompileError> {
    let mut hazard = PendingHazard {
        name: source.required_attr(node, "name")?,
        status: None,
        origin: source.origin(node),
    };
    for field in unique_fields(source, node, &[])? {
        match field.tag_name().name() {
            "status" => hazard.status = Some(source.text(field)?),
            _ => return Err(source.unknown_child("HazardDef", field)),
        }
    }
    Ok(hazard)
}

fn parse_mob_type(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PendingMobType, ContentCompileError> {
    let name = source.required_attr(node, "name")?;
    let category_name = source.required_attr(node, "category")?;
    let Some(category) = MobCategory::from_name(&category_name) else {
        return Err(source.error(
            ContentErrorCode::InvalidValue,
            format!("unknown mob category '{category_name}'"),
            node,
        ));
    };

    let mut radius: Option<f32> = None;
    let mut def = PendingMobType {
        name,
        category,
        radius: 0.0,
        rectangle: None,
        height: 0.0,
        max_health: 0.0,
        health_regen: 0.0,
        move_speed: 0.0,
        territory_radius: 0.0,
        team: Team::None,
        target_type: TargetMask::NONE,
        huntable_targets: TargetMask::NONE,
        hurtable_targets: TargetMask::NONE,
        pushable: true,
        pushes: false,
        pushes_softly: false,
        pushes_with_hitboxes: false,
        carry_spots: 0,
        group_task_spots: 0,
        resistances: Vec::new(),
        body_parts: Vec::new(),
        reaches: Vec::new(),
        near_reach: None,
        far_reach: None,
        animations: Vec::new(),
        spawns: Vec::new(),
        script: RawScript::default(),
        idle_states: Vec::new(),
        states_ignoring_death: Vec::new(),
        states_ignoring_hazard: Vec::new(),
        origin: source.origin(node),
    };

    let target_mask = |field: Node<'_, '_>| {
        TargetMask::from_names(&source.optional_text(field))
            .map_err(|message| source.error(ContentErrorCode::InvalidValue, message, field))
    };

    for field in unique_fields(source, node, &["reach", "animation", "spawn"])? {
        match field.tag_name().name() {
            "radius" => {
                let value = source.non_negative(field)?;
                if value <= 0.0 {
                    return Err(source.error(
                        ContentErrorCode::InvalidValue,
                        "radius must be > 0".to_string(),
                        field,
                    ));
                }
                radius = Some(value);
            }
            "rectangle" => {
                let width = source.attr_number(field, "width", 0.0)?;
                let height = source.attr_number(field, "height", 0.0)?;
                if width <= 0.0 || height <= 0.0 {
                    return Err(source.error(
                        ContentErrorCode::InvalidValue,
                        "rectangle width and height must be > 0".to_string(),
                        field,
                    ));
                }
                def.rectangle = Some(Vec2::new(width, height));
            }
            "height" => def.height = source.non_negative(field)?,
            "maxHealth" => def.max_health = source.non_negative(field)?,
            "healthRegen" => def.health_regen = source.number(field)?,
            "moveSpeed" => def.move_speed = source.non_negative(field)?,
            "territoryRadius" => def.territory_radius = source.non_negative(field)?,
            "team" => {
                let value = source.text(field)?;
                def.team = Team::from_name(&value).ok_or_else(|| {
                    source.error(
                        ContentErrorCode::InvalidValue,
                        format!("unknown team '{value}'"),
                        field,
                    )
                })?;
            }
            "targetType" => def.target_type = target_mask(field)?,
            "huntableTargets" => def.huntable_targets = target_mask(field)?,
            "hurtableTargets" => def.hurtable_targets = target_mask(field)?,
            "pushable" => def.pushable = source.flag(field)?,
            "pushes" => def.pushes = source.flag(field)?,
            "pushesSoftly" => def.pushes_softly = source.flag(field)?,
            "pushesWithHitboxes" => def.pushes_with_hitboxes = source.flag(field)?,
            "carrySpots" => def.carry_spots = source.count(field)?,
            "groupTaskSpots" => def.group_task_spots = source.count(field)?,
            "resistances" => def.resistances = source.names(field),
            "bodyParts" => def.body_parts = source.names(field),
            "idleStates" => def.idle_states = source.names(field),
            "statesIgnoringDeath" => def.states_ignoring_death = source.names(field),
            "statesIgnoringHazard" => def.states_ignoring_hazard = source.names(field),
            "nearReach" => def.near_reach = Some(source.text(field)?),
            "farReach" => def.far_reach = Some(source.text(field)?),
            "reach" => def.reaches.push(parse_reach(source, field)?),
            "animation" => def.animations.push(parse_animation(source, field)?),
            "spawn" => def.spawns.push(parse_spawn(source, field)?),
            "script" => def.script = parse_script(source, field)?,
            _ => return Err(source.unknown_child("MobType", field)),
        }
    }

    let Some(radius) = radius else {
        return Err(source.error(
            ContentErrorCode::MissingField,
            "missing required field <radius> in <MobType>".to_string(),
            node,
        ));
    };
    def.radius = radius;
    Ok(def)
}

fn parse_reach(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Reach, ContentCompileError> {
    Ok(Reach {
        name: source.required_attr(node, "name")?,
        radius_1: source.attr_number(node, "radius1", 0.0)?,
        angle_1: source.attr_number(node, "angle1", 0.0)?.to_radians(),
        radius_2: source.attr_number(node, "radius2", 0.0)?,
        angle_2: source.attr_number(node, "angle2", 0.0)?.to_radians(),
    })
}

fn parse_animation(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PendingAnimation, ContentCompileError> {
    let mut animation = PendingAnimation {
        name: source.required_attr(node, "name")?,
        frames: Vec::new(),
        loops: source.attr_flag(node, "loop", true)?,
    };
    for frame in node.children().filter(|child| child.is_element()) {
        if frame.tag_name().name() != "frame" {
            return Err(source.unknown_child("animation", frame));
        }
        let duration = source.attr_number(frame, "duration", 0.1)?;
        if duration <= 0.0 {
            return Err(source.error(
                ContentErrorCode::InvalidValue,
                "frame duration must be > 0".to_string(),
                frame,
            ));
        }
        let signal = match frame.attribute("signal") {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
                source.error(
                    ContentErrorCode::InvalidValue,
                    format!("frame signal '{raw}' is not a valid number"),
                    frame,
                )
            })?),
            None => None,
        };
        let mut hitboxes = Vec::new();
        for hitbox in frame.children().filter(|child| child.is_element()) {
            if hitbox.tag_name().name() != "hitbox" {
                return Err(source.unknown_child("frame", hitbox));
            }
            hitboxes.push(parse_hitbox(source, hitbox)?);
        }
        animation.frames.push(PendingFrame {
            duration,
            signal,
            hitboxes,
        });
    }
    Ok(animation)
}

fn parse_hitbox(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PendingHitbox, ContentCompileError> {
    let kind = match node.attribute("type").unwrap_or("normal") {
        "normal" => HitboxKind::Normal,
        "attack" => HitboxKind::Attack,
        "disabled" => HitboxKind::Disabled,
        other => {
            return Err(source.error(
                ContentErrorCode::InvalidValue,
                format!("invalid hitbox type '{other}'; allowed values: normal, attack, disabled"),
                node,
            ))
        }
    };
    Ok(PendingHitbox {
        body_part: source.required_attr(node, "bodyPart")?,
        pos: Vec2::new(
            source.attr_number(node, "x", 0.0)?,
            source.attr_number(node, "y", 0.0)?,
        ),
        z: source.attr_number(node, "z", 0.0)?,
        radius: source.attr_number(node, "radius", 0.0)?,
        height: source.attr_number(node, "height", 0.0)?,
        kind,
        value: source.attr_number(node, "value", 0.0)?,
        hazards: split_names(node.attribute("hazards").unwrap_or_default()),
        location: source.location(node),
    })
}

fn parse_spawn(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PendingSpawn, ContentCompileError> {
    let mut vars = Vec::new();
    for var in node.children().filter(|child| child.is_element()) {
        if var.tag_name().name() != "var" {
            return Err(source.unknown_child("spawn", var));
        }
        vars.push((
            source.required_attr(var, "name")?,
            var.attribute("value").unwrap_or_default().to_string(),
        ));
    }
    Ok(PendingSpawn {
        name: source.required_attr(node, "name")?,
        mob_type: source.required_attr(node, "mobType")?,
        offset: Vec2::new(
            source.attr_number(node, "x", 0.0)?,
            source.attr_number(node, "y", 0.0)?,
        ),
        z: source.attr_number(node, "z", 0.0)?,
        relative: source.attr_flag(node, "relative", true)?,
        angle: source.attr_number(node, "angle", 0.0)?.to_radians(),
        link_object_to_spawn: source.attr_flag(node, "linkObjectToSpawn", false)?,
        link_spawn_to_object: source.attr_flag(node, "linkSpawnToObject", false)?,
        as_child: source.attr_flag(node, "asChild", false)?,
        vars,
        location: source.location(node),
    })
}

fn parse_script(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<RawScript, ContentCompileError> {
    let mut script = RawScript {
        initial_state: node.attribute("initialState").map(str::to_string),
        death_state: node.attribute("deathState").map(str::to_string),
        location: Some(source.location(node)),
        ..RawScript::default()
    };
    for child in node.children().filter(|child| child.is_element()) {
        match child.tag_name().name() {
            "state" => script.states.push(RawState {
                name: child.attribute("name").unwrap_or_default().trim().to_string(),
                handlers: parse_handlers(source, child)?,
                location: Some(source.location(child)),
            }),
            "global" => script.global.extend(parse_handlers(source, child)?),
            _ => return Err(source.unknown_child("script", child)),
        }
    }
    Ok(script)
}

fn parse_handlers(
    source: &XmlSource<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<RawHandler>, ContentCompileError> {
    let mut handlers = Vec::new();
    for event in node.children().filter(|child| child.is_element()) {
        if event.tag_name().name() != "event" {
            return Err(source.unknown_child(node.tag_name().name(), event));
        }
        let mut actions = Vec::new();
        for action in event.children().filter(|child| child.is_element()) {
            if action.tag_name().name() != "action" {
                return Err(source.unknown_child("event", action));
            }
            actions.push(RawAction {
                text: source.optional_text(action),
                location: Some(source.location(action)),
            });
        }
        handlers.push(RawHandler {
            event: source.required_attr(event, "kind")?,
            actions,
            location: Some(source.location(event)),
        });
    }
    Ok(handlers)
}

fn required_text(
    mod_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            mod_id,
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    mod_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    let pos = doc.text_pos_at(node.range().start);
    ContentCompileError {
        code,
        message,
        mod_id: mod_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_cached_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(mod_id: &str, path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        mod_id: mod_id.to_string(),
        file_path: path,
        location: None,
    }
}

fn map_discovery_error(error: ContentDiscoveryError, root: &Path) -> ContentCompileError {
    match error {
        ContentDiscoveryError::EnabledModMissing {
            mod_id,
            expected_dir,
        } => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: format!(
                "enabled mod '{}' not found at {}; check enabled mod list",
                mod_id,
                expected_dir.display()
            ),
            mod_id,
            file_path: expected_dir,
            location: None,
        },
        other => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: other.to_string(),
            mod_id: "<discovery>".to_string(),
            file_path: root.to_path_buf(),
            location: None,
        },
    }
}
