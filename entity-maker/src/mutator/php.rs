//! Doctrine-attribute PHP class manipulation
//!
//! Works line by line on the class text. Brace depth is tracked with a small scanner that
//! skips strings and comments, which is enough to locate properties, methods, and the
//! class body in entity sources.

use super::SourceMutator;
use crate::error::{EntityMakerError, Result};
use crate::field::ScalarFieldDescriptor;
use crate::naming::Naming;
use crate::relation::RelationSide;
use crate::request::ScalarKind;
use crate::templates::{self, TemplateRegistry};
use minijinja::context;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const ORM_MAPPING: &str = "Doctrine\\ORM\\Mapping";
const COLLECTION: &str = "Doctrine\\Common\\Collections\\Collection";
const ARRAY_COLLECTION: &str = "Doctrine\\Common\\Collections\\ArrayCollection";
const DBAL_TYPES: &str = "Doctrine\\DBAL\\Types\\Types";

static NAMESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*namespace\s+([\w\\]+)\s*;").expect("static regex"));

static USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^use\s+\\?([\w\\]+)(?:\s+as\s+(\w+))?\s*;").expect("static regex")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:final|abstract|readonly)\s+)*class\s+(\w+)").expect("static regex")
});

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|protected|private|var|readonly|static)\s+)+(?:\??[\w\\|]+\s+)?\$(\w+)")
        .expect("static regex")
});

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|protected|private|static|final|abstract)\s+)*function\s+(\w+)\s*\(")
        .expect("static regex")
});

#[derive(Debug, Clone, Copy)]
struct LineInfo {
    depth_before: i32,
    depth_after: i32,
    opens: bool,
    terminates: bool,
}

fn scan(lines: &[String]) -> Vec<LineInfo> {
    let mut depth = 0;
    let mut in_comment = false;

    lines
        .iter()
        .map(|line| {
            let depth_before = depth;
            let mut opens = false;
            let mut terminates = false;
            let mut quote: Option<char> = None;
            let mut chars = line.chars().peekable();

            while let Some(c) = chars.next() {
                if in_comment {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        in_comment = false;
                    }
                    continue;
                }
                if let Some(open) = quote {
                    if c == '\\' {
                        chars.next();
                    } else if c == open {
                        quote = None;
                    }
                    continue;
                }
                match c {
                    '\'' | '"' => quote = Some(c),
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        in_comment = true;
                    }
                    '/' if chars.peek() == Some(&'/') => break,
                    '#' if chars.peek() != Some(&'[') => break,
                    '{' => {
                        depth += 1;
                        opens = true;
                    }
                    '}' => depth -= 1,
                    ';' => terminates = true,
                    _ => {}
                }
            }

            LineInfo {
                depth_before,
                depth_after: depth,
                opens,
                terminates,
            }
        })
        .collect()
}

/// Property or method with the docblock and attributes attached to it
#[derive(Debug)]
struct Member {
    name: String,
    /// First docblock/attribute line
    start: usize,
    /// Declaration line
    line: usize,
    /// Last line (`;` or closing brace)
    end: usize,
}

#[derive(Debug)]
struct Layout {
    class_open: usize,
    class_close: usize,
    properties: Vec<Member>,
    methods: Vec<Member>,
}

#[derive(Debug)]
struct Import {
    line: usize,
    path: String,
    alias: String,
}

fn malformed(reason: impl Into<String>) -> EntityMakerError {
    EntityMakerError::MalformedSource(reason.into())
}

fn attached_start(lines: &[String], declaration: usize, class_open: usize) -> usize {
    let mut start = declaration;
    while start > class_open + 1 {
        let previous = lines[start - 1].trim();
        if previous.is_empty()
            || previous.ends_with(';')
            || previous.ends_with('}')
            || previous.ends_with('{')
        {
            break;
        }
        start -= 1;
    }
    start
}

fn method_end(info: &[LineInfo], from: usize, limit: usize) -> usize {
    let mut opened = false;
    for (offset, line) in info[from..limit].iter().enumerate() {
        opened |= line.opens;
        if (opened && line.depth_after == 1) || (!opened && line.terminates) {
            return from + offset;
        }
    }
    from
}

fn statement_end(info: &[LineInfo], from: usize, limit: usize) -> usize {
    info[from..limit]
        .iter()
        .position(|line| line.terminates)
        .map_or(from, |offset| from + offset)
}

fn layout(lines: &[String]) -> Result<Layout> {
    let info = scan(lines);

    let class_line = (0..lines.len())
        .find(|&i| info[i].depth_before == 0 && CLASS.is_match(&lines[i]))
        .ok_or_else(|| malformed("no class declaration found"))?;
    let class_open = (class_line..lines.len())
        .find(|&i| info[i].opens)
        .ok_or_else(|| malformed("class body is never opened"))?;
    let class_close = (class_open..lines.len())
        .find(|&i| info[i].depth_after == 0)
        .ok_or_else(|| malformed("class body is never closed"))?;
    if class_close == class_open {
        return Err(malformed("class body must span more than one line"));
    }

    let mut properties = Vec::new();
    let mut methods = Vec::new();
    let mut i = class_open + 1;
    while i < class_close {
        if info[i].depth_before != 1 {
            i += 1;
            continue;
        }

        let line = &lines[i];
        if let Some(caps) = METHOD.captures(line) {
            let end = method_end(&info, i, class_close);
            methods.push(Member {
                name: caps[1].to_string(),
                start: attached_start(lines, i, class_open),
                line: i,
                end,
            });
            i = end + 1;
        } else if let Some(caps) = PROPERTY.captures(line) {
            let end = statement_end(&info, i, class_close);
            properties.push(Member {
                name: caps[1].to_string(),
                start: attached_start(lines, i, class_open),
                line: i,
                end,
            });
            i = end + 1;
        } else {
            i += 1;
        }
    }

    Ok(Layout {
        class_open,
        class_close,
        properties,
        methods,
    })
}

fn attribute(orm: &str, name: &str, arguments: &[String]) -> String {
    if arguments.is_empty() {
        format!("{orm}\\{name}")
    } else {
        format!("{orm}\\{name}({})", arguments.join(", "))
    }
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

#[derive(Debug, Serialize)]
struct PropertyBlock<'a> {
    name: &'a str,
    attributes: Vec<String>,
    php_type: String,
    default_null: bool,
    collection_of: Option<String>,
}

struct CollectionMembers<'a> {
    property: &'a str,
    attribute: String,
    target: String,
    collection: String,
    sync_add: Option<String>,
    sync_remove: Option<String>,
    /// Getter and setter of the owning many-to-one on the item
    owning_accessors: Option<(String, String)>,
}

/// [`SourceMutator`] for PHP classes mapped with Doctrine attributes
#[derive(Debug)]
pub struct PhpClassManipulator {
    lines: Vec<String>,
    namespace: String,
    class_name: String,
    overwrite: bool,
    trailing_newline: bool,
    templates: TemplateRegistry,
}

impl PhpClassManipulator {
    /// Fully-qualified name of the class being edited
    #[must_use]
    pub fn class_name(&self) -> String {
        if self.namespace.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}\\{}", self.namespace, self.class_name)
        }
    }

    fn layout(&self) -> Result<Layout> {
        layout(&self.lines)
    }

    fn imports(&self) -> Vec<Import> {
        self.lines
            .iter()
            .enumerate()
            .take_while(|(_, line)| !CLASS.is_match(line))
            .filter_map(|(line, text)| {
                let caps = USE.captures(text)?;
                let path = caps[1].to_string();
                let alias = caps.get(2).map_or_else(
                    || Naming::short_class_name(&path).to_string(),
                    |alias| alias.as_str().to_string(),
                );
                Some(Import { line, path, alias })
            })
            .collect()
    }

    fn add_use_statement(&mut self, path: &str, alias: Option<&str>) {
        let statement = alias.map_or_else(
            || format!("use {path};"),
            |alias| format!("use {path} as {alias};"),
        );
        let imports = self.imports();

        if imports.is_empty() {
            let anchor = self
                .lines
                .iter()
                .position(|line| NAMESPACE.is_match(line))
                .or_else(|| self.lines.iter().position(|line| line.starts_with("<?php")));
            let at = anchor.map_or(0, |line| line + 1);

            let mut block = vec![String::new(), statement];
            if self.lines.get(at).is_some_and(|next| !next.trim().is_empty()) {
                block.push(String::new());
            }
            self.lines.splice(at..at, block);
            return;
        }

        let key = path.to_ascii_lowercase();
        let at = imports
            .iter()
            .find(|import| import.path.to_ascii_lowercase() > key)
            .map_or_else(
                || imports.last().map_or(0, |import| import.line + 1),
                |import| import.line,
            );
        self.lines.insert(at, statement);
    }

    /// Name to use for `class` inside this file, importing it when needed
    fn class_reference(&mut self, class: &str) -> String {
        let class = class.trim_start_matches('\\');
        if class == self.class_name() {
            return "self".to_string();
        }

        let short = Naming::short_class_name(class);
        let namespace = Naming::namespace_of(class);
        if namespace.is_empty() {
            return format!("\\{class}");
        }

        let imports = self.imports();
        if let Some(import) = imports.iter().find(|import| import.path == class) {
            return import.alias.clone();
        }
        if short == self.class_name || imports.iter().any(|import| import.alias == short) {
            return format!("\\{class}");
        }

        if namespace != self.namespace {
            self.add_use_statement(class, None);
        }
        short.to_string()
    }

    fn orm(&mut self) -> String {
        if let Some(import) = self
            .imports()
            .into_iter()
            .find(|import| import.path == ORM_MAPPING)
        {
            return import.alias;
        }
        self.add_use_statement(ORM_MAPPING, Some("ORM"));
        "ORM".to_string()
    }

    fn has_property(&self, name: &str) -> bool {
        self.property_names().iter().any(|property| property == name)
    }

    /// Insert after the last property, or at the top of the class body
    fn insert_member_block(&mut self, mut block: Vec<String>) -> Result<()> {
        let layout = self.layout()?;
        if let Some(last) = layout.properties.last() {
            let at = last.end + 1;
            self.lines
                .splice(at..at, std::iter::once(String::new()).chain(block));
            return Ok(());
        }

        let at = layout.class_open + 1;
        if at < layout.class_close && !self.lines[at].trim().is_empty() {
            block.push(String::new());
        }
        self.lines.splice(at..at, block);
        Ok(())
    }

    fn insert_method_block(&mut self, block: Vec<String>) -> Result<()> {
        let layout = self.layout()?;
        let at = layout.class_close;
        let needs_gap =
            at - 1 != layout.class_open && !self.lines[at - 1].trim().is_empty();

        if needs_gap {
            self.lines
                .splice(at..at, std::iter::once(String::new()).chain(block));
        } else {
            self.lines.splice(at..at, block);
        }
        Ok(())
    }

    fn add_property(&mut self, property: &PropertyBlock<'_>) -> Result<()> {
        if self.has_property(property.name) {
            tracing::debug!(class = %self.class_name(), property = property.name, "property exists, not redeclaring");
            return Ok(());
        }
        let block = self.templates.render_lines(templates::PROPERTY, property)?;
        self.insert_member_block(block)
    }

    fn upsert_method(&mut self, name: &str, block: Vec<String>) -> Result<()> {
        let layout = self.layout()?;
        if let Some(existing) = layout
            .methods
            .iter()
            .find(|method| method.name.eq_ignore_ascii_case(name))
        {
            if self.overwrite {
                self.lines.splice(existing.start..=existing.end, block);
            } else {
                tracing::warn!(class = %self.class_name(), method = name, "method exists and overwrite is disabled, keeping it");
            }
            return Ok(());
        }
        self.insert_method_block(block)
    }

    fn add_getter(
        &mut self,
        property: &str,
        return_type: &str,
        collection_of: Option<&str>,
    ) -> Result<()> {
        let method = format!("get{}", Naming::accessor_suffix(property));
        let block = self.templates.render_lines(
            templates::GETTER,
            context! { method => &method, return_type, property, collection_of },
        )?;
        self.upsert_method(&method, block)
    }

    fn add_setter(&mut self, property: &str, param_type: &str) -> Result<()> {
        let method = format!("set{}", Naming::accessor_suffix(property));
        let block = self.templates.render_lines(
            templates::SETTER,
            context! { method => &method, param_type, property },
        )?;
        self.upsert_method(&method, block)
    }

    fn initialize_collection(&mut self, property: &str) -> Result<()> {
        let array_collection = self.class_reference(ARRAY_COLLECTION);
        let layout = self.layout()?;

        let Some(constructor) = layout
            .methods
            .iter()
            .find(|method| method.name.eq_ignore_ascii_case("__construct"))
        else {
            let block = self.templates.render_lines(
                templates::CONSTRUCTOR,
                context! { collections => vec![property], array_collection },
            )?;
            return self.insert_member_block(block);
        };

        let assignment = format!("$this->{property} = new");
        if self.lines[constructor.start..=constructor.end]
            .iter()
            .any(|line| line.contains(&assignment))
        {
            return Ok(());
        }

        let indent = leading_whitespace(&self.lines[constructor.line]).to_string();
        let statement = format!("{indent}    $this->{property} = new {array_collection}();");
        let close = constructor.end;

        if self.lines[close].trim() == "}" {
            self.lines.insert(close, statement);
        } else if let Some(signature) = self.lines[close].trim_end().strip_suffix("{}") {
            let signature = signature.trim_end().to_string();
            self.lines.splice(
                close..=close,
                [signature, format!("{indent}{{"), statement, format!("{indent}}}")],
            );
        } else {
            return Err(malformed(format!(
                "cannot extend the constructor of {}",
                self.class_name()
            )));
        }
        Ok(())
    }

    fn add_collection(&mut self, members: CollectionMembers<'_>) -> Result<()> {
        self.add_property(&PropertyBlock {
            name: members.property,
            attributes: vec![members.attribute],
            php_type: members.collection.clone(),
            default_null: false,
            collection_of: Some(members.target.clone()),
        })?;
        self.initialize_collection(members.property)?;
        self.add_getter(members.property, &members.collection, Some(&members.target))?;

        let item = Naming::singular_camel_case(members.property);
        let suffix = Naming::accessor_suffix(&item);

        let adder = format!("add{suffix}");
        let block = self.templates.render_lines(
            templates::ADDER,
            context! {
                method => &adder,
                item_type => &members.target,
                item => &item,
                property => members.property,
                sync_method => &members.sync_add,
            },
        )?;
        self.upsert_method(&adder, block)?;

        let remover = format!("remove{suffix}");
        let (owning_getter, owning_setter) = members.owning_accessors.unzip();
        let block = self.templates.render_lines(
            templates::REMOVER,
            context! {
                method => &remover,
                item_type => &members.target,
                item => &item,
                property => members.property,
                sync_method => &members.sync_remove,
                owning_getter,
                owning_setter,
            },
        )?;
        self.upsert_method(&remover, block)
    }
}

impl SourceMutator for PhpClassManipulator {
    fn load(source: &str, overwrite: bool) -> Result<Self> {
        let lines: Vec<String> = source.lines().map(str::to_string).collect();
        let namespace = lines
            .iter()
            .find_map(|line| NAMESPACE.captures(line).map(|caps| caps[1].to_string()))
            .unwrap_or_default();
        let class_name = lines
            .iter()
            .find_map(|line| CLASS.captures(line).map(|caps| caps[1].to_string()))
            .ok_or_else(|| malformed("no class declaration found"))?;

        let manipulator = Self {
            lines,
            namespace,
            class_name,
            overwrite,
            trailing_newline: source.ends_with('\n'),
            templates: TemplateRegistry::new()?,
        };
        manipulator.layout()?;
        Ok(manipulator)
    }

    fn property_names(&self) -> Vec<String> {
        self.layout()
            .map(|layout| layout.properties.into_iter().map(|property| property.name).collect())
            .unwrap_or_default()
    }

    fn add_scalar_field(&mut self, field: &ScalarFieldDescriptor) -> Result<()> {
        let orm = self.orm();
        let mut arguments = Vec::new();
        let php_type = match field.kind {
            ScalarKind::String => "string".to_string(),
            ScalarKind::Text => {
                let types = self.class_reference(DBAL_TYPES);
                arguments.push(format!("type: {types}::TEXT"));
                "string".to_string()
            }
            ScalarKind::Integer => "int".to_string(),
            ScalarKind::Float => "float".to_string(),
            ScalarKind::Timestamp => "\\DateTimeImmutable".to_string(),
        };
        if let Some(length) = field.length {
            arguments.push(format!("length: {length}"));
        }
        if field.nullable {
            arguments.push("nullable: true".to_string());
        }
        if field.unique {
            arguments.push("unique: true".to_string());
        }

        let nullable_type = format!("?{php_type}");
        self.add_property(&PropertyBlock {
            name: &field.name,
            attributes: vec![attribute(&orm, "Column", &arguments)],
            php_type: nullable_type.clone(),
            default_null: true,
            collection_of: None,
        })?;
        self.add_getter(&field.name, &nullable_type, None)?;

        let param_type = if field.nullable { nullable_type } else { php_type };
        self.add_setter(&field.name, &param_type)?;

        tracing::debug!(class = %self.class_name(), field = %field.name, kind = %field.kind, "added field");
        Ok(())
    }

    fn add_many_to_one(&mut self, side: &RelationSide) -> Result<()> {
        let orm = self.orm();
        let target = self.class_reference(&side.target_class);

        let mut arguments = Vec::new();
        if target == "self" {
            arguments.push("targetEntity: self::class".to_string());
        }
        if let Some(inverse) = &side.target_property {
            arguments.push(format!("inversedBy: '{inverse}'"));
        }
        let mut attributes = vec![attribute(&orm, "ManyToOne", &arguments)];
        if !side.nullable {
            attributes.push(format!("{orm}\\JoinColumn(nullable: false)"));
        }

        let nullable_type = format!("?{target}");
        self.add_property(&PropertyBlock {
            name: &side.property,
            attributes,
            php_type: nullable_type.clone(),
            default_null: true,
            collection_of: None,
        })?;
        self.add_getter(&side.property, &nullable_type, None)?;
        self.add_setter(&side.property, &nullable_type)
    }

    fn add_one_to_many(&mut self, side: &RelationSide) -> Result<()> {
        let owning_property = side.target_property.as_deref().ok_or_else(|| {
            EntityMakerError::InverseMappingInconsistency(format!(
                "one-to-many '{}' has no owning many-to-one",
                side.property
            ))
        })?;

        let orm = self.orm();
        let target = self.class_reference(&side.target_class);
        let collection = self.class_reference(COLLECTION);

        let mut arguments = vec![
            format!("targetEntity: {target}::class"),
            format!("mappedBy: '{owning_property}'"),
        ];
        if side.orphan_removal {
            arguments.push("orphanRemoval: true".to_string());
        }

        let owning_suffix = Naming::accessor_suffix(owning_property);
        self.add_collection(CollectionMembers {
            property: &side.property,
            attribute: attribute(&orm, "OneToMany", &arguments),
            target,
            collection,
            sync_add: Some(format!("set{owning_suffix}")),
            sync_remove: None,
            owning_accessors: Some((format!("get{owning_suffix}"), format!("set{owning_suffix}"))),
        })
    }

    fn add_many_to_many(&mut self, side: &RelationSide) -> Result<()> {
        let orm = self.orm();
        let target = self.class_reference(&side.target_class);
        let collection = self.class_reference(COLLECTION);

        let mut arguments = vec![format!("targetEntity: {target}::class")];
        let mut sync_add = None;
        let mut sync_remove = None;
        match (&side.target_property, side.owning) {
            (Some(other), true) => arguments.push(format!("inversedBy: '{other}'")),
            (Some(other), false) => {
                arguments.push(format!("mappedBy: '{other}'"));
                let other_suffix = Naming::accessor_suffix(&Naming::singular_camel_case(other));
                sync_add = Some(format!("add{other_suffix}"));
                sync_remove = Some(format!("remove{other_suffix}"));
            }
            (None, _) => {}
        }

        self.add_collection(CollectionMembers {
            property: &side.property,
            attribute: attribute(&orm, "ManyToMany", &arguments),
            target,
            collection,
            sync_add,
            sync_remove,
            owning_accessors: None,
        })
    }

    fn add_one_to_one(&mut self, side: &RelationSide) -> Result<()> {
        let orm = self.orm();
        let target = self.class_reference(&side.target_class);

        let mut arguments = Vec::new();
        if target == "self" {
            arguments.push("targetEntity: self::class".to_string());
        }
        if let Some(other) = &side.target_property {
            let key = if side.owning { "inversedBy" } else { "mappedBy" };
            arguments.push(format!("{key}: '{other}'"));
        }
        if side.owning {
            arguments.push("cascade: ['persist', 'remove']".to_string());
            if side.orphan_removal {
                arguments.push("orphanRemoval: true".to_string());
            }
        }
        let mut attributes = vec![attribute(&orm, "OneToOne", &arguments)];
        if side.owning && !side.nullable {
            attributes.push(format!("{orm}\\JoinColumn(nullable: false)"));
        }

        let nullable_type = format!("?{target}");
        self.add_property(&PropertyBlock {
            name: &side.property,
            attributes,
            php_type: nullable_type.clone(),
            default_null: true,
            collection_of: None,
        })?;
        self.add_getter(&side.property, &nullable_type, None)?;

        match side.target_property.as_deref().filter(|_| !side.owning) {
            Some(owning_property) => {
                let method = format!("set{}", Naming::accessor_suffix(&side.property));
                let owning_suffix = Naming::accessor_suffix(owning_property);
                let param_type = if side.nullable { nullable_type } else { target };
                let block = self.templates.render_lines(
                    templates::INVERSE_SETTER,
                    context! {
                        method => &method,
                        param_type,
                        property => &side.property,
                        nullable => side.nullable,
                        owning_getter => format!("get{owning_suffix}"),
                        owning_setter => format!("set{owning_suffix}"),
                    },
                )?;
                self.upsert_method(&method, block)
            }
            None => self.add_setter(&side.property, &nullable_type),
        }
    }

    fn rendered_source(&self) -> String {
        let mut source = self.lines.join("\n");
        if self.trailing_newline {
            source.push('\n');
        }
        source
    }
}
