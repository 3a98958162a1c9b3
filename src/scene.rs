//! The declarative scene source.
//!
//! A scene is a Lua script that defines a global `layout` table, optionally an
//! `inferred` table of type inference rules and a `preparse_layouts` table of
//! named subtrees. Each element is a Lua table: string keys are attributes,
//! the array part holds the children in order.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use mlua::{Lua, Table, Value};

use crate::element::Color;
use crate::error::{GuiError, Result};

/// Where the scene script comes from.
#[derive(Debug, Clone)]
pub enum SceneSource {
    File(PathBuf),
    Inline { name: String, source: String },
}

impl SceneSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            SceneSource::File(path) => Some(path),
            SceneSource::Inline { .. } => None,
        }
    }

    fn name(&self) -> String {
        match self {
            SceneSource::File(path) => path.display().to_string(),
            SceneSource::Inline { name, .. } => name.clone(),
        }
    }

    /// Run the script, leaving its globals in `lua`.
    ///
    /// Globals left over from a previous run are cleared first so a scene that
    /// drops, say, `preparse_layouts` does not see the old value.
    pub(crate) fn execute(&self, lua: &Lua) -> Result<()> {
        let globals = lua.globals();
        for key in ["layout", "inferred", "preparse_layouts"] {
            globals.set(key, Value::Nil)?;
        }

        let code = match self {
            SceneSource::File(path) => {
                std::fs::read_to_string(path).map_err(|source| GuiError::Io {
                    path: path.clone(),
                    source,
                })?
            }
            SceneSource::Inline { source, .. } => source.clone(),
        };

        lua.load(code.as_str()).set_name(self.name()).exec()?;
        Ok(())
    }
}

/// Attribute lookup on one element with fallback to the active defaults.
///
/// A key present on the element always wins, even when its value has the
/// wrong type; the defaults table is only consulted for absent keys.
#[derive(Clone, Copy)]
pub struct Attributes<'a> {
    element: &'a Table,
    defaults: Option<&'a Table>,
}

impl<'a> Attributes<'a> {
    pub fn new(element: &'a Table, defaults: Option<&'a Table>) -> Self {
        Self { element, defaults }
    }

    pub fn element(&self) -> &'a Table {
        self.element
    }

    /// Raw value for `key`, `Nil` when neither table has it.
    pub fn value(&self, key: &str) -> Value {
        match self.element.get::<Value>(key) {
            Ok(Value::Nil) | Err(_) => self
                .defaults
                .and_then(|defaults| defaults.get::<Value>(key).ok())
                .unwrap_or(Value::Nil),
            Ok(value) => value,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        !self.value(key).is_nil()
    }

    pub fn number(&self, key: &str) -> Option<f32> {
        as_number(&self.value(key))
    }

    pub fn integer(&self, key: &str) -> Option<i32> {
        self.number(key).map(|value| value as i32)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.value(key) {
            Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> Option<String> {
        match self.value(key) {
            Value::String(value) => Some(value.to_string_lossy().to_string()),
            Value::Integer(value) => Some(value.to_string()),
            Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn color(&self, key: &str) -> Option<Color> {
        parse_color(&self.value(key))
    }

    pub fn table(&self, key: &str) -> Option<Table> {
        match self.value(key) {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Map a string attribute onto one of `options`.
    pub fn choice<T: Copy>(&self, key: &str, options: &[(&str, T)]) -> Option<T> {
        let value = self.string(key)?;
        let found = options
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, choice)| *choice);
        if found.is_none() {
            log::warn!("Unrecognized value \"{}\" for attribute \"{}\"", value, key);
        }
        found
    }

    pub fn number_or(&self, key: &str, otherwise: f32) -> f32 {
        self.number(key).unwrap_or(otherwise)
    }

    pub fn integer_or(&self, key: &str, otherwise: i32) -> i32 {
        self.integer(key).unwrap_or(otherwise)
    }

    pub fn boolean_or(&self, key: &str, otherwise: bool) -> bool {
        self.boolean(key).unwrap_or(otherwise)
    }

    pub fn string_or(&self, key: &str, otherwise: &str) -> String {
        self.string(key).unwrap_or_else(|| otherwise.to_string())
    }

    pub fn color_or(&self, key: &str, otherwise: Color) -> Color {
        self.color(key).unwrap_or(otherwise)
    }

    pub fn choice_or<T: Copy>(&self, key: &str, options: &[(&str, T)], otherwise: T) -> T {
        self.choice(key, options).unwrap_or(otherwise)
    }
}

fn as_number(value: &Value) -> Option<f32> {
    match value {
        Value::Integer(value) => Some(*value as f32),
        Value::Number(value) => Some(*value as f32),
        Value::String(value) => value.to_string_lossy().trim().parse().ok(),
        _ => None,
    }
}

/// Parse a color from any of the accepted forms:
///
/// - an array `{r, g, b, a}` (up to four components, missing alpha is 255)
/// - a keyed table using `r`/`red`, `g`/`green`, `b`/`blue`, `a`/`alpha`
/// - a hex string `"#RRGGBB[AA]"` or `"0xRRGGBB[AA]"`
pub fn parse_color(value: &Value) -> Option<Color> {
    let mut components = [0_u8, 0, 0, 255];
    let component = |value: &Value| as_number(value).map(|v| v.clamp(0.0, 255.0) as u8);

    match value {
        Value::Table(table) => {
            let count = table.raw_len().min(4);
            if count > 0 {
                for (index, slot) in components.iter_mut().enumerate().take(count) {
                    let value = table.raw_get::<Value>(index + 1).ok()?;
                    *slot = component(&value).unwrap_or(0);
                }
            } else {
                for pair in table.pairs::<String, Value>() {
                    let Ok((key, value)) = pair else { continue };
                    let index = match key.as_str() {
                        "r" | "red" => 0,
                        "g" | "green" => 1,
                        "b" | "blue" => 2,
                        "a" | "alpha" => 3,
                        _ => continue,
                    };
                    if let Some(value) = component(&value) {
                        components[index] = value;
                    }
                }
            }
        }
        Value::String(text) => {
            let text = text.to_string_lossy().to_string();
            let digits = text
                .strip_prefix('#')
                .or_else(|| text.strip_prefix("0x"))
                .unwrap_or(&text);
            // Up to four byte pairs; an odd trailing digit is ignored.
            let pairs = (digits.len() / 2).min(4);
            for (index, slot) in components.iter_mut().enumerate().take(pairs) {
                let pair = digits.get(index * 2..index * 2 + 2)?;
                *slot = u8::from_str_radix(pair, 16).ok()?;
            }
        }
        _ => return None,
    }

    let [r, g, b, a] = components;
    Some(Color::rgba(r, g, b, a))
}

/// "If every one of these keys is present, the element is of this type."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRule {
    pub type_name: String,
    pub keys: Vec<String>,
}

/// Read the `inferred` table.
///
/// The table is an array; every entry maps type names to either one key or an
/// array of keys. Array order is kept, entries inside one table are ordered by
/// type name since Lua does not preserve key order.
pub fn parse_inference_rules(inferred: &Table) -> mlua::Result<Vec<InferenceRule>> {
    let mut rules = Vec::new();

    for group in inferred.sequence_values::<Value>() {
        let Value::Table(group) = group? else {
            continue;
        };

        let mut group_rules = Vec::new();
        for pair in group.pairs::<String, Value>() {
            let (type_name, keys) = pair?;
            let keys = match keys {
                Value::String(key) => vec![key.to_string_lossy().to_string()],
                Value::Table(keys) => keys
                    .sequence_values::<Value>()
                    .filter_map(|key| match key {
                        Ok(Value::String(key)) => Some(key.to_string_lossy().to_string()),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };

            if keys.is_empty() {
                log::warn!("Ignoring inference rule for \"{}\" without keys", type_name);
                continue;
            }
            group_rules.push(InferenceRule { type_name, keys });
        }

        group_rules.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        rules.extend(group_rules);
    }

    Ok(rules)
}

/// First rule whose keys are all present on `element`.
pub fn infer_type<'r>(rules: &'r [InferenceRule], element: &Table) -> Option<&'r str> {
    rules
        .iter()
        .find(|rule| {
            rule.keys
                .iter()
                .all(|key| !matches!(element.get::<Value>(key.as_str()), Ok(Value::Nil) | Err(_)))
        })
        .map(|rule| rule.type_name.as_str())
}

/// Scoped defaults used while parsing.
///
/// An element's `defaults` table replaces the active defaults for its subtree;
/// `inherited_defaults` is layered over the active defaults into a new table.
#[derive(Default)]
pub struct DefaultsStack {
    stack: Vec<Table>,
}

impl DefaultsStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the defaults declared by `element`, if any. Returns whether a
    /// table was pushed and [`exit`](Self::exit) must be called afterwards.
    pub fn enter(&mut self, lua: &Lua, element: &Table) -> mlua::Result<bool> {
        if let Value::Table(defaults) = element.get::<Value>("defaults")? {
            self.stack.push(defaults);
            return Ok(true);
        }

        if let Value::Table(inherited) = element.get::<Value>("inherited_defaults")? {
            let merged = lua.create_table()?;
            if let Some(top) = self.stack.last() {
                for pair in top.pairs::<Value, Value>() {
                    let (key, value) = pair?;
                    merged.raw_set(key, value)?;
                }
            }
            for pair in inherited.pairs::<Value, Value>() {
                let (key, value) = pair?;
                merged.raw_set(key, value)?;
            }
            self.stack.push(merged);
            return Ok(true);
        }

        Ok(false)
    }

    pub fn exit(&mut self) {
        self.stack.pop();
    }

    pub fn top(&self) -> Option<&Table> {
        self.stack.last()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

/// Child element tables, in order.
pub fn child_tables(element: &Table) -> Vec<Table> {
    element
        .sequence_values::<Value>()
        .filter_map(|value| match value {
            Ok(Value::Table(table)) => Some(table),
            _ => None,
        })
        .collect()
}

/// Human readable dump of an element, one level of nesting deep.
pub fn dump_element(element: &Table) -> String {
    let mut out = String::from("Dumped element:\n");
    for pair in element.pairs::<Value, Value>() {
        let Ok((key, value)) = pair else { continue };
        let _ = write!(out, "{} = ", describe_key(&key));
        match value {
            Value::Table(table) => {
                out.push_str("{\n");
                for pair in table.pairs::<Value, Value>() {
                    let Ok((key, value)) = pair else { continue };
                    let _ = writeln!(out, "    {} = {}", describe_key(&key), describe_value(&value));
                }
                out.push_str("}\n");
            }
            value => {
                let _ = writeln!(out, "{}", describe_value(&value));
            }
        }
    }
    out
}

fn describe_key(key: &Value) -> String {
    match key {
        Value::Integer(index) => format!("[{}]", index),
        Value::Number(index) => format!("[{}]", index),
        Value::String(key) => key.to_string_lossy().to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Boolean(value) => value.to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Number(value) => value.to_string(),
        Value::String(value) => format!("\"{}\"", value.to_string_lossy()),
        Value::Table(table) => format!("{{ table with {} members }}", table.raw_len()),
        other => format!("<{}>", other.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(lua: &Lua, source: &str) -> Table {
        lua.load(source).eval::<Table>().unwrap()
    }

    #[test]
    fn test_attributes_fall_back_to_defaults() {
        let lua = Lua::new();
        let element = eval(&lua, "return { width = 10, label = 'ok', flag = 'nope' }");
        let defaults = eval(&lua, "return { width = 99, height = 20, flag = true }");
        let attributes = Attributes::new(&element, Some(&defaults));

        assert_eq!(attributes.number("width"), Some(10.0));
        assert_eq!(attributes.integer("height"), Some(20));
        assert_eq!(attributes.string("label").as_deref(), Some("ok"));
        // Present with the wrong type: defaults are not consulted.
        assert_eq!(attributes.boolean("flag"), None);
        assert_eq!(attributes.number_or("missing", 4.5), 4.5);
    }

    #[test]
    fn test_numeric_strings_are_numbers() {
        let lua = Lua::new();
        let element = eval(&lua, "return { size = '12.5' }");
        assert_eq!(Attributes::new(&element, None).number("size"), Some(12.5));
    }

    #[test]
    fn test_choice() {
        let lua = Lua::new();
        let element = eval(&lua, "return { align = 'right', other = 'sideways' }");
        let attributes = Attributes::new(&element, None);
        let options = [("left", 0), ("center", 1), ("right", 2)];

        assert_eq!(attributes.choice("align", &options), Some(2));
        assert_eq!(attributes.choice_or("other", &options, 0), 0);
    }

    #[test]
    fn test_parse_color_forms() {
        let lua = Lua::new();
        let colors = eval(
            &lua,
            r##"return {
                array = { 10, 20, 30 },
                keyed = { red = 1, g = 2, blue = 3, alpha = 4 },
                hex = "#FF8000",
                hex_alpha = "0x01020304",
            }"##,
        );

        let color = |key: &str| parse_color(&colors.get::<Value>(key).unwrap());
        assert_eq!(color("array"), Some(Color::rgba(10, 20, 30, 255)));
        assert_eq!(color("keyed"), Some(Color::rgba(1, 2, 3, 4)));
        assert_eq!(color("hex"), Some(Color::rgba(255, 128, 0, 255)));
        assert_eq!(color("hex_alpha"), Some(Color::rgba(1, 2, 3, 4)));
        assert_eq!(parse_color(&Value::Boolean(true)), None);
    }

    #[test]
    fn test_inference_rules_first_match_wins() {
        let lua = Lua::new();
        let inferred = eval(
            &lua,
            r#"return {
                { slider = { "min", "max" } },
                { button = "text", label = "text" },
            }"#,
        );
        let rules = parse_inference_rules(&inferred).unwrap();
        let names: Vec<_> = rules.iter().map(|rule| rule.type_name.as_str()).collect();
        assert_eq!(names, ["slider", "button", "label"]);

        let element = eval(&lua, "return { text = 'hi', min = 0 }");
        assert_eq!(infer_type(&rules, &element), Some("button"));

        let element = eval(&lua, "return { text = 'hi', min = 0, max = 1 }");
        assert_eq!(infer_type(&rules, &element), Some("slider"));

        let element = eval(&lua, "return { color = 'red' }");
        assert_eq!(infer_type(&rules, &element), None);
    }

    #[test]
    fn test_inherited_defaults_layer_over_parent() {
        let lua = Lua::new();
        let parent = eval(&lua, "return { defaults = { a = 2, b = 3 } }");
        let child = eval(&lua, "return { inherited_defaults = { a = 1 } }");
        let plain = eval(&lua, "return {}");

        let mut stack = DefaultsStack::new();
        assert!(stack.enter(&lua, &parent).unwrap());
        assert!(stack.enter(&lua, &child).unwrap());
        {
            let top = stack.top().unwrap();
            assert_eq!(top.get::<i64>("a").unwrap(), 1);
            assert_eq!(top.get::<i64>("b").unwrap(), 3);
        }
        stack.exit();

        assert!(!stack.enter(&lua, &plain).unwrap());
        let top = stack.top().unwrap();
        assert_eq!(top.get::<i64>("a").unwrap(), 2);

        // The parent's table is left untouched by the merge.
        let parent_defaults: Table = parent.get("defaults").unwrap();
        assert_eq!(parent_defaults.get::<i64>("a").unwrap(), 2);
    }

    #[test]
    fn test_child_tables_skip_non_tables() {
        let lua = Lua::new();
        let element = eval(&lua, "return { type = 'x', {}, 'text', { name = 'b' } }");
        assert_eq!(child_tables(&element).len(), 2);
    }

    #[test]
    fn test_dump_element_mentions_keys() {
        let lua = Lua::new();
        let element = eval(&lua, "return { type = 'mystery', { w = 1 } }");
        let dump = dump_element(&element);
        assert!(dump.contains("type = \"mystery\""));
        assert!(dump.contains("w = 1"));
    }

    #[test]
    fn test_execute_resets_scene_globals() {
        let lua = Lua::new();
        let first = SceneSource::Inline {
            name: "first".into(),
            source: "layout = {} preparse_layouts = {}".into(),
        };
        let second = SceneSource::Inline {
            name: "second".into(),
            source: "layout = {}".into(),
        };

        first.execute(&lua).unwrap();
        second.execute(&lua).unwrap();
        assert!(lua
            .globals()
            .get::<Value>("preparse_layouts")
            .unwrap()
            .is_nil());
    }
}
