//! PHP source templates
//!
//! Templates ship inside the binary and are rendered with `minijinja`. Auto-escaping is
//! disabled since the output is PHP, not HTML.

use crate::error::Result;
use minijinja::{AutoEscape, Environment};
use serde::Serialize;

/// Entity class skeleton
pub const ENTITY: &str = "entity.php";
/// Repository class skeleton
pub const REPOSITORY: &str = "repository.php";
/// Property declaration with its attributes
pub const PROPERTY: &str = "property.php";
/// Getter
pub const GETTER: &str = "getter.php";
/// Plain setter
pub const SETTER: &str = "setter.php";
/// Setter on the inverse side of a one-to-one, keeping the owning side in sync
pub const INVERSE_SETTER: &str = "inverse_setter.php";
/// Collection adder
pub const ADDER: &str = "adder.php";
/// Collection remover
pub const REMOVER: &str = "remover.php";
/// Constructor initialising collections
pub const CONSTRUCTOR: &str = "constructor.php";

const TEMPLATES: &[(&str, &str)] = &[
    (ENTITY, include_str!("../templates/entity.php.jinja")),
    (REPOSITORY, include_str!("../templates/repository.php.jinja")),
    (PROPERTY, include_str!("../templates/property.php.jinja")),
    (GETTER, include_str!("../templates/getter.php.jinja")),
    (SETTER, include_str!("../templates/setter.php.jinja")),
    (INVERSE_SETTER, include_str!("../templates/inverse_setter.php.jinja")),
    (ADDER, include_str!("../templates/adder.php.jinja")),
    (REMOVER, include_str!("../templates/remover.php.jinja")),
    (CONSTRUCTOR, include_str!("../templates/constructor.php.jinja")),
];

/// Loaded template environment
#[derive(Debug)]
pub struct TemplateRegistry {
    env: Environment<'static>,
}

impl TemplateRegistry {
    /// Load all embedded templates
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }

        Ok(Self { env })
    }

    /// Render a template to text
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or rendering fails.
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }

    /// Render a template and split it into lines
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or rendering fails.
    pub fn render_lines<S: Serialize>(&self, name: &str, context: S) -> Result<Vec<String>> {
        let rendered = self.render(name, context)?;
        Ok(rendered.trim_end().lines().map(str::to_string).collect())
    }
}
