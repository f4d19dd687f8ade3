//! Transform adapters for the asset pipeline.
//!
//! Every transform here is a pure "source text + options → output text"
//! collaborator with no pipeline state. Each one reports the full set of
//! files it actually read, which becomes the unit's watch dependency set.
//!
//! - [`style`] — stylesheet inlining, direction mirroring, minification
//! - [`script`] — module bundling with icon-path rewriting
//! - [`sprite`] — icon collection → single SVG symbol sprite
//! - [`course`] — course markdown → structured course data

pub mod course;
pub mod script;
pub mod sprite;
pub mod style;

pub use course::{CourseData, Lesson, compile_course};
pub use script::{SCRIPT_HEADER, ScriptOptions, ScriptOutput, UNVERSIONED_SPRITE_PATH, bundle_script};
pub use sprite::{SpriteOutput, assemble_sprite};
pub use style::{StyleOptions, StyleOutput, compile_style};
