//! Script transform: naive module bundling into one self-contained file.
//!
//! Relative `import` statements are resolved depth-first and each module is
//! emitted exactly once, dependencies before dependents. The bundle carries
//! a fixed header comment, and any occurrence of the unversioned icon-sprite
//! path is rewritten to the currently published cache-busted path at the
//! moment the transform runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use assetforge_shared::{AssetForgeError, Result};

/// Fixed header prepended to every compiled bundle.
pub const SCRIPT_HEADER: &str = "/*! assetforge bundle — generated, do not edit */\n";

/// The unversioned icon-sprite path literal that source modules reference.
pub const UNVERSIONED_SPRITE_PATH: &str = "/icons.svg";

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import[ \t]+(?:[^"'\n]+from[ \t]+)?["'](\.\.?/[^"']+)["'];?[ \t]*$"#)
        .unwrap()
});
static EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)export[ \t]+(default[ \t]+)?").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*//.*$").unwrap());
static BLANK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());

/// Options for one script compilation.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Strip full-line comments and blank lines.
    pub minify: bool,
    /// The icon-sprite path to substitute for the unversioned literal.
    pub icon_sprite_path: String,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            minify: false,
            icon_sprite_path: UNVERSIONED_SPRITE_PATH.to_string(),
        }
    }
}

/// Result of bundling one script entry point.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    /// The bundled script text.
    pub code: String,
    /// Every module read during bundling, entry point included.
    pub dependencies: Vec<PathBuf>,
}

/// Bundle a module entry point into one self-contained script.
pub fn bundle_script(entry: &Path, opts: &ScriptOptions) -> Result<ScriptOutput> {
    let mut visited = HashSet::new();
    let mut dependencies = Vec::new();
    let body = inline_module(entry, &mut visited, &mut dependencies)?;

    let mut code = body;
    if opts.icon_sprite_path != UNVERSIONED_SPRITE_PATH {
        code = code.replace(UNVERSIONED_SPRITE_PATH, &opts.icon_sprite_path);
    }
    if opts.minify {
        code = minify(&code);
    }
    code.insert_str(0, SCRIPT_HEADER);

    Ok(ScriptOutput { code, dependencies })
}

/// Emit a module's dependencies, then the module itself with import lines
/// removed and `export` keywords stripped. Each module appears once.
fn inline_module(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
    dependencies: &mut Vec<PathBuf>,
) -> Result<String> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical.clone()) {
        trace!(path = %path.display(), "module already bundled");
        return Ok(String::new());
    }
    dependencies.push(canonical);

    let content =
        std::fs::read_to_string(path).map_err(|e| AssetForgeError::io(path, e))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ts".into());

    let mut out = String::new();
    let mut stripped = String::with_capacity(content.len());
    let mut last = 0;

    for caps in IMPORT_RE.captures_iter(&content) {
        let whole = caps.get(0).unwrap();
        let target = &caps[1];

        stripped.push_str(&content[last..whole.start()]);
        last = whole.end();

        let resolved = resolve_module(dir, target, &ext).ok_or_else(|| {
            AssetForgeError::transform(path, format!("cannot resolve module \"{target}\""))
        })?;
        out.push_str(&inline_module(&resolved, visited, dependencies)?);
    }
    stripped.push_str(&content[last..]);

    out.push_str(&EXPORT_RE.replace_all(&stripped, "$1"));
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Module resolution relative to the importing file: as-written, with the
/// entry's extension, or as a directory module.
fn resolve_module(dir: &Path, target: &str, ext: &str) -> Option<PathBuf> {
    let candidates = [
        dir.join(target),
        dir.join(format!("{target}.{ext}")),
        dir.join(target).join(format!("index.{ext}")),
    ];
    candidates.into_iter().find(|c| c.is_file())
}

/// Strip full-line comments and collapse blank-line runs.
pub fn minify(code: &str) -> String {
    let no_comments = LINE_COMMENT_RE.replace_all(code, "");
    BLANK_RE.replace_all(&no_comments, "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn bundles_dependencies_before_entry() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "util.ts", "export const answer = 42;\n");
        write(
            tmp.path(),
            "widget/index.ts",
            "import { answer } from \"../util\";\nexport function widget() { return answer; }\n",
        );
        let entry = write(
            tmp.path(),
            "app.ts",
            "import { widget } from \"./widget\";\nwidget();\n",
        );

        let out = bundle_script(&entry, &ScriptOptions::default()).unwrap();
        assert!(out.code.starts_with(SCRIPT_HEADER));

        let answer_pos = out.code.find("const answer").unwrap();
        let widget_pos = out.code.find("function widget").unwrap();
        let call_pos = out.code.find("widget();").unwrap();
        assert!(answer_pos < widget_pos && widget_pos < call_pos);

        // No import statements and no export keywords survive.
        assert!(!out.code.contains("import "));
        assert!(!out.code.contains("export "));
        assert_eq!(out.dependencies.len(), 3);
    }

    #[test]
    fn shared_module_is_emitted_once() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "shared.ts", "export const once = 1;\n");
        write(tmp.path(), "a.ts", "import { once } from \"./shared\";\nconst a = once;\n");
        write(tmp.path(), "b.ts", "import { once } from \"./shared\";\nconst b = once;\n");
        let entry = write(
            tmp.path(),
            "main.ts",
            "import \"./a\";\nimport \"./b\";\n",
        );

        let out = bundle_script(&entry, &ScriptOptions::default()).unwrap();
        assert_eq!(out.code.matches("const once = 1;").count(), 1);
    }

    #[test]
    fn rewrites_unversioned_sprite_path() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = write(
            tmp.path(),
            "icons.ts",
            "const sprite = \"/icons.svg#check\";\n",
        );

        let opts = ScriptOptions {
            minify: false,
            icon_sprite_path: "/icons.ab12cd34.svg".into(),
        };
        let out = bundle_script(&entry, &opts).unwrap();
        assert!(out.code.contains("/icons.ab12cd34.svg#check"));
        assert!(!out.code.contains("\"/icons.svg"));
    }

    #[test]
    fn unpublished_sprite_path_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = write(tmp.path(), "icons.ts", "fetch(\"/icons.svg\");\n");

        let out = bundle_script(&entry, &ScriptOptions::default()).unwrap();
        assert!(out.code.contains("/icons.svg"));
    }

    #[test]
    fn minify_drops_comment_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = write(
            tmp.path(),
            "app.ts",
            "// setup\nconst a = 1;\n\n\n// more\nconst b = 2;\n",
        );

        let opts = ScriptOptions {
            minify: true,
            ..Default::default()
        };
        let out = bundle_script(&entry, &opts).unwrap();
        assert!(!out.code.contains("// setup"));
        assert!(out.code.contains("const a = 1;\nconst b = 2;"));
    }

    #[test]
    fn unresolvable_module_is_a_transform_error() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = write(tmp.path(), "app.ts", "import \"./nope\";\n");

        let err = bundle_script(&entry, &ScriptOptions::default()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
