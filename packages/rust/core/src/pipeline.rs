//! End-to-end asset pipeline: overlay resolution → icon sprite → scripts,
//! polyfills and styles → course content → sitemap.
//!
//! Six ordered stage groups, concurrent within a group and sequenced
//! between groups only where a real data dependency exists: the icon stage
//! completes before any script task is spawned (it publishes the
//! cache-busted sprite path every script compilation reads), and the
//! sitemap renders only after the course stage has settled.
//!
//! Every unit task is wrapped so a failure is captured and logged with the
//! unit's identity; a failing task never blocks or cancels siblings in its
//! stage group.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use assetforge_resolver::{OverlayLayer, enumerate_courses, resolve_units};
use assetforge_shared::{
    AppConfig, AssetForgeError, AssetKind, AssetUnit, BuildResult, Catalog, CourseRef, Locale,
    Result, load_catalog,
};
use assetforge_transforms::{
    SCRIPT_HEADER, ScriptOptions, StyleOptions, assemble_sprite, bundle_script, compile_style,
    script,
};

use crate::courses::{self, CourseOutcome};
use crate::fanout::{fan_out, write_text};
use crate::registry::{CacheBustRegistry, content_hash8};
use crate::sitemap::SitemapAggregator;
use crate::watch::{RebuildFn, RebuildOutcome, WatchInvalidator};

/// Unit identity of the singleton sprite stage.
const SPRITE_UNIT_ID: &str = "icon:sprite";
/// Unit identity of the singleton polyfill bundle.
const POLYFILL_UNIT_ID: &str = "polyfill:polyfills.js";
/// Unit identity of the final sitemap stage.
const SITEMAP_UNIT_ID: &str = "sitemap:sitemap.xml";

// ---------------------------------------------------------------------------
// Options, context, reporting
// ---------------------------------------------------------------------------

/// Options for one `build_assets` invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Minify compiled scripts and styles.
    pub minify: bool,
    /// Keep running and rebuild affected units on file change.
    pub watch: bool,
    /// Locales to fan out to; empty means the configured enabled set.
    pub locales: Vec<Locale>,
}

/// Immutable per-run state shared by every stage and rebuild closure.
pub struct PipelineContext {
    pub config: AppConfig,
    pub layer: OverlayLayer,
    pub registry: CacheBustRegistry,
    pub catalog: Catalog,
    pub minify: bool,
    /// Effective locale list for this run, default locale included.
    pub locales: Vec<Locale>,
}

impl PipelineContext {
    /// Build the run context: effective locales, translation catalogs,
    /// overlay layer, a fresh registry.
    pub fn new(config: AppConfig, opts: &BuildOptions) -> Result<Arc<Self>> {
        let locales = if opts.locales.is_empty() {
            config.locales.enabled.clone()
        } else {
            opts.locales.clone()
        };
        let catalog = load_catalog(&config.paths.i18n_dir, &locales)?;
        let layer = OverlayLayer::new(&config.paths.base_root, &config.paths.overlay_root);

        Ok(Arc::new(Self {
            config,
            layer,
            registry: CacheBustRegistry::new(),
            catalog,
            minify: opts.minify,
            locales,
        }))
    }

    fn out_root(&self) -> &Path {
        &self.config.paths.output_root
    }

    fn default_locale(&self) -> &Locale {
        &self.config.locales.default
    }
}

/// Per-run summary, consumed by the CLI printout.
#[derive(Debug)]
pub struct BuildSummary {
    /// One entry per settled unit, across all stages.
    pub results: Vec<BuildResult>,
    /// Total wall-clock time.
    pub elapsed: Duration,
}

impl BuildSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BuildResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Progress callback for reporting pipeline status.
pub trait BuildReporter: Send + Sync {
    /// Called when entering a new stage group.
    fn phase(&self, name: &str);
    /// Called when a unit settles, success or failure.
    fn unit_finished(&self, result: &BuildResult);
    /// Called when the pipeline completes.
    fn done(&self, summary: &BuildSummary);
}

/// No-op reporter for headless/test usage.
pub struct SilentReporter;

impl BuildReporter for SilentReporter {
    fn phase(&self, _name: &str) {}
    fn unit_finished(&self, _result: &BuildResult) {}
    fn done(&self, _summary: &BuildSummary) {}
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the full asset build.
///
/// Per-unit failures are captured and reported, never thrown — the call
/// settles every stage. Under `opts.watch` it then watches the source
/// roots and never returns.
#[instrument(skip_all, fields(minify = opts.minify, watch = opts.watch))]
pub async fn build_assets(
    config: AppConfig,
    opts: &BuildOptions,
    reporter: &dyn BuildReporter,
) -> Result<BuildSummary> {
    let ctx = PipelineContext::new(config, opts)?;
    let invalidator = opts.watch.then(|| Arc::new(WatchInvalidator::new()));

    let summary = run_pipeline(&ctx, reporter, invalidator.as_ref()).await?;
    reporter.done(&summary);

    if let Some(invalidator) = invalidator {
        let roots = vec![
            ctx.layer.base.clone(),
            ctx.layer.overlay.clone(),
            ctx.config.paths.content_root.clone(),
        ];
        info!(
            registrations = invalidator.registration_count(),
            "entering watch mode"
        );
        invalidator.run(&roots).await?;
    }

    Ok(summary)
}

/// One full pass over all six stage groups.
async fn run_pipeline(
    ctx: &Arc<PipelineContext>,
    reporter: &dyn BuildReporter,
    invalidator: Option<&Arc<WatchInvalidator>>,
) -> Result<BuildSummary> {
    let start = Instant::now();
    let mut results: Vec<BuildResult> = Vec::new();

    // --- Stage 1: icon sprite ---
    // Must fully settle before any script task spawns: it publishes the
    // cache-busted path every script compilation reads.
    reporter.phase("Assembling icon sprite");
    let sprite_rebuild = sprite_rebuild_fn(ctx.clone());
    let built = sprite_rebuild().await;
    register(invalidator, &built, &sprite_rebuild);
    reporter.unit_finished(&built.result);
    results.push(built.result);

    // --- Stages 2–4: scripts, polyfill bundle, styles, course assets ---
    // Mutually concurrent; the group settles all-settled.
    reporter.phase("Compiling scripts and styles");
    let courses = enumerate_courses(&ctx.config.paths.content_root);
    let planned = plan_concurrent_units(ctx, &courses)?;

    let mut set: JoinSet<(RebuildOutcome, RebuildFn)> = JoinSet::new();
    for rebuild in planned {
        let task_rebuild = rebuild.clone();
        set.spawn(async move {
            let built = task_rebuild().await;
            (built, rebuild)
        });
    }
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((built, rebuild)) => {
                register(invalidator, &built, &rebuild);
                reporter.unit_finished(&built.result);
                results.push(built.result);
            }
            Err(e) => {
                warn!(error = %e, "unit task failed to join");
                results.push(BuildResult::failed("task", e.to_string(), Duration::ZERO));
            }
        }
    }

    // --- Stage 5: course content, strictly serialized ---
    reporter.phase("Compiling course content");
    let course_outcome = courses::run_all(ctx, &courses, invalidator).await;
    for result in &course_outcome.results {
        reporter.unit_finished(result);
    }

    // --- Stage 6: sitemap, after every course unit has settled ---
    // Runs regardless of upstream failures: a partially broken build still
    // gets a sitemap reflecting whatever courses succeeded.
    reporter.phase("Generating sitemap");
    let sitemap_result = build_sitemap(ctx, &course_outcome);
    reporter.unit_finished(&sitemap_result);

    results.extend(course_outcome.results);
    results.push(sitemap_result);

    let summary = BuildSummary {
        results,
        elapsed: start.elapsed(),
    };
    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        elapsed_ms = summary.elapsed.as_millis(),
        "pipeline settled"
    );
    Ok(summary)
}

fn register(
    invalidator: Option<&Arc<WatchInvalidator>>,
    built: &RebuildOutcome,
    rebuild: &RebuildFn,
) {
    if let Some(invalidator) = invalidator {
        invalidator.register(
            &built.result.unit_id,
            built.dependencies.clone(),
            rebuild.clone(),
        );
    }
}

/// Everything that runs in the concurrent group: top-level script units,
/// the polyfill bundle, top-level style units, and per-course assets.
fn plan_concurrent_units(
    ctx: &Arc<PipelineContext>,
    courses: &[CourseRef],
) -> Result<Vec<RebuildFn>> {
    let mut planned: Vec<RebuildFn> = Vec::new();

    let script_units = resolve_units(
        &ctx.config.build.script_pattern,
        &ctx.layer,
        AssetKind::Script,
        ctx.out_root(),
    )?;
    let style_units = resolve_units(
        &ctx.config.build.style_pattern,
        &ctx.layer,
        AssetKind::Style,
        ctx.out_root(),
    )?;

    for unit in script_units {
        planned.push(script_rebuild_fn(ctx.clone(), unit));
    }
    if !ctx.config.build.polyfills.is_empty() {
        planned.push(polyfill_rebuild_fn(ctx.clone()));
    }
    for unit in style_units {
        // Underscore-prefixed stylesheets are partials, pulled in by an
        // entry point's imports rather than compiled standalone.
        let is_partial = unit
            .source
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('_'));
        if !is_partial {
            planned.push(style_rebuild_fn(ctx.clone(), unit));
        }
    }
    for unit in course_asset_units(ctx, courses) {
        let rebuild = match unit.kind {
            AssetKind::Script => script_rebuild_fn(ctx.clone(), unit),
            _ => style_rebuild_fn(ctx.clone(), unit),
        };
        planned.push(rebuild);
    }

    info!(units = planned.len(), "concurrent stage group planned");
    Ok(planned)
}

/// Per-course `index.<ext>` script and style entries, compiled into
/// `content/<courseId>/`.
fn course_asset_units(
    ctx: &PipelineContext,
    courses: &[CourseRef],
) -> Vec<AssetUnit> {
    let script_ext = pattern_ext(&ctx.config.build.script_pattern, "ts");
    let style_ext = pattern_ext(&ctx.config.build.style_pattern, "scss");
    let mut units = Vec::new();

    for course in courses {
        let out_dir = ctx.out_root().join("content").join(&course.id);

        let script = course.dir.join(format!("index.{script_ext}"));
        if script.is_file() {
            units.push(AssetUnit::new(script, out_dir.join("index.js"), AssetKind::Script));
        }
        let style = course.dir.join(format!("index.{style_ext}"));
        if style.is_file() {
            units.push(AssetUnit::new(style, out_dir.join("index.css"), AssetKind::Style));
        }
    }

    units
}

fn pattern_ext<'a>(pattern: &'a str, fallback: &'a str) -> &'a str {
    pattern.rsplit_once('.').map_or(fallback, |(_, ext)| ext)
}

// ---------------------------------------------------------------------------
// Sprite stage
// ---------------------------------------------------------------------------

fn sprite_rebuild_fn(ctx: Arc<PipelineContext>) -> RebuildFn {
    Arc::new(move || {
        let ctx = ctx.clone();
        Box::pin(async move { build_sprite_unit(&ctx).await })
    })
}

async fn build_sprite_unit(ctx: &PipelineContext) -> RebuildOutcome {
    let start = Instant::now();
    // Directory-level dependencies so newly added icons retrigger the unit.
    let dependencies = vec![
        ctx.layer.base.join(&ctx.config.build.icons_dir),
        ctx.layer.overlay.join(&ctx.config.build.icons_dir),
    ];

    let result = match sprite_inner(ctx) {
        Ok(count) => {
            info!(icons = count, "sprite stage complete");
            BuildResult::ok(SPRITE_UNIT_ID, start.elapsed())
        }
        Err(e) => {
            warn!(unit_id = SPRITE_UNIT_ID, error = %e, "sprite stage failed");
            BuildResult::failed(SPRITE_UNIT_ID, e.to_string(), start.elapsed())
        }
    };

    RebuildOutcome {
        result,
        dependencies,
    }
}

fn sprite_inner(ctx: &PipelineContext) -> Result<usize> {
    let pattern = format!("{}/*.svg", ctx.config.build.icons_dir);
    let units = resolve_units(&pattern, &ctx.layer, AssetKind::Icon, ctx.out_root())?;
    let sources: Vec<PathBuf> = units.into_iter().map(|u| u.source).collect();

    let sprite = assemble_sprite(&sources)?;
    write_text(&ctx.out_root().join("icons.svg"), &sprite.svg)?;

    // The hashed variant is published for script output to reference; only
    // the unversioned file is written.
    let hash = content_hash8(sprite.svg.as_bytes());
    ctx.registry.publish(&hash);
    Ok(sprite.symbol_count)
}

// ---------------------------------------------------------------------------
// Script stage
// ---------------------------------------------------------------------------

fn script_rebuild_fn(ctx: Arc<PipelineContext>, unit: AssetUnit) -> RebuildFn {
    Arc::new(move || {
        let ctx = ctx.clone();
        let unit = unit.clone();
        Box::pin(async move { build_script_unit(&ctx, &unit).await })
    })
}

async fn build_script_unit(ctx: &PipelineContext, unit: &AssetUnit) -> RebuildOutcome {
    let start = Instant::now();
    let unit_id = unit.unit_id();

    match script_inner(ctx, unit) {
        Ok(dependencies) => RebuildOutcome {
            result: BuildResult::ok(&unit_id, start.elapsed()),
            dependencies,
        },
        Err(e) => {
            warn!(%unit_id, error = %e, "script unit failed");
            RebuildOutcome {
                result: BuildResult::failed(&unit_id, e.to_string(), start.elapsed()),
                dependencies: vec![unit.source.clone()],
            }
        }
    }
}

fn script_inner(ctx: &PipelineContext, unit: &AssetUnit) -> Result<Vec<PathBuf>> {
    let opts = ScriptOptions {
        minify: ctx.minify,
        // Re-read on every run: watch-mode republishes must be picked up.
        icon_sprite_path: ctx.registry.current(),
    };
    let output = bundle_script(&unit.source, &opts)?;
    fan_out(
        &output.code,
        &unit.dest,
        ctx.default_locale(),
        &ctx.locales,
        &ctx.catalog,
    )?;
    Ok(output.dependencies)
}

// ---------------------------------------------------------------------------
// Polyfill stage
// ---------------------------------------------------------------------------

fn polyfill_rebuild_fn(ctx: Arc<PipelineContext>) -> RebuildFn {
    Arc::new(move || {
        let ctx = ctx.clone();
        Box::pin(async move { build_polyfill_unit(&ctx).await })
    })
}

async fn build_polyfill_unit(ctx: &PipelineContext) -> RebuildOutcome {
    let start = Instant::now();

    match polyfill_inner(ctx) {
        Ok(dependencies) => RebuildOutcome {
            result: BuildResult::ok(POLYFILL_UNIT_ID, start.elapsed()),
            dependencies,
        },
        Err(e) => {
            warn!(unit_id = POLYFILL_UNIT_ID, error = %e, "polyfill assembly failed");
            // Both candidate locations per source, so a fix in either root
            // retriggers the unit.
            let dependencies = ctx
                .config
                .build
                .polyfills
                .iter()
                .flat_map(|rel| {
                    [ctx.layer.base.join(rel), ctx.layer.overlay.join(rel)]
                })
                .collect();
            RebuildOutcome {
                result: BuildResult::failed(POLYFILL_UNIT_ID, e.to_string(), start.elapsed()),
                dependencies,
            }
        }
    }
}

fn polyfill_inner(ctx: &PipelineContext) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    let mut bundle = String::from(SCRIPT_HEADER);

    for rel in &ctx.config.build.polyfills {
        let path = assetforge_resolver::resolve_exact(rel, &ctx.layer).ok_or_else(|| {
            AssetForgeError::config(format!("polyfill source not found: {rel}"))
        })?;
        let content =
            std::fs::read_to_string(&path).map_err(|e| AssetForgeError::io(&path, e))?;
        bundle.push_str(&content);
        if !bundle.ends_with('\n') {
            bundle.push('\n');
        }
        sources.push(path);
    }

    let code = if ctx.minify {
        script::minify(&bundle)
    } else {
        bundle
    };
    write_text(&ctx.out_root().join("polyfills.js"), &code)?;
    Ok(sources)
}

// ---------------------------------------------------------------------------
// Style stage
// ---------------------------------------------------------------------------

fn style_rebuild_fn(ctx: Arc<PipelineContext>, unit: AssetUnit) -> RebuildFn {
    Arc::new(move || {
        let ctx = ctx.clone();
        let unit = unit.clone();
        Box::pin(async move { build_style_unit(&ctx, &unit).await })
    })
}

async fn build_style_unit(ctx: &PipelineContext, unit: &AssetUnit) -> RebuildOutcome {
    let start = Instant::now();
    let unit_id = unit.unit_id();

    match style_inner(ctx, unit) {
        Ok(dependencies) => RebuildOutcome {
            result: BuildResult::ok(&unit_id, start.elapsed()),
            dependencies,
        },
        Err(e) => {
            warn!(%unit_id, error = %e, "style unit failed");
            RebuildOutcome {
                result: BuildResult::failed(&unit_id, e.to_string(), start.elapsed()),
                dependencies: vec![unit.source.clone()],
            }
        }
    }
}

fn style_inner(ctx: &PipelineContext, unit: &AssetUnit) -> Result<Vec<PathBuf>> {
    let primary = compile_style(
        &unit.source,
        &StyleOptions {
            mirror: false,
            minify: ctx.minify,
        },
    )?;
    write_text(&unit.dest, &primary.css)?;

    let mirrored = compile_style(
        &unit.source,
        &StyleOptions {
            mirror: true,
            minify: ctx.minify,
        },
    )?;
    write_text(&rtl_dest(&unit.dest), &mirrored.css)?;

    Ok(primary.dependencies)
}

/// `main.css` → `main.rtl.css`.
fn rtl_dest(dest: &Path) -> PathBuf {
    let stem = dest.file_stem().unwrap_or_default().to_string_lossy();
    let ext = dest.extension().unwrap_or_default().to_string_lossy();
    dest.with_file_name(format!("{stem}.rtl.{ext}"))
}

// ---------------------------------------------------------------------------
// Sitemap stage
// ---------------------------------------------------------------------------

fn build_sitemap(ctx: &PipelineContext, course_outcome: &CourseOutcome) -> BuildResult {
    let start = Instant::now();

    let built = SitemapAggregator::new(&ctx.config.site.base_url).and_then(|mut sitemap| {
        for url in &course_outcome.urls {
            sitemap.add_path(url);
        }
        sitemap.write(ctx.out_root(), &ctx.config.site.extra_urls)
    });

    match built {
        Ok(_) => BuildResult::ok(SITEMAP_UNIT_ID, start.elapsed()),
        Err(e) => {
            warn!(unit_id = SITEMAP_UNIT_ID, error = %e, "sitemap stage failed");
            BuildResult::failed(SITEMAP_UNIT_ID, e.to_string(), start.elapsed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// A small but complete project tree: two overlay roots, two courses,
    /// one translation catalog, icons in both roots.
    fn fixture(tmp: &Path) -> AppConfig {
        let base = tmp.join("app/assets");
        let overlay = tmp.join("site/assets");

        write(
            &base.join("app.ts"),
            "import { boot } from \"./lib/boot\";\nconst sprite = \"/icons.svg\";\nboot(\"<<app.title>>\");\n",
        );
        write(&base.join("lib/boot.ts"), "export function boot(t) { return t; }\n");
        // Overridden in the overlay root; this copy must not be compiled.
        write(&base.join("theme.scss"), "body { color: black; }\n");
        write(
            &overlay.join("theme.scss"),
            "@use \"palette\";\nbody { margin-left: 2px; }\n",
        );
        write(&overlay.join("_palette.scss"), "$ink: #222;\n");

        write(
            &base.join("assets/icons/check.svg"),
            "<svg viewBox=\"0 0 16 16\"><path d=\"M1 8l4 4\"/></svg>",
        );
        write(
            &overlay.join("assets/icons/star.svg"),
            "<svg viewBox=\"0 0 16 16\"><circle r=\"7\"/></svg>",
        );

        write(&base.join("vendor/fetch.js"), "window.fetchPolyfill = 1;\n");

        write(
            &tmp.join("content/css-basics/index.md"),
            "# <<course.css.title>>\n\n## Selectors\n\nPick elements.\n",
        );
        write(
            &tmp.join("content/js-advanced/index.md"),
            "# JS Advanced\n\n## Closures\n\nFunctions carry scope.\n",
        );
        write(
            &tmp.join("content/js-advanced/index.scss"),
            ".course { float: left; }\n",
        );
        // Reserved directories are not courses.
        std::fs::create_dir_all(tmp.join("content/shared-media")).unwrap();

        write(
            &tmp.join("i18n/fr.toml"),
            "[app]\ntitle = \"Mon App\"\n\n[course.css]\ntitle = \"Bases de CSS\"\n",
        );

        let mut config = AppConfig::default();
        config.paths.base_root = base;
        config.paths.overlay_root = overlay;
        config.paths.content_root = tmp.join("content");
        config.paths.output_root = tmp.join("public/assets");
        config.paths.i18n_dir = tmp.join("i18n");
        config.site.base_url = "https://learn.example.com".into();
        config.site.extra_urls = vec!["/about".into()];
        config.locales.default = Locale::new("en");
        config.locales.enabled = vec![Locale::new("en"), Locale::new("fr")];
        config.build.polyfills = vec!["vendor/fetch.js".into()];
        config
    }

    #[tokio::test]
    async fn full_build_produces_every_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path());
        let out = config.paths.output_root.clone();

        let summary = build_assets(config, &BuildOptions::default(), &SilentReporter)
            .await
            .unwrap();

        assert_eq!(summary.failed(), 0, "failures: {:?}", summary.failures().collect::<Vec<_>>());

        // Locale fan-out: one file per locale, default unsuffixed.
        assert!(out.join("app.js").is_file());
        assert!(out.join("app.fr.js").is_file());

        // Styles: primary plus mirrored variant, overlay copy wins.
        let css = std::fs::read_to_string(out.join("theme.css")).unwrap();
        assert!(css.contains("$ink"));
        assert!(css.contains("margin-left"));
        let rtl = std::fs::read_to_string(out.join("theme.rtl.css")).unwrap();
        assert!(rtl.contains("margin-right"));

        // Sprite: both roots contribute symbols.
        let sprite = std::fs::read_to_string(out.join("icons.svg")).unwrap();
        assert!(sprite.contains("id=\"check\""));
        assert!(sprite.contains("id=\"star\""));

        assert!(out.join("polyfills.js").is_file());

        // Course data: per (course, locale), default locale unsuffixed.
        assert!(out.join("content/css-basics/data.json").is_file());
        assert!(out.join("content/css-basics/data_fr.json").is_file());
        assert!(out.join("content/js-advanced/data.json").is_file());

        // Per-course style unit.
        assert!(out.join("content/js-advanced/index.css").is_file());
        assert!(out.join("content/js-advanced/index.rtl.css").is_file());

        assert!(out.join("sitemap.xml").is_file());
    }

    #[tokio::test]
    async fn script_output_references_the_hashed_sprite_path() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path());
        let out = config.paths.output_root.clone();

        build_assets(config, &BuildOptions::default(), &SilentReporter)
            .await
            .unwrap();

        for name in ["app.js", "app.fr.js"] {
            let code = std::fs::read_to_string(out.join(name)).unwrap();
            assert!(
                !code.contains("/icons.svg"),
                "{name} still references the unversioned sprite path"
            );
            assert!(code.contains("/icons."), "{name} lost the sprite reference");
        }
    }

    #[tokio::test]
    async fn translations_resolve_with_raw_key_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path());
        let out = config.paths.output_root.clone();

        build_assets(config, &BuildOptions::default(), &SilentReporter)
            .await
            .unwrap();

        let fr = std::fs::read_to_string(out.join("app.fr.js")).unwrap();
        assert!(fr.contains("boot(\"Mon App\")"));

        // No English catalog — the raw key text stands in.
        let en = std::fs::read_to_string(out.join("app.js")).unwrap();
        assert!(en.contains("boot(\"app.title\")"));

        let fr_course: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(out.join("content/css-basics/data_fr.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(fr_course["title"], "Bases de CSS");
    }

    #[tokio::test]
    async fn sitemap_lists_each_course_once_plus_extras() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path());
        let out = config.paths.output_root.clone();

        build_assets(config, &BuildOptions::default(), &SilentReporter)
            .await
            .unwrap();

        let xml = std::fs::read_to_string(out.join("sitemap.xml")).unwrap();
        assert_eq!(xml.matches("<loc>https://learn.example.com/</loc>").count(), 1);
        // Two locales compiled, but one URL per course.
        assert_eq!(
            xml.matches("<loc>https://learn.example.com/courses/css-basics</loc>").count(),
            1
        );
        assert_eq!(
            xml.matches("<loc>https://learn.example.com/courses/js-advanced</loc>").count(),
            1
        );
        assert!(xml.contains("<loc>https://learn.example.com/about</loc>"));
    }

    #[tokio::test]
    async fn one_failing_unit_does_not_block_its_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = fixture(tmp.path());
        let out = config.paths.output_root.clone();

        // A script with an unresolvable import fails its own unit only.
        write(
            &config.paths.base_root.join("broken.ts"),
            "import \"./does-not-exist\";\n",
        );
        config.build.polyfills.clear();

        let summary = build_assets(config, &BuildOptions::default(), &SilentReporter)
            .await
            .unwrap();

        assert_eq!(summary.failed(), 1);
        let failure = summary.failures().next().unwrap();
        assert!(failure.unit_id.contains("broken.ts"));

        // Siblings in the same group and every later stage still ran.
        assert!(out.join("app.js").is_file());
        assert!(out.join("theme.css").is_file());
        assert!(out.join("content/css-basics/data.json").is_file());
        assert!(out.join("sitemap.xml").is_file());
    }

    #[tokio::test]
    async fn watch_registrations_cover_every_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path());

        let opts = BuildOptions::default();
        let ctx = PipelineContext::new(config, &opts).unwrap();
        let invalidator = Arc::new(WatchInvalidator::new());

        run_pipeline(&ctx, &SilentReporter, Some(&invalidator))
            .await
            .unwrap();

        // sprite + app.ts script + polyfills + theme.scss style +
        // js-advanced course style + 2 courses × 2 locales.
        assert_eq!(invalidator.registration_count(), 9);

        // A change to the style partial triggers exactly the style unit.
        let partial = ctx.layer.overlay.join("_palette.scss");
        let affected = invalidator.affected(&partial);
        assert_eq!(affected.len(), 1);
        assert!(affected[0].0.starts_with("style:"));

        // A script module change triggers exactly its bundle.
        let module = ctx.layer.base.join("lib/boot.ts");
        let affected = invalidator.affected(&module);
        assert_eq!(affected.len(), 1);
        assert!(affected[0].0.starts_with("script:"));

        // A new icon lands under a registered directory dependency.
        let icon = ctx.layer.base.join("assets/icons/new.svg");
        write(&icon, "<svg viewBox=\"0 0 1 1\"/>");
        let affected = invalidator.affected(&icon);
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].0, "icon:sprite");

        // Course source changes trigger one registration per locale.
        let course_src = ctx.config.paths.content_root.join("css-basics/index.md");
        assert_eq!(invalidator.affected(&course_src).len(), 2);
    }

    #[tokio::test]
    async fn watch_rebuild_rereads_the_published_sprite_path() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path());
        let out = config.paths.output_root.clone();

        let opts = BuildOptions::default();
        let ctx = PipelineContext::new(config, &opts).unwrap();
        let invalidator = Arc::new(WatchInvalidator::new());
        run_pipeline(&ctx, &SilentReporter, Some(&invalidator))
            .await
            .unwrap();

        let first = std::fs::read_to_string(out.join("app.js")).unwrap();

        // Simulate an icon edit followed by its sprite rebuild, then a
        // script rebuild: the script must pick up the republished path.
        write(
            &ctx.layer.base.join("assets/icons/check.svg"),
            "<svg viewBox=\"0 0 16 16\"><path d=\"M2 9l3 3\"/></svg>",
        );
        let icon_path = ctx.layer.base.join("assets/icons/check.svg");
        for (_, rebuild) in invalidator.affected(&icon_path) {
            rebuild().await;
        }

        let entry = ctx.layer.base.join("app.ts");
        for (_, rebuild) in invalidator.affected(&entry) {
            rebuild().await;
        }

        let second = std::fs::read_to_string(out.join("app.js")).unwrap();
        assert_ne!(first, second, "sprite hash change must flow into rebuilt scripts");
        assert!(!second.contains("/icons.svg"));
    }
}
