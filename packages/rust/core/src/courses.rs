//! Course content stage: strictly serialized document-transform driver.
//!
//! The document transform for large course corpora is memory-intensive, so
//! this stage runs one (course, locale) pair at a time by default. The pool
//! size is configurable; anything above 1 becomes a bounded batch fan-out.
//!
//! Side effects per pair: one locale-tagged course data file, plus the
//! course's canonical URL recorded exactly once per course (not per locale).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use assetforge_shared::{BuildResult, CourseRef, Locale, Result};
use assetforge_transforms::compile_course;

use crate::fanout::write_json;
use crate::pipeline::PipelineContext;
use crate::watch::{RebuildFn, RebuildOutcome, WatchInvalidator};

/// What the course stage hands to the sitemap stage.
#[derive(Debug, Default)]
pub struct CourseOutcome {
    /// One result per (course, locale) pair, in completion order.
    pub results: Vec<BuildResult>,
    /// Canonical site path per course that produced data, once each.
    pub urls: Vec<String>,
}

/// Canonical site path for a course.
pub fn course_url(course_id: &str) -> String {
    format!("/courses/{course_id}")
}

/// Compile every (course, locale) pair.
///
/// With the default pool size of 1 the pairs are totally ordered and the
/// document transform is never invoked concurrently.
#[instrument(skip_all, fields(courses = courses.len(), locales = ctx.locales.len()))]
pub async fn run_all(
    ctx: &Arc<PipelineContext>,
    courses: &[CourseRef],
    invalidator: Option<&Arc<WatchInvalidator>>,
) -> CourseOutcome {
    let concurrency = ctx.config.build.course_concurrency.max(1) as usize;
    let mut outcome = CourseOutcome::default();
    let mut recorded: HashSet<String> = HashSet::new();

    let pairs: Vec<(CourseRef, Locale)> = courses
        .iter()
        .flat_map(|course| {
            ctx.locales
                .iter()
                .map(move |locale| (course.clone(), locale.clone()))
        })
        .collect();

    if concurrency <= 1 {
        for (course, locale) in pairs {
            let rebuild = course_rebuild_fn(ctx.clone(), course.clone(), locale);
            let built = rebuild().await;
            settle(&course, built, rebuild, invalidator, &mut outcome, &mut recorded);
        }
    } else {
        for chunk in pairs.chunks(concurrency) {
            let mut set: JoinSet<(CourseRef, RebuildOutcome, RebuildFn)> = JoinSet::new();
            for (course, locale) in chunk.iter().cloned() {
                let rebuild = course_rebuild_fn(ctx.clone(), course.clone(), locale);
                let task_rebuild = rebuild.clone();
                set.spawn(async move {
                    let built = task_rebuild().await;
                    (course, built, rebuild)
                });
            }
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((course, built, rebuild)) => {
                        settle(&course, built, rebuild, invalidator, &mut outcome, &mut recorded);
                    }
                    Err(e) => {
                        warn!(error = %e, "course task failed to join");
                        outcome.results.push(BuildResult::failed(
                            "markdown:unknown",
                            e.to_string(),
                            std::time::Duration::ZERO,
                        ));
                    }
                }
            }
        }
    }

    info!(
        pairs = outcome.results.len(),
        urls = outcome.urls.len(),
        "course stage settled"
    );
    outcome
}

/// Bookkeeping shared by both pool paths: watch re-registration, URL
/// recording (once per course), result collection.
fn settle(
    course: &CourseRef,
    built: RebuildOutcome,
    rebuild: RebuildFn,
    invalidator: Option<&Arc<WatchInvalidator>>,
    outcome: &mut CourseOutcome,
    recorded: &mut HashSet<String>,
) {
    if let Some(invalidator) = invalidator {
        invalidator.register(&built.result.unit_id, built.dependencies.clone(), rebuild);
    }
    if built.result.success && recorded.insert(course.id.clone()) {
        outcome.urls.push(course_url(&course.id));
    }
    outcome.results.push(built.result);
}

/// A re-runnable build of one (course, locale) pair.
pub(crate) fn course_rebuild_fn(
    ctx: Arc<PipelineContext>,
    course: CourseRef,
    locale: Locale,
) -> RebuildFn {
    Arc::new(move || {
        let ctx = ctx.clone();
        let course = course.clone();
        let locale = locale.clone();
        Box::pin(async move { build_course_unit(&ctx, &course, &locale).await })
    })
}

async fn build_course_unit(
    ctx: &PipelineContext,
    course: &CourseRef,
    locale: &Locale,
) -> RebuildOutcome {
    let start = Instant::now();
    let unit_id = format!("markdown:{}:{locale}", course.id);
    // Known gap carried from the original design: only the primary source
    // file, not referenced media or data files.
    let dependencies = vec![course.source_file()];

    let result = match course_inner(ctx, course, locale) {
        Ok(()) => BuildResult::ok(&unit_id, start.elapsed()),
        Err(e) => {
            warn!(%unit_id, error = %e, "course unit failed");
            BuildResult::failed(&unit_id, e.to_string(), start.elapsed())
        }
    };

    RebuildOutcome {
        result,
        dependencies,
    }
}

fn course_inner(ctx: &PipelineContext, course: &CourseRef, locale: &Locale) -> Result<()> {
    let data = compile_course(course, locale, &ctx.catalog)?;

    let file_name = if ctx.config.locales.is_default(locale) {
        "data.json".to_string()
    } else {
        format!("data_{locale}.json")
    };
    let path = ctx
        .config
        .paths
        .output_root
        .join("content")
        .join(&course.id)
        .join(file_name);

    write_json(&path, &data)
}
