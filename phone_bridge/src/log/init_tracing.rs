// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # [`init_tracing()`]
//!
//! Sets up a [`tracing_subscriber`] registry from a [`TracingConfig`]: a display
//! layer (`stdout` or `stderr`), a file layer backed by [`tracing_appender`], both, or
//! neither. Thread names are shown so the owner thread and worker threads can be told
//! apart in the output.

use super::{DisplayPreference, TracingConfig, TracingScope, WriterConfig};
use std::path::PathBuf;
use tracing::dispatcher;
use tracing_core::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan,
                         util::SubscriberInitExt, Layer};

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer.
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
    };
}

/// Type alias for a boxed layer.
pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Initializes the tracing system with `tracing_config`. Depending on its
/// [`TracingScope`]:
/// 1. [`TracingScope::Global`] sets the global default subscriber and returns
///    [`None`].
/// 2. [`TracingScope::ThreadLocal`] sets a subscriber for the current thread only and
///    returns its guard. Dropping the guard restores the previous subscriber.
///
/// # Errors
///
/// If the log file can't be created.
pub fn init_tracing(
    tracing_config: TracingConfig,
) -> miette::Result<Option<dispatcher::DefaultGuard>> {
    let scope = tracing_config.scope;
    try_create_layers(tracing_config).map(|layers| match scope {
        TracingScope::Global => {
            tracing_subscriber::registry().with(layers).init();
            None
        }
        TracingScope::ThreadLocal => {
            Some(tracing_subscriber::registry().with(layers).set_default())
        }
    })
}

/// Returns the layers without installing them.
///
/// # Errors
///
/// If the log file can't be created.
pub fn try_create_layers(
    tracing_config: TracingConfig,
) -> miette::Result<Vec<Box<DynLayer<tracing_subscriber::Registry>>>> {
    let mut layers: Vec<Box<DynLayer<tracing_subscriber::Registry>>> = vec![];

    layers.push(Box::new(tracing_config.level_filter));

    if let Some(layer) = try_create_display_layer(
        tracing_config.level_filter,
        &tracing_config.writer_config,
    ) {
        layers.push(layer);
    }

    if let Some(layer) =
        try_create_file_layer(tracing_config.level_filter, &tracing_config.writer_config)?
    {
        layers.push(layer);
    }

    Ok(layers)
}

pub fn try_create_display_layer<S>(
    level_filter: LevelFilter,
    writer_config: &WriterConfig,
) -> Option<Box<DynLayer<S>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();
    match writer_config {
        WriterConfig::DisplayAndFile(display_pref, _)
        | WriterConfig::Display(display_pref) => match display_pref {
            DisplayPreference::Stdout => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stdout)
                    .with_filter(level_filter),
            )),
            DisplayPreference::Stderr => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stderr)
                    .with_filter(level_filter),
            )),
        },
        WriterConfig::None | WriterConfig::File(_) => None,
    }
}

/// # Errors
///
/// If the log file path has no parent folder or no file name.
pub fn try_create_file_layer<S>(
    level_filter: LevelFilter,
    writer_config: &WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!().with_ansi(false);
    Ok(match writer_config {
        WriterConfig::DisplayAndFile(_, tracing_log_file_path_and_prefix)
        | WriterConfig::File(tracing_log_file_path_and_prefix) => {
            let file = try_create_file_appender(tracing_log_file_path_and_prefix)?;
            Some(Box::new(
                fmt_layer.with_writer(file).with_filter(level_filter),
            ))
        }
        WriterConfig::None | WriterConfig::Display(_) => None,
    })
}

/// Wrapping this in [`tracing_appender::non_blocking()`] loses output on exit unless
/// its guard is kept alive, so the plain appender is used.
fn try_create_file_appender(
    path_str: &str,
) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let path = PathBuf::from(path_str);

    let parent = path.parent().ok_or_else(|| {
        miette::miette!(
            "Can't access current folder {}. It might not exist, or don't have required permissions.",
            path.display()
        )
    })?;

    let file_stem = path.file_name().ok_or_else(|| {
        miette::miette!(
            "Can't access file name {}. It might not exist, or don't have required permissions.",
            path.display()
        )
    })?;

    Ok(tracing_appender::rolling::never(parent, file_stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::tempdir;

    fn thread_local(writer_config: WriterConfig) -> TracingConfig {
        TracingConfig {
            writer_config,
            level_filter: LevelFilter::DEBUG,
            scope: TracingScope::ThreadLocal,
        }
    }

    #[test]
    fn none_only_has_level_filter() {
        let layers = try_create_layers(thread_local(WriterConfig::None)).unwrap();
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn display_and_file_has_both_layers() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("both.log");
        let file_path = file_path.to_str().unwrap().to_string();

        let layers = try_create_layers(thread_local(WriterConfig::DisplayAndFile(
            DisplayPreference::Stderr,
            file_path.clone(),
        )))
        .unwrap();

        assert_eq!(layers.len(), 3);
        assert!(std::path::Path::new(&file_path).exists());
    }

    #[test]
    #[serial]
    fn thread_local_subscriber_writes_to_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("owner_loop.log");
        let file_path_str = file_path.to_str().unwrap().to_string();

        let guard = init_tracing(thread_local(WriterConfig::File(file_path_str)))
            .unwrap()
            .unwrap();
        tracing::info!(generation = 7, "owner loop spawned");
        tracing::trace!("below the level filter");
        drop(guard);

        let contents = std::fs::read_to_string(&file_path).unwrap();
        assert!(contents.contains("owner loop spawned"), "{contents}");
        assert!(contents.contains("generation=7"), "{contents}");
        assert!(!contents.contains("below the level filter"), "{contents}");
    }
}
