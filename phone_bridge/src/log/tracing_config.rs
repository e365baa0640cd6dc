// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use tracing_core::LevelFilter;

/// Where log output goes, how verbose it is, and whether the subscriber is installed
/// for the whole process or just the current thread. Pass it to
/// [`init_tracing()`](crate::init_tracing).
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
    pub scope: TracingScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    /// Path and prefix of the log file, eg: `/tmp/phone_bridge.log`.
    File(String),
    DisplayAndFile(DisplayPreference, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
}

/// - `Global` is for apps. Once set it can't be changed.
/// - `ThreadLocal` is for tests. It is reset when the returned guard is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingScope {
    Global,
    ThreadLocal,
}

impl TracingConfig {
    /// Display to stderr at `DEBUG`, for the whole process.
    #[must_use]
    pub fn new_display(preferred_display: DisplayPreference) -> Self {
        Self {
            writer_config: WriterConfig::Display(preferred_display),
            level_filter: LevelFilter::DEBUG,
            scope: TracingScope::Global,
        }
    }

    #[must_use]
    pub fn with_file(mut self, tracing_log_file_path_and_prefix: impl Into<String>) -> Self {
        let path = tracing_log_file_path_and_prefix.into();
        self.writer_config = match self.writer_config {
            WriterConfig::None | WriterConfig::File(_) => WriterConfig::File(path),
            WriterConfig::Display(display)
            | WriterConfig::DisplayAndFile(display, _) => {
                WriterConfig::DisplayAndFile(display, path)
            }
        };
        self
    }

    #[must_use]
    pub fn with_level_filter(mut self, level_filter: LevelFilter) -> Self {
        self.level_filter = level_filter;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: TracingScope) -> Self {
        self.scope = scope;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn adding_a_file_keeps_the_display() {
        let config = TracingConfig::new_display(DisplayPreference::Stderr)
            .with_file("/tmp/phone.log");
        assert_eq!(
            config.writer_config,
            WriterConfig::DisplayAndFile(
                DisplayPreference::Stderr,
                "/tmp/phone.log".to_string()
            )
        );
    }

    #[test]
    fn file_replaces_none() {
        let config = TracingConfig {
            writer_config: WriterConfig::None,
            level_filter: LevelFilter::INFO,
            scope: TracingScope::ThreadLocal,
        }
        .with_file("a.log")
        .with_file("b.log");
        assert_eq!(config.writer_config, WriterConfig::File("b.log".to_string()));
    }
}
