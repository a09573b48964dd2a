// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log line formatting and subscriber construction.
//!
//! Lines look like:
//!
//! ```text
//! QSS | INFO | session{url=wss://ws.zoom.us/ws}: SESSION | Connection established, waiting for events
//! QSS | WARN | INGEST | Post status code: 401 - Reason: Unauthorized - Text: ...
//! ```
//!
//! The entry point builds the subscriber with [`install`] and keeps the
//! returned guard alive for the lifetime of the process.

use std::{fmt, io};
use tracing::subscriber::DefaultGuard;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields, MakeWriter,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Event formatter prefixing every line with `QSS` and the level.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "QSS | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Filter directives for `log_level`, silencing transport crates.
#[must_use]
pub fn env_filter_directives(log_level: &str) -> String {
    format!("h2=off,hyper=off,rustls=off,tungstenite=off,tokio_tungstenite=off,{log_level}")
}

/// Builds the subscriber used by the bridge, writing to stdout.
pub fn subscriber(log_level: &str) -> Result<impl Subscriber + Send + Sync, ParseError> {
    subscriber_with_writer(log_level, io::stdout)
}

/// Builds the bridge subscriber over an arbitrary writer.
///
/// Output is always plain text, whatever features `tracing-subscriber` is
/// compiled with.
pub fn subscriber_with_writer<W>(
    log_level: &str,
    writer: W,
) -> Result<impl Subscriber + Send + Sync, ParseError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(env_filter_directives(log_level))?;
    Ok(tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .event_format(Formatter)
        .finish())
}

/// Installs the subscriber as the default for the current thread.
///
/// Logging stays active until the returned guard is dropped.
pub fn install(log_level: &str) -> Result<DefaultGuard, ParseError> {
    Ok(tracing::subscriber::set_default(subscriber(log_level)?))
}
