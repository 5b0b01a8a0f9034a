use std::fmt::{self, Write as _};

use nu_ansi_term::Color;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::{Event, Level, Subscriber, field};
use tracing_subscriber::{
    field::{RecordFields, VisitFmt, VisitOutput},
    fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields, format::Writer},
    registry::LookupSpan,
};

const TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[month]-[day]|[hour]:[minute]:[second].[subsecond digits:3]");

/// Compact single-line format: `[LEVEL] [time] target message key=value`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetFormat;

impl<S, N> FormatEvent<S, N> for TargetFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        write_level(&mut writer, meta.level(), ansi)?;
        writer.write_char(' ')?;
        write_time(&mut writer)?;
        writer.write_char(' ')?;

        if ansi {
            write!(writer, "{} ", Color::DarkGray.paint(meta.target()))?;
        } else {
            write!(writer, "{} ", meta.target())?;
        }

        ctx.format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

impl<'w> FormatFields<'w> for TargetFormat {
    fn format_fields<R: RecordFields>(&self, writer: Writer<'w>, fields: R) -> fmt::Result {
        let mut visitor = FieldVisitor::new(writer, true);
        fields.record(&mut visitor);
        visitor.finish()
    }

    fn add_fields(
        &self,
        current: &'w mut FormattedFields<Self>,
        fields: &tracing::span::Record<'_>,
    ) -> fmt::Result {
        let is_empty = current.is_empty();
        let mut visitor = FieldVisitor::new(current.as_writer(), is_empty);
        fields.record(&mut visitor);
        visitor.finish()
    }
}

fn write_level(writer: &mut Writer<'_>, level: &Level, ansi: bool) -> fmt::Result {
    let (name, color) = match *level {
        Level::TRACE => ("TRACE", Color::Purple),
        Level::DEBUG => ("DEBUG", Color::Blue),
        Level::INFO => ("INFO", Color::Green),
        Level::WARN => ("WARN", Color::Yellow),
        Level::ERROR => ("ERROR", Color::Red),
    };

    if ansi {
        write!(writer, "[{}]", color.paint(name))
    } else {
        write!(writer, "[{name}]")
    }
}

fn write_time(writer: &mut Writer<'_>) -> fmt::Result {
    let now = OffsetDateTime::now_utc();
    match now.format(TIME_FORMAT) {
        Ok(formatted) => write!(writer, "[{formatted}]"),
        Err(_) => writer.write_str("[<unknown-timestamp>]"),
    }
}

struct FieldVisitor<'a> {
    writer: Writer<'a>,
    is_empty: bool,
    result: fmt::Result,
}

impl<'a> FieldVisitor<'a> {
    fn new(writer: Writer<'a>, is_empty: bool) -> Self {
        Self {
            writer,
            is_empty,
            result: Ok(()),
        }
    }

    fn separator(&mut self) -> &'static str {
        if std::mem::replace(&mut self.is_empty, false) {
            ""
        } else {
            " "
        }
    }
}

impl field::Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &field::Field, value: &str) {
        if field.name() == "message" {
            self.record_debug(field, &format_args!("{value}"));
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_debug(&mut self, field: &field::Field, value: &dyn fmt::Debug) {
        if self.result.is_err() {
            return;
        }

        let separator = self.separator();
        let ansi = self.writer.has_ansi_escapes();
        self.result = match field.name() {
            "message" => write!(self.writer, "{separator}{value:?}"),
            name if ansi => {
                let color = if name == "error" { Color::Red } else { Color::Blue };
                write!(
                    self.writer,
                    "{separator}{name}={}",
                    color.paint(format!("{value:?}"))
                )
            }
            name => write!(self.writer, "{separator}{name}={value:?}"),
        };
    }
}

impl VisitOutput<fmt::Result> for FieldVisitor<'_> {
    fn finish(self) -> fmt::Result {
        self.result
    }
}

impl VisitFmt for FieldVisitor<'_> {
    fn writer(&mut self) -> &mut dyn fmt::Write {
        &mut self.writer
    }
}
