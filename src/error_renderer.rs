//! Error rendering using ariadne
//!
//! Parse errors are shown against the guard source with the offending span
//! underlined. Errors without a span are written as a single line.

use crate::Error;
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use bumpalo::Bump;
/// use ilchain::{CompilationOptions, Type, render_error};
///
/// let arena = Bump::new();
/// let source = "arg0 == ";
/// if let Err(e) = ilchain::compile_guard(&arena, source, &[Type::I32], CompilationOptions::default()) {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String (useful for tests, web UIs, etc.)
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Parse {
            message,
            kind_code,
            src,
            help,
            ..
        } => {
            let span = error.span().unwrap_or(0..0);
            let mut colors = ColorGenerator::new();
            colors.next(); // Skip the first color.

            let mut report = Report::build(ReportKind::Error, ("<guard>", span.clone()))
                .with_code(kind_code)
                .with_message(message)
                .with_config(ariadne::Config::default().with_color(use_color));

            report = report.with_label(
                Label::new(("<guard>", span))
                    .with_message(message)
                    .with_color(colors.next()),
            );
            if let Some(help) = help {
                report = report.with_help(help);
            }

            report.finish().write(("<guard>", Source::from(src)), &mut *writer)
        }
        Error::Compile { error, src } => {
            writeln!(writer, "Compile error: {}", error)?;
            writeln!(writer, "  in guard: {}", src)
        }
        Error::Execution(error) => writeln!(writer, "Execution error: {}", error),
        Error::Api(error) => writeln!(writer, "API error: {}", error),
    }
}
