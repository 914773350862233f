//! Terminal rendering for `jbridge` results.
//!
//! Results and descriptors go to stdout; diagnostics go to stderr. Color
//! follows `--color`, and `NO_COLOR` always wins.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Column width of `field` labels
const LABEL_WIDTH: usize = 10;

/// Pick the color mode from `NO_COLOR` and the `--color` flag
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

fn style(fg: Option<Color>, bold: bool) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(fg).set_bold(bold);
    spec
}

/// Writer for command output
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn put(&mut self, text: &str, spec: &ColorSpec) {
        let _ = self.stdout.set_color(spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// A derived descriptor on its own line
    pub fn descriptor(&mut self, descriptor: &str) {
        self.put(descriptor, &style(None, true));
        let _ = writeln!(self.stdout);
    }

    /// `label:` padded to a column, then the value in cyan
    pub fn field(&mut self, label: &str, value: &str) {
        let _ = write!(self.stdout, "{:<width$}", format!("{}:", label), width = LABEL_WIDTH);
        self.put(value, &style(Some(Color::Cyan), false));
        let _ = writeln!(self.stdout);
    }

    /// One bound entry point
    pub fn bound(&mut self, symbol: &str) {
        let _ = write!(self.stdout, "  ");
        self.put("bound", &style(Some(Color::Green), true));
        let _ = writeln!(self.stdout, "  {}", symbol);
    }

    /// A rendered call result followed by its kind
    pub fn result(&mut self, rendered: &str, kind: &str) {
        self.put(rendered, &style(None, true));
        let _ = write!(self.stdout, "  ");
        self.put(kind, &style(Some(Color::White), false));
        let _ = writeln!(self.stdout);
    }

    /// Green summary line
    pub fn success(&mut self, text: &str) {
        self.put(text, &style(Some(Color::Green), true));
        let _ = writeln!(self.stdout);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// `error: message` on stderr
    pub fn error(&mut self, message: &str) {
        let _ = self.stderr.set_color(&style(Some(Color::Red), true));
        let _ = write!(self.stderr, "error");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, ": {}", message);
    }
}
