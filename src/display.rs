//! Character display collaborator and screen formatting.

use pg1000_params::Parameter;

/// Characters per line on the 16x2 panel.
pub const DISPLAY_COLUMNS: usize = 16;

/// Two-line text output. Rendering and refresh diffing belong to the implementor.
pub trait TextDisplay {
    fn show(&mut self, line1: &str, line2: &str);
}

impl<T: TextDisplay + ?Sized> TextDisplay for &mut T {
    fn show(&mut self, line1: &str, line2: &str) {
        (**self).show(line1, line2)
    }
}

/// Content for one refresh, already cut to the panel width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub line1: String,
    pub line2: String,
}

impl Screen {
    pub fn new(line1: impl AsRef<str>, line2: impl AsRef<str>) -> Self {
        Self {
            line1: fit(line1.as_ref()),
            line2: fit(line2.as_ref()),
        }
    }

    pub fn show_on<D: TextDisplay + ?Sized>(&self, display: &mut D) {
        display.show(&self.line1, &self.line2);
    }
}

fn fit(text: &str) -> String {
    text.chars().take(DISPLAY_COLUMNS).collect()
}

/// Horizontal bar of `width` cells showing where the value sits in its range.
pub fn value_bar(param: &Parameter, width: usize) -> String {
    let span = usize::from(param.max - param.min);
    let filled = if span == 0 {
        width
    } else {
        usize::from(param.value() - param.min) * width / span
    };
    let mut bar = "#".repeat(filled);
    bar.push_str(&"-".repeat(width - filled));
    bar
}

/// `"<grp> <name>"` over the value and a bar graph.
pub fn parameter_screen(param: &Parameter) -> Screen {
    let value = param.display_value();
    let bar_width = DISPLAY_COLUMNS.saturating_sub(value.chars().count().max(4) + 1);
    Screen::new(
        format!("{} {}", param.group.label(), param.name),
        format!("{value:<4} {}", value_bar(param, bar_width)),
    )
}
