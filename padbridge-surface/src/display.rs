//! Text model of the surface display: a title line, eight columns of
//! name/value cells aligned with the encoders, and a footer.

const COLUMNS: usize = 8;
/// Characters per column on the rendered text lines.
pub const CELL_WIDTH: usize = 12;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub title: String,
    pub names: [String; COLUMNS],
    pub values: [String; COLUMNS],
    pub footer: String,
}

impl Screen {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Fill column `index`; indices past the last column are ignored.
    pub fn column(&mut self, index: usize, name: impl Into<String>, value: impl Into<String>) {
        if index < COLUMNS {
            self.names[index] = name.into();
            self.values[index] = value.into();
        }
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }

    /// The screen as four fixed-width text lines.
    pub fn lines(&self) -> [String; 4] {
        [
            self.title.clone(),
            row(&self.names),
            row(&self.values),
            self.footer.clone(),
        ]
    }
}

fn row(cells: &[String; COLUMNS]) -> String {
    let mut line = String::with_capacity(COLUMNS * CELL_WIDTH);
    for cell in cells {
        let clipped: String = cell.chars().take(CELL_WIDTH - 1).collect();
        line.push_str(&format!("{:<width$}", clipped, width = CELL_WIDTH));
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_clipped_to_their_column() {
        let mut screen = Screen::new("Mixer");
        screen.column(0, "A very long track name", "0.0 dB");
        screen.column(1, "Bass", "-6.0 dB");
        screen.column(8, "ignored", "ignored");
        let lines = screen.lines();
        assert_eq!(lines[0], "Mixer");
        assert_eq!(lines[1], "A very long Bass");
        assert_eq!(lines[2], "0.0 dB      -6.0 dB");
    }
}
