/// Indentation-aware accumulator for generated Boogie source.
#[derive(Debug, Clone)]
pub struct BoogieSourceBuilder {
    content: String,
    indent_level: usize,
    indent: String,
}

impl BoogieSourceBuilder {
    pub fn new(indent: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            indent_level: 0,
            indent: indent.into(),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        if line.is_empty() {
            self.content.push('\n');
            return;
        }
        for _ in 0..self.indent_level {
            self.content.push_str(&self.indent);
        }
        self.content.push_str(line);
        self.content.push('\n');
    }

    /// Pushes a pre-rendered multi-line fragment, re-indenting each line to
    /// the current level.
    pub fn push_lines(&mut self, fragment: &str) {
        for line in fragment.lines() {
            self.push_line(line);
        }
    }

    /// Appends already-formatted text verbatim, keeping its indentation.
    pub fn push_raw(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub fn blank_line(&mut self) {
        self.content.push('\n');
    }

    pub fn open_block(&mut self, header: &str) {
        if !header.is_empty() {
            self.push_line(header);
        }
        self.push_line("{");
        self.indent_level += 1;
    }

    pub fn close_block(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.push_line("}");
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn build(self) -> String {
        self.content
    }
}

impl Default for BoogieSourceBuilder {
    fn default() -> Self {
        Self::new("    ")
    }
}
