//! Line-oriented manifest document

/// Line terminator convention of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Detect the convention used by `source`.
    ///
    /// Any CRLF pair marks the whole document as CRLF.
    pub fn detect(source: &str) -> Self {
        if source.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// An ordered sequence of text lines read from one manifest file.
///
/// Lines are stored without terminators. The original line-ending
/// convention and the presence of a final newline are remembered so that
/// [`render`](Self::render) reproduces an unedited document byte for byte
/// (mixed endings are normalized to the detected convention).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    lines: Vec<String>,
    original: Vec<String>,
    line_ending: LineEnding,
    trailing_newline: bool,
}

impl ManifestDocument {
    pub fn parse(source: &str) -> Self {
        let line_ending = LineEnding::detect(source);
        let trailing_newline = source.ends_with('\n');
        let body = source.strip_suffix('\n').unwrap_or(source);
        let body = body.strip_suffix('\r').unwrap_or(body);

        let lines: Vec<String> = if source.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect()
        };

        Self {
            original: lines.clone(),
            lines,
            line_ending,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// True when line content or line count differs from the parsed input.
    pub fn is_modified(&self) -> bool {
        self.lines != self.original
    }

    /// Remove every line for which `predicate` is true, returning them.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&str) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.lines.retain(|line| {
            if predicate(line) {
                removed.push(line.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Index of the first line containing `needle`.
    pub fn find(&self, needle: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.contains(needle))
    }

    /// True if some line equals `line` once surrounding whitespace is ignored.
    pub fn contains_line(&self, line: &str) -> bool {
        let wanted = line.trim();
        self.lines.iter().any(|l| l.trim() == wanted)
    }

    pub fn insert(&mut self, index: usize, line: impl Into<String>) {
        let index = index.min(self.lines.len());
        self.lines.insert(index, line.into());
    }

    /// Render the document with its original conventions.
    pub fn render(&self) -> String {
        let eol = self.line_ending.as_str();
        let mut out = self.lines.join(eol);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(eol);
        }
        out
    }
}
