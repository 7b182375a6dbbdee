//! One report row and its CSV encoding

/// Separator between fields
pub const FIELD_SEPARATOR: char = ',';

/// Terminator written after every row
pub const ROW_TERMINATOR: &str = "\r\n";

/// An ordered sequence of string fields; one line is one physical row
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Line {
    fields: Vec<String>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field (builder style)
    pub fn with(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn push(&mut self, field: impl Into<String>) {
        self.fields.push(field.into());
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode as one CSV row including the terminator
    ///
    /// Quoting is minimal: only fields containing the separator, a quote or
    /// a line break are quoted, with embedded quotes doubled. A row made of
    /// a single empty field is written as `""` so it survives re-parsing.
    pub fn to_row(&self) -> String {
        let mut row = String::new();
        if self.fields.len() == 1 && self.fields[0].is_empty() {
            row.push_str("\"\"");
        } else {
            for (i, field) in self.fields.iter().enumerate() {
                if i > 0 {
                    row.push(FIELD_SEPARATOR);
                }
                encode_field(field, &mut row);
            }
        }
        row.push_str(ROW_TERMINATOR);
        row
    }
}

impl From<Vec<String>> for Line {
    fn from(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl<S: Into<String>> FromIterator<S> for Line {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

fn encode_field(field: &str, out: &mut String) {
    let needs_quotes = field.contains(|c: char| c == FIELD_SEPARATOR || c == '"' || c == '\r' || c == '\n');
    if needs_quotes {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
