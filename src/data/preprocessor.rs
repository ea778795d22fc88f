// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises corpus lines before vocabulary building and
// tokenisation.
//
// Cleaning steps (per line):
//   1. Map tabs, non-breaking / zero-width spaces, BOM and
//      other control characters to a plain space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//   4. Drop the line if nothing is left
//
// `basic_tokens` is the word splitter used to count the
// vocabulary. It matches the tokenizer's Lowercase normaliser
// + Whitespace pre-tokenizer: words (\w+) and punctuation runs
// ([^\w\s]+) become separate tokens.
//
// Reference: Rust Book §8 (Strings in Rust)

/// Corpus marker for out-of-vocabulary words; kept as one token.
pub const UNK_MARKER: &str = "<unk>";

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one line. Returns an empty string for blank input.
    pub fn clean_line(&self, line: &str) -> String {
        let mut out        = String::with_capacity(line.len());
        let mut last_space = true;

        for c in line.chars() {
            let c = match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim_end().to_string()
    }

    /// Clean every line of `text`, dropping the ones that end up empty.
    pub fn clean_lines(&self, text: &str) -> Vec<String> {
        text.lines()
            .map(|line| self.clean_line(line))
            .filter(|line| !line.is_empty())
            .collect()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase word and punctuation tokens of one line.
pub fn basic_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for word in line.split_whitespace() {
        if word == UNK_MARKER {
            tokens.push(word.to_string());
            continue;
        }

        let mut current: String = String::new();
        let mut current_is_word = false;
        for c in word.to_lowercase().chars() {
            let is_word = c.is_alphanumeric() || c == '_';
            if !current.is_empty() && is_word != current_is_word {
                tokens.push(std::mem::take(&mut current));
            }
            current_is_word = is_word;
            current.push(c);
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }

    tokens
}
