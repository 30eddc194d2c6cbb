//! Minimal pull scanner for statement configuration files.
//!
//! Only element structure and attributes matter to the generator, so character
//! data is skipped rather than reported.

use std::collections::BTreeMap;

use crate::diagnostics::Diagnostic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start {
        name: String,
        attrs: BTreeMap<String, String>,
        /// `<tag/>`: no matching `End` follows.
        empty: bool,
    },
    End {
        name: String,
    },
}

pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Scanner { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn line(&self) -> usize {
        self.src[..self.pos].matches('\n').count() + 1
    }

    fn err(&self, msg: impl AsRef<str>) -> Diagnostic {
        Diagnostic::config(format!("line {}: {}", self.line(), msg.as_ref()))
    }

    fn skip_past(&mut self, terminator: &str, what: &str) -> Result<(), Diagnostic> {
        match self.rest().find(terminator) {
            Some(at) => {
                self.pos += at + terminator.len();
                Ok(())
            }
            None => Err(self.err(format!("unterminated {what}"))),
        }
    }

    pub fn next_event(&mut self) -> Result<Option<Event>, Diagnostic> {
        loop {
            let Some(lt) = self.rest().find('<') else {
                self.pos = self.src.len();
                return Ok(None);
            };
            self.pos += lt;
            let rest = self.rest();

            if rest.starts_with("<!--") {
                self.skip_past("-->", "comment")?;
            } else if rest.starts_with("<![CDATA[") {
                self.skip_past("]]>", "CDATA section")?;
            } else if rest.starts_with("<?") {
                self.skip_past("?>", "processing instruction")?;
            } else if rest.starts_with("<!") {
                self.skip_declaration()?;
            } else if let Some(after) = rest.strip_prefix("</") {
                let name_len = name_len(after);
                if name_len == 0 {
                    return Err(self.err("missing element name in end tag"));
                }
                let name = after[..name_len].to_string();
                self.pos += 2 + name_len;
                self.skip_ws();
                if !self.rest().starts_with('>') {
                    return Err(self.err(format!("malformed end tag </{name}")));
                }
                self.pos += 1;
                return Ok(Some(Event::End { name }));
            } else {
                return self.start_tag().map(Some);
            }
        }
    }

    /// `<!DOCTYPE ...>` with an optional internal subset in brackets.
    fn skip_declaration(&mut self) -> Result<(), Diagnostic> {
        let mut depth = 0usize;
        for (idx, c) in self.rest().char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '>' if depth == 0 => {
                    self.pos += idx + 1;
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(self.err("unterminated declaration"))
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn start_tag(&mut self) -> Result<Event, Diagnostic> {
        self.pos += 1;
        let len = name_len(self.rest());
        if len == 0 {
            return Err(self.err("missing element name"));
        }
        let name = self.rest()[..len].to_string();
        self.pos += len;

        let mut attrs: BTreeMap<String, String> = BTreeMap::new();
        loop {
            self.skip_ws();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(Event::Start {
                    name,
                    attrs,
                    empty: true,
                });
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(Event::Start {
                    name,
                    attrs,
                    empty: false,
                });
            }

            let key_len = name_len(rest);
            if key_len == 0 {
                return Err(self.err(format!("malformed attribute in <{name}>")));
            }
            let key = rest[..key_len].to_string();
            self.pos += key_len;
            self.skip_ws();
            if !self.rest().starts_with('=') {
                return Err(self.err(format!("attribute {key:?} in <{name}> has no value")));
            }
            self.pos += 1;
            self.skip_ws();

            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.err(format!("attribute {key:?} in <{name}> is not quoted"))),
            };
            self.pos += 1;
            let Some(end) = self.rest().find(quote) else {
                return Err(self.err(format!("unterminated value for attribute {key:?}")));
            };
            let raw = &self.rest()[..end];
            let value = decode_entities(raw).map_err(|e| self.err(e))?;
            self.pos += end + 1;

            if attrs.insert(key.clone(), value).is_some() {
                return Err(self.err(format!("duplicate attribute {key:?} in <{name}>")));
            }
        }
    }
}

fn name_len(s: &str) -> usize {
    s.char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

fn decode_entities(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';') else {
            return Err(format!("unterminated entity in {raw:?}"));
        };
        let entity = &after[..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                match code.and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => return Err(format!("unknown entity &{entity};")),
                }
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
