//! Extracts interface declarations from Go source.
//!
//! This is a token-level reader, not a Go parser: it understands package and
//! import clauses, type declarations, and method specs inside interface
//! bodies. Everything else is skipped by delimiter matching.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::diagnostics::Diagnostic;
use crate::imports::Import;
use crate::model::{InterfaceDescriptor, MethodDescriptor, ParamDescriptor};

const TYPE_KEYWORDS: &[&str] = &["chan", "func", "interface", "map", "struct"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    /// Number or rune literal, verbatim.
    Lit(String),
    /// String literal, unquoted.
    Str(String),
    Op(String),
    Semi,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

impl Tok {
    fn is_op(&self, op: &str) -> bool {
        matches!(self, Tok::Op(o) if o == op)
    }

    fn is_ident(&self, ident: &str) -> bool {
        matches!(self, Tok::Ident(i) if i == ident)
    }

    fn is_word(&self) -> bool {
        matches!(self, Tok::Ident(_) | Tok::Lit(_) | Tok::Str(_))
    }
}

#[derive(Debug, Clone)]
enum TypeKind {
    Interface(Vec<Token>),
    GenericInterface,
    Other,
}

#[derive(Debug, Clone)]
struct TypeDecl {
    name: String,
    line: usize,
    kind: TypeKind,
}

/// Declarations of one Go source file.
#[derive(Debug, Clone)]
pub struct GoFile {
    pub package: String,
    pub imports: Vec<Import>,
    types: Vec<TypeDecl>,
}

impl GoFile {
    /// `Ok(None)` when the file declares no type called `name`.
    pub fn interface(&self, name: &str) -> Result<Option<InterfaceDescriptor>, Diagnostic> {
        let Some(decl) = self.types.iter().find(|t| t.name == name) else {
            return Ok(None);
        };
        let body = match &decl.kind {
            TypeKind::Interface(body) => body,
            TypeKind::GenericInterface => {
                return Err(Diagnostic::parse(format!(
                    "line {}: generic interface {name} is not supported",
                    decl.line
                )));
            }
            TypeKind::Other => {
                return Err(Diagnostic::parse(format!("{name} is not an interface")));
            }
        };
        Ok(Some(InterfaceDescriptor {
            name: name.to_string(),
            package: self.package.clone(),
            imports: self.imports.clone(),
            methods: parse_methods(body)?,
        }))
    }
}

/// Looks for `type <name> interface` among the `.go` files of `dir`.
///
/// Files are visited in name order and `_test.go` files are ignored.
pub fn find_interface(dir: &Path, name: &str) -> Result<(PathBuf, InterfaceDescriptor)> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("read package dir: {}", dir.display()))?
    {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.ends_with(".go") && !file_name.ends_with("_test.go") && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut found: Vec<(PathBuf, InterfaceDescriptor)> = Vec::new();
    for path in paths {
        let src = std::fs::read_to_string(&path)
            .with_context(|| format!("read Go source: {}", path.display()))?;
        let file = parse_file(&src).with_context(|| format!("parse {}", path.display()))?;
        if let Some(iface) = file
            .interface(name)
            .with_context(|| format!("in {}", path.display()))?
        {
            found.push((path, iface));
        }
    }

    match found.len() {
        0 => Err(Diagnostic::parse(format!(
            "can not find type {name} in {}",
            dir.display()
        ))
        .into()),
        1 => Ok(found.remove(0)),
        _ => {
            let files: Vec<String> = found.iter().map(|(p, _)| p.display().to_string()).collect();
            Err(Diagnostic::parse(format!(
                "type {name} is declared more than once: {}",
                files.join(", ")
            ))
            .into())
        }
    }
}

pub fn parse_file(src: &str) -> Result<GoFile, Diagnostic> {
    let toks = tokenize(src)?;
    let mut file = GoFile {
        package: String::new(),
        imports: Vec::new(),
        types: Vec::new(),
    };

    let mut i = 0;
    while i < toks.len() {
        match &toks[i].tok {
            Tok::Semi => i += 1,
            Tok::Ident(kw) if kw == "package" => {
                match toks.get(i + 1).map(|t| &t.tok) {
                    Some(Tok::Ident(name)) => file.package = name.clone(),
                    _ => {
                        return Err(Diagnostic::parse(format!(
                            "line {}: malformed package clause",
                            toks[i].line
                        )))
                    }
                }
                i = stmt_end(&toks, i + 1)?;
            }
            Tok::Ident(kw) if kw == "import" || kw == "type" => {
                let is_import = kw == "import";
                let specs: Vec<&[Token]>;
                if toks.get(i + 1).is_some_and(|t| t.tok.is_op("(")) {
                    let close = matching(&toks, i + 1)?;
                    specs = split_top(&toks[i + 2..close], |t| matches!(t, Tok::Semi))?;
                    i = close + 1;
                } else {
                    let end = stmt_end(&toks, i + 1)?;
                    specs = vec![&toks[i + 1..end]];
                    i = end;
                }
                for spec in specs.into_iter().filter(|s| !s.is_empty()) {
                    if is_import {
                        file.imports.push(parse_import_spec(spec)?);
                    } else {
                        file.types.push(parse_type_spec(spec)?);
                    }
                }
            }
            _ => i = stmt_end(&toks, i)?,
        }
    }

    if file.package.is_empty() {
        return Err(Diagnostic::parse("missing package clause"));
    }
    Ok(file)
}

fn parse_import_spec(spec: &[Token]) -> Result<Import, Diagnostic> {
    let toks: Vec<&Tok> = spec.iter().map(|t| &t.tok).collect();
    match toks.as_slice() {
        [Tok::Str(path)] => Ok(Import::new(path.clone())),
        [Tok::Ident(alias), Tok::Str(path)] => Ok(Import::aliased(alias.clone(), path.clone())),
        [Tok::Op(dot), Tok::Str(path)] if dot == "." => Ok(Import::aliased(".", path.clone())),
        _ => Err(Diagnostic::parse(format!(
            "line {}: malformed import spec",
            spec[0].line
        ))),
    }
}

fn parse_type_spec(spec: &[Token]) -> Result<TypeDecl, Diagnostic> {
    let line = spec[0].line;
    let Tok::Ident(name) = &spec[0].tok else {
        return Err(Diagnostic::parse(format!("line {line}: malformed type declaration")));
    };
    let mut rest = &spec[1..];
    let mut kind = TypeKind::Other;

    if rest.first().is_some_and(|t| t.tok.is_op("=")) {
        return Ok(TypeDecl {
            name: name.clone(),
            line,
            kind,
        });
    }

    let mut generic = false;
    if rest.first().is_some_and(|t| t.tok.is_op("[")) {
        let close = matching(rest, 0)?;
        if is_type_params(&rest[1..close]) {
            generic = true;
            rest = &rest[close + 1..];
        }
    }

    if rest.len() >= 2 && rest[0].tok.is_ident("interface") && rest[1].tok.is_op("{") {
        let close = matching(rest, 1)?;
        kind = if generic {
            TypeKind::GenericInterface
        } else {
            TypeKind::Interface(rest[2..close].to_vec())
        };
    }

    Ok(TypeDecl {
        name: name.clone(),
        line,
        kind,
    })
}

/// `[T any]`, `[K comparable, V any]`, `[T ~int]`; not `[4]` or `[N]`.
fn is_type_params(inner: &[Token]) -> bool {
    match inner {
        [first, second, ..] => {
            matches!(first.tok, Tok::Ident(_))
                && (matches!(second.tok, Tok::Ident(_))
                    || second.tok.is_op("~")
                    || second.tok.is_op(","))
        }
        _ => false,
    }
}

fn parse_methods(body: &[Token]) -> Result<Vec<MethodDescriptor>, Diagnostic> {
    let mut methods: Vec<MethodDescriptor> = Vec::new();
    for elem in split_top(body, |t| matches!(t, Tok::Semi))? {
        if elem.is_empty() {
            continue;
        }
        let line = elem[0].line;
        let (Tok::Ident(name), Some(open)) = (&elem[0].tok, elem.get(1)) else {
            return Err(embedded_element(elem));
        };
        if !open.tok.is_op("(") {
            return Err(embedded_element(elem));
        }

        let close = matching(elem, 1)?;
        let params = parse_fields(&elem[2..close])
            .map_err(|e| Diagnostic::parse(format!("line {line}: {name}: {}", e.message)))?;

        let rest = &elem[close + 1..];
        let results = if rest.is_empty() {
            Vec::new()
        } else if rest[0].tok.is_op("(") && matching(rest, 0)? == rest.len() - 1 {
            parse_fields(&rest[1..rest.len() - 1])
                .map_err(|e| Diagnostic::parse(format!("line {line}: {name}: {}", e.message)))?
        } else {
            vec![ParamDescriptor::unnamed(render_type(rest))]
        };

        methods.push(MethodDescriptor::new(name.clone(), params, results));
    }
    Ok(methods)
}

fn embedded_element(elem: &[Token]) -> Diagnostic {
    Diagnostic::parse(format!(
        "line {}: interface element `{}` is not a method; embedded interfaces and type sets are not supported",
        elem[0].line,
        render_type(elem)
    ))
}

/// Parameter or result list contents, with Go's `a, b T` grouping.
fn parse_fields(toks: &[Token]) -> Result<Vec<ParamDescriptor>, Diagnostic> {
    let entries: Vec<Vec<Token>> = split_top(toks, |t| t.is_op(","))?
        .into_iter()
        .map(|e| {
            e.iter()
                .filter(|t| !matches!(t.tok, Tok::Semi))
                .cloned()
                .collect::<Vec<Token>>()
        })
        .filter(|e| !e.is_empty())
        .collect();

    if !entries.iter().any(|e| is_named(e)) {
        return Ok(entries
            .iter()
            .map(|e| ParamDescriptor::unnamed(render_type(e)))
            .collect());
    }

    let mut out: Vec<ParamDescriptor> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for entry in &entries {
        let Tok::Ident(name) = &entry[0].tok else {
            return Err(Diagnostic::parse("mixed named and unnamed parameters"));
        };
        if entry.len() == 1 {
            pending.push(name.clone());
            continue;
        }
        let ty = render_type(&entry[1..]);
        for p in pending.drain(..) {
            out.push(ParamDescriptor::new(p, ty.clone()));
        }
        out.push(ParamDescriptor::new(name.clone(), ty));
    }
    if let Some(p) = pending.first() {
        return Err(Diagnostic::parse(format!("parameter {p} has no type")));
    }
    Ok(out)
}

fn is_named(entry: &[Token]) -> bool {
    let Some(Tok::Ident(first)) = entry.first().map(|t| &t.tok) else {
        return false;
    };
    if entry.len() < 2 || TYPE_KEYWORDS.contains(&first.as_str()) {
        return false;
    }
    match &entry[1].tok {
        Tok::Op(op) if op == "." => false,
        // `ids []int` is named; `List[int]` is a type.
        Tok::Op(op) if op == "[" => matching(entry, 1).is_ok_and(|close| close + 1 < entry.len()),
        _ => true,
    }
}

/// Reassembles a type expression with gofmt spacing.
fn render_type(toks: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Tok> = None;
    for t in toks {
        if let Some(p) = prev {
            if needs_space(p, &t.tok) {
                out.push(' ');
            }
        }
        match &t.tok {
            Tok::Ident(s) | Tok::Lit(s) | Tok::Op(s) => out.push_str(s),
            Tok::Str(s) => out.push_str(&format!("{s:?}")),
            Tok::Semi => out.push(';'),
        }
        prev = Some(&t.tok);
    }
    out
}

fn needs_space(prev: &Tok, cur: &Tok) -> bool {
    match (prev, cur) {
        (Tok::Op(p), _) if p == "," => true,
        (Tok::Semi, _) => true,
        (Tok::Ident(p), Tok::Op(c)) if p == "chan" => c != "<-",
        (Tok::Ident(p), _) if p == "chan" => true,
        (Tok::Op(p), Tok::Ident(c)) if p == "<-" => c != "chan",
        (Tok::Op(p), c) if p == ")" => {
            c.is_word() || c.is_op("(") || c.is_op("*") || c.is_op("[") || c.is_op("<-")
        }
        (Tok::Ident(p), Tok::Op(c)) if (p == "interface" || p == "struct") && c == "{" => false,
        (Tok::Ident(p), Tok::Op(c)) if p == "func" && c == "(" => false,
        (Tok::Op(p), Tok::Op(c)) if p == "{" && c == "}" => false,
        (Tok::Op(p), _) if p == "{" => true,
        (_, Tok::Op(c)) if c == "}" => true,
        (p, Tok::Op(c)) if p.is_word() => c == "*" || c == "..." || c == "<-",
        (p, c) => p.is_word() && c.is_word(),
    }
}

/// Index of the delimiter closing the one at `open`.
fn matching(toks: &[Token], open: usize) -> Result<usize, Diagnostic> {
    let mut stack: Vec<&str> = Vec::new();
    for (idx, t) in toks.iter().enumerate().skip(open) {
        if let Tok::Op(op) = &t.tok {
            match op.as_str() {
                "(" => stack.push(")"),
                "[" => stack.push("]"),
                "{" => stack.push("}"),
                ")" | "]" | "}" => {
                    if stack.pop() != Some(op.as_str()) {
                        return Err(Diagnostic::parse(format!(
                            "line {}: unbalanced {op:?}",
                            t.line
                        )));
                    }
                    if stack.is_empty() {
                        return Ok(idx);
                    }
                }
                _ => {}
            }
        }
    }
    Err(Diagnostic::parse(format!(
        "line {}: unclosed delimiter",
        toks.get(open).map(|t| t.line).unwrap_or(0)
    )))
}

/// First statement terminator at delimiter depth zero, at or after `start`.
fn stmt_end(toks: &[Token], start: usize) -> Result<usize, Diagnostic> {
    let mut i = start;
    while i < toks.len() {
        match &toks[i].tok {
            Tok::Semi => return Ok(i),
            Tok::Op(op) if op == "(" || op == "[" || op == "{" => i = matching(toks, i)? + 1,
            Tok::Op(op) if op == ")" || op == "]" || op == "}" => {
                return Err(Diagnostic::parse(format!(
                    "line {}: unbalanced {op:?}",
                    toks[i].line
                )));
            }
            _ => i += 1,
        }
    }
    Ok(toks.len())
}

fn split_top(toks: &[Token], is_sep: impl Fn(&Tok) -> bool) -> Result<Vec<&[Token]>, Diagnostic> {
    let mut out: Vec<&[Token]> = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < toks.len() {
        let t = &toks[i].tok;
        if t.is_op("(") || t.is_op("[") || t.is_op("{") {
            i = matching(toks, i)? + 1;
            continue;
        }
        if is_sep(t) {
            out.push(&toks[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    out.push(&toks[start..]);
    Ok(out)
}

fn tokenize(src: &str) -> Result<Vec<Token>, Diagnostic> {
    let chars: Vec<char> = src.chars().collect();
    let mut out: Vec<Token> = Vec::new();
    let mut line = 1usize;
    let mut i = 0usize;

    fn needs_semi(out: &[Token]) -> bool {
        match out.last().map(|t| &t.tok) {
            Some(Tok::Ident(_) | Tok::Lit(_) | Tok::Str(_)) => true,
            Some(Tok::Op(op)) => op == ")" || op == "]" || op == "}",
            _ => false,
        }
    }

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\n' => {
                if needs_semi(&out) {
                    out.push(Token { tok: Tok::Semi, line });
                }
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let start_line = line;
                i += 2;
                let mut had_newline = false;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(Diagnostic::parse(format!(
                                "line {start_line}: unterminated comment"
                            )))
                        }
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 2;
                            break;
                        }
                        Some('\n') => {
                            had_newline = true;
                            line += 1;
                            i += 1;
                        }
                        Some(_) => i += 1,
                    }
                }
                if had_newline && needs_semi(&out) {
                    out.push(Token { tok: Tok::Semi, line });
                }
            }
            '"' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(Diagnostic::parse(format!(
                                "line {line}: unterminated string literal"
                            )))
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            match chars.get(i + 1) {
                                Some('n') => value.push('\n'),
                                Some('t') => value.push('\t'),
                                Some(&e) => value.push(e),
                                None => {}
                            }
                            i += 2;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                out.push(Token {
                    tok: Tok::Str(value),
                    line,
                });
            }
            '`' => {
                let start_line = line;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(Diagnostic::parse(format!(
                                "line {start_line}: unterminated raw string"
                            )))
                        }
                        Some('`') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            if ch == '\n' {
                                line += 1;
                            }
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                out.push(Token {
                    tok: Tok::Str(value),
                    line: start_line,
                });
            }
            '\'' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i] != '\'' && chars[i] != '\n' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if chars.get(i) != Some(&'\'') {
                    return Err(Diagnostic::parse(format!(
                        "line {line}: unterminated rune literal"
                    )));
                }
                i += 1;
                out.push(Token {
                    tok: Tok::Lit(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                out.push(Token {
                    tok: Tok::Ident(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                out.push(Token {
                    tok: Tok::Lit(chars[start..i].iter().collect()),
                    line,
                });
            }
            '.' if next == Some('.') && chars.get(i + 2) == Some(&'.') => {
                out.push(Token {
                    tok: Tok::Op("...".to_string()),
                    line,
                });
                i += 3;
            }
            '<' if next == Some('-') => {
                out.push(Token {
                    tok: Tok::Op("<-".to_string()),
                    line,
                });
                i += 2;
            }
            ';' => {
                out.push(Token { tok: Tok::Semi, line });
                i += 1;
            }
            other => {
                out.push(Token {
                    tok: Tok::Op(other.to_string()),
                    line,
                });
                i += 1;
            }
        }
    }
    if needs_semi(&out) {
        out.push(Token { tok: Tok::Semi, line });
    }
    Ok(out)
}
