use super::{
    Associativity, Grammar, GrammarFormat, PrecedenceRule, Production, ProductionPart,
    RecoveryStrategy, SemanticActionTemplate,
};
use crate::GrammarError;
use std::path::Path;

// A statement of the rule format together with the line it started on.
struct Statement {
    line: usize,
    text: String,
}

impl Grammar {
    /// Build a grammar from the textual rule format.
    ///
    /// The format is line oriented; every statement ends with `;` and may
    /// span lines. `//` starts a comment. Uppercase names on a rule's right
    /// hand side are terminals, lowercase names reference other rules.
    ///
    /// ```text
    /// grammar calc;
    /// extends base;
    /// start prog;
    /// terminal TERM_NUM;
    /// left 10 + - ;
    /// right 20 * / ;
    /// action emit(value) -> str = "push(${value})";
    /// rule prog -> TERM_NUM expr? ;
    /// rule expr -> TERM_OP TERM_NUM ;
    /// ```
    pub fn load_from_content(text: &str, filename: &str) -> Result<Grammar, GrammarError> {
        let statements = split_statements(text);
        let mut statements = statements.into_iter();

        let header = statements.next().ok_or_else(|| GrammarError::Load {
            filename: filename.to_string(),
            line: 1,
            message: "empty grammar text".to_string(),
        })?;

        let mut grammar = parse_header(&header, filename)?;

        let mut pending_starts: Vec<(usize, String)> = Vec::new();

        for statement in statements {
            let words: Vec<&str> = statement.text.split_whitespace().collect();
            let error = |message: String| GrammarError::Load {
                filename: filename.to_string(),
                line: statement.line,
                message,
            };

            match words.first().copied() {
                Some("extends") => {
                    let bases: Vec<String> = words[1..]
                        .join(" ")
                        .split(',')
                        .map(|b| b.trim().to_string())
                        .filter(|b| !b.is_empty())
                        .collect();
                    if bases.is_empty() {
                        return Err(error("extends requires at least one grammar name".into()));
                    }
                    grammar.set_base_grammars(bases);
                }
                Some("start") => {
                    let name = words
                        .get(1)
                        .ok_or_else(|| error("start requires a production name".into()))?;
                    pending_starts.push((statement.line, name.to_string()));
                }
                Some("terminal") => {
                    let name = words
                        .get(1)
                        .ok_or_else(|| error("terminal requires a terminal name".into()))?;
                    grammar.add_start_terminal(name);
                }
                Some("splitter") => {
                    let pattern = statement.text["splitter".len()..].trim();
                    let pattern = unquote(pattern)
                        .ok_or_else(|| error("splitter requires a quoted pattern".into()))?;
                    grammar
                        .set_token_splitter_pattern(pattern)
                        .map_err(|err| error(err.to_string()))?;
                }
                Some("recovery") => {
                    let keyword = words
                        .get(1)
                        .ok_or_else(|| error("recovery requires a strategy keyword".into()))?;
                    let strategy = match *keyword {
                        "skip" => RecoveryStrategy::Skip,
                        "insert" => RecoveryStrategy::Insert,
                        "backtrack" => RecoveryStrategy::Backtrack,
                        "none" => RecoveryStrategy::None,
                        other => {
                            return Err(error(format!("unknown recovery strategy '{}'", other)))
                        }
                    };
                    grammar.set_recovery(strategy);
                }
                Some(keyword @ ("left" | "right" | "nonassoc")) => {
                    let associativity = match keyword {
                        "left" => Associativity::Left,
                        "right" => Associativity::Right,
                        _ => Associativity::None,
                    };
                    let level: i32 = words
                        .get(1)
                        .and_then(|w| w.parse().ok())
                        .ok_or_else(|| error("precedence requires a numeric level".into()))?;
                    if words.len() < 3 {
                        return Err(error("precedence requires at least one operator".into()));
                    }
                    let mut rule = PrecedenceRule::new(level, Vec::new(), associativity);
                    rule.operators = super::precedence::operator_set(&words[2..]);
                    grammar.add_precedence_rule(rule);
                }
                Some("action") => {
                    let template = parse_action(&statement.text["action".len()..])
                        .ok_or_else(|| error("malformed action statement".into()))?;
                    grammar.add_semantic_action(template);
                }
                Some("rule") => {
                    let arrow = statement
                        .text
                        .find("->")
                        .ok_or_else(|| error("rule requires '->'".into()))?;
                    let name = statement.text["rule".len()..arrow].trim();
                    if name.is_empty() {
                        return Err(error("rule requires a name".into()));
                    }
                    let parts = parse_parts(statement.text[arrow + 2..].trim())
                        .map_err(|message| error(message))?;
                    grammar
                        .add_production(Production::with_parts(name, parts))
                        .map_err(|err| error(err.to_string()))?;
                }
                Some(other) => {
                    return Err(error(format!("unknown statement '{}'", other)));
                }
                None => {}
            }
        }

        for (line, name) in pending_starts {
            grammar.add_start_production(&name).map_err(|err| {
                GrammarError::Load {
                    filename: filename.to_string(),
                    line,
                    message: err.to_string(),
                }
            })?;
        }

        Ok(grammar)
    }

    /// Read and build a grammar from a file on disk.
    pub fn load_from_file(path: &Path) -> Result<Grammar, GrammarError> {
        let filename = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|err| GrammarError::Load {
            filename: filename.clone(),
            line: 0,
            message: err.to_string(),
        })?;
        Grammar::load_from_content(&text, &filename)
    }
}

fn parse_header(statement: &Statement, filename: &str) -> Result<Grammar, GrammarError> {
    let words: Vec<&str> = statement.text.split_whitespace().collect();
    match words.as_slice() {
        ["grammar", name] => {
            let mut grammar = Grammar::new(name);
            grammar.set_format(GrammarFormat::Cebnf);
            Ok(grammar)
        }
        _ => Err(GrammarError::Load {
            filename: filename.to_string(),
            line: statement.line,
            message: "grammar text must begin with 'grammar <name>;'".to_string(),
        }),
    }
}

fn split_statements(text: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;

    for (index, raw_line) in text.lines().enumerate() {
        let line = match raw_line.find("//") {
            Some(comment) => &raw_line[..comment],
            None => raw_line,
        };
        for c in line.chars() {
            if c == ';' {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    statements.push(Statement {
                        line: start_line,
                        text: trimmed.to_string(),
                    });
                }
                current.clear();
                start_line = index + 1;
            } else {
                if current.trim().is_empty() {
                    start_line = index + 1;
                }
                current.push(c);
            }
        }
        current.push(' ');
    }

    statements
}

fn unquote(text: &str) -> Option<&str> {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

// action name(p1, p2) -> ret = "template"
fn parse_action(text: &str) -> Option<SemanticActionTemplate> {
    let open = text.find('(')?;
    let close = text.find(')')?;
    let name = text[..open].trim();
    let parameters: Vec<&str> = text[open + 1..close]
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    let rest = &text[close + 1..];
    let arrow = rest.find("->")?;
    let equals = rest.find('=')?;
    if equals < arrow {
        return None;
    }
    let return_type = rest[arrow + 2..equals].trim();
    let template = unquote(rest[equals + 1..].trim())?;

    if name.is_empty() || return_type.is_empty() {
        return None;
    }
    Some(SemanticActionTemplate::new(
        name,
        template,
        parameters,
        return_type,
    ))
}

fn parse_parts(text: &str) -> Result<Vec<ProductionPart>, String> {
    let tokens = lex_parts(text);
    let mut cursor = 0;
    let parts = parse_sequence(&tokens, &mut cursor, false)?;
    if cursor != tokens.len() {
        return Err(format!("unexpected '{}' in rule body", tokens[cursor]));
    }
    if parts.is_empty() {
        return Err("rule body is empty".to_string());
    }
    Ok(parts)
}

fn lex_parts(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | ')' | '?' | '*' | '+' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_sequence(
    tokens: &[String],
    cursor: &mut usize,
    in_group: bool,
) -> Result<Vec<ProductionPart>, String> {
    let mut parts = Vec::new();
    while *cursor < tokens.len() {
        let token = tokens[*cursor].as_str();
        match token {
            ")" => {
                if in_group {
                    return Ok(parts);
                }
                return Err("unbalanced ')' in rule body".to_string());
            }
            "(" => {
                *cursor += 1;
                let inner = parse_sequence(tokens, cursor, true)?;
                if *cursor >= tokens.len() || tokens[*cursor] != ")" {
                    return Err("missing ')' in rule body".to_string());
                }
                *cursor += 1;
                parts.push(apply_suffix(ProductionPart::group(inner), tokens, cursor));
            }
            "?" | "*" | "+" => {
                return Err(format!("dangling '{}' in rule body", token));
            }
            name => {
                *cursor += 1;
                let base = if name.chars().any(|c| c.is_ascii_uppercase()) {
                    ProductionPart::terminal(name)
                } else {
                    ProductionPart::non_terminal(name)
                };
                parts.push(apply_suffix(base, tokens, cursor));
            }
        }
    }
    if in_group {
        return Err("missing ')' in rule body".to_string());
    }
    Ok(parts)
}

fn apply_suffix(part: ProductionPart, tokens: &[String], cursor: &mut usize) -> ProductionPart {
    match tokens.get(*cursor).map(|t| t.as_str()) {
        Some("?") => {
            *cursor += 1;
            ProductionPart::optional(part)
        }
        Some("*") => {
            *cursor += 1;
            ProductionPart::zero_or_more(part)
        }
        Some("+") => {
            *cursor += 1;
            ProductionPart::one_or_more(part)
        }
        _ => part,
    }
}
